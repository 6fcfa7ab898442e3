//! Matching half of the pattern engine.

use super::{Bindings, ObjectPattern, Pattern};
use crate::strconv::{self, EscapeError};
use crate::value::{Fields, Value};
use std::collections::BTreeMap;

/// Matches `value` against `pattern`.
///
/// Returns `Ok(None)` when the pattern does not apply. The only error is a
/// malformed literal found under [`Pattern::Quoted`].
///
/// # Examples
///
/// ```rust
/// use arbor::pattern::{field, lit, match_pattern, obj, var};
/// use arbor::value::Value;
/// let p = obj([field("type", lit("Identifier")), field("name", var("n"))]);
/// let v = Value::map([("type", Value::from("Identifier")), ("name", Value::from("x"))]);
/// let b = match_pattern(&p, &v).unwrap().unwrap();
/// assert_eq!(b.get("n"), Some(&Value::from("x")));
/// ```
pub fn match_pattern(pattern: &Pattern, value: &Value) -> Result<Option<Bindings>, EscapeError> {
    let mut bindings = Bindings::new();
    if match_into(pattern, value, &mut bindings)? {
        Ok(Some(bindings))
    } else {
        Ok(None)
    }
}

/// Matches `value` against `pattern`, extending `bindings` in place.
///
/// On `Ok(false)` the bindings may hold partial results and must be discarded.
pub fn match_into(
    pattern: &Pattern,
    value: &Value,
    bindings: &mut Bindings,
) -> Result<bool, EscapeError> {
    match pattern {
        Pattern::Any => Ok(true),
        Pattern::Var(name) => Ok(bindings.bind(name, value.clone())),
        Pattern::Literal(expected) => Ok(expected == value),
        Pattern::Object(obj) => match value {
            Value::Map(fields) => match_object(obj, fields, bindings),
            _ => Ok(false),
        },
        Pattern::Array(items) => match value {
            Value::List(values) if values.len() == items.len() => {
                for (p, v) in items.iter().zip(values) {
                    if !match_into(p, v, bindings)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            _ => Ok(false),
        },
        Pattern::Each(inner) => match value {
            Value::List(values) => match_each(inner, values, bindings),
            _ => Ok(false),
        },
        Pattern::Cases {
            selector,
            alternatives,
        } => {
            for (index, alternative) in alternatives.iter().enumerate() {
                let mut trial = bindings.clone();
                if match_into(alternative, value, &mut trial)?
                    && trial.bind(selector, Value::from(index))
                {
                    *bindings = trial;
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Pattern::Check { predicate, pattern } => {
            if !predicate.test(value) {
                return Ok(false);
            }
            match_into(pattern, value, bindings)
        }
        Pattern::Quoted { pattern, .. } => match value {
            Value::String(raw) => {
                let decoded = strconv::unquote_detect(raw)?;
                match_into(pattern, &Value::String(decoded), bindings)
            }
            _ => Ok(false),
        },
    }
}

fn match_object(
    obj: &ObjectPattern,
    fields: &Fields,
    bindings: &mut Bindings,
) -> Result<bool, EscapeError> {
    for field in &obj.fields {
        match fields.get(&field.name) {
            Some(value) => {
                if let Some(flag) = &field.optional {
                    if !bindings.bind(flag, Value::Bool(true)) {
                        return Ok(false);
                    }
                }
                if !match_into(&field.pattern, value, bindings)? {
                    return Ok(false);
                }
            }
            None => match &field.optional {
                Some(flag) => {
                    if !bindings.bind(flag, Value::Bool(false)) {
                        return Ok(false);
                    }
                }
                None => return Ok(false),
            },
        }
    }

    let rest: Fields = fields
        .iter()
        .filter(|(key, _)| !obj.fields.iter().any(|f| &f.name == *key))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    match &obj.rest {
        Some(name) => Ok(bindings.bind(name, Value::Map(rest))),
        None => Ok(rest.is_empty()),
    }
}

fn match_each(
    inner: &Pattern,
    values: &[Value],
    bindings: &mut Bindings,
) -> Result<bool, EscapeError> {
    let names = inner.vars();
    if names.is_empty() {
        for value in values {
            if !match_into(inner, value, &mut Bindings::new())? {
                return Ok(false);
            }
        }
        return Ok(bindings.bind(&super::each_len_var(inner), Value::from(values.len())));
    }
    let mut columns: BTreeMap<String, Vec<Value>> = names
        .iter()
        .map(|name| (name.clone(), Vec::with_capacity(values.len())))
        .collect();

    for value in values {
        let mut local = Bindings::new();
        if !match_into(inner, value, &mut local)? {
            return Ok(false);
        }
        for (name, column) in columns.iter_mut() {
            column.push(local.get(name).cloned().unwrap_or(Value::Null));
        }
    }

    for (name, column) in columns {
        if !bindings.bind(&name, Value::List(column)) {
            return Ok(false);
        }
    }
    Ok(true)
}
