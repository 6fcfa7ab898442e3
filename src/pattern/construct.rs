//! Construction half of the pattern engine.

use super::{Bindings, ObjectPattern, Pattern};
use crate::strconv;
use crate::value::{Fields, Value};
use thiserror::Error;

/// Failure to build a value from bindings.
///
/// Construction runs only after a successful match, so these always point to
/// a rule whose two sides disagree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructError {
    #[error("binding '{0}' is missing")]
    MissingBinding(String),
    #[error("binding '{var}' has the wrong shape: expected {expected}")]
    Mismatch { var: String, expected: String },
    #[error("a wildcard cannot be constructed")]
    Wildcard,
    #[error("constructed value does not satisfy {0}")]
    CheckFailed(String),
}

/// Builds a value from `pattern`, substituting `bindings`.
///
/// # Examples
///
/// ```rust
/// use arbor::pattern::{construct, field, lit, obj, var, Bindings};
/// use arbor::value::Value;
/// let p = obj([field("type", lit("String")), field("value", var("v"))]);
/// let b: Bindings = [("v".to_string(), Value::from("a"))].into_iter().collect();
/// let out = construct(&p, &b).unwrap();
/// assert_eq!(out.get("value"), Some(&Value::from("a")));
/// assert_eq!(out.node_type(), Some("String"));
/// ```
pub fn construct(pattern: &Pattern, bindings: &Bindings) -> Result<Value, ConstructError> {
    match pattern {
        Pattern::Any => Err(ConstructError::Wildcard),
        Pattern::Var(name) => lookup(bindings, name).cloned(),
        Pattern::Literal(value) => Ok(value.clone()),
        Pattern::Object(obj) => construct_object(obj, bindings),
        Pattern::Array(items) => items
            .iter()
            .map(|p| construct(p, bindings))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        Pattern::Each(inner) => construct_each(inner, bindings),
        Pattern::Cases {
            selector,
            alternatives,
        } => {
            let index = match lookup(bindings, selector)? {
                Value::Int(i) => usize::try_from(*i).ok(),
                _ => None,
            };
            match index.and_then(|i| alternatives.get(i)) {
                Some(alternative) => construct(alternative, bindings),
                None => Err(ConstructError::Mismatch {
                    var: selector.clone(),
                    expected: format!("an alternative index below {}", alternatives.len()),
                }),
            }
        }
        Pattern::Check { predicate, pattern } => {
            let value = construct(pattern, bindings)?;
            if predicate.test(&value) {
                Ok(value)
            } else {
                Err(ConstructError::CheckFailed(format!("{predicate:?}")))
            }
        }
        Pattern::Quoted { quote, pattern } => match construct(pattern, bindings)? {
            Value::String(decoded) => Ok(Value::String(strconv::quote(&decoded, *quote))),
            other => Err(ConstructError::CheckFailed(format!(
                "a quoted literal needs a string, got {}",
                other.type_name()
            ))),
        },
    }
}

fn lookup<'b>(bindings: &'b Bindings, name: &str) -> Result<&'b Value, ConstructError> {
    bindings
        .get(name)
        .ok_or_else(|| ConstructError::MissingBinding(name.to_string()))
}

fn construct_object(obj: &ObjectPattern, bindings: &Bindings) -> Result<Value, ConstructError> {
    let mut out = match &obj.rest {
        Some(name) => match lookup(bindings, name)? {
            Value::Map(rest) => rest.clone(),
            _ => {
                return Err(ConstructError::Mismatch {
                    var: name.clone(),
                    expected: "a map of remaining fields".to_string(),
                })
            }
        },
        None => Fields::new(),
    };

    for field in &obj.fields {
        if let Some(flag) = &field.optional {
            match lookup(bindings, flag)? {
                Value::Bool(true) => {}
                Value::Bool(false) => continue,
                _ => {
                    return Err(ConstructError::Mismatch {
                        var: flag.clone(),
                        expected: "a presence flag".to_string(),
                    })
                }
            }
        }
        out.insert(field.name.clone(), construct(&field.pattern, bindings)?);
    }
    Ok(Value::Map(out))
}

fn construct_each(inner: &Pattern, bindings: &Bindings) -> Result<Value, ConstructError> {
    let names = inner.vars();
    if names.is_empty() {
        let len_var = super::each_len_var(inner);
        let len = match lookup(bindings, &len_var)? {
            Value::Int(n) => usize::try_from(*n).ok(),
            _ => None,
        }
        .ok_or_else(|| ConstructError::Mismatch {
            var: len_var.clone(),
            expected: "an element count".to_string(),
        })?;
        return (0..len)
            .map(|_| construct(inner, bindings))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List);
    }
    let mut columns: Vec<(&String, &[Value])> = Vec::with_capacity(names.len());
    for name in &names {
        match lookup(bindings, name)? {
            Value::List(items) => columns.push((name, items.as_slice())),
            _ => {
                return Err(ConstructError::Mismatch {
                    var: name.clone(),
                    expected: "a list".to_string(),
                })
            }
        }
    }

    let len = columns.first().map_or(0, |(_, items)| items.len());
    if let Some((name, _)) = columns.iter().find(|(_, items)| items.len() != len) {
        return Err(ConstructError::Mismatch {
            var: (*name).clone(),
            expected: format!("a list of {len} elements"),
        });
    }

    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        let mut local = bindings.clone();
        for (name, items) in &columns {
            local.set(name, items[i].clone());
        }
        out.push(construct(inner, &local)?);
    }
    Ok(Value::List(out))
}
