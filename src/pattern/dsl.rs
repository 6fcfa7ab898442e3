//! Builder functions for declaring patterns in Rust.
//!
//! ```rust
//! use arbor::pattern::*;
//! let p = node("Identifier", [field("name", var("name"))]);
//! assert_eq!(p.root_types().into_iter().collect::<Vec<_>>(), vec!["Identifier".to_string()]);
//! ```

use super::{FieldPattern, ObjectPattern, Pattern, Predicate};
use crate::node::{POSITION_KEYS, TYPE_KEY};
use crate::value::Value;

pub fn any() -> Pattern {
    Pattern::Any
}

pub fn var(name: &str) -> Pattern {
    Pattern::Var(name.to_string())
}

pub fn lit(value: impl Into<Value>) -> Pattern {
    Pattern::Literal(value.into())
}

/// A required field.
pub fn field(name: &str, pattern: Pattern) -> FieldPattern {
    FieldPattern {
        name: name.to_string(),
        pattern,
        optional: None,
    }
}

/// A field that may be absent; its presence is bound to `flag`.
pub fn opt(name: &str, flag: &str, pattern: Pattern) -> FieldPattern {
    FieldPattern {
        name: name.to_string(),
        pattern,
        optional: Some(flag.to_string()),
    }
}

/// A total object pattern.
pub fn obj(fields: impl IntoIterator<Item = FieldPattern>) -> Pattern {
    Pattern::Object(ObjectPattern {
        fields: fields.into_iter().collect(),
        rest: None,
    })
}

/// A partial object pattern; unlisted fields are bound to `rest`.
pub fn part(rest: &str, fields: impl IntoIterator<Item = FieldPattern>) -> Pattern {
    Pattern::Object(ObjectPattern {
        fields: fields.into_iter().collect(),
        rest: Some(rest.to_string()),
    })
}

/// A total node pattern with a literal type tag.
pub fn node(type_name: &str, fields: impl IntoIterator<Item = FieldPattern>) -> Pattern {
    let mut all = vec![field(TYPE_KEY, lit(type_name))];
    all.extend(fields);
    obj(all)
}

/// Like [`node`], but also carries the position keys through the rule.
///
/// Each position key is optional and bound to `@<key>`, so the same helper on
/// both sides of a rule moves offsets and line/column data across unchanged.
pub fn positioned_node(type_name: &str, fields: impl IntoIterator<Item = FieldPattern>) -> Pattern {
    let mut all = vec![field(TYPE_KEY, lit(type_name))];
    for key in POSITION_KEYS {
        all.push(opt(key, &format!("@has_{key}"), var(&format!("@{key}"))));
    }
    all.extend(fields);
    obj(all)
}

pub fn arr(items: impl IntoIterator<Item = Pattern>) -> Pattern {
    Pattern::Array(items.into_iter().collect())
}

pub fn each(inner: Pattern) -> Pattern {
    Pattern::Each(Box::new(inner))
}

pub fn cases(selector: &str, alternatives: impl IntoIterator<Item = Pattern>) -> Pattern {
    Pattern::Cases {
        selector: selector.to_string(),
        alternatives: alternatives.into_iter().collect(),
    }
}

pub fn check(predicate: Predicate, pattern: Pattern) -> Pattern {
    Pattern::Check {
        predicate,
        pattern: Box::new(pattern),
    }
}

/// A single-quoted string literal decoded into `pattern`.
pub fn quoted(pattern: Pattern) -> Pattern {
    Pattern::Quoted {
        quote: '\'',
        pattern: Box::new(pattern),
    }
}
