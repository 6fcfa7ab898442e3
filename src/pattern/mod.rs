//! # Pattern Engine
//!
//! Patterns describe a tree shape declaratively and are used in both
//! directions: the same pattern that *matches* a native node (extracting
//! variable bindings) can *construct* a native node from bindings.
//!
//! ## Core Principles
//!
//! - **Bidirectional**: every pattern except [`Pattern::Any`] can be matched and
//!   constructed. A rule is a pair of patterns sharing one variable namespace.
//! - **Match failure is not an error**: it means "this rule does not apply".
//!   Construction failure is an error, because the match that produced the
//!   bindings has already committed.
//! - **Deterministic**: [`Pattern::Cases`] tries alternatives in declared order
//!   and records the index of the winner, so construction picks the
//!   symmetric alternative.
//!
//! Example:
//!   native    `{type: "Identifier", name: $name}`
//!   canonical `{type: "Identifier", name: $name}`

pub mod bindings;
pub mod construct;
pub mod dsl;
pub mod matcher;

pub use bindings::Bindings;
pub use construct::{construct, ConstructError};
pub use dsl::*;
pub use matcher::match_pattern;

use crate::node::TYPE_KEY;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// A bidirectional tree pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    /// Matches anything without binding it.
    Any,
    /// Binds on first occurrence, must be structurally equal afterwards.
    Var(String),
    /// Matches and emits exactly this value.
    Literal(Value),
    /// Matches a map field by field.
    Object(ObjectPattern),
    /// Matches a list of exactly this many elements.
    Array(Vec<Pattern>),
    /// Matches a list of any length; element variables bind to aligned lists.
    Each(Box<Pattern>),
    /// First matching alternative wins; its index is bound to `selector`.
    Cases {
        selector: String,
        alternatives: Vec<Pattern>,
    },
    /// Guards `pattern` with a predicate on the whole value.
    Check {
        predicate: Predicate,
        pattern: Box<Pattern>,
    },
    /// A quoted string literal: unquoted on match, quoted on construction.
    Quoted { quote: char, pattern: Box<Pattern> },
}

/// Field-by-field map pattern.
///
/// Without `rest` the pattern is total: a map with keys the pattern does not
/// list does not match. With `rest`, unlisted keys are bound as a map to that
/// variable and merged back on construction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjectPattern {
    pub fields: Vec<FieldPattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest: Option<String>,
}

/// One named field of an [`ObjectPattern`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldPattern {
    pub name: String,
    pub pattern: Pattern,
    /// Presence flag variable; the field may be absent when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<String>,
}

/// Guard predicates usable by [`Pattern::Check`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    IsNull,
    IsBool,
    IsNumber,
    IsString,
    IsList,
    IsMap,
    IsNode,
    TypeIs(String),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn test(&self, value: &Value) -> bool {
        match self {
            Predicate::IsNull => value.is_null(),
            Predicate::IsBool => matches!(value, Value::Bool(_)),
            Predicate::IsNumber => matches!(value, Value::Int(_) | Value::Float(_)),
            Predicate::IsString => matches!(value, Value::String(_)),
            Predicate::IsList => matches!(value, Value::List(_)),
            Predicate::IsMap => matches!(value, Value::Map(_)),
            Predicate::IsNode => value.is_node(),
            Predicate::TypeIs(name) => value.node_type() == Some(name.as_str()),
            Predicate::Not(inner) => !inner.test(value),
        }
    }
}

// ============================================================================
// INTROSPECTION
// ============================================================================

/// Hidden variable holding the element count of an `Each` whose element
/// pattern binds nothing. Keyed by the element pattern, so both sides of a
/// rule must spell that pattern identically.
pub(crate) fn each_len_var(inner: &Pattern) -> String {
    format!("#len@{inner:?}")
}

impl Pattern {
    /// All variable names this pattern binds or consumes, including presence
    /// flags, case selectors and partial-object remainders.
    pub fn vars(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_vars(&mut out);
        out
    }

    fn collect_vars(&self, out: &mut BTreeSet<String>) {
        match self {
            Pattern::Any | Pattern::Literal(_) => {}
            Pattern::Var(name) => {
                out.insert(name.clone());
            }
            Pattern::Object(obj) => {
                for field in &obj.fields {
                    if let Some(flag) = &field.optional {
                        out.insert(flag.clone());
                    }
                    field.pattern.collect_vars(out);
                }
                if let Some(rest) = &obj.rest {
                    out.insert(rest.clone());
                }
            }
            Pattern::Array(items) => items.iter().for_each(|p| p.collect_vars(out)),
            Pattern::Each(inner) => {
                let inner_vars = inner.vars();
                if inner_vars.is_empty() {
                    out.insert(each_len_var(inner));
                } else {
                    out.extend(inner_vars);
                }
            }
            Pattern::Cases {
                selector,
                alternatives,
            } => {
                out.insert(selector.clone());
                alternatives.iter().for_each(|p| p.collect_vars(out));
            }
            Pattern::Check { pattern, .. } | Pattern::Quoted { pattern, .. } => {
                pattern.collect_vars(out)
            }
        }
    }

    /// Variables bound to the remaining fields of a partial object pattern.
    pub fn rest_vars(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_rest_vars(&mut out);
        out
    }

    fn collect_rest_vars(&self, out: &mut BTreeSet<String>) {
        match self {
            Pattern::Object(obj) => {
                if let Some(rest) = &obj.rest {
                    out.insert(rest.clone());
                }
                obj.fields
                    .iter()
                    .for_each(|f| f.pattern.collect_rest_vars(out));
            }
            Pattern::Array(items) => items.iter().for_each(|p| p.collect_rest_vars(out)),
            Pattern::Cases { alternatives, .. } => {
                alternatives.iter().for_each(|p| p.collect_rest_vars(out))
            }
            Pattern::Each(pattern)
            | Pattern::Check { pattern, .. }
            | Pattern::Quoted { pattern, .. } => pattern.collect_rest_vars(out),
            Pattern::Any | Pattern::Var(_) | Pattern::Literal(_) => {}
        }
    }

    /// Node type names this pattern can match at its root.
    pub fn root_types(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_root_types(&mut out);
        out
    }

    fn collect_root_types(&self, out: &mut BTreeSet<String>) {
        match self {
            Pattern::Object(obj) => {
                if let Some(name) = obj.literal_type() {
                    out.insert(name.to_string());
                }
            }
            Pattern::Cases { alternatives, .. } => {
                alternatives.iter().for_each(|p| p.collect_root_types(out))
            }
            Pattern::Check { pattern, .. } => pattern.collect_root_types(out),
            _ => {}
        }
    }

    /// Node type names this pattern emits anywhere in its structure.
    pub fn node_types(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_node_types(&mut out);
        out
    }

    fn collect_node_types(&self, out: &mut BTreeSet<String>) {
        match self {
            Pattern::Object(obj) => {
                if let Some(name) = obj.literal_type() {
                    out.insert(name.to_string());
                }
                obj.fields
                    .iter()
                    .for_each(|f| f.pattern.collect_node_types(out));
            }
            Pattern::Literal(value) => collect_literal_types(value, out),
            Pattern::Array(items) => items.iter().for_each(|p| p.collect_node_types(out)),
            Pattern::Cases { alternatives, .. } => {
                alternatives.iter().for_each(|p| p.collect_node_types(out))
            }
            Pattern::Each(pattern)
            | Pattern::Check { pattern, .. }
            | Pattern::Quoted { pattern, .. } => pattern.collect_node_types(out),
            Pattern::Any | Pattern::Var(_) => {}
        }
    }
}

impl ObjectPattern {
    /// The literal `type` this object pattern asserts, if any.
    pub fn literal_type(&self) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == TYPE_KEY && f.optional.is_none())
            .and_then(|f| match &f.pattern {
                Pattern::Literal(Value::String(name)) => Some(name.as_str()),
                _ => None,
            })
    }
}

fn collect_literal_types(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::Map(fields) => {
            if let Some(name) = value.node_type() {
                out.insert(name.to_string());
            }
            fields.values().for_each(|v| collect_literal_types(v, out));
        }
        Value::List(items) => items.iter().for_each(|v| collect_literal_types(v, out)),
        _ => {}
    }
}
