//! Node view over [`Value`]: reserved keys and role-set helpers.
//!
//! A node is any map whose `type` field is a string. Everything else about
//! its shape is decided by the rule table, so one generic representation
//! serves every node type of every grammar.

use crate::errors::NormalizeError;
use crate::roles::Role;
use crate::value::{Fields, Value};

/// Type tag of a node.
pub const TYPE_KEY: &str = "type";
/// Start byte offset.
pub const START_KEY: &str = "start";
/// End byte offset (exclusive).
pub const END_KEY: &str = "end";
/// Role set of a canonical node.
pub const ROLES_KEY: &str = "roles";
/// Line/column positions filled from the source text.
pub const POS_KEY: &str = "pos";

/// Keys that carry position information through every rule.
pub const POSITION_KEYS: [&str; 3] = [START_KEY, END_KEY, POS_KEY];

impl Value {
    /// Returns the node type tag, if this value is a node.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use arbor::value::Value;
    /// let node = Value::map([("type", Value::from("Identifier"))]);
    /// assert_eq!(node.node_type(), Some("Identifier"));
    /// assert!(node.is_node());
    /// assert!(!Value::map([("type", Value::Int(1))]).is_node());
    /// ```
    pub fn node_type(&self) -> Option<&str> {
        self.get(TYPE_KEY).and_then(Value::as_str)
    }

    pub fn is_node(&self) -> bool {
        self.node_type().is_some()
    }

    /// Start offset of a node, when present and non-negative.
    pub fn start_offset(&self) -> Option<usize> {
        self.get(START_KEY)
            .and_then(Value::as_int)
            .and_then(|n| usize::try_from(n).ok())
    }

    /// End offset of a node, when present and non-negative.
    pub fn end_offset(&self) -> Option<usize> {
        self.get(END_KEY)
            .and_then(Value::as_int)
            .and_then(|n| usize::try_from(n).ok())
    }

    /// Role names recorded on a node, in insertion order.
    ///
    /// Unknown names are kept as strings by the tree but skipped here.
    pub fn roles(&self) -> Vec<Role> {
        self.role_names()
            .iter()
            .filter_map(|name| name.parse().ok())
            .collect()
    }

    /// Raw role names recorded on a node.
    pub fn role_names(&self) -> Vec<&str> {
        match self.get(ROLES_KEY) {
            Some(Value::List(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role_names().contains(&role.as_str())
    }
}

/// Unions `roles` into the role set of `fields`, skipping names already present.
pub fn add_roles(fields: &mut Fields, roles: &[Role]) {
    if roles.is_empty() {
        return;
    }
    let mut names = match fields.get(ROLES_KEY) {
        Some(Value::List(items)) => items.clone(),
        _ => Vec::new(),
    };
    for role in roles {
        let name = Value::from(role.as_str());
        if !names.contains(&name) {
            names.push(name);
        }
    }
    fields.insert(ROLES_KEY.to_string(), Value::List(names));
}

/// Removes repeated entries from the role set of `fields`, keeping first occurrences.
pub fn dedup_roles(fields: &mut Fields) {
    let Some(Value::List(items)) = fields.get(ROLES_KEY) else {
        return;
    };
    let mut unique: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(item) {
            unique.push(item.clone());
        }
    }
    if unique.len() != items.len() {
        fields.insert(ROLES_KEY.to_string(), Value::List(unique));
    }
}

/// Returns true if the role set of `fields` is absent or empty.
pub fn has_no_roles(fields: &Fields) -> bool {
    match fields.get(ROLES_KEY) {
        Some(Value::List(items)) => items.is_empty(),
        _ => true,
    }
}

/// Fails with [`NormalizeError::DepthLimit`] if `value` nests deeper than
/// `max_depth`, counting every list and map level from the root at depth 0.
///
/// The tree walks that run ahead of the rule passes call this first, so they
/// honor the same limit as the passes do.
pub fn check_depth(value: &Value, max_depth: usize) -> Result<(), NormalizeError> {
    fn walk(value: &Value, depth: usize, max_depth: usize) -> Result<(), NormalizeError> {
        if depth > max_depth {
            return Err(NormalizeError::DepthLimit { limit: max_depth });
        }
        match value {
            Value::List(items) => items.iter().try_for_each(|v| walk(v, depth + 1, max_depth)),
            Value::Map(fields) => fields.values().try_for_each(|v| walk(v, depth + 1, max_depth)),
            _ => Ok(()),
        }
    }
    walk(value, 0, max_depth)
}

/// Recursively removes canonical-only annotations (`roles`, `pos`) from every node.
pub fn strip_annotations(value: Value) -> Value {
    match value {
        Value::List(items) => Value::List(items.into_iter().map(strip_annotations).collect()),
        Value::Map(fields) => {
            let is_node = fields.get(TYPE_KEY).and_then(Value::as_str).is_some();
            let mut out = Fields::new();
            for (key, child) in fields {
                if is_node && (key == ROLES_KEY || key == POS_KEY) {
                    continue;
                }
                out.insert(key, strip_annotations(child));
            }
            Value::Map(out)
        }
        scalar => scalar,
    }
}
