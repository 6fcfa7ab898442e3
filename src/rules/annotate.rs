//! Role annotation.
//!
//! Annotation walks a canonical tree once and adds roles to nodes selected
//! by [`RoleRule`]s. Top-level rules are tried on every node. A rule's
//! `children` are only tried on the direct child nodes of a node it
//! selected, and its `descendants` on every node below it. Roles are only
//! ever added, never removed, so the order in which rules fire does not
//! change the final role sets.

use crate::node::{add_roles, dedup_roles, has_no_roles};
use crate::roles::Role;
use crate::value::{Fields, Value};
use serde::{Deserialize, Serialize};

/// Which nodes a [`RoleRule`] applies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    /// Every node.
    Any,
    /// Nodes of exactly this type.
    Type(String),
    /// Nodes of any of these types.
    AnyType(Vec<String>),
    /// Nodes stored under this field of their parent.
    Field(String),
    /// Nodes whose field `field` equals `value`.
    FieldIs { field: String, value: Value },
    /// Nodes selected by every inner selector.
    All(Vec<Selector>),
}

impl Selector {
    /// Tests a node, given the name of the parent field holding it.
    pub fn matches(&self, node: &Fields, parent_field: Option<&str>) -> bool {
        match self {
            Selector::Any => true,
            Selector::Type(name) => node_type(node) == Some(name.as_str()),
            Selector::AnyType(names) => node_type(node).is_some_and(|ty| names.iter().any(|n| n == ty)),
            Selector::Field(name) => parent_field == Some(name.as_str()),
            Selector::FieldIs { field, value } => node.get(field) == Some(value),
            Selector::All(inner) => inner.iter().all(|s| s.matches(node, parent_field)),
        }
    }
}

fn node_type(node: &Fields) -> Option<&str> {
    node.get(crate::node::TYPE_KEY).and_then(Value::as_str)
}

/// Adds `roles` to the selected nodes and scopes nested rules below them.
///
/// # Examples
///
/// ```rust
/// use arbor::roles::Role;
/// use arbor::rules::RoleRule;
/// let rule = RoleRule::on_type("Call")
///     .roles([Role::Call, Role::Expression])
///     .children([RoleRule::on_field("callee").roles([Role::Callee])]);
/// assert_eq!(rule.children.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleRule {
    pub selector: Selector,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<Role>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RoleRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub descendants: Vec<RoleRule>,
}

impl RoleRule {
    pub fn on(selector: Selector) -> Self {
        Self {
            selector,
            roles: Vec::new(),
            children: Vec::new(),
            descendants: Vec::new(),
        }
    }

    pub fn on_type(name: &str) -> Self {
        Self::on(Selector::Type(name.to_string()))
    }

    pub fn on_field(name: &str) -> Self {
        Self::on(Selector::Field(name.to_string()))
    }

    pub fn roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.roles.extend(roles);
        self
    }

    pub fn children(mut self, rules: impl IntoIterator<Item = RoleRule>) -> Self {
        self.children.extend(rules);
        self
    }

    pub fn descendants(mut self, rules: impl IntoIterator<Item = RoleRule>) -> Self {
        self.descendants.extend(rules);
        self
    }
}

/// Runs the annotation pass.
///
/// # Examples
///
/// ```rust
/// use arbor::roles::Role;
/// use arbor::rules::{Annotator, RoleRule};
/// use arbor::value::Value;
/// let rules = [RoleRule::on_type("String").roles([Role::Literal, Role::String])];
/// let tree = Value::from_json_str(r#"{"type": "String", "value": "a"}"#).unwrap();
/// let out = Annotator::new(&rules).annotate(tree);
/// assert_eq!(out.roles(), vec![Role::Literal, Role::String]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Annotator<'a> {
    rules: &'a [RoleRule],
    mark_unannotated: bool,
}

impl<'a> Annotator<'a> {
    pub fn new(rules: &'a [RoleRule]) -> Self {
        Self {
            rules,
            mark_unannotated: true,
        }
    }

    /// Whether nodes left without any role get [`Role::Unannotated`].
    pub fn mark_unannotated(mut self, mark: bool) -> Self {
        self.mark_unannotated = mark;
        self
    }

    pub fn annotate(&self, tree: Value) -> Value {
        self.walk(tree, None, &[], &[])
    }

    fn walk(
        &self,
        value: Value,
        parent_field: Option<&str>,
        children: &[&'a RoleRule],
        descendants: &[&'a RoleRule],
    ) -> Value {
        match value {
            Value::List(items) => Value::List(
                items
                    .into_iter()
                    .map(|item| self.walk(item, parent_field, children, descendants))
                    .collect(),
            ),
            Value::Map(fields) if node_type(&fields).is_some() => {
                self.walk_node(fields, parent_field, children, descendants)
            }
            // Plain maps are transparent: their entries count as children of
            // the enclosing node.
            Value::Map(fields) => Value::Map(
                fields
                    .into_iter()
                    .map(|(key, child)| {
                        let child = self.walk(child, Some(&key), children, descendants);
                        (key, child)
                    })
                    .collect(),
            ),
            scalar => scalar,
        }
    }

    fn walk_node(
        &self,
        mut fields: Fields,
        parent_field: Option<&str>,
        children: &[&'a RoleRule],
        descendants: &[&'a RoleRule],
    ) -> Value {
        let mut next_children: Vec<&'a RoleRule> = Vec::new();
        let mut next_descendants: Vec<&'a RoleRule> = descendants.to_vec();

        let candidates = self
            .rules
            .iter()
            .chain(children.iter().copied())
            .chain(descendants.iter().copied());
        for rule in candidates {
            if rule.selector.matches(&fields, parent_field) {
                add_roles(&mut fields, &rule.roles);
                next_children.extend(rule.children.iter());
                for nested in &rule.descendants {
                    if !next_descendants.iter().any(|r| std::ptr::eq(*r, nested)) {
                        next_descendants.push(nested);
                    }
                }
            }
        }
        dedup_roles(&mut fields);
        if self.mark_unannotated && has_no_roles(&fields) {
            add_roles(&mut fields, &[Role::Unannotated]);
        }

        let mut out = Fields::new();
        for (key, child) in fields {
            let child = self.walk(child, Some(&key), &next_children, &next_descendants);
            out.insert(key, child);
        }
        Value::Map(out)
    }
}

/// Convenience wrapper around [`Annotator`].
pub fn annotate(tree: Value, rules: &[RoleRule], mark_unannotated: bool) -> Value {
    Annotator::new(rules)
        .mark_unannotated(mark_unannotated)
        .annotate(tree)
}
