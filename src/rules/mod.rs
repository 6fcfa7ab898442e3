//! # Rule Tables
//!
//! A [`RuleTable`] is the static, grammar-specific configuration that the
//! engine executes: an ordered list of preprocessing rules, an ordered list
//! of normalization rules, and the role annotation rules.
//!
//! ## Passes
//!
//! - **Preprocess** (native → native, [`Dispatch::Chain`]): cleanup such as
//!   dropping fields that duplicate information captured elsewhere.
//! - **Normalize** (native → canonical, [`Dispatch::FirstMatch`]): type and
//!   shape conversion. Run backwards it rebuilds native trees.
//! - **Annotate** (canonical, role-only): see [`Annotator`].
//!
//! Tables are built once and shared read-only; nothing here is mutated after
//! construction.

pub mod annotate;
pub mod apply;

pub use annotate::{annotate, Annotator, RoleRule, Selector};
pub use apply::{PassReport, PassRunner};

use crate::config::{read_config_file, ConfigError};
use crate::errors::NormalizeError;
use crate::node::add_roles;
use crate::pattern::{self, construct, match_pattern, Pattern};
use crate::roles::Role;
use crate::value::Value;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// Which way a rule is run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Match the native pattern, construct the canonical one.
    ToCanonical,
    /// Match the canonical pattern, construct the native one.
    ToNative,
}

/// How rules of one pass combine on a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dispatch {
    /// Every matching rule applies in declared order, each to the previous output.
    Chain,
    /// Only the first matching rule applies.
    FirstMatch,
}

/// A pair of patterns sharing one variable namespace.
///
/// # Examples
///
/// ```rust
/// use arbor::pattern::*;
/// use arbor::rules::{Direction, Rule};
/// use arbor::value::Value;
/// let rule = Rule::new(
///     "identifier",
///     node("Ident", [field("name", var("n"))]),
///     node("Identifier", [field("name", var("n"))]),
/// );
/// let native = Value::map([("type", Value::from("Ident")), ("name", Value::from("x"))]);
/// let out = rule.apply(Direction::ToCanonical, &native).unwrap().unwrap();
/// assert_eq!(out.node_type(), Some("Identifier"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub native: Pattern,
    pub canonical: Pattern,
    /// Roles attached to the canonical node this rule constructs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<Role>,
}

impl Rule {
    pub fn new(name: &str, native: Pattern, canonical: Pattern) -> Self {
        Self {
            name: name.to_string(),
            native,
            canonical,
            roles: Vec::new(),
        }
    }

    /// Maps one native node type onto one canonical node type, carrying
    /// positions across.
    pub fn map_node(
        name: &str,
        native_type: &str,
        canonical_type: &str,
        native_fields: impl IntoIterator<Item = pattern::FieldPattern>,
        canonical_fields: impl IntoIterator<Item = pattern::FieldPattern>,
    ) -> Self {
        Self::new(
            name,
            pattern::positioned_node(native_type, native_fields),
            pattern::positioned_node(canonical_type, canonical_fields),
        )
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.roles.extend(roles);
        self
    }

    /// Returns `(matcher, constructor)` for a direction.
    pub fn sides(&self, direction: Direction) -> (&Pattern, &Pattern) {
        match direction {
            Direction::ToCanonical => (&self.native, &self.canonical),
            Direction::ToNative => (&self.canonical, &self.native),
        }
    }

    /// Applies the rule to one value without descending into its children.
    ///
    /// Returns `Ok(None)` when the rule does not match.
    pub fn apply(&self, direction: Direction, value: &Value) -> Result<Option<Value>, NormalizeError> {
        let (matcher, _) = self.sides(direction);
        let bindings = match match_pattern(matcher, value) {
            Ok(Some(bindings)) => bindings,
            Ok(None) => return Ok(None),
            Err(err) => {
                let node_type = value.node_type().unwrap_or("<value>");
                let span = value.start_offset().zip(value.end_offset());
                return Err(NormalizeError::escape(node_type, span, err));
            }
        };
        self.build(direction, &bindings).map(Some)
    }

    /// Runs the constructing side over `bindings`.
    pub fn build(
        &self,
        direction: Direction,
        bindings: &pattern::Bindings,
    ) -> Result<Value, NormalizeError> {
        let (_, constructor) = self.sides(direction);
        let out = construct(constructor, bindings)
            .map_err(|err| NormalizeError::from_construct(&self.name, err))?;
        match out {
            Value::Map(mut fields) if direction == Direction::ToCanonical && !self.roles.is_empty() => {
                add_roles(&mut fields, &self.roles);
                Ok(Value::Map(fields))
            }
            other => Ok(other),
        }
    }
}

/// Type names a table knows about, used to classify unmatched nodes.
#[derive(Debug, Clone, Default)]
pub struct KnownTypes {
    /// Types matched at the root of some native pattern.
    pub native: BTreeSet<String>,
    /// Types emitted anywhere by some canonical pattern.
    pub canonical: BTreeSet<String>,
}

/// The ordered, static rule set for one source grammar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleTable {
    pub namespace: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub preprocess: Vec<Rule>,
    #[serde(default)]
    pub normalize: Vec<Rule>,
    #[serde(default)]
    pub annotations: Vec<RoleRule>,
    #[serde(skip)]
    known: OnceCell<KnownTypes>,
}

fn default_version() -> u32 {
    1
}

// ============================================================================
// PUBLIC API IMPLEMENTATION
// ============================================================================

impl RuleTable {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            version: default_version(),
            preprocess: Vec::new(),
            normalize: Vec::new(),
            annotations: Vec::new(),
            known: OnceCell::new(),
        }
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn preprocess(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.preprocess.extend(rules);
        self
    }

    pub fn normalize(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.normalize.extend(rules);
        self
    }

    pub fn annotations(mut self, rules: impl IntoIterator<Item = RoleRule>) -> Self {
        self.annotations.extend(rules);
        self
    }

    /// Native and canonical type names mentioned by the normalization rules.
    pub fn known_types(&self) -> &KnownTypes {
        self.known.get_or_init(|| {
            let mut known = KnownTypes::default();
            for rule in &self.normalize {
                known.native.extend(rule.native.root_types());
                known.canonical.extend(rule.canonical.node_types());
            }
            known
        })
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Loads a rule table file; `.json` files are read as JSON, anything else as YAML.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let (text, is_json) = read_config_file(path.as_ref())?;
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_yaml_str(&text)
        }
    }
}
