//! Pass execution: applies a list of rules across a whole tree.
//!
//! Traversal is pre-order and single-pass. With [`Dispatch::FirstMatch`] a
//! node is matched first, then the values bound by the match (its children)
//! are rewritten, and finally the output is constructed from the rewritten
//! bindings; structure introduced by the constructing pattern is never
//! visited again. With [`Dispatch::Chain`] every matching rule is applied to
//! the node in turn and the result's fields are visited afterwards.

use super::{Direction, Dispatch, KnownTypes, Rule};
use crate::config::{ErrorPolicy, DEFAULT_MAX_DEPTH};
use crate::errors::{MismatchKind, NormalizeError, StructuralMismatch};
use crate::pattern::{match_pattern, Bindings};
use crate::value::{Fields, Value};

/// Node-local errors and warnings collected by a pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    pub errors: Vec<NormalizeError>,
    pub warnings: Vec<StructuralMismatch>,
}

impl PassReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    pub fn merge(&mut self, other: PassReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// Runs one pass of rules over a tree.
///
/// # Examples
///
/// ```rust
/// use arbor::pattern::*;
/// use arbor::rules::{Direction, Dispatch, PassRunner, Rule};
/// use arbor::value::Value;
/// let rules = vec![Rule::new(
///     "drop extra",
///     part("rest", [field("extra", any())]),
///     part("rest", []),
/// )];
/// let tree = Value::from_json_str(r#"{"type": "A", "extra": 1, "b": {"type": "B", "extra": 2}}"#).unwrap();
/// let mut pass = PassRunner::new(&rules, Direction::ToCanonical, Dispatch::Chain);
/// let out = pass.run(tree).unwrap();
/// assert_eq!(out.get("extra"), None);
/// assert_eq!(out.get("b").and_then(|b| b.get("extra")), None);
/// ```
#[derive(Debug)]
pub struct PassRunner<'a> {
    rules: &'a [Rule],
    direction: Direction,
    dispatch: Dispatch,
    policy: ErrorPolicy,
    max_depth: usize,
    known: Option<&'a KnownTypes>,
    report: PassReport,
}

impl<'a> PassRunner<'a> {
    pub fn new(rules: &'a [Rule], direction: Direction, dispatch: Dispatch) -> Self {
        Self {
            rules,
            direction,
            dispatch,
            policy: ErrorPolicy::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            known: None,
            report: PassReport::default(),
        }
    }

    pub fn policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Records a [`StructuralMismatch`] for every node no rule applied to.
    pub fn report_mismatches(mut self, known: &'a KnownTypes) -> Self {
        self.known = Some(known);
        self
    }

    /// Rewrites `tree`. An `Err` is fatal; node-local errors land in the report.
    pub fn run(&mut self, tree: Value) -> Result<Value, NormalizeError> {
        self.visit(tree, 0)
    }

    pub fn report(&self) -> &PassReport {
        &self.report
    }

    pub fn into_report(self) -> PassReport {
        self.report
    }

    // ------------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------------

    fn visit(&mut self, value: Value, depth: usize) -> Result<Value, NormalizeError> {
        if depth > self.max_depth {
            return Err(NormalizeError::DepthLimit {
                limit: self.max_depth,
            });
        }
        match value {
            Value::List(items) => items
                .into_iter()
                .map(|item| self.visit(item, depth + 1))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Value::Map(_) if value.is_node() => match self.dispatch {
                Dispatch::FirstMatch => self.visit_first_match(value, depth),
                Dispatch::Chain => self.visit_chain(value, depth),
            },
            Value::Map(fields) => self.visit_fields(fields, depth),
            scalar => Ok(scalar),
        }
    }

    fn visit_fields(&mut self, fields: Fields, depth: usize) -> Result<Value, NormalizeError> {
        let mut out = Fields::new();
        for (key, child) in fields {
            let child = self.visit(child, depth + 1)?;
            out.insert(key, child);
        }
        Ok(Value::Map(out))
    }

    fn visit_first_match(&mut self, node: Value, depth: usize) -> Result<Value, NormalizeError> {
        let (rule, bindings) = match self.first_match(&node) {
            Ok(Some(found)) => found,
            Ok(None) => {
                self.note_mismatch(&node);
                return self.pass_through(node, depth);
            }
            Err(err) => return self.isolate(err, node, depth),
        };
        tracing::trace!(
            rule = %rule.name,
            node_type = node.node_type().unwrap_or_default(),
            "rule applied"
        );
        // A remainder map still holds the node's own type tag; only its
        // fields are rewritten, or the node would match itself again.
        let (matcher, _) = rule.sides(self.direction);
        let rests = matcher.rest_vars();
        let bindings = bindings.try_map(|name, bound| {
            if rests.contains(name) {
                self.pass_through(bound, depth)
            } else {
                self.visit(bound, depth + 1)
            }
        })?;
        rule.build(self.direction, &bindings)
    }

    fn visit_chain(&mut self, node: Value, depth: usize) -> Result<Value, NormalizeError> {
        let mut current = node;
        for rule in self.rules {
            match rule.apply(self.direction, &current) {
                Ok(Some(out)) => {
                    tracing::trace!(rule = %rule.name, "rule applied");
                    current = out;
                }
                Ok(None) => {}
                Err(err) => return self.isolate(err, current, depth),
            }
        }
        self.pass_through(current, depth)
    }

    fn pass_through(&mut self, value: Value, depth: usize) -> Result<Value, NormalizeError> {
        match value {
            Value::Map(fields) => self.visit_fields(fields, depth),
            other => self.visit(other, depth + 1),
        }
    }

    fn first_match(&self, node: &Value) -> Result<Option<(&'a Rule, Bindings)>, NormalizeError> {
        let rules = self.rules;
        for rule in rules {
            let (matcher, _) = rule.sides(self.direction);
            match match_pattern(matcher, node) {
                Ok(Some(bindings)) => return Ok(Some((rule, bindings))),
                Ok(None) => {}
                Err(err) => {
                    let node_type = node.node_type().unwrap_or("<value>");
                    let span = node.start_offset().zip(node.end_offset());
                    return Err(NormalizeError::escape(node_type, span, err));
                }
            }
        }
        Ok(None)
    }

    /// Records a node-local error and leaves the node untransformed, unless
    /// the error is fatal or the policy says to abort.
    fn isolate(
        &mut self,
        err: NormalizeError,
        node: Value,
        depth: usize,
    ) -> Result<Value, NormalizeError> {
        if err.is_fatal() || self.policy == ErrorPolicy::Abort {
            return Err(err);
        }
        tracing::warn!(error = %err, "node left untransformed");
        self.report.errors.push(err);
        self.pass_through(node, depth)
    }

    fn note_mismatch(&mut self, node: &Value) {
        let Some(known) = self.known else {
            return;
        };
        let node_type = node.node_type().unwrap_or_default();
        let kind = if known.native.contains(node_type) {
            MismatchKind::ShapeMismatch
        } else if known.canonical.contains(node_type) {
            return;
        } else {
            MismatchKind::UnknownType
        };
        tracing::debug!(node_type, ?kind, "no rule matched type {node_type}");
        self.report.warnings.push(StructuralMismatch {
            node_type: node_type.to_string(),
            offset: node.start_offset(),
            kind,
        });
    }
}
