//! # Engine
//!
//! [`Normalizer`] ties a [`RuleTable`] and a [`DriverConfig`] together and
//! runs the passes in order:
//!
//! ```text
//! native ─▶ positions ─▶ Preprocess ─▶ Normalize ─▶ Annotate ─▶ canonical
//! canonical ─▶ strip roles/pos ─▶ Normalize (reversed) ─▶ native
//! ```
//!
//! Every entry point returns an [`Outcome`]: the tree plus whatever errors
//! and warnings were collected. A fatal error stops the run and the outcome
//! carries the output of the last pass that completed.

use crate::config::{DriverConfig, ErrorPolicy};
use crate::errors::{NormalizeError, StructuralMismatch};
use crate::node::{check_depth, strip_annotations};
use crate::position::{fill_positions, SourceIndex};
use crate::rules::{Annotator, Direction, Dispatch, PassReport, PassRunner, Rule, RuleTable};
use crate::value::Value;

// ============================================================================
// OUTCOME
// ============================================================================

/// Result of one transformation.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub tree: Value,
    pub errors: Vec<NormalizeError>,
    pub warnings: Vec<StructuralMismatch>,
    aborted: bool,
}

impl Outcome {
    fn new(tree: Value) -> Self {
        Self {
            tree,
            errors: Vec::new(),
            warnings: Vec::new(),
            aborted: false,
        }
    }

    /// True when no error was recorded. Warnings do not count.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// True when an error stopped the run before its last pass.
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Drops the warnings and turns recorded errors into an `Err`.
    pub fn into_result(self) -> Result<Value, Vec<NormalizeError>> {
        if self.errors.is_empty() {
            Ok(self.tree)
        } else {
            Err(self.errors)
        }
    }

    fn absorb(&mut self, report: PassReport) {
        self.errors.extend(report.errors);
        self.warnings.extend(report.warnings);
    }
}

// ============================================================================
// NORMALIZER
// ============================================================================

/// Runs a rule table over trees, in either direction.
///
/// A normalizer only borrows its table, so one table can serve any number of
/// normalizers, on any number of threads.
///
/// # Examples
///
/// ```rust
/// use arbor::engine::Normalizer;
/// use arbor::grammars::JAVASCRIPT;
/// use arbor::value::Value;
/// let native = Value::from_json_str(r#"{"type": "StringLiteral", "value": "'a'"}"#).unwrap();
/// let outcome = Normalizer::new(&JAVASCRIPT).to_canonical(native);
/// assert!(outcome.is_ok());
/// assert_eq!(outcome.tree.node_type(), Some("String"));
/// assert_eq!(outcome.tree.get("value"), Some(&Value::from("a")));
/// ```
#[derive(Debug, Clone)]
pub struct Normalizer<'t> {
    table: &'t RuleTable,
    config: DriverConfig,
}

impl<'t> Normalizer<'t> {
    pub fn new(table: &'t RuleTable) -> Self {
        Self::with_config(table, DriverConfig::default())
    }

    pub fn with_config(table: &'t RuleTable, config: DriverConfig) -> Self {
        Self { table, config }
    }

    pub fn table(&self) -> &'t RuleTable {
        self.table
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Converts a native tree into its canonical, annotated form.
    pub fn to_canonical(&self, native: Value) -> Outcome {
        let span = tracing::debug_span!(
            "to_canonical",
            namespace = %self.table.namespace,
            version = self.table.version
        );
        let _enter = span.enter();
        self.forward(Outcome::new(native))
    }

    /// Like [`Normalizer::to_canonical`], but first completes node positions
    /// against `source` as configured by [`DriverConfig::position_fill`].
    pub fn to_canonical_with_source(&self, native: Value, source: &str) -> Outcome {
        let span = tracing::debug_span!(
            "to_canonical",
            namespace = %self.table.namespace,
            version = self.table.version,
            source_len = source.len()
        );
        let _enter = span.enter();

        let native = match self.guard_depth(native) {
            Ok(tree) => tree,
            Err(outcome) => return outcome,
        };
        let index = SourceIndex::new(source);
        let mut position_errors = Vec::new();
        let tree = fill_positions(native, &index, self.config.position_fill, &mut position_errors);
        let mut outcome = Outcome::new(tree);
        for err in position_errors {
            tracing::warn!(error = %err, "position left unfilled");
            outcome.errors.push(err.into());
        }
        if !outcome.errors.is_empty() && self.config.error_policy == ErrorPolicy::Abort {
            outcome.aborted = true;
            return outcome;
        }
        self.forward(outcome)
    }

    /// Rebuilds a native tree from a canonical one.
    ///
    /// Roles and line/column data are dropped first; preprocessing is not
    /// undone, so fields it removed stay absent.
    pub fn to_native(&self, canonical: Value) -> Outcome {
        let span = tracing::debug_span!(
            "to_native",
            namespace = %self.table.namespace,
            version = self.table.version
        );
        let _enter = span.enter();

        let canonical = match self.guard_depth(canonical) {
            Ok(tree) => tree,
            Err(outcome) => return outcome,
        };
        let mut outcome = Outcome::new(strip_annotations(canonical));
        let runner = self.runner(&self.table.normalize, Direction::ToNative, Dispatch::FirstMatch);
        self.run_pass(&mut outcome, runner);
        outcome
    }

    fn forward(&self, mut outcome: Outcome) -> Outcome {
        let preprocess = self.runner(&self.table.preprocess, Direction::ToCanonical, Dispatch::Chain);
        if !self.run_pass(&mut outcome, preprocess) {
            return outcome;
        }

        let normalize = self
            .runner(&self.table.normalize, Direction::ToCanonical, Dispatch::FirstMatch)
            .report_mismatches(self.table.known_types());
        if !self.run_pass(&mut outcome, normalize) {
            return outcome;
        }

        let annotator =
            Annotator::new(&self.table.annotations).mark_unannotated(self.config.mark_unannotated);
        outcome.tree = annotator.annotate(outcome.tree);
        outcome
    }

    /// Rejects trees deeper than `max_depth` before the walks that run ahead
    /// of the rule passes. A rejected tree comes back unchanged.
    fn guard_depth(&self, tree: Value) -> Result<Value, Outcome> {
        match check_depth(&tree, self.config.max_depth) {
            Ok(()) => Ok(tree),
            Err(err) => {
                tracing::debug!(error = %err, "input rejected");
                let mut outcome = Outcome::new(tree);
                outcome.errors.push(err);
                outcome.aborted = true;
                Err(outcome)
            }
        }
    }

    fn runner<'r>(&self, rules: &'r [Rule], direction: Direction, dispatch: Dispatch) -> PassRunner<'r> {
        PassRunner::new(rules, direction, dispatch)
            .policy(self.config.error_policy)
            .max_depth(self.config.max_depth)
    }

    /// Runs one pass over `outcome.tree`. Returns false when it aborted, in
    /// which case the tree is left as the previous pass produced it.
    fn run_pass(&self, outcome: &mut Outcome, mut runner: PassRunner<'_>) -> bool {
        match runner.run(outcome.tree.clone()) {
            Ok(tree) => {
                outcome.tree = tree;
                outcome.absorb(runner.into_report());
                true
            }
            Err(err) => {
                tracing::debug!(error = %err, "pass aborted");
                outcome.absorb(runner.into_report());
                outcome.errors.push(err);
                outcome.aborted = true;
                false
            }
        }
    }
}
