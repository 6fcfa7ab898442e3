//! Arbor error handling.
//!
//! Hard failures are [`NormalizeError`]s: a `miette` diagnostic carrying a
//! stable code, a help line where one exists, and a labeled span when the
//! failure can be traced to source bytes. Soft failures are
//! [`StructuralMismatch`] warnings, returned alongside the tree rather than
//! logged away.

use crate::pattern::ConstructError;
use crate::position::PositionError;
use crate::strconv::EscapeError;
use miette::{Diagnostic, NamedSource, SourceSpan};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

// ============================================================================
// HARD ERRORS
// ============================================================================

/// Every hard failure of a transformation.
#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum NormalizeError {
    #[error("rule '{rule}' needs binding '{var}', which its match did not produce")]
    #[diagnostic(
        code(arbor::binding_missing),
        help("every variable of the constructing pattern must be bound by the matching pattern")
    )]
    BindingMissing { rule: String, var: String },

    #[error("rule '{rule}' cannot construct its output: {source}")]
    #[diagnostic(code(arbor::construct_failed))]
    ConstructFailed {
        rule: String,
        #[source]
        source: ConstructError,
    },

    #[error("malformed string literal in {node_type} node: {source}")]
    #[diagnostic(code(arbor::escape))]
    Escape {
        node_type: String,
        #[label("malformed literal")]
        span: Option<SourceSpan>,
        #[source]
        source: EscapeError,
    },

    #[error("{source}")]
    #[diagnostic(code(arbor::offset_out_of_range))]
    Position {
        #[label("position out of range")]
        span: Option<SourceSpan>,
        source: PositionError,
    },

    #[error("tree nesting exceeds the limit of {limit} levels")]
    #[diagnostic(
        code(arbor::depth_limit),
        help("raise `max_depth` in the driver configuration if the input is legitimately this deep")
    )]
    DepthLimit { limit: usize },
}

/// Coarse classification of a [`NormalizeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The rule table itself is inconsistent.
    Rule,
    /// A literal in the input could not be decoded.
    Literal,
    /// A coordinate does not fit the source text.
    Position,
    /// The input exceeds configured limits.
    Limit,
}

impl NormalizeError {
    /// Wraps a construction failure with the name of the rule that hit it.
    pub fn from_construct(rule: &str, err: ConstructError) -> Self {
        match err {
            ConstructError::MissingBinding(var) => NormalizeError::BindingMissing {
                rule: rule.to_string(),
                var,
            },
            other => NormalizeError::ConstructFailed {
                rule: rule.to_string(),
                source: other,
            },
        }
    }

    pub fn escape(node_type: &str, span: Option<(usize, usize)>, source: EscapeError) -> Self {
        NormalizeError::Escape {
            node_type: node_type.to_string(),
            span: span.map(|(start, end)| SourceSpan::from((start, end.saturating_sub(start)))),
            source,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::BindingMissing { .. } | Self::ConstructFailed { .. } => ErrorCategory::Rule,
            Self::Escape { .. } => ErrorCategory::Literal,
            Self::Position { .. } => ErrorCategory::Position,
            Self::DepthLimit { .. } => ErrorCategory::Limit,
        }
    }

    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::BindingMissing { .. } => "binding_missing",
            Self::ConstructFailed { .. } => "construct_failed",
            Self::Escape { .. } => "escape",
            Self::Position { .. } => "offset_out_of_range",
            Self::DepthLimit { .. } => "depth_limit",
        }
    }

    /// Fatal errors abort the whole input; the rest only abort one node.
    pub fn is_fatal(&self) -> bool {
        matches!(self.category(), ErrorCategory::Rule | ErrorCategory::Limit)
    }
}

impl From<PositionError> for NormalizeError {
    fn from(source: PositionError) -> Self {
        let span = source.offset().map(|offset| SourceSpan::from((offset, 0)));
        NormalizeError::Position { span, source }
    }
}

/// Attaches the source text to an error for rendering through `miette`.
///
/// # Examples
///
/// ```rust
/// use arbor::errors::{report_with_source, NormalizeError};
/// let err = NormalizeError::DepthLimit { limit: 4 };
/// let report = report_with_source(err, "input.js", "x");
/// assert!(report.to_string().contains("limit of 4"));
/// ```
pub fn report_with_source(
    error: NormalizeError,
    name: impl AsRef<str>,
    source: impl Into<String>,
) -> miette::Report {
    miette::Report::new(error).with_source_code(NamedSource::new(name, source.into()))
}

// ============================================================================
// SOFT WARNINGS
// ============================================================================

/// Why no rule applied to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MismatchKind {
    /// No rule mentions the node's type at all.
    UnknownType,
    /// Rules exist for the type, but none accepted this node's shape.
    ShapeMismatch,
}

/// A node that passed through a rewrite pass unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuralMismatch {
    pub node_type: String,
    pub offset: Option<usize>,
    pub kind: MismatchKind,
}

impl fmt::Display for StructuralMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no rule matched type {}", self.node_type)?;
        if let Some(offset) = self.offset {
            write!(f, " at offset {offset}")?;
        }
        if self.kind == MismatchKind::ShapeMismatch {
            write!(f, " (unexpected shape)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binding_is_lifted_out_of_construct_errors() {
        let err = NormalizeError::from_construct("r", ConstructError::MissingBinding("x".into()));
        assert_eq!(err.code_suffix(), "binding_missing");
        assert_eq!(err.category(), ErrorCategory::Rule);

        let err = NormalizeError::from_construct("r", ConstructError::Wildcard);
        assert_eq!(err.code_suffix(), "construct_failed");
        assert!(err.is_fatal());
    }

    #[test]
    fn escape_and_position_errors_are_node_local() {
        let escape = NormalizeError::escape(
            "StringLiteral",
            Some((4, 9)),
            EscapeError::NotQuoted { raw: "x".into() },
        );
        assert!(!escape.is_fatal());
        assert!(matches!(
            escape,
            NormalizeError::Escape { span: Some(span), .. } if span.offset() == 4 && span.len() == 5
        ));

        let position: NormalizeError = PositionError::NotCharBoundary { offset: 3 }.into();
        assert_eq!(position.category(), ErrorCategory::Position);
        assert!(!position.is_fatal());
    }

    #[test]
    fn mismatch_display() {
        let warning = StructuralMismatch {
            node_type: "BlockStatement".into(),
            offset: None,
            kind: MismatchKind::ShapeMismatch,
        };
        assert_eq!(
            warning.to_string(),
            "no rule matched type BlockStatement (unexpected shape)"
        );
    }
}
