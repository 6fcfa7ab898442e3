//! Conversion between byte offsets and 1-based line/column positions.
//!
//! Columns count code points, not bytes. Coordinates outside the source are
//! reported, never clamped.

use crate::node::{END_KEY, POS_KEY, START_KEY};
use crate::value::{Fields, Value};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when a coordinate does not fit the source text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("offset {offset} is outside the source ({len} bytes)")]
    OffsetOutOfRange { offset: usize, len: usize },
    #[error("offset {offset} falls inside a multi-byte character")]
    NotCharBoundary { offset: usize },
    #[error("line {line}, column {col} is outside the source")]
    LineColOutOfRange { line: usize, col: usize },
}

impl PositionError {
    /// Byte offset the error refers to, when it has one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            PositionError::OffsetOutOfRange { offset, .. }
            | PositionError::NotCharBoundary { offset } => Some(*offset),
            PositionError::LineColOutOfRange { .. } => None,
        }
    }
}

/// A 1-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCol {
    pub line: usize,
    pub col: usize,
}

impl LineCol {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

/// A fully resolved position: offset plus line/column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub col: usize,
}

impl Position {
    pub fn to_value(self) -> Value {
        Value::map([
            ("offset", Value::from(self.offset)),
            ("line", Value::from(self.line)),
            ("col", Value::from(self.col)),
        ])
    }

    /// Reads a position map; `offset` may be absent when only line/column are known.
    fn line_col_of(value: &Value) -> Option<LineCol> {
        let line = value.get("line")?.as_int()?;
        let col = value.get("col")?.as_int()?;
        Some(LineCol::new(
            usize::try_from(line).ok()?,
            usize::try_from(col).ok()?,
        ))
    }
}

/// How positions are completed on a native tree before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PositionFill {
    /// Leave positions as the parser produced them.
    None,
    /// Compute `pos` line/column from `start`/`end` offsets.
    #[default]
    LineColFromOffset,
    /// Compute `start`/`end` offsets from `pos` line/column.
    OffsetFromLineCol,
}

// ============================================================================
// SOURCE INDEX
// ============================================================================

/// Line-start table over a source text.
///
/// # Examples
///
/// ```rust
/// use arbor::position::{LineCol, SourceIndex};
/// let index = SourceIndex::new("ab\ncd");
/// assert_eq!(index.offset_to_line_col(3).unwrap(), LineCol::new(2, 1));
/// assert_eq!(index.line_col_to_offset(LineCol::new(2, 2)).unwrap(), 4);
/// assert!(index.offset_to_line_col(6).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct SourceIndex<'s> {
    source: &'s str,
    line_starts: Vec<usize>,
}

impl<'s> SourceIndex<'s> {
    pub fn new(source: &'s str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            source,
            line_starts,
        }
    }

    pub fn source(&self) -> &'s str {
        self.source
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Converts a byte offset (`0..=len`) into a line and code-point column.
    pub fn offset_to_line_col(&self, offset: usize) -> Result<LineCol, PositionError> {
        if offset > self.source.len() {
            return Err(PositionError::OffsetOutOfRange {
                offset,
                len: self.source.len(),
            });
        }
        if !self.source.is_char_boundary(offset) {
            return Err(PositionError::NotCharBoundary { offset });
        }
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];
        let col = self.source[line_start..offset].chars().count() + 1;
        Ok(LineCol::new(line + 1, col))
    }

    /// Converts a line and code-point column into a byte offset.
    ///
    /// The column may point one past the last character of a line.
    pub fn line_col_to_offset(&self, at: LineCol) -> Result<usize, PositionError> {
        let out_of_range = PositionError::LineColOutOfRange {
            line: at.line,
            col: at.col,
        };
        if at.line == 0 || at.col == 0 || at.line > self.line_starts.len() {
            return Err(out_of_range);
        }
        let line_start = self.line_starts[at.line - 1];
        let line_end = self
            .line_starts
            .get(at.line)
            .map(|next| next - 1)
            .unwrap_or(self.source.len());
        let line_text = &self.source[line_start..line_end];

        let mut chars = line_text.char_indices().map(|(i, _)| i);
        match chars.nth(at.col - 1) {
            Some(rel) => Ok(line_start + rel),
            None if at.col - 1 == line_text.chars().count() => Ok(line_end),
            None => Err(out_of_range),
        }
    }

    pub fn position(&self, offset: usize) -> Result<Position, PositionError> {
        let lc = self.offset_to_line_col(offset)?;
        Ok(Position {
            offset,
            line: lc.line,
            col: lc.col,
        })
    }
}

// ============================================================================
// TREE PASS
// ============================================================================

/// Completes node positions across a whole tree.
///
/// Nodes whose coordinates do not fit the source are left without the derived
/// fields and the error is appended to `errors`.
pub fn fill_positions(
    tree: Value,
    index: &SourceIndex<'_>,
    mode: PositionFill,
    errors: &mut Vec<PositionError>,
) -> Value {
    if mode == PositionFill::None {
        return tree;
    }
    fill_value(tree, index, mode, errors)
}

fn fill_value(
    value: Value,
    index: &SourceIndex<'_>,
    mode: PositionFill,
    errors: &mut Vec<PositionError>,
) -> Value {
    match value {
        Value::List(items) => Value::List(
            items
                .into_iter()
                .map(|item| fill_value(item, index, mode, errors))
                .collect(),
        ),
        Value::Map(fields) => {
            let is_node = fields.get(crate::node::TYPE_KEY).and_then(Value::as_str).is_some();
            let mut out: Fields = fields
                .into_iter()
                .map(|(k, v)| {
                    let v = fill_value(v, index, mode, errors);
                    (k, v)
                })
                .collect();
            if is_node {
                let filled = match mode {
                    PositionFill::LineColFromOffset => line_col_from_offset(&out, index),
                    PositionFill::OffsetFromLineCol => offset_from_line_col(&out, index),
                    PositionFill::None => Ok(None),
                };
                match filled {
                    Ok(Some(updates)) => out.extend(updates),
                    Ok(None) => {}
                    Err(err) => errors.push(err),
                }
            }
            Value::Map(out)
        }
        scalar => scalar,
    }
}

fn offset_of(fields: &Fields, key: &str) -> Option<usize> {
    fields
        .get(key)
        .and_then(Value::as_int)
        .and_then(|n| usize::try_from(n).ok())
}

fn line_col_from_offset(
    fields: &Fields,
    index: &SourceIndex<'_>,
) -> Result<Option<Fields>, PositionError> {
    let mut pos = Fields::new();
    if let Some(start) = offset_of(fields, START_KEY) {
        pos.insert(START_KEY.to_string(), index.position(start)?.to_value());
    }
    if let Some(end) = offset_of(fields, END_KEY) {
        pos.insert(END_KEY.to_string(), index.position(end)?.to_value());
    }
    if pos.is_empty() {
        return Ok(None);
    }
    Ok(Some(Fields::unit(POS_KEY.to_string(), Value::Map(pos))))
}

fn offset_from_line_col(
    fields: &Fields,
    index: &SourceIndex<'_>,
) -> Result<Option<Fields>, PositionError> {
    let Some(pos) = fields.get(POS_KEY) else {
        return Ok(None);
    };
    let mut updates = Fields::new();
    let mut resolved = Fields::new();
    for key in [START_KEY, END_KEY] {
        let Some(lc) = pos.get(key).and_then(Position::line_col_of) else {
            continue;
        };
        let offset = index.line_col_to_offset(lc)?;
        resolved.insert(
            key.to_string(),
            Position {
                offset,
                line: lc.line,
                col: lc.col,
            }
            .to_value(),
        );
        updates.insert(key.to_string(), Value::from(offset));
    }
    if updates.is_empty() {
        return Ok(None);
    }
    updates.insert(POS_KEY.to_string(), Value::Map(resolved));
    Ok(Some(updates))
}
