pub use crate::config::{DriverConfig, ErrorPolicy};
pub use crate::engine::{Normalizer, Outcome};
pub use crate::errors::{MismatchKind, NormalizeError, StructuralMismatch};
pub use crate::roles::Role;
pub use crate::rules::RuleTable;
pub use crate::value::Value;

pub mod config;
pub mod engine;
pub mod errors;
pub mod grammars;
pub mod node;
pub mod pattern;
pub mod position;
pub mod roles;
pub mod rules;
pub mod strconv;
pub mod value;
