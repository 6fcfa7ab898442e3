//! Built-in rule tables.
//!
//! Each grammar is plain rule content for the engine; nothing in
//! [`crate::engine`] knows about any particular language.

pub mod javascript;

pub use javascript::JAVASCRIPT;
