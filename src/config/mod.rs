//! Source parsing and validation
//!
//! This module turns Constfile text into a [`Program`] and validates its
//! structure. Runtime settings live here too.

pub mod expr;
pub mod lexer;
pub mod parse;
pub mod schema;
pub mod settings;
pub mod types;

// Re-export main types
pub use parse::*;
pub use schema::*;
pub use settings::*;
pub use types::*;
