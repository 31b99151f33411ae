//! Construct - a Make-like task runner
//!
//! Commands, their arguments and prerequisites are declared in a
//! `Constfile`. Construct parses the file into a [`config::Program`],
//! substitutes variables and arguments into command bodies and runs each
//! line through a shell.

pub mod cli;
pub mod config;
pub mod debug;
pub mod error;
pub mod runner;
pub mod store;

// Re-export commonly used types
pub use error::{ConstructError, Result};

/// Current version of Construct
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
