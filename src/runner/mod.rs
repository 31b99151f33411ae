//! Command evaluation engine
//!
//! This module resolves variables, substitutes command bodies, runs them
//! through a shell and schedules top-level commands.

pub mod context;
pub mod evaluate;
pub mod scheduler;
pub mod scope;
pub mod shell;
pub mod substitute;

// Re-export main types
pub use context::*;
pub use evaluate::*;
pub use scheduler::*;
pub use scope::*;
pub use shell::*;
pub use substitute::*;
