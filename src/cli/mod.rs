//! CLI interface and argument parsing
//!
//! The clap command is built from the parsed source so every declared
//! argument gets its own `--<command>:<argument>` option.

pub mod app;

pub use app::*;
