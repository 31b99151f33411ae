//! Runtime settings
//!
//! Resolved from built-in defaults, then a `.env` file, then `CONSTRUCT_*`
//! environment variables. The CLI applies its flags on top.

use crate::runner::{default_interpreter, Verbosity};
use std::env;
use std::path::PathBuf;

pub const ENV_FILE: &str = "CONSTRUCT_FILE";
pub const ENV_STORE: &str = "CONSTRUCT_STORE";
pub const ENV_INTERPRETER: &str = "CONSTRUCT_INTERPRETER";
pub const ENV_CONCURRENT: &str = "CONSTRUCT_CONCURRENT";

/// Settings for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Explicit source file; discovered when unset
    pub file: Option<PathBuf>,

    /// Explicit task store file; looked up next to the source when unset
    pub store: Option<PathBuf>,

    /// Argument prefix each body line is appended to
    pub interpreter: Vec<String>,

    /// Dispatch requested commands concurrently
    pub concurrent: bool,

    /// Write the diagram artifact and dump the parsed program
    pub debug: bool,

    pub verbosity: Verbosity,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            file: None,
            store: None,
            interpreter: default_interpreter(),
            concurrent: false,
            debug: false,
            verbosity: Verbosity::Normal,
        }
    }
}

impl Settings {
    /// Load `.env` (if any) and read settings from the process environment
    pub fn from_env() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => log::debug!("loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => log::warn!("failed to load .env: {}", e),
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Settings::default();

        if let Some(file) = lookup(ENV_FILE).filter(|v| !v.is_empty()) {
            settings.file = Some(PathBuf::from(file));
        }

        if let Some(store) = lookup(ENV_STORE).filter(|v| !v.is_empty()) {
            settings.store = Some(PathBuf::from(store));
        }

        if let Some(interpreter) = lookup(ENV_INTERPRETER) {
            let parts: Vec<String> = interpreter.split_whitespace().map(String::from).collect();
            if !parts.is_empty() {
                settings.interpreter = parts;
            }
        }

        if let Some(concurrent) = lookup(ENV_CONCURRENT) {
            settings.concurrent = parse_flag(&concurrent);
        }

        settings
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
