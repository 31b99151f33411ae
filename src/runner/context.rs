//! Execution context for command evaluation
//!
//! The context carries everything evaluation reads but never changes:
//! verbosity and the argument values supplied on the command line.

use colored::Colorize;
use std::collections::HashMap;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent = 0,
    Quiet = 1,
    Normal = 2,
    Verbose = 3,
}

/// Values supplied for declared command arguments, keyed by
/// `(command, argument)`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentValues {
    values: HashMap<(String, String), String>,
}

impl ArgumentValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, command: impl Into<String>, argument: impl Into<String>, value: impl Into<String>) {
        self.values
            .insert((command.into(), argument.into()), value.into());
    }

    /// Supplied value, or an empty string when none was given
    pub fn get(&self, command: &str, argument: &str) -> &str {
        self.values
            .get(&(command.to_string(), argument.to_string()))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Execution context shared by every evaluation in a run
#[derive(Debug, Clone)]
pub struct Context {
    /// Argument values from the command line
    pub arguments: ArgumentValues,

    /// Verbosity level
    pub verbosity: Verbosity,
}

impl Context {
    /// Create a new context with default settings
    pub fn new() -> Self {
        Context {
            arguments: ArgumentValues::new(),
            verbosity: Verbosity::Normal,
        }
    }

    /// Set argument values
    pub fn with_arguments(mut self, arguments: ArgumentValues) -> Self {
        self.arguments = arguments;
        self
    }

    /// Set verbosity level
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Print the captured output of a body line
    pub fn print_output(&self, output: &str) {
        if self.verbosity >= Verbosity::Quiet {
            let output = output.trim_end();
            if !output.is_empty() {
                println!("{}", output);
            }
        }
    }

    /// Echo a line about to run (only in verbose mode)
    pub fn print_run(&self, command: &str, line: &str) {
        if self.verbosity >= Verbosity::Verbose {
            eprintln!("{} {} {}", "[RUN]".blue(), command.cyan(), line.green());
        }
    }

    /// Print task start message
    pub fn print_task_start(&self, command: &str) {
        if self.verbosity >= Verbosity::Verbose {
            eprintln!("{} {}", "[TASK]".blue(), command.bold());
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
