//! Shell invocation
//!
//! Each body line runs as `<interpreter...> <line>` and its standard output
//! is captured as text.

use crate::error::{ExecutionError, ExecutionResult};
use std::path::PathBuf;
use std::process::{Command as StdCommand, Stdio};

/// Capability to run a single body line
pub trait ShellRunner: Send + Sync {
    /// Run `line` to completion and return its standard output
    fn run_line(&self, line: &str) -> ExecutionResult<String>;
}

/// Platform shell prefix: `/bin/bash -c` or `cmd /c`
pub fn default_interpreter() -> Vec<String> {
    if cfg!(target_os = "windows") {
        vec!["cmd".to_string(), "/c".to_string()]
    } else {
        vec!["/bin/bash".to_string(), "-c".to_string()]
    }
}

/// Runs lines through a real shell process
#[derive(Debug, Clone)]
pub struct SystemShell {
    /// Interpreter and its leading arguments, e.g. `["/bin/bash", "-c"]`
    pub interpreter: Vec<String>,

    /// Working directory for spawned processes
    pub working_dir: Option<PathBuf>,
}

impl SystemShell {
    pub fn new() -> Self {
        SystemShell {
            interpreter: default_interpreter(),
            working_dir: None,
        }
    }

    /// Set the interpreter
    pub fn with_interpreter(mut self, interpreter: Vec<String>) -> Self {
        if !interpreter.is_empty() {
            self.interpreter = interpreter;
        }
        self
    }

    /// Run processes in a specific directory
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }

    fn build(&self, line: &str) -> StdCommand {
        let (program, prefix) = match self.interpreter.split_first() {
            Some((program, prefix)) => (program.as_str(), prefix),
            None => ("/bin/bash", &[][..]),
        };

        let mut command = StdCommand::new(program);
        command.args(prefix).arg(line);

        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        command
    }
}

impl Default for SystemShell {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellRunner for SystemShell {
    fn run_line(&self, line: &str) -> ExecutionResult<String> {
        let output = self.build(line).output().map_err(|e| ExecutionError::Spawn {
            line: line.to_string(),
            error: e.to_string(),
        })?;

        if !output.status.success() {
            return Err(ExecutionError::ProcessFailed {
                line: line.to_string(),
                status: output.status.to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| ExecutionError::InvalidUtf8(line.to_string()))
    }
}
