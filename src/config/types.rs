//! Core program types
//!
//! This module defines the data structures that represent a parsed Constfile.

use crate::error::{ExecutionError, ExecutionResult};
use serde::{Deserialize, Serialize};

/// Scope used for variables declared outside any command
pub const GLOBAL_SCOPE: &str = "global";

/// Prefix of the synthetic commands created for lazy expressions
pub const LAZY_PREFIX: &str = "__lazy_";

/// A named value visible inside one scope
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Variable {
    pub name: String,
    pub value: String,
    /// Either `global` or the name of the command that declared it
    pub scope: String,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: impl Into<String>, scope: impl Into<String>) -> Self {
        Variable {
            name: name.into(),
            value: value.into(),
            scope: scope.into(),
        }
    }

    /// Create a variable in the global scope
    pub fn global(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value, GLOBAL_SCOPE)
    }
}

/// A declared command argument
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Argument {
    pub name: String,
    #[serde(default)]
    pub is_optional: bool,
}

impl Argument {
    /// Identifier used on the command line, `<command>:<argument>`
    pub fn flag_name(&self, command: &str) -> String {
        format!("{}:{}", command, self.name)
    }
}

/// Target of a lazy expression
///
/// The synthetic command carrying it is never wired back into the variable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LazyEval {
    pub var_name: String,
    pub scope: String,
}

/// A command definition
///
/// `body` is the declared template; evaluation works on a copy of it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Command {
    pub name: String,

    /// Runs before any requested command
    #[serde(default)]
    pub is_default: bool,

    /// Body may be extended from the external task store
    #[serde(default)]
    pub cloud_accessible: bool,

    /// Prerequisite command names, in declared order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prereqs: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<Argument>,

    #[serde(default)]
    pub body: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lazy_eval: Option<LazyEval>,
}

impl Command {
    /// Create a plain command with the given body
    pub fn new(name: impl Into<String>, body: Vec<String>) -> Self {
        Command {
            name: name.into(),
            is_default: false,
            cloud_accessible: false,
            prereqs: Vec::new(),
            arguments: Vec::new(),
            body,
            lazy_eval: None,
        }
    }

    /// Look up a declared argument by name
    pub fn argument(&self, name: &str) -> Option<&Argument> {
        self.arguments.iter().find(|a| a.name == name)
    }

    /// Whether this command was synthesized from a lazy expression
    pub fn is_synthetic(&self) -> bool {
        self.lazy_eval.is_some()
    }
}

/// The fully parsed representation of a source file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Program {
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub commands: Vec<Command>,
}

impl Program {
    /// Find a command by exact name
    pub fn command(&self, name: &str) -> ExecutionResult<&Command> {
        self.commands
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| ExecutionError::CommandNotFound(name.to_string()))
    }

    /// The command marked as default, if any
    pub fn default_command(&self) -> Option<&Command> {
        self.commands.iter().find(|c| c.is_default)
    }

    /// Commands a user can request, excluding synthetic ones
    pub fn declared_commands(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter().filter(|c| !c.is_synthetic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_lookup() {
        let program = Program {
            variables: vec![],
            commands: vec![Command::new("build", vec!["$ echo hi".to_string()])],
        };

        assert_eq!(program.command("build").unwrap().name, "build");
        assert!(matches!(
            program.command("deploy"),
            Err(ExecutionError::CommandNotFound(name)) if name == "deploy"
        ));
    }

    #[test]
    fn test_default_command() {
        let mut setup = Command::new("_", vec!["echo setup".to_string()]);
        setup.is_default = true;
        let program = Program {
            variables: vec![],
            commands: vec![Command::new("build", vec!["echo build".to_string()]), setup],
        };

        assert_eq!(program.default_command().map(|c| c.name.as_str()), Some("_"));
    }

    #[test]
    fn test_argument_flag_name() {
        let arg = Argument {
            name: "target".to_string(),
            is_optional: false,
        };
        assert_eq!(arg.flag_name("build"), "build:target");
    }

    #[test]
    fn test_program_serializes_to_json() {
        let program = Program {
            variables: vec![Variable::global("x", "1")],
            commands: vec![],
        };
        let json = serde_json::to_string(&program).unwrap();
        assert!(json.contains("\"scope\":\"global\""));
    }
}
