//! Body substitution
//!
//! Two rules apply to every line:
//! - `$`-lines are split into whitespace tokens. A token containing `&` is
//!   replaced whole by the variable named after an `&`; a token equal to
//!   a declared argument name is replaced by that argument's value. The
//!   `$` itself is dropped.
//! - Every `&` followed by letters is a reference; the first occurrence of
//!   `&name` in the line is replaced when `name` resolves.
//!
//! Unresolved references stay as literal text. A missing value for a
//! non-optional argument fails the substitution.

use crate::config::{Argument, Command};
use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::{ArgumentValues, Bindings};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// `&` followed by a run of letters
    static ref REFERENCE: Regex = Regex::new(r"&(\p{L}+)").unwrap();
}

/// Everything a substitution pass reads
pub struct Substitution<'a> {
    pub command: &'a Command,
    pub bindings: &'a Bindings<'a>,
    pub arguments: &'a ArgumentValues,
}

impl<'a> Substitution<'a> {
    pub fn new(command: &'a Command, bindings: &'a Bindings<'a>, arguments: &'a ArgumentValues) -> Self {
        Substitution {
            command,
            bindings,
            arguments,
        }
    }

    /// Substitute every non-empty line of `body`
    pub fn body(&self, body: &[String]) -> ExecutionResult<Vec<String>> {
        let mut substituted = Vec::with_capacity(body.len());
        for line in body {
            if let Some(line) = self.line(line)? {
                substituted.push(line);
            }
        }
        Ok(substituted)
    }

    /// Substitute one line; `None` for blank lines
    pub fn line(&self, line: &str) -> ExecutionResult<Option<String>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let mut result = match line.strip_prefix('$') {
            Some(exec) => self.tokens(exec)?,
            None => line.to_string(),
        };

        for caps in REFERENCE.captures_iter(line) {
            let name = &caps[1];
            if let Some(value) = self.reference(name)? {
                result = result.replacen(&format!("&{}", name), &value, 1);
            }
        }

        log::trace!("[{}] {} => {}", self.command.name, line, result);
        Ok(Some(result))
    }

    fn tokens(&self, exec: &str) -> ExecutionResult<String> {
        let tokens = exec
            .split_whitespace()
            .map(|token| self.token(token))
            .collect::<ExecutionResult<Vec<String>>>()?;
        Ok(tokens.join(" "))
    }

    /// Every `&` in the token is tried against the rest of the token; the last match wins
    fn token(&self, token: &str) -> ExecutionResult<String> {
        let mut replacement = None;
        for (idx, _) in token.match_indices('&') {
            if let Some(value) = self.reference(&token[idx + 1..])? {
                replacement = Some(value);
            }
        }
        if let Some(value) = replacement {
            return Ok(value);
        }

        match self.command.argument(token) {
            Some(argument) => self.argument_value(argument),
            None => Ok(token.to_string()),
        }
    }

    /// Resolve `&name`: variables first, then declared arguments
    fn reference(&self, name: &str) -> ExecutionResult<Option<String>> {
        if let Ok(variable) = self.bindings.resolve(name) {
            return Ok(Some(variable.value));
        }

        match self.command.argument(name) {
            Some(argument) => self.argument_value(argument).map(Some),
            None => {
                log::trace!("[{}] unresolved reference &{}", self.command.name, name);
                Ok(None)
            }
        }
    }

    fn argument_value(&self, argument: &Argument) -> ExecutionResult<String> {
        let value = self.arguments.get(&self.command.name, &argument.name);
        if value.is_empty() && !argument.is_optional {
            return Err(ExecutionError::MissingArgument(
                argument.flag_name(&self.command.name),
            ));
        }
        Ok(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Variable;
    use crate::runner::VariableStore;

    fn command_with_args(args: &[(&str, bool)]) -> Command {
        let mut command = Command::new("build", vec![]);
        command.arguments = args
            .iter()
            .map(|(name, optional)| Argument {
                name: name.to_string(),
                is_optional: *optional,
            })
            .collect();
        command
    }

    fn substitute(
        command: &Command,
        store: &VariableStore,
        arguments: &ArgumentValues,
        line: &str,
    ) -> ExecutionResult<Option<String>> {
        let bindings = Bindings::new(store, &command.name);
        Substitution::new(command, &bindings, arguments).line(line)
    }

    #[test]
    fn test_plain_line_is_unchanged() {
        let command = command_with_args(&[]);
        let store = VariableStore::default();
        let result = substitute(&command, &store, &ArgumentValues::new(), "  echo hi  ").unwrap();
        assert_eq!(result, Some("echo hi".to_string()));
    }

    #[test]
    fn test_blank_line_is_skipped() {
        let command = command_with_args(&[]);
        let store = VariableStore::default();
        assert_eq!(substitute(&command, &store, &ArgumentValues::new(), "   ").unwrap(), None);
    }

    #[test]
    fn test_dollar_line_token_variable() {
        let command = command_with_args(&[]);
        let store = VariableStore::new(vec![Variable::new("b.0", "out", "build")]);
        let result = substitute(&command, &store, &ArgumentValues::new(), "$ echo &b.0").unwrap();
        assert_eq!(result, Some("echo out".to_string()));
    }

    #[test]
    fn test_dollar_line_replaces_whole_token() {
        let command = command_with_args(&[]);
        let store = VariableStore::new(vec![Variable::global("dir", "/tmp")]);
        let result = substitute(&command, &store, &ArgumentValues::new(), "$ ls --path=&dir").unwrap();
        assert_eq!(result, Some("ls /tmp".to_string()));
    }

    #[test]
    fn test_dollar_line_token_tries_every_reference() {
        let command = command_with_args(&[]);
        let store = VariableStore::new(vec![Variable::global("c", "third")]);
        let result = substitute(&command, &store, &ArgumentValues::new(), "$ echo a&b&c").unwrap();
        assert_eq!(result, Some("echo third".to_string()));
    }

    #[test]
    fn test_dollar_line_argument_token() {
        let command = command_with_args(&[("target", false)]);
        let store = VariableStore::default();
        let mut arguments = ArgumentValues::new();
        arguments.set("build", "target", "release");

        let result = substitute(&command, &store, &arguments, "$ cargo build target").unwrap();
        assert_eq!(result, Some("cargo build release".to_string()));
    }

    #[test]
    fn test_missing_required_argument() {
        let command = command_with_args(&[("target", false)]);
        let store = VariableStore::default();
        let result = substitute(&command, &store, &ArgumentValues::new(), "$ cargo build target");
        assert!(matches!(
            result,
            Err(ExecutionError::MissingArgument(id)) if id == "build:target"
        ));
    }

    #[test]
    fn test_missing_optional_argument_is_empty() {
        let command = command_with_args(&[("x", true)]);
        let store = VariableStore::default();
        let arguments = ArgumentValues::new();

        let result = substitute(&command, &store, &arguments, "$ echo x done").unwrap();
        assert_eq!(result, Some("echo  done".to_string()));

        let result = substitute(&command, &store, &arguments, "echo [&x]").unwrap();
        assert_eq!(result, Some("echo []".to_string()));
    }

    #[test]
    fn test_reference_in_plain_line() {
        let command = command_with_args(&[]);
        let store = VariableStore::new(vec![Variable::global("name", "world")]);
        let result = substitute(&command, &store, &ArgumentValues::new(), "echo hello &name!").unwrap();
        assert_eq!(result, Some("echo hello world!".to_string()));
    }

    #[test]
    fn test_reference_prefers_command_scope() {
        let command = command_with_args(&[]);
        let store = VariableStore::new(vec![
            Variable::global("name", "global"),
            Variable::new("name", "scoped", "build"),
        ]);
        let result = substitute(&command, &store, &ArgumentValues::new(), "echo &name").unwrap();
        assert_eq!(result, Some("echo scoped".to_string()));
    }

    #[test]
    fn test_unresolved_reference_is_left() {
        let command = command_with_args(&[]);
        let store = VariableStore::default();
        let result = substitute(&command, &store, &ArgumentValues::new(), "echo &missing").unwrap();
        assert_eq!(result, Some("echo &missing".to_string()));
    }

    #[test]
    fn test_reference_replaces_first_occurrence_only() {
        let command = command_with_args(&[]);
        let store = VariableStore::new(vec![Variable::global("a", "1")]);
        let result = substitute(&command, &store, &ArgumentValues::new(), "echo &a &a").unwrap();
        assert_eq!(result, Some("echo 1 1".to_string()));

        let result = substitute(&command, &store, &ArgumentValues::new(), "echo &a&a").unwrap();
        assert_eq!(result, Some("echo 11".to_string()));
    }

    #[test]
    fn test_body_skips_blank_lines() {
        let command = command_with_args(&[]);
        let store = VariableStore::default();
        let bindings = Bindings::new(&store, "build");
        let arguments = ArgumentValues::new();
        let body = vec!["echo a".to_string(), "".to_string(), "echo b".to_string()];

        let result = Substitution::new(&command, &bindings, &arguments).body(&body).unwrap();
        assert_eq!(result, vec!["echo a".to_string(), "echo b".to_string()]);
    }
}
