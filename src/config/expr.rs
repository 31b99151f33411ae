//! Evaluation of `var` right-hand sides
//!
//! Supported forms:
//! - `@NAME` - environment variable
//! - `&name` - a variable declared earlier in the file (any scope)
//! - `$ ...` - lazy expression, see [`Evaluated::lazy`]
//!
//! References are concatenated, including ones after a `$`; anything else
//! is kept verbatim.

use crate::config::types::{Command, LazyEval, Variable, LAZY_PREFIX};
use std::env;

/// Characters that terminate a reference name
pub const SPECIAL_CHARS: &[char] = &['&', '@', '+', '-', '*', '/'];

/// Result of evaluating an expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluated {
    pub value: String,
    /// Synthetic deferred command created by a `$` expression.
    ///
    /// Nothing feeds its output back into the variable.
    pub lazy: Option<Command>,
}

/// Check whether a character ends a reference name
pub fn is_special_char(c: char) -> bool {
    SPECIAL_CHARS.contains(&c)
}

/// Characters following a reference sigil up to the next special character
fn reference_name(rest: &str) -> &str {
    let end = rest.find(is_special_char).unwrap_or(rest.len());
    rest[..end].trim()
}

/// Evaluate the right-hand side of `var <var_name> = <expression>`
///
/// `variables` are the ones parsed so far; lookup here is by name only.
pub fn evaluate_expression(
    expression: &str,
    var_name: &str,
    scope: &str,
    variables: &[Variable],
) -> Evaluated {
    let expression = expression.trim();
    let mut output = String::new();
    let mut lazy = None;

    for (idx, c) in expression.char_indices() {
        let rest = &expression[idx + c.len_utf8()..];
        match c {
            '@' => {
                let name = reference_name(rest);
                if let Ok(value) = env::var(name) {
                    output.push_str(&value);
                }
            }
            '&' => {
                let name = reference_name(rest);
                if let Some(variable) = variables.iter().find(|v| v.name == name) {
                    output.push_str(&variable.value);
                }
            }
            '$' if lazy.is_none() => {
                log::debug!("lazy expression for '{}' in scope '{}': {}", var_name, scope, expression);
                lazy = Some(lazy_command(var_name, scope, rest.trim()));
            }
            _ => {}
        }
    }

    if output.is_empty() {
        output = expression.to_string();
    }

    Evaluated { value: output, lazy }
}

fn lazy_command(var_name: &str, scope: &str, body: &str) -> Command {
    let mut command = Command::new(
        format!("{}{}_{}", LAZY_PREFIX, var_name, scope),
        vec![format!("$ {}", body)],
    );
    command.lazy_eval = Some(LazyEval {
        var_name: var_name.to_string(),
        scope: scope.to_string(),
    });
    command
}
