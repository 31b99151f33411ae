//! Program validation
//!
//! The parser is tolerant; this pass enforces the invariants evaluation
//! relies on.

use crate::config::types::Program;
use crate::error::{LoadError, LoadResult};
use std::collections::HashSet;

/// Validate a parsed program
pub fn validate_program(program: &Program) -> LoadResult<()> {
    check_unique_names(program)?;
    check_single_default(program)?;
    warn_unknown_prereqs(program);
    Ok(())
}

/// Non-synthetic command names must be unique
fn check_unique_names(program: &Program) -> LoadResult<()> {
    let mut seen = HashSet::new();
    for command in program.declared_commands() {
        if !seen.insert(command.name.as_str()) {
            return Err(LoadError::DuplicateCommand(command.name.clone()));
        }
    }
    Ok(())
}

/// At most one command may be the default
fn check_single_default(program: &Program) -> LoadResult<()> {
    let mut defaults = program.commands.iter().filter(|c| c.is_default);
    if let (Some(first), Some(second)) = (defaults.next(), defaults.next()) {
        return Err(LoadError::MultipleDefaults(
            first.name.clone(),
            second.name.clone(),
        ));
    }
    Ok(())
}

/// Unknown prerequisites only fail once the dependent command runs
fn warn_unknown_prereqs(program: &Program) {
    for command in &program.commands {
        for prereq in &command.prereqs {
            if program.command(prereq).is_err() {
                log::warn!(
                    "command '{}' depends on '{}', which is not defined",
                    command.name,
                    prereq
                );
            }
        }
    }
}
