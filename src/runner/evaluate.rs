//! Command evaluation
//!
//! Evaluating a command runs its prerequisites in declared order, capturing
//! their output, binds each captured output as `<prereq>.<index>` in the
//! command's scope, then substitutes and runs the command's own body.
//!
//! The declared body is never modified. Each evaluation substitutes into a
//! fresh copy, so evaluating the same command twice gives the same lines.

use crate::config::{Command, Program};
use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::{Bindings, Context, ShellRunner, Substitution, VariableStore};
use crate::store::TaskStore;

/// What happens to a body line's output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Print it (the command was requested)
    Print,
    /// Keep it for the dependent command (the command is a prerequisite)
    Capture,
}

/// Record of one command evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub name: String,

    /// Lines as executed, after store augmentation and substitution
    pub body: Vec<String>,

    /// Output of each executed line, or its error text
    pub outputs: Vec<String>,

    /// Prerequisite evaluations, in declared order
    pub prerequisites: Vec<Evaluation>,
}

impl Evaluation {
    /// Variables a dependent command sees for this prerequisite
    pub fn output_bindings(&self) -> impl Iterator<Item = (String, &str)> + '_ {
        self.outputs
            .iter()
            .enumerate()
            .map(|(idx, output)| (format!("{}.{}", self.name, idx), output.trim()))
    }
}

/// Evaluates commands of one program
pub struct Evaluator<'a> {
    program: &'a Program,
    variables: &'a VariableStore,
    shell: &'a dyn ShellRunner,
    store: &'a dyn TaskStore,
    context: &'a Context,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        program: &'a Program,
        variables: &'a VariableStore,
        shell: &'a dyn ShellRunner,
        store: &'a dyn TaskStore,
        context: &'a Context,
    ) -> Self {
        Evaluator {
            program,
            variables,
            shell,
            store,
            context,
        }
    }

    pub fn program(&self) -> &'a Program {
        self.program
    }

    /// Evaluate a command, printing its output
    pub fn evaluate(&self, command: &Command) -> ExecutionResult<Evaluation> {
        self.context.print_task_start(&command.name);
        log::debug!("evaluating '{}'", command.name);

        let mut prerequisites = Vec::new();
        for name in command.prereqs.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
            let prereq = self.program.command(name).map_err(|_| {
                ExecutionError::PrerequisiteNotFound {
                    command: command.name.clone(),
                    prerequisite: name.to_string(),
                }
            })?;

            let bindings = Bindings::new(self.variables, &prereq.name);
            prerequisites.push(self.run(prereq, &bindings, OutputMode::Capture)?);
        }

        let mut bindings = Bindings::new(self.variables, &command.name);
        for prereq in &prerequisites {
            for (name, value) in prereq.output_bindings() {
                bindings.bind(name, value);
            }
        }

        let evaluation = self.run(command, &bindings, OutputMode::Print)?;
        bindings.commit();

        log::debug!("'{}' done", command.name);
        Ok(Evaluation {
            prerequisites,
            ..evaluation
        })
    }

    /// Augment, substitute and execute one command body
    fn run(
        &self,
        command: &Command,
        bindings: &Bindings<'_>,
        mode: OutputMode,
    ) -> ExecutionResult<Evaluation> {
        let template = self.working_body(command);
        let body = Substitution::new(command, bindings, &self.context.arguments).body(&template)?;
        let outputs = self.execute(command, &body, mode)?;

        Ok(Evaluation {
            name: command.name.clone(),
            body,
            outputs,
            prerequisites: Vec::new(),
        })
    }

    /// Declared body plus any lines from the task store
    fn working_body(&self, command: &Command) -> Vec<String> {
        let mut body = command.body.clone();
        if !command.cloud_accessible {
            return body;
        }

        match self.store.lookup(&command.name) {
            Ok(external) => {
                log::debug!(
                    "appending {} stored lines to '{}'",
                    external.body.len(),
                    command.name
                );
                body.extend(external.body);
            }
            Err(e) => log::debug!("no stored body for '{}': {}", command.name, e),
        }
        body
    }

    /// Run each line; a failing line yields its error text as output
    fn execute(
        &self,
        command: &Command,
        body: &[String],
        mode: OutputMode,
    ) -> ExecutionResult<Vec<String>> {
        let mut outputs = Vec::with_capacity(body.len());
        for line in body {
            self.context.print_run(&command.name, line);

            let output = match self.shell.run_line(line) {
                Ok(output) => output,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    log::debug!("[{}] {}", command.name, e);
                    e.to_string()
                }
            };

            if mode == OutputMode::Print {
                self.context.print_output(&output);
            }
            outputs.push(output);
        }
        Ok(outputs)
    }
}
