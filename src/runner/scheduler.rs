//! Top-level dispatch
//!
//! The default command always runs first and to completion. Requested
//! commands then run one after another, or, in concurrent mode, all at once
//! with the first reported error returned after every task has finished.

use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::Evaluator;
use std::sync::mpsc;

/// Runs the default command and the requested commands
pub struct Scheduler<'a> {
    evaluator: Evaluator<'a>,
    concurrent: bool,
}

impl<'a> Scheduler<'a> {
    pub fn new(evaluator: Evaluator<'a>) -> Self {
        Scheduler {
            evaluator,
            concurrent: false,
        }
    }

    /// Dispatch requested commands concurrently
    pub fn with_concurrency(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    /// Run the default command, then every requested name
    ///
    /// Names starting with `-` are flags and are skipped.
    pub fn run(&self, requested: &[String]) -> ExecutionResult<()> {
        if let Some(default) = self.evaluator.program().default_command() {
            self.evaluator.evaluate(default)?;
        }

        let names: Vec<&str> = requested
            .iter()
            .map(String::as_str)
            .filter(|name| !name.is_empty() && !name.starts_with('-'))
            .collect();

        if self.concurrent {
            return self.run_concurrent(&names);
        }

        for name in names {
            self.process(name)?;
        }
        Ok(())
    }

    /// Resolve and evaluate one requested command
    fn process(&self, name: &str) -> ExecutionResult<()> {
        let command = self.evaluator.program().command(name)?;
        self.evaluator.evaluate(command).map(|_| ())
    }

    fn run_concurrent(&self, names: &[&str]) -> ExecutionResult<()> {
        log::debug!("dispatching {} commands concurrently", names.len());
        let (sender, receiver) = mpsc::channel::<(String, ExecutionResult<()>)>();

        // One worker per command; body lines block on their subprocess
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(names.len().max(1))
            .build()
            .map_err(|e| ExecutionError::WorkerPool(e.to_string()))?;

        pool.scope(|scope| {
            for &name in names {
                let sender = sender.clone();
                scope.spawn(move |_| {
                    let result = self.process(name);
                    // The receiver outlives the scope, so this cannot fail.
                    let _ = sender.send((name.to_string(), result));
                });
            }
        });
        drop(sender);

        let mut first_error: Option<ExecutionError> = None;
        for (name, result) in receiver {
            if let Err(e) = result {
                log::debug!("'{}' failed: {}", name, e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_source;
    use crate::runner::{Context, ShellRunner, VariableStore, Verbosity};
    use crate::store::NoStore;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Condvar, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingShell {
        lines: Mutex<Vec<String>>,
    }

    impl ShellRunner for RecordingShell {
        fn run_line(&self, line: &str) -> ExecutionResult<String> {
            self.lines.lock().unwrap().push(line.to_string());
            Ok(String::new())
        }
    }

    impl RecordingShell {
        fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }
    }

    const SOURCE: &str = "_ {\n    setup\n}\np(x) {\n    $ run-p x\n}\nq {\n    run-q\n}\n";

    fn run(requested: &[&str], concurrent: bool) -> (ExecutionResult<()>, Vec<String>) {
        let program = parse_source(SOURCE);
        let variables = VariableStore::new(program.variables.clone());
        let shell = RecordingShell::default();
        let context = Context::new().with_verbosity(Verbosity::Silent);
        let evaluator = Evaluator::new(&program, &variables, &shell, &NoStore, &context);
        let requested: Vec<String> = requested.iter().map(|s| s.to_string()).collect();

        let result = Scheduler::new(evaluator)
            .with_concurrency(concurrent)
            .run(&requested);
        (result, shell.lines())
    }

    #[test]
    fn test_default_runs_first() {
        let (result, lines) = run(&["q"], false);
        assert!(result.is_ok());
        assert_eq!(lines, vec!["setup", "run-q"]);
    }

    #[test]
    fn test_flags_are_skipped() {
        let (result, lines) = run(&["--concurrent", "q"], false);
        assert!(result.is_ok());
        assert_eq!(lines, vec!["setup", "run-q"]);
    }

    #[test]
    fn test_unknown_command() {
        let (result, _) = run(&["nope"], false);
        assert!(matches!(result, Err(ExecutionError::CommandNotFound(name)) if name == "nope"));
    }

    #[test]
    fn test_sequential_stops_at_first_failure() {
        let (result, lines) = run(&["p", "q"], false);
        assert!(matches!(result, Err(ExecutionError::MissingArgument(_))));
        assert_eq!(lines, vec!["setup"]);
    }

    #[test]
    fn test_concurrent_reports_failure_and_finishes_others() {
        let (result, lines) = run(&["p", "q"], true);
        assert!(matches!(result, Err(ExecutionError::MissingArgument(id)) if id == "p:x"));
        assert_eq!(lines.first().map(String::as_str), Some("setup"));
        assert!(lines.contains(&"run-q".to_string()));
    }

    /// `wait` lines block until a `signal` line has run
    #[derive(Default)]
    struct RendezvousShell {
        signalled: Mutex<bool>,
        ready: Condvar,
        timed_out: AtomicBool,
    }

    impl ShellRunner for RendezvousShell {
        fn run_line(&self, line: &str) -> ExecutionResult<String> {
            let signalled = self.signalled.lock().unwrap();
            match line {
                "signal" => {
                    let mut signalled = signalled;
                    *signalled = true;
                    self.ready.notify_all();
                }
                "wait" => {
                    let (_guard, timeout) = self
                        .ready
                        .wait_timeout_while(signalled, Duration::from_secs(5), |s| !*s)
                        .unwrap();
                    if timeout.timed_out() {
                        self.timed_out.store(true, Ordering::SeqCst);
                    }
                }
                _ => {}
            }
            Ok(String::new())
        }
    }

    #[test]
    fn test_concurrent_commands_overlap() {
        let program = parse_source(
            "a {\n    wait\n}\nb {\n    wait\n}\nc {\n    wait\n}\ngo {\n    signal\n}\n",
        );
        let variables = VariableStore::new(program.variables.clone());
        let shell = RendezvousShell::default();
        let context = Context::new().with_verbosity(Verbosity::Silent);
        let evaluator = Evaluator::new(&program, &variables, &shell, &NoStore, &context);
        let requested: Vec<String> = ["a", "b", "c", "go"].iter().map(|s| s.to_string()).collect();

        let result = Scheduler::new(evaluator)
            .with_concurrency(true)
            .run(&requested);

        assert!(result.is_ok());
        assert!(!shell.timed_out.load(Ordering::SeqCst), "waiting commands blocked 'go'");
    }

    #[test]
    fn test_concurrent_success() {
        let (result, lines) = run(&["q", "q"], true);
        assert!(result.is_ok());
        assert_eq!(lines.len(), 3);
    }
}
