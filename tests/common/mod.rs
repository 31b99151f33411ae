//! Common test utilities

#![allow(dead_code)]

use construct::config::{parse_source_file, Program};
use construct::runner::{Context, Evaluator, SystemShell, VariableStore, Verbosity};
use construct::store::NoStore;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a temporary directory with a Constfile
pub fn create_test_source(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let source_path = temp_dir.path().join("Constfile");
    fs::write(&source_path, content).unwrap();
    (temp_dir, source_path)
}

/// Create a Constfile with an empty subdirectory next to it
pub fn create_test_source_in_subdir(content: &str) -> (TempDir, PathBuf, PathBuf) {
    let (temp_dir, source_path) = create_test_source(content);
    let sub_dir = temp_dir.path().join("subdir");
    fs::create_dir(&sub_dir).unwrap();
    (temp_dir, source_path, sub_dir)
}

/// Everything an evaluation borrows, owned in one place
pub struct Harness {
    pub dir: TempDir,
    pub program: Program,
    pub variables: VariableStore,
    pub shell: SystemShell,
    pub context: Context,
}

impl Harness {
    pub fn new(content: &str) -> Self {
        let (dir, source_path) = create_test_source(content);
        let program = parse_source_file(&source_path).unwrap();
        let variables = VariableStore::new(program.variables.clone());
        let shell = SystemShell::new().with_working_dir(dir.path().to_path_buf());

        Harness {
            dir,
            program,
            variables,
            shell,
            context: Context::new().with_verbosity(Verbosity::Silent),
        }
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context.with_verbosity(Verbosity::Silent);
        self
    }

    pub fn evaluator(&self) -> Evaluator<'_> {
        Evaluator::new(
            &self.program,
            &self.variables,
            &self.shell,
            &NoStore,
            &self.context,
        )
    }
}
