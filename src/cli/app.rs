//! Main CLI application

use crate::config::{
    find_source_file, parse_source_file, validate_program, Program, Settings,
};
use crate::debug::{to_mermaid, DIAGRAM_FILE};
use crate::error::Result;
use crate::runner::{
    ArgumentValues, Context, Evaluator, Scheduler, SystemShell, VariableStore, Verbosity,
};
use crate::store::{locate_store, FileStore, NoStore, TaskStore};
use anyhow::Context as _;
use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::Colorize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// CLI application
pub struct App {
    /// The clap command
    command: Command,
    /// Parsed program
    program: Program,
    /// Source file path
    source_path: PathBuf,
    /// Settings before CLI flags are applied
    settings: Settings,
}

impl App {
    /// Create an app by parsing and validating the source file
    pub fn new(source_path: PathBuf, settings: Settings) -> Result<Self> {
        let program = parse_source_file(&source_path)?;
        validate_program(&program)?;

        let command = build_command(&program);

        Ok(App {
            command,
            program,
            source_path,
            settings,
        })
    }

    /// Run the application with command line arguments
    pub fn run(self, args: &[String]) -> Result<()> {
        let matches = self.command.clone().get_matches_from(args);
        let settings = apply_flags(self.settings.clone(), &matches);

        if matches.get_flag("list") {
            print_commands(&self.program);
            return Ok(());
        }

        if settings.debug {
            self.write_debug_artifacts()?;
        }

        let tasks = requested_tasks(&matches, &self.source_path);
        let context = Context::new()
            .with_arguments(argument_values(&self.program, &matches))
            .with_verbosity(settings.verbosity);

        let source_dir = self
            .source_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let store: Box<dyn TaskStore> = match locate_store(settings.store.as_deref(), source_dir) {
            Some(path) => {
                log::debug!("using task store {}", path.display());
                Box::new(FileStore::new(path))
            }
            None => Box::new(NoStore),
        };

        let shell = SystemShell::new().with_interpreter(settings.interpreter.clone());
        let variables = VariableStore::new(self.program.variables.clone());
        let evaluator = Evaluator::new(
            &self.program,
            &variables,
            &shell,
            store.as_ref(),
            &context,
        );

        Scheduler::new(evaluator)
            .with_concurrency(settings.concurrent)
            .run(&tasks)?;

        Ok(())
    }

    /// Write the Mermaid diagram and dump the parsed program
    fn write_debug_artifacts(&self) -> Result<()> {
        fs::write(DIAGRAM_FILE, to_mermaid(&self.program))?;
        eprintln!("{} wrote {}", "[DEBUG]".yellow(), DIAGRAM_FILE);
        eprintln!("{}", serde_json::to_string_pretty(&self.program)?);
        Ok(())
    }
}

/// Build the clap command from the parsed program
fn build_command(program: &Program) -> Command {
    let mut cmd = Command::new("construct")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A Make-like task runner driven by a Constfile")
        .arg(
            Arg::new("tasks")
                .value_name("TASKS")
                .help("Commands to run (the first may be a source file)")
                .num_args(0..)
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .help("Path to the source file"),
        )
        .arg(
            Arg::new("store")
                .long("store")
                .value_name("FILE")
                .help("Path to the task store used by |cloud| commands"),
        )
        .arg(
            Arg::new("concurrent")
                .short('c')
                .long("concurrent")
                .help("Run requested commands concurrently")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .help("Write diagram.md and dump the parsed program")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list")
                .short('l')
                .long("list")
                .help("List available commands")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print command output and errors")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("Print no output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print verbose output")
                .action(ArgAction::SetTrue),
        );

    // One `--<command>:<argument>` option per declared argument
    let mut registered = HashSet::new();
    for command in program.declared_commands() {
        for argument in &command.arguments {
            let flag_name = argument.flag_name(&command.name);
            if !registered.insert(flag_name.clone()) {
                continue;
            }

            let help = if argument.is_optional {
                format!("Optional argument '{}' of {}", argument.name, command.name)
            } else {
                format!("Argument '{}' of {}", argument.name, command.name)
            };

            cmd = cmd.arg(
                Arg::new(flag_name.clone())
                    .long(flag_name)
                    .value_name(argument.name.to_uppercase())
                    .help(help),
            );
        }
    }

    cmd
}

/// Apply CLI flags on top of settings
fn apply_flags(mut settings: Settings, matches: &ArgMatches) -> Settings {
    if let Some(store) = matches.get_one::<String>("store") {
        settings.store = Some(PathBuf::from(store));
    }
    if matches.get_flag("concurrent") {
        settings.concurrent = true;
    }
    if matches.get_flag("debug") {
        settings.debug = true;
    }
    settings.verbosity = get_verbosity(matches);
    settings
}

/// Get verbosity level from matches
fn get_verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("silent") {
        Verbosity::Silent
    } else if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// Requested task names, minus a leading source file argument
fn requested_tasks(matches: &ArgMatches, source_path: &Path) -> Vec<String> {
    let mut tasks: Vec<String> = matches
        .get_many::<String>("tasks")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    if tasks
        .first()
        .is_some_and(|first| Path::new(first) == source_path)
    {
        tasks.remove(0);
    }
    tasks
}

/// Collect `--<command>:<argument>` values into a typed map
fn argument_values(program: &Program, matches: &ArgMatches) -> ArgumentValues {
    let mut values = ArgumentValues::new();
    for command in program.declared_commands() {
        for argument in &command.arguments {
            let flag_name = argument.flag_name(&command.name);
            if let Ok(Some(value)) = matches.try_get_one::<String>(&flag_name) {
                values.set(command.name.clone(), argument.name.clone(), value.clone());
            }
        }
    }
    values
}

/// Print each command with its arguments and prerequisites
fn print_commands(program: &Program) {
    for command in program.declared_commands() {
        let mut line = command.name.bold().to_string();

        if !command.arguments.is_empty() {
            let args: Vec<String> = command
                .arguments
                .iter()
                .map(|a| {
                    if a.is_optional {
                        format!("opt {}", a.name)
                    } else {
                        a.name.clone()
                    }
                })
                .collect();
            line.push_str(&format!("({})", args.join(", ")));
        }

        if !command.prereqs.is_empty() {
            line.push_str(&format!(" <{}>", command.prereqs.join(", ")).dimmed().to_string());
        }
        if command.is_default {
            line.push_str(&" (default)".green().to_string());
        }
        if command.cloud_accessible {
            line.push_str(&" (store)".cyan().to_string());
        }

        println!("{}", line);
    }
}

/// Run the CLI application with the process arguments
pub fn run() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    init_logging(&args);

    let settings = Settings::from_env();
    let source_path = resolve_source_path(&args, &settings)?;
    log::debug!("source file: {}", source_path.display());

    let app = App::new(source_path.clone(), settings)
        .with_context(|| format!("failed to load {}", source_path.display()))?;
    app.run(&args)?;
    Ok(())
}

/// Initialise `env_logger`; `RUST_LOG` overrides the default filter
fn init_logging(args: &[String]) {
    let verbose = args.iter().skip(1).any(|a| a == "-v" || a == "--verbose");
    let default_filter = if verbose { "debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .try_init();
}

/// Pick the source file: `--file`, then a leading file argument, then
/// `CONSTRUCT_FILE`, then a `Constfile` in this or a parent directory
fn resolve_source_path(args: &[String], settings: &Settings) -> anyhow::Result<PathBuf> {
    if let Some(path) = extract_file_arg(args) {
        return Ok(path);
    }
    if let Some(path) = leading_file_arg(args) {
        return Ok(path);
    }
    if let Some(path) = &settings.file {
        return Ok(path.clone());
    }
    Ok(find_source_file()?)
}

/// Extract --file argument before clap parsing
fn extract_file_arg(args: &[String]) -> Option<PathBuf> {
    args.windows(2)
        .find(|pair| pair[0] == "--file" || pair[0] == "-f")
        .map(|pair| PathBuf::from(&pair[1]))
}

/// First argument, when it names an existing regular file
fn leading_file_arg(args: &[String]) -> Option<PathBuf> {
    args.get(1)
        .filter(|first| !first.starts_with('-'))
        .map(PathBuf::from)
        .filter(|path| path.is_file())
}
