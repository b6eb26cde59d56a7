//! Main CLI application
//!
//! Arguments are parsed twice. The first pass only reads the global flags so
//! that `--init`, `--config` and `--help` work before a configuration file is
//! loaded. The second pass parses the full command tree built from the
//! resolved configuration.

use crate::cli::flags::MatchesFlags;
use crate::config::{
    create_config_file, find_config_file, parse_config_file, resolve_config, validate_config,
    Config, Flag, FlagType, Task, DEFAULT_CONFIG_FILE_NAME,
};
use crate::error::{ConfigError, Result};
use crate::runner::{signal, Context, TaskRunner};
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const APP_NAME: &str = "cmdx";
const APP_USAGE: &str = "task runner";

/// Id of the positional arguments of a task sub-command
const ARGS_ID: &str = "_args";

/// Shown when no configuration file exists and help was asked for
pub const ROOT_HELP: &str = r#"cmdx - task runner

Configuration file isn't found.
First of all, let's create a configuration file.

$ cmdx --init

Or if the configuration file already exists but the file path is unusual, please specify the path by --config (-c) option.

$ cmdx -c <YOUR_CONFIGURATION_FILE_PATH> <COMMAND> ...
"#;

/// Flags read before the configuration is loaded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalFlags {
    pub config: Option<PathBuf>,
    pub name: Option<String>,
    pub working_dir: Option<PathBuf>,
    pub init: bool,
    pub list: bool,
    /// Only `Some` when given on the command line
    pub quiet: Option<bool>,
    pub dry_run: bool,
    pub help: bool,
}

impl GlobalFlags {
    fn from_matches(matches: &ArgMatches) -> Self {
        GlobalFlags {
            config: matches.get_one::<String>("config").map(PathBuf::from),
            name: matches.get_one::<String>("name").cloned(),
            working_dir: matches.get_one::<String>("working-dir").map(PathBuf::from),
            init: matches.get_flag("init"),
            list: matches.get_flag("list"),
            quiet: (matches.value_source("quiet") == Some(ValueSource::CommandLine))
                .then(|| matches.get_flag("quiet")),
            dry_run: matches.get_flag("dry-run"),
            help: matches.get_flag("help") || matches.subcommand_name() == Some("help"),
        }
    }

    /// Parse only the global flags; everything from the task name on is ignored
    pub fn parse_from(args: &[OsString]) -> Result<Self> {
        let matches = global_command().try_get_matches_from(args)?;
        Ok(Self::from_matches(&matches))
    }
}

fn global_args() -> Vec<Arg> {
    vec![
        Arg::new("config")
            .short('c')
            .long("config")
            .value_name("FILE")
            .env("CMDX_CONFIG_PATH")
            .help("configuration file path"),
        Arg::new("name")
            .short('n')
            .long("name")
            .value_name("NAME")
            .help("configuration file name. The configuration file is searched from the current directory to the root directory recursively"),
        Arg::new("working-dir")
            .short('w')
            .long("working-dir")
            .value_name("DIR")
            .env("CMDX_WORKING_DIR")
            .help("The working directory path. By default, the task is run on the directory where the configuration file is found"),
        Arg::new("init")
            .short('i')
            .long("init")
            .action(ArgAction::SetTrue)
            .help("create the configuration file"),
        Arg::new("list")
            .short('l')
            .long("list")
            .action(ArgAction::SetTrue)
            .help("list tasks"),
        Arg::new("quiet")
            .short('q')
            .long("quiet")
            .action(ArgAction::SetTrue)
            .help("don't output the executed command"),
        Arg::new("dry-run")
            .short('d')
            .long("dry-run")
            .action(ArgAction::SetTrue)
            .help("output the script but don't run it actually"),
        Arg::new("version")
            .short('v')
            .long("version")
            .action(ArgAction::Version)
            .help("print the version"),
    ]
}

/// First-pass command: global flags plus an opaque task invocation
fn global_command() -> Command {
    Command::new(APP_NAME)
        .version(crate::VERSION)
        .about(APP_USAGE)
        .disable_version_flag(true)
        .disable_help_flag(true)
        .disable_help_subcommand(true)
        .allow_external_subcommands(true)
        .args(global_args())
        .arg(
            Arg::new("help")
                .short('h')
                .long("help")
                .action(ArgAction::SetTrue),
        )
}

/// Build the full command tree from a resolved configuration
pub fn build_command(config: &Config) -> Command {
    Command::new(APP_NAME)
        .version(crate::VERSION)
        .about(APP_USAGE)
        .disable_version_flag(true)
        .args(global_args())
        .subcommands(config.tasks.iter().map(task_command))
}

fn task_command(task: &Task) -> Command {
    let mut cmd = Command::new(task.name.clone()).about(task.usage.clone());

    if !task.description.is_empty() {
        cmd = cmd.long_about(task.description.clone());
    }
    if let Some(c) = task.short.chars().next() {
        cmd = cmd.visible_alias(c.to_string());
    }

    if !task.tasks.is_empty() {
        return cmd
            .subcommands(task.tasks.iter().map(task_command))
            .subcommand_required(true)
            .arg_required_else_help(true);
    }

    // A task flag may claim `-h`; help then stays reachable as `--help`
    if task.flags.iter().any(|flag| flag.short == "h") {
        cmd = cmd.disable_help_flag(true).arg(
            Arg::new("help")
                .long("help")
                .action(ArgAction::Help)
                .help("Print help"),
        );
    }

    cmd = cmd.args(task.flags.iter().map(flag_arg)).arg(
        Arg::new(ARGS_ID)
            .value_name("ARGS")
            .num_args(0..)
            .action(ArgAction::Append)
            .trailing_var_arg(true)
            .help("positional arguments"),
    );

    let help = task_help(task);
    if !help.is_empty() {
        cmd = cmd.after_help(help);
    }
    cmd
}

fn flag_arg(flag: &Flag) -> Arg {
    let mut arg = Arg::new(flag.name.clone())
        .long(flag.name.clone())
        .help(flag.usage.clone());
    if let Some(c) = flag.short.chars().next() {
        arg = arg.short(c);
    }

    match flag.value_type() {
        FlagType::Bool => arg.action(ArgAction::SetTrue),
        FlagType::String => {
            arg = arg
                .action(ArgAction::Set)
                .value_name(flag.name.to_uppercase());
            if !flag.default.is_empty() {
                arg = arg.default_value(flag.default.clone());
            }
            arg
        }
    }
}

/// `ARGUMENTS`, `REQUIREMENTS` and `REQUIRED ENVIRONMENT VARIABLES` sections
pub fn task_help(task: &Task) -> String {
    let mut sections = Vec::new();

    if !task.args.is_empty() {
        let lines: Vec<String> = task
            .args
            .iter()
            .map(|arg| {
                if arg.usage.is_empty() {
                    format!("   {}", arg.name)
                } else {
                    format!("   {}  {}", arg.name, arg.usage)
                }
            })
            .collect();
        sections.push(format!("ARGUMENTS:\n{}", lines.join("\n")));
    }

    let exec: Vec<String> = task
        .require
        .exec
        .iter()
        .filter(|group| !group.is_empty())
        .map(|group| format!("  {}", group.as_slice().join(" or ")))
        .collect();
    if !exec.is_empty() {
        sections.push(format!("REQUIREMENTS:\n{}", exec.join("\n")));
    }

    let environment: Vec<String> = task
        .require
        .environment
        .iter()
        .filter(|group| !group.is_empty())
        .map(|group| format!("  {}", group.as_slice().join(" or ")))
        .collect();
    if !environment.is_empty() {
        sections.push(format!(
            "REQUIRED ENVIRONMENT VARIABLES:\n{}",
            environment.join("\n")
        ));
    }

    sections.join("\n\n")
}

/// One line per task, `name[, short] - usage`; nested tasks by their full path
pub fn list_tasks(tasks: &[Task]) -> Vec<String> {
    let mut lines = Vec::new();
    collect_task_lines(tasks, "", &mut lines);
    lines
}

fn collect_task_lines(tasks: &[Task], prefix: &str, lines: &mut Vec<String>) {
    for task in tasks {
        let mut name = format!("{}{}", prefix, task.name);
        if !task.short.is_empty() {
            name.push_str(", ");
            name.push_str(&task.short);
        }
        lines.push(format!("{} - {}", name, task.usage));
        collect_task_lines(&task.tasks, &format!("{}{} ", prefix, task.name), lines);
    }
}

/// Walk the matched sub-commands down to a leaf task
fn select_task<'a>(
    tasks: &'a [Task],
    matches: &'a ArgMatches,
    path: &mut Vec<&'a str>,
) -> Option<(&'a Task, &'a ArgMatches)> {
    let (name, sub_matches) = matches.subcommand()?;
    let task = tasks.iter().find(|task| task.name == name)?;
    path.push(&task.name);
    if task.tasks.is_empty() {
        Some((task, sub_matches))
    } else {
        select_task(&task.tasks, sub_matches, path)
    }
}

/// Directory scripts run in unless `--working-dir` is given
fn config_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Write the starter configuration to `--config`, else `--name`, else `.cmdx.yaml`
fn init(globals: &GlobalFlags) -> Result<()> {
    let path = globals
        .config
        .clone()
        .or_else(|| globals.name.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE_NAME));

    if create_config_file(&path)? {
        info!(path = %path.display(), "created the configuration file");
    } else {
        info!(path = %path.display(), "the configuration file already exists");
    }
    Ok(())
}

/// Load, validate and resolve the configuration
pub fn load_config(path: &Path) -> Result<Config> {
    let config = parse_config_file(path)?;
    validate_config(&config).map_err(ConfigError::from)?;
    Ok(resolve_config(&config)?)
}

/// Run the CLI application with the process arguments
pub async fn run() -> Result<()> {
    run_from(std::env::args_os()).await
}

/// Run the CLI application with the given arguments (including the program name)
pub async fn run_from<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let globals = GlobalFlags::parse_from(&args)?;
    debug!(?globals, "parsed global flags");

    if globals.init {
        return init(&globals);
    }

    let config_path = match &globals.config {
        Some(path) => path.clone(),
        None => match find_config_file(globals.name.as_deref()) {
            Ok(path) => path,
            Err(_) if globals.help && globals.name.is_none() => {
                print!("{}", ROOT_HELP);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        },
    };
    debug!(path = %config_path.display(), "using the configuration file");

    let config = load_config(&config_path)?;

    if globals.list {
        for line in list_tasks(&config.tasks) {
            println!("{}", line);
        }
        return Ok(());
    }

    let mut command = build_command(&config);
    let matches = command.try_get_matches_from_mut(&args)?;

    let mut path = Vec::new();
    let Some((task, task_matches)) = select_task(&config.tasks, &matches, &mut path) else {
        command.print_help()?;
        return Ok(());
    };
    let task_path = path.join(" ");

    let working_dir = globals
        .working_dir
        .clone()
        .unwrap_or_else(|| config_dir(&config_path));
    let context = Context::new(working_dir)
        .with_quiet(globals.quiet)
        .with_dry_run(globals.dry_run);

    let positional: Vec<String> = task_matches
        .get_many::<String>(ARGS_ID)
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let flags = MatchesFlags::new(task_matches, &task.flags);

    let (mut cancel, _guard) = signal::listen()?;
    TaskRunner::new(context)
        .run(task, &flags, &positional, &mut cancel)
        .await
        .map_err(|e| e.in_task(&task_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    fn resolved(yaml: &str) -> Config {
        resolve_config(&parse_config(yaml).unwrap()).unwrap()
    }

    fn args(items: &[&str]) -> Vec<OsString> {
        items.iter().map(OsString::from).collect()
    }

    const YAML: &str = r#"
tasks:
- name: build
  short: b
  usage: build the app
  flags:
  - name: force
    short: f
    type: bool
  - name: target
    short: t
    default: debug
  args:
  - name: package
    usage: package to build
  require:
    exec: [[docker, podman]]
    environment: [TOKEN]
  script: "cargo build"
- name: db
  usage: database tasks
  tasks:
  - name: migrate
    short: m
    usage: run migrations
    script: migrate
"#;

    #[test]
    fn test_global_flags() {
        let globals = GlobalFlags::parse_from(&args(&[
            "cmdx", "-q", "-d", "-c", "x.yaml", "build", "--force", "pkg",
        ]))
        .unwrap();
        assert_eq!(globals.config, Some(PathBuf::from("x.yaml")));
        assert_eq!(globals.quiet, Some(true));
        assert!(globals.dry_run);
        assert!(!globals.help);

        let globals = GlobalFlags::parse_from(&args(&["cmdx", "build"])).unwrap();
        assert_eq!(globals.quiet, None);
        assert!(!globals.dry_run);
    }

    #[test]
    fn test_global_help() {
        let globals = GlobalFlags::parse_from(&args(&["cmdx", "--help"])).unwrap();
        assert!(globals.help);
        let globals = GlobalFlags::parse_from(&args(&["cmdx", "help"])).unwrap();
        assert!(globals.help);
        let globals = GlobalFlags::parse_from(&args(&["cmdx", "build", "--help"])).unwrap();
        assert!(!globals.help);
    }

    #[test]
    fn test_build_command_is_valid() {
        build_command(&resolved(YAML)).debug_assert();
    }

    #[test]
    fn test_task_selection() {
        let config = resolved(YAML);
        let command = build_command(&config);

        let matches = command
            .clone()
            .try_get_matches_from(["cmdx", "b", "-f", "--target", "release", "core", "extra"])
            .unwrap();
        let mut path = Vec::new();
        let (task, task_matches) = select_task(&config.tasks, &matches, &mut path).unwrap();
        assert_eq!(task.name, "build");
        assert_eq!(path, vec!["build"]);
        assert!(task_matches.get_flag("force"));
        assert_eq!(
            task_matches.get_one::<String>("target").map(String::as_str),
            Some("release")
        );
        let positional: Vec<&String> = task_matches.get_many::<String>(ARGS_ID).unwrap().collect();
        assert_eq!(positional, vec!["core", "extra"]);

        let matches = command
            .try_get_matches_from(["cmdx", "db", "m"])
            .unwrap();
        let mut path = Vec::new();
        let (task, _) = select_task(&config.tasks, &matches, &mut path).unwrap();
        assert_eq!(task.name, "migrate");
        assert_eq!(path.join(" "), "db migrate");
    }

    #[test]
    fn test_list_tasks() {
        let config = resolved(YAML);
        assert_eq!(
            list_tasks(&config.tasks),
            vec![
                "build, b - build the app",
                "db - database tasks",
                "db migrate, m - run migrations",
            ]
        );
    }

    #[test]
    fn test_task_help_sections() {
        let config = resolved(YAML);
        let help = task_help(&config.tasks[0]);
        assert_eq!(
            help,
            "ARGUMENTS:\n   package  package to build\n\n\
             REQUIREMENTS:\n  docker or podman\n\n\
             REQUIRED ENVIRONMENT VARIABLES:\n  TOKEN"
        );
        assert_eq!(task_help(&config.tasks[1].tasks[0]), "");
    }

    #[test]
    fn test_flag_short_h_keeps_long_help() {
        let config = resolved(
            r#"
tasks:
- name: serve
  flags:
  - name: host
    short: h
  script: serve
"#,
        );
        let command = build_command(&config);
        command.clone().debug_assert();
        let matches = command
            .try_get_matches_from(["cmdx", "serve", "-h", "0.0.0.0"])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!(
            sub.get_one::<String>("host").map(String::as_str),
            Some("0.0.0.0")
        );
    }

    #[test]
    fn test_config_dir() {
        assert_eq!(config_dir(Path::new(".cmdx.yaml")), PathBuf::from("."));
        assert_eq!(
            config_dir(Path::new("/work/project/.cmdx.yaml")),
            PathBuf::from("/work/project")
        );
    }
}
