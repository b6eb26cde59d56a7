//! Error types for cmdx

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for cmdx operations
pub type Result<T> = std::result::Result<T, CmdxError>;

/// Exit code used for every failure that is not the exit status of a script
pub const FAILURE_EXIT_CODE: i32 = 1;

/// Main error type for cmdx
#[derive(Error, Debug)]
pub enum CmdxError {
    /// Configuration discovery, parsing and structure errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Template rendering errors
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Parameter binding errors
    #[error(transparent)]
    Binding(#[from] BindingError),

    /// Unsatisfied task requirements
    #[error(transparent)]
    Requirement(#[from] RequirementError),

    /// Script or function execution errors
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Command line usage errors, including help and version output
    #[error(transparent)]
    Cli(#[from] clap::Error),

    /// An error raised while running a specific task
    #[error("task '{task}': {source}")]
    Task {
        task: String,
        #[source]
        source: Box<CmdxError>,
    },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CmdxError {
    /// Attach the name of the task that failed
    pub fn in_task(self, task: &str) -> Self {
        CmdxError::Task {
            task: task.to_string(),
            source: Box::new(self),
        }
    }

    /// The exit code the program should terminate with
    ///
    /// Script failures propagate the script's own code; everything else is
    /// reported with [`FAILURE_EXIT_CODE`].
    pub fn exit_code(&self) -> i32 {
        match self {
            CmdxError::Execution(e) => e.exit_code().unwrap_or(FAILURE_EXIT_CODE),
            CmdxError::Task { source, .. } => source.exit_code(),
            CmdxError::Cli(e) => e.exit_code(),
            _ => FAILURE_EXIT_CODE,
        }
    }
}

/// Configuration discovery and parsing errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("the configuration file is not found (searched: {0})")]
    NotFound(String),

    #[error("failed to get the current directory path: {0}")]
    CurrentDir(#[source] io::Error),

    #[error("failed to read the configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse the configuration file. the configuration file is invalid: {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to create the configuration file {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("please fix the configuration file: {0}")]
    Invalid(#[from] SchemaError),
}

/// Structural problems found by validating a parsed configuration
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SchemaError {
    #[error("the task name is required")]
    TaskNameRequired,

    #[error("the task name duplicates: \"{0}\"")]
    DuplicateTaskName(String),

    #[error("the task short name duplicates: \"{0}\"")]
    DuplicateTaskShort(String),

    #[error("the length of task.short should be 0 or 1. task: {task}, short: {short}")]
    TaskShortTooLong { task: String, short: String },

    #[error("the task `{0}` is invalid. when sub tasks are set, 'script' can't be set")]
    ScriptWithTasks(String),

    #[error("the flag name is required: task: {0}")]
    FlagNameRequired(String),

    #[error("the flag name duplicates: task: \"{task}\", flag: \"{flag}\"")]
    DuplicateFlagName { task: String, flag: String },

    #[error("the flag short name duplicates: task: \"{task}\", flag.short: \"{short}\"")]
    DuplicateFlagShort { task: String, short: String },

    #[error("the length of flag.short should be 0 or 1. task: {task}, flag: {flag}, short: {short}")]
    FlagShortTooLong {
        task: String,
        flag: String,
        short: String,
    },

    #[error("the flag type should be either '' or 'string' or 'bool'. task: {task}, flag: {flag}, flag.type: {flag_type}")]
    InvalidFlagType {
        task: String,
        flag: String,
        flag_type: String,
    },

    #[error("the positional argument name is required: task: {0}")]
    ArgNameRequired(String),

    #[error("the positional argument name duplicates: task: \"{task}\", arg: \"{arg}\"")]
    DuplicateArgName { task: String, arg: String },

    #[error("the flag and the positional argument must have unique names: task: \"{task}\", name: \"{name}\"")]
    DuplicateNames { task: String, name: String },

    #[error("the prompt type is invalid: task: {task}, name: {name}, prompt: {prompt_type}")]
    InvalidPromptType {
        task: String,
        name: String,
        prompt_type: String,
    },

    #[error("the validate type should be one of '', 'int', 'url', 'email': task: {task}, name: {name}, type: {validate_type}")]
    InvalidValidateType {
        task: String,
        name: String,
        validate_type: String,
    },
}

/// Template rendering errors, always tagged with the offending template
#[derive(Error, Debug)]
#[error("failed to render the template - {template}: {message}")]
pub struct TemplateError {
    pub template: String,
    pub message: String,
}

/// A value rejected by one of the validation rules of a flag or argument
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("must be email: {0}")]
    NotEmail(String),

    #[error("must be url: {0}")]
    NotUrl(String),

    #[error("must be int: {0}")]
    NotInt(String),

    #[error("must contain {needle}: {value}")]
    MissingSubstring { needle: String, value: String },

    #[error("must start with {prefix}: {value}")]
    MissingPrefix { prefix: String, value: String },

    #[error("must end with {suffix}: {value}")]
    MissingSuffix { suffix: String, value: String },

    #[error("the length must be greater equal than {min}: {value}")]
    TooShort { min: usize, value: String },

    #[error("the length must be less equal than {max}: {value}")]
    TooLong { max: usize, value: String },

    #[error("enum ({options}): {value}")]
    NotInEnum { options: String, value: String },

    #[error("must be matched to the regular expression {pattern}: {value}")]
    RegexMismatch { pattern: String, value: String },

    #[error("invalid regular expression: {pattern}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Parameter binding errors
#[derive(Error, Debug)]
pub enum BindingError {
    #[error("{name} is invalid: {source}")]
    Invalid {
        name: String,
        #[source]
        source: ValidationError,
    },

    #[error("the flag \"{0}\" is required")]
    MissingFlag(String),

    #[error("the {ordinal} argument '{name}' is required")]
    MissingArg { ordinal: String, name: String },
}

/// Interactive prompt failures; binding falls back to the next value source
#[derive(Error, Debug)]
pub enum PromptError {
    #[error(transparent)]
    Dialog(#[from] dialoguer::Error),

    #[error("the prompt has no options to choose from")]
    NoOptions,

    #[error("the prompt was cancelled")]
    Cancelled,
}

/// Unsatisfied requirement groups
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RequirementError {
    #[error("{}", describe_exec(.0))]
    Exec(Vec<String>),

    #[error("{}", describe_environment(.0))]
    Environment(Vec<String>),
}

fn describe_exec(group: &[String]) -> String {
    match group {
        [single] => format!("{} is required", single),
        _ => format!("one of the following is required: {}", group.join(", ")),
    }
}

fn describe_environment(group: &[String]) -> String {
    match group {
        [single] => format!("the environment variable '{}' is required", single),
        _ => format!(
            "one of the following environment variables is required: {}",
            group.join(", ")
        ),
    }
}

/// Script and function execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("failed to start the script with '{shell}': {source}")]
    Spawn {
        shell: String,
        #[source]
        source: io::Error,
    },

    #[error("the script exited with code {code}")]
    Exited { code: i32 },

    #[error("the script was terminated by signal {signal}")]
    Signaled { signal: i32 },

    #[error("command is terminated by timeout: {} seconds", .duration.as_secs())]
    TimedOut {
        duration: Duration,
        exit: Option<i32>,
    },

    #[error("the script was interrupted")]
    Interrupted { exit: Option<i32> },

    #[error("failed to wait for the script: {0}")]
    Wait(#[source] io::Error),

    #[error("failed to invoke the function: {0}")]
    Function(String),

    #[error("failed to read the function response: {0}")]
    Response(#[source] io::Error),
}

impl ExecutionError {
    /// The exit code carried by a script failure, if any
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecutionError::Exited { code } => Some(*code),
            ExecutionError::Signaled { signal } => Some(128 + signal),
            ExecutionError::TimedOut { exit, .. } | ExecutionError::Interrupted { exit } => {
                Some(exit.unwrap_or(FAILURE_EXIT_CODE))
            }
            _ => None,
        }
    }
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for structure validation
pub type SchemaResult<T> = std::result::Result<T, SchemaError>;

/// Specialized result type for template rendering
pub type TemplateResult<T> = std::result::Result<T, TemplateError>;

/// Specialized result type for parameter binding
pub type BindingResult<T> = std::result::Result<T, BindingError>;

/// Specialized result type for requirement checks
pub type RequirementResult<T> = std::result::Result<T, RequirementError>;

/// Specialized result type for execution operations
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;
