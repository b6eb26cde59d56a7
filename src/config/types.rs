//! Core configuration types
//!
//! This module defines the data structures that represent a `.cmdx.yaml` configuration file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Tasks defined in the configuration, in declaration order
    #[serde(default, deserialize_with = "null_as_default")]
    pub tasks: Vec<Task>,

    /// Default templates for the environment variables a flag or arg is read from
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub input_envs: Vec<String>,

    /// Default templates for the environment variables a bound value is exported as
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub script_envs: Vec<String>,

    /// Environment variables passed to every task
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub environment: BTreeMap<String, String>,

    /// Default timeout for every task
    #[serde(default, deserialize_with = "null_as_default")]
    pub timeout: Timeout,

    /// Default for whether the executed script is echoed
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Option::is_none")]
    pub quiet: Option<bool>,
}

/// A task definition
///
/// A task either runs a script (or function) or groups nested tasks.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Task {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    /// Single character alias
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub short: String,

    /// Longer description for help text
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub description: String,

    /// Usage description for help text and `--list`
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub usage: String,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<Flag>,

    /// Positional arguments, in order
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Arg>,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub input_envs: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub script_envs: Vec<String>,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub environment: BTreeMap<String, String>,

    /// Script template; mutually exclusive with `tasks`
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub script: String,

    /// Nested tasks
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<Task>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub timeout: Timeout,

    #[serde(default, deserialize_with = "null_as_default")]
    pub require: Require,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Option::is_none")]
    pub quiet: Option<bool>,

    /// Command used to run the script, e.g. `["bash", "-c"]`
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub shell: Vec<String>,

    /// How the task is invoked
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub task_type: TaskType,

    /// Name of the managed function to invoke (`type: lambda`)
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub function_name: String,

    /// Templated payload parameters for the managed function
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub payload: Vec<PayloadParam>,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub invocation_type: String,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub log_type: String,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub region: String,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub profile: String,
}

/// How a task is invoked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Run the rendered script as a child process
    #[default]
    Shell,
    /// Invoke a managed function with a rendered payload
    Lambda,
}

/// One payload parameter of a managed function invocation
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PayloadParam {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Template rendered against the task variables
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: String,
}

/// Timeout settings, in seconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Timeout {
    /// Seconds before the script is asked to stop; 0 means unset
    #[serde(default, deserialize_with = "null_as_default")]
    pub duration: u64,

    /// Seconds between the stop request and forcible termination; 0 means never
    #[serde(default, deserialize_with = "null_as_default")]
    pub kill_after: u64,
}

/// Pre-conditions checked before a task runs
///
/// Each entry is a group of alternatives: a group is satisfied when any member
/// is available, and every group must be satisfied.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Require {
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub exec: Vec<StrList>,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<StrList>,
}

/// A list of strings that may be written as a single scalar
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StrList(pub Vec<String>);

impl StrList {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for StrList {
    fn from(items: Vec<String>) -> Self {
        StrList(items)
    }
}

impl<'de> Deserialize<'de> for StrList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;
        use serde_yaml::Value;

        let value = Value::deserialize(deserializer)?;

        match value {
            Value::String(s) => Ok(StrList(vec![s])),
            Value::Sequence(seq) => {
                let mut items = Vec::with_capacity(seq.len());
                for item in seq {
                    match item {
                        Value::String(s) => items.push(s),
                        other => {
                            return Err(D::Error::custom(format!(
                                "the type of the value must be string: {:?}",
                                other
                            )))
                        }
                    }
                }
                Ok(StrList(items))
            }
            Value::Null => Ok(StrList::default()),
            _ => Err(D::Error::custom("the value must be a string or a list of strings")),
        }
    }
}

/// A named option of a task
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Flag {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub short: String,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub usage: String,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub default: String,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub input_envs: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub script_envs: Vec<String>,

    /// `""`, `"string"` or `"bool"`
    #[serde(
        rename = "type",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub flag_type: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub required: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub prompt: Prompt,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub validate: Vec<Validate>,
}

impl Flag {
    pub fn value_type(&self) -> FlagType {
        match self.flag_type.as_str() {
            BOOL_FLAG_TYPE => FlagType::Bool,
            _ => FlagType::String,
        }
    }
}

/// Flag type name for boolean flags
pub const BOOL_FLAG_TYPE: &str = "bool";

/// Runtime type of a flag value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagType {
    String,
    Bool,
}

/// A positional argument of a task
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Arg {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub usage: String,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub default: String,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub input_envs: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub script_envs: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub required: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub prompt: Prompt,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub validate: Vec<Validate>,
}

/// Interactive input descriptor; an empty type disables prompting
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Prompt {
    #[serde(
        rename = "type",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub prompt_type: String,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub message: String,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub help: String,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl Prompt {
    /// The configured prompt kind, or `None` when prompting is disabled
    pub fn kind(&self) -> Option<PromptKind> {
        PromptKind::parse(&self.prompt_type)
    }
}

/// Supported interactive prompt widgets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Input,
    Multiline,
    Password,
    Confirm,
    Select,
    MultiSelect,
    Editor,
}

impl PromptKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "input" => Some(PromptKind::Input),
            "multiline" => Some(PromptKind::Multiline),
            "password" => Some(PromptKind::Password),
            "confirm" => Some(PromptKind::Confirm),
            "select" => Some(PromptKind::Select),
            "multi_select" => Some(PromptKind::MultiSelect),
            "editor" => Some(PromptKind::Editor),
            _ => None,
        }
    }
}

/// One validation rule; every constraint that is set must hold
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Validate {
    /// `""`, `"int"`, `"url"` or `"email"`
    #[serde(
        rename = "type",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub value_type: String,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub regexp: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub min_length: usize,

    #[serde(default, deserialize_with = "null_as_default")]
    pub max_length: usize,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub prefix: String,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub suffix: String,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub contain: String,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub r#enum: Vec<String>,
}

/// Accepted values of `validate[].type`
pub const VALIDATE_TYPES: &[&str] = &["", "int", "url", "email"];

/// Treat an explicit `null` (e.g. `flags:` with only comments below) like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
