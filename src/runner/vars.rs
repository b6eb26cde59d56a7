//! Per-invocation variables
//!
//! The variable map tracks the bound value of every flag and positional
//! argument, plus the reserved `_builtin` entry with the raw positional
//! arguments. It is the context scripts are rendered against.

use serde::Serialize;
use std::collections::BTreeMap;

/// A bound parameter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Bool(bool),
    List(Vec<String>),
}

impl Value {
    /// Serialize for an environment variable: strings as-is, booleans as
    /// `true`/`false`, lists comma-joined
    pub fn to_env_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::List(items) => items.join(","),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Raw positional arguments exposed as `_builtin`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Builtin {
    /// Positional arguments beyond the declared ones
    pub args: Vec<String>,
    pub args_string: String,
    /// Every positional argument
    pub all_args: Vec<String>,
    pub all_args_string: String,
}

impl Builtin {
    pub fn new(all_args: &[String], declared: usize) -> Self {
        let extra = all_args.get(declared..).unwrap_or_default().to_vec();
        Builtin {
            args_string: extra.join(" "),
            args: extra,
            all_args_string: all_args.join(" "),
            all_args: all_args.to_vec(),
        }
    }
}

/// Values of one task invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Variables {
    #[serde(flatten)]
    values: BTreeMap<String, Value>,

    #[serde(rename = "_builtin")]
    builtin: Builtin,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn builtin(&self) -> &Builtin {
        &self.builtin
    }

    pub fn set_builtin(&mut self, builtin: Builtin) {
        self.builtin = builtin;
    }

    /// Merge another set of values; entries of `other` win
    pub fn extend(&mut self, other: Variables) {
        self.values.extend(other.values);
    }
}

/// Environment entries exported to the script for each bound parameter with
/// script env names
pub fn script_env<'a, I>(params: I, vars: &Variables) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (&'a str, &'a [String])>,
{
    let mut env = Vec::new();
    for (name, env_names) in params {
        let Some(value) = vars.get(name) else {
            continue;
        };
        let value = value.to_env_string();
        env.extend(env_names.iter().map(|key| (key.clone(), value.clone())));
    }
    env
}
