//! Parameter binding
//!
//! Turns the declared flags and positional arguments of a task into
//! [`Variables`], consulting the command line, interactive prompts,
//! environment variables and defaults in a fixed order.

use crate::config::types::{Arg, Flag, FlagType, Validate};
use crate::error::{BindingError, BindingResult};
use crate::runner::prompt::Prompter;
use crate::runner::validate::validate_value;
use crate::runner::vars::{Builtin, Value, Variables};
use tracing::{debug, warn};

/// Flag values parsed from the command line
pub trait FlagSource {
    /// Whether the flag was given explicitly (on the command line or through
    /// one of its input environment variables)
    fn is_set(&self, name: &str) -> bool;

    /// Boolean value; `false` when absent
    fn bool_value(&self, name: &str) -> bool;

    /// String value, falling back to the declared default
    fn string_value(&self, name: &str) -> String;
}

type EnvLookup = fn(&str) -> Option<String>;

/// Binds flags and arguments for one invocation
pub struct Binder<P, E = EnvLookup> {
    prompter: P,
    lookup_env: E,
}

impl<P: Prompter> Binder<P> {
    /// A binder reading the process environment
    pub fn new(prompter: P) -> Self {
        Binder {
            prompter,
            lookup_env: process_env,
        }
    }
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

impl<P, E> Binder<P, E>
where
    P: Prompter,
    E: Fn(&str) -> Option<String>,
{
    /// Replace the environment lookup used for argument fallbacks
    pub fn with_env<F>(self, lookup_env: F) -> Binder<P, F>
    where
        F: Fn(&str) -> Option<String>,
    {
        Binder {
            prompter: self.prompter,
            lookup_env,
        }
    }

    /// Bind every flag and argument of a task
    pub fn bind(
        &self,
        flags: &[Flag],
        source: &dyn FlagSource,
        args: &[Arg],
        positional: &[String],
    ) -> BindingResult<Variables> {
        let mut vars = self.bind_flags(flags, source)?;
        vars.extend(self.bind_args(args, positional)?);
        vars.set_builtin(Builtin::new(positional, args.len()));
        Ok(vars)
    }

    /// Bind declared flags
    pub fn bind_flags(&self, flags: &[Flag], source: &dyn FlagSource) -> BindingResult<Variables> {
        let mut vars = Variables::new();
        for flag in flags {
            let value = self.bind_flag(flag, source)?;
            debug!(flag = %flag.name, "bound flag");
            vars.insert(flag.name.clone(), value);
        }
        Ok(vars)
    }

    fn bind_flag(&self, flag: &Flag, source: &dyn FlagSource) -> BindingResult<Value> {
        let is_bool = flag.value_type() == FlagType::Bool;

        if source.is_set(&flag.name) {
            if is_bool {
                return Ok(Value::Bool(source.bool_value(&flag.name)));
            }
            let value = source.string_value(&flag.name);
            check(&flag.name, &value, &flag.validate)?;
            return Ok(Value::String(value));
        }

        if let Some(kind) = flag.prompt.kind() {
            match self.prompter.ask(kind, &flag.prompt) {
                Ok(value) => {
                    if let Value::String(s) = &value {
                        check(&flag.name, s, &flag.validate)?;
                    }
                    return Ok(value);
                }
                Err(e) => warn!(flag = %flag.name, error = %e, "prompt failed"),
            }
        }

        // An absent boolean flag is false, never missing
        if is_bool {
            return Ok(Value::Bool(source.bool_value(&flag.name)));
        }

        let value = source.string_value(&flag.name);
        if !value.is_empty() {
            check(&flag.name, &value, &flag.validate)?;
            return Ok(Value::String(value));
        }
        if flag.required {
            return Err(BindingError::MissingFlag(flag.name.clone()));
        }
        Ok(Value::String(String::new()))
    }

    /// Bind declared positional arguments
    ///
    /// Values beyond the declared arguments are not bound here; they are
    /// exposed through `_builtin` by [`Binder::bind`].
    pub fn bind_args(&self, args: &[Arg], positional: &[String]) -> BindingResult<Variables> {
        let mut vars = Variables::new();
        for (index, arg) in args.iter().enumerate() {
            if let Some(value) = self.bind_arg(index, arg, positional)? {
                debug!(arg = %arg.name, "bound argument");
                vars.insert(arg.name.clone(), value);
            }
        }
        Ok(vars)
    }

    fn bind_arg(
        &self,
        index: usize,
        arg: &Arg,
        positional: &[String],
    ) -> BindingResult<Option<Value>> {
        if let Some(value) = positional.get(index) {
            check(&arg.name, value, &arg.validate)?;
            return Ok(Some(Value::String(value.clone())));
        }

        let from_env = arg
            .input_envs
            .iter()
            .find_map(|name| (self.lookup_env)(name.as_str()));
        if let Some(value) = from_env {
            check(&arg.name, &value, &arg.validate)?;
            return Ok(Some(Value::String(value)));
        }

        if let Some(kind) = arg.prompt.kind() {
            return match self.prompter.ask(kind, &arg.prompt) {
                Ok(value) => {
                    if let Value::String(s) = &value {
                        check(&arg.name, s, &arg.validate)?;
                    }
                    Ok(Some(value))
                }
                Err(e) => {
                    warn!(arg = %arg.name, error = %e, "prompt failed");
                    Ok((!arg.default.is_empty()).then(|| Value::String(arg.default.clone())))
                }
            };
        }

        if !arg.default.is_empty() {
            return Ok(Some(Value::String(arg.default.clone())));
        }
        if arg.required {
            return Err(BindingError::MissingArg {
                ordinal: ordinal(index + 1),
                name: arg.name.clone(),
            });
        }
        Ok(Some(Value::String(String::new())))
    }
}

fn check(name: &str, value: &str, rules: &[Validate]) -> BindingResult<()> {
    validate_value(value, rules).map_err(|source| BindingError::Invalid {
        name: name.to_string(),
        source,
    })
}

/// `1st`, `2nd`, `3rd`, `4th`, ... `11th`, `12th`, `13th`, `21st`
fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}
