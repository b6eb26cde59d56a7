//! Configuration validation
//!
//! Structural checks run once after parsing and before any task is resolved
//! or executed.

use crate::config::types::{Arg, Config, Flag, Prompt, PromptKind, Task, Validate, VALIDATE_TYPES};
use crate::error::{SchemaError, SchemaResult};
use std::collections::HashSet;

/// Accepted values of `flags[].type`
const FLAG_TYPES: &[&str] = &["", "bool", "string"];

/// Validate a complete configuration
pub fn validate_config(config: &Config) -> SchemaResult<()> {
    validate_tasks(&config.tasks)
}

/// Validate a list of sibling tasks and everything nested below them
fn validate_tasks(tasks: &[Task]) -> SchemaResult<()> {
    let mut names = HashSet::with_capacity(tasks.len());
    let mut shorts = HashSet::with_capacity(tasks.len());

    for task in tasks {
        if !names.insert(task.name.as_str()) {
            return Err(SchemaError::DuplicateTaskName(task.name.clone()));
        }
        if !task.short.is_empty() && !shorts.insert(task.short.as_str()) {
            return Err(SchemaError::DuplicateTaskShort(task.short.clone()));
        }
        validate_task(task)?;
    }

    Ok(())
}

/// Validate a single task
pub fn validate_task(task: &Task) -> SchemaResult<()> {
    if task.name.is_empty() {
        return Err(SchemaError::TaskNameRequired);
    }
    if task.short.chars().count() > 1 {
        return Err(SchemaError::TaskShortTooLong {
            task: task.name.clone(),
            short: task.short.clone(),
        });
    }

    let mut flag_names = HashSet::with_capacity(task.flags.len());
    let mut flag_shorts = HashSet::with_capacity(task.flags.len());
    for flag in &task.flags {
        validate_flag(&task.name, flag, &mut flag_names, &mut flag_shorts)?;
    }

    let mut arg_names = HashSet::with_capacity(task.args.len());
    for arg in &task.args {
        validate_arg(&task.name, arg, &mut arg_names)?;
    }

    // Flags and args share one variable map
    if let Some(arg) = task
        .args
        .iter()
        .find(|arg| flag_names.contains(arg.name.as_str()))
    {
        return Err(SchemaError::DuplicateNames {
            task: task.name.clone(),
            name: arg.name.clone(),
        });
    }

    if !task.tasks.is_empty() {
        if !task.script.is_empty() {
            return Err(SchemaError::ScriptWithTasks(task.name.clone()));
        }
        validate_tasks(&task.tasks)?;
    }

    Ok(())
}

fn validate_flag<'a>(
    task_name: &str,
    flag: &'a Flag,
    names: &mut HashSet<&'a str>,
    shorts: &mut HashSet<&'a str>,
) -> SchemaResult<()> {
    if flag.name.is_empty() {
        return Err(SchemaError::FlagNameRequired(task_name.to_string()));
    }
    if flag.short.chars().count() > 1 {
        return Err(SchemaError::FlagShortTooLong {
            task: task_name.to_string(),
            flag: flag.name.clone(),
            short: flag.short.clone(),
        });
    }
    if !names.insert(flag.name.as_str()) {
        return Err(SchemaError::DuplicateFlagName {
            task: task_name.to_string(),
            flag: flag.name.clone(),
        });
    }
    if !flag.short.is_empty() && !shorts.insert(flag.short.as_str()) {
        return Err(SchemaError::DuplicateFlagShort {
            task: task_name.to_string(),
            short: flag.short.clone(),
        });
    }
    if !FLAG_TYPES.contains(&flag.flag_type.as_str()) {
        return Err(SchemaError::InvalidFlagType {
            task: task_name.to_string(),
            flag: flag.name.clone(),
            flag_type: flag.flag_type.clone(),
        });
    }

    validate_prompt(task_name, &flag.name, &flag.prompt)?;
    validate_rules(task_name, &flag.name, &flag.validate)
}

fn validate_arg<'a>(
    task_name: &str,
    arg: &'a Arg,
    names: &mut HashSet<&'a str>,
) -> SchemaResult<()> {
    if arg.name.is_empty() {
        return Err(SchemaError::ArgNameRequired(task_name.to_string()));
    }
    if !names.insert(arg.name.as_str()) {
        return Err(SchemaError::DuplicateArgName {
            task: task_name.to_string(),
            arg: arg.name.clone(),
        });
    }

    validate_prompt(task_name, &arg.name, &arg.prompt)?;
    validate_rules(task_name, &arg.name, &arg.validate)
}

fn validate_prompt(task_name: &str, name: &str, prompt: &Prompt) -> SchemaResult<()> {
    if prompt.prompt_type.is_empty() || PromptKind::parse(&prompt.prompt_type).is_some() {
        return Ok(());
    }
    Err(SchemaError::InvalidPromptType {
        task: task_name.to_string(),
        name: name.to_string(),
        prompt_type: prompt.prompt_type.clone(),
    })
}

fn validate_rules(task_name: &str, name: &str, rules: &[Validate]) -> SchemaResult<()> {
    match rules
        .iter()
        .find(|rule| !VALIDATE_TYPES.contains(&rule.value_type.as_str()))
    {
        Some(rule) => Err(SchemaError::InvalidValidateType {
            task: task_name.to_string(),
            name: name.to_string(),
            validate_type: rule.value_type.clone(),
        }),
        None => Ok(()),
    }
}
