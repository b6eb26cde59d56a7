//! Default propagation through the task tree
//!
//! Global settings flow into top-level tasks, and every group task passes its
//! own resolved settings down to its children. Resolution never mutates its
//! input: each call returns a new, fully resolved value.

use crate::config::types::{Arg, Config, Flag, Prompt, StrList, Task, Timeout};
use crate::error::TemplateResult;
use crate::runner::template;
use std::collections::BTreeMap;
use tracing::debug;

/// Timeout applied when neither the task nor any enclosing scope sets one
pub const DEFAULT_TIMEOUT_SECS: u64 = 36000;

/// Settings a task inherits from its enclosing scope
#[derive(Debug, Clone, Copy)]
pub struct Inherited<'a> {
    pub input_envs: &'a [String],
    pub script_envs: &'a [String],
    pub environment: &'a BTreeMap<String, String>,
    pub timeout: Timeout,
    pub quiet: Option<bool>,
    pub require_exec: &'a [StrList],
    pub require_environment: &'a [StrList],
    pub shell: &'a [String],
}

impl<'a> Inherited<'a> {
    /// Global defaults from the top of the document
    pub fn from_config(config: &'a Config) -> Self {
        Inherited {
            input_envs: &config.input_envs,
            script_envs: &config.script_envs,
            environment: &config.environment,
            timeout: config.timeout,
            quiet: config.quiet,
            require_exec: &[],
            require_environment: &[],
            shell: &[],
        }
    }

    /// Defaults a resolved group task hands to its children
    pub fn from_task(task: &'a Task) -> Self {
        Inherited {
            input_envs: &task.input_envs,
            script_envs: &task.script_envs,
            environment: &task.environment,
            timeout: task.timeout,
            quiet: task.quiet,
            require_exec: &task.require.exec,
            require_environment: &task.require.environment,
            shell: &task.shell,
        }
    }
}

/// Resolve every task of the configuration
pub fn resolve_config(config: &Config) -> TemplateResult<Config> {
    let inherited = Inherited::from_config(config);
    let tasks = config
        .tasks
        .iter()
        .map(|task| resolve_task(task, &inherited))
        .collect::<TemplateResult<Vec<_>>>()?;

    Ok(Config {
        tasks,
        ..config.clone()
    })
}

/// Resolve one task (and its children) against the settings of its parent scope
pub fn resolve_task(task: &Task, inherited: &Inherited<'_>) -> TemplateResult<Task> {
    let input_envs = or_inherited(&task.input_envs, inherited.input_envs);
    let script_envs = or_inherited(&task.script_envs, inherited.script_envs);

    let mut environment = inherited.environment.clone();
    environment.extend(task.environment.iter().map(|(k, v)| (k.clone(), v.clone())));

    let timeout = Timeout {
        duration: [task.timeout.duration, inherited.timeout.duration]
            .into_iter()
            .find(|d| *d != 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS),
        kill_after: if task.timeout.kill_after != 0 {
            task.timeout.kill_after
        } else {
            inherited.timeout.kill_after
        },
    };

    let flags = task
        .flags
        .iter()
        .map(|flag| resolve_flag(flag, input_envs, script_envs))
        .collect::<TemplateResult<Vec<_>>>()?;
    let args = task
        .args
        .iter()
        .map(|arg| resolve_arg(arg, input_envs, script_envs))
        .collect::<TemplateResult<Vec<_>>>()?;

    let mut resolved = Task {
        flags,
        args,
        input_envs: input_envs.to_vec(),
        script_envs: script_envs.to_vec(),
        environment,
        timeout,
        quiet: task.quiet.or(inherited.quiet),
        shell: or_inherited(&task.shell, inherited.shell).to_vec(),
        tasks: Vec::new(),
        ..task.clone()
    };
    resolved.require.exec = merge_groups(&task.require.exec, inherited.require_exec);
    resolved.require.environment =
        merge_groups(&task.require.environment, inherited.require_environment);

    if !task.tasks.is_empty() {
        let children = {
            let parent = Inherited::from_task(&resolved);
            task.tasks
                .iter()
                .map(|child| resolve_task(child, &parent))
                .collect::<TemplateResult<Vec<_>>>()?
        };
        resolved.tasks = children;
    }

    debug!(
        task = %resolved.name,
        timeout = resolved.timeout.duration,
        kill_after = resolved.timeout.kill_after,
        "resolved task"
    );
    Ok(resolved)
}

fn resolve_flag(
    flag: &Flag,
    input_envs: &[String],
    script_envs: &[String],
) -> TemplateResult<Flag> {
    Ok(Flag {
        input_envs: env_names(or_inherited(&flag.input_envs, input_envs), &flag.name)?,
        script_envs: env_names(or_inherited(&flag.script_envs, script_envs), &flag.name)?,
        prompt: default_prompt_message(&flag.prompt, &flag.name),
        ..flag.clone()
    })
}

fn resolve_arg(arg: &Arg, input_envs: &[String], script_envs: &[String]) -> TemplateResult<Arg> {
    Ok(Arg {
        input_envs: env_names(or_inherited(&arg.input_envs, input_envs), &arg.name)?,
        script_envs: env_names(or_inherited(&arg.script_envs, script_envs), &arg.name)?,
        prompt: default_prompt_message(&arg.prompt, &arg.name),
        ..arg.clone()
    })
}

fn or_inherited<'a, T>(own: &'a [T], inherited: &'a [T]) -> &'a [T] {
    if own.is_empty() {
        inherited
    } else {
        own
    }
}

/// Own groups first, then inherited groups not already present
fn merge_groups(own: &[StrList], inherited: &[StrList]) -> Vec<StrList> {
    let mut groups = own.to_vec();
    for group in inherited {
        if !groups.contains(group) {
            groups.push(group.clone());
        }
    }
    groups
}

/// Render env-name templates for a parameter, e.g. `{{name}}_PATH` with
/// `source` becomes `SOURCE_PATH`
pub fn env_names(templates: &[String], name: &str) -> TemplateResult<Vec<String>> {
    let ctx = BTreeMap::from([("name", name)]);
    templates
        .iter()
        .map(|tpl| {
            template::render(tpl, &ctx).map(|rendered| rendered.replace('-', "_").to_uppercase())
        })
        .collect()
}

fn default_prompt_message(prompt: &Prompt, name: &str) -> Prompt {
    let mut prompt = prompt.clone();
    if !prompt.prompt_type.is_empty() && prompt.message.is_empty() {
        prompt.message = name.to_string();
    }
    prompt
}
