//! Running one resolved task
//!
//! Requirements are checked first, then flags and arguments are bound, the
//! script (or function payload) is rendered and finally executed.

use crate::config::types::{Task, TaskType};
use crate::error::{ExecutionResult, Result};
use crate::runner::bind::{Binder, FlagSource};
use crate::runner::execute::{run_script, ScriptParams};
use crate::runner::function::{AwsCliClient, FunctionClient, FunctionRequest};
use crate::runner::prompt::{Prompter, TerminalPrompter};
use crate::runner::require::check_requirements;
use crate::runner::signal::CancelToken;
use crate::runner::template;
use crate::runner::vars::{script_env, Variables};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Invocation-wide settings
#[derive(Debug, Clone)]
pub struct Context {
    /// Directory scripts run in
    pub working_dir: PathBuf,

    /// Global `--quiet`; overrides the task setting when given
    pub quiet: Option<bool>,

    /// Print scripts without running them
    pub dry_run: bool,
}

impl Context {
    pub fn new(working_dir: PathBuf) -> Self {
        Context {
            working_dir,
            quiet: None,
            dry_run: false,
        }
    }

    pub fn with_quiet(mut self, quiet: Option<bool>) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Effective quiet setting for a task
    pub fn is_quiet(&self, task: &Task) -> bool {
        self.quiet.or(task.quiet).unwrap_or(false)
    }
}

/// What a task does once its variables are bound
pub enum TaskAction<'a> {
    Script(ScriptParams<'a>),
    Function {
        request: FunctionRequest,
        client: &'a dyn FunctionClient,
        quiet: bool,
        dry_run: bool,
    },
}

impl TaskAction<'_> {
    pub async fn execute(&self, cancel: &mut CancelToken) -> ExecutionResult<()> {
        match self {
            TaskAction::Script(params) => run_script(params, cancel).await,
            TaskAction::Function {
                request,
                client,
                quiet,
                dry_run,
            } => {
                if !quiet {
                    eprintln!("+ lambda invoke {} {}", request.function_name, request.payload);
                }
                if *dry_run {
                    return Ok(());
                }
                client.invoke(request, cancel).await
            }
        }
    }
}

/// Runs tasks with a prompter and a function client
pub struct TaskRunner<P = TerminalPrompter, F = AwsCliClient> {
    binder: Binder<P>,
    functions: F,
    context: Context,
}

impl TaskRunner {
    /// A runner prompting on the terminal and invoking functions with the AWS CLI
    pub fn new(context: Context) -> Self {
        TaskRunner::with_parts(context, TerminalPrompter::new(), AwsCliClient)
    }
}

impl<P: Prompter, F: FunctionClient> TaskRunner<P, F> {
    pub fn with_parts(context: Context, prompter: P, functions: F) -> Self {
        TaskRunner {
            binder: Binder::new(prompter),
            functions,
            context,
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Run a resolved leaf task
    pub async fn run(
        &self,
        task: &Task,
        flags: &dyn FlagSource,
        positional: &[String],
        cancel: &mut CancelToken,
    ) -> Result<()> {
        info!(task = %task.name, "running task");

        check_requirements(&task.require)?;
        let vars = self
            .binder
            .bind(&task.flags, flags, &task.args, positional)?;
        let env = task_env(task, &vars);
        let quiet = self.context.is_quiet(task);

        match task.task_type {
            TaskType::Shell => {
                let script = template::render(&task.script, &vars)?;
                debug!(task = %task.name, env = env.len(), "rendered script");
                let action = TaskAction::Script(ScriptParams {
                    script: &script,
                    shell: &task.shell,
                    working_dir: self.working_dir(),
                    env: &env,
                    quiet,
                    dry_run: self.context.dry_run,
                    timeout: task.timeout,
                });
                action.execute(cancel).await?;
            }
            TaskType::Lambda => {
                let action = TaskAction::Function {
                    request: FunctionRequest::from_task(task, &vars)?,
                    client: &self.functions,
                    quiet,
                    dry_run: self.context.dry_run,
                };
                action.execute(cancel).await?;
            }
        }

        Ok(())
    }

    fn working_dir(&self) -> &Path {
        &self.context.working_dir
    }
}

/// Script env exports of flags and args followed by the task environment
pub fn task_env(task: &Task, vars: &Variables) -> Vec<(String, String)> {
    let params = task
        .flags
        .iter()
        .map(|f| (f.name.as_str(), f.script_envs.as_slice()))
        .chain(
            task.args
                .iter()
                .map(|a| (a.name.as_str(), a.script_envs.as_slice())),
        );

    let mut env = script_env(params, vars);
    env.extend(
        task.environment
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );
    env
}
