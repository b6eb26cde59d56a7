//! Task execution engine
//!
//! This module binds parameters, renders scripts and runs them as child
//! processes under the timeout and cancellation policy of the task.

pub mod bind;
pub mod execute;
pub mod function;
pub mod prompt;
pub mod require;
pub mod signal;
pub mod task;
pub mod template;
pub mod validate;
pub mod vars;

// Re-export main types
pub use bind::{Binder, FlagSource};
pub use execute::{run_script, ScriptParams, DEFAULT_SHELL};
pub use function::{AwsCliClient, FunctionClient, FunctionRequest};
pub use prompt::{Prompter, TerminalPrompter};
pub use require::{check_environment, check_executables, check_requirements};
pub use signal::{listen, CancelHandle, CancelToken, SignalGuard};
pub use task::{task_env, Context, TaskAction, TaskRunner};
pub use template::{render, Renderer};
pub use validate::validate_value;
pub use vars::{Builtin, Value, Variables};
