//! cmdx - a declarative YAML task runner
//!
//! Tasks described in a `.cmdx.yaml` file become sub-commands with typed
//! flags, positional arguments, prompts and environment fallbacks. The bound
//! values are rendered into a shell script which runs under a timeout and
//! kill-escalation policy.

// Public modules
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod runner;

// Re-export commonly used types
pub use error::{CmdxError, Result};

/// Current version of cmdx
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
