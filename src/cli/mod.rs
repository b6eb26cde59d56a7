//! CLI interface and argument parsing
//!
//! This module turns the resolved configuration into a command tree, handles
//! the global flags and hands the selected task to the runner.

pub mod app;
pub mod flags;

// Re-export main types
pub use app::*;
pub use flags::MatchesFlags;
