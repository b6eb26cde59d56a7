//! Configuration parsing, validation and resolution
//!
//! This module handles discovery and parsing of `.cmdx.yaml` files,
//! structural validation, and propagation of defaults through the task tree.

pub mod parse;
pub mod resolve;
pub mod schema;
pub mod types;

// Re-export main types
pub use parse::*;
pub use resolve::*;
pub use schema::*;
pub use types::*;
