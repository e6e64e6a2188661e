//! Agent configuration.
//!
//! This module defines the `AgentConfig` struct, read from a YAML file
//! (conventionally `hookscope.yaml`). Parsing is forward-compatible (unknown
//! fields are ignored), optional fields have defaults, and values are
//! validated after loading.

mod model;
mod operations;
pub mod types;


// Re-export public API
pub use model::AgentConfig;
pub use types::{LogLevel, default_manifest_suffixes};
