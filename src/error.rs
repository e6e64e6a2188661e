//! Error types for hookscope.
//!
//! Uses thiserror for derive macros. Extraction and configuration errors are
//! fatal and propagate to startup. Resolution and invocation errors never
//! leave the dispatcher; they are turned into diagnostics instead.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for hookscope operations.
#[derive(Error, Debug)]
pub enum HookError {
    /// Invalid configuration or invalid command line input.
    #[error("{0}")]
    Config(String),

    /// An artifact root could not be opened or read.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// A resource referenced during extraction is not present in any root.
    #[error("not found: {0}")]
    NotFound(String),

    /// A manifest could not be parsed or is structurally invalid.
    #[error("malformed manifest: {0}")]
    Manifest(String),

    /// Writing an output file failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// A handler type could not be resolved through the isolation domain.
    #[error("cannot resolve handler {0}")]
    Resolution(String),

    /// A handler constructor or entry point failed.
    #[error("handler invocation failed: {0}")]
    Invocation(String),
}

impl HookError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            HookError::Config(_) | HookError::Io(_) => exit_codes::USER_ERROR,
            HookError::Manifest(_) => exit_codes::VALIDATION_FAILURE,
            HookError::Extraction(_) | HookError::NotFound(_) => exit_codes::EXTRACTION_FAILURE,
            HookError::Resolution(_) | HookError::Invocation(_) => exit_codes::USER_ERROR,
        }
    }
}

/// Result type alias for hookscope operations.
pub type Result<T> = std::result::Result<T, HookError>;
