//! Exit code constants for the hookscope binary.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid config)
//! - 2: Validation failure (malformed manifests found by `check`)
//! - 3: Extraction failure (unreadable root, missing referenced manifest)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid configuration.
pub const USER_ERROR: i32 = 1;

/// Validation failure: one or more manifests are malformed.
pub const VALIDATION_FAILURE: i32 = 2;

/// Extraction failure: an artifact root or referenced manifest is unavailable.
pub const EXTRACTION_FAILURE: i32 = 3;
