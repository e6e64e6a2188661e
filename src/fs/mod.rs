//! Filesystem utilities.
//!
//! Manifests are written atomically so that a concurrently running scan never
//! observes a half-written file.

pub mod atomic;

pub use atomic::atomic_write;
pub use atomic::atomic_write_file;
