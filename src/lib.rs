//! Hookscope: hook metadata extraction and call dispatch for instrumentation
//! agents.
//!
//! At startup, `extract` reads capability manifests from directory and zip
//! roots and builds an immutable `Registry` of handler metadata without
//! touching any handler code. At runtime, the instrumentation mechanism calls
//! `Dispatcher::on_entry` and `Dispatcher::on_exit` around every intercepted
//! method; the dispatcher matches the call against the registry, manages
//! per-thread handler instances and runs their entry points.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod exit_codes;
pub mod extract;
pub mod fs;
pub mod handler;
pub mod lifecycle;
pub mod metadata;
pub mod metrics;
pub mod signature;

#[cfg(test)]
mod test_support;
