//! CLI argument parsing for hookscope.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Hookscope: inspect instrumentation hook manifests.
///
/// Reads capability manifests from directories and zip bundles and shows
/// the handler registry an agent would build from them.
#[derive(Parser, Debug)]
#[command(name = "hookscope")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Agent config file (YAML). Roots listed there are scanned when none are given.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for hookscope.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the canonical handler registry.
    Scan(ScanArgs),

    /// Print each target type with the method signatures to intercept.
    Targets(RootArgs),

    /// List accepted and excluded handlers.
    ///
    /// Exits with the validation code when any manifest is malformed.
    Check(RootArgs),
}

/// Roots and filters shared by every command.
#[derive(Args, Debug, Clone)]
pub struct RootArgs {
    /// Directories or zip bundles holding manifests.
    pub roots: Vec<PathBuf>,

    /// Glob over logical handler names (repeatable).
    #[arg(long, value_delimiter = ',')]
    pub include: Vec<String>,
}

/// Arguments for the `scan` command.
#[derive(Args, Debug)]
pub struct ScanArgs {
    #[command(flatten)]
    pub roots: RootArgs,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Yaml,
    Json,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
