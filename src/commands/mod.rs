//! Command implementations for hookscope.
//!
//! Routes parsed CLI commands to their implementations. Each command returns
//! the process exit code on success; errors carry their own exit code.

mod check;
mod scan;
mod targets;

use crate::cli::{Command, RootArgs};
use hookscope::config::AgentConfig;
use hookscope::error::{HookError, Result};

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command, config: AgentConfig) -> Result<i32> {
    match command {
        Command::Scan(args) => scan::cmd_scan(effective_config(config, &args.roots)?, args.format),
        Command::Targets(args) => targets::cmd_targets(effective_config(config, &args)?),
        Command::Check(args) => check::cmd_check(effective_config(config, &args)?),
    }
}

/// Apply command-line roots and filters on top of the loaded config.
fn effective_config(mut config: AgentConfig, args: &RootArgs) -> Result<AgentConfig> {
    if !args.roots.is_empty() {
        config.roots = args.roots.clone();
    }
    if !args.include.is_empty() {
        config.include = args.include.clone();
    }

    if config.roots.is_empty() {
        return Err(HookError::Config(
            "no artifact roots given.\n\n\
             Pass one or more ROOTS, or list them under `roots:` in the --config file."
                .to_string(),
        ));
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args(roots: &[&str], include: &[&str]) -> RootArgs {
        RootArgs {
            roots: roots.iter().map(PathBuf::from).collect(),
            include: include.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_command_line_overrides_config() {
        let config = AgentConfig {
            roots: vec![PathBuf::from("/opt/hooks")],
            include: vec!["org.*".to_string()],
            ..AgentConfig::default()
        };

        let merged = effective_config(config.clone(), &args(&["hooks"], &[])).unwrap();
        assert_eq!(merged.roots, vec![PathBuf::from("hooks")]);
        assert_eq!(merged.include, vec!["org.*"]);

        let merged = effective_config(config, &args(&[], &["com.*"])).unwrap();
        assert_eq!(merged.roots, vec![PathBuf::from("/opt/hooks")]);
        assert_eq!(merged.include, vec!["com.*"]);
    }

    #[test]
    fn test_missing_roots_is_user_error() {
        let err = effective_config(AgentConfig::default(), &args(&[], &[])).unwrap_err();
        assert_eq!(err.exit_code(), hookscope::exit_codes::USER_ERROR);
    }

    #[test]
    fn test_invalid_include_is_user_error() {
        let err = effective_config(AgentConfig::default(), &args(&["hooks"], &["com.[x"])).unwrap_err();
        assert!(matches!(err, HookError::Config(_)));
    }
}
