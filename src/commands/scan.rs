//! Implementation of the `hookscope scan` command.

use crate::cli::OutputFormat;
use hookscope::config::AgentConfig;
use hookscope::error::Result;
use hookscope::exit_codes;
use hookscope::metadata::Registry;

/// Execute the `hookscope scan` command.
///
/// Prints the registry in canonical form. Output is identical for identical
/// manifests regardless of root order or scan order.
pub fn cmd_scan(config: AgentConfig, format: OutputFormat) -> Result<i32> {
    let registry = config.extractor()?.extract(&config.roots)?;
    print!("{}", render(&registry, format)?);
    Ok(exit_codes::SUCCESS)
}

fn render(registry: &Registry, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => registry.to_canonical_string(),
        OutputFormat::Json => Ok(format!("{}\n", registry.to_json()?)),
    }
}
