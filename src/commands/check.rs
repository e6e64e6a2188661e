//! Implementation of the `hookscope check` command.

use hookscope::config::AgentConfig;
use hookscope::error::Result;
use hookscope::exit_codes;
use hookscope::extract::Extraction;
use std::fmt::Write;

/// Execute the `hookscope check` command.
///
/// Prints one line per accepted handler and per excluded manifest. Handlers
/// without targets or signatures are reported but do not fail the check;
/// malformed manifests do.
pub fn cmd_check(config: AgentConfig) -> Result<i32> {
    let extraction = config.extractor()?.extract_with_report(&config.roots)?;
    print!("{}", render(&extraction));

    if extraction.has_malformed() {
        Ok(exit_codes::VALIDATION_FAILURE)
    } else {
        Ok(exit_codes::SUCCESS)
    }
}

fn render(extraction: &Extraction) -> String {
    let mut out = String::new();
    for metadata in &extraction.registry {
        let _ = writeln!(
            out,
            "ok        {} ({} target(s), {} signature(s))",
            metadata.handler_name,
            metadata.target_types.len(),
            metadata.signatures.len()
        );
    }
    for exclusion in &extraction.excluded {
        let _ = writeln!(
            out,
            "excluded  {} [{}]: {}",
            exclusion.logical_name, exclusion.location, exclusion.reason
        );
    }
    let _ = writeln!(
        out,
        "\n{} accepted, {} excluded",
        extraction.registry.len(),
        extraction.excluded.len()
    );
    out
}
