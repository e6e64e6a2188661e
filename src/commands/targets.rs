//! Implementation of the `hookscope targets` command.

use hookscope::config::AgentConfig;
use hookscope::error::Result;
use hookscope::exit_codes;
use hookscope::metadata::Registry;
use std::fmt::Write;

/// Execute the `hookscope targets` command.
///
/// Lists every target type with the signatures an instrumentation mechanism
/// must intercept on it.
pub fn cmd_targets(config: AgentConfig) -> Result<i32> {
    let registry = config.extractor()?.extract(&config.roots)?;
    print!("{}", render(&registry));
    Ok(exit_codes::SUCCESS)
}

fn render(registry: &Registry) -> String {
    let mut out = String::new();
    for (target, signatures) in registry.instrumented_targets() {
        let _ = writeln!(out, "{}:", target);
        for signature in signatures {
            let _ = writeln!(out, "  - {}", signature);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookscope::metadata::HandlerMetadata;
    use hookscope::signature::MethodSignature;

    #[test]
    fn test_render_groups_signatures_by_target() {
        let metadata = |name: &str, targets: &[&str], method: &str| HandlerMetadata {
            handler_name: name.to_string(),
            target_types: targets.iter().map(|t| t.to_string()).collect(),
            signatures: [MethodSignature::new(method, vec![])].into(),
            skip_nested_calls: true,
        };
        let registry = Registry::new([
            metadata("a.One", &["app.Service"], "stop"),
            metadata("a.Two", &["app.Service", "app.Worker"], "run"),
        ]);

        assert_eq!(
            render(&registry),
            "app.Service:\n  - run()\n  - stop()\napp.Worker:\n  - run()\n"
        );
    }
}
