//! `pomforge transpile`: recorded script to feature, locators and steps.

use crate::cli::output;
use crate::transpiler::{transpile_file, StepStyle, TranspileOptions};
use anyhow::Result;
use std::path::Path;

/// Run the transpile command.
pub fn run(input: &Path, output_dir: &Path, and_steps: bool) -> Result<()> {
    let opts = TranspileOptions {
        step_style: if and_steps { StepStyle::And } else { StepStyle::When },
        ..TranspileOptions::default()
    };
    let transpiled = transpile_file(input, output_dir, &opts)?;

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "site": transpiled.site,
            "actions": transpiled.actions,
            "locators": transpiled.locators,
            "unsupported": transpiled.unsupported,
            "outputDir": output_dir,
        }));
        return Ok(());
    }

    output::say(format!(
        "{} actions, {} locators written to {}",
        transpiled.actions.len(),
        transpiled.locators.len(),
        output_dir.display()
    ));
    for line in &transpiled.unsupported {
        output::say(format!("  skipped line {}: {} ({})", line.line_no, line.text, line.reason));
    }
    Ok(())
}
