//! Recorded-script transpiler.
//!
//! Turns a flat recorded automation script into three artifacts: a Gherkin
//! feature, a locators module and step definitions that replay each action
//! on every open page.

pub mod emit;
pub mod grammar;
pub mod lexer;

pub use grammar::{Action, ParsedScript, RoleTarget, UnsupportedLine};

use crate::pom::LocatorEntry;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const FEATURE_FILE: &str = "feature.feature";
pub const LOCATORS_FILE: &str = "locators.ts";
pub const STEPS_FILE: &str = "steps.ts";

/// Keyword used for interior steps after the first one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepStyle {
    #[default]
    When,
    And,
}

#[derive(Debug, Clone)]
pub struct TranspileOptions {
    pub step_style: StepStyle,
    pub locators_import: String,
    pub world_import: String,
    pub helpers_import: String,
}

impl Default for TranspileOptions {
    fn default() -> Self {
        Self {
            step_style: StepStyle::When,
            locators_import: "../locators/locators".to_string(),
            world_import: "../support/world".to_string(),
            helpers_import: "../utils/interactions".to_string(),
        }
    }
}

/// Everything produced from one recorded script.
#[derive(Debug, Clone, Serialize)]
pub struct Transpiled {
    pub site: String,
    pub actions: Vec<Action>,
    pub locators: Vec<LocatorEntry>,
    pub unsupported: Vec<UnsupportedLine>,
    pub feature_source: String,
    pub locators_source: String,
    pub steps_source: String,
}

impl Transpiled {
    /// Write the three artifacts into `dir`, creating it if needed.
    pub fn write_artifacts(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let mut written = Vec::with_capacity(3);
        for (file, contents) in [
            (FEATURE_FILE, &self.feature_source),
            (LOCATORS_FILE, &self.locators_source),
            (STEPS_FILE, &self.steps_source),
        ] {
            let path = dir.join(file);
            std::fs::write(&path, contents)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            written.push(path);
        }
        info!(dir = %dir.display(), actions = self.actions.len(), "transpiled artifacts written");
        Ok(written)
    }
}

/// Parse, name and render. Pure: identical input gives identical output.
pub fn transpile(source: &str, opts: &TranspileOptions) -> Transpiled {
    let ParsedScript {
        mut actions,
        unsupported,
    } = grammar::parse_script(source);
    for line in &unsupported {
        warn!(line = line.line_no, reason = %line.reason, "unsupported statement skipped");
    }

    let locators = grammar::assign_locator_names(&mut actions);
    let site = emit::site_name(&actions);

    Transpiled {
        feature_source: emit::render_feature(&actions, &site, opts.step_style),
        locators_source: emit::render_locators(&locators, &site),
        steps_source: emit::render_steps(&actions, &locators, &site, opts),
        site,
        actions,
        locators,
        unsupported,
    }
}

pub fn transpile_file(input: &Path, output_dir: &Path, opts: &TranspileOptions) -> Result<Transpiled> {
    let source = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let transpiled = transpile(&source, opts);
    transpiled.write_artifacts(output_dir)?;
    Ok(transpiled)
}
