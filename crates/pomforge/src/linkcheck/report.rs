//! Run log and failure log files written by the link checker.

use super::PageFailure;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const OUTPUT_FILE: &str = "output.txt";
pub const ERROR_LOG_FILE: &str = "error_log.txt";

/// Every line reported during a run, echoed to the log as it is added.
#[derive(Debug, Default)]
pub struct RunLog {
    lines: Vec<String>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, line: impl Into<String>) {
        let line = line.into();
        info!("{line}");
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Write the whole log to `<dir>/output.txt`, replacing any previous run.
    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join(OUTPUT_FILE);
        std::fs::write(&path, self.lines.join("\n"))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

/// Remove the failure log left by a previous run.
pub fn reset_error_log(dir: &Path) -> Result<()> {
    let path = dir.join(ERROR_LOG_FILE);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}

/// Append one failure block to `<dir>/error_log.txt`.
pub fn append_error(dir: &Path, failure: &PageFailure, detail: &str) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(ERROR_LOG_FILE);
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    write!(
        file,
        "=== Error on page: {} ===\nTime: {}\nMessage: {}\nStack:\n{}\n",
        failure.url,
        failure.at.to_rfc3339(),
        failure.message,
        detail
    )
    .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// `{h}h {m}m {s}s`, truncated to whole seconds.
pub fn format_duration(d: Duration) -> String {
    let total = d.as_secs();
    format!("{}h {}m {}s", total / 3600, (total % 3600) / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(999)), "0h 0m 0s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }

    #[test]
    fn test_output_and_error_log() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = RunLog::new();
        log.line("first");
        log.line("second");
        let path = log.write(dir.path()).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "first\nsecond");

        let failure = PageFailure {
            url: "https://a.test/x".into(),
            message: "HTTP 500".into(),
            at: chrono::Utc::now(),
        };
        append_error(dir.path(), &failure, "HTTP 500").unwrap();
        append_error(dir.path(), &failure, "HTTP 500").unwrap();
        let logged = std::fs::read_to_string(dir.path().join(ERROR_LOG_FILE)).unwrap();
        assert_eq!(logged.matches("=== Error on page: https://a.test/x ===").count(), 2);

        reset_error_log(dir.path()).unwrap();
        assert!(!dir.path().join(ERROR_LOG_FILE).exists());
        reset_error_log(dir.path()).unwrap();
    }
}
