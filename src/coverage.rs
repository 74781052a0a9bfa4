//! Reads the line-coverage figure SimpleCov recorded on its last run.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const LAST_RUN_FILE: &str = "coverage/.last_run.json";

#[derive(Debug, Deserialize)]
struct LastRun {
    result: LastRunResult,
}

#[derive(Debug, Deserialize)]
struct LastRunResult {
    line: Option<f64>,
    /// Older SimpleCov releases
    covered_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoverageSummary {
    pub source: PathBuf,
    pub line_percent: f64,
    pub threshold: f64,
}

impl CoverageSummary {
    pub fn meets_threshold(&self) -> bool {
        self.line_percent >= self.threshold
    }
}

/// Loads the last recorded coverage for the project.
///
/// Returns `Ok(None)` when the project has no coverage artifact yet.
pub fn load_summary(project_root: &Path, threshold: f64) -> Result<Option<CoverageSummary>> {
    let source = project_root.join(LAST_RUN_FILE);
    if !source.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&source)
        .with_context(|| format!("Failed to read coverage file: {}", source.display()))?;
    let last_run: LastRun = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse coverage file: {}", source.display()))?;

    let line_percent = last_run
        .result
        .line
        .or(last_run.result.covered_percent)
        .with_context(|| format!("No line coverage recorded in {}", source.display()))?;

    Ok(Some(CoverageSummary {
        source,
        line_percent,
        threshold,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_last_run(root: &Path, json: &str) {
        let dir = root.join("coverage");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(".last_run.json"), json).unwrap();
    }

    #[test]
    fn reads_current_format() {
        let dir = tempfile::tempdir().unwrap();
        write_last_run(dir.path(), r#"{"result": {"line": 91.5, "branch": 70.0}}"#);

        let summary = load_summary(dir.path(), 80.0).unwrap().unwrap();
        assert_eq!(summary.line_percent, 91.5);
        assert!(summary.meets_threshold());
    }

    #[test]
    fn reads_legacy_format() {
        let dir = tempfile::tempdir().unwrap();
        write_last_run(dir.path(), r#"{"result": {"covered_percent": 64.25}}"#);

        let summary = load_summary(dir.path(), 80.0).unwrap().unwrap();
        assert_eq!(summary.line_percent, 64.25);
        assert!(!summary.meets_threshold());
    }

    #[test]
    fn missing_artifact_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_summary(dir.path(), 80.0).unwrap().is_none());
    }

    #[test]
    fn malformed_artifact_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_last_run(dir.path(), "not json");
        assert!(load_summary(dir.path(), 80.0).is_err());
    }
}
