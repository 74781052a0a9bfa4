//! Invokes the project's Ruby test runner and scrapes its summary line.

use crate::data::TestFramework;
use crate::error::PipelineError;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tracing::debug;

/// Counts parsed from the runner's final summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestSummary {
    pub examples: u32,
    pub failures: u32,
    pub errors: u32,
    pub pending: u32,
}

#[derive(Debug, Clone)]
pub struct TestRunReport {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    pub started_at: DateTime<Utc>,
    pub summary: Option<TestSummary>,
}

impl TestRunReport {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// One-line description for console output
    pub fn describe(&self) -> String {
        let counts = match self.summary {
            Some(s) => format!(
                "{} examples, {} failures, {} errors, {} pending",
                s.examples, s.failures, s.errors, s.pending
            ),
            None => match self.exit_code {
                Some(code) => format!("exit code {}", code),
                None => "terminated by signal".to_string(),
            },
        };
        format!("{} in {:.2}s", counts, self.duration.as_secs_f64())
    }
}

/// Runs test files. An empty list means the whole suite.
pub trait TestRunner {
    fn run(&self, files: &[PathBuf]) -> Result<TestRunReport, PipelineError>;
}

/// Shells out to `bundle exec rspec` or `bundle exec rails test`
pub struct CommandTestRunner {
    framework: TestFramework,
    project_root: PathBuf,
}

impl CommandTestRunner {
    pub fn new(framework: TestFramework, project_root: impl Into<PathBuf>) -> Self {
        Self {
            framework,
            project_root: project_root.into(),
        }
    }

    /// Program and arguments for a run over `files`
    pub fn command_line(&self, files: &[PathBuf]) -> (String, Vec<String>) {
        let mut args: Vec<String> = match self.framework {
            TestFramework::Rspec => vec!["exec".into(), "rspec".into()],
            TestFramework::Minitest => vec!["exec".into(), "rails".into(), "test".into()],
        };
        args.extend(files.iter().map(|f| f.display().to_string()));
        ("bundle".to_string(), args)
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }
}

impl TestRunner for CommandTestRunner {
    fn run(&self, files: &[PathBuf]) -> Result<TestRunReport, PipelineError> {
        let (program, args) = self.command_line(files);
        debug!("running {} {}", program, args.join(" "));

        let started_at = Utc::now();
        let start = Instant::now();
        let output = Command::new(&program)
            .args(&args)
            .current_dir(&self.project_root)
            .output()
            .map_err(|e| PipelineError::io(&self.project_root, e))?;
        let duration = start.elapsed();

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let summary = parse_summary(self.framework, &stdout);

        Ok(TestRunReport {
            exit_code: output.status.code(),
            stdout,
            stderr,
            duration,
            started_at,
            summary,
        })
    }
}

fn rspec_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d+) examples?, (\d+) failures?(?:, (\d+) pending)?")
            .expect("valid rspec summary regex")
    })
}

fn minitest_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d+) (?:runs|tests), \d+ assertions, (\d+) failures, (\d+) errors, (\d+) skips")
            .expect("valid minitest summary regex")
    })
}

/// Parses the last summary line the runner printed
pub fn parse_summary(framework: TestFramework, output: &str) -> Option<TestSummary> {
    let number = |caps: &regex::Captures, i: usize| -> u32 {
        caps.get(i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };

    match framework {
        TestFramework::Rspec => rspec_regex().captures_iter(output).last().map(|caps| TestSummary {
            examples: number(&caps, 1),
            failures: number(&caps, 2),
            errors: 0,
            pending: number(&caps, 3),
        }),
        TestFramework::Minitest => {
            minitest_regex().captures_iter(output).last().map(|caps| TestSummary {
                examples: number(&caps, 1),
                failures: number(&caps, 2),
                errors: number(&caps, 3),
                pending: number(&caps, 4),
            })
        }
    }
}
