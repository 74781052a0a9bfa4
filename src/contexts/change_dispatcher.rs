use crate::config::Settings;
use crate::contexts::{ContextPrompt, GenerationOutcome, SkipReason, TestGenerator};
use crate::data::{is_test_file, ChangeSet, FileKind};
use crate::runner::TestRunner;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

const SOURCE_EXTENSION: &str = "rb";

/// What happened to one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Paths that passed the filter
    pub considered: usize,
    pub generated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Turns batches of changed paths into generated tests.
///
/// Files are processed one after another; a failure is reported for that
/// file and the batch carries on.
pub struct ChangeDispatcher {
    generator: TestGenerator,
    project_root: PathBuf,
    absolute_root: Option<PathBuf>,
    watch_paths: Vec<PathBuf>,
    exclude_paths: Vec<PathBuf>,
    auto_run_tests: bool,
    runner: Option<Box<dyn TestRunner>>,
    note: Option<String>,
}

impl ChangeDispatcher {
    pub fn new(settings: &Settings, generator: TestGenerator) -> Self {
        let project_root = generator.project_root().to_path_buf();
        Self {
            absolute_root: project_root.canonicalize().ok(),
            project_root,
            generator,
            watch_paths: settings.watch_paths.iter().map(PathBuf::from).collect(),
            exclude_paths: settings.exclude_paths.iter().map(PathBuf::from).collect(),
            auto_run_tests: settings.auto_run_tests,
            runner: None,
            note: None,
        }
    }

    /// Runner used for freshly written tests when auto-run is enabled
    pub fn with_test_runner(mut self, runner: Box<dyn TestRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Asks for a per-file note; only files about to reach the model are asked
    pub fn with_context_prompt(mut self, prompt: Box<dyn ContextPrompt>) -> Self {
        self.generator = self.generator.with_context_prompt(prompt);
        self
    }

    /// Note attached to every file of every batch
    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note.filter(|n| !n.trim().is_empty());
        self
    }

    /// Project-relative paths from the batch that are worth generating for.
    pub fn relevant_paths(&self, changes: &ChangeSet) -> Vec<PathBuf> {
        changes
            .candidates()
            .into_iter()
            .filter_map(|path| self.relative_path(&path))
            .filter(|path| self.is_relevant(path))
            .collect()
    }

    pub fn dispatch(&self, changes: &ChangeSet) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        let paths = self.relevant_paths(changes);
        debug!(
            candidates = changes.candidates().len(),
            relevant = paths.len(),
            "filtered change batch"
        );

        for path in paths {
            summary.considered += 1;

            if FileKind::classify(&path) == FileKind::Unknown {
                summary.skipped += 1;
                continue;
            }

            match self.generator.generate(&path, self.note.as_deref()) {
                Ok(GenerationOutcome::Written { test_path, .. }) => {
                    summary.generated += 1;
                    println!("✓ Generated {} for {}", test_path.display(), path.display());
                    if self.auto_run_tests {
                        self.run_tests(&test_path);
                    }
                }
                Ok(GenerationOutcome::Planned { kind, test_path }) => {
                    summary.skipped += 1;
                    println!(
                        "[DRY RUN] Would generate {} test {} for {}",
                        kind,
                        test_path.display(),
                        path.display()
                    );
                }
                Ok(GenerationOutcome::Skipped(SkipReason::EmptyResponse)) => {
                    summary.skipped += 1;
                    warn!("nothing generated for {}", path.display());
                    eprintln!("⚠ Nothing generated for {}", path.display());
                }
                Ok(GenerationOutcome::Skipped(reason)) => {
                    summary.skipped += 1;
                    debug!("skipped {}: {}", path.display(), reason);
                }
                Err(e) => {
                    summary.failed += 1;
                    error!("generation failed for {}: {}", path.display(), e);
                    eprintln!("✗ Failed to generate test for {}: {}", path.display(), e);
                }
            }
        }

        summary
    }

    fn relative_path(&self, path: &Path) -> Option<PathBuf> {
        if !path.is_absolute() {
            return Some(path.strip_prefix(&self.project_root).unwrap_or(path).to_path_buf());
        }
        if let Ok(rel) = path.strip_prefix(&self.project_root) {
            return Some(rel.to_path_buf());
        }
        let root = self.absolute_root.as_ref()?;
        path.strip_prefix(root).ok().map(Path::to_path_buf)
    }

    fn is_relevant(&self, path: &Path) -> bool {
        if path.extension().and_then(|s| s.to_str()) != Some(SOURCE_EXTENSION) {
            return false;
        }
        if is_test_file(path) {
            return false;
        }
        if self.exclude_paths.iter().any(|ex| path.starts_with(ex)) {
            return false;
        }
        self.watch_paths.iter().any(|dir| path.starts_with(dir))
    }

    fn run_tests(&self, test_path: &Path) {
        let Some(runner) = &self.runner else {
            return;
        };

        info!("running {}", test_path.display());
        match runner.run(&[test_path.to_path_buf()]) {
            Ok(report) if report.success() => {
                println!("✓ Tests passed: {}", report.describe());
            }
            Ok(report) => {
                eprintln!("✗ Tests failed: {}", report.describe());
            }
            Err(e) => {
                eprintln!("✗ Failed to run {}: {}", test_path.display(), e);
            }
        }
    }
}
