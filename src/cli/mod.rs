use anyhow::{Context, Result};
use std::fs;
use std::future::Future;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

mod progress;

use progress::{ItemStatus, ProgressIndicator};
use testgen::config::{Settings, CONFIG_FILE};
use testgen::contexts::{
    ChangeDispatcher, GenerationOutcome, SkipReason, StdinContextPrompt, TestGenerator,
};
use testgen::coverage;
use testgen::data::TestFramework;
use testgen::error::PipelineError;
use testgen::providers::build_client;
use testgen::runner::{CommandTestRunner, TestRunReport, TestRunner};
use testgen::watcher::run_watch_loop;

#[derive(Clone)]
pub struct Config {
    pub verbose: bool,
    pub dry_run: bool,
    pub project_root: PathBuf,
    pub config_file: Option<PathBuf>,
}

pub async fn init(force: bool, config: &Config) -> Result<()> {
    let path = config
        .config_file
        .clone()
        .unwrap_or_else(|| config.project_root.join(CONFIG_FILE));

    if path.exists() && !force {
        println!("⊚ {} already exists (use --force to overwrite)", path.display());
        return Ok(());
    }

    let content = Settings::default_yaml().context("Failed to render default configuration")?;

    if config.dry_run {
        println!("[DRY RUN] Would write {}", path.display());
        if config.verbose {
            print!("{}", content);
        }
        return Ok(());
    }

    fs::write(&path, content)
        .with_context(|| format!("Failed to write configuration: {}", path.display()))?;
    println!("✓ Wrote {}", path.display());
    Ok(())
}

pub async fn generate(files: Vec<PathBuf>, note: Option<String>, config: &Config) -> Result<()> {
    if files.is_empty() {
        println!("No files given to generate tests for");
        return Ok(());
    }

    let settings = load_settings(config)?;
    let cfg = config.clone();

    tokio::task::spawn_blocking(move || generate_files(&settings, &files, note, &cfg))
        .await
        .context("Generation task panicked")?
}

fn generate_files(
    settings: &Settings,
    files: &[PathBuf],
    note: Option<String>,
    config: &Config,
) -> Result<()> {
    let client = build_client(settings).context("Failed to configure the generation client")?;
    let mut generator = TestGenerator::new(settings, client).with_dry_run(config.dry_run);
    if settings.interactive_mode {
        generator = generator.with_context_prompt(Box::new(StdinContextPrompt));
    }
    let runner = test_runner_for(settings, config);

    println!(
        "Generating {} tests for {} file(s)",
        settings.test_framework.display_name(),
        files.len()
    );
    let mut progress = ProgressIndicator::new(files.len());

    for file in files {
        let path = project_relative(&settings.project_root, file);
        let name = path.display().to_string();
        progress.start_item(&name);

        let status = match generator.generate(&path, note.as_deref()) {
            Ok(GenerationOutcome::Written { test_path, .. }) => {
                println!("✓ Generated {} for {}", test_path.display(), name);
                if let Some(runner) = &runner {
                    match runner.run(&[test_path.clone()]) {
                        Ok(report) => report_run(&report, config),
                        Err(e) => eprintln!("✗ Failed to run {}: {}", test_path.display(), e),
                    }
                }
                ItemStatus::Generated
            }
            Ok(GenerationOutcome::Planned { kind, test_path }) => {
                println!(
                    "[DRY RUN] Would generate {} test {} for {}",
                    kind,
                    test_path.display(),
                    name
                );
                ItemStatus::Skipped
            }
            Ok(GenerationOutcome::Skipped(reason)) => {
                match reason {
                    SkipReason::EmptyResponse => eprintln!("⚠ Nothing generated for {}", name),
                    _ => println!("⊚ Skipping {} ({})", name, reason),
                }
                ItemStatus::Skipped
            }
            Err(PipelineError::FileNotFound(missing)) => {
                eprintln!("✗ File not found: {}", missing.display());
                ItemStatus::Failed
            }
            Err(e) => {
                eprintln!("✗ Failed to generate test for {}: {}", name, e);
                ItemStatus::Failed
            }
        };
        progress.complete_item(status);
    }

    progress.finish();

    if progress.failed() > 0 {
        anyhow::bail!("{} file(s) failed", progress.failed());
    }
    Ok(())
}

pub async fn watch(note: Option<String>, config: &Config) -> Result<()> {
    let settings = load_settings(config)?;
    let stop = Arc::new(AtomicBool::new(false));

    println!(
        "Watching {} for changes ({} tests). Press Ctrl-C to stop.",
        settings.watch_paths.join(", "),
        settings.test_framework.display_name()
    );
    if config.dry_run {
        println!("[DRY RUN] Tests will not be generated or written");
    }

    let cfg = config.clone();
    let loop_stop = stop.clone();
    let mut task = tokio::task::spawn_blocking(move || -> Result<()> {
        let dispatcher = build_dispatcher(&settings, note, &cfg)?;
        run_watch_loop(
            &settings.project_root,
            &settings.watch_paths,
            Duration::from_millis(settings.debounce_ms),
            &dispatcher,
            &loop_stop,
        )
    });

    tokio::select! {
        result = &mut task => return result.context("Watch task panicked")?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            println!("\nStopping watcher...");
            stop.store(true, Ordering::SeqCst);
        }
    }

    task.await.context("Watch task panicked")?
}

pub async fn test(
    files: Vec<PathBuf>,
    continuous: bool,
    interval_secs: u64,
    config: &Config,
) -> Result<()> {
    let settings = load_settings(config)?;
    let files: Vec<PathBuf> = files
        .iter()
        .map(|f| project_relative(&settings.project_root, f))
        .collect();

    if config.dry_run {
        let runner = CommandTestRunner::new(settings.test_framework, settings.project_root.clone());
        let (program, args) = runner.command_line(&files);
        println!("[DRY RUN] Would run: {} {}", program, args.join(" "));
        return Ok(());
    }

    if !continuous {
        let report = run_suite(settings.test_framework, &settings.project_root, &files).await?;
        report_run(&report, config);
        if report.success() {
            return Ok(());
        }
        anyhow::bail!("Tests failed");
    }

    println!(
        "Running tests every {}s. Press Ctrl-C to stop.",
        interval_secs
    );
    let interval = Duration::from_secs(interval_secs.max(1));

    let framework = settings.test_framework;
    let root = &settings.project_root;
    let files = &files;
    let completed = run_until_stopped(interval, tokio::signal::ctrl_c(), move || async move {
        let report = run_suite(framework, root, files).await?;
        report_run(&report, config);
        Ok(())
    })
    .await?;

    if config.verbose {
        println!("Completed {} run(s)", completed);
    }
    println!("\nStopped continuous testing.");
    Ok(())
}

/// Repeats `run` with `interval` pauses until `stop` resolves. The same
/// `stop` future is watched during runs and pauses, so a signal is never
/// missed. Returns the number of runs that finished.
async fn run_until_stopped<F, Fut>(
    interval: Duration,
    stop: impl Future<Output = io::Result<()>>,
    mut run: F,
) -> Result<usize>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    tokio::pin!(stop);
    let mut completed = 0;

    loop {
        tokio::select! {
            result = run() => {
                result?;
                completed += 1;
            }
            signal = &mut stop => {
                signal.context("Failed to listen for Ctrl-C")?;
                break;
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            signal = &mut stop => {
                signal.context("Failed to listen for Ctrl-C")?;
                break;
            }
        }
    }

    Ok(completed)
}

pub async fn coverage(config: &Config) -> Result<()> {
    let settings = load_settings(config)?;
    let Some(summary) = coverage::load_summary(&settings.project_root, settings.coverage_threshold)?
    else {
        println!("⊚ No coverage data found (run the suite with SimpleCov enabled)");
        return Ok(());
    };

    if config.verbose {
        println!("Read {}", summary.source.display());
    }

    if summary.meets_threshold() {
        println!(
            "✓ Line coverage {:.2}% meets the {:.2}% threshold",
            summary.line_percent, summary.threshold
        );
        Ok(())
    } else {
        println!(
            "✗ Line coverage {:.2}% is below the {:.2}% threshold",
            summary.line_percent, summary.threshold
        );
        anyhow::bail!("Coverage below threshold");
    }
}

fn load_settings(config: &Config) -> Result<Settings> {
    let settings = Settings::load(&config.project_root, config.config_file.as_deref())
        .context("Failed to load configuration")?;
    if config.verbose {
        println!(
            "Using {} with {} ({})",
            settings.test_framework.display_name(),
            settings.ai_provider,
            settings.ai_model
        );
    }
    Ok(settings)
}

fn build_dispatcher(
    settings: &Settings,
    note: Option<String>,
    config: &Config,
) -> Result<ChangeDispatcher> {
    let client = build_client(settings).context("Failed to configure the generation client")?;
    let generator = TestGenerator::new(settings, client).with_dry_run(config.dry_run);

    let mut dispatcher = ChangeDispatcher::new(settings, generator).with_note(note);
    if let Some(runner) = test_runner_for(settings, config) {
        dispatcher = dispatcher.with_test_runner(Box::new(runner));
    }
    if settings.interactive_mode {
        dispatcher = dispatcher.with_context_prompt(Box::new(StdinContextPrompt));
    }
    Ok(dispatcher)
}

fn test_runner_for(settings: &Settings, config: &Config) -> Option<CommandTestRunner> {
    (settings.auto_run_tests && !config.dry_run)
        .then(|| CommandTestRunner::new(settings.test_framework, settings.project_root.clone()))
}

async fn run_suite(
    framework: TestFramework,
    project_root: &Path,
    files: &[PathBuf],
) -> Result<TestRunReport> {
    let root = project_root.to_path_buf();
    let files = files.to_vec();
    let report = tokio::task::spawn_blocking(move || CommandTestRunner::new(framework, root).run(&files))
        .await
        .context("Test task panicked")?
        .context("Failed to execute the test runner")?;
    Ok(report)
}

fn report_run(report: &TestRunReport, config: &Config) {
    if config.verbose || !report.success() {
        print!("{}", report.stdout);
        eprint!("{}", report.stderr);
        io::stdout().flush().ok();
    }

    let started = report.started_at.format("%H:%M:%S");
    if report.success() {
        println!("✓ [{}] Tests passed: {}", started, report.describe());
    } else {
        eprintln!("✗ [{}] Tests failed: {}", started, report.describe());
    }
}

/// Paths given on the command line may be absolute; the pipeline wants them
/// relative to the project root.
fn project_relative(project_root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(project_root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}
