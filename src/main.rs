use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "testgen")]
#[command(about = "Generates RSpec and Minitest tests for Rails code as it changes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, help = "Enable verbose debug output")]
    verbose: bool,

    #[arg(long, global = true, help = "Perform a dry run without calling the model or writing files")]
    dry_run: bool,

    #[arg(long, global = true, help = "Path to the configuration file (default: .testgen.yml)")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Write a default .testgen.yml")]
    Init {
        #[arg(long, help = "Overwrite an existing configuration file")]
        force: bool,
    },

    #[command(about = "Generate tests for the given source files")]
    Generate {
        #[arg(required = true, help = "Source files relative to the project root")]
        files: Vec<PathBuf>,

        #[arg(long, help = "Business context passed to the model")]
        context: Option<String>,
    },

    #[command(about = "Watch the project and generate tests for changed files")]
    Watch {
        #[arg(long, help = "Business context passed to the model for every file")]
        context: Option<String>,
    },

    #[command(about = "Run the test suite")]
    Test {
        #[arg(help = "Optional list of test files; the whole suite when empty")]
        files: Vec<PathBuf>,

        #[arg(long, help = "Keep re-running the suite until interrupted")]
        continuous: bool,

        #[arg(long, default_value_t = 30, help = "Seconds between continuous runs")]
        interval: u64,
    },

    #[command(about = "Report the last recorded line coverage")]
    Coverage,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    testgen::logging::init_logging(cli.verbose)?;

    let config = cli::Config {
        verbose: cli.verbose,
        dry_run: cli.dry_run,
        project_root: std::env::current_dir().context("Failed to resolve the working directory")?,
        config_file: cli.config,
    };

    match cli.command {
        Commands::Init { force } => {
            cli::init(force, &config).await?;
        }
        Commands::Generate { files, context } => {
            cli::generate(files, context, &config).await?;
        }
        Commands::Watch { context } => {
            cli::watch(context, &config).await?;
        }
        Commands::Test {
            files,
            continuous,
            interval,
        } => {
            cli::test(files, continuous, interval, &config).await?;
        }
        Commands::Coverage => {
            cli::coverage(&config).await?;
        }
    }

    Ok(())
}
