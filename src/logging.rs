use anyhow::Result;
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Installs the global stderr subscriber.
///
/// `RUST_LOG` wins when set; otherwise `--verbose` selects debug output for
/// this crate and the default is info.
pub fn init_logging(verbose: bool) -> Result<()> {
    let default_directive = if verbose { "testgen=debug" } else { "testgen=info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    debug!("logging initialized");
    Ok(())
}
