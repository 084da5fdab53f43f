use anyhow::{bail, Context, Result};
use clap::Parser;
use claimkit::cli::Cli;
use claimkit::core::config::Config;
use claimkit::core::state::Session;
use claimkit::core::tracing_init::init_tracing;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::signal;
use tracing::{debug, info, warn};

const DEFAULT_CONFIG: &str = "claimkit.toml";

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!(">>> {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref())?;
    config.apply_env_overrides();
    config.validate().context("Invalid configuration after environment overrides")?;

    init_tracing(&config.logging);

    // Build Tokio runtime with configured number of threads
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.runtime.num_threads)
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?;

    runtime.block_on(async_main(cli, config))
}

/// An explicit path must exist; otherwise `./claimkit.toml` is read when
/// present and the defaults are used when it is not
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load configuration from '{}'", path.display())),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG);
            if default.exists() {
                Config::from_file(&default)
            } else {
                Ok(Config::default())
            }
        }
    }
}

async fn async_main(cli: Cli, config: Config) -> Result<()> {
    info!(
        daemon = %config.daemon.url,
        comment_server = %config.comments.server,
        num_threads = config.runtime.num_threads,
        log_level = %config.logging.level,
        "claimkit starting"
    );

    let session = Session::new(config)?;

    tokio::select! {
        result = cli.execute(&session) => {
            debug!("Command finished");
            result
        }
        _ = shutdown_signal() => {
            warn!("Interrupted, requests already sent to the daemon keep running there");
            bail!("interrupted");
        }
    }
}

/// Wait for Ctrl+C. A handler that cannot be installed never fires.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C signal");
}
