//! kcm - main entry point
//!
//! Runs one synchronization pass over every configured certificate and exits.
//! Scheduling (cron, systemd timers) is left to the host.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use kcm::{run_all, HttpFetcher};
use kcm_config::{Config, DEFAULT_CONFIG_PATH};

/// kcm - keep local TLS certificate files in sync with a remote endpoint
#[derive(Parser, Debug)]
#[command(name = "kcm")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long = "config", env = "KCM_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Test configuration and exit
    #[arg(short = 't', long = "test")]
    test: bool,

    /// Per-request timeout in seconds
    #[arg(long = "timeout", default_value_t = 30)]
    timeout: u64,

    /// Number of certificates processed concurrently
    #[arg(short = 'j', long = "jobs", default_value_t = 1)]
    jobs: usize,

    /// Enable verbose logging (debug level)
    #[arg(long = "verbose")]
    verbose: bool,

    /// Log as JSON lines
    #[arg(long = "json")]
    json: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.json);

    if cli.test {
        return test_config(&cli.config);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    runtime.block_on(run(cli))
}

/// Initialize logging; `RUST_LOG` takes precedence over `--verbose`
fn init_logging(verbose: bool, json: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Test configuration file and exit
fn test_config(path: &Path) -> Result<ExitCode> {
    info!("Testing configuration file: {}", path.display());

    let config = Config::from_file(path).context("Failed to load configuration file")?;
    config.validate().context("Configuration validation failed")?;

    info!("  - {} certificate(s)", config.certificates.len());

    println!(
        "kcm: configuration file {} test is successful",
        path.display()
    );

    Ok(ExitCode::SUCCESS)
}

/// Run one synchronization pass
async fn run(cli: Cli) -> Result<ExitCode> {
    let config = match Config::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!(path = %cli.config.display(), error = %e, "Failed to load config");
            return Ok(ExitCode::FAILURE);
        }
    };

    let fetcher = HttpFetcher::new(Duration::from_secs(cli.timeout))
        .context("Failed to create HTTP client")?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown_signal(cancel.clone()));

    let summary = run_all(&config.certificates, &fetcher, cli.jobs, &cancel).await;

    Ok(if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Cancel in-flight requests on SIGINT or SIGTERM
async fn cancel_on_shutdown_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(terminate) => terminate,
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                cancel.cancel();
                return;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    let _ = tokio::signal::ctrl_c().await;

    warn!("Received shutdown signal, cancelling remaining requests");
    cancel.cancel();
}
