//! sheets2img command line.
//!
//! ```text
//! sheets2img [--debug] [CONFIG_PATH]
//! ```
//!
//! Exits 0 when the run completes, even if some tabs failed (they are
//! logged), 1 on a fatal error and 2 on bad arguments.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use sheets2img::config::DEFAULT_CONFIG_PATH;
use sheets2img::{Config, FirefoxBackend, HttpFetcher, Pipeline, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Arguments
// ============================================================================

/// Render every tab of a published spreadsheet to an image.
#[derive(Parser, Debug)]
#[command(name = "sheets2img", version, about)]
struct Args {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long)]
    debug: bool,

    /// JSON configuration file
    #[arg(default_value = DEFAULT_CONFIG_PATH)]
    config_path: PathBuf,
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(args.debug);

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling run");
            signal_cancel.cancel();
        }
    });

    match run(&args.config_path, &cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Run failed");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(debug: bool) {
    let default = if debug { "sheets2img=debug" } else { "sheets2img=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn run(config_path: &Path, cancel: &CancellationToken) -> Result<()> {
    let config = Config::load(config_path)?;
    let fetcher = HttpFetcher::new(config.gsheets2img.export_url.clone())?;
    let firefox = config.firefox_settings();

    info!(
        sheet_id = %config.gsheets2img.sheet_id,
        output_dir = %config.gsheets2img.output_dir.display(),
        concurrency = config.gsheets2img.concurrency,
        "Starting"
    );

    let report = Pipeline::new(config, fetcher)
        .run(|| FirefoxBackend::launch(&firefox), cancel)
        .await?;

    for failure in &report.failed {
        warn!(tab = %failure.id, error = %failure.error, "Tab not rendered");
    }
    info!(
        rendered = report.rendered.len(),
        failed = report.failed.len(),
        skipped = report.skipped.len(),
        "Done"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["sheets2img"]).expect("parse");
        assert!(!args.debug);
        assert_eq!(args.config_path, Path::new(DEFAULT_CONFIG_PATH));
    }

    #[test]
    fn test_args_debug_and_path() {
        let args = Args::try_parse_from(["sheets2img", "--debug", "conf/run.json"]).expect("parse");
        assert!(args.debug);
        assert_eq!(args.config_path, Path::new("conf/run.json"));
    }

    #[test]
    fn test_args_reject_unknown_and_extra() {
        assert!(Args::try_parse_from(["sheets2img", "--verbose"]).is_err());
        assert!(Args::try_parse_from(["sheets2img", "a.json", "b.json"]).is_err());
    }
}
