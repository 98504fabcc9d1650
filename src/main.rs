//! `ssc` - serial shutter control.
//!
//! ```bash
//! # 20 exposures of 5 minutes, dither amount 2 between frames, logged as "M31"
//! ssc -c 20 -p 10 -d 2 -l M31 300
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use ssc::cli::Cli;
use ssc::config::Settings;
use ssc::controller::{RunOutcome, SequenceController};
use ssc::exposure_log::ExposureLogger;
use ssc::hardware::{MockShutterLine, SerialShutterLine, ShutterLine};
use ssc::progress::stdout_progress;
use std::future::Future;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings =
        Settings::load(cli.config.as_deref(), &cli.overrides()).context("Failed to load settings")?;
    init_tracing(settings.quiet);

    // Validate everything before touching hardware or network.
    let config = settings.exposure_config()?;

    let line: Box<dyn ShutterLine> = if settings.dry_run {
        info!("Dry run, shutter line is simulated");
        let (line, _probe) = MockShutterLine::new();
        Box::new(line)
    } else {
        Box::new(SerialShutterLine::open(&settings.device)?)
    };

    // Registered before the guider connect, which runs inside the controller.
    let interrupt = interrupt_signal()?;

    let logger = ExposureLogger::new(config.label.clone(), &settings.log_dir);
    let progress = stdout_progress(config.quiet);

    let controller = SequenceController::new(config, line, logger, progress);
    match controller.run(interrupt).await? {
        RunOutcome::Completed(summary) => info!(
            exposures = summary.exposures.len(),
            dithers = summary.dithers,
            "Done"
        ),
        RunOutcome::Interrupted(summary) => warn!(
            exposures = summary.exposures.len(),
            partial = summary.partial.is_some(),
            "Stopped by interrupt"
        ),
    }

    Ok(())
}

fn init_tracing(quiet: bool) {
    let default_directive = if quiet { "ssc=warn" } else { "ssc=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Register for SIGINT now and return a future that resolves when it arrives.
#[cfg(unix)]
fn interrupt_signal() -> Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
    Ok(async move {
        sigint.recv().await;
    })
}

#[cfg(not(unix))]
fn interrupt_signal() -> Result<impl Future<Output = ()>> {
    Ok(async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    })
}
