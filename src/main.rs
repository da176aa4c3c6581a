//! milo: micro looper application
//!
//! One looper per key. Type a key and Enter to record, again to stop, again
//! to play the take in loop, again to stop playback. Any other key, end of
//! input, SIGINT or SIGTERM stops every looper and exits.
//!
//! State changes are reported on stdout; logs go to stderr.

use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use miclooper::config::Config;
use miclooper::lifecycle::ShutdownSignal;
use miclooper::looper::{Notifier, ReportNotifier};
use miclooper::registry::{Registry, RegistryError};
use miclooper::trigger::TriggerListener;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; stdout is reserved for the state report
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "milo starting"
    );

    let record_dir = config.record_dir(Local::now());
    Config::ensure_dir(&record_dir)?;
    info!(?record_dir, device = %config.device, keys = %config.keys, "configuration loaded");

    // Create shutdown signal handler
    let mut shutdown = ShutdownSignal::new()?;

    // Loopers -> report on stdout
    let notifier: Arc<dyn Notifier> = Arc::new(ReportNotifier::stdout(config.format));

    let mut registry = Registry::new(&config.looper_specs(&record_dir), notifier)?;

    // Trigger listener -> registry
    let (trigger_tx, trigger_rx) = mpsc::channel(32);
    let listener = TriggerListener::new(trigger_tx);
    listener.start()?;

    info!("loopers ready, entering main loop");

    let outcome = tokio::select! {
        result = registry.run(trigger_rx) => result,

        _ = shutdown.wait() => {
            info!("shutdown signal received");
            Ok(())
        }
    };

    if let Err(RegistryError::Looper(e)) = &outcome {
        if let Some(spawn) = e.spawn_error() {
            error!(tag = %e.tag, op = e.op, error = %spawn, "audio backend unavailable");
        }
    }

    // Cleanup: both tasks of every looper must be stopped before exiting
    info!("shutting down...");

    listener.stop();
    if let Err(e) = registry.quit_all() {
        warn!(%e, "failed to quit every looper");
    }

    info!("milo stopped");

    outcome.map_err(anyhow::Error::from)
}
