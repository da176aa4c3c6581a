//! Trigger listener reading keys from standard input
//!
//! Runs on a dedicated thread because stdin reads block. Every
//! non-whitespace character is forwarded as a [`Trigger::Key`]; end of input
//! is forwarded as [`Trigger::Closed`].

use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Events sent from the trigger listener to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// A key was pressed
    Key(char),
    /// The input stream ended
    Closed,
}

/// Keys carried by one line of input
pub fn keys_in(line: &str) -> impl Iterator<Item = char> + '_ {
    line.chars().filter(|c| !c.is_whitespace())
}

/// Listener that turns a line-oriented input stream into triggers
pub struct TriggerListener {
    trigger_tx: mpsc::Sender<Trigger>,
    running: Arc<AtomicBool>,
}

impl TriggerListener {
    /// Create a new trigger listener
    pub fn new(trigger_tx: mpsc::Sender<Trigger>) -> Self {
        Self {
            trigger_tx,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start reading standard input on a dedicated thread
    pub fn start(&self) -> Result<(), TriggerError> {
        self.start_with(io::BufReader::new(io::stdin()))
    }

    /// Start reading `input` on a dedicated thread.
    ///
    /// The thread runs until the input ends, the receiving side goes away, or
    /// `stop()` is called and the next line arrives.
    pub fn start_with<R>(&self, input: R) -> Result<(), TriggerError>
    where
        R: BufRead + Send + 'static,
    {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(TriggerError::AlreadyRunning);
        }

        let trigger_tx = self.trigger_tx.clone();
        let running = Arc::clone(&self.running);

        thread::Builder::new()
            .name("trigger-listener".to_string())
            .spawn(move || {
                info!("trigger listener thread started");

                if let Err(e) = read_triggers(input, &trigger_tx, &running) {
                    error!(?e, "trigger listener error");
                }

                running.store(false, Ordering::SeqCst);
                info!("trigger listener thread stopped");
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                TriggerError::ThreadSpawn(e.to_string())
            })?;

        Ok(())
    }

    /// Stop forwarding triggers
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if the listener is currently running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Errors that can occur in the trigger listener
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error("trigger listener is already running")]
    AlreadyRunning,

    #[error("failed to spawn listener thread: {0}")]
    ThreadSpawn(String),

    #[error("failed to read trigger input: {0}")]
    Read(#[from] io::Error),

    #[error("failed to send trigger to channel")]
    ChannelSend,
}

fn read_triggers<R: BufRead>(
    input: R,
    trigger_tx: &mpsc::Sender<Trigger>,
    running: &AtomicBool,
) -> Result<(), TriggerError> {
    for line in input.lines() {
        if !running.load(Ordering::SeqCst) {
            return Ok(());
        }

        for key in keys_in(&line?) {
            debug!(%key, "trigger");
            // Not in an async context, so block on the send
            trigger_tx
                .blocking_send(Trigger::Key(key))
                .map_err(|_| TriggerError::ChannelSend)?;
        }
    }

    if trigger_tx.blocking_send(Trigger::Closed).is_err() {
        warn!("failed to send end of input - channel closed?");
    }

    Ok(())
}
