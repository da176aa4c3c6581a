//! Looper registry: routes trigger keys to loopers
//!
//! A known key toggles its looper. Anything else, including the end of the
//! trigger stream, quits every looper.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::looper::{Looper, LooperError, Notifier};
use crate::trigger::Trigger;

/// Everything needed to build one looper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LooperSpec {
    /// Trigger key
    pub key: char,
    /// Label used in notifications, e.g. `LOOP_1`
    pub tag: String,
    /// Record file; must not be shared with another looper
    pub file: PathBuf,
    /// Capture device, passed to the recorder unmodified
    pub device: String,
    /// Show backend stderr
    pub debug: bool,
}

/// Errors raised by the registry
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("key {0:?} is bound to more than one looper")]
    DuplicateKey(char),

    #[error(transparent)]
    Looper(#[from] LooperError),
}

/// What a dispatched trigger did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The key's looper was toggled
    Toggled,
    /// The key was unknown; every looper was asked to quit
    QuitAll,
}

/// Loopers keyed by trigger character, kept in registration order
pub struct Registry {
    keys: Vec<char>,
    loopers: HashMap<char, Looper>,
}

impl Registry {
    /// Build one looper per spec, sharing `notifier`
    pub fn new(specs: &[LooperSpec], notifier: Arc<dyn Notifier>) -> Result<Self, RegistryError> {
        let mut loopers = Vec::with_capacity(specs.len());
        for spec in specs {
            let looper = Looper::new(
                &spec.file,
                &spec.tag,
                &spec.device,
                spec.debug,
                Arc::clone(&notifier),
            )?;
            loopers.push((spec.key, looper));
        }
        Self::from_loopers(loopers)
    }

    /// Register already-built loopers
    pub fn from_loopers(
        loopers: impl IntoIterator<Item = (char, Looper)>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self {
            keys: Vec::new(),
            loopers: HashMap::new(),
        };

        for (key, looper) in loopers {
            if registry.loopers.contains_key(&key) {
                return Err(RegistryError::DuplicateKey(key));
            }
            debug!(key = %key, tag = %looper.tag(), "looper registered");
            registry.keys.push(key);
            registry.loopers.insert(key, looper);
        }

        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Registered keys in registration order
    pub fn keys(&self) -> &[char] {
        &self.keys
    }

    pub fn get(&self, key: char) -> Option<&Looper> {
        self.loopers.get(&key)
    }

    /// Check if every looper has quit
    pub fn all_quit(&self) -> bool {
        self.loopers.values().all(Looper::is_quitting)
    }

    /// Toggle the looper bound to `key`, or quit everything if none is
    pub fn dispatch(&mut self, key: char) -> Result<Dispatch, RegistryError> {
        match self.loopers.get_mut(&key) {
            Some(looper) => {
                looper.on_toggle()?;
                Ok(Dispatch::Toggled)
            }
            None => {
                info!(key = %key, "unknown key, quitting all loopers");
                self.quit_all()?;
                Ok(Dispatch::QuitAll)
            }
        }
    }

    /// Quit every looper that has not quit yet, in registration order.
    ///
    /// Every looper is attempted; the first failure is returned.
    pub fn quit_all(&mut self) -> Result<(), RegistryError> {
        let mut first_err = None;

        for key in &self.keys {
            let Some(looper) = self.loopers.get_mut(key) else {
                continue;
            };
            if looper.is_quitting() {
                continue;
            }
            if let Err(e) = looper.on_quit() {
                warn!(tag = %e.tag, error = %e.source, "looper failed to quit");
                first_err.get_or_insert(e);
            }
        }

        match first_err {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Dispatch triggers until a quit-all request.
    ///
    /// A closed channel counts as the end of input and quits every looper.
    /// Unhandled events are logged and skipped; any other error, such as a
    /// backend that cannot be launched, stops the loop and is returned.
    pub async fn run(&mut self, mut trigger_rx: mpsc::Receiver<Trigger>) -> Result<(), RegistryError> {
        info!(loopers = self.len(), "registry started");

        loop {
            match trigger_rx.recv().await {
                Some(Trigger::Key(key)) => match self.dispatch(key) {
                    Ok(Dispatch::Toggled) => {}
                    Ok(Dispatch::QuitAll) => break,
                    Err(RegistryError::Looper(e)) if e.is_unhandled() => {
                        warn!(tag = %e.tag, op = e.op, error = %e.source, "trigger ignored");
                    }
                    Err(e) => return Err(e),
                },
                Some(Trigger::Closed) | None => {
                    info!("trigger input closed, quitting all loopers");
                    self.quit_all()?;
                    break;
                }
            }
        }

        info!("registry stopped");
        Ok(())
    }
}
