//! Loopers: a recorder and a player driven by a five-state machine
//!
//! Each transition is reported to a shared [`Notifier`].

mod machine;
mod notifier;

pub use machine::{
    Looper, LooperError, PLAYING, QUITTING, READY_TO_PLAY, READY_TO_RECORD, RECORDING,
};
pub use notifier::{ChannelNotifier, Fanout, Notifier, ReportFormat, ReportNotifier};

#[cfg(test)]
pub(crate) use notifier::MemoryNotifier;
