//! Trigger input for the looper registry
//!
//! Reads key characters from a line-oriented stream and forwards them over
//! a tokio channel.

mod listener;

pub use listener::{keys_in, Trigger, TriggerError, TriggerListener};
