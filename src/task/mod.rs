//! Background processes for the audio backends
//!
//! A [`BackgroundTask`] owns at most one running child process built from a
//! fixed [`CommandLine`]. Starting spawns it, stopping sends SIGTERM and
//! forgets it without waiting.

mod background;
mod command;

pub use background::{BackgroundTask, SpawnError};
pub use command::{CommandLine, ARECORD, MPLAYER};
