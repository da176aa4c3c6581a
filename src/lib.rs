//! miclooper: micro looper driving command-line audio backends
//!
//! Each looper records a take with `arecord` on the first trigger, then
//! loops it with `mplayer` on later triggers:
//! - Generic state machine engine ([`fsm`])
//! - Background process tasks with SIGTERM shutdown ([`task`])
//! - Five-state looper wiring and notification sinks ([`looper`])
//! - Key registry driving loopers from a trigger stream ([`registry`])

pub mod config;
pub mod events;
pub mod fsm;
pub mod lifecycle;
pub mod looper;
pub mod registry;
pub mod task;
pub mod trigger;
