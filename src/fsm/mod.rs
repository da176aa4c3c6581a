//! Generic event-driven state machine engine
//!
//! States live in an arena ([`StateGraph`]) and rules point at their target
//! by [`StateId`], so cyclic graphs such as `readyToPlay <-> playing` need no
//! shared ownership. The engine knows nothing about audio: actions and
//! notifications are plain function pointers over a caller-supplied context.

mod machine;

pub use machine::{
    Action, Event, FsmError, Notification, Rule, State, StateGraph, StateId, StateMachine,
};
