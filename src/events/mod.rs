//! Events published when a looper changes state
//!
//! These are what report sinks and visual indicators consume; the engine's
//! own trigger events live in [`crate::fsm::Event`].

use serde::{Deserialize, Serialize};

/// A looper notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LooperEvent {
    /// A looper entered a new state
    StateChanged {
        /// Looper tag, e.g. `LOOP_1`
        tag: String,
        /// Name of the state just entered
        state: String,
    },
}

impl LooperEvent {
    pub fn state_changed(tag: &str, state: &str) -> Self {
        LooperEvent::StateChanged {
            tag: tag.to_string(),
            state: state.to_string(),
        }
    }
}

impl std::fmt::Display for LooperEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LooperEvent::StateChanged { tag, state } => write!(f, "{} {}", tag, state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_display() {
        let event = LooperEvent::state_changed("LOOP_1", "recording");
        assert_eq!(event.to_string(), "LOOP_1 recording");
    }

    #[test]
    fn test_event_serialization() {
        let event = LooperEvent::state_changed("LOOP_2", "playing");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("state_changed"));
        assert!(json.contains("LOOP_2"));
        assert!(json.contains("playing"));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"state_changed","tag":"LOOP_3","state":"quitting"}"#;
        let event: LooperEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, LooperEvent::state_changed("LOOP_3", "quitting"));
    }
}
