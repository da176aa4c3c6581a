//! One record/playback looper bound to a pair of background tasks
//!
//! | state         | toggle                       | quit                  |
//! |---------------|------------------------------|-----------------------|
//! | readyToRecord | start recorder -> recording  | stop all -> quitting  |
//! | recording     | stop recorder -> readyToPlay | stop all -> quitting  |
//! | readyToPlay   | start player -> playing      | stop all -> quitting  |
//! | playing       | stop player -> readyToPlay   | stop all -> quitting  |
//! | quitting      | -                            | -                     |

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::fsm::{Action, Event, FsmError, Rule, StateGraph, StateId, StateMachine};
use crate::task::{BackgroundTask, CommandLine, SpawnError};

use super::notifier::Notifier;

pub const READY_TO_RECORD: &str = "readyToRecord";
pub const RECORDING: &str = "recording";
pub const READY_TO_PLAY: &str = "readyToPlay";
pub const PLAYING: &str = "playing";
pub const QUITTING: &str = "quitting";

/// Fired once at construction to announce the initial state
const START: Event = Event::new("start");
const TOGGLE: Event = Event::new("toggle");
const QUIT: Event = Event::new("quit");

/// A looper transition failed; the looper stays in its previous state
#[derive(Debug, thiserror::Error)]
#[error("{tag}: {op} failed")]
pub struct LooperError {
    pub tag: String,
    /// `start`, `toggle` or `quit`
    pub op: &'static str,
    #[source]
    pub source: FsmError<SpawnError>,
}

impl LooperError {
    /// Check if the event had no rule in the current state
    pub fn is_unhandled(&self) -> bool {
        matches!(self.source, FsmError::UnhandledEvent { .. })
    }

    /// The backend launch failure behind this error, if that is what it was
    pub fn spawn_error(&self) -> Option<&SpawnError> {
        match &self.source {
            FsmError::Action(e) => Some(e),
            _ => None,
        }
    }
}

/// Everything the transition actions touch
struct Deck {
    tag: String,
    recorder: BackgroundTask,
    player: BackgroundTask,
    notifier: Arc<dyn Notifier>,
}

fn start_recorder(deck: &mut Deck) -> Result<(), SpawnError> {
    deck.recorder.start()
}

fn stop_recorder(deck: &mut Deck) -> Result<(), SpawnError> {
    deck.recorder.stop();
    Ok(())
}

fn start_player(deck: &mut Deck) -> Result<(), SpawnError> {
    deck.player.start()
}

fn stop_player(deck: &mut Deck) -> Result<(), SpawnError> {
    deck.player.stop();
    Ok(())
}

fn stop_all(deck: &mut Deck) -> Result<(), SpawnError> {
    deck.recorder.stop();
    deck.player.stop();
    Ok(())
}

fn notify(deck: &Deck, state: &str) {
    deck.notifier.notify(&deck.tag, state);
}

/// Records a take on the first toggle, then loops it on later toggles
pub struct Looper {
    machine: StateMachine<Deck, SpawnError>,
    deck: Deck,
    quitting: StateId,
}

impl Looper {
    /// Create a looper recording from `device` into `file` with arecord and
    /// playing it back with mplayer.
    ///
    /// With `debug` set the backends' stderr is shown.
    pub fn new(
        file: &Path,
        tag: &str,
        device: &str,
        debug: bool,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, LooperError> {
        Self::with_tasks(
            tag,
            BackgroundTask::new(CommandLine::recorder(device, file), debug),
            BackgroundTask::new(CommandLine::player(file), debug),
            notifier,
        )
    }

    /// Create a looper around arbitrary recorder and player tasks.
    ///
    /// Announces `readyToRecord` before returning; no task is started.
    pub fn with_tasks(
        tag: &str,
        recorder: BackgroundTask,
        player: BackgroundTask,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, LooperError> {
        let mut deck = Deck {
            tag: tag.to_string(),
            recorder,
            player,
            notifier,
        };

        let wrap = |source: FsmError<SpawnError>| LooperError {
            tag: tag.to_string(),
            op: "start",
            source,
        };

        let (graph, initial, quitting) = build_graph().map_err(wrap)?;
        let mut machine = StateMachine::new(graph, initial).map_err(wrap)?;
        machine.on_event(&START, &mut deck).map_err(wrap)?;

        Ok(Self {
            machine,
            deck,
            quitting,
        })
    }

    pub fn tag(&self) -> &str {
        &self.deck.tag
    }

    /// Name of the current state
    pub fn state(&self) -> &str {
        self.machine.current_name()
    }

    pub fn is_quitting(&self) -> bool {
        self.machine.current() == self.quitting
    }

    pub fn recorder(&self) -> &BackgroundTask {
        &self.deck.recorder
    }

    pub fn player(&self) -> &BackgroundTask {
        &self.deck.player
    }

    /// Advance record -> stop -> play -> stop -> play ...
    pub fn on_toggle(&mut self) -> Result<(), LooperError> {
        self.fire("toggle", &TOGGLE)
    }

    /// Stop both tasks and enter `quitting`
    pub fn on_quit(&mut self) -> Result<(), LooperError> {
        self.fire("quit", &QUIT)
    }

    fn fire(&mut self, op: &'static str, event: &Event) -> Result<(), LooperError> {
        debug!(tag = %self.deck.tag, op, state = %self.state(), "looper event");

        self.machine
            .on_event(event, &mut self.deck)
            .map(|_| ())
            .map_err(|source| LooperError {
                tag: self.deck.tag.clone(),
                op,
                source,
            })
    }
}

type Graph = StateGraph<Deck, SpawnError>;

/// Build the five looper states; returns the graph, the initial state and
/// the quitting state
fn build_graph() -> Result<(Graph, StateId, StateId), FsmError<SpawnError>> {
    let mut graph = Graph::new();
    let ready_to_record = graph.add_state(READY_TO_RECORD);
    let recording = graph.add_state(RECORDING);
    let ready_to_play = graph.add_state(READY_TO_PLAY);
    let playing = graph.add_state(PLAYING);
    let quitting = graph.add_state(QUITTING);

    graph.add_rule(
        ready_to_record,
        Rule::new(START, ready_to_record).with_notification(notify),
    )?;

    let toggles: [(StateId, Action<Deck, SpawnError>, StateId); 4] = [
        (ready_to_record, start_recorder, recording),
        (recording, stop_recorder, ready_to_play),
        (ready_to_play, start_player, playing),
        (playing, stop_player, ready_to_play),
    ];

    for (from, action, to) in toggles {
        graph.add_rule(
            from,
            Rule::new(TOGGLE, to)
                .with_action(action)
                .with_notification(notify),
        )?;
        graph.add_rule(
            from,
            Rule::new(QUIT, quitting)
                .with_action(stop_all)
                .with_notification(notify),
        )?;
    }

    Ok((graph, ready_to_record, quitting))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::looper::notifier::MemoryNotifier;

    fn sleeper() -> BackgroundTask {
        BackgroundTask::new(CommandLine::new("sleep", ["30"]), false)
    }

    fn looper() -> (Looper, Arc<MemoryNotifier>) {
        let notifier = Arc::new(MemoryNotifier::default());
        let looper =
            Looper::with_tasks("LOOP_1", sleeper(), sleeper(), notifier.clone()).unwrap();
        (looper, notifier)
    }

    #[test]
    fn test_construction_announces_ready_to_record() {
        let (looper, notifier) = looper();

        assert_eq!(
            notifier.seen(),
            vec![("LOOP_1".to_string(), READY_TO_RECORD.to_string())]
        );
        assert_eq!(looper.state(), READY_TO_RECORD);
        assert!(!looper.recorder().is_running());
        assert!(!looper.player().is_running());
    }

    #[test]
    fn test_toggle_cycle() {
        let (mut looper, notifier) = looper();

        looper.on_toggle().unwrap();
        assert_eq!(looper.state(), RECORDING);
        assert!(looper.recorder().is_running());
        assert!(!looper.player().is_running());

        looper.on_toggle().unwrap();
        assert_eq!(looper.state(), READY_TO_PLAY);
        assert!(!looper.recorder().is_running());

        looper.on_toggle().unwrap();
        assert_eq!(looper.state(), PLAYING);
        assert!(looper.player().is_running());

        looper.on_toggle().unwrap();
        assert_eq!(looper.state(), READY_TO_PLAY);
        assert!(!looper.player().is_running());

        assert_eq!(
            notifier.states(),
            vec![READY_TO_RECORD, RECORDING, READY_TO_PLAY, PLAYING, READY_TO_PLAY]
        );
    }

    #[test]
    fn test_playback_repeats_without_rerecording() {
        let (mut looper, _) = looper();
        for _ in 0..2 {
            looper.on_toggle().unwrap();
        }

        for _ in 0..3 {
            looper.on_toggle().unwrap();
            assert_eq!(looper.state(), PLAYING);
            looper.on_toggle().unwrap();
            assert_eq!(looper.state(), READY_TO_PLAY);
            assert!(!looper.recorder().is_running());
        }
    }

    #[test]
    fn test_quit_from_every_state() {
        for toggles in 0..4 {
            let (mut looper, notifier) = looper();
            for _ in 0..toggles {
                looper.on_toggle().unwrap();
            }

            looper.on_quit().unwrap();
            assert_eq!(looper.state(), QUITTING);
            assert!(looper.is_quitting());
            assert!(!looper.recorder().is_running());
            assert!(!looper.player().is_running());
            assert_eq!(notifier.states().last().map(String::as_str), Some(QUITTING));
        }
    }

    #[test]
    fn test_quitting_is_a_sink() {
        let (mut looper, notifier) = looper();
        looper.on_quit().unwrap();
        let before = notifier.seen().len();

        let err = looper.on_toggle().unwrap_err();
        assert!(err.is_unhandled());
        assert_eq!(err.tag, "LOOP_1");
        assert_eq!(err.op, "toggle");

        let err = looper.on_quit().unwrap_err();
        assert!(err.is_unhandled());
        assert_eq!(err.op, "quit");

        assert_eq!(looper.state(), QUITTING);
        assert_eq!(notifier.seen().len(), before);
    }

    #[test]
    fn test_spawn_failure_keeps_state() {
        let notifier = Arc::new(MemoryNotifier::default());
        let missing = BackgroundTask::new(CommandLine::new("/nonexistent/arecord", ["-q"]), false);
        let mut looper =
            Looper::with_tasks("LOOP_9", missing, sleeper(), notifier.clone()).unwrap();

        let err = looper.on_toggle().unwrap_err();
        assert!(!err.is_unhandled());
        assert!(err.spawn_error().is_some());
        assert_eq!(err.to_string(), "LOOP_9: toggle failed");
        assert_eq!(looper.state(), READY_TO_RECORD);
        assert_eq!(notifier.states(), vec![READY_TO_RECORD]);
    }

    #[test]
    fn test_new_uses_audio_backends() {
        let notifier = Arc::new(MemoryNotifier::default());
        let looper =
            Looper::new(Path::new("rec_1.raw"), "LOOP_1", "hw:0,0", false, notifier).unwrap();

        assert_eq!(
            looper.recorder().command(),
            &CommandLine::recorder("hw:0,0", Path::new("rec_1.raw"))
        );
        assert_eq!(
            looper.player().command(),
            &CommandLine::player(Path::new("rec_1.raw"))
        );
    }
}
