//! Notification sinks for looper state changes
//!
//! A [`Notifier`] is built once by the application and shared by every
//! looper. Text reports, broadcast channels for visual indicators and
//! fan-outs over several sinks are interchangeable.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tracing::warn;

use crate::events::LooperEvent;

/// Receives `(tag, new state name)` after every successful transition
pub trait Notifier: Send + Sync {
    fn notify(&self, tag: &str, state: &str);
}

/// Line format written by [`ReportNotifier`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    /// `<tag> <state>`
    #[default]
    Text,
    /// One JSON-encoded [`LooperEvent`] per line
    Json,
}

/// Writes one line per transition to a sink
pub struct ReportNotifier<W> {
    sink: Mutex<W>,
    format: ReportFormat,
}

impl ReportNotifier<io::Stdout> {
    /// Report to standard output
    pub fn stdout(format: ReportFormat) -> Self {
        Self::new(io::stdout(), format)
    }
}

impl<W: Write + Send> ReportNotifier<W> {
    pub fn new(sink: W, format: ReportFormat) -> Self {
        Self {
            sink: Mutex::new(sink),
            format,
        }
    }

    /// Take the sink back, e.g. to inspect what was written
    pub fn into_inner(self) -> W {
        self.sink.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_event(&self, event: &LooperEvent) -> io::Result<()> {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        match self.format {
            ReportFormat::Text => writeln!(sink, "{}", event)?,
            ReportFormat::Json => {
                serde_json::to_writer(&mut *sink, event)?;
                writeln!(sink)?;
            }
        }
        sink.flush()
    }
}

impl<W: Write + Send> Notifier for ReportNotifier<W> {
    fn notify(&self, tag: &str, state: &str) {
        let event = LooperEvent::state_changed(tag, state);
        if let Err(e) = self.write_event(&event) {
            warn!(?e, %event, "failed to write report");
        }
    }
}

/// Publishes [`LooperEvent`]s on a broadcast channel
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    event_tx: broadcast::Sender<LooperEvent>,
}

impl ChannelNotifier {
    pub fn new(event_tx: broadcast::Sender<LooperEvent>) -> Self {
        Self { event_tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LooperEvent> {
        self.event_tx.subscribe()
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, tag: &str, state: &str) {
        // No subscribers is not an error
        let _ = self.event_tx.send(LooperEvent::state_changed(tag, state));
    }
}

/// Forwards every notification to each inner notifier, in order
#[derive(Default, Clone)]
pub struct Fanout {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

impl Notifier for Fanout {
    fn notify(&self, tag: &str, state: &str) {
        for notifier in &self.notifiers {
            notifier.notify(tag, state);
        }
    }
}

/// Keeps every notification in memory
#[cfg(test)]
#[derive(Default)]
pub(crate) struct MemoryNotifier {
    seen: Mutex<Vec<(String, String)>>,
}

#[cfg(test)]
impl MemoryNotifier {
    pub(crate) fn seen(&self) -> Vec<(String, String)> {
        self.seen.lock().unwrap().clone()
    }

    pub(crate) fn states(&self) -> Vec<String> {
        self.seen().into_iter().map(|(_, state)| state).collect()
    }
}

#[cfg(test)]
impl Notifier for MemoryNotifier {
    fn notify(&self, tag: &str, state: &str) {
        self.seen
            .lock()
            .unwrap()
            .push((tag.to_string(), state.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_report() {
        let report = ReportNotifier::new(Vec::new(), ReportFormat::Text);
        report.notify("LOOP_1", "readyToRecord");
        report.notify("LOOP_1", "recording");

        let out = String::from_utf8(report.into_inner()).unwrap();
        assert_eq!(out, "LOOP_1 readyToRecord\nLOOP_1 recording\n");
    }

    #[test]
    fn test_json_report() {
        let report = ReportNotifier::new(Vec::new(), ReportFormat::Json);
        report.notify("LOOP_2", "playing");

        let out = String::from_utf8(report.into_inner()).unwrap();
        let event: LooperEvent = serde_json::from_str(out.trim_end()).unwrap();
        assert_eq!(event, LooperEvent::state_changed("LOOP_2", "playing"));
    }

    #[test]
    fn test_channel_notifier() {
        let (tx, _) = broadcast::channel(8);
        let notifier = ChannelNotifier::new(tx);
        let mut rx = notifier.subscribe();

        notifier.notify("LOOP_3", "quitting");
        assert_eq!(
            rx.try_recv().unwrap(),
            LooperEvent::state_changed("LOOP_3", "quitting")
        );
    }

    #[test]
    fn test_channel_notifier_without_subscribers() {
        let (tx, rx) = broadcast::channel(8);
        drop(rx);
        ChannelNotifier::new(tx).notify("LOOP_1", "recording");
    }

    #[test]
    fn test_fanout_forwards_in_order() {
        let first = Arc::new(MemoryNotifier::default());
        let second = Arc::new(MemoryNotifier::default());
        let fanout = Fanout::new().with(first.clone()).with(second.clone());
        assert_eq!(fanout.len(), 2);

        fanout.notify("LOOP_1", "playing");
        assert_eq!(first.states(), vec!["playing"]);
        assert_eq!(second.seen(), first.seen());
    }
}
