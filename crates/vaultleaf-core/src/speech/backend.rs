use super::Input;
use crate::error::Result;
use std::fmt;
use std::path::Path;
use std::sync::mpsc::Sender;
use tracing::debug;

/// Identifies one request made to a backend; completions echo it back.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UtteranceId(String);

impl UtteranceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueMode {
    /// Drop whatever is queued or playing, then speak.
    Flush,
    /// Speak after everything already queued.
    Add,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    Initialized(std::result::Result<(), String>),
    Done(UtteranceId),
    Failed(UtteranceId, String),
}

/// Where a backend reports asynchronous progress. Events are queued to the
/// engine thread; sending never blocks.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Sender<Input>,
}

impl EventSink {
    pub(crate) fn new(tx: Sender<Input>) -> Self {
        Self { tx }
    }

    pub fn send(&self, event: BackendEvent) {
        if self.tx.send(Input::Backend(event)).is_err() {
            debug!("Speech engine is gone; dropping backend event");
        }
    }

    pub fn initialized(&self, outcome: std::result::Result<(), String>) {
        self.send(BackendEvent::Initialized(outcome));
    }

    pub fn done(&self, id: &UtteranceId) {
        self.send(BackendEvent::Done(id.clone()));
    }

    pub fn failed(&self, id: &UtteranceId, message: impl Into<String>) {
        self.send(BackendEvent::Failed(id.clone(), message.into()));
    }
}

/// A platform speech synthesizer.
///
/// Every method is called from the engine thread. `speak` and
/// `synthesize_to_file` only submit work; the outcome is reported later
/// through the [`EventSink`] handed to `initialize`.
pub trait SpeechBackend: Send + 'static {
    fn initialize(&mut self, events: EventSink);

    /// Longest text accepted by a single request, in characters.
    fn max_input_len(&self) -> usize;

    fn speak(&mut self, text: &str, mode: QueueMode, id: &UtteranceId) -> Result<()>;

    fn synthesize_to_file(&mut self, text: &str, target: &Path, id: &UtteranceId) -> Result<()>;

    fn stop(&mut self);

    fn shutdown(&mut self);
}
