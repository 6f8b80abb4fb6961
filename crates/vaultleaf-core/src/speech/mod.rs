//! Text-to-speech: speaking text aloud and rendering it to audio files.
//!
//! [`SpeechEngine`] owns one backend on a dedicated thread. Commands from the
//! handle and completion events from the backend arrive on the same channel,
//! so the backend is only ever touched from that thread and every event is
//! handled in arrival order.

mod backend;
mod chunking;
mod command_backend;
mod job;

use crate::config::VaultConfig;
use crate::error::{Result, VaultError};
use crate::task::{self, Completer, Pending};
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub use self::backend::{BackendEvent, EventSink, QueueMode, SpeechBackend, UtteranceId};
pub use self::chunking::{plan_utterances, split_chunks};
pub use self::command_backend::CommandSpeechBackend;
pub use self::job::{ChunkRequest, JobProgress, SynthesisJob};

const SETTLE_POLL_INTERVAL: Duration = Duration::from_millis(8);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Ready,
    Failed(String),
    ShutDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeechSettings {
    /// Subtracted from the backend limit when a spoken text must be split.
    pub safety_margin: usize,
    /// Upper bound for one synthesized file's text.
    pub synthesis_chunk_chars: usize,
}

impl SpeechSettings {
    pub fn from_config(config: &VaultConfig) -> Self {
        Self {
            safety_margin: config.speech_safety_margin,
            synthesis_chunk_chars: config.synthesis_chunk_chars,
        }
    }
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self::from_config(&VaultConfig::default())
    }
}

pub(crate) enum Input {
    Command(Command),
    Backend(BackendEvent),
}

pub(crate) enum Command {
    Speak { text: String },
    Synthesize {
        text: String,
        output: SynthesisOutput,
        completer: JobCompleter,
    },
    Stop,
    Shutdown,
}

pub(crate) enum SynthesisOutput {
    Single(PathBuf),
    Batch { dir: PathBuf, base: String },
}

pub(crate) enum JobCompleter {
    Single(Completer<PathBuf>),
    Batch(Completer<Vec<PathBuf>>),
}

impl JobCompleter {
    fn finish(self, result: Result<Vec<PathBuf>>) {
        match self {
            JobCompleter::Single(completer) => completer.complete(result.and_then(|mut files| {
                files
                    .pop()
                    .ok_or_else(|| VaultError::Engine("no audio file was produced".to_string()))
            })),
            JobCompleter::Batch(completer) => completer.complete(result),
        }
    }
}

fn lock_state(state: &Mutex<EngineState>) -> MutexGuard<'_, EngineState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to the speech thread. Dropping it shuts the engine down.
pub struct SpeechEngine {
    tx: Sender<Input>,
    state: Arc<Mutex<EngineState>>,
    worker: Option<JoinHandle<()>>,
}

impl SpeechEngine {
    pub fn start<B: SpeechBackend>(backend: B, settings: SpeechSettings) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let state = Arc::new(Mutex::new(EngineState::Uninitialized));
        let worker = Worker {
            backend,
            settings,
            state: Arc::clone(&state),
            active: None,
            next_job: 0,
            next_utterance: 0,
        };
        let events = EventSink::new(tx.clone());
        let handle = thread::Builder::new()
            .name("speech-engine".to_string())
            .spawn(move || worker.run(events, rx))
            .map_err(|err| VaultError::io("spawning speech engine", err))?;
        Ok(Self {
            tx,
            state,
            worker: Some(handle),
        })
    }

    pub fn state(&self) -> EngineState {
        lock_state(&self.state).clone()
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state(), EngineState::Ready)
    }

    /// Block until initialisation has either succeeded or failed, for at most
    /// `limit`. Returns whatever state the engine is in by then.
    pub fn wait_until_settled(&self, limit: Duration) -> EngineState {
        let started = Instant::now();
        loop {
            let state = self.state();
            if state != EngineState::Uninitialized || started.elapsed() >= limit {
                return state;
            }
            thread::sleep(SETTLE_POLL_INTERVAL);
        }
    }

    /// Speak `text`, replacing anything currently being spoken.
    pub fn speak(&self, text: &str) -> Result<()> {
        self.ensure_ready()?;
        if text.trim().is_empty() {
            return Err(VaultError::NothingToSpeak);
        }
        self.send(Command::Speak {
            text: text.to_string(),
        })
    }

    /// Render `text` into one audio file at `target`.
    pub fn synthesize_to_file(&self, text: &str, target: impl Into<PathBuf>) -> Result<Pending<PathBuf>> {
        self.ensure_ready()?;
        if text.trim().is_empty() {
            return Err(VaultError::NothingToSpeak);
        }
        let (completer, pending) = task::pending("synthesize");
        self.send(Command::Synthesize {
            text: text.to_string(),
            output: SynthesisOutput::Single(target.into()),
            completer: JobCompleter::Single(completer),
        })?;
        Ok(pending)
    }

    /// Render `text` into `<base>-<i>.wav` files inside `dir`, one chunk at a
    /// time. Resolves to the files in chunk order.
    pub fn synthesize_chunks(
        &self,
        text: &str,
        dir: impl Into<PathBuf>,
        base: &str,
    ) -> Result<Pending<Vec<PathBuf>>> {
        self.ensure_ready()?;
        if text.trim().is_empty() {
            return Err(VaultError::NothingToSpeak);
        }
        let (completer, pending) = task::pending("synthesize-chunks");
        self.send(Command::Synthesize {
            text: text.to_string(),
            output: SynthesisOutput::Batch {
                dir: dir.into(),
                base: base.to_string(),
            },
            completer: JobCompleter::Batch(completer),
        })?;
        Ok(pending)
    }

    /// Silence the current utterance and cancel any synthesis in progress.
    pub fn stop(&self) {
        if self.tx.send(Input::Command(Command::Stop)).is_err() {
            debug!("Stop requested after the speech engine exited");
        }
    }

    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = self.tx.send(Input::Command(Command::Shutdown));
        if worker.join().is_err() {
            error!("Speech engine thread panicked");
        }
        *lock_state(&self.state) = EngineState::ShutDown;
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state() {
            EngineState::Ready => Ok(()),
            other => {
                debug!(state = ?other, "Speech request rejected");
                Err(VaultError::EngineNotReady)
            }
        }
    }

    fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(Input::Command(command))
            .map_err(|_| VaultError::EngineNotReady)
    }
}

impl Drop for SpeechEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct ActiveJob {
    job: SynthesisJob,
    completer: JobCompleter,
}

struct Worker<B> {
    backend: B,
    settings: SpeechSettings,
    state: Arc<Mutex<EngineState>>,
    active: Option<ActiveJob>,
    next_job: u64,
    next_utterance: u64,
}

impl<B: SpeechBackend> Worker<B> {
    fn run(mut self, events: EventSink, rx: Receiver<Input>) {
        self.backend.initialize(events);
        while let Ok(input) = rx.recv() {
            match input {
                Input::Backend(event) => self.on_backend_event(event),
                Input::Command(Command::Shutdown) => break,
                Input::Command(command) => self.on_command(command),
            }
        }
        self.cancel_active();
        self.backend.shutdown();
        *lock_state(&self.state) = EngineState::ShutDown;
        info!("Speech engine shut down");
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Speak { text } => self.speak(&text),
            Command::Synthesize {
                text,
                output,
                completer,
            } => self.start_job(text, output, completer),
            Command::Stop => {
                debug!("Stopping speech");
                self.backend.stop();
                self.cancel_active();
            }
            Command::Shutdown => {}
        }
    }

    fn speak(&mut self, text: &str) {
        let plan = plan_utterances(
            text,
            self.backend.max_input_len(),
            self.settings.safety_margin,
        );
        info!(utterances = plan.len(), total_chars = text.len(), "Speaking text");
        for (chunk, mode) in plan {
            let id = UtteranceId::new(format!("speak-{}", self.next_utterance));
            self.next_utterance += 1;
            if let Err(err) = self.backend.speak(&chunk, mode, &id) {
                warn!(%id, "Speech request rejected: {err}");
                break;
            }
        }
    }

    fn start_job(&mut self, text: String, output: SynthesisOutput, completer: JobCompleter) {
        if self.active.is_some() {
            info!("New synthesis supersedes the active one");
            self.backend.stop();
            self.cancel_active();
        }

        let prefix = format!("synth{}", self.next_job);
        self.next_job += 1;
        let max_len = self.backend.max_input_len();
        let job = match output {
            SynthesisOutput::Single(target) => {
                if text.chars().count() > max_len {
                    completer.finish(Err(VaultError::Engine(format!(
                        "text is longer than the {max_len} characters one request accepts"
                    ))));
                    return;
                }
                SynthesisJob::single(prefix, text, target)
            }
            SynthesisOutput::Batch { dir, base } => {
                if let Err(err) = fs::create_dir_all(&dir) {
                    completer.finish(Err(VaultError::io(
                        format!("creating {}", dir.display()),
                        err,
                    )));
                    return;
                }
                let chunk_chars = self
                    .settings
                    .synthesis_chunk_chars
                    .min(max_len.saturating_sub(self.settings.safety_margin))
                    .max(1);
                let chunks = split_chunks(&text, chunk_chars);
                info!(
                    chunks = chunks.len(),
                    chunk_chars,
                    dir = %dir.display(),
                    "Starting synthesis"
                );
                SynthesisJob::batch(prefix, chunks, &dir, &base)
            }
        };

        let mut active = ActiveJob { job, completer };
        let progress = active.job.start();
        self.active = Some(active);
        self.advance(progress);
    }

    fn on_backend_event(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::Initialized(Ok(())) => {
                let mut state = lock_state(&self.state);
                if *state == EngineState::Uninitialized {
                    info!("Speech engine ready");
                    *state = EngineState::Ready;
                }
            }
            BackendEvent::Initialized(Err(message)) => {
                error!("Speech engine failed to initialize: {message}");
                *lock_state(&self.state) = EngineState::Failed(message);
            }
            BackendEvent::Done(id) => {
                let progress = match self.active.as_mut() {
                    Some(active) => active.job.on_done(&id),
                    None => JobProgress::Ignored,
                };
                if progress == JobProgress::Ignored {
                    debug!(%id, "Utterance finished");
                }
                self.advance(progress);
            }
            BackendEvent::Failed(id, message) => {
                let progress = match self.active.as_mut() {
                    Some(active) => active.job.on_failed(&id, &message),
                    None => JobProgress::Ignored,
                };
                if progress == JobProgress::Ignored {
                    warn!(%id, "Utterance failed: {message}");
                }
                self.advance(progress);
            }
        }
    }

    fn advance(&mut self, progress: JobProgress) {
        match progress {
            JobProgress::Ignored => {}
            JobProgress::Submit(request) => {
                debug!(
                    index = request.index,
                    id = %request.id,
                    target = %request.target.display(),
                    "Synthesizing chunk"
                );
                if let Err(err) =
                    self.backend
                        .synthesize_to_file(&request.text, &request.target, &request.id)
                {
                    warn!(index = request.index, "Chunk could not be submitted: {err}");
                    self.finish_active(Err(err));
                }
            }
            JobProgress::Finished(files) => {
                info!(files = files.len(), "Synthesis finished");
                self.finish_active(Ok(files));
            }
            JobProgress::Failed { index, message } => {
                warn!(index, "Synthesis aborted: {message}");
                self.finish_active(Err(VaultError::Engine(format!(
                    "chunk {index} failed: {message}"
                ))));
            }
        }
    }

    fn finish_active(&mut self, result: Result<Vec<PathBuf>>) {
        if let Some(active) = self.active.take() {
            active.completer.finish(result);
        }
    }

    fn cancel_active(&mut self) {
        if let Some(active) = self.active.take() {
            debug!(
                produced = active.job.produced().len(),
                "Cancelling synthesis"
            );
            active.completer.finish(Err(VaultError::Cancelled));
        }
    }
}
