//! Speech backend driving an espeak-ng compatible command.
//!
//! Spoken utterances are queued on a speaker thread and played one child
//! process at a time. A flush cancels the token shared by everything queued
//! so far. File synthesis runs on its own thread and the written WAV is
//! checked before completion is reported.

use super::{EventSink, QueueMode, SpeechBackend, UtteranceId};
use crate::cancellation::CancellationToken;
use crate::config::VaultConfig;
use crate::error::{Result, VaultError};
use std::io::{Read, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(8);

type ChildSlot = Arc<Mutex<Option<Child>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Utterance {
    text: String,
    id: UtteranceId,
    token: CancellationToken,
}

pub struct CommandSpeechBackend {
    command: String,
    voice: String,
    rate_wpm: u32,
    max_input_chars: usize,
    events: Option<EventSink>,
    queue: Option<Sender<Utterance>>,
    speak_token: CancellationToken,
    speaking: ChildSlot,
    synth_token: CancellationToken,
    synthesizing: ChildSlot,
}

impl CommandSpeechBackend {
    pub fn new(command: impl Into<String>, voice: impl Into<String>, rate_wpm: u32, max_input_chars: usize) -> Self {
        Self {
            command: command.into(),
            voice: voice.into(),
            rate_wpm,
            max_input_chars,
            events: None,
            queue: None,
            speak_token: CancellationToken::new(),
            speaking: Arc::new(Mutex::new(None)),
            synth_token: CancellationToken::new(),
            synthesizing: Arc::new(Mutex::new(None)),
        }
    }

    pub fn from_config(config: &VaultConfig) -> Self {
        Self::new(
            config.speech_command.clone(),
            config.speech_voice.clone(),
            config.speech_rate_wpm,
            config.speech_max_input_chars,
        )
    }

    fn template(&self) -> CommandTemplate {
        CommandTemplate {
            program: self.command.clone(),
            args: vec![
                "-v".to_string(),
                self.voice.clone(),
                "-s".to_string(),
                self.rate_wpm.to_string(),
            ],
        }
    }

    fn events(&self) -> Result<&EventSink> {
        self.events.as_ref().ok_or(VaultError::EngineNotReady)
    }
}

impl SpeechBackend for CommandSpeechBackend {
    fn initialize(&mut self, events: EventSink) {
        let (tx, rx) = mpsc::channel::<Utterance>();
        let speaker_events = events.clone();
        let slot = Arc::clone(&self.speaking);
        let template = self.template();
        let spawned = thread::Builder::new()
            .name("speech-speaker".to_string())
            .spawn(move || {
                for utterance in rx {
                    if utterance.token.is_cancelled() {
                        debug!(id = %utterance.id, "Skipping flushed utterance");
                        continue;
                    }
                    let mut command = template.build();
                    command.arg("--stdin");
                    match run_child(command, &utterance.text, &slot, &utterance.token) {
                        Ok(()) => speaker_events.done(&utterance.id),
                        Err(VaultError::Cancelled) => {
                            debug!(id = %utterance.id, "Utterance interrupted")
                        }
                        Err(err) => speaker_events.failed(&utterance.id, err.to_string()),
                    }
                }
            });
        match spawned {
            Ok(_) => self.queue = Some(tx),
            Err(err) => {
                events.initialized(Err(format!("speaker thread: {err}")));
                return;
            }
        }

        let init_events = events.clone();
        let command = self.command.clone();
        let voice = self.voice.clone();
        let spawned = thread::Builder::new()
            .name("speech-init".to_string())
            .spawn(move || init_events.initialized(probe_engine(&command, &voice)));
        if let Err(err) = spawned {
            events.initialized(Err(format!("init thread: {err}")));
        }
        self.events = Some(events);
    }

    fn max_input_len(&self) -> usize {
        self.max_input_chars
    }

    fn speak(&mut self, text: &str, mode: QueueMode, id: &UtteranceId) -> Result<()> {
        if mode == QueueMode::Flush {
            self.speak_token.cancel();
            kill_slot(&self.speaking);
            self.speak_token = CancellationToken::new();
        }
        let queue = self.queue.as_ref().ok_or(VaultError::EngineNotReady)?;
        queue
            .send(Utterance {
                text: text.to_string(),
                id: id.clone(),
                token: self.speak_token.clone(),
            })
            .map_err(|_| VaultError::Engine("speaker thread has exited".to_string()))
    }

    fn synthesize_to_file(&mut self, text: &str, target: &Path, id: &UtteranceId) -> Result<()> {
        let events = self.events()?.clone();
        self.synth_token = CancellationToken::new();
        let token = self.synth_token.clone();
        let slot = Arc::clone(&self.synthesizing);
        let mut command = self.template().build();
        command.arg("-w").arg(target).arg("--stdin");
        let text = text.to_string();
        let target = target.to_path_buf();
        let id = id.clone();
        thread::Builder::new()
            .name("speech-synth".to_string())
            .spawn(move || {
                let outcome = run_child(command, &text, &slot, &token).and_then(|()| validate_wav(&target));
                match outcome {
                    Ok(()) => events.done(&id),
                    Err(VaultError::Cancelled) => debug!(%id, "Synthesis interrupted"),
                    Err(err) => events.failed(&id, err.to_string()),
                }
            })
            .map_err(|err| VaultError::io("spawning synthesis thread", err))?;
        Ok(())
    }

    fn stop(&mut self) {
        self.speak_token.cancel();
        self.synth_token.cancel();
        kill_slot(&self.speaking);
        kill_slot(&self.synthesizing);
    }

    fn shutdown(&mut self) {
        self.stop();
        self.queue = None;
        self.events = None;
        info!(command = %self.command, "Speech backend released");
    }
}

/// Program and voice arguments shared by every invocation.
struct CommandTemplate {
    program: String,
    args: Vec<String>,
}

impl CommandTemplate {
    fn build(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }
}

/// The command must run at all and know at least one voice for `voice`.
fn probe_engine(command: &str, voice: &str) -> std::result::Result<(), String> {
    let version = Command::new(command)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .map_err(|err| format!("{command} is not available: {err}"))?;
    if !version.status.success() {
        return Err(format!("{command} --version exited with {}", version.status));
    }
    debug!(
        version = %String::from_utf8_lossy(&version.stdout).trim(),
        "Speech command found"
    );

    let voices = Command::new(command)
        .arg(format!("--voices={voice}"))
        .stdin(Stdio::null())
        .output()
        .map_err(|err| format!("listing voices: {err}"))?;
    // First line is a column header.
    let listed = String::from_utf8_lossy(&voices.stdout)
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .count();
    if !voices.status.success() || listed == 0 {
        return Err(format!("language '{voice}' is not supported"));
    }
    info!(command, voice, voices = listed, "Speech engine initialized");
    Ok(())
}

fn kill_slot(slot: &ChildSlot) {
    if let Some(mut child) = lock(slot).take() {
        let _ = child.kill();
        let _ = child.wait();
    }
}

/// Feed `text` on stdin and wait for the child, polling so that a cancelled
/// token or a `kill_slot` from another thread ends the wait.
fn run_child(mut command: Command, text: &str, slot: &ChildSlot, token: &CancellationToken) -> Result<()> {
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| VaultError::Engine(format!("starting speech command: {err}")))?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(text.as_bytes())
            .map_err(|err| VaultError::Engine(format!("sending text: {err}")))?;
    }
    *lock(slot) = Some(child);

    loop {
        {
            let mut guard = lock(slot);
            let Some(child) = guard.as_mut() else {
                return Err(VaultError::Cancelled);
            };
            if token.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                *guard = None;
                return Err(VaultError::Cancelled);
            }
            match child.try_wait() {
                Ok(Some(status)) => {
                    let mut stderr = String::new();
                    if let Some(mut pipe) = child.stderr.take() {
                        let _ = pipe.read_to_string(&mut stderr);
                    }
                    *guard = None;
                    if status.success() {
                        return Ok(());
                    }
                    warn!(%status, "Speech command failed: {}", stderr.trim());
                    return Err(VaultError::Engine(format!("{status}: {}", stderr.trim())));
                }
                Ok(None) => {}
                Err(err) => {
                    *guard = None;
                    return Err(VaultError::Engine(format!("waiting for speech command: {err}")));
                }
            }
        }
        thread::sleep(CHILD_POLL_INTERVAL);
    }
}

/// A finished file must be a readable WAV with at least one sample.
fn validate_wav(path: &Path) -> Result<()> {
    let reader = hound::WavReader::open(path)
        .map_err(|err| VaultError::Engine(format!("{} is not valid audio: {err}", path.display())))?;
    if reader.duration() == 0 {
        return Err(VaultError::Engine(format!("{} contains no audio", path.display())));
    }
    debug!(
        path = %path.display(),
        sample_rate = reader.spec().sample_rate,
        frames = reader.duration(),
        "Synthesized file verified"
    );
    Ok(())
}
