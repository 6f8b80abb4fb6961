//! Single-stream audio playback.
//!
//! [`AudioPlayer`] holds at most one live stream. Starting a different file
//! always stops the current one first.

use crate::error::{Result, VaultError};
use rodio::{Decoder, OutputStream, Sink};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Opens decoded streams on some audio device.
pub trait AudioOutput {
    type Stream: AudioStream;

    fn start(&mut self, file: &Path) -> Result<Self::Stream>;
}

pub trait AudioStream {
    fn pause(&self);
    fn resume(&self);
    fn is_paused(&self) -> bool;
    fn is_finished(&self) -> bool;
    fn stop(self);
}

#[derive(Debug, Default)]
pub struct RodioOutput;

pub struct RodioStream {
    _stream: OutputStream,
    sink: Sink,
}

impl AudioOutput for RodioOutput {
    type Stream = RodioStream;

    fn start(&mut self, file: &Path) -> Result<RodioStream> {
        let (stream, handle) = OutputStream::try_default()
            .map_err(|err| VaultError::Playback(format!("opening audio output: {err}")))?;
        let sink = Sink::try_new(&handle)
            .map_err(|err| VaultError::Playback(format!("creating sink: {err}")))?;
        let reader = BufReader::new(
            File::open(file).map_err(|err| VaultError::io(format!("opening {}", file.display()), err))?,
        );
        let source = Decoder::new(reader).map_err(|err| {
            VaultError::Playback(format!("{} cannot be decoded: {err}", file.display()))
        })?;
        sink.append(source);
        sink.play();
        Ok(RodioStream {
            _stream: stream,
            sink,
        })
    }
}

impl AudioStream for RodioStream {
    fn pause(&self) {
        self.sink.pause();
    }

    fn resume(&self) {
        self.sink.play();
    }

    fn is_paused(&self) -> bool {
        self.sink.is_paused()
    }

    fn is_finished(&self) -> bool {
        self.sink.empty()
    }

    fn stop(self) {
        self.sink.stop();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing(PathBuf),
    Paused(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Started,
    Resumed,
}

struct Active<S> {
    file: PathBuf,
    stream: S,
}

pub struct AudioPlayer<O: AudioOutput> {
    output: O,
    active: Option<Active<O::Stream>>,
}

impl<O: AudioOutput> AudioPlayer<O> {
    pub fn new(output: O) -> Self {
        Self {
            output,
            active: None,
        }
    }

    /// Resume the paused stream in place if there is one, whatever `file`
    /// is; otherwise stop the current stream and play `file` from the start.
    pub fn play(&mut self, file: &Path) -> Result<PlayOutcome> {
        self.reap_finished();
        if let Some(active) = &self.active {
            if active.stream.is_paused() {
                debug!(
                    path = %active.file.display(),
                    requested = %file.display(),
                    "Resuming paused playback"
                );
                active.stream.resume();
                return Ok(PlayOutcome::Resumed);
            }
        }
        self.stop();

        if !file.is_file() {
            warn!(path = %file.display(), "Audio file is missing");
            return Err(VaultError::Playback(format!(
                "{} does not exist",
                file.display()
            )));
        }
        let stream = self.output.start(file)?;
        info!(path = %file.display(), "Starting playback");
        self.active = Some(Active {
            file: file.to_path_buf(),
            stream,
        });
        Ok(PlayOutcome::Started)
    }

    /// Returns whether anything was playing.
    pub fn pause(&mut self) -> bool {
        self.reap_finished();
        match &self.active {
            Some(active) if !active.stream.is_paused() => {
                debug!(path = %active.file.display(), "Pausing playback");
                active.stream.pause();
                true
            }
            _ => false,
        }
    }

    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            debug!(path = %active.file.display(), "Stopping playback");
            active.stream.stop();
        }
    }

    pub fn state(&mut self) -> PlaybackState {
        self.reap_finished();
        match &self.active {
            None => PlaybackState::Idle,
            Some(active) if active.stream.is_paused() => PlaybackState::Paused(active.file.clone()),
            Some(active) => PlaybackState::Playing(active.file.clone()),
        }
    }

    fn reap_finished(&mut self) {
        if self
            .active
            .as_ref()
            .is_some_and(|active| active.stream.is_finished())
        {
            self.stop();
        }
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Default)]
    pub struct Log {
        pub started: Vec<PathBuf>,
        pub stopped: Vec<PathBuf>,
    }

    #[derive(Clone, Default)]
    pub struct FakeOutput {
        pub log: Rc<RefCell<Log>>,
        pub finished: Rc<RefCell<bool>>,
    }

    pub struct FakeStream {
        file: PathBuf,
        paused: RefCell<bool>,
        log: Rc<RefCell<Log>>,
        finished: Rc<RefCell<bool>>,
    }

    impl AudioOutput for FakeOutput {
        type Stream = FakeStream;

        fn start(&mut self, file: &Path) -> Result<FakeStream> {
            self.log.borrow_mut().started.push(file.to_path_buf());
            *self.finished.borrow_mut() = false;
            Ok(FakeStream {
                file: file.to_path_buf(),
                paused: RefCell::new(false),
                log: Rc::clone(&self.log),
                finished: Rc::clone(&self.finished),
            })
        }
    }

    impl AudioStream for FakeStream {
        fn pause(&self) {
            *self.paused.borrow_mut() = true;
        }

        fn resume(&self) {
            *self.paused.borrow_mut() = false;
        }

        fn is_paused(&self) -> bool {
            *self.paused.borrow()
        }

        fn is_finished(&self) -> bool {
            *self.finished.borrow()
        }

        fn stop(self) {
            self.log.borrow_mut().stopped.push(self.file);
        }
    }
}
