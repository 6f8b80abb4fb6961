//! The vault browser: one folder at a time, plus the actions offered on its
//! items.
//!
//! Every user action ends in either a value or a [`Notice`]; nothing here
//! prints or prompts. Mutations reload the listing after they complete.
//! Reading documents, recognising images and saving audio run in the
//! background; their results are collected by [`Browser::pump`] on the
//! caller's thread.

use crate::config::VaultConfig;
use crate::error::{ErrorClass, VaultError};
use crate::exchange::{self, SharedFile};
use crate::extract::{DocumentFormat, ExtractedText, Extraction, ExtractorRegistry};
use crate::navigation::{Navigator, UpOutcome};
use crate::ocr::TextRecognizer;
use crate::playback::{AudioOutput, AudioPlayer, PlayOutcome, PlaybackState};
use crate::speech::SpeechEngine;
use crate::store::{ContentNode, ContentStore, RelativePath, sort_for_display};
use crate::task::{Pending, spawn_background};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(8);
const NOT_READY_MESSAGE: &str = "TTS is not ready. Please try again shortly.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Failure,
}

/// Short message for the user about the outcome of an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Failure,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserEvent {
    Notice(Notice),
    TextReady(ExtractedText),
}

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub app_title: String,
    pub audio_folder_name: String,
    pub opener_command: String,
}

impl BrowserSettings {
    pub fn from_config(config: &VaultConfig) -> Self {
        Self {
            app_title: config.app_title.clone(),
            audio_folder_name: config.audio_folder_name.clone(),
            opener_command: config.opener_command.clone(),
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self::from_config(&VaultConfig::default())
    }
}

enum InFlight {
    Text {
        name: String,
        format: DocumentFormat,
        pending: Pending<Extraction>,
    },
    Audio {
        source_name: String,
        pending: Pending<Vec<PathBuf>>,
    },
}

pub struct Browser<O: AudioOutput> {
    store: ContentStore,
    nav: Navigator,
    listing: Vec<ContentNode>,
    extractors: Arc<ExtractorRegistry>,
    recognizer: Arc<dyn TextRecognizer>,
    speech: SpeechEngine,
    player: AudioPlayer<O>,
    settings: BrowserSettings,
    in_flight: Vec<InFlight>,
}

impl<O: AudioOutput> Browser<O> {
    pub fn new(
        store: ContentStore,
        extractors: ExtractorRegistry,
        recognizer: Arc<dyn TextRecognizer>,
        speech: SpeechEngine,
        output: O,
        settings: BrowserSettings,
    ) -> crate::Result<Self> {
        let mut browser = Self {
            store,
            nav: Navigator::new(),
            listing: Vec::new(),
            extractors: Arc::new(extractors),
            recognizer,
            speech,
            player: AudioPlayer::new(output),
            settings,
            in_flight: Vec::new(),
        };
        browser.reload()?;
        Ok(browser)
    }

    /// Re-read the current folder. Falls back to the root when the folder
    /// has disappeared.
    pub fn reload(&mut self) -> crate::Result<()> {
        if !self.nav.at_root() && !self.store.is_directory(self.nav.current()) {
            warn!(path = %self.nav.current(), "Current folder is gone; returning to root");
            self.nav.reset();
        }
        let mut items = self.store.list_items(self.nav.current())?;
        sort_for_display(&mut items);
        self.listing = items;
        Ok(())
    }

    pub fn listing(&self) -> &[ContentNode] {
        &self.listing
    }

    pub fn current_path(&self) -> &RelativePath {
        self.nav.current()
    }

    pub fn title(&self) -> String {
        self.nav.title(&self.settings.app_title)
    }

    pub fn is_busy(&self) -> bool {
        !self.in_flight.is_empty()
    }

    fn find(&self, name: &str) -> Option<ContentNode> {
        self.listing.iter().find(|node| node.name == name).cloned()
    }

    fn find_file(&self, name: &str) -> Result<ContentNode, Notice> {
        match self.find(name) {
            Some(node) if !node.is_dir() => Ok(node),
            Some(_) => Err(Notice::warning(format!("'{name}' is a folder"))),
            None => Err(Notice::warning(format!("No file named '{name}' here"))),
        }
    }

    pub fn enter(&mut self, name: &str) -> Result<(), Notice> {
        match self.find(name) {
            Some(node) if node.is_dir() => {}
            _ => return Err(Notice::warning(format!("No folder named '{name}' here"))),
        }
        if let Err(err) = self.nav.enter(name) {
            warn!(name, "Cannot enter folder: {err}");
            return Err(Notice::failure(format!("Cannot open folder '{name}'")));
        }
        self.reload_or_notice()
    }

    pub fn up(&mut self) -> Result<UpOutcome, Notice> {
        let outcome = self.nav.up();
        if outcome == UpOutcome::Moved {
            self.reload_or_notice()?;
        }
        Ok(outcome)
    }

    fn reload_or_notice(&mut self) -> Result<(), Notice> {
        self.reload().map_err(|err| {
            error!("Failed to list folder: {err}");
            Notice::failure("Could not list folder contents")
        })
    }

    fn reload_quietly(&mut self) {
        if let Err(err) = self.reload() {
            error!("Failed to list folder after change: {err}");
        }
    }

    pub fn create_folder(&mut self, raw_name: &str) -> Notice {
        let name = raw_name.trim();
        if name.is_empty() {
            return Notice::warning("Folder name cannot be empty");
        }
        if exchange::has_illegal_characters(name) {
            return Notice::warning("Folder name contains invalid characters");
        }
        match self.store.create_folder(name, self.nav.current()) {
            Ok(_) => {
                self.reload_quietly();
                Notice::info(format!("Folder '{name}' created"))
            }
            Err(err) => {
                warn!(name, "Failed to create folder: {err}");
                Notice::failure(format!("Failed to create folder '{name}'"))
            }
        }
    }

    /// Copy an outside file into the current folder under its sanitised
    /// name.
    pub fn import_file(&mut self, source: &Path) -> Notice {
        let Some(name) = exchange::display_name_of(source) else {
            return Notice::warning("Could not determine file name");
        };
        let mut reader = match File::open(source) {
            Ok(file) => file,
            Err(err) => {
                warn!(path = %source.display(), "Cannot open import source: {err}");
                return Notice::failure(format!("Failed to save file '{name}'"));
            }
        };
        self.import_from_reader(&mut reader, &name)
    }

    pub fn import_from_reader<R: std::io::Read>(&mut self, reader: &mut R, name: &str) -> Notice {
        let Some(name) = exchange::sanitize_file_name(name) else {
            return Notice::warning("Could not determine file name");
        };
        match self.store.save_file(reader, &name, self.nav.current()) {
            Ok(_) => {
                self.reload_quietly();
                Notice::info(format!("File '{name}' saved"))
            }
            Err(err) => {
                warn!(name, "Import failed: {err}");
                Notice::failure(format!("Failed to save file '{name}'"))
            }
        }
    }

    pub fn delete(&mut self, name: &str) -> Notice {
        let Some(node) = self.find(name) else {
            return Notice::warning(format!("Nothing named '{name}' here"));
        };
        if let Ok(path) = self.store.resolve(&node.path) {
            let playing = match self.player.state() {
                PlaybackState::Playing(file) | PlaybackState::Paused(file) => file.starts_with(&path),
                PlaybackState::Idle => false,
            };
            if playing {
                self.player.stop();
            }
        }
        match self.store.delete_item(&node) {
            Ok(()) => {
                self.reload_quietly();
                Notice::info(format!("'{name}' deleted"))
            }
            Err(err) => {
                warn!(name, "Delete failed: {err}");
                Notice::failure(format!("Failed to delete '{name}'"))
            }
        }
    }

    /// Start reading the text of a document or image. The text arrives later
    /// as [`BrowserEvent::TextReady`].
    pub fn open_text(&mut self, name: &str) -> Option<Notice> {
        let node = match self.find_file(name) {
            Ok(node) => node,
            Err(notice) => return Some(notice),
        };
        let path = match self.store.resolve(&node.path) {
            Ok(path) => path,
            Err(err) => {
                warn!(name, "Cannot resolve file: {err}");
                return Some(Notice::failure(format!("Cannot open '{name}'")));
            }
        };
        let format = DocumentFormat::from_path(&path);
        let pending = match format {
            DocumentFormat::Image => self.recognizer.recognize(&path),
            DocumentFormat::Unknown => return Some(Notice::warning("Unreadable File")),
            _ if !self.extractors.supports(format) => {
                return Some(Notice::warning("Unreadable File"));
            }
            _ => {
                let extractors = Arc::clone(&self.extractors);
                spawn_background("extract", move || extractors.extract(&path))
            }
        };
        debug!(name, %format, "Reading text in the background");
        self.in_flight.push(InFlight::Text {
            name: name.to_string(),
            format,
            pending,
        });
        None
    }

    /// Contents of a plain-text file for the in-app viewer.
    pub fn view_text(&self, name: &str) -> Result<String, Notice> {
        let node = self.find_file(name)?;
        if node.extension() != "txt" {
            return Err(Notice::warning("Cannot open or not a .txt file."));
        }
        let path = self.store.resolve(&node.path).map_err(|err| {
            warn!(name, "Cannot resolve file: {err}");
            Notice::warning("Cannot open or not a .txt file.")
        })?;
        std::fs::read_to_string(&path).map_err(|err| {
            warn!(path = %path.display(), "Viewer could not read file: {err}");
            Notice::failure(format!("Failed to read text file: {err}"))
        })
    }

    pub fn share(&self, name: &str) -> Result<SharedFile, Notice> {
        let node = self.find_file(name)?;
        exchange::share(&self.store, &node).map_err(|err| {
            error!(name, "Could not share file: {err}");
            Notice::failure("Error: Could not share file.")
        })
    }

    pub fn open_external(&self, name: &str) -> Result<(), Notice> {
        let shared = self.share(name)?;
        exchange::launch_viewer(&shared, &self.settings.opener_command).map_err(|err| match err {
            VaultError::Unsupported(_) => {
                let extension = shared
                    .path
                    .extension()
                    .map(|ext| ext.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Notice::warning(format!("No app found to open this file type: {extension}"))
            }
            other => {
                warn!(name, "Could not open file: {other}");
                Notice::failure("Could not open file.")
            }
        })
    }

    pub fn read_aloud(&self, text: &str) -> Option<Notice> {
        match self.speech.speak(text) {
            Ok(()) => None,
            Err(VaultError::EngineNotReady) => Some(Notice::warning(NOT_READY_MESSAGE)),
            Err(VaultError::NothingToSpeak) => Some(Notice::info("There is no text to read")),
            Err(err) => {
                warn!("Speaking failed: {err}");
                Some(Notice::failure("Failed to read text aloud"))
            }
        }
    }

    pub fn stop_speech(&self) {
        self.speech.stop();
    }

    /// Synthesize `text` into the audio folder of the current folder, creating
    /// the folder when needed.
    pub fn save_as_audio(&mut self, text: &ExtractedText) -> Option<Notice> {
        let folder = match self.ensure_audio_folder() {
            Ok(folder) => folder,
            Err(err) => {
                error!("Could not create the audio folder: {err}");
                return Some(Notice::failure("Failed to save audio"));
            }
        };
        let dir = match self.store.resolve(&folder) {
            Ok(dir) => dir,
            Err(err) => {
                error!("Audio folder is unusable: {err}");
                return Some(Notice::failure("Failed to save audio"));
            }
        };
        let base = audio_base_name(&text.source_name);
        match self.speech.synthesize_chunks(&text.text, dir, &base) {
            Ok(pending) => {
                info!(source = %text.source_name, base, "Saving audio");
                self.in_flight.push(InFlight::Audio {
                    source_name: text.source_name.clone(),
                    pending,
                });
                None
            }
            Err(VaultError::EngineNotReady) => Some(Notice::warning(NOT_READY_MESSAGE)),
            Err(err) => {
                warn!("Could not start synthesis: {err}");
                Some(Notice::failure("Failed to save audio"))
            }
        }
    }

    fn ensure_audio_folder(&mut self) -> crate::Result<RelativePath> {
        let wanted = &self.settings.audio_folder_name;
        let existing = self
            .listing
            .iter()
            .find(|node| node.is_dir() && node.name.eq_ignore_ascii_case(wanted))
            .map(|node| node.path.clone());
        if let Some(path) = existing {
            return Ok(path);
        }
        let node = self.store.create_folder(wanted, self.nav.current())?;
        self.reload_quietly();
        Ok(node.path)
    }

    pub fn play_audio(&mut self, name: &str) -> Result<PlayOutcome, Notice> {
        let node = self.find_file(name)?;
        let path = self.store.resolve(&node.path).map_err(|err| {
            warn!(name, "Cannot resolve audio file: {err}");
            Notice::failure(format!("Could not play '{name}'"))
        })?;
        self.player.play(&path).map_err(|err| {
            warn!(name, "Playback failed: {err}");
            Notice::failure(format!("Could not play '{name}'"))
        })
    }

    pub fn pause_audio(&mut self) -> bool {
        self.player.pause()
    }

    pub fn stop_audio(&mut self) {
        self.player.stop();
    }

    pub fn playback_state(&mut self) -> PlaybackState {
        self.player.state()
    }

    /// Collect finished background work without blocking.
    pub fn pump(&mut self) -> Vec<BrowserEvent> {
        let mut events = Vec::new();
        let mut waiting = Vec::new();
        for job in std::mem::take(&mut self.in_flight) {
            match job {
                InFlight::Text {
                    name,
                    format,
                    mut pending,
                } => match pending.poll() {
                    None => waiting.push(InFlight::Text {
                        name,
                        format,
                        pending,
                    }),
                    Some(result) => events.push(text_event(&name, format, result)),
                },
                InFlight::Audio {
                    source_name,
                    mut pending,
                } => match pending.poll() {
                    None => waiting.push(InFlight::Audio {
                        source_name,
                        pending,
                    }),
                    Some(result) => {
                        self.reload_quietly();
                        events.push(BrowserEvent::Notice(audio_notice(&source_name, result)));
                    }
                },
            }
        }
        self.in_flight.extend(waiting);
        events
    }

    /// Block until every background job has reported back.
    pub fn wait_idle(&mut self) -> Vec<BrowserEvent> {
        let mut events = self.pump();
        while self.is_busy() {
            thread::sleep(POLL_INTERVAL);
            events.extend(self.pump());
        }
        events
    }

    pub fn shutdown(&mut self) {
        self.player.stop();
        self.speech.shutdown();
    }
}

fn text_event(name: &str, format: DocumentFormat, result: crate::Result<Extraction>) -> BrowserEvent {
    match result {
        Ok(Extraction::Text(text)) => {
            info!(name, chars = text.text.len(), "Text ready");
            BrowserEvent::TextReady(text)
        }
        Ok(Extraction::Empty { format, .. }) => {
            BrowserEvent::Notice(Notice::info(format.empty_message()))
        }
        Err(err) => {
            warn!(name, %format, "Reading failed: {err}");
            BrowserEvent::Notice(Notice {
                level: notice_level(&err),
                message: read_failure_message(format, &err),
            })
        }
    }
}

fn notice_level(err: &VaultError) -> NoticeLevel {
    match err.class() {
        ErrorClass::Cancelled => NoticeLevel::Info,
        ErrorClass::Validation => NoticeLevel::Warning,
        ErrorClass::Io | ErrorClass::Format | ErrorClass::Engine => NoticeLevel::Failure,
    }
}

fn read_failure_message(format: DocumentFormat, err: &VaultError) -> String {
    let detail = match err {
        VaultError::Parse { message, .. } => message.clone(),
        VaultError::Recognition(message) => message.clone(),
        other => other.to_string(),
    };
    let label = match format {
        DocumentFormat::PlainText => "text",
        DocumentFormat::Pdf => "PDF",
        DocumentFormat::Word | DocumentFormat::LegacyWord => "Word",
        DocumentFormat::Epub => "EPUB",
        DocumentFormat::Image => return format!("Failed to read text: {detail}"),
        DocumentFormat::Unknown => return "Unreadable File".to_string(),
    };
    format!("Failed to read {label} file: {detail}")
}

fn audio_notice(source_name: &str, result: crate::Result<Vec<PathBuf>>) -> Notice {
    match result {
        Ok(files) if !files.is_empty() => {
            info!(source = source_name, files = files.len(), "Audio saved");
            Notice::info(format!("Audio saved: {} files", files.len()))
        }
        Ok(_) => Notice::failure("Failed to save audio"),
        Err(err) if err.class() == ErrorClass::Cancelled => {
            debug!(source = source_name, "Audio saving cancelled");
            Notice::info("Audio saving cancelled")
        }
        Err(err) => {
            warn!(source = source_name, "Audio saving failed: {err}");
            Notice::failure("Failed to save audio")
        }
    }
}

/// Stem of the source file, used as the prefix of its audio chunks.
fn audio_base_name(source_name: &str) -> String {
    Path::new(source_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .and_then(|stem| exchange::sanitize_file_name(&stem))
        .unwrap_or_else(|| "audio".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::fake::FakeOutput;
    use crate::speech::{
        EngineState, EventSink, QueueMode, SpeechBackend, SpeechSettings, UtteranceId,
    };
    use crate::task;
    use std::fs;

    /// Writes every requested file and reports success straight away.
    struct InstantBackend {
        events: Option<EventSink>,
    }

    impl SpeechBackend for InstantBackend {
        fn initialize(&mut self, events: EventSink) {
            events.initialized(Ok(()));
            self.events = Some(events);
        }

        fn max_input_len(&self) -> usize {
            4000
        }

        fn speak(&mut self, _text: &str, _mode: QueueMode, id: &UtteranceId) -> crate::Result<()> {
            if let Some(events) = &self.events {
                events.done(id);
            }
            Ok(())
        }

        fn synthesize_to_file(
            &mut self,
            _text: &str,
            target: &Path,
            id: &UtteranceId,
        ) -> crate::Result<()> {
            fs::write(target, b"RIFF").map_err(|err| VaultError::io("fake synth", err))?;
            if let Some(events) = &self.events {
                events.done(id);
            }
            Ok(())
        }

        fn stop(&mut self) {}

        fn shutdown(&mut self) {}
    }

    struct CannedRecognizer(&'static str);

    impl TextRecognizer for CannedRecognizer {
        fn recognize(&self, path: &Path) -> Pending<Extraction> {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            task::ready(
                "ocr",
                Ok(Extraction::from_text(
                    name,
                    DocumentFormat::Image,
                    self.0.to_string(),
                )),
            )
        }
    }

    fn browser(root: &Path) -> Browser<FakeOutput> {
        let store = ContentStore::open(root).expect("store");
        let speech = SpeechEngine::start(InstantBackend { events: None }, SpeechSettings::default())
            .expect("speech");
        assert_eq!(
            speech.wait_until_settled(Duration::from_secs(5)),
            EngineState::Ready
        );
        Browser::new(
            store,
            ExtractorRegistry::default(),
            Arc::new(CannedRecognizer("")),
            speech,
            FakeOutput::default(),
            BrowserSettings::default(),
        )
        .expect("browser")
    }

    fn notices(events: &[BrowserEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|event| match event {
                BrowserEvent::Notice(notice) => Some(notice.message.clone()),
                BrowserEvent::TextReady(_) => None,
            })
            .collect()
    }

    #[test]
    fn creating_docs_in_empty_root_lists_one_folder() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut browser = browser(dir.path());
        assert!(browser.listing().is_empty());

        let notice = browser.create_folder("Docs");
        assert_eq!(notice, Notice::info("Folder 'Docs' created"));
        assert_eq!(browser.listing().len(), 1);
        assert_eq!(browser.listing()[0].name, "Docs");
        assert!(browser.listing()[0].is_dir());
    }

    #[test]
    fn folder_names_are_validated_before_touching_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut browser = browser(dir.path());
        assert_eq!(
            browser.create_folder("   ").message,
            "Folder name cannot be empty"
        );
        assert_eq!(
            browser.create_folder("a/b").message,
            "Folder name contains invalid characters"
        );
        assert_eq!(
            browser.create_folder("what?").level,
            NoticeLevel::Warning
        );
        assert!(browser.listing().is_empty());
    }

    #[test]
    fn enter_up_and_title() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut browser = browser(dir.path());
        browser.create_folder("Docs");
        assert!(browser.enter("Missing").is_err());

        browser.enter("Docs").expect("enter");
        assert_eq!(browser.title(), "Docs");
        browser.create_folder("Inner");
        assert_eq!(browser.listing()[0].path.to_string(), "Docs/Inner");

        assert_eq!(browser.up().expect("up"), UpOutcome::Moved);
        assert_eq!(browser.title(), "Vault");
        assert_eq!(browser.up().expect("up"), UpOutcome::AtRoot);
    }

    #[test]
    fn vanished_folder_resets_to_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut browser = browser(dir.path());
        browser.create_folder("Temp");
        browser.enter("Temp").expect("enter");
        fs::remove_dir(browser.store.root().join("Temp")).expect("remove");
        browser.reload().expect("reload");
        assert!(browser.current_path().is_root());
    }

    #[test]
    fn imported_files_are_sanitised_and_listed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let outside = tempfile::tempdir().expect("outside");
        let source = outside.path().join("report:v2.txt");
        fs::write(&source, "quarterly numbers").expect("write");

        let mut browser = browser(dir.path());
        assert_eq!(
            browser.import_file(&source),
            Notice::info("File 'report_v2.txt' saved")
        );
        assert_eq!(browser.listing()[0].name, "report_v2.txt");
        assert_eq!(
            browser.view_text("report_v2.txt").expect("view"),
            "quarterly numbers"
        );
    }

    #[test]
    fn reading_documents_reports_text_or_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut browser = browser(dir.path());
        browser.import_from_reader(&mut &b""[..], "blank.txt");
        browser.import_from_reader(&mut &b"Once upon a time"[..], "story.txt");
        browser.import_from_reader(&mut &b"PK"[..], "bundle.zip");

        assert_eq!(browser.open_text("bundle.zip"), Some(Notice::warning("Unreadable File")));
        assert!(browser.open_text("blank.txt").is_none());
        assert!(browser.open_text("story.txt").is_none());
        let events = browser.wait_idle();

        assert!(notices(&events).contains(&"Text file is empty".to_string()));
        let story = events.iter().find_map(|event| match event {
            BrowserEvent::TextReady(text) => Some(text.clone()),
            BrowserEvent::Notice(_) => None,
        });
        let story = story.expect("story text");
        assert_eq!(story.source_name, "story.txt");
        assert_eq!(story.text, "Once upon a time");
        assert!(!browser.is_busy());
    }

    #[test]
    fn broken_pdf_reports_a_read_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut browser = browser(dir.path());
        browser.import_from_reader(&mut &b"not really a pdf"[..], "scan.pdf");
        browser.open_text("scan.pdf");
        let messages = notices(&browser.wait_idle());
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("Failed to read PDF file: "));
    }

    #[test]
    fn images_go_through_the_recognizer() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut browser = browser(dir.path());
        browser.recognizer = Arc::new(CannedRecognizer("STOP"));
        browser.import_from_reader(&mut &b"\x89PNG"[..], "sign.png");
        browser.open_text("sign.png");
        let events = browser.wait_idle();
        assert!(matches!(
            &events[..],
            [BrowserEvent::TextReady(text)] if text.text == "STOP" && text.format == DocumentFormat::Image
        ));

        browser.recognizer = Arc::new(CannedRecognizer("  "));
        browser.open_text("sign.png");
        assert_eq!(notices(&browser.wait_idle()), vec!["No text found in image".to_string()]);
    }

    #[test]
    fn save_as_audio_creates_folder_and_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut browser = browser(dir.path());
        browser.create_folder("Docs");
        browser.enter("Docs").expect("enter");

        let text = ExtractedText {
            source_name: "notes.pdf".to_string(),
            format: DocumentFormat::Pdf,
            text: "Remember the milk.".to_string(),
        };
        assert!(browser.save_as_audio(&text).is_none());
        assert_eq!(
            notices(&browser.wait_idle()),
            vec!["Audio saved: 1 files".to_string()]
        );

        assert!(browser
            .listing()
            .iter()
            .any(|node| node.is_dir() && node.name == "Saved Audios"));
        let clip = browser
            .store
            .root()
            .join("Docs")
            .join("Saved Audios")
            .join("notes-0.wav");
        assert!(clip.is_file());

        // A second save reuses the folder.
        assert!(browser.save_as_audio(&text).is_none());
        browser.wait_idle();
        let folders = browser.listing().iter().filter(|node| node.is_dir()).count();
        assert_eq!(folders, 1);
    }

    #[test]
    fn delete_and_play() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut browser = browser(dir.path());
        browser.import_from_reader(&mut &b"RIFF"[..], "clip.wav");
        browser.import_from_reader(&mut &b"RIFF"[..], "other.wav");

        assert_eq!(browser.play_audio("clip.wav"), Ok(PlayOutcome::Started));
        assert!(browser.pause_audio());
        assert_eq!(browser.play_audio("other.wav"), Ok(PlayOutcome::Resumed));
        assert!(matches!(browser.playback_state(), PlaybackState::Playing(p) if p.ends_with("clip.wav")));

        assert_eq!(browser.delete("clip.wav"), Notice::info("'clip.wav' deleted"));
        assert_eq!(browser.playback_state(), PlaybackState::Idle);
        assert_eq!(browser.listing().len(), 1);
        assert_eq!(browser.delete("clip.wav").level, NoticeLevel::Warning);
    }

    #[test]
    fn speech_requests_map_to_notices() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut browser = browser(dir.path());
        assert!(browser.read_aloud("Hello there").is_none());
        assert_eq!(
            browser.read_aloud(" ").map(|n| n.level),
            Some(NoticeLevel::Info)
        );
        browser.stop_speech();
        browser.shutdown();
        assert_eq!(
            browser.read_aloud("Hello again"),
            Some(Notice::warning(NOT_READY_MESSAGE))
        );
    }

    #[test]
    fn audio_base_name_drops_extension() {
        assert_eq!(audio_base_name("notes.pdf"), "notes");
        assert_eq!(audio_base_name("a:b.txt"), "a_b");
        assert_eq!(audio_base_name(""), "audio");
    }
}
