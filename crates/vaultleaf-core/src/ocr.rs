//! Text recognition over stored images.
//!
//! Images are decoded and flattened to grayscale here, then handed to an
//! external OCR command. Recognition always runs on a background thread; the
//! caller polls the returned [`Pending`].

use crate::error::{Result, VaultError};
use crate::extract::{DocumentFormat, Extraction};
use crate::task::{Pending, spawn_background};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, path: &Path) -> Pending<Extraction>;
}

#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    command: String,
    language: String,
    scratch_dir: PathBuf,
}

impl TesseractRecognizer {
    pub fn new(
        command: impl Into<String>,
        language: impl Into<String>,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
            scratch_dir: scratch_dir.into(),
        }
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, path: &Path) -> Pending<Extraction> {
        let this = self.clone();
        let path = path.to_path_buf();
        spawn_background("ocr", move || this.recognize_blocking(&path))
    }
}

impl TesseractRecognizer {
    fn recognize_blocking(&self, path: &Path) -> Result<Extraction> {
        let source_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!(path = %path.display(), "Recognizing text in image");

        let decoded = image::open(path).map_err(|err| {
            warn!(path = %path.display(), "Image could not be decoded: {err}");
            VaultError::Recognition(format!("{source_name} could not be decoded: {err}"))
        })?;
        let gray = decoded.to_luma8();
        debug!(width = gray.width(), height = gray.height(), "Decoded image");

        fs::create_dir_all(&self.scratch_dir).map_err(|err| {
            VaultError::io(format!("creating {}", self.scratch_dir.display()), err)
        })?;
        let scratch = ScratchFile(scratch_png_path(&self.scratch_dir));
        gray.save(&scratch.0)
            .map_err(|err| VaultError::Recognition(format!("preparing image: {err}")))?;

        let output = Command::new(&self.command)
            .arg(&scratch.0)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .stdin(Stdio::null())
            .output()
            .map_err(|err| {
                warn!(command = %self.command, "OCR command could not be started: {err}");
                VaultError::Recognition(format!("starting {}: {err}", self.command))
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, "OCR command failed: {}", stderr.trim());
            return Err(VaultError::Recognition(stderr.trim().to_string()));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!(
            path = %path.display(),
            total_chars = text.len(),
            "Finished recognizing text"
        );
        Ok(Extraction::from_text(source_name, DocumentFormat::Image, text))
    }
}

/// Removed when dropped, whichever way recognition ends.
struct ScratchFile(PathBuf);

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.0) {
            debug!(path = %self.0.display(), "Scratch file not removed: {err}");
        }
    }
}

fn scratch_png_path(dir: &Path) -> PathBuf {
    static SEQ: AtomicU64 = AtomicU64::new(0);
    let nonce = SEQ.fetch_add(1, Ordering::Relaxed);
    dir.join(format!("ocr-{}-{nonce}.png", std::process::id()))
}
