//! Plain-text extraction from stored documents.
//!
//! One strategy per [`DocumentFormat`], looked up through an
//! [`ExtractorRegistry`]. Extractors are synchronous and may block on I/O, so
//! callers run them off the interactive thread.

mod epub;
mod legacy_word;
mod pdf;
mod plain;
mod word;

use crate::error::{Result, VaultError};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub use self::epub::EpubExtractor;
pub use self::legacy_word::LegacyWordExtractor;
pub use self::pdf::PdfExtractor;
pub use self::plain::PlainTextExtractor;
pub use self::word::WordExtractor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    PlainText,
    Pdf,
    Word,
    LegacyWord,
    Epub,
    Image,
    Unknown,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();
        Self::from_extension(&extension)
    }

    pub fn from_extension(extension: &str) -> Self {
        match extension {
            "txt" => DocumentFormat::PlainText,
            "pdf" => DocumentFormat::Pdf,
            "docx" => DocumentFormat::Word,
            "doc" => DocumentFormat::LegacyWord,
            "epub" => DocumentFormat::Epub,
            "jpg" | "jpeg" | "png" => DocumentFormat::Image,
            _ => DocumentFormat::Unknown,
        }
    }

    /// Message shown when a document of this format holds no text.
    pub fn empty_message(self) -> &'static str {
        match self {
            DocumentFormat::PlainText => "Text file is empty",
            DocumentFormat::Pdf => "No text found in PDF (may contain only images)",
            DocumentFormat::Word | DocumentFormat::LegacyWord => "No text found in Word document",
            DocumentFormat::Epub => "No readable text found in EPUB",
            DocumentFormat::Image => "No text found in image",
            DocumentFormat::Unknown => "No text found",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DocumentFormat::PlainText => "text",
            DocumentFormat::Pdf => "PDF",
            DocumentFormat::Word => "Word",
            DocumentFormat::LegacyWord => "Word 97",
            DocumentFormat::Epub => "EPUB",
            DocumentFormat::Image => "image",
            DocumentFormat::Unknown => "unknown",
        };
        write!(f, "{label}")
    }
}

/// Text pulled out of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub source_name: String,
    pub format: DocumentFormat,
    pub text: String,
}

/// Outcome of a successful read. A document without text is not a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Text(ExtractedText),
    Empty {
        source_name: String,
        format: DocumentFormat,
    },
}

impl Extraction {
    pub fn from_text(source_name: String, format: DocumentFormat, text: String) -> Self {
        if text.trim().is_empty() {
            Extraction::Empty {
                source_name,
                format,
            }
        } else {
            Extraction::Text(ExtractedText {
                source_name,
                format,
                text,
            })
        }
    }
}

pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String>;
}

#[derive(Clone)]
pub struct ExtractorRegistry {
    extractors: HashMap<DocumentFormat, Arc<dyn TextExtractor>>,
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(DocumentFormat::PlainText, PlainTextExtractor);
        registry.register(DocumentFormat::Pdf, PdfExtractor);
        registry.register(DocumentFormat::Word, WordExtractor);
        registry.register(DocumentFormat::LegacyWord, LegacyWordExtractor);
        registry.register(DocumentFormat::Epub, EpubExtractor);
        registry
    }
}

impl ExtractorRegistry {
    pub fn empty() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    pub fn register(&mut self, format: DocumentFormat, extractor: impl TextExtractor + 'static) {
        self.extractors.insert(format, Arc::new(extractor));
    }

    pub fn supports(&self, format: DocumentFormat) -> bool {
        self.extractors.contains_key(&format)
    }

    pub fn extract(&self, path: &Path) -> Result<Extraction> {
        let format = DocumentFormat::from_path(path);
        let source_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let Some(extractor) = self.extractors.get(&format) else {
            debug!(path = %path.display(), %format, "No extractor registered");
            return Err(VaultError::Unsupported(source_name));
        };
        info!(path = %path.display(), %format, "Extracting text");
        let text = extractor.extract(path)?;
        info!(
            path = %path.display(),
            total_chars = text.len(),
            "Finished extracting text"
        );
        Ok(Extraction::from_text(source_name, format, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn format_is_derived_from_lowercase_extension() {
        assert_eq!(DocumentFormat::from_path(Path::new("A.TXT")), DocumentFormat::PlainText);
        assert_eq!(DocumentFormat::from_path(Path::new("b.Docx")), DocumentFormat::Word);
        assert_eq!(DocumentFormat::from_path(Path::new("c.doc")), DocumentFormat::LegacyWord);
        assert_eq!(DocumentFormat::from_path(Path::new("d.jpeg")), DocumentFormat::Image);
        assert_eq!(DocumentFormat::from_path(Path::new("e")), DocumentFormat::Unknown);
    }

    #[test]
    fn zero_byte_text_file_is_empty_not_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("blank.txt");
        fs::write(&path, b"").expect("write");
        let outcome = ExtractorRegistry::default().extract(&path).expect("extract");
        assert_eq!(
            outcome,
            Extraction::Empty {
                source_name: "blank.txt".to_string(),
                format: DocumentFormat::PlainText,
            }
        );
    }

    #[test]
    fn unknown_formats_fall_back_to_unsupported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("archive.rar");
        fs::write(&path, b"rar").expect("write");
        let err = ExtractorRegistry::default()
            .extract(&path)
            .expect_err("no extractor for rar");
        assert!(matches!(err, VaultError::Unsupported(name) if name == "archive.rar"));
    }

    struct Shouting;

    impl TextExtractor for Shouting {
        fn extract(&self, path: &Path) -> Result<String> {
            fs::read_to_string(path)
                .map(|text| text.to_uppercase())
                .map_err(|err| VaultError::io("reading", err))
        }
    }

    #[test]
    fn registered_strategy_replaces_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("quiet.txt");
        fs::write(&path, "hello").expect("write");
        let mut registry = ExtractorRegistry::default();
        registry.register(DocumentFormat::PlainText, Shouting);
        match registry.extract(&path).expect("extract") {
            Extraction::Text(text) => assert_eq!(text.text, "HELLO"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(!registry.supports(DocumentFormat::Image));
    }
}
