use super::{DocumentFormat, TextExtractor};
use crate::error::{Result, VaultError};
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tracing::{debug, error, warn};

/// Layout-aware text stripping over every page. Image-only pages contribute
/// nothing, which surfaces as an empty extraction rather than an error.
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<String> {
        let bytes = fs::read(path)
            .map_err(|err| VaultError::io(format!("reading {}", path.display()), err))?;
        debug!(path = %path.display(), bytes = bytes.len(), "Parsing PDF");

        // pdf-extract can panic on malformed fonts; keep that scoped to this file.
        match panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem(&bytes)
        })) {
            Ok(Ok(text)) => Ok(text.trim().to_string()),
            Ok(Err(err)) => {
                warn!(path = %path.display(), "PDF extraction failed: {err}");
                Err(VaultError::parse(DocumentFormat::Pdf, err.to_string()))
            }
            Err(_) => {
                error!(path = %path.display(), "PDF extraction panicked");
                Err(VaultError::parse(
                    DocumentFormat::Pdf,
                    "document structure could not be decoded",
                ))
            }
        }
    }
}
