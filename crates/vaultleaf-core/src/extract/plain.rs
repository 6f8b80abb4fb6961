use super::{DocumentFormat, TextExtractor};
use crate::error::{Result, VaultError};
use std::fs;
use std::path::Path;

/// UTF-8 text files, read as-is.
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path) -> Result<String> {
        let bytes = fs::read(path)
            .map_err(|err| VaultError::io(format!("reading {}", path.display()), err))?;
        String::from_utf8(bytes).map_err(|err| {
            VaultError::parse(
                DocumentFormat::PlainText,
                format!("not valid UTF-8 at byte {}", err.utf8_error().valid_up_to()),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_utf8_and_rejects_other_encodings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let good = dir.path().join("good.txt");
        fs::write(&good, "naïve text").expect("write");
        assert_eq!(PlainTextExtractor.extract(&good).expect("read"), "naïve text");

        let bad = dir.path().join("bad.txt");
        fs::write(&bad, [0x66, 0x6f, 0xff, 0xfe]).expect("write");
        let err = PlainTextExtractor.extract(&bad).expect_err("latin-1 bytes");
        assert!(matches!(
            err,
            VaultError::Parse {
                format: DocumentFormat::PlainText,
                ..
            }
        ));
    }
}
