use super::{DocumentFormat, TextExtractor};
use crate::error::{Result, VaultError};
use epub::doc::EpubDoc;
use std::path::Path;
use tracing::{debug, info, warn};

/// Walks the spine and strips markup from every chapter. Chapters are joined
/// with a blank line.
pub struct EpubExtractor;

impl TextExtractor for EpubExtractor {
    fn extract(&self, path: &Path) -> Result<String> {
        let mut doc = EpubDoc::new(path).map_err(|err| {
            warn!(path = %path.display(), "Failed to open EPUB: {err}");
            VaultError::parse(DocumentFormat::Epub, err.to_string())
        })?;

        let mut combined = String::new();
        let mut chapters = 0usize;

        loop {
            if let Some((chapter, _mime)) = doc.get_current_str() {
                chapters += 1;
                // Very wide lines so no hard breaks end up in the spoken text.
                let plain = match html2text::from_read(chapter.as_bytes(), 10_000) {
                    Ok(clean) => clean,
                    Err(err) => {
                        warn!(chapter = chapters, "html2text failed: {err}");
                        chapter
                    }
                };
                let plain = plain.trim();
                if !plain.is_empty() {
                    if !combined.is_empty() {
                        combined.push_str("\n\n");
                    }
                    combined.push_str(plain);
                }
                debug!(chapter = chapters, added_chars = plain.len(), "Parsed chapter");
            }

            if !doc.go_next() {
                break;
            }
        }

        info!(
            chapters,
            total_chars = combined.len(),
            "Finished loading EPUB content"
        );
        Ok(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{Extraction, ExtractorRegistry};
    use std::fs::{self, File};
    use std::io::Write;
    use zip::CompressionMethod;
    use zip::write::SimpleFileOptions;

    const CONTAINER: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

    /// Writes a stored (uncompressed) EPUB whose spine follows `chapters`.
    /// The manifest lists the chapters in reverse so spine order is what
    /// decides the reading order.
    fn write_epub(path: &Path, chapters: &[(&str, &str)]) {
        let manifest: String = chapters
            .iter()
            .rev()
            .map(|(id, _)| {
                format!(r#"<item id="{id}" href="{id}.xhtml" media-type="application/xhtml+xml"/>"#)
            })
            .collect();
        let spine: String = chapters
            .iter()
            .map(|(id, _)| format!(r#"<itemref idref="{id}"/>"#))
            .collect();
        let opf = format!(
            r#"<?xml version="1.0"?>
<package version="2.0" xmlns="http://www.idpf.org/2007/opf" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Fixture</dc:title>
    <dc:identifier id="uid">fixture-1</dc:identifier>
    <dc:language>en</dc:language>
  </metadata>
  <manifest>{manifest}</manifest>
  <spine>{spine}</spine>
</package>"#
        );

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let mut zip = zip::ZipWriter::new(File::create(path).expect("create epub"));
        zip.start_file("mimetype", options).expect("mimetype");
        zip.write_all(b"application/epub+zip").expect("write");
        zip.start_file("META-INF/container.xml", options).expect("container");
        zip.write_all(CONTAINER.as_bytes()).expect("write");
        zip.start_file("OEBPS/content.opf", options).expect("opf");
        zip.write_all(opf.as_bytes()).expect("write");
        for (id, body) in chapters {
            zip.start_file(format!("OEBPS/{id}.xhtml"), options)
                .expect("chapter");
            let page = format!(
                r#"<?xml version="1.0"?><html xmlns="http://www.w3.org/1999/xhtml"><head><title>{id}</title></head><body>{body}</body></html>"#
            );
            zip.write_all(page.as_bytes()).expect("write");
        }
        zip.finish().expect("finish");
    }

    #[test]
    fn chapters_follow_spine_order_with_blank_line_between() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("book.epub");
        write_epub(
            &path,
            &[("first", "<p>One</p>"), ("blank", ""), ("second", "<p>Two</p>")],
        );
        assert_eq!(EpubExtractor.extract(&path).expect("extract"), "One\n\nTwo");
    }

    #[test]
    fn book_without_text_is_empty_not_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pictures.epub");
        write_epub(&path, &[("cover", ""), ("plate", "  ")]);
        let outcome = ExtractorRegistry::default().extract(&path).expect("extract");
        assert_eq!(
            outcome,
            Extraction::Empty {
                source_name: "pictures.epub".to_string(),
                format: DocumentFormat::Epub,
            }
        );
    }

    #[test]
    fn non_epub_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fake.epub");
        fs::write(&path, b"plain bytes, no zip container").expect("write");
        assert!(matches!(
            EpubExtractor.extract(&path),
            Err(VaultError::Parse {
                format: DocumentFormat::Epub,
                ..
            })
        ));
    }
}
