use super::{DocumentFormat, TextExtractor};
use crate::error::{Result, VaultError};
use docx_rs::{DocumentChild, Paragraph, ParagraphChild, RunChild};
use std::fs;
use std::path::Path;
use tracing::debug;

/// OOXML (`.docx`) body paragraphs, one per line.
pub struct WordExtractor;

impl TextExtractor for WordExtractor {
    fn extract(&self, path: &Path) -> Result<String> {
        let bytes = fs::read(path)
            .map_err(|err| VaultError::io(format!("reading {}", path.display()), err))?;
        let docx = docx_rs::read_docx(&bytes)
            .map_err(|err| VaultError::parse(DocumentFormat::Word, err.to_string()))?;

        let paragraphs: Vec<String> = docx
            .document
            .children
            .iter()
            .filter_map(|child| match child {
                DocumentChild::Paragraph(paragraph) => Some(paragraph_text(paragraph)),
                _ => None,
            })
            .collect();
        debug!(
            path = %path.display(),
            paragraphs = paragraphs.len(),
            "Parsed Word document"
        );
        Ok(paragraphs.join("\n"))
    }
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut out = String::new();
    for child in &paragraph.children {
        match child {
            ParagraphChild::Run(run) => push_run_text(&run.children, &mut out),
            ParagraphChild::Hyperlink(link) => {
                for inner in &link.children {
                    if let ParagraphChild::Run(run) = inner {
                        push_run_text(&run.children, &mut out);
                    }
                }
            }
            _ => {}
        }
    }
    out
}

fn push_run_text(children: &[RunChild], out: &mut String) {
    for child in children {
        match child {
            RunChild::Text(text) => out.push_str(&text.text),
            RunChild::Tab(_) => out.push('\t'),
            _ => {}
        }
    }
}
