//! Moving files in and out of the vault: name sanitising on import, MIME
//! resolution and handing a stored file to an external viewer.

use crate::error::{Result, VaultError};
use crate::store::{ContentNode, ContentStore};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};
use unicode_normalization::UnicodeNormalization;

static RE_ILLEGAL_FILENAME: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[/\\:*?"<>|]"#).unwrap());

pub fn has_illegal_characters(name: &str) -> bool {
    RE_ILLEGAL_FILENAME.is_match(name)
}

/// Normalise an externally supplied display name into something safe to
/// store. Returns `None` when nothing usable is left.
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let normalized: String = raw.nfc().collect();
    let cleaned = RE_ILLEGAL_FILENAME
        .replace_all(normalized.trim(), "_")
        .into_owned();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        return None;
    }
    Some(cleaned)
}

/// Display name of an import source, sanitised.
pub fn display_name_of(source: &Path) -> Option<String> {
    source
        .file_name()
        .map(|name| name.to_string_lossy())
        .and_then(|name| sanitize_file_name(&name))
}

/// MIME type for a file: fixed table first, then the system-agnostic guess,
/// then a wildcard.
pub fn mime_type_for(path: &Path) -> String {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    let explicit = match extension.as_str() {
        "pdf" => Some("application/pdf"),
        "txt" => Some("text/plain"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "mp3" => Some("audio/mpeg"),
        "wav" => Some("audio/x-wav"),
        "m4a" => Some("audio/mp4"),
        "aac" => Some("audio/aac"),
        "ogg" => Some("audio/ogg"),
        "mp4" => Some("video/mp4"),
        "doc" => Some("application/msword"),
        "docx" => Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        "xls" => Some("application/vnd.ms-excel"),
        "xlsx" => Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        "ppt" => Some("application/vnd.ms-powerpoint"),
        "pptx" => {
            Some("application/vnd.openxmlformats-officedocument.presentationml.presentation")
        }
        "zip" => Some("application/zip"),
        "rar" => Some("application/x-rar-compressed"),
        "epub" => Some("application/epub+zip"),
        _ => None,
    };
    if let Some(mime) = explicit {
        return mime.to_string();
    }
    if extension.is_empty() {
        return "*/*".to_string();
    }
    mime_guess::from_ext(&extension)
        .first_raw()
        .unwrap_or("*/*")
        .to_string()
}

/// A stored file prepared for another program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedFile {
    pub uri: String,
    pub mime_type: String,
    pub path: PathBuf,
}

pub fn share(store: &ContentStore, node: &ContentNode) -> Result<SharedFile> {
    if node.is_dir() {
        return Err(VaultError::Unsupported(format!("{} is a folder", node.name)));
    }
    let path = store.resolve(&node.path)?;
    Ok(SharedFile {
        uri: file_uri(&path),
        mime_type: mime_type_for(&path),
        path,
    })
}

/// Hand the file to the configured opener (`xdg-open`, `open`, ...).
pub fn launch_viewer(shared: &SharedFile, opener: &str) -> Result<()> {
    info!(
        path = %shared.path.display(),
        mime = %shared.mime_type,
        opener,
        "Opening file externally"
    );
    let status = Command::new(opener)
        .arg(&shared.path)
        .status()
        .map_err(|err| VaultError::io(format!("starting {opener}"), err))?;
    if !status.success() {
        warn!(opener, %status, "External opener reported failure");
        return Err(VaultError::Unsupported(format!(
            "no application could open {}",
            shared.mime_type
        )));
    }
    Ok(())
}

fn file_uri(path: &Path) -> String {
    let mut uri = String::from("file://");
    for byte in path.to_string_lossy().bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'/' | b'-' | b'_' | b'.' | b'~' => {
                uri.push(byte as char)
            }
            other => uri.push_str(&format!("%{other:02X}")),
        }
    }
    uri
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RelativePath;

    #[test]
    fn illegal_characters_become_underscores() {
        assert_eq!(
            sanitize_file_name("re:port*<v2>?.pdf").as_deref(),
            Some("re_port__v2__.pdf")
        );
        assert_eq!(sanitize_file_name("  ").as_deref(), None);
        assert_eq!(sanitize_file_name("a/b\\c").as_deref(), Some("a_b_c"));
        assert!(has_illegal_characters("what?"));
        assert!(!has_illegal_characters("plain name"));
    }

    #[test]
    fn detection_agrees_with_sanitising() {
        for c in ['/', '\\', ':', '*', '?', '"', '<', '>', '|'] {
            let name = format!("a{c}b");
            assert!(has_illegal_characters(&name), "{name}");
            let cleaned = sanitize_file_name(&name).expect("sanitized");
            assert!(!has_illegal_characters(&cleaned), "{cleaned}");
        }
    }

    #[test]
    fn decomposed_names_are_composed() {
        let decomposed = "Cafe\u{301}.txt";
        assert_eq!(sanitize_file_name(decomposed).as_deref(), Some("Café.txt"));
    }

    #[test]
    fn mime_table_then_guess_then_wildcard() {
        assert_eq!(mime_type_for(Path::new("a.PDF")), "application/pdf");
        assert_eq!(mime_type_for(Path::new("a.wav")), "audio/x-wav");
        assert_eq!(mime_type_for(Path::new("a.html")), "text/html");
        assert_eq!(mime_type_for(Path::new("noext")), "*/*");
        assert_eq!(mime_type_for(Path::new("a.zzzunknown")), "*/*");
    }

    #[test]
    fn shared_file_uri_is_escaped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ContentStore::open(dir.path()).expect("store");
        let mut source: &[u8] = b"%PDF";
        let node = store
            .save_file(&mut source, "my file.pdf", &RelativePath::root())
            .expect("save");
        let shared = share(&store, &node).expect("share");
        assert!(shared.uri.starts_with("file://"));
        assert!(shared.uri.ends_with("my%20file.pdf"));
        assert_eq!(shared.mime_type, "application/pdf");
    }
}
