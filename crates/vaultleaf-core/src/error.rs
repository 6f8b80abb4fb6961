use crate::extract::DocumentFormat;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = VaultError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },
    #[error("path escapes the content root: {}", .0.display())]
    OutsideRoot(PathBuf),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error("{format} document could not be read: {message}")]
    Parse {
        format: DocumentFormat,
        message: String,
    },
    #[error("unsupported file type: {0}")]
    Unsupported(String),
    #[error("password rejected: {0}")]
    PasswordRejected(&'static str),
    #[error("preferences: {0}")]
    Preferences(String),
    #[error("nothing to speak")]
    NothingToSpeak,
    #[error("text-to-speech engine is not ready")]
    EngineNotReady,
    #[error("text-to-speech failed: {0}")]
    Engine(String),
    #[error("text recognition failed: {0}")]
    Recognition(String),
    #[error("audio playback failed: {0}")]
    Playback(String),
    #[error("operation cancelled")]
    Cancelled,
}

/// Coarse grouping used when a failure is turned into a user notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    Io,
    Format,
    Engine,
    Cancelled,
}

impl VaultError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        VaultError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn parse(format: DocumentFormat, message: impl Into<String>) -> Self {
        VaultError::Parse {
            format,
            message: message.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            VaultError::InvalidName { .. }
            | VaultError::PasswordRejected(_)
            | VaultError::NothingToSpeak => ErrorClass::Validation,
            VaultError::OutsideRoot(_) | VaultError::Io { .. } | VaultError::Preferences(_) => {
                ErrorClass::Io
            }
            VaultError::Parse { .. } | VaultError::Unsupported(_) => ErrorClass::Format,
            VaultError::EngineNotReady
            | VaultError::Engine(_)
            | VaultError::Recognition(_)
            | VaultError::Playback(_) => ErrorClass::Engine,
            VaultError::Cancelled => ErrorClass::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_group_failures_for_notices() {
        let invalid = VaultError::InvalidName {
            name: "..".to_string(),
            reason: "reserved name",
        };
        assert_eq!(invalid.class(), ErrorClass::Validation);
        assert_eq!(
            VaultError::io("listing", io::Error::other("denied")).class(),
            ErrorClass::Io
        );
        assert_eq!(
            VaultError::parse(DocumentFormat::Pdf, "bad xref").class(),
            ErrorClass::Format
        );
        assert_eq!(VaultError::EngineNotReady.class(), ErrorClass::Engine);
        assert_eq!(VaultError::Cancelled.class(), ErrorClass::Cancelled);
    }

    #[test]
    fn parse_errors_name_the_format() {
        let err = VaultError::parse(DocumentFormat::Epub, "missing container.xml");
        assert_eq!(
            err.to_string(),
            "EPUB document could not be read: missing container.xml"
        );
    }
}
