//! Small persistent key-value store backed by a TOML file.
//!
//! Edits are applied to a copy of the table and written through a temporary
//! file that is renamed into place, so a reader never observes half of an
//! edit.

use crate::error::{Result, VaultError};
use std::fs;
use std::path::{Path, PathBuf};
use toml::{Table, Value};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: Option<PathBuf>,
    values: Table,
}

/// Staged changes handed to [`PreferenceStore::edit`].
pub struct PreferenceEditor<'a> {
    values: &'a mut Table,
}

impl PreferenceEditor<'_> {
    pub fn put_bool(&mut self, key: &str, value: bool) -> &mut Self {
        self.values.insert(key.to_string(), Value::Boolean(value));
        self
    }

    pub fn put_string(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.to_string(), Value::String(value.into()));
        self
    }

    pub fn remove(&mut self, key: &str) -> &mut Self {
        self.values.remove(key);
        self
    }
}

impl PreferenceStore {
    /// Load from `path`; a missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(contents) => toml::from_str::<Table>(&contents).map_err(|err| {
                VaultError::Preferences(format!("{} is not valid TOML: {err}", path.display()))
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No preferences yet");
                Table::new()
            }
            Err(err) => {
                return Err(VaultError::io(
                    format!("reading preferences {}", path.display()),
                    err,
                ));
            }
        };
        Ok(Self {
            path: Some(path),
            values,
        })
    }

    /// Store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: Table::new(),
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(Value::as_bool)
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Apply a batch of changes; either all of them persist or none do.
    pub fn edit<F>(&mut self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut PreferenceEditor<'_>),
    {
        let mut staged = self.values.clone();
        apply(&mut PreferenceEditor {
            values: &mut staged,
        });
        if let Some(path) = &self.path {
            write_atomically(path, &staged)?;
        }
        self.values = staged;
        Ok(())
    }
}

fn write_atomically(path: &Path, values: &Table) -> Result<()> {
    let contents = toml::to_string(values)
        .map_err(|err| VaultError::Preferences(format!("serializing preferences: {err}")))?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| VaultError::io(format!("creating {}", parent.display()), err))?;
    }
    let temp = path.with_extension("toml.tmp");
    fs::write(&temp, contents)
        .map_err(|err| VaultError::io(format!("writing {}", temp.display()), err))?;
    if let Err(err) = fs::rename(&temp, path) {
        warn!(path = %path.display(), "Could not move preferences into place: {err}");
        let _ = fs::remove_file(&temp);
        return Err(VaultError::io(format!("replacing {}", path.display()), err));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_persist_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("prefs.toml");
        let mut prefs = PreferenceStore::open(&path).expect("open");
        assert_eq!(prefs.get_bool("flag"), None);

        prefs
            .edit(|e| {
                e.put_bool("flag", true).put_string("name", "value");
            })
            .expect("edit");

        let reopened = PreferenceStore::open(&path).expect("reopen");
        assert_eq!(reopened.get_bool("flag"), Some(true));
        assert_eq!(reopened.get_string("name"), Some("value"));
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[test]
    fn failed_write_keeps_previous_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        // A directory where the file should be makes the rename fail.
        let path = dir.path().join("prefs.toml");
        fs::create_dir_all(path.join("blocker")).expect("blocker");
        let mut prefs = PreferenceStore {
            path: Some(path),
            values: Table::new(),
        };
        assert!(prefs.edit(|e| {
            e.put_bool("flag", true);
        })
        .is_err());
        assert_eq!(prefs.get_bool("flag"), None);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("prefs.toml");
        fs::write(&path, "password_set = ").expect("write");
        assert!(matches!(
            PreferenceStore::open(&path),
            Err(VaultError::Preferences(_))
        ));
    }
}
