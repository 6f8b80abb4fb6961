//! Private content store.
//!
//! Maps relative paths (sequences of folder names) onto real files below a
//! single root directory. Every resolution goes through [`RelativePath`],
//! whose segments can never climb out of the root, and listings additionally
//! drop entries whose canonical location escapes it (symlinks).

use crate::error::{Result, VaultError};
use serde::Serialize;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Location below the content root; the empty path is the root itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
pub struct RelativePath {
    segments: Vec<String>,
}

impl RelativePath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a `/`-separated path; empty segments are skipped.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut path = Self::root();
        for segment in raw.split('/').filter(|s| !s.is_empty()) {
            path = path.join(segment)?;
        }
        Ok(path)
    }

    pub fn join(&self, name: &str) -> Result<Self> {
        validate_segment(name)?;
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Ok(Self { segments })
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self { segments })
    }

    pub fn leaf(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

/// A single name is valid when it is non-blank, not `.`/`..` and carries no
/// path separator.
pub fn validate_segment(name: &str) -> Result<()> {
    let reason = if name.trim().is_empty() {
        Some("name cannot be empty")
    } else if name.contains(['/', '\\']) {
        Some("name cannot contain a path separator")
    } else if name == "." || name == ".." {
        Some("name cannot refer to a parent or current directory")
    } else if name.contains('\0') {
        Some("name cannot contain NUL")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(VaultError::InvalidName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentNode {
    /// Full path of the node, leaf included.
    pub path: RelativePath,
    pub name: String,
    pub kind: NodeKind,
    pub size: u64,
    #[serde(skip)]
    pub modified: Option<SystemTime>,
}

impl ContentNode {
    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    /// Lowercase extension, empty when there is none.
    pub fn extension(&self) -> String {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default()
    }
}

/// Directories first, then case-insensitive by name.
pub fn sort_for_display(nodes: &mut [ContentNode]) {
    nodes.sort_by(|a, b| {
        b.is_dir()
            .cmp(&a.is_dir())
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
}

#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Open (creating if needed) the content root.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|err| VaultError::io(format!("creating {}", root.display()), err))?;
        let root = fs::canonicalize(&root)
            .map_err(|err| VaultError::io(format!("resolving {}", root.display()), err))?;
        info!(root = %root.display(), "Opened content store");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_root(&self) -> Result<()> {
        if !self.root.is_dir() {
            fs::create_dir_all(&self.root).map_err(|err| {
                VaultError::io(format!("recreating {}", self.root.display()), err)
            })?;
        }
        Ok(())
    }

    /// Real location of a relative path. The deepest existing ancestor is
    /// canonicalised and must stay under the root, so a symlinked parent
    /// cannot redirect a path that is about to be created.
    pub fn resolve(&self, path: &RelativePath) -> Result<PathBuf> {
        let mut resolved = self.root.clone();
        for segment in path.segments() {
            resolved.push(segment);
        }
        for ancestor in resolved.ancestors().take_while(|a| a.starts_with(&self.root)) {
            match fs::canonicalize(ancestor) {
                Ok(canonical) if canonical.starts_with(&self.root) => break,
                Ok(canonical) => {
                    warn!(path = %path, target = %canonical.display(), "Refusing path outside root");
                    return Err(VaultError::OutsideRoot(canonical));
                }
                // A dangling link would be followed on create.
                Err(_) if fs::symlink_metadata(ancestor).is_ok() => {
                    warn!(path = %path, link = %ancestor.display(), "Refusing dangling link");
                    return Err(VaultError::OutsideRoot(ancestor.to_path_buf()));
                }
                Err(_) => continue,
            }
        }
        Ok(resolved)
    }

    pub fn is_directory(&self, path: &RelativePath) -> bool {
        self.resolve(path).map(|p| p.is_dir()).unwrap_or(false)
    }

    /// Metadata for one node.
    pub fn node(&self, path: &RelativePath) -> Result<ContentNode> {
        let resolved = self.resolve(path)?;
        let meta = fs::metadata(&resolved)
            .map_err(|err| VaultError::io(format!("reading {path}"), err))?;
        Ok(node_from_metadata(path.clone(), &meta))
    }

    /// Immediate children of a directory. A missing or empty directory lists
    /// as empty.
    pub fn list_items(&self, path: &RelativePath) -> Result<Vec<ContentNode>> {
        self.ensure_root()?;
        let dir = self.resolve(path)?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) if err.kind() == io::ErrorKind::NotADirectory => return Ok(Vec::new()),
            Err(err) => return Err(VaultError::io(format!("listing {path}"), err)),
        };

        let mut nodes = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(path = %path, "Skipping unreadable entry: {err}");
                    continue;
                }
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            let child = match path.join(&name) {
                Ok(child) => child,
                Err(err) => {
                    warn!(name, "Skipping entry with unusable name: {err}");
                    continue;
                }
            };
            match fs::canonicalize(entry.path()) {
                Ok(canonical) if canonical.starts_with(&self.root) => {}
                Ok(canonical) => {
                    warn!(target = %canonical.display(), "Skipping entry that escapes the root");
                    continue;
                }
                Err(err) => {
                    warn!(name, "Skipping dangling entry: {err}");
                    continue;
                }
            }
            match fs::metadata(entry.path()) {
                Ok(meta) => nodes.push(node_from_metadata(child, &meta)),
                Err(err) => warn!(name, "Skipping entry without metadata: {err}"),
            }
        }
        debug!(path = %path, count = nodes.len(), "Listed directory");
        Ok(nodes)
    }

    /// Create `name` under `parent`, creating missing intermediates. Succeeds
    /// if the folder already exists.
    pub fn create_folder(&self, name: &str, parent: &RelativePath) -> Result<ContentNode> {
        let target = parent.join(name)?;
        self.ensure_root()?;
        let dir = self.resolve(&target)?;
        if dir.is_dir() {
            info!(path = %target, "Folder already exists");
            return self.node(&target);
        }
        fs::create_dir_all(&dir)
            .map_err(|err| VaultError::io(format!("creating folder {target}"), err))?;
        info!(path = %target, "Created folder");
        self.node(&target)
    }

    /// Copy `source` into a new file `name` inside `destination`.
    ///
    /// Not atomic: on failure the partially written file is removed on a
    /// best-effort basis.
    pub fn save_file<R: Read>(
        &self,
        source: &mut R,
        name: &str,
        destination: &RelativePath,
    ) -> Result<ContentNode> {
        let target = destination.join(name)?;
        self.ensure_root()?;
        let dir = self.resolve(destination)?;
        fs::create_dir_all(&dir)
            .map_err(|err| VaultError::io(format!("creating {destination}"), err))?;
        let file_path = self.resolve(&target)?;

        let written = File::create(&file_path).and_then(|mut file| {
            let copied = io::copy(source, &mut file)?;
            file.flush()?;
            Ok(copied)
        });
        match written {
            Ok(bytes) => {
                info!(path = %target, bytes, "File saved");
                self.node(&target)
            }
            Err(err) => {
                if let Err(cleanup) = fs::remove_file(&file_path) {
                    debug!(path = %target, "No partial file to remove: {cleanup}");
                }
                Err(VaultError::io(format!("saving {target}"), err))
            }
        }
    }

    /// Remove a node; directories are removed with all their contents.
    pub fn delete_item(&self, node: &ContentNode) -> Result<()> {
        if node.path.is_root() {
            return Err(VaultError::InvalidName {
                name: node.name.clone(),
                reason: "the content root cannot be deleted",
            });
        }
        let path = self.resolve(&node.path)?;
        let meta = fs::symlink_metadata(&path)
            .map_err(|err| VaultError::io(format!("reading {}", node.path), err))?;
        let removed = if meta.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.map_err(|err| VaultError::io(format!("deleting {}", node.path), err))?;
        info!(path = %node.path, "Deleted item");
        Ok(())
    }
}

fn node_from_metadata(path: RelativePath, meta: &fs::Metadata) -> ContentNode {
    let name = path.leaf().unwrap_or_default().to_string();
    ContentNode {
        name,
        path,
        kind: if meta.is_dir() {
            NodeKind::Directory
        } else {
            NodeKind::File
        },
        size: if meta.is_dir() { 0 } else { meta.len() },
        modified: meta.modified().ok(),
    }
}
