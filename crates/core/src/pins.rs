//! Pinned application identifiers.
//!
//! Pins live in a plain text file, one identifier per line. A missing file is
//! an empty pin list.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while reading or writing the pin file.
#[derive(Debug, Error)]
pub enum PinStoreError {
    #[error("Failed to read pin file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Failed to write pin file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Ordered, duplicate-free list of pinned identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinStore {
    ids: Vec<String>,
}

impl PinStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from any sequence, collapsing duplicates in first-seen order.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut store = Self::new();
        for id in ids {
            store.push(id.as_ref());
        }
        store
    }

    /// Parse pin-file content.
    pub fn parse(content: &str) -> Self {
        Self::from_ids(content.lines())
    }

    /// Load pins from disk. A missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self, PinStoreError> {
        match fs::read_to_string(path) {
            Ok(content) => {
                let store = Self::parse(&content);
                debug!("Loaded {} pins from {}", store.len(), path.display());
                Ok(store)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No pin file at {}, starting with no pins", path.display());
                Ok(Self::new())
            }
            Err(source) => Err(PinStoreError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Write pins to disk, creating the parent directory when needed.
    pub fn save(&self, path: &Path) -> Result<(), PinStoreError> {
        let write_err = |source| PinStoreError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }
        let mut content = self.ids.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        fs::write(path, content).map_err(write_err)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|p| p == id)
    }

    /// Append a pin. Returns false if it was already pinned or blank.
    pub fn pin(&mut self, id: &str) -> bool {
        self.push(id)
    }

    /// Remove a pin. Returns false if it was not pinned.
    pub fn unpin(&mut self, id: &str) -> bool {
        let before = self.ids.len();
        self.ids.retain(|p| p != id.trim());
        self.ids.len() != before
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn push(&mut self, id: &str) -> bool {
        let id = id.trim();
        if id.is_empty() || self.contains(id) {
            return false;
        }
        self.ids.push(id.to_string());
        true
    }
}
