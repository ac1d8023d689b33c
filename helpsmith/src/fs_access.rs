//! File access abstraction
//!
//! Every component that touches project files goes through the [`FileAccess`]
//! trait, so the same code serves a directory on disk and a fully in-memory
//! project (tests, and hosts without filesystem access).

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;

use log::debug;
use thiserror::Error;
use walkdir::WalkDir;

/// Errors from project file operations
#[derive(Error, Debug)]
pub enum FileAccessError {
    /// The requested file does not exist
    #[error("file not found: {0}")]
    NotFound(String),

    /// A path tried to escape the project root
    #[error("path escapes the project root: {0}")]
    OutsideRoot(String),

    /// Underlying I/O failure
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Abstract file operations over a project tree.
///
/// Paths are relative to the implementation's root and use `/` separators.
pub trait FileAccess: Sync {
    /// Read a file as UTF-8 text
    fn read_text_file(&self, path: &str) -> Result<String, FileAccessError>;

    /// Write a file, creating parent directories as needed
    fn write_text_file(&self, path: &str, content: &str) -> Result<(), FileAccessError>;

    /// Whether a file exists
    fn file_exists(&self, path: &str) -> bool;

    /// List files directly inside `dir` with the given extension
    /// (lowercase, without the dot)
    fn list_files(&self, dir: &str, ext: &str) -> Result<Vec<String>, FileAccessError>;

    /// List files under `dir` recursively whose extension matches one of
    /// `exts` (lowercase, without the dot)
    fn list_files_recursive(
        &self,
        dir: &str,
        exts: &[&str],
    ) -> Result<Vec<String>, FileAccessError>;

    /// Delete a file; missing files are an error
    fn delete_file(&self, path: &str) -> Result<(), FileAccessError>;
}

/// Directory names never descended into
const SKIPPED_DIRS: [&str; 3] = ["node_modules", "target", ".git"];

/// [`FileAccess`] over a directory on disk.
///
/// All paths are resolved against the root; components that would climb out
/// of it (`..`) are rejected. Hidden files and well-known tool directories
/// are excluded from listings.
pub struct LocalFileAccess {
    root: PathBuf,
}

impl LocalFileAccess {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, FileAccessError> {
        let relative = Path::new(path);
        for component in relative.components() {
            if matches!(component, Component::ParentDir | Component::RootDir) {
                return Err(FileAccessError::OutsideRoot(path.to_string()));
            }
        }
        Ok(self.root.join(relative))
    }

    fn relative_name(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

impl FileAccess for LocalFileAccess {
    fn read_text_file(&self, path: &str) -> Result<String, FileAccessError> {
        let full = self.resolve(path)?;
        if !full.is_file() {
            return Err(FileAccessError::NotFound(path.to_string()));
        }
        std::fs::read_to_string(&full).map_err(|source| FileAccessError::Io {
            path: path.to_string(),
            source,
        })
    }

    fn write_text_file(&self, path: &str, content: &str) -> Result<(), FileAccessError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).map_err(|source| FileAccessError::Io {
                path: path.to_string(),
                source,
            })?;
        }
        debug!("writing {} ({} bytes)", path, content.len());
        std::fs::write(&full, content).map_err(|source| FileAccessError::Io {
            path: path.to_string(),
            source,
        })
    }

    fn file_exists(&self, path: &str) -> bool {
        self.resolve(path).map(|full| full.is_file()).unwrap_or(false)
    }

    fn list_files(&self, dir: &str, ext: &str) -> Result<Vec<String>, FileAccessError> {
        let full = self.resolve(dir)?;
        if !full.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let entries = std::fs::read_dir(&full).map_err(|source| FileAccessError::Io {
            path: dir.to_string(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| FileAccessError::Io {
                path: dir.to_string(),
                source,
            })?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            if !path.is_file() || is_hidden(&name) {
                continue;
            }
            if extension_of(&path).as_deref() == Some(ext) {
                files.push(self.relative_name(&path));
            }
        }
        files.sort();
        Ok(files)
    }

    fn list_files_recursive(
        &self,
        dir: &str,
        exts: &[&str],
    ) -> Result<Vec<String>, FileAccessError> {
        let full = self.resolve(dir)?;
        if !full.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(&full).into_iter().filter_entry(|entry| {
            // The walk root itself always passes, whatever its name
            if entry.depth() == 0 {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            if entry.file_type().is_dir() {
                return !SKIPPED_DIRS.contains(&name.as_ref()) && !is_hidden(&name);
            }
            !is_hidden(&name)
        });

        for entry in walker {
            let entry = entry.map_err(|err| FileAccessError::Io {
                path: dir.to_string(),
                source: err.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(ext) = extension_of(entry.path()) {
                if exts.contains(&ext.as_str()) {
                    files.push(self.relative_name(entry.path()));
                }
            }
        }
        files.sort();
        Ok(files)
    }

    fn delete_file(&self, path: &str) -> Result<(), FileAccessError> {
        let full = self.resolve(path)?;
        if !full.is_file() {
            return Err(FileAccessError::NotFound(path.to_string()));
        }
        std::fs::remove_file(&full).map_err(|source| FileAccessError::Io {
            path: path.to_string(),
            source,
        })
    }
}

/// In-memory [`FileAccess`] backed by a path map.
///
/// Used as the test double and for hosts that hold the whole project in
/// memory rather than on disk.
#[derive(Default)]
pub struct MemoryFileAccess {
    files: RwLock<BTreeMap<String, String>>,
}

impl MemoryFileAccess {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file without going through the trait
    pub fn insert(&self, path: impl Into<String>, content: impl Into<String>) {
        self.files
            .write()
            .expect("file map lock poisoned")
            .insert(normalize(&path.into()), content.into());
    }

    /// All stored paths in sorted order
    pub fn paths(&self) -> Vec<String> {
        self.files
            .read()
            .expect("file map lock poisoned")
            .keys()
            .cloned()
            .collect()
    }
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/")
        .trim_start_matches("./")
        .to_string()
}

impl FileAccess for MemoryFileAccess {
    fn read_text_file(&self, path: &str) -> Result<String, FileAccessError> {
        self.files
            .read()
            .expect("file map lock poisoned")
            .get(&normalize(path))
            .cloned()
            .ok_or_else(|| FileAccessError::NotFound(path.to_string()))
    }

    fn write_text_file(&self, path: &str, content: &str) -> Result<(), FileAccessError> {
        self.files
            .write()
            .expect("file map lock poisoned")
            .insert(normalize(path), content.to_string());
        Ok(())
    }

    fn file_exists(&self, path: &str) -> bool {
        self.files
            .read()
            .expect("file map lock poisoned")
            .contains_key(&normalize(path))
    }

    fn list_files(&self, dir: &str, ext: &str) -> Result<Vec<String>, FileAccessError> {
        let prefix = dir_prefix(dir);
        let suffix = format!(".{ext}");
        Ok(self
            .files
            .read()
            .expect("file map lock poisoned")
            .keys()
            .filter(|path| {
                path.starts_with(&prefix)
                    && !path[prefix.len()..].contains('/')
                    && path.to_ascii_lowercase().ends_with(&suffix)
            })
            .cloned()
            .collect())
    }

    fn list_files_recursive(
        &self,
        dir: &str,
        exts: &[&str],
    ) -> Result<Vec<String>, FileAccessError> {
        let prefix = dir_prefix(dir);
        Ok(self
            .files
            .read()
            .expect("file map lock poisoned")
            .keys()
            .filter(|path| {
                path.starts_with(&prefix)
                    && exts.iter().any(|ext| {
                        path.to_ascii_lowercase().ends_with(&format!(".{ext}"))
                    })
            })
            .cloned()
            .collect())
    }

    fn delete_file(&self, path: &str) -> Result<(), FileAccessError> {
        self.files
            .write()
            .expect("file map lock poisoned")
            .remove(&normalize(path))
            .map(|_| ())
            .ok_or_else(|| FileAccessError::NotFound(path.to_string()))
    }
}

/// Directory key prefix: "" and "." both mean the root
fn dir_prefix(dir: &str) -> String {
    let normalized = normalize(dir);
    if normalized.is_empty() || normalized == "." {
        String::new()
    } else {
        format!("{}/", normalized.trim_end_matches('/'))
    }
}
