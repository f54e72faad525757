//! JSON file storage

use crate::error::{Error, Result};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::Path;

/// JSON storage for config files
///
/// Reads tolerate a missing file; writes replace the whole file atomically.
#[derive(Debug, Clone)]
pub struct JsonStorage {
    /// Pretty print JSON output
    pretty: bool,
}

impl Default for JsonStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonStorage {
    /// Create a new JSON storage with pretty printing enabled
    pub fn new() -> Self {
        Self { pretty: true }
    }

    /// Create a compact JSON storage (no pretty printing)
    pub fn compact() -> Self {
        Self { pretty: false }
    }

    pub fn is_pretty(&self) -> bool {
        self.pretty
    }

    /// Serialize a document to text
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialize` if the document cannot be encoded.
    pub fn serialize(&self, document: &Value) -> Result<String> {
        if self.pretty {
            serde_json::to_string_pretty(document).map_err(Error::from)
        } else {
            serde_json::to_string(document).map_err(Error::from)
        }
    }

    /// Parse a document from text
    ///
    /// # Errors
    ///
    /// Returns `Error::Parse` naming `path` if the text is not valid JSON.
    pub fn deserialize(&self, path: &Path, content: &str) -> Result<Value> {
        serde_json::from_str(content).map_err(|e| Error::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Read and parse a file, `Ok(None)` if it does not exist
    ///
    /// # Errors
    ///
    /// Returns `Error::FileRead` for I/O failures other than a missing file and
    /// `Error::Parse` for malformed JSON.
    pub fn read(&self, path: &Path) -> Result<Option<Value>> {
        match std::fs::read_to_string(path) {
            Ok(content) => self.deserialize(path, &content).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::FileRead {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Serialize and write to file
    ///
    /// Uses atomic write: writes to temp file then renames to prevent corruption.
    ///
    /// # Errors
    ///
    /// Returns `Error::DirectoryCreate` or `Error::FileWrite` when the file
    /// cannot be created or replaced.
    pub fn write(&self, path: &Path, document: &Value) -> Result<()> {
        let content = self.serialize(document)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        // Append .tmp so the full file name is kept
        let file_name = path.file_name().ok_or_else(|| {
            Error::Config(format!(
                "Invalid path '{}': must have a filename",
                path.display()
            ))
        })?;
        let mut temp_filename = file_name.to_os_string();
        temp_filename.push(".tmp");
        let temp_path = path.with_file_name(temp_filename);

        std::fs::write(&temp_path, &content).map_err(|e| Error::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;

        std::fs::rename(&temp_path, path).map_err(|e| {
            let _ = std::fs::remove_file(&temp_path);
            Error::FileWrite {
                path: path.to_path_buf(),
                source: e,
            }
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
