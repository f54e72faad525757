//! File backing for one config file

use crate::assets::{DefaultAssets, LazyDefaults};
use crate::error::Result;
use crate::storage::JsonStorage;
use log::{debug, info};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Reads and writes the live JSON file of one config file and knows where
/// its bundled default document comes from
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
    default_resource: String,
    storage: JsonStorage,
    assets: Arc<DefaultAssets>,
}

impl FileBackend {
    pub fn new(
        path: PathBuf,
        default_resource: impl Into<String>,
        storage: JsonStorage,
        assets: Arc<DefaultAssets>,
    ) -> Self {
        Self {
            path,
            default_resource: default_resource.into(),
            storage,
            assets,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn default_resource(&self) -> &str {
        &self.default_resource
    }

    /// Read the live file; a file that does not exist yet is `Null`
    ///
    /// # Errors
    ///
    /// Returns `Error::FileRead` or `Error::Parse`.
    pub fn load(&self) -> Result<Value> {
        match self.storage.read(&self.path)? {
            Some(document) => {
                debug!("Loaded {}", self.path.display());
                Ok(document)
            }
            None => {
                info!("{} does not exist yet, starting from defaults", self.path.display());
                Ok(Value::Null)
            }
        }
    }

    /// Load the bundled default document
    ///
    /// # Errors
    ///
    /// Returns `Error::FileRead` or `Error::Parse` for a broken document.
    pub fn load_default(&self) -> Result<Arc<Value>> {
        self.assets.load(&self.default_resource)
    }

    /// Lazy view of the default document for key lookups
    pub fn lazy_defaults(&self) -> LazyDefaults<'_> {
        LazyDefaults::new(&self.assets, &self.default_resource)
    }

    /// Replace the live file with `document`
    ///
    /// # Errors
    ///
    /// Returns `Error::DirectoryCreate` or `Error::FileWrite`.
    pub fn flush(&self, document: &Value) -> Result<()> {
        self.storage.write(&self.path, document)?;
        debug!("Wrote {}", self.path.display());
        Ok(())
    }
}
