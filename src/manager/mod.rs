//! Config store module
//!
//! This module contains [`ConfigStore`], the entry point that owns every
//! registered file schema and the table of open files.

mod builder;

pub use builder::ConfigStoreBuilder;

use crate::assets::DefaultAssets;
use crate::backend::FileBackend;
use crate::config::{ConfigSchema, FileSchema, StoreConfig};
use crate::dispatch::Delivery;
use crate::error::{Error, Result};
use crate::handle::Handle;
use crate::notice::NoticeSink;
use crate::registry::ResourceRegistry;
use crate::resource::ConfigResource;
use log::info;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Entry point for opening config files.
///
/// A `ConfigStore` knows the schema of every config file the application
/// uses and keeps one shared in-memory copy of each file that has an open
/// [`Handle`]. Cloning the store is cheap; clones share the same open files.
///
/// # Example
///
/// ```rust
/// use pocketconf::{ConfigSchema, ConfigStore, DataKey};
///
/// struct MainConfig;
///
/// impl ConfigSchema for MainConfig {
///     const FILE_NAME: &'static str = "main.json";
///
///     fn data_keys() -> Vec<DataKey> {
///         vec![
///             DataKey::int("maxRows").default_value(3),
///             DataKey::string("theme").default_value("dark"),
///         ]
///     }
/// }
///
/// # let dir = tempfile::tempdir().unwrap();
/// let store = ConfigStore::builder("pocket-home")
///     .config_dir(dir.path())
///     .with_schema::<MainConfig>()
///     .build()
///     .unwrap();
///
/// let main = store.open::<MainConfig>().unwrap();
/// assert_eq!(main.value::<String>("theme"), "dark");
/// assert_eq!(store.handle_count("main.json"), 1);
/// ```
#[derive(Clone)]
pub struct ConfigStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    config: StoreConfig,
    schemas: HashMap<String, Arc<FileSchema>>,
    assets: Arc<DefaultAssets>,
    registry: Arc<ResourceRegistry<ConfigResource>>,
    delivery: Delivery,
}

impl ConfigStore {
    /// Create a builder for a `ConfigStore`.
    pub fn builder(app_name: impl Into<String>) -> ConfigStoreBuilder {
        ConfigStoreBuilder::new(app_name)
    }

    fn new(
        config: StoreConfig,
        schemas: HashMap<String, Arc<FileSchema>>,
        assets: DefaultAssets,
        delivery: Delivery,
        notice: Arc<dyn NoticeSink>,
    ) -> Self {
        info!(
            "Config store for {} at {} ({} files)",
            config.app_name,
            config.config_dir.display(),
            schemas.len()
        );
        Self {
            inner: Arc::new(StoreInner {
                config,
                schemas,
                assets: Arc::new(assets),
                registry: Arc::new(ResourceRegistry::new(notice)),
                delivery,
            }),
        }
    }

    /// Store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Open a handle on a registered config file.
    ///
    /// The first handle on a file loads it; later handles share the loaded
    /// copy until all of them are closed.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownFile` if no schema was registered for `file`.
    pub fn open_handle(&self, file: &str) -> Result<Handle> {
        let schema = self.schema(file)?;
        let inner = &self.inner;
        let (resource, token) = inner.registry.acquire(file, || {
            let backend = FileBackend::new(
                inner.config.file_path(file),
                schema.default_resource(),
                inner.config.storage.clone(),
                Arc::clone(&inner.assets),
            );
            Ok(ConfigResource::open(
                Arc::clone(&schema),
                backend,
                inner.delivery.clone(),
            ))
        })?;
        Ok(Handle::new(resource, token))
    }

    /// Open a handle on the file described by `S`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownFile` if `S` was not registered.
    pub fn open<S: ConfigSchema>(&self) -> Result<Handle> {
        self.open_handle(S::FILE_NAME)
    }

    /// Schema registered for `file`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownFile` if no schema was registered for `file`.
    pub fn schema(&self, file: &str) -> Result<Arc<FileSchema>> {
        self.inner
            .schemas
            .get(file)
            .cloned()
            .ok_or_else(|| Error::UnknownFile(file.to_string()))
    }

    /// Path of the live file for `file`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownFile` if no schema was registered for `file`.
    pub fn file_path(&self, file: &str) -> Result<PathBuf> {
        self.schema(file)?;
        Ok(self.inner.config.file_path(file))
    }

    /// Registered file names, sorted.
    pub fn files(&self) -> Vec<String> {
        let mut files: Vec<String> = self.inner.schemas.keys().cloned().collect();
        files.sort();
        files
    }

    /// Files that currently have at least one open handle, sorted.
    pub fn open_files(&self) -> Vec<String> {
        self.inner.registry.open_files()
    }

    /// Number of open handles on `file`.
    pub fn handle_count(&self, file: &str) -> usize {
        self.inner.registry.ref_count(file)
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("config", &self.inner.config)
            .field("files", &self.files())
            .field("open", &self.open_files())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataKey;
    use tempfile::TempDir;

    fn main_schema() -> FileSchema {
        FileSchema::builder("main.json")
            .key(DataKey::int("maxRows").default_value(3))
            .build()
            .unwrap()
    }

    fn store(dir: &TempDir) -> ConfigStore {
        ConfigStore::builder("test-app")
            .config_dir(dir.path())
            .with_file(main_schema())
            .build()
            .unwrap()
    }

    #[test]
    fn test_duplicate_file_rejected() {
        let result = ConfigStore::builder("test-app")
            .with_file(main_schema())
            .with_file(main_schema())
            .build();
        assert!(matches!(result, Err(Error::DuplicateFile(name)) if name == "main.json"));
    }

    #[test]
    fn test_invalid_schema_rejected() {
        let result = ConfigStore::builder("test-app")
            .with_file(main_schema())
            .with_schema::<Broken>()
            .build();
        assert!(matches!(result, Err(Error::DuplicateKey { .. })));

        struct Broken;
        impl ConfigSchema for Broken {
            const FILE_NAME: &'static str = "broken.json";
            fn data_keys() -> Vec<DataKey> {
                vec![DataKey::int("a"), DataKey::bool("a")]
            }
        }
    }

    #[test]
    fn test_unknown_file() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert!(matches!(
            store.open_handle("other.json"),
            Err(Error::UnknownFile(_))
        ));
        assert!(store.file_path("other.json").is_err());
    }

    #[test]
    fn test_handles_share_one_resource() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let a = store.open_handle("main.json").unwrap();
        let b = store.clone().open_handle("main.json").unwrap();
        assert_eq!(store.handle_count("main.json"), 2);
        assert_eq!(store.open_files(), vec!["main.json"]);

        a.set_value("maxRows", 8).unwrap();
        assert_eq!(b.get_value::<i64>("maxRows").unwrap(), 8);

        drop(a);
        drop(b);
        assert_eq!(store.handle_count("main.json"), 0);
        assert!(store.open_files().is_empty());
    }

    #[test]
    fn test_file_path() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert_eq!(
            store.file_path("main.json").unwrap(),
            dir.path().join("main.json")
        );
        assert_eq!(store.files(), vec!["main.json"]);
    }
}
