//! Builder for ConfigStore
//!
//! This module contains [`ConfigStoreBuilder`] which provides a fluent API
//! for creating a [`ConfigStore`](super::ConfigStore).

use crate::assets::DefaultAssets;
use crate::config::{ConfigSchema, FileSchema, StoreConfigBuilder};
use crate::dispatch::Delivery;
use crate::error::{Error, Result};
use crate::notice::{LogNotice, NoticeSink};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use super::ConfigStore;

/// Builder for creating a [`ConfigStore`] with a fluent API.
///
/// # Example
///
/// ```rust,no_run
/// use pocketconf::{ConfigStore, DataKey, FileSchema};
///
/// let store = ConfigStore::builder("pocket-home")
///     .config_dir("~/.pocket-home")
///     .assets_dir("/usr/share/pocket-home/configuration")
///     .with_file(
///         FileSchema::builder("main.json")
///             .key(DataKey::int("maxRows"))
///             .key(DataKey::string("theme"))
///             .build()
///             .unwrap(),
///     )
///     .build()
///     .unwrap();
/// ```
pub struct ConfigStoreBuilder {
    config_builder: StoreConfigBuilder,
    schemas: Vec<Result<FileSchema>>,
    documents: Vec<(String, String)>,
    delivery: Delivery,
    notice: Arc<dyn NoticeSink>,
}

impl ConfigStoreBuilder {
    /// Create a new builder with the required app name.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            config_builder: StoreConfigBuilder::new(app_name),
            schemas: Vec::new(),
            documents: Vec::new(),
            delivery: Delivery::Immediate,
            notice: Arc::new(LogNotice),
        }
    }

    /// Set the directory holding the live config files.
    ///
    /// Supports `~` expansion for home directory.
    #[must_use]
    pub fn config_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_builder = self.config_builder.config_dir(path);
        self
    }

    /// Set the directory holding the bundled default documents.
    ///
    /// Supports `~` expansion for home directory.
    #[must_use]
    pub fn assets_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_builder = self.config_builder.assets_dir(path);
        self
    }

    /// Register an in-memory default document, e.g. from `include_str!`.
    ///
    /// In-memory documents take precedence over the assets directory.
    #[must_use]
    pub fn default_document(mut self, name: impl Into<String>, json: impl Into<String>) -> Self {
        self.documents.push((name.into(), json.into()));
        self
    }

    /// Use compact JSON (no pretty printing).
    #[must_use]
    pub fn compact_json(mut self) -> Self {
        self.config_builder = self.config_builder.compact_json();
        self
    }

    /// Register the file described by a [`ConfigSchema`] type.
    #[must_use]
    pub fn with_schema<S: ConfigSchema>(mut self) -> Self {
        self.schemas.push(FileSchema::of::<S>());
        self
    }

    /// Register a config file.
    #[must_use]
    pub fn with_file(mut self, schema: FileSchema) -> Self {
        self.schemas.push(Ok(schema));
        self
    }

    /// Choose how listener callbacks are run (default: immediately).
    #[must_use]
    pub fn delivery(mut self, delivery: Delivery) -> Self {
        self.delivery = delivery;
        self
    }

    /// Receive failures that happen when a handle is dropped (default: log).
    #[must_use]
    pub fn notice_sink(mut self, sink: impl NoticeSink + 'static) -> Self {
        self.notice = Arc::new(sink);
        self
    }

    /// Build the [`ConfigStore`].
    ///
    /// # Errors
    ///
    /// Returns the first invalid schema's error, or `Error::DuplicateFile` if
    /// two schemas name the same file.
    pub fn build(self) -> Result<ConfigStore> {
        let config = self.config_builder.build();

        let mut schemas = HashMap::with_capacity(self.schemas.len());
        for schema in self.schemas {
            let schema = schema?;
            let name = schema.file_name().to_string();
            if schemas.insert(name.clone(), Arc::new(schema)).is_some() {
                return Err(Error::DuplicateFile(name));
            }
        }

        let mut assets = DefaultAssets::new(config.assets_dir.clone());
        for (name, json) in self.documents {
            assets.insert_document(name, json);
        }

        Ok(ConfigStore::new(
            config,
            schemas,
            assets,
            self.delivery,
            self.notice,
        ))
    }
}
