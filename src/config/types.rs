//! Store configuration types

use std::path::{Path, PathBuf};

use crate::storage::JsonStorage;

/// Configuration for initializing a [`ConfigStore`](crate::ConfigStore)
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding the live config files
    pub config_dir: PathBuf,

    /// Directory holding the bundled default documents (read-only)
    pub assets_dir: Option<PathBuf>,

    /// Application name (used to derive the default config directory)
    pub app_name: String,

    /// JSON storage used for every config file
    pub storage: JsonStorage,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("."),
            assets_dir: None,
            app_name: "app".into(),
            storage: JsonStorage::new(),
        }
    }
}

impl StoreConfig {
    /// Create a new builder for StoreConfig
    ///
    /// # Example
    /// ```rust
    /// use pocketconf::StoreConfig;
    ///
    /// let config = StoreConfig::builder("pocket-home")
    ///     .config_dir("/tmp/pocket-home")
    ///     .build();
    /// assert!(config.file_path("main.json").ends_with("main.json"));
    /// ```
    pub fn builder(app_name: impl Into<String>) -> StoreConfigBuilder {
        StoreConfigBuilder::new(app_name)
    }

    /// Full path of a live config file
    pub fn file_path(&self, file_name: &str) -> PathBuf {
        self.config_dir.join(file_name)
    }
}

/// Builder for creating StoreConfig with a fluent API
#[derive(Debug, Clone)]
pub struct StoreConfigBuilder {
    config_dir: Option<PathBuf>,
    assets_dir: Option<PathBuf>,
    app_name: String,
    pretty_json: bool,
}

impl StoreConfigBuilder {
    /// Create a new builder with the required app name
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            config_dir: None,
            assets_dir: None,
            app_name: app_name.into(),
            pretty_json: true,
        }
    }

    /// Set the configuration directory
    ///
    /// Supports `~` expansion for home directory.
    #[must_use]
    pub fn config_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(expand_home(path.into()));
        self
    }

    /// Set the directory holding bundled default documents
    ///
    /// Supports `~` expansion for home directory.
    #[must_use]
    pub fn assets_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.assets_dir = Some(expand_home(path.into()));
        self
    }

    /// Use compact JSON (no pretty printing)
    #[must_use]
    pub fn compact_json(mut self) -> Self {
        self.pretty_json = false;
        self
    }

    /// Build the StoreConfig
    ///
    /// If `config_dir` is not set, uses the system config directory for the app.
    pub fn build(self) -> StoreConfig {
        let config_dir = self.config_dir.unwrap_or_else(|| {
            dirs::config_dir()
                .map(|d| d.join(&self.app_name))
                .unwrap_or_else(|| PathBuf::from("."))
        });

        let storage = if self.pretty_json {
            JsonStorage::new()
        } else {
            JsonStorage::compact()
        };

        StoreConfig {
            config_dir,
            assets_dir: self.assets_dir,
            app_name: self.app_name,
            storage,
        }
    }
}

fn expand_home(path: PathBuf) -> PathBuf {
    if !path.starts_with("~") {
        return path;
    }
    match dirs::home_dir() {
        Some(home) => home.join(path.strip_prefix("~").unwrap_or(Path::new(""))),
        None => path,
    }
}
