//! Common test utilities for pocketconf integration tests
//!
//! Provides shared test fixtures, schemas, and helper functions.

#![allow(dead_code)]

use parking_lot::Mutex;
use pocketconf::{ConfigSchema, ConfigStore, ConfigStoreBuilder, DataKey};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

// =============================================================================
// Test Schemas
// =============================================================================

/// `main.json`: inline defaults only
pub struct MainConfig;

impl ConfigSchema for MainConfig {
    const FILE_NAME: &'static str = "main.json";

    fn data_keys() -> Vec<DataKey> {
        vec![
            DataKey::int("maxRows").default_value(3),
            DataKey::string("theme").default_value("dark"),
        ]
    }
}

/// `home.json`: defaults come from the bundled document
pub struct HomeConfig;

impl ConfigSchema for HomeConfig {
    const FILE_NAME: &'static str = "home.json";

    fn data_keys() -> Vec<DataKey> {
        vec![
            DataKey::bool("showClock"),
            DataKey::string("clockFormat"),
            DataKey::double("iconScale"),
        ]
    }
}

pub const HOME_DEFAULTS: &str = r#"{"showClock": true, "clockFormat": "24h", "iconScale": 1.5}"#;

// =============================================================================
// Test Fixtures
// =============================================================================

/// Test fixture that provides a temporary directory and a configured ConfigStore
pub struct TestFixture {
    pub temp_dir: TempDir,
    pub store: ConfigStore,
}

impl TestFixture {
    /// Create a new test fixture with both test schemas registered
    pub fn new() -> Self {
        Self::with(|builder| builder)
    }

    /// Create a fixture, letting the caller adjust the builder
    pub fn with(configure: impl FnOnce(ConfigStoreBuilder) -> ConfigStoreBuilder) -> Self {
        init_logging();
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let builder = ConfigStore::builder("test-app")
            .config_dir(temp_dir.path())
            .default_document("home.json", HOME_DEFAULTS)
            .with_schema::<MainConfig>()
            .with_schema::<HomeConfig>();
        let store = configure(builder).build().expect("Failed to build store");

        Self { temp_dir, store }
    }

    /// Get the path of a config file
    pub fn path(&self, file: &str) -> PathBuf {
        self.temp_dir.path().join(file)
    }

    /// Write raw content to a config file before it is opened
    pub fn write_file(&self, file: &str, content: &str) {
        std::fs::write(self.path(file), content).expect("Failed to write config file");
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Parsed content of a config file, `None` if it does not exist
pub fn read_file(fixture: &TestFixture, file: &str) -> Option<serde_json::Value> {
    let content = std::fs::read_to_string(fixture.path(file)).ok()?;
    serde_json::from_str(&content).ok()
}

/// Keys received by a recording listener
pub type Received = Arc<Mutex<Vec<String>>>;

/// A listener that records every key it is told about
pub fn recorder() -> (Received, impl Fn(&str) + Send + Sync + 'static) {
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    let listener = move |key: &str| sink.lock().push(key.to_string());
    (received, listener)
}
