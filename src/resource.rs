//! Shared per-file state behind every handle on one config file

use crate::backend::FileBackend;
use crate::config::{ConfigType, ConfigValue, FileSchema};
use crate::dispatch::Delivery;
use crate::error::Result;
use crate::events::ListenerRegistry;
use crate::registry::SharedResource;
use crate::store::{LoadReport, ValueStore};
use log::{debug, warn};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Values, file backing and listeners of one open config file
///
/// Exactly one exists per file while any handle on it is open.
pub struct ConfigResource {
    schema: Arc<FileSchema>,
    backend: FileBackend,
    store: RwLock<ValueStore>,
    listeners: ListenerRegistry,
    /// Serializes writers so an older document never replaces a newer one
    flush_lock: Mutex<()>,
    load_report: LoadReport,
}

impl ConfigResource {
    /// Load the file, falling back to defaults for anything unusable
    ///
    /// An unreadable or malformed file is logged and treated as empty; the
    /// corrected document is written on the next flush.
    pub fn open(schema: Arc<FileSchema>, backend: FileBackend, delivery: Delivery) -> Self {
        let document = backend.load().unwrap_or_else(|e| {
            warn!("{e}; starting {} from defaults", schema.file_name());
            Value::Null
        });

        let mut store = ValueStore::new(Arc::clone(&schema));
        let load_report = store.init_from_json(&document, &mut backend.lazy_defaults());
        if !load_report.is_clean() {
            debug!(
                "{}: {} keys defaulted, {} schema errors",
                schema.file_name(),
                load_report.defaulted.len(),
                load_report.schema_errors.len()
            );
        }

        Self {
            listeners: ListenerRegistry::new(schema.file_name(), delivery),
            schema,
            backend,
            store: RwLock::new(store),
            flush_lock: Mutex::new(()),
            load_report,
        }
    }

    pub fn schema(&self) -> &Arc<FileSchema> {
        &self.schema
    }

    pub fn path(&self) -> &Path {
        self.backend.path()
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    /// What the initial load had to repair
    pub fn load_report(&self) -> &LoadReport {
        &self.load_report
    }

    pub fn get<T: ConfigType>(&self, key: &str) -> Result<T> {
        self.store.read().get(key)
    }

    /// Commit a value, then notify listeners of `key` if it changed
    ///
    /// # Errors
    ///
    /// See [`ValueStore::set`].
    pub fn set(&self, key: &str, value: ConfigValue) -> Result<bool> {
        let changed = self.store.write().set(key, value)?;
        if changed {
            self.listeners.notify(key);
        }
        Ok(changed)
    }

    /// Default value of `key`
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownKey` for undeclared keys and `Error::Schema` if
    /// the bundled default is missing or mistyped.
    pub fn default_value(&self, key: &str) -> Result<ConfigValue> {
        let data_key = self.schema.require(key)?;
        ValueStore::resolve_default(data_key, &mut self.backend.lazy_defaults())
    }

    pub fn is_dirty(&self) -> bool {
        self.store.read().is_dirty()
    }

    /// Current values as a JSON object
    pub fn snapshot(&self) -> Value {
        self.store.read().serialize_to_json()
    }

    /// Write pending changes to disk
    ///
    /// Returns `Ok(false)` without touching disk when nothing changed. The
    /// store lock is released before the file is written; a value set during
    /// the write keeps the store dirty.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileWrite` or `Error::DirectoryCreate`; the store stays
    /// dirty so a later flush can retry.
    pub fn flush(&self) -> Result<bool> {
        let _writer = self.flush_lock.lock();

        let (document, generation) = {
            let store = self.store.read();
            if !store.is_dirty() {
                return Ok(false);
            }
            (store.serialize_to_json(), store.generation())
        };

        self.backend.flush(&document)?;

        if !self.store.write().mark_clean_at(generation) {
            debug!("{}: changed during flush, still dirty", self.schema.file_name());
        }
        Ok(true)
    }
}

impl SharedResource for ConfigResource {
    fn on_last_release(&self) -> Result<()> {
        self.flush().map(|_| ())
    }
}

impl std::fmt::Debug for ConfigResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigResource")
            .field("file", &self.schema.file_name())
            .field("path", &self.backend.path())
            .field("dirty", &self.is_dirty())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::DefaultAssets;
    use crate::config::DataKey;
    use crate::error::Error;
    use crate::storage::JsonStorage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    fn open_in(dir: &Path) -> ConfigResource {
        let schema = FileSchema::builder("main.json")
            .key(DataKey::int("maxRows").default_value(3))
            .key(DataKey::string("theme").default_value("dark"))
            .build()
            .unwrap();
        let backend = FileBackend::new(
            dir.join("main.json"),
            "main.json",
            JsonStorage::compact(),
            Arc::new(DefaultAssets::new(None)),
        );
        ConfigResource::open(Arc::new(schema), backend, Delivery::Immediate)
    }

    #[test]
    fn test_new_file_is_dirty_until_flushed() {
        let dir = tempdir().unwrap();
        let resource = open_in(dir.path());

        assert!(resource.is_dirty());
        assert!(resource.flush().unwrap());
        assert!(!resource.is_dirty());
        assert!(!resource.flush().unwrap());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("main.json")).unwrap(),
            r#"{"maxRows":3,"theme":"dark"}"#
        );
    }

    #[test]
    fn test_set_notifies_only_on_change() {
        let dir = tempdir().unwrap();
        let resource = open_in(dir.path());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        resource.listeners().subscribe(
            Arc::new(move |_: &str| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
            ["theme"],
        );

        assert!(resource.set("theme", "light".into()).unwrap());
        assert!(!resource.set("theme", "light".into()).unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("main.json"), "{ not json").unwrap();
        let resource = open_in(dir.path());

        assert_eq!(resource.get::<i64>("maxRows").unwrap(), 3);
        assert_eq!(resource.load_report().defaulted.len(), 2);
        assert!(resource.is_dirty());
    }

    #[test]
    fn test_failed_flush_stays_dirty() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let resource = open_in(&blocker);

        assert!(resource.flush().unwrap_err().is_write_error());
        assert!(resource.is_dirty());
        assert!(resource.on_last_release().is_err());
    }

    #[test]
    fn test_default_value() {
        let dir = tempdir().unwrap();
        let resource = open_in(dir.path());
        resource.set("theme", "light".into()).unwrap();

        assert_eq!(
            resource.default_value("theme").unwrap(),
            ConfigValue::from("dark")
        );
        assert!(matches!(
            resource.default_value("nope"),
            Err(Error::UnknownKey { .. })
        ));
    }
}
