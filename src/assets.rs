//! Bundled default documents
//!
//! Every config file ships with a read-only default document of the same
//! shape. It is consulted only for keys missing from the live file, parsed on
//! the first miss, and cached per resource name for as long as the
//! [`DefaultAssets`] lives.

use crate::error::{Error, Result};
use crate::storage::JsonStorage;
use log::{debug, warn};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Source and cache of bundled default documents
#[derive(Debug, Default)]
pub struct DefaultAssets {
    /// Directory searched for `<resource>` files
    dir: Option<PathBuf>,
    /// Documents registered in memory (e.g. `include_str!` assets)
    embedded: HashMap<String, String>,
    /// Parsed documents; a missing resource is cached as `Null`
    cache: RwLock<HashMap<String, Arc<Value>>>,
    storage: JsonStorage,
}

impl DefaultAssets {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self {
            dir,
            ..Default::default()
        }
    }

    /// Register an in-memory default document, taking precedence over the
    /// assets directory
    pub fn insert_document(&mut self, name: impl Into<String>, json: impl Into<String>) {
        let name = name.into();
        self.cache.write().remove(&name);
        self.embedded.insert(name, json.into());
    }

    /// Load a default document, parsing it at most once
    ///
    /// A resource that exists nowhere resolves to `Value::Null` and is cached
    /// as such.
    ///
    /// # Errors
    ///
    /// Returns `Error::Parse` or `Error::FileRead` if the document exists but
    /// cannot be read. Failures are not cached.
    pub fn load(&self, name: &str) -> Result<Arc<Value>> {
        if let Some(doc) = self.cache.read().get(name) {
            return Ok(Arc::clone(doc));
        }

        let document = self.read_uncached(name)?;
        let mut cache = self.cache.write();
        let doc = cache
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(document));
        Ok(Arc::clone(doc))
    }

    fn read_uncached(&self, name: &str) -> Result<Value> {
        if let Some(text) = self.embedded.get(name) {
            debug!("Parsing embedded default document {name}");
            return self.storage.deserialize(&PathBuf::from(name), text);
        }

        if let Some(dir) = &self.dir {
            let path = dir.join(name);
            if let Some(doc) = self.storage.read(&path)? {
                debug!("Loaded default document {}", path.display());
                return Ok(doc);
            }
        }

        warn!("No bundled default document named {name}");
        Ok(Value::Null)
    }
}

/// Default document for one file, parsed on the first key lookup
pub struct LazyDefaults<'a> {
    assets: &'a DefaultAssets,
    resource: &'a str,
    document: Option<Arc<Value>>,
}

impl<'a> LazyDefaults<'a> {
    pub fn new(assets: &'a DefaultAssets, resource: &'a str) -> Self {
        Self {
            assets,
            resource,
            document: None,
        }
    }

    /// Whether the default document has been loaded yet
    pub fn is_loaded(&self) -> bool {
        self.document.is_some()
    }

    /// Property `key` of the default document, if it has one
    pub fn property(&mut self, key: &str) -> Option<&Value> {
        let (assets, resource) = (self.assets, self.resource);
        let document = self.document.get_or_insert_with(|| {
            assets.load(resource).unwrap_or_else(|e: Error| {
                warn!("Default document {resource} is unusable: {e}");
                Arc::new(Value::Null)
            })
        });
        document.get(key)
    }
}
