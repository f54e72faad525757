//! Handles on open config files
//!
//! A [`Handle`] is what application code holds to read, write and watch one
//! config file. Every handle on the same file shares one
//! [`ConfigResource`]; pending changes are written when the last handle
//! closes.
//!
//! # Example
//!
//! ```rust
//! use pocketconf::{ConfigStore, DataKey, FileSchema};
//!
//! # fn main() -> pocketconf::Result<()> {
//! # let dir = tempfile::tempdir().unwrap();
//! let store = ConfigStore::builder("pocket-home")
//!     .config_dir(dir.path())
//!     .with_file(
//!         FileSchema::builder("main.json")
//!             .key(DataKey::int("maxRows").default_value(3))
//!             .build()?,
//!     )
//!     .build()?;
//!
//! let handle = store.open_handle("main.json")?;
//! handle.subscribe(["maxRows"], |key: &str| println!("{key} changed"))?;
//! handle.set_value("maxRows", 4)?;
//! assert_eq!(handle.get_value::<i64>("maxRows")?, 4);
//! handle.close()?;
//! # Ok(())
//! # }
//! ```

use crate::config::{ConfigType, ConfigValue, FileSchema};
use crate::error::Result;
use crate::events::{ConfigListener, ListenerId, OwnerId};
use crate::registry::ReleaseToken;
use crate::resource::ConfigResource;
use crate::store::LoadReport;
use log::error;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// An open reference to one config file
///
/// Dropping the handle unsubscribes the listeners it registered and releases
/// its reference; if it was the last one, unsaved changes are written and a
/// write failure goes to the store's [`NoticeSink`](crate::NoticeSink). Use
/// [`close`](Self::close) to receive that error instead.
pub struct Handle {
    resource: Arc<ConfigResource>,
    token: Option<ReleaseToken<ConfigResource>>,
    owner: OwnerId,
}

impl Handle {
    pub(crate) fn new(resource: Arc<ConfigResource>, token: ReleaseToken<ConfigResource>) -> Self {
        let owner = resource.listeners().new_owner();
        Self {
            resource,
            token: Some(token),
            owner,
        }
    }

    pub fn file_name(&self) -> &str {
        self.resource.schema().file_name()
    }

    /// Location of the live file
    pub fn path(&self) -> &Path {
        self.resource.path()
    }

    pub fn schema(&self) -> &FileSchema {
        self.resource.schema()
    }

    /// What had to be repaired when the file was loaded
    pub fn load_report(&self) -> &LoadReport {
        self.resource.load_report()
    }

    // =========================================================================
    // Values
    // =========================================================================

    /// Read a typed value
    ///
    /// # Errors
    ///
    /// * `Error::UnknownKey` - the key is not declared for this file
    /// * `Error::TypeMismatch` - `T` is not the key's declared type
    pub fn get_value<T: ConfigType>(&self, key: &str) -> Result<T> {
        self.resource.get(key)
    }

    /// Read a typed value, treating a failure as a bug
    ///
    /// Asserts in debug builds. Release builds log the error and return
    /// `T::default()`.
    pub fn value<T: ConfigType>(&self, key: &str) -> T {
        match self.get_value(key) {
            Ok(value) => value,
            Err(e) => {
                debug_assert!(!e.is_programming_error(), "{}: {e}", self.file_name());
                error!("{}: {e}", self.file_name());
                T::default()
            }
        }
    }

    /// Store a value and notify listeners of `key` if it changed
    ///
    /// Returns whether the stored value changed. Listeners run after the
    /// value is committed, on this thread unless the store uses queued
    /// delivery.
    ///
    /// # Errors
    ///
    /// * `Error::UnknownKey` - the key is not declared for this file
    /// * `Error::TypeMismatch` - the value's type is not the declared type
    /// * `Error::InvalidValue` - a double is NaN or infinite
    pub fn set_value(&self, key: &str, value: impl Into<ConfigValue>) -> Result<bool> {
        self.resource.set(key, value.into())
    }

    /// Restore a key to its default value
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownKey` for undeclared keys and `Error::Schema` if
    /// the default cannot be resolved.
    pub fn reset_value(&self, key: &str) -> Result<bool> {
        let default = self.resource.default_value(key)?;
        self.resource.set(key, default)
    }

    /// Default value of a key
    ///
    /// # Errors
    ///
    /// Same as [`reset_value`](Self::reset_value).
    pub fn default_value(&self, key: &str) -> Result<ConfigValue> {
        self.resource.default_value(key)
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Call `listener` whenever one of `keys` changes
    ///
    /// The subscription ends when this handle is dropped.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownKey` if any key is not declared; nothing is
    /// subscribed in that case.
    pub fn subscribe<I, K>(&self, keys: I, listener: impl ConfigListener + 'static) -> Result<ListenerId>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.subscribe_shared(keys, Arc::new(listener))
    }

    /// Like [`subscribe`](Self::subscribe) for a listener object shared
    /// between subscriptions
    ///
    /// Subscribing the same `Arc` again through this handle adds keys to its
    /// existing subscription and returns the same id. Other handles on the
    /// file get their own subscription for it.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownKey` if any key is not declared.
    pub fn subscribe_shared<I, K>(&self, keys: I, listener: Arc<dyn ConfigListener>) -> Result<ListenerId>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let keys = self.checked_keys(keys)?;
        Ok(self
            .resource
            .listeners()
            .subscribe_owned(self.owner, listener, keys))
    }

    /// Add keys to an existing subscription
    ///
    /// Returns false if `id` is not subscribed.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownKey` if any key is not declared.
    pub fn track_keys<I, K>(&self, id: ListenerId, keys: I) -> Result<bool>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let keys = self.checked_keys(keys)?;
        Ok(self.resource.listeners().track(id, keys))
    }

    /// Stop delivering `keys` to a subscription
    pub fn untrack_keys<I, K>(&self, id: ListenerId, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.resource.listeners().untrack(id, keys);
    }

    /// End a subscription; safe to call more than once
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.resource.listeners().unsubscribe(id)
    }

    /// Deliver every key a subscription tracks, e.g. to initialize a view
    pub fn load_all(&self, id: ListenerId) -> usize {
        self.resource.listeners().load_all(id)
    }

    /// Keys a subscription tracks
    pub fn subscribed_keys(&self, id: ListenerId) -> Vec<String> {
        self.resource.listeners().subscribed_keys(id)
    }

    /// Number of listeners tracking `key` across all handles on this file
    pub fn listener_count(&self, key: &str) -> usize {
        self.resource.listeners().listener_count(key)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Write unsaved changes now; returns whether anything was written
    ///
    /// # Errors
    ///
    /// Returns `Error::FileWrite` or `Error::DirectoryCreate`. The changes
    /// stay pending.
    pub fn flush(&self) -> Result<bool> {
        self.resource.flush()
    }

    pub fn is_dirty(&self) -> bool {
        self.resource.is_dirty()
    }

    /// Current values as a JSON object
    pub fn snapshot(&self) -> Value {
        self.resource.snapshot()
    }

    /// Close the handle, returning the error of the final write if this was
    /// the last handle on the file
    ///
    /// # Errors
    ///
    /// Returns `Error::FileWrite` or `Error::DirectoryCreate`.
    pub fn close(mut self) -> Result<()> {
        self.detach_listeners();
        match self.token.take() {
            Some(token) => token.release(),
            None => Ok(()),
        }
    }

    fn detach_listeners(&self) {
        self.resource.listeners().unsubscribe_owner(self.owner);
    }

    fn checked_keys<I, K>(&self, keys: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        keys.into_iter()
            .map(|key| {
                let key = key.into();
                self.resource.schema().require(&key)?;
                Ok(key)
            })
            .collect()
    }
}

impl Clone for Handle {
    /// Open another handle on the same file; listeners are not copied
    fn clone(&self) -> Self {
        Self {
            resource: Arc::clone(&self.resource),
            token: self.token.as_ref().map(ReleaseToken::duplicate),
            owner: self.resource.listeners().new_owner(),
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.detach_listeners();
        // token drop releases and reports a failed final write
        self.token.take();
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("file", &self.file_name())
            .field("owner", &self.owner)
            .finish()
    }
}
