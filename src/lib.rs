//! # pocketconf - shared settings files
//!
//! A thread-safe, file-keyed settings cache for applications that keep their
//! configuration in a handful of flat JSON files.
//!
//! ## Features
//!
//! - **Typed access**: every key has a declared type; reads and writes are checked
//! - **Shared copies**: all handles on a file share one in-memory copy
//! - **Default fallback**: missing or malformed keys come from inline defaults or
//!   a bundled default document
//! - **Deferred write-back**: changes are written when the last handle closes,
//!   atomically via a temp file
//! - **Change listeners**: per-key callbacks, delivered immediately or queued for a
//!   UI thread
//!
//! ## Quick Start
//!
//! ```rust
//! use pocketconf::{ConfigStore, DataKey, FileSchema};
//!
//! # fn main() -> pocketconf::Result<()> {
//! # let dir = tempfile::tempdir().unwrap();
//! let store = ConfigStore::builder("pocket-home")
//!     .config_dir(dir.path())
//!     .default_document("main.json", r#"{"showClock": true}"#)
//!     .with_file(
//!         FileSchema::builder("main.json")
//!             .key(DataKey::int("maxRows").default_value(3))
//!             .key(DataKey::string("theme").default_value("dark"))
//!             .key(DataKey::bool("showClock"))
//!             .build()?,
//!     )
//!     .build()?;
//!
//! let main = store.open_handle("main.json")?;
//! assert!(main.get_value::<bool>("showClock")?);
//!
//! main.set_value("theme", "light")?;
//! main.close()?; // last handle: main.json is written now
//! # Ok(())
//! # }
//! ```
//!
//! ## Listening for changes
//!
//! ```rust
//! use pocketconf::{ConfigStore, DataKey, FileSchema};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! # fn main() -> pocketconf::Result<()> {
//! # let dir = tempfile::tempdir().unwrap();
//! # let store = ConfigStore::builder("pocket-home")
//! #     .config_dir(dir.path())
//! #     .with_file(FileSchema::builder("main.json").key(DataKey::int("maxRows").default_value(3)).build()?)
//! #     .build()?;
//! let main = store.open_handle("main.json")?;
//! let changes = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&changes);
//! main.subscribe(["maxRows"], move |_key: &str| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! })?;
//!
//! main.set_value("maxRows", 5)?;
//! main.set_value("maxRows", 5)?; // unchanged, no notification
//! assert_eq!(changes.load(Ordering::SeqCst), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Failures
//!
//! A missing, unreadable or malformed file never prevents opening it: the
//! affected keys take their defaults and the repair is logged. Asking for an
//! undeclared key or the wrong type is an error returned to the caller. A
//! failed write keeps the changes in memory; when it happens as the last
//! handle is dropped, the store's [`NoticeSink`] is told.

// Core modules
mod assets;
mod backend;
mod error;
mod handle;
mod manager;
mod resource;
mod store;
pub mod dispatch;
pub mod events;
pub mod notice;
pub mod registry;
pub mod storage;

// Grouped modules
pub mod config;

// Re-exports from core
pub use assets::{DefaultAssets, LazyDefaults};
pub use backend::FileBackend;
pub use dispatch::{Delivery, DispatchQueue, DispatchSender};
pub use error::{Error, Result};
pub use events::{ConfigListener, ListenerId, ListenerRegistry, OwnerId};
pub use handle::Handle;
pub use manager::{ConfigStore, ConfigStoreBuilder};
pub use notice::{LogNotice, NoticeSink};
pub use resource::ConfigResource;
pub use storage::JsonStorage;
pub use store::{LoadReport, ValueStore};

// Re-exports from config
pub use config::{
    ConfigSchema, ConfigType, ConfigValue, DataKey, DataType, DefaultLocator, FileSchema,
    FileSchemaBuilder, StoreConfig, StoreConfigBuilder,
};
