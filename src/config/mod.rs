//! Core configuration types and traits
//!
//! This module contains the foundational types for config files:
//! - `StoreConfig` - Configuration for the config store
//! - `FileSchema` / `DataKey` / `ConfigSchema` - Declared keys of one file
//! - `ConfigValue` / `ConfigType` - Typed values held in memory

mod schema;
mod types;
mod value;

pub use schema::{ConfigSchema, DataKey, DefaultLocator, FileSchema, FileSchemaBuilder};
pub use types::{StoreConfig, StoreConfigBuilder};
pub use value::{ConfigType, ConfigValue, DataType};
