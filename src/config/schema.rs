//! Config file schemas
//!
//! A [`FileSchema`] is the table of keys one JSON file holds: each [`DataKey`]
//! pairs a key with its declared [`DataType`] and tells the loader where the
//! default comes from when the file lacks the key.
//!
//! Schemas are validated once, when they are built, so a duplicate key or an
//! inline default of the wrong type is caught at startup instead of at an
//! arbitrary `get` call.
//!
//! ```
//! use pocketconf::{DataKey, FileSchema};
//!
//! let schema = FileSchema::builder("main.json")
//!     .key(DataKey::int("maxRows").default_value(3))
//!     .key(DataKey::string("theme").default_value("dark"))
//!     .key(DataKey::bool("showClock"))   // default read from the bundled main.json
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(schema.keys().len(), 3);
//! ```

use crate::config::value::{ConfigValue, DataType};
use crate::error::{Error, Result};
use std::collections::HashMap;

// =============================================================================
// Data Key
// =============================================================================

/// Where a key's default value comes from
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultLocator {
    /// Read from the file's bundled default document
    Bundled,
    /// Inline default declared with the key
    Value(ConfigValue),
}

/// Schema descriptor for one config key
#[derive(Debug, Clone, PartialEq)]
pub struct DataKey {
    key: String,
    data_type: DataType,
    default: DefaultLocator,
}

impl DataKey {
    /// Declare a key whose default is read from the bundled default document
    pub fn new(key: impl Into<String>, data_type: DataType) -> Self {
        Self {
            key: key.into(),
            data_type,
            default: DefaultLocator::Bundled,
        }
    }

    pub fn string(key: impl Into<String>) -> Self {
        Self::new(key, DataType::String)
    }

    pub fn int(key: impl Into<String>) -> Self {
        Self::new(key, DataType::Int)
    }

    pub fn bool(key: impl Into<String>) -> Self {
        Self::new(key, DataType::Bool)
    }

    pub fn double(key: impl Into<String>) -> Self {
        Self::new(key, DataType::Double)
    }

    /// Use an inline default instead of the bundled document
    #[must_use]
    pub fn default_value(mut self, value: impl Into<ConfigValue>) -> Self {
        self.default = DefaultLocator::Value(value.into());
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn default_locator(&self) -> &DefaultLocator {
        &self.default
    }

    fn validate(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(Error::Schema {
                key: self.key.clone(),
                reason: "key must not be empty".into(),
            });
        }
        if let DefaultLocator::Value(value) = &self.default {
            if value.data_type() != self.data_type {
                return Err(Error::Schema {
                    key: self.key.clone(),
                    reason: format!(
                        "default value {value} is a {}, key is declared {}",
                        value.data_type(),
                        self.data_type
                    ),
                });
            }
            if let ConfigValue::Double(n) = value {
                if !n.is_finite() {
                    return Err(Error::Schema {
                        key: self.key.clone(),
                        reason: "default double must be finite".into(),
                    });
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// File Schema
// =============================================================================

/// Validated key table for one config file
#[derive(Debug, Clone)]
pub struct FileSchema {
    file_name: String,
    default_resource: String,
    keys: Vec<DataKey>,
    index: HashMap<String, usize>,
}

impl FileSchema {
    /// Start a schema for the JSON file `file_name` (e.g. "main.json")
    pub fn builder(file_name: impl Into<String>) -> FileSchemaBuilder {
        FileSchemaBuilder {
            file_name: file_name.into(),
            default_resource: None,
            keys: Vec::new(),
        }
    }

    /// Build the schema declared by a [`ConfigSchema`] type
    ///
    /// # Errors
    ///
    /// Returns the first validation failure of the declared keys.
    pub fn of<S: ConfigSchema>() -> Result<Self> {
        S::data_keys()
            .into_iter()
            .fold(FileSchema::builder(S::FILE_NAME), FileSchemaBuilder::key)
            .default_resource(S::default_resource())
            .build()
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Name of the bundled default document for this file
    pub fn default_resource(&self) -> &str {
        &self.default_resource
    }

    /// Declared keys, in declaration order
    pub fn keys(&self) -> &[DataKey] {
        &self.keys
    }

    pub fn get(&self, key: &str) -> Option<&DataKey> {
        self.index.get(key).map(|&i| &self.keys[i])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Look up a declared key
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownKey` if the key was never declared.
    pub fn require(&self, key: &str) -> Result<&DataKey> {
        self.get(key).ok_or_else(|| Error::UnknownKey {
            file: self.file_name.clone(),
            key: key.to_string(),
        })
    }
}

/// Builder for [`FileSchema`]
#[derive(Debug, Clone)]
pub struct FileSchemaBuilder {
    file_name: String,
    default_resource: Option<String>,
    keys: Vec<DataKey>,
}

impl FileSchemaBuilder {
    /// Declare a key
    #[must_use]
    pub fn key(mut self, key: DataKey) -> Self {
        self.keys.push(key);
        self
    }

    /// Name of the bundled default document (default: the file name)
    #[must_use]
    pub fn default_resource(mut self, name: impl Into<String>) -> Self {
        self.default_resource = Some(name.into());
        self
    }

    /// Validate and build the schema
    ///
    /// # Errors
    ///
    /// Returns an error if the file name is empty, a key is empty or declared
    /// twice, or an inline default disagrees with its declared type.
    pub fn build(self) -> Result<FileSchema> {
        if self.file_name.is_empty() {
            return Err(Error::Config("config file name must not be empty".into()));
        }

        let mut index = HashMap::with_capacity(self.keys.len());
        for (i, key) in self.keys.iter().enumerate() {
            key.validate()?;
            if index.insert(key.key.clone(), i).is_some() {
                return Err(Error::DuplicateKey {
                    file: self.file_name,
                    key: key.key.clone(),
                });
            }
        }

        let default_resource = self
            .default_resource
            .unwrap_or_else(|| self.file_name.clone());

        Ok(FileSchema {
            file_name: self.file_name,
            default_resource,
            keys: self.keys,
            index,
        })
    }
}

// =============================================================================
// Config Schema Trait
// =============================================================================

/// A type describing one config file's keys
///
/// # Example
///
/// ```
/// use pocketconf::{ConfigSchema, DataKey, FileSchema};
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
/// let schema = FileSchema::of::<MainConfig>().unwrap();
/// assert!(schema.contains("theme"));
/// ```
pub trait ConfigSchema {
    /// Name of the JSON file holding this schema's values
    const FILE_NAME: &'static str;

    /// Every key the file holds
    fn data_keys() -> Vec<DataKey>;

    /// Name of the bundled default document
    fn default_resource() -> String {
        Self::FILE_NAME.to_string()
    }
}
