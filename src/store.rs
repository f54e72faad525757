//! In-memory typed value cache for one config file

use crate::assets::LazyDefaults;
use crate::config::{ConfigType, ConfigValue, DataKey, DataType, DefaultLocator, FileSchema};
use crate::error::{Error, Result};
use log::{debug, warn};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Outcome of loading a store from a JSON document
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Keys whose value came from a default rather than the document
    pub defaulted: Vec<String>,
    /// Malformed values found while loading; each was replaced by a default
    pub schema_errors: Vec<Error>,
}

impl LoadReport {
    /// True if the document supplied every key with the right type
    pub fn is_clean(&self) -> bool {
        self.defaulted.is_empty() && self.schema_errors.is_empty()
    }
}

/// Typed values of one config file plus its pending-write state
///
/// Every stored value has the type its [`DataKey`] declares. `generation`
/// counts committed changes so a flush can tell whether the values it wrote
/// are still the current ones.
#[derive(Debug)]
pub struct ValueStore {
    schema: Arc<FileSchema>,
    values: HashMap<String, ConfigValue>,
    dirty: bool,
    generation: u64,
}

impl ValueStore {
    /// Create an empty store; call [`init_from_json`](Self::init_from_json)
    /// before reading
    pub fn new(schema: Arc<FileSchema>) -> Self {
        Self {
            values: HashMap::with_capacity(schema.keys().len()),
            schema,
            dirty: false,
            generation: 0,
        }
    }

    pub fn schema(&self) -> &Arc<FileSchema> {
        &self.schema
    }

    /// Read a typed value
    ///
    /// # Errors
    ///
    /// * `Error::UnknownKey` - the key is not declared or was never loaded
    /// * `Error::TypeMismatch` - `T` is not the declared type
    /// * `Error::InvalidValue` - the value does not fit `T` (e.g. `i32` overflow)
    pub fn get<T: ConfigType>(&self, key: &str) -> Result<T> {
        let data_key = self.schema.require(key)?;
        if data_key.data_type() != T::DATA_TYPE {
            return Err(Error::TypeMismatch {
                key: key.to_string(),
                expected: data_key.data_type(),
                actual: T::DATA_TYPE,
            });
        }
        let value = self.get_raw(key)?;
        T::from_config(value).ok_or_else(|| Error::InvalidValue {
            key: key.to_string(),
            reason: format!("{value} does not fit the requested type"),
        })
    }

    /// Read the stored value without type conversion
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownKey` if the key is not declared or not loaded.
    pub fn get_raw(&self, key: &str) -> Result<&ConfigValue> {
        self.values.get(key).ok_or_else(|| Error::UnknownKey {
            file: self.schema.file_name().to_string(),
            key: key.to_string(),
        })
    }

    /// Store a value and mark the store dirty
    ///
    /// Returns `Ok(false)` without touching the dirty flag when the value is
    /// unchanged. An int stored into a double key is widened.
    ///
    /// # Errors
    ///
    /// * `Error::UnknownKey` - the key is not declared
    /// * `Error::TypeMismatch` - the value's type is not the declared type
    /// * `Error::InvalidValue` - a double is NaN or infinite
    pub fn set(&mut self, key: &str, value: ConfigValue) -> Result<bool> {
        let data_key = self.schema.require(key)?;
        let value = match (data_key.data_type(), value) {
            (DataType::Double, ConfigValue::Int(n)) => ConfigValue::Double(n as f64),
            (declared, value) if declared != value.data_type() => {
                return Err(Error::TypeMismatch {
                    key: key.to_string(),
                    expected: declared,
                    actual: value.data_type(),
                });
            }
            (_, value) => value,
        };

        if let ConfigValue::Double(n) = value {
            if !n.is_finite() {
                return Err(Error::InvalidValue {
                    key: key.to_string(),
                    reason: format!("{n} cannot be stored as JSON"),
                });
            }
        }

        if self.values.get(key) == Some(&value) {
            debug!("{}: {key} unchanged, skipping", self.schema.file_name());
            return Ok(false);
        }

        self.values.insert(key.to_string(), value);
        self.touch();
        Ok(true)
    }

    /// Load every declared key from `document`, falling back to defaults
    ///
    /// Missing keys and keys holding the wrong JSON type take their default
    /// and mark the store dirty so the corrected file is written on the next
    /// flush. The bundled default document is only parsed if some key needs it.
    pub fn init_from_json(&mut self, document: &Value, defaults: &mut LazyDefaults<'_>) -> LoadReport {
        let mut report = LoadReport::default();
        let file_name = self.schema.file_name().to_string();

        let object = match document {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => {
                let error = Error::Schema {
                    key: file_name.clone(),
                    reason: format!("document root is {}, expected an object", json_kind(other)),
                };
                warn!("{error}");
                report.schema_errors.push(error);
                None
            }
        };

        let schema = Arc::clone(&self.schema);
        for data_key in schema.keys() {
            let key = data_key.key();
            let present = object
                .and_then(|map| map.get(key))
                .filter(|json| !json.is_null());

            let loaded = present.and_then(|json| {
                let value = ConfigValue::from_json(data_key.data_type(), json);
                if value.is_none() {
                    let error = Error::Schema {
                        key: key.to_string(),
                        reason: format!(
                            "expected {}, found {} in {file_name}",
                            data_key.data_type().json_name(),
                            json_kind(json)
                        ),
                    };
                    warn!("{error}; using default");
                    report.schema_errors.push(error);
                }
                value
            });

            let value = match loaded {
                Some(value) => value,
                None => {
                    debug!("{file_name}: {key} missing, using default");
                    report.defaulted.push(key.to_string());
                    self.dirty = true;
                    Self::resolve_default(data_key, defaults).unwrap_or_else(|error| {
                        warn!("{error}; using {}", data_key.data_type().zero_value());
                        report.schema_errors.push(error);
                        data_key.data_type().zero_value()
                    })
                }
            };
            self.values.insert(key.to_string(), value);
        }

        self.generation += 1;
        report
    }

    /// Resolve the default value declared for a key
    ///
    /// # Errors
    ///
    /// Returns `Error::Schema` if the bundled default document has no usable
    /// value for the key.
    pub fn resolve_default(data_key: &DataKey, defaults: &mut LazyDefaults<'_>) -> Result<ConfigValue> {
        match data_key.default_locator() {
            DefaultLocator::Value(value) => Ok(value.clone()),
            DefaultLocator::Bundled => {
                let json = defaults.property(data_key.key()).ok_or_else(|| Error::Schema {
                    key: data_key.key().to_string(),
                    reason: "no value in the bundled default document".into(),
                })?;
                ConfigValue::from_json(data_key.data_type(), json).ok_or_else(|| Error::Schema {
                    key: data_key.key().to_string(),
                    reason: format!(
                        "bundled default is {}, expected {}",
                        json_kind(json),
                        data_key.data_type().json_name()
                    ),
                })
            }
        }
    }

    /// Emit one JSON property per declared key
    pub fn serialize_to_json(&self) -> Value {
        let mut object = Map::with_capacity(self.values.len());
        for data_key in self.schema.keys() {
            if let Some(value) = self.values.get(data_key.key()) {
                object.insert(data_key.key().to_string(), value.to_json());
            }
        }
        Value::Object(object)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Flag pending changes without changing any value
    pub fn mark_dirty(&mut self) {
        self.touch();
    }

    /// Number of committed changes so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Clear the dirty flag if nothing changed since `generation` was read
    pub fn mark_clean_at(&mut self, generation: u64) -> bool {
        if self.generation == generation {
            self.dirty = false;
        }
        !self.dirty
    }

    fn touch(&mut self) {
        self.dirty = true;
        self.generation += 1;
    }
}

fn json_kind(json: &Value) -> &'static str {
    match json {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "an integer",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
