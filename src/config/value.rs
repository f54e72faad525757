//! Primitive value types stored in config files
//!
//! Every key in a config file holds exactly one of four primitive types.
//! [`ConfigValue`] is the tagged union held in memory, and [`ConfigType`] maps
//! the Rust types application code reads (`String`, `i64`, `i32`, `bool`, `f64`)
//! onto it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// =============================================================================
// Data Types
// =============================================================================

/// Declared type of a config key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Int,
    Bool,
    Double,
}

impl DataType {
    /// Zero value used when neither the file nor any default provides one
    pub fn zero_value(self) -> ConfigValue {
        match self {
            DataType::String => ConfigValue::String(String::new()),
            DataType::Int => ConfigValue::Int(0),
            DataType::Bool => ConfigValue::Bool(false),
            DataType::Double => ConfigValue::Double(0.0),
        }
    }

    /// Name of the JSON type expected for this data type
    pub fn json_name(self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Int => "integer",
            DataType::Bool => "boolean",
            DataType::Double => "number",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::String => "string",
            DataType::Int => "int",
            DataType::Bool => "bool",
            DataType::Double => "double",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Config Value
// =============================================================================

/// A single typed config value
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Int(i64),
    Bool(bool),
    Double(f64),
}

impl ConfigValue {
    /// Type tag of this value
    pub fn data_type(&self) -> DataType {
        match self {
            ConfigValue::String(_) => DataType::String,
            ConfigValue::Int(_) => DataType::Int,
            ConfigValue::Bool(_) => DataType::Bool,
            ConfigValue::Double(_) => DataType::Double,
        }
    }

    /// Convert a JSON property into a value of the declared type.
    ///
    /// Integers are accepted for doubles and integral numbers for ints; any
    /// other disagreement returns `None`.
    pub fn from_json(data_type: DataType, json: &Value) -> Option<Self> {
        match data_type {
            DataType::String => json.as_str().map(|s| ConfigValue::String(s.to_string())),
            DataType::Bool => json.as_bool().map(ConfigValue::Bool),
            DataType::Double => json.as_f64().map(ConfigValue::Double),
            DataType::Int => json.as_i64().map(ConfigValue::Int).or_else(|| {
                json.as_f64()
                    .filter(|n| n.fract() == 0.0 && *n >= i64::MIN as f64 && *n < i64::MAX as f64)
                    .map(|n| ConfigValue::Int(n as i64))
            }),
        }
    }

    /// JSON representation written to disk
    pub fn to_json(&self) -> Value {
        match self {
            ConfigValue::String(s) => Value::String(s.clone()),
            ConfigValue::Int(n) => Value::from(*n),
            ConfigValue::Bool(b) => Value::Bool(*b),
            ConfigValue::Double(n) => serde_json::Number::from_f64(*n)
                .map_or(Value::Null, Value::Number),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::String(s) => write!(f, "{s:?}"),
            ConfigValue::Int(n) => write!(f, "{n}"),
            ConfigValue::Bool(b) => write!(f, "{b}"),
            ConfigValue::Double(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::String(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Int(value)
    }
}

impl From<i32> for ConfigValue {
    fn from(value: i32) -> Self {
        ConfigValue::Int(i64::from(value))
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Double(value)
    }
}

// =============================================================================
// Config Type
// =============================================================================

/// Rust types that can be read out of a config file
pub trait ConfigType: Sized + Default {
    /// Declared type this Rust type reads
    const DATA_TYPE: DataType;

    /// Extract from a stored value, `None` if the tag or range disagrees
    fn from_config(value: &ConfigValue) -> Option<Self>;
}

impl ConfigType for String {
    const DATA_TYPE: DataType = DataType::String;

    fn from_config(value: &ConfigValue) -> Option<Self> {
        match value {
            ConfigValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl ConfigType for i64 {
    const DATA_TYPE: DataType = DataType::Int;

    fn from_config(value: &ConfigValue) -> Option<Self> {
        match value {
            ConfigValue::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl ConfigType for i32 {
    const DATA_TYPE: DataType = DataType::Int;

    fn from_config(value: &ConfigValue) -> Option<Self> {
        match value {
            ConfigValue::Int(n) => i32::try_from(*n).ok(),
            _ => None,
        }
    }
}

impl ConfigType for bool {
    const DATA_TYPE: DataType = DataType::Bool;

    fn from_config(value: &ConfigValue) -> Option<Self> {
        match value {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl ConfigType for f64 {
    const DATA_TYPE: DataType = DataType::Double;

    fn from_config(value: &ConfigValue) -> Option<Self> {
        match value {
            ConfigValue::Double(n) => Some(*n),
            _ => None,
        }
    }
}
