//! Schema loading and offset computation.
//!
//! A schema maps single-character keys to an output name, a value type and
//! a dimension:
//!
//! ```json
//! {
//!   "a": ["/pot",  "F", 3],
//!   "t": ["/temp", "I", 1]
//! }
//! ```
//!
//! Entries keep their document order. Each entry's offset is the sum of the
//! dimensions of all entries declared before it, so the schema above places
//! `a` at 0..3 and `t` at 3..4 of a shared buffer.

use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;
use thiserror::Error;

/// Errors that can occur while loading a schema.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The schema file could not be read.
    #[error("Failed to read schema file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The schema is not valid JSON.
    #[error("Invalid schema JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The top-level JSON value is not an object.
    #[error("Schema must be a JSON object, found {0}")]
    NotAnObject(&'static str),

    /// A key is not exactly one character.
    #[error("Schema key {0:?} must be exactly one character")]
    InvalidKey(String),

    /// An entry is not a `[name, type, dimension]` triple.
    #[error("Schema entry {key:?}: {reason}")]
    InvalidEntry { key: char, reason: String },

    /// The type code is neither "F" nor "I".
    #[error("Schema entry {key:?}: unknown type code {code:?} (expected \"F\" or \"I\")")]
    UnknownTypeCode { key: char, code: String },

    /// The dimension is not a positive 32-bit integer.
    #[error("Schema entry {key:?}: dimension must be a positive integer, found {found}")]
    InvalidDimension { key: char, found: String },

    /// The summed dimensions do not fit the offset range.
    #[error("Schema dimensions overflow at entry {0:?}")]
    OffsetOverflow(char),
}

/// Declared numeric type of an entry's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Integer,
    Float,
}

impl ValueType {
    /// Parse a type code from the schema file.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "I" => Some(ValueType::Integer),
            "F" => Some(ValueType::Float),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ValueType::Integer => "I",
            ValueType::Float => "F",
        }
    }
}

/// One row of the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaEntry {
    pub key: char,
    /// Message address in direct mode.
    pub output_name: String,
    pub value_type: ValueType,
    /// Number of values expected per line. Always at least 1.
    pub dimension: u32,
    /// Sum of the dimensions of all earlier entries.
    pub offset: u32,
}

/// An ordered, read-only collection of schema entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    entries: Vec<SchemaEntry>,
    total_dimension: u32,
}

impl Schema {
    /// Load a schema from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Parse a schema from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let value: JsonValue = serde_json::from_str(text)?;
        Self::from_json_value(value)
    }

    /// Build a schema from an already parsed JSON value.
    ///
    /// Either every entry is valid and the whole schema is returned, or
    /// nothing is.
    pub fn from_json_value(value: JsonValue) -> Result<Self, ConfigError> {
        let map = match value {
            JsonValue::Object(map) => map,
            other => return Err(ConfigError::NotAnObject(json_kind(&other))),
        };

        let mut entries = Vec::with_capacity(map.len());
        let mut offset: u32 = 0;

        for (raw_key, raw_entry) in map {
            let key = parse_key(&raw_key)?;
            let (output_name, value_type, dimension) = parse_triple(key, &raw_entry)?;

            entries.push(SchemaEntry {
                key,
                output_name,
                value_type,
                dimension,
                offset,
            });

            offset = offset
                .checked_add(dimension)
                .ok_or(ConfigError::OffsetOverflow(key))?;
        }

        Ok(Self {
            entries,
            total_dimension: offset,
        })
    }

    /// Look up the entry for a key. Unknown keys return `None`.
    pub fn entry_for(&self, key: char) -> Option<&SchemaEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// Offset of a key within the shared buffer.
    pub fn offset(&self, key: char) -> Option<u32> {
        self.entry_for(key).map(|e| e.offset)
    }

    /// Sum of all dimensions.
    pub fn total_dimension(&self) -> u32 {
        self.total_dimension
    }

    /// Entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &SchemaEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

fn parse_key(raw: &str) -> Result<char, ConfigError> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(ConfigError::InvalidKey(raw.to_string())),
    }
}

fn parse_triple(key: char, raw: &JsonValue) -> Result<(String, ValueType, u32), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEntry { key, reason };

    let items = raw
        .as_array()
        .ok_or_else(|| invalid(format!("expected [name, type, dimension], found {}", json_kind(raw))))?;
    if items.len() != 3 {
        return Err(invalid(format!(
            "expected [name, type, dimension], found {} element(s)",
            items.len()
        )));
    }

    let output_name = items[0]
        .as_str()
        .ok_or_else(|| invalid(format!("output name must be a string, found {}", json_kind(&items[0]))))?;
    if !output_name.starts_with('/') || output_name.contains('\0') {
        return Err(invalid(format!(
            "output name {:?} must start with '/' and contain no NUL",
            output_name
        )));
    }

    let code = items[1]
        .as_str()
        .ok_or_else(|| invalid(format!("type code must be a string, found {}", json_kind(&items[1]))))?;
    let value_type = ValueType::from_code(code).ok_or_else(|| ConfigError::UnknownTypeCode {
        key,
        code: code.to_string(),
    })?;

    let dimension = items[2]
        .as_u64()
        .and_then(|d| u32::try_from(d).ok())
        .filter(|d| *d >= 1)
        .ok_or_else(|| ConfigError::InvalidDimension {
            key,
            found: items[2].to_string(),
        })?;

    Ok((output_name.to_string(), value_type, dimension))
}
