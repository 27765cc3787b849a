//! Schema map types handed to the matcher by the database layer.
//!
//! The map is `table -> ordered columns`, in the same JSON shape the schema
//! extractor produces:
//!
//! ```json
//! { "Contact": [ { "column": "Email", "type": "varchar", "nullable": "YES", "key": "" } ] }
//! ```

use crate::error::{MatchError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Table name -> columns in ordinal order.
///
/// Tables iterate in name order, which keeps catalog discovery order (and so
/// tie-breaking between equal scores) deterministic across runs.
pub type SchemaMap = BTreeMap<String, Vec<ColumnInfo>>;

/// Table name -> sample rows. Only carried through for callers that format prompts.
pub type SampleData = BTreeMap<String, Vec<serde_json::Map<String, serde_json::Value>>>;

/// Key flag reported by the schema source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyKind {
    #[default]
    None,
    /// `PRI`
    Primary,
    /// `MUL`
    Foreign,
}

impl KeyKind {
    pub fn from_flag(flag: &str) -> Self {
        match flag.trim().to_uppercase().as_str() {
            "PRI" => KeyKind::Primary,
            "MUL" => KeyKind::Foreign,
            _ => KeyKind::None,
        }
    }

    pub fn as_flag(&self) -> &'static str {
        match self {
            KeyKind::Primary => "PRI",
            KeyKind::Foreign => "MUL",
            KeyKind::None => "",
        }
    }
}

impl Serialize for KeyKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_flag())
    }
}

impl<'de> Deserialize<'de> for KeyKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let flag: Option<String> = Option::deserialize(deserializer)?;
        Ok(flag.map(|f| KeyKind::from_flag(&f)).unwrap_or_default())
    }
}

/// One column record of the schema map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    #[serde(rename = "column")]
    pub name: String,
    #[serde(rename = "type", default)]
    pub data_type: Option<String>,
    #[serde(default = "default_nullable", deserialize_with = "deserialize_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub key: KeyKind,
}

fn default_nullable() -> bool {
    true
}

// MySQL reports IS_NULLABLE as "YES"/"NO"; other sources send a bool.
fn deserialize_nullable<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Nullable {
        Flag(bool),
        Text(String),
    }

    Ok(match Option::<Nullable>::deserialize(deserializer)? {
        Some(Nullable::Flag(flag)) => flag,
        Some(Nullable::Text(text)) => !text.trim().eq_ignore_ascii_case("no"),
        None => true,
    })
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: None,
            nullable: true,
            key: KeyKind::None,
        }
    }

    pub fn with_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_key(mut self, key: KeyKind) -> Self {
        self.key = key;
        self
    }
}

impl fmt::Display for ColumnInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(data_type) = &self.data_type {
            write!(f, " {}", data_type)?;
        }
        if !self.nullable {
            write!(f, " NOT NULL")?;
        }
        match self.key {
            KeyKind::Primary => write!(f, " (PRIMARY KEY)"),
            KeyKind::Foreign => write!(f, " (FOREIGN KEY)"),
            KeyKind::None => Ok(()),
        }
    }
}

/// Parse a schema map from JSON text.
///
/// A column record without a `column` key is a contract violation and fails here
/// rather than being skipped.
pub fn parse_schema(json: &str) -> Result<SchemaMap> {
    serde_json::from_str(json).map_err(|e| MatchError::Schema(format!("Failed to parse schema: {}", e)))
}

/// Load a schema map from a JSON file.
pub fn load_schema(path: impl AsRef<Path>) -> Result<SchemaMap> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| MatchError::Schema(format!("Failed to read {}: {}", path.display(), e)))?;
    let schema = parse_schema(&content)?;
    tracing::info!(
        tables = schema.len(),
        columns = schema.values().map(Vec::len).sum::<usize>(),
        "Loaded schema from {}",
        path.display()
    );
    Ok(schema)
}

/// Load sample rows (`table -> [row]`) from a JSON file.
pub fn load_sample_data(path: impl AsRef<Path>) -> Result<SampleData> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let samples: SampleData = serde_json::from_str(&content)?;
    tracing::debug!(tables = samples.len(), "Loaded sample data from {}", path.display());
    Ok(samples)
}
