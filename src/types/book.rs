use std::fmt::Display;

use serde::{Deserialize, Deserializer, Serialize};

/// Identifier of a catalog entry.
///
/// The backend may hand out either text or integer keys, both are normalised to text.
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash, Serialize, PartialOrd, Ord)]
pub struct BookId(pub String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Integer(i64),
}

impl<'de> Deserialize<'de> for BookId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => BookId(s),
            RawId::Integer(i) => BookId(i.to_string()),
        })
    }
}

impl Display for BookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BookId {
    fn from(s: &str) -> Self {
        BookId(s.to_string())
    }
}

/// One file in the catalog, as stored by the backend.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    #[serde(rename = "_id")]
    pub id:        BookId,
    pub file_name: Option<String>,
    pub caption:   Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<u64>,
}

impl Book {
    /// Decode a single row, reporting the JSON path of whatever failed to parse.
    pub fn from_row(row: serde_json::Value) -> Result<Self, serde_path_to_error::Error<serde_json::Error>> {
        serde_path_to_error::deserialize(row)
    }

    pub fn title(&self) -> &str {
        match &self.file_name {
            Some(name) if !name.trim().is_empty() => name,
            _ => "Untitled",
        }
    }
}
