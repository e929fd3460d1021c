use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A document identifier as supplied by the caller (mirrors the document
/// store's own primary key, so the core never mints its own ids).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocId(pub String);

impl DocId {
    pub fn new(id: impl Into<String>) -> Self {
        DocId(id.into())
    }
}

impl From<&str> for DocId {
    fn from(id: &str) -> Self {
        DocId(id.to_string())
    }
}

impl From<String> for DocId {
    fn from(id: String) -> Self {
        DocId(id)
    }
}

impl std::fmt::Display for DocId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A raw JSON document submitted for indexing. `source` is the caller's
/// arbitrary document body; the core never assumes a fixed shape beyond
/// what the index mapping declares fields for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub source: Value,
}

impl Document {
    pub fn new(id: impl Into<DocId>, source: Value) -> Self {
        Document {
            id: id.into(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Text,
    Keyword,
    Integer,
    Float,
    Date,
    Boolean,
    Object,
    Nested,
}

/// A single field's declared properties inside an index mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMappingProperty {
    pub field_type: FieldType,
    pub analyzer: Option<String>,
    pub boost: Option<f32>,
    #[serde(default = "default_true")]
    pub indexed: bool,
    #[serde(default = "default_true")]
    pub stored: bool,
}

fn default_true() -> bool {
    true
}

impl FieldMappingProperty {
    pub fn text(analyzer: Option<&str>, boost: Option<f32>) -> Self {
        FieldMappingProperty {
            field_type: FieldType::Text,
            analyzer: analyzer.map(str::to_string),
            boost,
            indexed: true,
            stored: true,
        }
    }

    pub fn keyword() -> Self {
        FieldMappingProperty {
            field_type: FieldType::Keyword,
            analyzer: None,
            boost: None,
            indexed: true,
            stored: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IndexSettings {
    pub refresh_interval_ms: u64,
    pub shard_hint: u32,
}

impl Default for IndexSettings {
    fn default() -> Self {
        IndexSettings {
            refresh_interval_ms: 1_000,
            shard_hint: 1,
        }
    }
}

/// The durable mapping stored per index: field name -> declared properties.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexMapping {
    pub properties: std::collections::HashMap<String, FieldMappingProperty>,
}

/// The full registry record for a named index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub document_count: u64,
    pub settings: IndexSettings,
    pub mapping: IndexMapping,
}

impl IndexMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        IndexMetadata {
            name: name.into(),
            created_at: Utc::now(),
            document_count: 0,
            settings: IndexSettings::default(),
            mapping: IndexMapping::default(),
        }
    }
}
