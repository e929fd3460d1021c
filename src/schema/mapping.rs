use std::collections::HashMap;

use serde_json::Value;

use crate::core::types::IndexMapping;

/// A field's resolved runtime properties: which analyzer to run, whether the
/// field is indexed/stored, and its scoring weight.
#[derive(Debug, Clone)]
pub struct DocumentFieldMapping {
    pub analyzer: Option<String>,
    pub indexed: bool,
    pub stored: bool,
    pub weight: f32,
}

impl DocumentFieldMapping {
    fn from_property(prop: &crate::core::types::FieldMappingProperty) -> Self {
        DocumentFieldMapping {
            analyzer: prop.analyzer.clone(),
            indexed: prop.indexed,
            stored: prop.stored,
            weight: prop.boost.unwrap_or(1.0),
        }
    }

    fn auto_text() -> Self {
        DocumentFieldMapping {
            analyzer: Some("standard".to_string()),
            indexed: true,
            stored: true,
            weight: 1.0,
        }
    }

    fn auto_keyword() -> Self {
        DocumentFieldMapping {
            analyzer: Some("keyword".to_string()),
            indexed: true,
            stored: true,
            weight: 1.0,
        }
    }
}

/// The flattened runtime mapping a document processor reads from: field name
/// (dot-joined for nested objects) -> resolved properties.
#[derive(Debug, Clone, Default)]
pub struct RuntimeMapping {
    pub fields: HashMap<String, DocumentFieldMapping>,
}

impl RuntimeMapping {
    /// Converts a declared index mapping into its runtime form.
    pub fn from_index_mapping(mapping: &IndexMapping) -> Self {
        let fields = mapping
            .properties
            .iter()
            .map(|(name, prop)| (name.clone(), DocumentFieldMapping::from_property(prop)))
            .collect();
        RuntimeMapping { fields }
    }

    /// Derives a mapping from a sample document when no mapping is configured:
    /// strings -> standard analyzer, numbers/booleans/arrays-of-strings -> keyword,
    /// nested objects recursed with dot-joined paths.
    pub fn auto_detect(sample: &Value) -> Self {
        let mut fields = HashMap::new();
        if let Value::Object(map) = sample {
            Self::detect_into(&mut fields, map, "");
        }
        RuntimeMapping { fields }
    }

    fn detect_into(fields: &mut HashMap<String, DocumentFieldMapping>, map: &serde_json::Map<String, Value>, prefix: &str) {
        for (key, value) in map {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };

            match value {
                Value::String(_) => {
                    fields.insert(path, DocumentFieldMapping::auto_text());
                }
                Value::Number(_) | Value::Bool(_) => {
                    fields.insert(path, DocumentFieldMapping::auto_keyword());
                }
                Value::Array(items) => {
                    if items.iter().all(|v| v.is_string()) {
                        fields.insert(path, DocumentFieldMapping::auto_keyword());
                    } else {
                        fields.insert(path, DocumentFieldMapping::auto_text());
                    }
                }
                Value::Object(nested) => {
                    Self::detect_into(fields, nested, &path);
                }
                Value::Null => {}
            }
        }
    }

    pub fn get(&self, field: &str) -> Option<&DocumentFieldMapping> {
        self.fields.get(field)
    }
}
