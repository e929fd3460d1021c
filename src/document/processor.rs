use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::analysis::AnalyzerRegistry;
use crate::core::error::{Error, Result};
use crate::core::types::Document;
use crate::document::processed::{ProcessedDocument, ProcessedField};
use crate::schema::RuntimeMapping;

/// Resolves field values out of a document's JSON source, normalizes them to
/// text, and runs each through its analyzer to produce terms/frequencies/positions.
pub struct DocumentProcessor {
    analyzers: Arc<AnalyzerRegistry>,
}

impl DocumentProcessor {
    pub fn new(analyzers: Arc<AnalyzerRegistry>) -> Self {
        DocumentProcessor { analyzers }
    }

    /// Processes a document against a runtime mapping. If the mapping is empty,
    /// a mapping is auto-detected from the document itself first.
    pub fn process(&self, document: &Document, mapping: &RuntimeMapping) -> Result<ProcessedDocument> {
        let effective_mapping;
        let mapping = if mapping.fields.is_empty() {
            effective_mapping = RuntimeMapping::auto_detect(&document.source);
            &effective_mapping
        } else {
            mapping
        };

        let mut fields = HashMap::new();
        let mut field_lengths = HashMap::new();

        for (field_name, field_mapping) in &mapping.fields {
            if !field_mapping.indexed {
                continue;
            }

            let Some(raw) = resolve_path(&document.source, field_name) else {
                continue;
            };

            let normalized = normalize_value(&raw);
            let analyzer_name = field_mapping.analyzer.as_deref().unwrap_or("standard");
            let analyzer = self
                .analyzers
                .get(analyzer_name)
                .ok_or_else(|| Error::not_found(format!("analyzer '{analyzer_name}' not found for field '{field_name}'")))?;

            let tokens = analyzer.analyze(&normalized);

            let mut terms = Vec::with_capacity(tokens.len());
            let mut term_frequencies: HashMap<String, u32> = HashMap::new();
            let mut positions: HashMap<String, Vec<u32>> = HashMap::new();

            for token in &tokens {
                terms.push(token.text.clone());
                *term_frequencies.entry(token.text.clone()).or_insert(0) += 1;
                positions.entry(token.text.clone()).or_default().push(token.position);
            }

            let length = terms.len() as u32;
            field_lengths.insert(field_name.clone(), length);
            fields.insert(
                field_name.clone(),
                ProcessedField {
                    original: normalized,
                    terms,
                    term_frequencies,
                    length,
                    positions,
                },
            );
        }

        Ok(ProcessedDocument {
            id: document.id.clone(),
            source: document.source.clone(),
            fields,
            field_lengths,
        })
    }
}

/// Descends a dot-joined path (`"address.city"`) into a JSON value.
/// A missing segment at any depth yields `None`.
fn resolve_path<'a>(source: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = source;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Normalizes a resolved JSON value to the text an analyzer consumes:
/// strings are trimmed, numbers/booleans become their canonical string form,
/// dates (RFC 3339 strings are passed through as-is by `resolve_path` already),
/// arrays are space-joined normalized elements with empties filtered, and
/// objects serialize to JSON.
fn normalize_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .map(normalize_value)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        Value::Object(_) => value.to_string(),
        Value::Null => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DocId;
    use serde_json::json;

    fn processor() -> DocumentProcessor {
        DocumentProcessor::new(Arc::new(AnalyzerRegistry::new()))
    }

    #[test]
    fn processes_mapped_text_field_with_standard_analyzer() {
        let document = Document::new(DocId::new("doc-1"), json!({ "title": "The quick brown fox" }));
        let mut mapping = RuntimeMapping::default();
        mapping.fields.insert(
            "title".to_string(),
            crate::schema::DocumentFieldMapping {
                analyzer: Some("standard".to_string()),
                indexed: true,
                stored: true,
                weight: 1.0,
            },
        );

        let processed = processor().process(&document, &mapping).unwrap();
        let field = &processed.fields["title"];
        assert_eq!(field.terms, vec!["quick", "brown", "fox"]);
        assert_eq!(field.length, 3);
        assert_eq!(processed.field_lengths["title"], 3);
    }

    #[test]
    fn missing_field_is_skipped_not_errored() {
        let document = Document::new(DocId::new("doc-2"), json!({}));
        let mut mapping = RuntimeMapping::default();
        mapping.fields.insert(
            "title".to_string(),
            crate::schema::DocumentFieldMapping {
                analyzer: Some("standard".to_string()),
                indexed: true,
                stored: true,
                weight: 1.0,
            },
        );

        let processed = processor().process(&document, &mapping).unwrap();
        assert!(!processed.fields.contains_key("title"));
    }

    #[test]
    fn auto_detects_mapping_when_none_configured() {
        let document = Document::new(DocId::new("doc-3"), json!({ "name": "Ada Lovelace", "age": 36 }));
        let processed = processor().process(&document, &RuntimeMapping::default()).unwrap();
        assert!(processed.fields.contains_key("name"));
        assert!(processed.fields.contains_key("age"));
    }

    #[test]
    fn dot_path_resolves_nested_objects() {
        let document = Document::new(DocId::new("doc-4"), json!({ "address": { "city": "Lagos" } }));
        let mut mapping = RuntimeMapping::default();
        mapping.fields.insert(
            "address.city".to_string(),
            crate::schema::DocumentFieldMapping {
                analyzer: Some("keyword".to_string()),
                indexed: true,
                stored: true,
                weight: 1.0,
            },
        );

        let processed = processor().process(&document, &mapping).unwrap();
        assert_eq!(processed.fields["address.city"].terms, vec!["lagos"]);
    }
}
