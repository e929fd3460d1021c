/// Indexes a handful of documents against the local tiers (hot LRU + embedded
/// KV) and runs a couple of lookups. The remote tier and bulk pipeline need a
/// live MongoDB/Redis to drive; this demo sticks to the synchronous surface
/// that works standalone.
use std::sync::Arc;

use lexidex::analysis::AnalyzerRegistry;
use lexidex::core::types::{Document, DocId, FieldMappingProperty, IndexMapping};
use lexidex::document::DocumentProcessor;
use lexidex::index::term_dictionary::TermDictionary;
use lexidex::indexing::IndexingService;
use lexidex::storage::{DocumentStore, IndexMetadataStore, IndexPatch, KvTier};
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let kv = Arc::new(KvTier::open(dir.path().join("kv.log"))?);
    let analyzers = Arc::new(AnalyzerRegistry::new());

    let metadata_store = IndexMetadataStore::new(kv.clone(), analyzers.clone());
    metadata_store.create_index("products")?;

    let mut mapping = IndexMapping::default();
    mapping.properties.insert("title".into(), FieldMappingProperty::text(Some("standard"), Some(2.0)));
    mapping.properties.insert("description".into(), FieldMappingProperty::text(Some("standard"), Some(1.0)));
    metadata_store.update_index("products", IndexPatch { settings: None, mapping: Some(mapping) })?;

    let service = IndexingService::new(
        DocumentProcessor::new(analyzers),
        Arc::new(TermDictionary::new(10_000)),
        kv.clone(),
        metadata_store,
        DocumentStore::new(kv),
    );

    let documents = vec![
        Document::new(DocId::new("1"), json!({ "title": "Quick brown fox", "description": "Jumps over the lazy dog" })),
        Document::new(DocId::new("2"), json!({ "title": "Lazy cat", "description": "Sleeps all day" })),
    ];

    for document in &documents {
        let outcome = service.index_document("products", document, false)?;
        println!("indexed {}: {} term keys touched", document.id, outcome.dirty_term_keys.len());
    }

    let fox_postings = service.snapshot_postings("products:title:fox");
    println!("postings for products:title:fox = {}", fox_postings.size());

    service.remove_document("products", &DocId::new("2"))?;
    println!("removed document 2");

    Ok(())
}
