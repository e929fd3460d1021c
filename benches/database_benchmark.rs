use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lexidex::analysis::AnalyzerRegistry;
use lexidex::core::types::{Document, DocId, FieldMappingProperty, IndexMapping};
use lexidex::document::DocumentProcessor;
use lexidex::index::term_dictionary::TermDictionary;
use lexidex::indexing::IndexingService;
use lexidex::storage::{DocumentStore, IndexMetadataStore, IndexPatch, KvTier};
use serde_json::json;
use tempfile::tempdir;

const WORDS: &[&str] = &["the", "quick", "brown", "fox", "jumps", "over", "lazy", "dog"];

fn content(id: usize, words: usize) -> String {
    (0..words).map(|i| WORDS[(id + i) % WORDS.len()]).collect::<Vec<_>>().join(" ")
}

fn harness() -> (tempfile::TempDir, IndexingService) {
    let dir = tempdir().unwrap();
    let kv = Arc::new(KvTier::open(dir.path().join("kv.log")).unwrap());
    let analyzers = Arc::new(AnalyzerRegistry::new());
    let metadata_store = IndexMetadataStore::new(kv.clone(), analyzers.clone());
    metadata_store.create_index("bench").unwrap();

    let mut mapping = IndexMapping::default();
    mapping.properties.insert("title".into(), FieldMappingProperty::text(Some("standard"), None));
    mapping.properties.insert("content".into(), FieldMappingProperty::text(Some("standard"), None));
    metadata_store
        .update_index("bench", IndexPatch { settings: None, mapping: Some(mapping) })
        .unwrap();

    let service = IndexingService::new(
        DocumentProcessor::new(analyzers),
        Arc::new(TermDictionary::new(1_000_000)),
        kv.clone(),
        metadata_store,
        DocumentStore::new(kv),
    );
    (dir, service)
}

fn bench_analyzer_throughput(c: &mut Criterion) {
    let registry = AnalyzerRegistry::new();
    let text = content(0, 200);

    c.bench_function("standard_analyzer_200_words", |b| {
        b.iter(|| registry.analyze("standard", black_box(&text)).unwrap());
    });
}

fn bench_single_document_index(c: &mut Criterion) {
    let (_dir, service) = harness();

    c.bench_function("index_single_document", |b| {
        let mut id = 0u64;
        b.iter(|| {
            let document = Document::new(
                DocId::new(id.to_string()),
                json!({ "title": format!("Document {id}"), "content": content(id as usize, 100) }),
            );
            service.index_document("bench", black_box(&document), false).unwrap();
            id += 1;
        });
    });
}

fn bench_batch_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_index");

    for batch_size in [10usize, 50, 100, 500].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(batch_size), batch_size, |b, &batch_size| {
            let (_dir, service) = harness();
            let mut id_counter = 0u64;

            b.iter(|| {
                for _ in 0..batch_size {
                    let document = Document::new(
                        DocId::new(id_counter.to_string()),
                        json!({ "title": format!("Document {id_counter}"), "content": content(id_counter as usize, 100) }),
                    );
                    service.index_document("bench", &document, true).unwrap();
                    id_counter += 1;
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_analyzer_throughput, bench_single_document_index, bench_batch_index);
criterion_main!(benches);
