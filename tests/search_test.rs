//! Integration tests for indexing and searching: stored fields, boolean
//! semantics, ranking, numeric ranges and parsed queries.

use std::sync::Arc;

use halberd::analysis::{Analyzer, KeywordAnalyzer, PerFieldAnalyzer, StandardAnalyzer};
use halberd::document::{Document, Field, FieldOption, FieldValue, Store};
use halberd::index::{Index, IndexWriterConfig};
use halberd::query::{Query, QueryParser};
use halberd::storage::memory::MemoryStorageConfig;
use halberd::storage::{StorageConfig, StorageFactory};

fn memory_index() -> Arc<Index> {
    let storage =
        StorageFactory::create(StorageConfig::Memory(MemoryStorageConfig::default())).unwrap();
    Index::create(storage).unwrap()
}

fn index_bodies(bodies: &[&str]) -> Arc<Index> {
    let index = memory_index();
    let mut writer = index.writer(IndexWriterConfig::default()).unwrap();
    for (i, body) in bodies.iter().enumerate() {
        let doc = Document::builder()
            .add_string("id", i.to_string(), Store::Yes)
            .add_text("body", *body, Store::No)
            .build();
        writer.add_document(doc).unwrap();
    }
    writer.close().unwrap();
    index
}

#[test]
fn test_stored_fields_round_trip() {
    let index = memory_index();
    let mut writer = index.writer(IndexWriterConfig::default()).unwrap();

    let doc = Document::builder()
        .add_text("name", "Lucene in Action", Store::Yes)
        .add_string("path", "/docs/lucene.txt", Store::Yes)
        .add_integer("size", 4096, Store::Yes)
        .add_stored("note", "only stored")
        .add_text("content", "not kept", Store::No)
        .add(Field::new(
            "ignored",
            FieldValue::from("nowhere"),
            FieldOption {
                indexed: false,
                tokenized: false,
                stored: false,
            },
        ))
        .build();
    writer.add_document(doc).unwrap();
    writer.commit().unwrap();

    let searcher = index.searcher();
    let top = searcher.search(&Query::term("name", "lucene"), 10).unwrap();
    assert_eq!(top.total_hits, 1);

    let stored = searcher.document(top.score_docs[0].doc).unwrap();
    assert_eq!(stored.get_text("name"), Some("Lucene in Action"));
    assert_eq!(stored.get_text("path"), Some("/docs/lucene.txt"));
    assert_eq!(stored.get_integer("size"), Some(4096));
    assert_eq!(stored.get_text("note"), Some("only stored"));
    assert!(stored.get("content").is_none());
    assert!(stored.get("ignored").is_none());

    // Untokenized fields match only on the whole value; stored-only
    // fields are not searchable.
    assert_eq!(searcher.count(&Query::term("path", "/docs/lucene.txt")).unwrap(), 1);
    assert_eq!(searcher.count(&Query::term("path", "lucene")).unwrap(), 0);
    assert_eq!(searcher.count(&Query::term("note", "stored")).unwrap(), 0);
    assert_eq!(searcher.count(&Query::integer("size", 4096)).unwrap(), 1);
}

#[test]
fn test_must_minus_must_not() {
    let index = index_bodies(&["even", "odd", "even", "odd three", "even", "odd"]);
    let searcher = index.searcher();

    let query = Query::builder()
        .must(Query::term("body", "odd"))
        .must_not(Query::term("body", "three"))
        .build();
    let mut docs = searcher.search(&query, 10).unwrap().docs();
    docs.sort_unstable();
    assert_eq!(docs, vec![1, 5]);
}

#[test]
fn test_should_union_ranks_double_match_first() {
    let index = index_bodies(&["apache", "lucene apache", "lucene", "other"]);
    let searcher = index.searcher();

    let query = Query::builder()
        .should(Query::term("body", "lucene"))
        .should(Query::term("body", "apache"))
        .build();
    let top = searcher.search(&query, 10).unwrap();
    assert_eq!(top.total_hits, 3);
    assert_eq!(top.docs(), vec![1, 0, 2]);
    assert!(top.score_docs[0].score > top.score_docs[1].score);
    assert_eq!(top.score_docs[1].score, top.score_docs[2].score);
}

#[test]
fn test_numeric_range_half_open() {
    let index = memory_index();
    let mut writer = index.writer(IndexWriterConfig::default()).unwrap();
    for size in [999, 1000, 5000, 10000, 10001] {
        writer
            .add_document(Document::builder().add_integer("size", size, Store::Yes).build())
            .unwrap();
    }
    writer.commit().unwrap();

    let searcher = index.searcher();
    let query = Query::numeric_range("size", Some(1000), Some(10000), false, true);
    let top = searcher.search(&query, 10).unwrap();

    let mut sizes: Vec<i64> = top
        .score_docs
        .iter()
        .filter_map(|hit| searcher.document(hit.doc)?.get_integer("size"))
        .collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![5000, 10000]);
    assert!(top.score_docs.iter().all(|hit| hit.score == 1.0));
}

#[test]
fn test_tokenization_is_idempotent() {
    let analyzer = StandardAnalyzer::new();
    let text = "The Quick brown fox, jumping over 2 lazy dogs!";
    let first: Vec<String> = analyzer.analyze(text).unwrap().map(|t| t.text).collect();
    let second: Vec<String> = analyzer.analyze(text).unwrap().map(|t| t.text).collect();
    assert_eq!(first, second);
    assert!(!first.is_empty());
}

#[test]
fn test_parsed_queries_over_two_fields() {
    let index = memory_index();
    let mut writer = index.writer(IndexWriterConfig::default()).unwrap();
    let docs = [
        ("mybatis guide", "mybatis is a persistence framework"),
        ("apache lucene", "lucene is an apache project"),
        ("spring notes", "spring wires beans"),
    ];
    for (name, content) in docs {
        writer
            .add_document(
                Document::builder()
                    .add_text("name", name, Store::Yes)
                    .add_text("content", content, Store::Yes)
                    .build(),
            )
            .unwrap();
    }
    writer.commit().unwrap();
    let searcher = index.searcher();
    let analyzer: Arc<dyn Analyzer> = Arc::new(StandardAnalyzer::new());

    let parser = QueryParser::new("content", analyzer.clone());
    let query = parser.parse("mybatis is a apache project").unwrap();
    assert_eq!(searcher.count(&query).unwrap(), 2);

    let query = parser.parse("+name:lucene +name:apache").unwrap();
    assert_eq!(searcher.search(&query, 10).unwrap().docs(), vec![1]);

    let query = parser.parse("name:lucene AND name:apache").unwrap();
    assert_eq!(searcher.search(&query, 10).unwrap().docs(), vec![1]);

    let query = parser.parse("spring -beans").unwrap();
    assert_eq!(searcher.count(&query).unwrap(), 0);

    let multi = QueryParser::multi_field(["name", "content"], analyzer);
    let top = searcher
        .search(&multi.parse("spring OR persistence").unwrap(), 10)
        .unwrap();
    let mut found = top.docs();
    found.sort_unstable();
    assert_eq!(found, vec![0, 2]);
}

#[test]
fn test_per_field_analyzer_keeps_ids_whole() {
    let mut per_field = PerFieldAnalyzer::new(Arc::new(StandardAnalyzer::new()));
    per_field.add_analyzer("id", Arc::new(KeywordAnalyzer::new()));
    let analyzer: Arc<dyn Analyzer> = Arc::new(per_field);
    let index = memory_index();
    let mut writer = index
        .writer(IndexWriterConfig::with_analyzer(analyzer.clone()))
        .unwrap();
    writer
        .add_document(
            Document::builder()
                .add_text("id", "AB-12", Store::Yes)
                .add_text("body", "Mixed Case", Store::No)
                .build(),
        )
        .unwrap();
    writer.commit().unwrap();

    let searcher = index.searcher();
    let parser = QueryParser::new("body", analyzer);
    assert_eq!(searcher.count(&parser.parse("id:AB-12").unwrap()).unwrap(), 1);
    assert_eq!(searcher.count(&parser.parse("CASE").unwrap()).unwrap(), 1);
}

#[test]
fn test_match_all_and_empty_index() {
    let index = memory_index();
    let searcher = index.searcher();
    let top = searcher.search(&Query::MatchAll, 10).unwrap();
    assert_eq!(top.total_hits, 0);
    assert!(searcher.document(0).is_none());

    let index = index_bodies(&["a1", "b2", "c3"]);
    assert_eq!(index.searcher().count(&Query::MatchAll).unwrap(), 3);
}

#[test]
fn test_range_ignores_text_values_in_numeric_field() {
    let index = memory_index();
    let mut writer = index.writer(IndexWriterConfig::default()).unwrap();
    writer
        .add_document(Document::builder().add_integer("size", 4096, Store::No).build())
        .unwrap();
    writer
        .add_document(Document::builder().add_string("size", "big", Store::No).build())
        .unwrap();
    writer.commit().unwrap();

    let searcher = index.searcher();
    let query = Query::numeric_range("size", None, Some(5000), true, true);
    assert_eq!(searcher.search(&query, 10).unwrap().docs(), vec![0]);
}
