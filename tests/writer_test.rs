//! Integration tests for the index writer: deletes, updates, locking,
//! snapshot isolation and merge reclamation.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use halberd::document::{Document, Store};
use halberd::error::HalberdError;
use halberd::index::{Index, IndexWriterConfig, Term};
use halberd::query::Query;
use halberd::storage::Storage;
use halberd::storage::memory::MemoryStorage;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn doc(id: &str, body: &str) -> Document {
    Document::builder()
        .add_string("id", id, Store::Yes)
        .add_text("body", body, Store::Yes)
        .build()
}

fn segment_files(storage: &dyn Storage) -> Vec<String> {
    let mut files: Vec<String> = storage
        .list_files()
        .unwrap()
        .into_iter()
        .filter(|name| name.starts_with("segment_") && name.ends_with(".dict"))
        .collect();
    files.sort();
    files
}

#[test]
fn test_delete_then_search() {
    let index = Index::create(Arc::new(MemoryStorage::default())).unwrap();
    let mut writer = index.writer(IndexWriterConfig::default()).unwrap();
    writer.add_document(doc("1", "lucene in action")).unwrap();
    writer.add_document(doc("2", "lucene for dummies")).unwrap();
    writer.commit().unwrap();

    writer.delete_by_term(Term::text("id", "1")).unwrap();
    writer.commit().unwrap();

    let searcher = index.searcher();
    let top = searcher.search(&Query::term("body", "lucene"), 10).unwrap();
    assert_eq!(top.total_hits, 1);
    let stored = searcher.document(top.score_docs[0].doc).unwrap();
    assert_eq!(stored.get_text("id"), Some("2"));
    assert_eq!(searcher.num_docs(), 1);
    assert_eq!(searcher.max_doc(), 2);
}

#[test]
fn test_update_replaces_document() {
    let index = Index::create(Arc::new(MemoryStorage::default())).unwrap();
    let mut writer = index.writer(IndexWriterConfig::default()).unwrap();
    writer.add_document(doc("1", "old text")).unwrap();
    writer.commit().unwrap();

    writer
        .update_document(Query::term("id", "1"), doc("1", "new text"))
        .unwrap();
    writer.commit().unwrap();

    let searcher = index.searcher();
    assert_eq!(searcher.count(&Query::term("id", "1")).unwrap(), 1);
    assert_eq!(searcher.count(&Query::term("body", "old")).unwrap(), 0);
    assert_eq!(searcher.count(&Query::term("body", "new")).unwrap(), 1);
}

#[test]
fn test_delete_all_then_add() {
    let index = Index::create(Arc::new(MemoryStorage::default())).unwrap();
    let mut writer = index.writer(IndexWriterConfig::default()).unwrap();
    writer.add_document(doc("1", "first")).unwrap();
    writer.commit().unwrap();

    writer.delete_all().unwrap();
    writer.add_document(doc("2", "second")).unwrap();
    writer.commit().unwrap();

    let searcher = index.searcher();
    assert_eq!(searcher.count(&Query::MatchAll).unwrap(), 1);
    assert_eq!(searcher.count(&Query::term("id", "2")).unwrap(), 1);
}

#[test]
fn test_second_writer_conflicts() {
    let index = Index::create(Arc::new(MemoryStorage::default())).unwrap();
    let writer = index.writer(IndexWriterConfig::default()).unwrap();

    let mut config = IndexWriterConfig::default();
    config.lock_timeout = Some(Duration::from_millis(30));
    let err = index.writer(config).unwrap_err();
    assert!(matches!(err, HalberdError::LockConflict(_)));

    writer.close().unwrap();
    assert!(index.writer(IndexWriterConfig::default()).is_ok());
}

#[test]
fn test_snapshot_isolation() {
    init_logger();
    let index = Index::create(Arc::new(MemoryStorage::default())).unwrap();
    let mut writer = index.writer(IndexWriterConfig::default()).unwrap();
    writer.add_document(doc("1", "shared")).unwrap();
    writer.add_document(doc("2", "shared")).unwrap();
    writer.commit().unwrap();

    let before = index.searcher();

    writer.add_document(doc("3", "shared")).unwrap();
    writer.delete_by_term(Term::text("id", "1")).unwrap();
    writer.commit().unwrap();
    writer.force_merge().unwrap();

    let query = Query::term("body", "shared");
    assert_eq!(before.count(&query).unwrap(), 2);
    assert!(before.document(0).is_some());
    assert_eq!(before.document(0).unwrap().get_text("id"), Some("1"));

    let after = index.searcher();
    assert_eq!(after.count(&query).unwrap(), 2);
    assert_eq!(after.state().segments().len(), 1);
    let ids: Vec<String> = (0..2)
        .filter_map(|doc| after.document(doc)?.get_text("id").map(String::from))
        .collect();
    assert_eq!(ids, vec!["2", "3"]);
}

#[test]
fn test_merge_reclaims_after_searcher_close() {
    init_logger();
    let storage = Arc::new(MemoryStorage::default());
    let index = Index::create(storage.clone()).unwrap();
    let mut writer = index.writer(IndexWriterConfig::default()).unwrap();
    for i in 0..3 {
        writer.add_document(doc(&i.to_string(), "word")).unwrap();
        writer.flush().unwrap();
    }
    assert_eq!(segment_files(storage.as_ref()).len(), 3);

    let searcher = index.searcher();
    writer.force_merge().unwrap();

    // The open searcher still holds the three merged-away segments.
    assert_eq!(segment_files(storage.as_ref()).len(), 4);
    assert_eq!(index.retired_count(), 3);
    assert_eq!(searcher.count(&Query::term("body", "word")).unwrap(), 3);

    searcher.close();
    assert_eq!(index.retired_count(), 0);
    assert_eq!(segment_files(storage.as_ref()), vec!["segment_000003.dict"]);
    assert_eq!(index.searcher().count(&Query::MatchAll).unwrap(), 3);
}

#[test]
fn test_batch_add_with_cancel() {
    let index = Index::create(Arc::new(MemoryStorage::default())).unwrap();
    let mut writer = index.writer(IndexWriterConfig::default()).unwrap();

    let report = writer
        .add_documents(vec![doc("1", "a1"), doc("2", "b2")])
        .unwrap();
    assert_eq!(report.added, 2);
    assert!(report.is_complete());

    let cancel = AtomicBool::new(true);
    let report = writer
        .add_documents_with_cancel(vec![doc("3", "c3")], &cancel)
        .unwrap();
    assert!(report.cancelled);
    assert_eq!(report.added, 0);

    writer.commit().unwrap();
    assert_eq!(index.num_docs(), 2);
}
