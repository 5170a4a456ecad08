//! Point-in-time searching.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;
use rayon::prelude::*;

use crate::document::StoredDocument;
use crate::error::{HalberdError, Result};
use crate::index::index::{Index, IndexState};
use crate::query::Query;
use crate::search::collector::{TopDocs, TopDocsCollector};
use crate::search::engine;
use crate::search::similarity::{ClassicSimilarity, Similarity};

/// A searcher over one published state of an [`Index`].
///
/// The searcher pins the segments and deletion sets that were visible when it
/// was opened; later flushes, deletes and merges do not change its results.
/// Global document ids are the segment's doc base plus the local id, in
/// segment order.
///
/// Dropping or [closing](Searcher::close) the searcher releases the snapshot
/// and lets the index delete files of segments nobody uses anymore.
pub struct Searcher {
    index: Arc<Index>,
    state: Arc<IndexState>,
    doc_bases: Vec<u32>,
    similarity: Arc<dyn Similarity>,
}

impl Searcher {
    /// Open a searcher on the currently published state of `index`.
    pub fn new(index: Arc<Index>) -> Self {
        let state = index.snapshot();

        let mut doc_bases = Vec::with_capacity(state.segments().len());
        let mut base = 0u32;
        for entry in state.segments() {
            doc_bases.push(base);
            base += entry.segment.doc_count();
        }

        Searcher {
            index,
            state,
            doc_bases,
            similarity: Arc::new(ClassicSimilarity),
        }
    }

    /// Score with a different similarity.
    pub fn with_similarity(mut self, similarity: Arc<dyn Similarity>) -> Self {
        self.similarity = similarity;
        self
    }

    /// The pinned index state.
    pub fn state(&self) -> &IndexState {
        &self.state
    }

    /// Commit generation the searcher sees.
    pub fn generation(&self) -> u64 {
        self.state.generation()
    }

    /// Number of live documents.
    pub fn num_docs(&self) -> u64 {
        self.state.num_docs()
    }

    /// Number of document ids, deleted ones included.
    pub fn max_doc(&self) -> u64 {
        self.state.max_doc()
    }

    /// Return the best `limit` hits for `query`.
    pub fn search(&self, query: &Query, limit: usize) -> Result<TopDocs> {
        self.search_with_cancel(query, limit, &AtomicBool::new(false))
    }

    /// Like [`search`](Self::search), but gives up with
    /// [`HalberdError::Cancelled`] once `cancel` is set. The flag is checked
    /// before each segment.
    pub fn search_with_cancel(
        &self,
        query: &Query,
        limit: usize,
        cancel: &AtomicBool,
    ) -> Result<TopDocs> {
        let collectors = self
            .state
            .segments()
            .par_iter()
            .zip(self.doc_bases.par_iter())
            .map(|(entry, &base)| {
                if cancel.load(Ordering::Relaxed) {
                    return Err(HalberdError::cancelled("search cancelled"));
                }
                let mut collector = TopDocsCollector::new(limit);
                for (doc, score) in engine::score_docs(entry, query, self.similarity.as_ref()) {
                    collector.collect(base + doc, score);
                }
                Ok(collector)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut top = TopDocsCollector::new(limit);
        for collector in collectors {
            top.merge(collector);
        }
        let top = top.into_top_docs();

        debug!(
            "query '{query}' matched {} doc(s) in {} segment(s)",
            top.total_hits,
            self.doc_bases.len()
        );
        Ok(top)
    }

    /// Number of live documents matching `query`.
    pub fn count(&self, query: &Query) -> Result<usize> {
        Ok(self
            .state
            .segments()
            .par_iter()
            .map(|entry| engine::matching_docs(entry, query).len())
            .sum())
    }

    /// Stored fields of a document, or `None` if the id is unknown or the
    /// document is deleted.
    pub fn document(&self, doc: u32) -> Option<StoredDocument> {
        let index = self.doc_bases.partition_point(|&base| base <= doc).checked_sub(1)?;
        let entry = &self.state.segments()[index];
        let local = doc - self.doc_bases[index];

        if local >= entry.segment.doc_count() || entry.deletions.is_deleted(local) {
            return None;
        }
        entry
            .segment
            .stored_fields(local)
            .map(|fields| StoredDocument::new(fields.to_vec()))
    }

    /// Release the snapshot.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for Searcher {
    fn drop(&mut self) {
        drop(std::mem::take(&mut self.state));
        self.index.reclaim();
    }
}

impl std::fmt::Debug for Searcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Searcher")
            .field("generation", &self.state.generation())
            .field("segments", &self.doc_bases.len())
            .field("similarity", &self.similarity.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, Field, Store};
    use crate::index::config::IndexWriterConfig;
    use crate::storage::memory::MemoryStorage;

    fn index_with(batches: &[&[&str]]) -> Arc<Index> {
        let index = Index::create(Arc::new(MemoryStorage::default())).unwrap();
        let mut writer = index.writer(IndexWriterConfig::default()).unwrap();
        for batch in batches {
            for body in *batch {
                let doc = Document::builder()
                    .add(Field::text("body", *body, Store::Yes))
                    .build();
                writer.add_document(doc).unwrap();
            }
            writer.flush().unwrap();
        }
        writer.close().unwrap();
        index
    }

    #[test]
    fn test_global_ids_across_segments() {
        let index = index_with(&[&["apple", "pear"], &["apple pie"]]);
        let searcher = index.searcher();
        assert_eq!(searcher.max_doc(), 3);

        let top = searcher.search(&Query::term("body", "apple"), 10).unwrap();
        assert_eq!(top.total_hits, 2);
        let mut docs = top.docs();
        docs.sort_unstable();
        assert_eq!(docs, vec![0, 2]);

        let doc = searcher.document(2).unwrap();
        assert_eq!(doc.get_text("body"), Some("apple pie"));
        assert!(searcher.document(3).is_none());
    }

    #[test]
    fn test_limit_and_count() {
        let index = index_with(&[&["x", "x", "x", "y"]]);
        let searcher = index.searcher();
        let top = searcher.search(&Query::term("body", "x"), 2).unwrap();
        assert_eq!(top.total_hits, 3);
        assert_eq!(top.docs(), vec![0, 1]);
        assert_eq!(searcher.count(&Query::MatchAll).unwrap(), 4);
    }

    #[test]
    fn test_cancelled_search() {
        let index = index_with(&[&["x"]]);
        let searcher = index.searcher();
        let cancel = AtomicBool::new(true);
        let err = searcher
            .search_with_cancel(&Query::MatchAll, 10, &cancel)
            .unwrap_err();
        assert!(matches!(err, HalberdError::Cancelled(_)));
    }

    #[test]
    fn test_deleted_document_lookup() {
        let index = index_with(&[&["keep", "drop"]]);
        let mut writer = index.writer(IndexWriterConfig::default()).unwrap();
        writer.delete_by_query(Query::term("body", "drop")).unwrap();
        writer.close().unwrap();

        let searcher = index.searcher();
        assert!(searcher.document(0).is_some());
        assert!(searcher.document(1).is_none());
        assert_eq!(searcher.num_docs(), 1);
    }
}
