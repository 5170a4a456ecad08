//! The index writer.
//!
//! There is at most one writer per index, enforced by the `write.lock` lock
//! from the storage's lock manager. The writer analyzes documents into an
//! in-memory buffer and records deletions as pending. Nothing it does is
//! visible to searchers until [`IndexWriter::flush`], which builds a segment
//! from the buffer, applies pending deletions as new deletion-set
//! generations, commits a manifest and publishes the new state in one step.
//!
//! ```
//! use halberd::document::{Document, Store};
//! use halberd::index::{Index, IndexWriterConfig};
//! use halberd::query::Query;
//! use halberd::storage::memory::MemoryStorage;
//! use std::sync::Arc;
//!
//! # fn main() -> halberd::error::Result<()> {
//! let index = Index::create(Arc::new(MemoryStorage::default()))?;
//! let mut writer = index.writer(IndexWriterConfig::default())?;
//!
//! writer.add_document(
//!     Document::builder()
//!         .add_string("id", "1", Store::Yes)
//!         .add_text("body", "Lucene in Action", Store::No)
//!         .build(),
//! )?;
//! writer.commit()?;
//!
//! let searcher = index.searcher();
//! assert_eq!(searcher.count(&Query::term("body", "lucene"))?, 1);
//! writer.close()?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::document::{Document, FieldValue, StoredField};
use crate::error::{HalberdError, Result};
use crate::index::config::IndexWriterConfig;
use crate::index::index::{Index, IndexState, Retired, SegmentEntry, WRITE_LOCK};
use crate::index::merge::{LogMergePolicy, MergePolicy, merge_segments};
use crate::index::segment::{AnalyzedDocument, SegmentBuilder};
use crate::index::term::Term;
use crate::query::Query;
use crate::search::engine;
use crate::storage::StorageLock;

const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Outcome of a batch add.
#[derive(Debug, Default)]
pub struct AddReport {
    /// Number of documents buffered.
    pub added: usize,
    /// Documents skipped because of analysis errors, by batch position.
    pub failed: Vec<(usize, HalberdError)>,
    /// Whether the batch stopped early because it was cancelled.
    pub cancelled: bool,
}

impl AddReport {
    /// Check if every document of the batch was added.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }
}

/// A delete recorded before flush. It applies to every visible segment and
/// to the first `doc_upto` buffered documents.
#[derive(Debug)]
struct PendingDelete {
    query: Query,
    doc_upto: usize,
}

/// Writer for an [`Index`].
pub struct IndexWriter {
    index: Arc<Index>,
    config: IndexWriterConfig,
    merge_policy: Box<dyn MergePolicy>,
    lock: Option<Box<dyn StorageLock>>,
    buffer: Vec<AnalyzedDocument>,
    pending_deletes: Vec<PendingDelete>,
    delete_all: bool,
}

impl std::fmt::Debug for IndexWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexWriter")
            .field("config", &self.config)
            .field("merge_policy", &self.merge_policy)
            .field("open", &self.lock.is_some())
            .field("buffered_docs", &self.buffer.len())
            .field("pending_deletes", &self.pending_deletes.len())
            .field("delete_all", &self.delete_all)
            .finish()
    }
}

impl IndexWriter {
    /// Open a writer, taking the write lock.
    ///
    /// Use [`Index::writer`] instead of calling this directly.
    pub fn new(index: Arc<Index>, config: IndexWriterConfig) -> Result<Self> {
        let lock = acquire_write_lock(&index, config.lock_timeout)?;

        // Another Index instance may have committed since this one was opened.
        index.refresh()?;
        let removed = index.remove_unreferenced_files()?;
        if removed > 0 {
            info!("removed {removed} unreferenced index file(s)");
        }

        let merge_policy = Box::new(LogMergePolicy::new(config.merge_factor));
        debug!("opened index writer with {config:?}");

        Ok(IndexWriter {
            index,
            config,
            merge_policy,
            lock: Some(lock),
            buffer: Vec::new(),
            pending_deletes: Vec::new(),
            delete_all: false,
        })
    }

    /// Replace the merge policy used after each flush.
    pub fn set_merge_policy(&mut self, policy: Box<dyn MergePolicy>) {
        self.merge_policy = policy;
    }

    /// The index this writer writes to.
    pub fn index(&self) -> &Arc<Index> {
        &self.index
    }

    /// The writer configuration.
    pub fn config(&self) -> &IndexWriterConfig {
        &self.config
    }

    /// Number of buffered, unflushed documents.
    pub fn buffered_docs(&self) -> usize {
        self.buffer.len()
    }

    /// Number of recorded, unflushed delete queries.
    pub fn pending_deletes(&self) -> usize {
        self.pending_deletes.len()
    }

    /// Check if the writer is still open.
    pub fn is_open(&self) -> bool {
        self.lock.is_some()
    }

    /// Analyze and buffer a document.
    ///
    /// Flushes automatically once `max_buffered_docs` documents are buffered.
    /// On an analysis error nothing is buffered.
    pub fn add_document(&mut self, doc: Document) -> Result<()> {
        self.ensure_open()?;
        let analyzed = self.analyze(&doc)?;
        self.buffer.push(analyzed);
        self.maybe_auto_flush()
    }

    /// Add a batch of documents, skipping documents that fail analysis.
    ///
    /// Storage errors from automatic flushes abort the batch.
    pub fn add_documents<I>(&mut self, docs: I) -> Result<AddReport>
    where
        I: IntoIterator<Item = Document>,
    {
        self.add_documents_with_cancel(docs, &AtomicBool::new(false))
    }

    /// Like [`IndexWriter::add_documents`], checking `cancel` before each
    /// document. Documents added before cancellation stay buffered.
    pub fn add_documents_with_cancel<I>(&mut self, docs: I, cancel: &AtomicBool) -> Result<AddReport>
    where
        I: IntoIterator<Item = Document>,
    {
        let mut report = AddReport::default();
        for (position, doc) in docs.into_iter().enumerate() {
            if cancel.load(Ordering::Relaxed) {
                debug!("batch add cancelled after {position} document(s)");
                report.cancelled = true;
                break;
            }
            match self.add_document(doc) {
                Ok(()) => report.added += 1,
                Err(e) if e.is_document_scoped() => {
                    warn!("skipping document {position}: {e}");
                    report.failed.push((position, e));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }

    /// Delete every document: all visible segments are dropped at the next
    /// flush, and the buffer and pending deletes are discarded now.
    pub fn delete_all(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.buffer.clear();
        self.pending_deletes.clear();
        self.delete_all = true;
        Ok(())
    }

    /// Delete documents matching `query` at the next flush.
    ///
    /// Applies to committed documents and to documents buffered before this
    /// call, not to documents added after it.
    pub fn delete_by_query(&mut self, query: Query) -> Result<()> {
        self.ensure_open()?;
        self.pending_deletes.push(PendingDelete {
            query,
            doc_upto: self.buffer.len(),
        });
        Ok(())
    }

    /// Delete documents containing `term` at the next flush.
    pub fn delete_by_term(&mut self, term: Term) -> Result<()> {
        self.delete_by_query(Query::from(term))
    }

    /// Replace documents matching `query` with `doc`. Both the delete and the
    /// add become visible together at the next flush.
    pub fn update_document(&mut self, query: Query, doc: Document) -> Result<()> {
        self.ensure_open()?;
        let analyzed = self.analyze(&doc)?;
        self.pending_deletes.push(PendingDelete {
            query,
            doc_upto: self.buffer.len(),
        });
        self.buffer.push(analyzed);
        self.maybe_auto_flush()
    }

    /// Make buffered documents and pending deletes visible.
    ///
    /// On failure nothing becomes visible and the buffer is kept, so the
    /// flush can be retried.
    pub fn flush(&mut self) -> Result<()> {
        self.ensure_lock_valid()?;
        if self.flush_buffer()? {
            self.maybe_merge()?;
            self.after_publish();
        }
        Ok(())
    }

    /// Alias for [`IndexWriter::flush`].
    pub fn commit(&mut self) -> Result<()> {
        self.flush()
    }

    /// Flush, then merge all segments into one holding only live documents.
    pub fn force_merge(&mut self) -> Result<()> {
        self.flush()?;

        let state = self.index.snapshot();
        let segments = state.segments();
        let needs_merge = segments.len() > 1
            || segments
                .first()
                .is_some_and(|entry| entry.deletions.has_deletions());
        if needs_merge {
            self.merge_range(&state, 0..segments.len())?;
            drop(state);
            self.after_publish();
        }
        Ok(())
    }

    /// Discard buffered documents and pending deletes.
    pub fn rollback(&mut self) -> Result<()> {
        self.ensure_open()?;
        debug!(
            "rolling back {} buffered document(s) and {} pending delete(s)",
            self.buffer.len(),
            self.pending_deletes.len()
        );
        self.buffer.clear();
        self.pending_deletes.clear();
        self.delete_all = false;
        Ok(())
    }

    /// Flush and release the write lock.
    ///
    /// The lock is released even if the flush fails.
    pub fn close(mut self) -> Result<()> {
        let flushed = self.flush();
        let released = self.release_lock();
        flushed.and(released)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.lock.is_none() {
            return Err(HalberdError::index("index writer is closed"));
        }
        Ok(())
    }

    /// Like `ensure_open`, and also checks that the lock was not removed
    /// behind the writer's back. Checked before anything is committed.
    fn ensure_lock_valid(&self) -> Result<()> {
        self.ensure_open()?;
        match &self.lock {
            Some(lock) if !lock.is_valid() => Err(HalberdError::lock_conflict(format!(
                "{} is no longer held by this writer",
                lock.name()
            ))),
            _ => Ok(()),
        }
    }

    fn release_lock(&mut self) -> Result<()> {
        if let Some(mut lock) = self.lock.take() {
            lock.release()?;
            debug!("released {}", lock.name());
        }
        Ok(())
    }

    fn maybe_auto_flush(&mut self) -> Result<()> {
        if self.buffer.len() >= self.config.max_buffered_docs {
            debug!("auto-flushing {} buffered document(s)", self.buffer.len());
            self.flush()?;
        }
        Ok(())
    }

    /// Turn a document into terms and stored values.
    fn analyze(&self, doc: &Document) -> Result<AnalyzedDocument> {
        let mut analyzed = AnalyzedDocument::default();

        for field in doc.fields() {
            let name = field.name();
            if field.is_indexed() {
                match field.value() {
                    FieldValue::Text(text) if field.is_tokenized() => {
                        let tokens = self
                            .config
                            .analyzer
                            .analyze_field(name, text)
                            .map_err(|e| match e {
                                HalberdError::Analysis(msg) => {
                                    HalberdError::analysis(format!("field '{name}': {msg}"))
                                }
                                other => other,
                            })?;
                        analyzed.terms.extend(
                            tokens
                                .filter(|token| !token.is_stopped() && !token.is_empty())
                                .map(|token| Term::text(name, token.text)),
                        );
                    }
                    FieldValue::Text(text) => analyzed.terms.push(Term::text(name, text)),
                    FieldValue::Integer(value) => analyzed.terms.push(Term::integer(name, *value)),
                }
            }
            if field.is_stored() {
                analyzed
                    .stored_fields
                    .push(StoredField::new(name, field.value().clone()));
            }
        }

        Ok(analyzed)
    }

    /// Build, commit and publish the next generation from the buffer and the
    /// pending deletes. Returns `false` if there was nothing to do.
    fn flush_buffer(&mut self) -> Result<bool> {
        if self.buffer.is_empty() && self.pending_deletes.is_empty() && !self.delete_all {
            return Ok(false);
        }

        let current = self.index.snapshot();
        let storage = Arc::clone(self.index.storage());
        let mut segment_counter = current.segment_counter();
        let mut retired = Vec::new();

        let mut entries: Vec<SegmentEntry> = if self.delete_all {
            retired.extend(current.segments().iter().cloned().map(Retired::Segment));
            Vec::new()
        } else {
            current.segments().to_vec()
        };

        let mut dirty = vec![false; entries.len()];
        for (entry, is_dirty) in entries.iter_mut().zip(dirty.iter_mut()) {
            let previous = Arc::clone(&entry.deletions);
            if self.apply_deletes(entry, false) {
                *is_dirty = true;
                if previous.has_deletions() {
                    retired.push(Retired::Deletions {
                        segment: entry.segment.name().to_string(),
                        set: previous,
                    });
                }
            }
        }

        let mut new_entry = None;
        if !self.buffer.is_empty() {
            let name = format!("segment_{segment_counter:06}");
            segment_counter += 1;

            let mut builder = SegmentBuilder::new();
            for doc in &self.buffer {
                builder.add(doc);
            }
            let mut entry = SegmentEntry::fresh(builder.build(name));
            self.apply_deletes(&mut entry, true);

            if entry.live_count() > 0 {
                new_entry = Some(entry);
            } else {
                debug!("every buffered document was deleted before flush");
            }
        }

        // Write files before the manifest that references them.
        for (entry, dirty) in entries.iter().zip(&dirty) {
            if *dirty && entry.live_count() > 0 {
                entry.deletions.write(storage.as_ref(), entry.segment.name())?;
            }
        }
        if let Some(entry) = &new_entry {
            entry.segment.write(storage.as_ref())?;
            if entry.deletions.has_deletions() {
                entry.deletions.write(storage.as_ref(), entry.segment.name())?;
            }
        }

        let mut segments = Vec::with_capacity(entries.len() + 1);
        for entry in entries {
            if entry.live_count() == 0 {
                debug!("dropping fully deleted segment {}", entry.segment.name());
                retired.push(Retired::Segment(entry));
            } else {
                segments.push(entry);
            }
        }
        let added = new_entry.as_ref().map_or(0, SegmentEntry::live_count);
        segments.extend(new_entry);

        let state = IndexState::new(current.generation() + 1, segment_counter, segments);
        state.manifest().commit(storage.as_ref())?;

        debug!(
            "flushed generation {}: {added} new document(s), {} pending delete(s), {} live document(s)",
            state.generation(),
            self.pending_deletes.len(),
            state.num_docs()
        );
        self.index.publish(state, retired);

        self.buffer.clear();
        self.pending_deletes.clear();
        self.delete_all = false;
        Ok(true)
    }

    /// Apply pending deletes to one entry, replacing its deletion set with a
    /// new generation if anything was deleted. For the segment built from the
    /// buffer, each delete only reaches documents buffered before it.
    fn apply_deletes(&self, entry: &mut SegmentEntry, from_buffer: bool) -> bool {
        let mut updated = None;

        for pending in &self.pending_deletes {
            let limit = if from_buffer {
                pending.doc_upto as u32
            } else {
                u32::MAX
            };
            for doc_id in engine::matching_docs(entry, &pending.query) {
                if doc_id >= limit {
                    break;
                }
                updated
                    .get_or_insert_with(|| entry.deletions.next_generation())
                    .delete(doc_id);
            }
        }

        match updated {
            Some(deletions) => {
                entry.deletions = Arc::new(deletions);
                true
            }
            None => false,
        }
    }

    fn maybe_merge(&mut self) -> Result<()> {
        loop {
            let state = self.index.snapshot();
            let Some(range) = self.merge_policy.select_merge(state.segments()) else {
                return Ok(());
            };
            self.merge_range(&state, range)?;
        }
    }

    /// Merge a contiguous run of segments of `state` into one and publish.
    fn merge_range(&mut self, state: &IndexState, range: std::ops::Range<usize>) -> Result<()> {
        let storage = Arc::clone(self.index.storage());
        let segments = state.segments();
        let name = format!("segment_{:06}", state.segment_counter());

        let merged = merge_segments(name, &segments[range.clone()])?;
        let merged_docs = merged.doc_count();

        let mut entries = segments[..range.start].to_vec();
        if merged_docs > 0 {
            merged.write(storage.as_ref())?;
            entries.push(SegmentEntry::fresh(merged));
        }
        entries.extend_from_slice(&segments[range.end..]);

        let next = IndexState::new(
            state.generation() + 1,
            state.segment_counter() + 1,
            entries,
        );
        next.manifest().commit(storage.as_ref())?;

        info!(
            "merged {} segment(s) into one with {merged_docs} document(s)",
            range.len()
        );
        let retired = segments[range].iter().cloned().map(Retired::Segment).collect();
        self.index.publish(next, retired);
        Ok(())
    }

    fn after_publish(&self) {
        if let Err(e) = self.index.remove_stale_manifests() {
            warn!("failed to remove stale manifests: {e}");
        }
        self.index.reclaim();
    }
}

impl Drop for IndexWriter {
    fn drop(&mut self) {
        if self.lock.is_none() {
            return;
        }
        if let Err(e) = self.flush() {
            warn!("flush on drop failed: {e}");
        }
        if let Err(e) = self.release_lock() {
            warn!("failed to release write lock on drop: {e}");
        }
    }
}

/// Take the write lock, retrying until `timeout` if it is held elsewhere.
fn acquire_write_lock(
    index: &Index,
    timeout: Option<Duration>,
) -> Result<Box<dyn StorageLock>> {
    let lock_manager = index.storage().lock_manager();
    let Some(timeout) = timeout else {
        return lock_manager.acquire_lock(WRITE_LOCK);
    };
    let started = Instant::now();

    loop {
        if let Some(lock) = lock_manager.try_acquire_lock(WRITE_LOCK)? {
            return Ok(lock);
        }

        match timeout.checked_sub(started.elapsed()) {
            Some(remaining) if !remaining.is_zero() => {
                thread::sleep(remaining.min(LOCK_RETRY_INTERVAL));
            }
            _ => {
                return Err(HalberdError::lock_conflict(format!(
                    "{WRITE_LOCK} is held by another writer"
                )));
            }
        }
    }
}
