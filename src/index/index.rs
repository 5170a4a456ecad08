//! The index: published segment state, snapshots and reclamation.
//!
//! An [`Index`] owns the list of visible segments as an immutable
//! [`IndexState`] behind a lock. Writers build a complete new state and swap
//! it in with [`Index::publish`]; searchers clone the current `Arc` and keep
//! reading it no matter what is published later.
//!
//! Segments and deletion sets that drop out of the published state are kept
//! on a retired list. Their files are deleted by [`Index::reclaim`] once the
//! index holds the only remaining reference, that is once every searcher that
//! saw them has been closed.

use std::sync::Arc;

use ahash::AHashSet;
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};

use crate::error::{HalberdError, Result};
use crate::index::config::IndexWriterConfig;
use crate::index::deletion::DeletionSet;
use crate::index::manifest::Manifest;
use crate::index::segment::{Segment, SegmentMeta};
use crate::index::writer::IndexWriter;
use crate::search::searcher::Searcher;
use crate::storage::Storage;

/// Name of the exclusive writer lock.
pub const WRITE_LOCK: &str = "write.lock";

const SEGMENT_PREFIX: &str = "segment_";
const MANIFEST_PREFIX: &str = "manifest_";

/// A segment together with the deletion-set generation that applies to it.
#[derive(Clone)]
pub struct SegmentEntry {
    /// The immutable segment.
    pub segment: Arc<Segment>,
    /// Its deletions.
    pub deletions: Arc<DeletionSet>,
}

impl SegmentEntry {
    /// Pair a segment with its deletions.
    pub fn new(segment: Arc<Segment>, deletions: Arc<DeletionSet>) -> Self {
        SegmentEntry {
            segment,
            deletions,
        }
    }

    /// A freshly built segment with no deletions.
    pub fn fresh(segment: Segment) -> Self {
        let deletions = DeletionSet::new(segment.doc_count());
        SegmentEntry::new(Arc::new(segment), Arc::new(deletions))
    }

    /// Number of live documents.
    pub fn live_count(&self) -> u32 {
        self.deletions.live_count()
    }

    /// Manifest record for this entry.
    pub fn meta(&self) -> SegmentMeta {
        SegmentMeta {
            name: self.segment.name().to_string(),
            doc_count: self.segment.doc_count(),
            del_gen: self
                .deletions
                .has_deletions()
                .then_some(self.deletions.generation()),
        }
    }
}

impl std::fmt::Debug for SegmentEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentEntry")
            .field("segment", &self.segment.name())
            .field("doc_count", &self.segment.doc_count())
            .field("deleted", &self.deletions.deleted_count())
            .field("del_gen", &self.deletions.generation())
            .finish()
    }
}

/// One published, immutable view of the index.
#[derive(Debug, Clone, Default)]
pub struct IndexState {
    generation: u64,
    segment_counter: u64,
    segments: Vec<SegmentEntry>,
}

impl IndexState {
    /// Create a state.
    pub fn new(generation: u64, segment_counter: u64, segments: Vec<SegmentEntry>) -> Self {
        IndexState {
            generation,
            segment_counter,
            segments,
        }
    }

    /// Commit generation of this state.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Counter used to name the next segment.
    pub fn segment_counter(&self) -> u64 {
        self.segment_counter
    }

    /// Visible segments in index order.
    pub fn segments(&self) -> &[SegmentEntry] {
        &self.segments
    }

    /// Number of live documents.
    pub fn num_docs(&self) -> u64 {
        self.segments.iter().map(|e| e.live_count() as u64).sum()
    }

    /// Number of document slots, deleted ones included.
    pub fn max_doc(&self) -> u64 {
        self.segments
            .iter()
            .map(|e| e.segment.doc_count() as u64)
            .sum()
    }

    /// Files this state needs: its manifest, segment files and persisted
    /// deletion sets.
    pub fn file_names(&self) -> Vec<String> {
        let mut names = vec![Manifest::file_name(self.generation)];
        for entry in &self.segments {
            let name = entry.segment.name();
            names.extend(Segment::file_names(name));
            if entry.deletions.has_deletions() {
                names.push(DeletionSet::file_name(name, entry.deletions.generation()));
            }
        }
        names
    }

    /// The manifest describing this state.
    pub fn manifest(&self) -> Manifest {
        Manifest {
            generation: self.generation,
            segment_counter: self.segment_counter,
            segments: self.segments.iter().map(SegmentEntry::meta).collect(),
        }
    }
}

/// Storage held by a no-longer-visible part of the index.
#[derive(Debug)]
pub enum Retired {
    /// A segment removed by a merge, a delete-all or full deletion, with the
    /// deletions it had at that point.
    Segment(SegmentEntry),
    /// A superseded deletion-set generation that was persisted.
    Deletions {
        /// Owning segment name.
        segment: String,
        /// The superseded generation.
        set: Arc<DeletionSet>,
    },
}

impl Retired {
    fn is_referenced(&self) -> bool {
        match self {
            Retired::Segment(entry) => {
                Arc::strong_count(&entry.segment) > 1 || Arc::strong_count(&entry.deletions) > 1
            }
            Retired::Deletions { set, .. } => Arc::strong_count(set) > 1,
        }
    }

    fn file_names(&self) -> Vec<String> {
        match self {
            Retired::Segment(entry) => {
                let name = entry.segment.name();
                let mut names = Segment::file_names(name).to_vec();
                if entry.deletions.has_deletions() {
                    names.push(DeletionSet::file_name(name, entry.deletions.generation()));
                }
                names
            }
            Retired::Deletions { segment, set } => {
                vec![DeletionSet::file_name(segment, set.generation())]
            }
        }
    }
}

/// A full-text index stored in a [`Storage`].
pub struct Index {
    storage: Arc<dyn Storage>,
    state: RwLock<Arc<IndexState>>,
    retired: Mutex<Vec<Retired>>,
}

impl Index {
    /// Create a new empty index, discarding any index already in `storage`.
    ///
    /// Fails with a lock conflict while a writer holds the index.
    pub fn create(storage: Arc<dyn Storage>) -> Result<Arc<Self>> {
        if storage.lock_manager().lock_exists(WRITE_LOCK) {
            return Err(HalberdError::lock_conflict(
                "cannot create index while a writer holds write.lock",
            ));
        }

        for name in storage.list_files()? {
            if is_index_file(&name) {
                storage.delete_file(&name)?;
            }
        }

        let state = IndexState::new(1, 0, Vec::new());
        state.manifest().commit(storage.as_ref())?;
        info!("created empty index");

        Ok(Arc::new(Self::from_state(storage, state)))
    }

    /// Open the latest committed generation of an existing index.
    pub fn open(storage: Arc<dyn Storage>) -> Result<Arc<Self>> {
        let manifest = Manifest::load_latest(storage.as_ref())?
            .ok_or_else(|| HalberdError::not_found("no index manifest in storage"))?;

        let state = load_state(storage.as_ref(), &manifest, &[])?;
        info!(
            "opened index generation {} with {} segment(s), {} live document(s)",
            state.generation(),
            state.segments().len(),
            state.num_docs()
        );

        Ok(Arc::new(Self::from_state(storage, state)))
    }

    /// Publish the newest committed generation if another `Index` instance on
    /// the same storage has committed since this one last looked.
    ///
    /// Segments that did not change are shared with the current state.
    /// Returns `true` if a newer generation was loaded.
    pub fn refresh(&self) -> Result<bool> {
        let current = self.snapshot();
        let Some(manifest) = Manifest::load_latest(self.storage.as_ref())? else {
            return Ok(false);
        };
        if manifest.generation <= current.generation() {
            return Ok(false);
        }

        let state = load_state(self.storage.as_ref(), &manifest, current.segments())?;
        let retired = current
            .segments()
            .iter()
            .filter(|old| {
                !state
                    .segments()
                    .iter()
                    .any(|new| Arc::ptr_eq(&new.segment, &old.segment))
            })
            .cloned()
            .map(Retired::Segment)
            .collect();

        info!(
            "refreshed index from generation {} to {}",
            current.generation(),
            state.generation()
        );
        self.publish(state, retired);
        Ok(true)
    }

    /// Open the index in `storage`, creating an empty one if none exists.
    pub fn open_or_create(storage: Arc<dyn Storage>) -> Result<Arc<Self>> {
        if Manifest::list_generations(storage.as_ref())?.is_empty() {
            Self::create(storage)
        } else {
            Self::open(storage)
        }
    }

    fn from_state(storage: Arc<dyn Storage>, state: IndexState) -> Self {
        Index {
            storage,
            state: RwLock::new(Arc::new(state)),
            retired: Mutex::new(Vec::new()),
        }
    }

    /// Open the single writer for this index.
    pub fn writer(self: &Arc<Self>, config: IndexWriterConfig) -> Result<IndexWriter> {
        IndexWriter::new(Arc::clone(self), config)
    }

    /// Open a point-in-time searcher over the currently published state.
    pub fn searcher(self: &Arc<Self>) -> Searcher {
        Searcher::new(Arc::clone(self))
    }

    /// The storage backing this index.
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// The currently published state.
    pub fn snapshot(&self) -> Arc<IndexState> {
        Arc::clone(&self.state.read())
    }

    /// Number of live documents in the published state.
    pub fn num_docs(&self) -> u64 {
        self.state.read().num_docs()
    }

    /// Bytes used by the files of the published state. Retired files still
    /// held by open searchers are not counted.
    pub fn size_in_bytes(&self) -> Result<u64> {
        let state = self.snapshot();
        if state.generation() == 0 {
            return Ok(0);
        }
        state
            .file_names()
            .iter()
            .map(|name| self.storage.file_size(name))
            .sum()
    }

    /// Number of retired entries still waiting for reclamation.
    pub fn retired_count(&self) -> usize {
        self.retired.lock().len()
    }

    /// Swap in a new state and retire what it no longer references.
    pub(crate) fn publish(&self, state: IndexState, retired: Vec<Retired>) {
        debug!(
            "publishing generation {} with {} segment(s)",
            state.generation(),
            state.segments().len()
        );
        *self.state.write() = Arc::new(state);
        self.retired.lock().extend(retired);
    }

    /// Delete the files of retired segments and deletion sets that no
    /// searcher references anymore. Returns the number reclaimed.
    ///
    /// Files that cannot be deleted are logged and retried on the next call.
    pub fn reclaim(&self) -> usize {
        let mut retired = self.retired.lock();
        let mut reclaimed = 0;

        retired.retain(|item| {
            if item.is_referenced() {
                return true;
            }
            for name in item.file_names() {
                if let Err(e) = self.storage.delete_file(&name) {
                    warn!("failed to delete retired file {name}: {e}");
                    return true;
                }
            }
            reclaimed += 1;
            false
        });

        if reclaimed > 0 {
            debug!("reclaimed {reclaimed} retired item(s)");
        }
        reclaimed
    }

    /// Delete manifests older than the published generation.
    pub(crate) fn remove_stale_manifests(&self) -> Result<()> {
        let current = self.state.read().generation();
        for generation in Manifest::list_generations(self.storage.as_ref())? {
            if generation < current {
                self.storage.delete_file(&Manifest::file_name(generation))?;
            }
        }
        Ok(())
    }

    /// Delete index files referenced neither by the published state nor by a
    /// retired entry, such as leftovers from an interrupted flush.
    pub(crate) fn remove_unreferenced_files(&self) -> Result<usize> {
        let mut referenced: AHashSet<String> = self.snapshot().file_names().into_iter().collect();
        for item in self.retired.lock().iter() {
            referenced.extend(item.file_names());
        }

        let mut removed = 0;
        for name in self.storage.list_files()? {
            if is_index_file(&name) && !referenced.contains(&name) {
                debug!("removing unreferenced file {name}");
                self.storage.delete_file(&name)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

impl std::fmt::Debug for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.snapshot();
        f.debug_struct("Index")
            .field("storage", &self.storage)
            .field("generation", &state.generation())
            .field("segments", &state.segments())
            .field("retired", &self.retired_count())
            .finish()
    }
}

/// Build a state from a manifest, reusing entries of `known` whose segment
/// and deletion generation are unchanged.
fn load_state(
    storage: &dyn Storage,
    manifest: &Manifest,
    known: &[SegmentEntry],
) -> Result<IndexState> {
    let mut segments = Vec::with_capacity(manifest.segments.len());
    for meta in &manifest.segments {
        if let Some(entry) = known.iter().find(|entry| entry.meta() == *meta) {
            segments.push(entry.clone());
            continue;
        }

        let segment = match known.iter().find(|e| e.segment.name() == meta.name) {
            Some(entry) => Arc::clone(&entry.segment),
            None => Arc::new(Segment::open(storage, meta)?),
        };
        let deletions = match meta.del_gen {
            Some(generation) => {
                DeletionSet::open(storage, &meta.name, generation, meta.doc_count)?
            }
            None => DeletionSet::new(meta.doc_count),
        };
        segments.push(SegmentEntry::new(segment, Arc::new(deletions)));
    }

    Ok(IndexState::new(
        manifest.generation,
        manifest.segment_counter,
        segments,
    ))
}

fn is_index_file(name: &str) -> bool {
    name.starts_with(SEGMENT_PREFIX) || name.starts_with(MANIFEST_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::segment::{AnalyzedDocument, SegmentBuilder};
    use crate::index::term::Term;
    use crate::storage::memory::MemoryStorage;

    fn storage() -> Arc<dyn Storage> {
        Arc::new(MemoryStorage::default())
    }

    fn segment(name: &str, docs: u32) -> Segment {
        let mut builder = SegmentBuilder::new();
        for _ in 0..docs {
            builder.add(&AnalyzedDocument {
                terms: vec![Term::text("f", "v")],
                stored_fields: Vec::new(),
            });
        }
        builder.build(name)
    }

    #[test]
    fn test_open_missing_index() {
        assert!(matches!(
            Index::open(storage()),
            Err(HalberdError::NotFound(_))
        ));
    }

    #[test]
    fn test_create_then_open() {
        let storage = storage();
        let index = Index::create(Arc::clone(&storage)).unwrap();
        assert_eq!(index.snapshot().generation(), 1);
        assert_eq!(index.num_docs(), 0);

        let reopened = Index::open_or_create(storage).unwrap();
        assert_eq!(reopened.snapshot().generation(), 1);
    }

    #[test]
    fn test_create_discards_existing_index() {
        let storage = storage();
        let first = segment("segment_000000", 2);
        first.write(storage.as_ref()).unwrap();
        let state = IndexState::new(4, 1, vec![SegmentEntry::fresh(first)]);
        state.manifest().commit(storage.as_ref()).unwrap();

        let index = Index::create(Arc::clone(&storage)).unwrap();
        assert_eq!(index.num_docs(), 0);
        assert_eq!(storage.list_files().unwrap(), vec!["manifest_1.json"]);
    }

    #[test]
    fn test_open_loads_segments_and_deletions() {
        let storage = storage();
        let built = segment("segment_000000", 3);
        built.write(storage.as_ref()).unwrap();
        let mut deletions = DeletionSet::new(3).next_generation();
        deletions.delete(1);
        deletions.write(storage.as_ref(), "segment_000000").unwrap();

        let state = IndexState::new(
            2,
            1,
            vec![SegmentEntry::new(Arc::new(built), Arc::new(deletions))],
        );
        state.manifest().commit(storage.as_ref()).unwrap();

        let index = Index::open(storage).unwrap();
        let snapshot = index.snapshot();
        assert_eq!(snapshot.max_doc(), 3);
        assert_eq!(snapshot.num_docs(), 2);
        assert!(snapshot.segments()[0].deletions.is_deleted(1));
    }

    #[test]
    fn test_reclaim_waits_for_snapshots() {
        let storage = storage();
        let index = Index::create(Arc::clone(&storage)).unwrap();

        let old = segment("segment_000000", 1);
        old.write(storage.as_ref()).unwrap();
        index.publish(IndexState::new(2, 1, vec![SegmentEntry::fresh(old)]), Vec::new());

        let held = index.snapshot();
        let old_entry = held.segments()[0].clone();
        index.publish(
            IndexState::new(3, 1, Vec::new()),
            vec![Retired::Segment(old_entry)],
        );

        assert_eq!(index.reclaim(), 0);
        assert!(storage.file_exists("segment_000000.dict"));

        drop(held);
        assert_eq!(index.reclaim(), 1);
        assert!(!storage.file_exists("segment_000000.dict"));
        assert!(!storage.file_exists("segment_000000.docs"));
        assert_eq!(index.retired_count(), 0);
    }

    #[test]
    fn test_refresh_picks_up_newer_commit() {
        let storage = storage();
        let index = Index::create(Arc::clone(&storage)).unwrap();
        assert!(!index.refresh().unwrap());

        let built = segment("segment_000000", 2);
        built.write(storage.as_ref()).unwrap();
        IndexState::new(2, 1, vec![SegmentEntry::fresh(built)])
            .manifest()
            .commit(storage.as_ref())
            .unwrap();

        assert!(index.refresh().unwrap());
        assert_eq!(index.snapshot().generation(), 2);
        assert_eq!(index.num_docs(), 2);
        assert!(!index.refresh().unwrap());
    }

    #[test]
    fn test_remove_unreferenced_files() {
        let storage = storage();
        let index = Index::create(Arc::clone(&storage)).unwrap();
        segment("segment_000009", 1).write(storage.as_ref()).unwrap();

        assert_eq!(index.remove_unreferenced_files().unwrap(), 2);
        assert_eq!(storage.list_files().unwrap(), vec!["manifest_1.json"]);
    }
}
