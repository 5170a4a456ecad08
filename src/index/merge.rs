//! Segment merging.
//!
//! Merging combines adjacent segments into one new segment that contains only
//! their live documents. Ids are re-densified in the original order, so the
//! relative order of documents never changes. The merged-away segments are
//! retired but stay readable by searchers that already hold them.

use std::collections::BTreeMap;
use std::ops::Range;

use crate::error::Result;
use crate::index::index::SegmentEntry;
use crate::index::posting::{Posting, PostingList};
use crate::index::segment::Segment;
use crate::index::term::Term;

/// Decides which segments to merge after a flush.
pub trait MergePolicy: Send + Sync + std::fmt::Debug {
    /// A contiguous run of segments to merge, if any.
    fn select_merge(&self, segments: &[SegmentEntry]) -> Option<Range<usize>>;
}

/// Merges the `merge_factor` adjacent segments holding the fewest live
/// documents once there are more than `merge_factor` segments.
///
/// Small segments produced by recent flushes are merged together first,
/// while large merged segments are left alone, giving a log-structured
/// layout.
#[derive(Debug, Clone)]
pub struct LogMergePolicy {
    merge_factor: usize,
}

impl LogMergePolicy {
    /// Create a policy. Factors below 2 are raised to 2.
    pub fn new(merge_factor: usize) -> Self {
        LogMergePolicy {
            merge_factor: merge_factor.max(2),
        }
    }

    /// The merge factor.
    pub fn merge_factor(&self) -> usize {
        self.merge_factor
    }
}

impl MergePolicy for LogMergePolicy {
    fn select_merge(&self, segments: &[SegmentEntry]) -> Option<Range<usize>> {
        if segments.len() <= self.merge_factor {
            return None;
        }

        let sizes: Vec<u64> = segments
            .iter()
            .map(|entry| entry.live_count() as u64)
            .collect();

        (0..=segments.len() - self.merge_factor)
            .map(|start| {
                let total: u64 = sizes[start..start + self.merge_factor].iter().sum();
                (total, start)
            })
            .min()
            .map(|(_, start)| start..start + self.merge_factor)
    }
}

/// Merge segments into a new segment named `name`, dropping deleted documents.
pub fn merge_segments(name: String, entries: &[SegmentEntry]) -> Result<Segment> {
    let mut terms: BTreeMap<Term, PostingList> = BTreeMap::new();
    let mut stored = Vec::new();

    for entry in entries {
        let segment = &entry.segment;
        let deletions = &entry.deletions;

        // Old local id -> new id for live documents.
        let base = stored.len() as u32;
        let mut doc_map = vec![None; segment.doc_count() as usize];
        for (new_offset, old_id) in deletions.live_docs().enumerate() {
            doc_map[old_id as usize] = Some(base + new_offset as u32);
            stored.push(
                segment
                    .stored_fields(old_id)
                    .map(<[_]>::to_vec)
                    .unwrap_or_default(),
            );
        }

        for (term, postings) in segment.terms() {
            let remapped = postings.iter().filter_map(|p| {
                doc_map[p.doc_id as usize].map(|doc_id| Posting::new(doc_id, p.frequency))
            });
            let mut remapped = remapped.peekable();
            if remapped.peek().is_none() {
                continue;
            }
            let merged = terms.entry(term.clone()).or_default();
            for posting in remapped {
                merged.push(posting)?;
            }
        }
    }

    Segment::from_parts(name, terms, stored)
}
