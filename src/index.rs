//! The inverted index: segments, deletions, commits and the writer.
//!
//! An [`Index`] is an ordered list of immutable segments, each paired with
//! a deletion set, published through a commit manifest. The single
//! [`IndexWriter`] buffers documents and turns them into new segments on
//! flush; any number of searchers read published states concurrently.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`term`] | `(field, bytes)` terms |
//! | [`posting`] | doc-id sorted postings lists |
//! | [`segment`] | term dictionary and stored fields of one segment |
//! | [`deletion`] | per-segment deletion bitsets |
//! | [`manifest`] | commit manifests |
//! | [`index`](mod@index) | published state and file reclamation |
//! | [`writer`] | the index writer |
//! | [`merge`] | merge policies and segment merging |

pub mod config;
pub mod deletion;
#[allow(clippy::module_inception)]
pub mod index;
pub mod manifest;
pub mod merge;
pub mod posting;
pub mod segment;
pub mod term;
pub mod writer;

pub use config::IndexWriterConfig;
pub use deletion::DeletionSet;
pub use index::{Index, IndexState, SegmentEntry};
pub use manifest::Manifest;
pub use merge::{LogMergePolicy, MergePolicy};
pub use posting::{Posting, PostingList};
pub use segment::{Segment, SegmentMeta};
pub use term::Term;
pub use writer::{AddReport, IndexWriter};
