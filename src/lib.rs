//! # Halberd
//!
//! A minimal full-text search library in the Lucene tradition.
//!
//! ## Features
//!
//! - Pluggable text analysis (tokenizers, filters, per-field analyzers)
//! - Segmented inverted index with stored fields and deletion sets
//! - Atomic commits through versioned manifests
//! - Single writer, many point-in-time searchers
//! - Term, boolean, numeric range and match-all queries
//! - A classic query string parser with multi-field support
//! - TF-IDF scoring with top-N collection
//! - In-memory and file system storage
//!
//! ```
//! use std::sync::Arc;
//!
//! use halberd::prelude::*;
//!
//! # fn main() -> halberd::error::Result<()> {
//! let index = Index::create(Arc::new(MemoryStorage::default()))?;
//!
//! let mut writer = index.writer(IndexWriterConfig::default())?;
//! writer.add_document(
//!     Document::builder()
//!         .add_string("id", "1", Store::Yes)
//!         .add_text("name", "Apache Lucene", Store::Yes)
//!         .add_integer("size", 5000, Store::Yes)
//!         .build(),
//! )?;
//! writer.commit()?;
//!
//! let parser = QueryParser::new("name", Arc::new(StandardAnalyzer::new()));
//! let searcher = index.searcher();
//! let top = searcher.search(&parser.parse("lucene")?, 10)?;
//! assert_eq!(top.total_hits, 1);
//!
//! let doc = searcher.document(top.score_docs[0].doc).unwrap();
//! assert_eq!(doc.get_integer("size"), Some(5000));
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod document;
pub mod error;
pub mod index;
pub mod numeric;
pub mod query;
pub mod search;
pub mod storage;
pub mod util;

pub mod prelude {
    pub use crate::analysis::{Analyzer, KeywordAnalyzer, PerFieldAnalyzer, StandardAnalyzer};
    pub use crate::document::{Document, Field, FieldValue, Store, StoredDocument};
    pub use crate::error::{HalberdError, Result};
    pub use crate::index::{Index, IndexWriter, IndexWriterConfig, Term};
    pub use crate::query::{BooleanClause, Occur, Query, QueryParser};
    pub use crate::search::{ScoreDoc, Searcher, TopDocs};
    pub use crate::storage::Storage;
    pub use crate::storage::file::FileStorage;
    pub use crate::storage::memory::MemoryStorage;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
