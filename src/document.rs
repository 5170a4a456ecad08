//! Documents and fields.
//!
//! A [`Document`] is an ordered list of [`Field`]s. Each field carries a
//! value and three flags: whether it is indexed (searchable), tokenized (run
//! through the analyzer instead of indexed as one term) and stored
//! (returned by [`Searcher::document`]).
//!
//! | Constructor | Indexed | Tokenized | Stored |
//! |-------------|---------|-----------|--------|
//! | [`Field::text`] | yes | yes | per [`Store`] |
//! | [`Field::string`] | yes | no | per [`Store`] |
//! | [`Field::integer`] | yes (numeric term) | no | per [`Store`] |
//! | [`Field::stored`] | no | no | yes |
//!
//! ```
//! use halberd::document::{Document, Field, Store};
//!
//! let doc = Document::builder()
//!     .add(Field::string("path", "/docs/lucene.txt", Store::Yes))
//!     .add(Field::text("content", "Lucene in Action", Store::No))
//!     .add(Field::integer("size", 5000, Store::Yes))
//!     .build();
//!
//! assert_eq!(doc.len(), 3);
//! assert_eq!(doc.get("size").and_then(|v| v.as_integer()), Some(5000));
//! ```
//!
//! [`Searcher::document`]: crate::search::searcher::Searcher::document

#[allow(clippy::module_inception)]
pub mod document;
pub mod field;

pub use document::{Document, DocumentBuilder, StoredDocument};
pub use field::{Field, FieldOption, FieldValue, Store, StoredField};
