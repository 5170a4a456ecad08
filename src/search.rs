//! Searching: query evaluation, scoring and result collection.
//!
//! A [`Searcher`] evaluates a [`Query`](crate::query::Query) against every
//! segment of its snapshot in parallel, scores matches with a
//! [`Similarity`] and keeps the best hits in a [`TopDocsCollector`].

pub mod collector;
pub mod engine;
pub mod searcher;
pub mod similarity;

pub use collector::{ScoreDoc, TopDocs, TopDocsCollector};
pub use searcher::Searcher;
pub use similarity::{ClassicSimilarity, Similarity};
