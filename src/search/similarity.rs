//! Term scoring.

use std::fmt::Debug;

/// Scores one term match in one document.
pub trait Similarity: Send + Sync + Debug {
    /// Weight of the term frequency within a document.
    fn tf(&self, freq: u32) -> f32;

    /// Weight of a term that appears in `doc_freq` of `doc_count` documents.
    fn idf(&self, doc_freq: u32, doc_count: u32) -> f32;

    /// Score of a term match.
    fn score(&self, freq: u32, doc_freq: u32, doc_count: u32, boost: f32) -> f32 {
        self.tf(freq) * self.idf(doc_freq, doc_count) * boost
    }

    /// Get the name of this similarity.
    fn name(&self) -> &'static str;
}

/// TF-IDF scoring: `sqrt(tf) * (ln(1 + N / df) + 1) * boost`.
///
/// `N` and `df` count live documents of the segment being scored, so scores
/// of the same term differ slightly between segments.
///
/// ```
/// use halberd::search::{ClassicSimilarity, Similarity};
///
/// let similarity = ClassicSimilarity;
/// assert_eq!(similarity.tf(4), 2.0);
/// assert!(similarity.idf(1, 100) > similarity.idf(50, 100));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassicSimilarity;

impl Similarity for ClassicSimilarity {
    fn tf(&self, freq: u32) -> f32 {
        (freq as f32).sqrt()
    }

    fn idf(&self, doc_freq: u32, doc_count: u32) -> f32 {
        let ratio = doc_count as f64 / doc_freq.max(1) as f64;
        (ratio.ln_1p() + 1.0) as f32
    }

    fn name(&self) -> &'static str {
        "classic"
    }
}
