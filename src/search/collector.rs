//! Collecting the best hits of a search.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

/// A hit: a global document id and its score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreDoc {
    /// Global document id.
    pub doc: u32,
    /// Relevance score.
    pub score: f32,
}

impl ScoreDoc {
    /// Create a hit.
    pub fn new(doc: u32, score: f32) -> Self {
        ScoreDoc { doc, score }
    }

    /// Result order: higher score first, then lower doc id.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.doc.cmp(&other.doc))
    }
}

/// The result of a search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopDocs {
    /// Number of matching documents, including those beyond the limit.
    pub total_hits: usize,
    /// The best hits in result order.
    pub score_docs: Vec<ScoreDoc>,
}

impl TopDocs {
    /// Whether no hit was returned.
    pub fn is_empty(&self) -> bool {
        self.score_docs.is_empty()
    }

    /// Number of returned hits.
    pub fn len(&self) -> usize {
        self.score_docs.len()
    }

    /// Score of the best hit.
    pub fn max_score(&self) -> Option<f32> {
        self.score_docs.first().map(|hit| hit.score)
    }

    /// Returned document ids in result order.
    pub fn docs(&self) -> Vec<u32> {
        self.score_docs.iter().map(|hit| hit.doc).collect()
    }
}

/// Heap entry ordered so that the worst hit is at the top.
#[derive(Debug)]
struct Ranked(ScoreDoc);

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.rank_cmp(&other.0)
    }
}

/// Keeps the best `limit` hits and counts every hit.
#[derive(Debug)]
pub struct TopDocsCollector {
    limit: usize,
    hits: BinaryHeap<Ranked>,
    total_hits: usize,
}

impl TopDocsCollector {
    /// Create a collector returning at most `limit` hits.
    pub fn new(limit: usize) -> Self {
        TopDocsCollector {
            limit,
            hits: BinaryHeap::with_capacity(limit.min(1024)),
            total_hits: 0,
        }
    }

    /// Offer a hit.
    pub fn collect(&mut self, doc: u32, score: f32) {
        self.total_hits += 1;
        self.offer(ScoreDoc::new(doc, score));
    }

    /// Fold in the hits of another collector.
    pub fn merge(&mut self, other: TopDocsCollector) {
        self.total_hits += other.total_hits;
        for Ranked(hit) in other.hits {
            self.offer(hit);
        }
    }

    fn offer(&mut self, hit: ScoreDoc) {
        if self.limit == 0 {
            return;
        }
        let hit = Ranked(hit);
        if self.hits.len() < self.limit {
            self.hits.push(hit);
        } else if let Some(mut worst) = self.hits.peek_mut()
            && hit < *worst
        {
            *worst = hit;
        }
    }

    /// Number of hits offered so far.
    pub fn total_hits(&self) -> usize {
        self.total_hits
    }

    /// The collected hits in result order.
    pub fn into_top_docs(self) -> TopDocs {
        TopDocs {
            total_hits: self.total_hits,
            score_docs: self
                .hits
                .into_sorted_vec()
                .into_iter()
                .map(|Ranked(hit)| hit)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_best_in_result_order() {
        let mut collector = TopDocsCollector::new(3);
        for (doc, score) in [(0, 1.0), (1, 3.0), (2, 2.0), (3, 3.0), (4, 0.5)] {
            collector.collect(doc, score);
        }
        let top = collector.into_top_docs();
        assert_eq!(top.total_hits, 5);
        assert_eq!(top.docs(), vec![1, 3, 2]);
        assert_eq!(top.max_score(), Some(3.0));
    }

    #[test]
    fn test_ties_prefer_lower_doc() {
        let mut collector = TopDocsCollector::new(2);
        for doc in [5, 2, 9, 1] {
            collector.collect(doc, 1.0);
        }
        assert_eq!(collector.into_top_docs().docs(), vec![1, 2]);
    }

    #[test]
    fn test_zero_limit_only_counts() {
        let mut collector = TopDocsCollector::new(0);
        collector.collect(0, 1.0);
        let top = collector.into_top_docs();
        assert_eq!(top.total_hits, 1);
        assert!(top.is_empty());
    }

    #[test]
    fn test_merge() {
        let mut a = TopDocsCollector::new(2);
        a.collect(0, 1.0);
        a.collect(1, 4.0);
        let mut b = TopDocsCollector::new(2);
        b.collect(10, 2.0);
        b.collect(11, 5.0);

        a.merge(b);
        assert_eq!(a.total_hits(), 4);
        assert_eq!(a.into_top_docs().docs(), vec![11, 1]);
    }
}
