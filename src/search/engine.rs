//! Query evaluation against one segment.
//!
//! Every sub-query produces the matching live documents of the segment in
//! ascending id order. Boolean queries combine those lists with sorted merges,
//! adding up the scores of the matching MUST and SHOULD clauses.

use crate::index::index::SegmentEntry;
use crate::numeric;
use crate::query::{BooleanClause, Occur, Query};
use crate::search::similarity::Similarity;

/// Segment-local document ids with their scores, ascending by id.
pub type Hits = Vec<(u32, f32)>;

/// Live documents of a segment matching `query`, ascending. Nothing is scored.
pub fn matching_docs(entry: &SegmentEntry, query: &Query) -> Vec<u32> {
    Evaluator::new(entry, None)
        .evaluate(query)
        .into_iter()
        .map(|(doc, _)| doc)
        .collect()
}

/// Live documents of a segment matching `query` with their scores.
pub fn score_docs(entry: &SegmentEntry, query: &Query, similarity: &dyn Similarity) -> Hits {
    Evaluator::new(entry, Some(similarity)).evaluate(query)
}

struct Evaluator<'a> {
    entry: &'a SegmentEntry,
    similarity: Option<&'a dyn Similarity>,
    live_count: u32,
}

impl<'a> Evaluator<'a> {
    fn new(entry: &'a SegmentEntry, similarity: Option<&'a dyn Similarity>) -> Self {
        Evaluator {
            entry,
            similarity,
            live_count: entry.live_count(),
        }
    }

    fn is_live(&self, doc: u32) -> bool {
        !self.entry.deletions.is_deleted(doc)
    }

    fn evaluate(&self, query: &Query) -> Hits {
        match query {
            Query::Term { term, boost } => {
                let Some(postings) = self.entry.segment.postings(term) else {
                    return Vec::new();
                };
                let live: Vec<_> = postings.iter().filter(|p| self.is_live(p.doc_id)).collect();
                let doc_freq = live.len() as u32;
                live.into_iter()
                    .map(|p| {
                        let score = self.similarity.map_or(0.0, |s| {
                            s.score(p.frequency, doc_freq, self.live_count, *boost)
                        });
                        (p.doc_id, score)
                    })
                    .collect()
            }
            Query::NumericRange {
                field,
                min,
                max,
                min_inclusive,
                max_inclusive,
            } => {
                if is_empty_range(*min, *max, *min_inclusive, *max_inclusive) {
                    return Vec::new();
                }
                let lower = min.map(numeric::encode_i64);
                let upper = max.map(numeric::encode_i64);
                self.entry
                    .segment
                    .range(
                        field,
                        lower.as_ref().map(|b| b.as_slice()),
                        upper.as_ref().map(|b| b.as_slice()),
                        *min_inclusive,
                        *max_inclusive,
                    )
                    .filter(|doc| self.is_live(*doc))
                    .map(|doc| (doc, 1.0))
                    .collect()
            }
            Query::MatchAll => self.entry.deletions.live_docs().map(|doc| (doc, 1.0)).collect(),
            Query::Boolean { clauses } => self.evaluate_boolean(clauses),
        }
    }

    fn evaluate_boolean(&self, clauses: &[BooleanClause]) -> Hits {
        let of = |occur: Occur| clauses.iter().filter(move |c| c.occur == occur);

        let mut musts = of(Occur::Must).map(|c| self.evaluate(&c.query));
        let required = musts.next().map(|first| musts.fold(first, |acc, hits| intersect(&acc, &hits)));

        let optional = of(Occur::Should)
            .map(|c| self.evaluate(&c.query))
            .reduce(|acc, hits| union(&acc, &hits));

        let matched = match (required, optional) {
            (None, None) => return Vec::new(),
            (Some(required), None) => required,
            (None, Some(optional)) => optional,
            (Some(required), Some(optional)) => intersect(&required, &optional),
        };

        of(Occur::MustNot).fold(matched, |acc, clause| {
            if acc.is_empty() {
                return acc;
            }
            let excluded = Evaluator::new(self.entry, None).evaluate(&clause.query);
            subtract(&acc, &excluded)
        })
    }
}

/// A numeric range no value can satisfy.
fn is_empty_range(min: Option<i64>, max: Option<i64>, min_inclusive: bool, max_inclusive: bool) -> bool {
    match (min, max) {
        (Some(min), Some(max)) => min > max || (min == max && !(min_inclusive && max_inclusive)),
        _ => false,
    }
}

/// Documents in both lists, scores added.
fn intersect(a: &[(u32, f32)], b: &[(u32, f32)]) -> Hits {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push((a[i].0, a[i].1 + b[j].1));
                i += 1;
                j += 1;
            }
        }
    }
    out
}

/// Documents in either list, scores of shared documents added.
fn union(a: &[(u32, f32)], b: &[(u32, f32)]) -> Hits {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                out.push((a[i].0, a[i].1 + b[j].1));
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

/// Documents of `a` not in `b`.
fn subtract(a: &[(u32, f32)], b: &[(u32, f32)]) -> Hits {
    let mut j = 0;
    a.iter()
        .filter(|(doc, _)| {
            while j < b.len() && b[j].0 < *doc {
                j += 1;
            }
            j >= b.len() || b[j].0 != *doc
        })
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::document::{FieldValue, StoredField};
    use crate::index::deletion::DeletionSet;
    use crate::index::segment::{AnalyzedDocument, SegmentBuilder};
    use crate::index::term::Term;
    use crate::search::similarity::ClassicSimilarity;

    /// Docs 0..=5 with body words; doc `i` also has `n = values[i]`.
    fn entry(deleted: &[u32]) -> SegmentEntry {
        let bodies = [
            "red", "red blue", "blue", "red", "green", "red red blue",
        ];
        let values = [999, 1000, 5000, 10000, 10001, -3];

        let mut builder = SegmentBuilder::new();
        for (body, value) in bodies.iter().zip(values) {
            let mut terms: Vec<Term> = body.split(' ').map(|w| Term::text("body", w)).collect();
            terms.push(Term::integer("n", value));
            builder.add(&AnalyzedDocument {
                terms,
                stored_fields: vec![StoredField::new("n", FieldValue::Integer(value))],
            });
        }
        let segment = builder.build("s");
        let mut deletions = DeletionSet::new(segment.doc_count());
        for doc in deleted {
            deletions.delete(*doc);
        }
        SegmentEntry::new(Arc::new(segment), Arc::new(deletions))
    }

    #[test]
    fn test_must_minus_must_not() {
        let query = Query::builder()
            .must(Query::term("body", "red"))
            .must_not(Query::term("body", "blue"))
            .build();
        assert_eq!(matching_docs(&entry(&[]), &query), vec![0, 3]);
    }

    #[test]
    fn test_should_requires_one_match_even_with_must() {
        let query = Query::builder()
            .must(Query::term("body", "red"))
            .should(Query::term("body", "blue"))
            .build();
        assert_eq!(matching_docs(&entry(&[]), &query), vec![1, 5]);
    }

    #[test]
    fn test_only_must_not_matches_nothing() {
        let query = Query::builder().must_not(Query::term("body", "red")).build();
        assert!(matching_docs(&entry(&[]), &query).is_empty());
        assert!(matching_docs(&entry(&[]), &Query::boolean(Vec::new())).is_empty());
    }

    #[test]
    fn test_numeric_range() {
        let e = entry(&[]);
        let half_open = Query::numeric_range("n", Some(1000), Some(10000), false, true);
        assert_eq!(matching_docs(&e, &half_open), vec![2, 3]);

        let open_min = Query::numeric_range("n", None, Some(999), true, true);
        assert_eq!(matching_docs(&e, &open_min), vec![0, 5]);

        let empty = Query::numeric_range("n", Some(1000), Some(1000), true, false);
        assert!(matching_docs(&e, &empty).is_empty());
    }

    #[test]
    fn test_deleted_docs_skipped() {
        let e = entry(&[0, 5]);
        assert_eq!(matching_docs(&e, &Query::term("body", "red")), vec![1, 3]);
        assert_eq!(matching_docs(&e, &Query::MatchAll), vec![1, 2, 3, 4]);
        let range = Query::numeric_range("n", None, None, true, true);
        assert_eq!(matching_docs(&e, &range), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_scores_add_up_over_clauses() {
        let e = entry(&[]);
        let query = Query::builder()
            .should(Query::term("body", "red"))
            .should(Query::term("body", "blue"))
            .build();
        let hits = score_docs(&e, &query, &ClassicSimilarity);
        let docs: Vec<u32> = hits.iter().map(|(d, _)| *d).collect();
        assert_eq!(docs, vec![0, 1, 2, 3, 5]);

        let score = |doc: u32| hits.iter().find(|(d, _)| *d == doc).map(|(_, s)| *s).unwrap();
        assert!(score(1) > score(0));
        assert!(score(5) > score(1));

        let similarity = ClassicSimilarity;
        let red_once = similarity.score(1, 4, 6, 1.0);
        assert!((score(0) - red_once).abs() < 1e-6);
    }

    #[test]
    fn test_range_and_match_all_score_one() {
        let e = entry(&[]);
        let hits = score_docs(&e, &Query::MatchAll, &ClassicSimilarity);
        assert!(hits.iter().all(|(_, s)| *s == 1.0));

        let query = Query::builder()
            .must(Query::numeric_range("n", Some(5000), None, true, true))
            .must(Query::MatchAll)
            .build();
        assert_eq!(score_docs(&e, &query, &ClassicSimilarity), vec![(2, 2.0), (3, 2.0), (4, 2.0)]);
    }

    #[test]
    fn test_merge_helpers() {
        let a = [(1, 1.0), (3, 1.0), (5, 1.0)];
        let b = [(3, 2.0), (4, 2.0)];
        assert_eq!(intersect(&a, &b), vec![(3, 3.0)]);
        assert_eq!(union(&a, &b), vec![(1, 1.0), (3, 3.0), (4, 2.0), (5, 1.0)]);
        assert_eq!(subtract(&a, &b), vec![(1, 1.0), (5, 1.0)]);
    }
}
