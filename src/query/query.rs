//! The query model.

use std::fmt;

use crate::index::term::Term;

/// Occurrence requirements for boolean clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occur {
    /// The clause must match (equivalent to AND).
    Must,
    /// The clause should match (equivalent to OR).
    Should,
    /// The clause must not match (equivalent to NOT).
    MustNot,
}

impl Occur {
    /// Prefix used when rendering a clause in query syntax.
    pub fn prefix(self) -> &'static str {
        match self {
            Occur::Must => "+",
            Occur::Should => "",
            Occur::MustNot => "-",
        }
    }
}

/// A clause in a boolean query.
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanClause {
    /// The query for this clause.
    pub query: Query,
    /// The occurrence requirement.
    pub occur: Occur,
}

impl BooleanClause {
    /// Create a new boolean clause.
    pub fn new(query: Query, occur: Occur) -> Self {
        BooleanClause { query, occur }
    }

    /// Create a MUST clause.
    pub fn must(query: Query) -> Self {
        BooleanClause::new(query, Occur::Must)
    }

    /// Create a SHOULD clause.
    pub fn should(query: Query) -> Self {
        BooleanClause::new(query, Occur::Should)
    }

    /// Create a MUST_NOT clause.
    pub fn must_not(query: Query) -> Self {
        BooleanClause::new(query, Occur::MustNot)
    }
}

/// A search query.
///
/// Queries form a closed set; the search engine matches on every variant.
///
/// A boolean query matches a document when every MUST clause matches, no
/// MUST_NOT clause matches and, if there are SHOULD clauses, at least one of
/// them matches. A boolean query made only of MUST_NOT clauses matches
/// nothing.
///
/// ```
/// use halberd::query::Query;
///
/// let query = Query::builder()
///     .must(Query::term("name", "lucene"))
///     .must_not(Query::term("content", "x"))
///     .should(Query::numeric_range("size", Some(1000), Some(10000), false, true))
///     .build();
/// assert_eq!(
///     query.to_string(),
///     "+name:lucene -content:x size:{1000 TO 10000]"
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Documents containing an exact term.
    Term { term: Term, boost: f32 },
    /// A boolean combination of clauses.
    Boolean { clauses: Vec<BooleanClause> },
    /// Documents with an integer field value inside a range. `None` leaves
    /// that side open.
    NumericRange {
        field: String,
        min: Option<i64>,
        max: Option<i64>,
        min_inclusive: bool,
        max_inclusive: bool,
    },
    /// Every live document.
    MatchAll,
}

impl Query {
    /// Exact text term query.
    pub fn term<S: Into<String>, T: AsRef<str>>(field: S, text: T) -> Self {
        Query::from(Term::text(field, text))
    }

    /// Exact integer term query.
    pub fn integer<S: Into<String>>(field: S, value: i64) -> Self {
        Query::from(Term::integer(field, value))
    }

    /// Integer range query.
    pub fn numeric_range<S: Into<String>>(
        field: S,
        min: Option<i64>,
        max: Option<i64>,
        min_inclusive: bool,
        max_inclusive: bool,
    ) -> Self {
        Query::NumericRange {
            field: field.into(),
            min,
            max,
            min_inclusive,
            max_inclusive,
        }
    }

    /// Query matching every live document.
    pub fn match_all() -> Self {
        Query::MatchAll
    }

    /// Boolean query from clauses.
    pub fn boolean(clauses: Vec<BooleanClause>) -> Self {
        Query::Boolean { clauses }
    }

    /// Start building a boolean query.
    pub fn builder() -> BooleanQueryBuilder {
        BooleanQueryBuilder::new()
    }

    /// Multiply the boost of every term query inside this query.
    ///
    /// Range and match-all queries always score 1 and are unaffected.
    pub fn boost(self, factor: f32) -> Self {
        match self {
            Query::Term { term, boost } => Query::Term {
                term,
                boost: boost * factor,
            },
            Query::Boolean { clauses } => Query::Boolean {
                clauses: clauses
                    .into_iter()
                    .map(|c| BooleanClause::new(c.query.boost(factor), c.occur))
                    .collect(),
            },
            other => other,
        }
    }

    /// The boolean clauses, empty for other query kinds.
    pub fn clauses(&self) -> &[BooleanClause] {
        match self {
            Query::Boolean { clauses } => clauses,
            _ => &[],
        }
    }

    /// Every term referenced by this query, in clause order.
    pub fn terms(&self) -> Vec<&Term> {
        let mut terms = Vec::new();
        self.collect_terms(&mut terms);
        terms
    }

    fn collect_terms<'a>(&'a self, out: &mut Vec<&'a Term>) {
        match self {
            Query::Term { term, .. } => out.push(term),
            Query::Boolean { clauses } => {
                for clause in clauses {
                    clause.query.collect_terms(out);
                }
            }
            Query::NumericRange { .. } | Query::MatchAll => {}
        }
    }
}

impl From<Term> for Query {
    fn from(term: Term) -> Self {
        Query::Term { term, boost: 1.0 }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Term { term, boost } => {
                write!(f, "{term}")?;
                if *boost != 1.0 {
                    write!(f, "^{boost}")?;
                }
                Ok(())
            }
            Query::Boolean { clauses } => {
                for (i, clause) in clauses.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    f.write_str(clause.occur.prefix())?;
                    match &clause.query {
                        nested @ Query::Boolean { .. } => write!(f, "({nested})")?,
                        other => write!(f, "{other}")?,
                    }
                }
                Ok(())
            }
            Query::NumericRange {
                field,
                min,
                max,
                min_inclusive,
                max_inclusive,
            } => {
                let open = if *min_inclusive { '[' } else { '{' };
                let close = if *max_inclusive { ']' } else { '}' };
                let bound = |b: &Option<i64>| b.map_or_else(|| "*".to_string(), |v| v.to_string());
                write!(f, "{field}:{open}{} TO {}{close}", bound(min), bound(max))
            }
            Query::MatchAll => f.write_str("*:*"),
        }
    }
}

/// Builder for boolean queries.
#[derive(Debug, Default)]
pub struct BooleanQueryBuilder {
    clauses: Vec<BooleanClause>,
}

impl BooleanQueryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a MUST clause.
    pub fn must(mut self, query: Query) -> Self {
        self.clauses.push(BooleanClause::must(query));
        self
    }

    /// Add a SHOULD clause.
    pub fn should(mut self, query: Query) -> Self {
        self.clauses.push(BooleanClause::should(query));
        self
    }

    /// Add a MUST_NOT clause.
    pub fn must_not(mut self, query: Query) -> Self {
        self.clauses.push(BooleanClause::must_not(query));
        self
    }

    /// Add a clause.
    pub fn clause(mut self, clause: BooleanClause) -> Self {
        self.clauses.push(clause);
        self
    }

    /// Build the query.
    pub fn build(self) -> Query {
        Query::Boolean {
            clauses: self.clauses,
        }
    }
}
