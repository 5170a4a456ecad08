//! Query string parser.
//!
//! Parses the classic query syntax into a [`Query`]:
//!
//! | Syntax | Meaning |
//! |--------|---------|
//! | `lucene` | term on the default field(s) |
//! | `name:lucene` | term on `name` |
//! | `+a -b c` | MUST `a`, MUST_NOT `b`, SHOULD `c` |
//! | `a AND b`, `a && b` | both MUST |
//! | `a OR b`, `a \|\| b` | both SHOULD |
//! | `NOT a` | MUST_NOT `a` |
//! | `(a b)`, `name:(a b)` | grouping, optionally on one field |
//! | `"apache lucene"` | every analyzed word MUST match |
//! | `size:[1000 TO 10000}` | numeric range, `*` for an open bound |
//! | `name:lucene^2` | boost |
//! | `*:*` | every document |
//!
//! Term text is run through the analyzer of the parser. A term that analyzes
//! to several tokens becomes a nested boolean query of SHOULD clauses, and a
//! term that analyzes to nothing (a stop word) is dropped.
//!
//! ```
//! use std::sync::Arc;
//!
//! use halberd::analysis::StandardAnalyzer;
//! use halberd::query::QueryParser;
//!
//! let parser = QueryParser::new("content", Arc::new(StandardAnalyzer::new()));
//! let query = parser.parse("+name:lucene -apache").unwrap();
//! assert_eq!(query.to_string(), "+name:lucene -content:apache");
//!
//! let err = parser.parse("name:").unwrap_err();
//! assert_eq!(err.parse_offset(), Some(4));
//! ```

use std::sync::Arc;

use ahash::AHashSet;

use crate::analysis::Analyzer;
use crate::error::{HalberdError, Result};
use crate::query::query::{BooleanClause, Occur, Query};

/// Characters that end a bare word.
const SPECIAL: [char; 9] = ['(', ')', '"', ':', '^', '[', ']', '{', '}'];

/// Maximum nesting of parenthesized groups.
const MAX_DEPTH: usize = 64;

/// How adjacent clauses without an explicit operator are combined.
///
/// `AND` and `OR` follow the classic Lucene parser: `AND` turns the clause
/// before it into MUST, but `OR` turns a preceding unmodified MUST back into
/// SHOULD only when the default operator is [`And`](Operator::And). With the
/// default `Or`, `a AND b OR c` parses to `+a +b c`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operator {
    /// Adjacent clauses are SHOULD clauses.
    #[default]
    Or,
    /// Adjacent clauses are MUST clauses.
    And,
}

impl Operator {
    fn occur(self) -> Occur {
        match self {
            Operator::Or => Occur::Should,
            Operator::And => Occur::Must,
        }
    }
}

/// Parses query strings into [`Query`] values.
///
/// In single-field mode bare terms search the default field. In multi-field
/// mode each bare term becomes a boolean query of SHOULD clauses, one per
/// field, each optionally boosted.
pub struct QueryParser {
    fields: Vec<(String, f32)>,
    analyzer: Arc<dyn Analyzer>,
    default_operator: Operator,
    numeric_fields: AHashSet<String>,
}

impl std::fmt::Debug for QueryParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryParser")
            .field("fields", &self.fields)
            .field("analyzer", &self.analyzer.name())
            .field("default_operator", &self.default_operator)
            .field("numeric_fields", &self.numeric_fields)
            .finish()
    }
}

impl QueryParser {
    /// Create a parser searching `default_field` for bare terms.
    pub fn new<S: Into<String>>(default_field: S, analyzer: Arc<dyn Analyzer>) -> Self {
        Self::multi_field_with_boosts([(default_field, 1.0)], analyzer)
    }

    /// Create a parser searching every one of `fields` for bare terms.
    pub fn multi_field<I, S>(fields: I, analyzer: Arc<dyn Analyzer>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::multi_field_with_boosts(fields.into_iter().map(|f| (f, 1.0)), analyzer)
    }

    /// Create a multi-field parser with a boost per field.
    pub fn multi_field_with_boosts<I, S>(fields: I, analyzer: Arc<dyn Analyzer>) -> Self
    where
        I: IntoIterator<Item = (S, f32)>,
        S: Into<String>,
    {
        QueryParser {
            fields: fields
                .into_iter()
                .map(|(name, boost)| (name.into(), boost))
                .collect(),
            analyzer,
            default_operator: Operator::default(),
            numeric_fields: AHashSet::new(),
        }
    }

    /// Set how clauses without an explicit operator are combined.
    pub fn with_default_operator(mut self, operator: Operator) -> Self {
        self.default_operator = operator;
        self
    }

    /// Treat `field` as an integer field: its terms are parsed as integers
    /// instead of being analyzed.
    pub fn with_numeric_field<S: Into<String>>(mut self, field: S) -> Self {
        self.numeric_fields.insert(field.into());
        self
    }

    /// The default operator.
    pub fn default_operator(&self) -> Operator {
        self.default_operator
    }

    /// The default fields with their boosts.
    pub fn fields(&self) -> &[(String, f32)] {
        &self.fields
    }

    /// Parse a query string.
    ///
    /// Errors carry the byte offset of the offending input.
    pub fn parse(&self, text: &str) -> Result<Query> {
        if text.trim().is_empty() {
            return Err(HalberdError::parse("empty query", 0));
        }

        let mut state = ParseState {
            parser: self,
            text,
            pos: 0,
            depth: 0,
        };
        let clauses = state.parse_clauses(None, None)?;
        combine(clauses).ok_or_else(|| HalberdError::parse("query has no searchable terms", 0))
    }

    /// Build a query for `field`, or for every default field when `None`.
    fn per_field<F>(&self, field: Option<&str>, offset: usize, mut build: F) -> Result<Option<Query>>
    where
        F: FnMut(&str, f32) -> Result<Option<Query>>,
    {
        if let Some(name) = field {
            return build(name, 1.0);
        }
        match self.fields.as_slice() {
            [] => Err(HalberdError::parse("no field to search", offset)),
            [(name, boost)] => build(name, *boost),
            fields => {
                let mut clauses = Vec::new();
                for (name, boost) in fields {
                    if let Some(query) = build(name, *boost)? {
                        clauses.push(BooleanClause::should(query));
                    }
                }
                Ok((!clauses.is_empty()).then(|| Query::boolean(clauses)))
            }
        }
    }

    /// Analyze `text` for `field`, joining several tokens with `join`.
    fn analyzed_query(
        &self,
        field: &str,
        text: &str,
        boost: f32,
        join: Occur,
        offset: usize,
    ) -> Result<Option<Query>> {
        if self.numeric_fields.contains(field) {
            let value: i64 = text.trim().parse().map_err(|_| {
                HalberdError::parse(
                    format!("'{text}' is not an integer for numeric field '{field}'"),
                    offset,
                )
            })?;
            return Ok(Some(Query::integer(field, value).boost(boost)));
        }

        let mut terms: Vec<Query> = self
            .analyzer
            .analyze_field(field, text)?
            .filter(|token| !token.is_stopped() && !token.is_empty())
            .map(|token| Query::term(field, token.text))
            .collect();

        let query = match terms.len() {
            0 => return Ok(None),
            1 => terms.remove(0),
            _ => Query::boolean(
                terms
                    .into_iter()
                    .map(|term| BooleanClause::new(term, join))
                    .collect(),
            ),
        };
        Ok(Some(query.boost(boost)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    And,
    Or,
    Not,
}

#[derive(Debug)]
struct ParsedClause {
    query: Query,
    occur: Occur,
    /// Carries a `+`, `-` or `NOT` modifier.
    modified: bool,
    /// Carries a modifier or sits next to a conjunction.
    explicit: bool,
}

/// Turn parsed clauses into a query. A lone clause without any operator is
/// returned as is.
fn combine(mut clauses: Vec<ParsedClause>) -> Option<Query> {
    match clauses.len() {
        0 => None,
        1 if !clauses[0].explicit => clauses.pop().map(|c| c.query),
        _ => Some(Query::boolean(
            clauses
                .into_iter()
                .map(|c| BooleanClause::new(c.query, c.occur))
                .collect(),
        )),
    }
}

fn is_boundary(c: Option<char>) -> bool {
    c.is_none_or(|c| c.is_whitespace() || SPECIAL.contains(&c))
}

struct ParseState<'p, 'a> {
    parser: &'p QueryParser,
    text: &'a str,
    pos: usize,
    depth: usize,
}

impl ParseState<'_, '_> {
    fn rest(&self) -> &str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn at_group_end(&self) -> bool {
        matches!(self.peek(), None | Some(')'))
    }

    fn peek_keyword(&self) -> Option<(Keyword, usize)> {
        const KEYWORDS: [(&str, Keyword); 5] = [
            ("AND", Keyword::And),
            ("&&", Keyword::And),
            ("OR", Keyword::Or),
            ("||", Keyword::Or),
            ("NOT", Keyword::Not),
        ];
        KEYWORDS.iter().find_map(|(spelling, keyword)| {
            let after = self.rest().strip_prefix(spelling)?;
            let symbolic = !spelling.starts_with(char::is_alphabetic);
            (symbolic || is_boundary(after.chars().next())).then_some((*keyword, spelling.len()))
        })
    }

    fn peek_conjunction(&self) -> Option<(Keyword, usize)> {
        self.peek_keyword()
            .filter(|(keyword, _)| matches!(keyword, Keyword::And | Keyword::Or))
    }

    /// Parse clauses up to the end of input, or up to the `)` closing the
    /// group opened at `open`.
    fn parse_clauses(&mut self, field: Option<&str>, open: Option<usize>) -> Result<Vec<ParsedClause>> {
        let mut clauses: Vec<ParsedClause> = Vec::new();
        let mut operands = 0usize;

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => {
                    return match open {
                        Some(offset) => Err(HalberdError::parse("unclosed '('", offset)),
                        None => Ok(clauses),
                    };
                }
                Some(')') => {
                    if open.is_none() {
                        return Err(HalberdError::parse("unexpected ')'", self.pos));
                    }
                    self.bump();
                    return Ok(clauses);
                }
                Some(_) => {}
            }

            let conjunction = match self.peek_conjunction() {
                Some((keyword, len)) => {
                    let offset = self.pos;
                    let text = self.text;
                    let spelling = &text[offset..offset + len];
                    if operands == 0 {
                        return Err(HalberdError::parse(
                            format!("'{spelling}' has no left operand"),
                            offset,
                        ));
                    }
                    self.pos += len;
                    self.skip_whitespace();
                    if self.at_group_end() || self.peek_conjunction().is_some() {
                        return Err(HalberdError::parse(
                            format!("'{spelling}' has no right operand"),
                            offset,
                        ));
                    }
                    Some(keyword)
                }
                None => None,
            };

            let modifier_offset = self.pos;
            let modifier = match self.peek() {
                Some('+') => Some((Occur::Must, 1)),
                Some('-') => Some((Occur::MustNot, 1)),
                _ => match self.peek_keyword() {
                    Some((Keyword::Not, len)) => Some((Occur::MustNot, len)),
                    _ => None,
                },
            };
            if let Some((_, len)) = modifier {
                self.pos += len;
                self.skip_whitespace();
                if self.at_group_end() || self.peek_conjunction().is_some() {
                    let spelling = &self.text[modifier_offset..modifier_offset + len];
                    return Err(HalberdError::parse(
                        format!("operator '{spelling}' has no operand"),
                        modifier_offset,
                    ));
                }
            }

            operands += 1;
            let query = self.parse_operand(field)?;
            self.add_clause(&mut clauses, conjunction, modifier.map(|(occur, _)| occur), query);
        }
    }

    fn add_clause(
        &self,
        clauses: &mut Vec<ParsedClause>,
        conjunction: Option<Keyword>,
        modifier: Option<Occur>,
        query: Option<Query>,
    ) {
        if let Some(last) = clauses.last_mut()
            && conjunction.is_some()
        {
            last.explicit = true;
            match conjunction {
                Some(Keyword::And) if last.occur == Occur::Should => last.occur = Occur::Must,
                Some(Keyword::Or)
                    if self.parser.default_operator == Operator::And
                        && last.occur == Occur::Must
                        && !last.modified =>
                {
                    last.occur = Occur::Should
                }
                _ => {}
            }
        }

        let Some(query) = query else {
            return;
        };
        let occur = match (modifier, conjunction) {
            (Some(occur), _) => occur,
            (None, Some(Keyword::And)) => Occur::Must,
            (None, Some(_)) => Occur::Should,
            (None, None) => self.parser.default_operator.occur(),
        };
        clauses.push(ParsedClause {
            query,
            occur,
            modified: modifier.is_some(),
            explicit: modifier.is_some() || conjunction.is_some(),
        });
    }

    /// A primary expression with an optional `^boost` suffix.
    fn parse_operand(&mut self, field: Option<&str>) -> Result<Option<Query>> {
        let query = self.parse_primary(field)?;

        if self.peek() != Some('^') {
            return Ok(query);
        }
        let caret = self.pos;
        self.bump();
        let value = self.read_word();
        let factor = value
            .parse::<f32>()
            .ok()
            .filter(|b| b.is_finite() && *b >= 0.0)
            .ok_or_else(|| HalberdError::parse(format!("invalid boost '{value}'"), caret))?;
        Ok(query.map(|q| q.boost(factor)))
    }

    /// A term, group, phrase or range, optionally prefixed with `field:`.
    fn parse_primary(&mut self, field: Option<&str>) -> Result<Option<Query>> {
        let start = self.pos;
        if matches!(self.peek(), Some('(' | '"' | '[' | '{')) {
            return self.parse_value(field);
        }

        let word = self.read_word();
        if self.peek() != Some(':') {
            return self.bare_word(field, word, start);
        }

        let colon = self.pos;
        if word.is_empty() {
            return Err(HalberdError::parse("empty field name", colon));
        }
        self.bump();
        if self.peek().is_none_or(|c| c.is_whitespace() || c == ')') {
            return Err(HalberdError::parse(format!("field '{word}' has no term"), colon));
        }
        if word == "*" {
            return match self.read_word().as_str() {
                "*" => Ok(Some(Query::MatchAll)),
                _ => Err(HalberdError::parse("the '*' field only accepts '*:*'", start)),
            };
        }
        self.parse_value(Some(&word))
    }

    /// The part after a field specifier. Another `field:` here is an error.
    fn parse_value(&mut self, field: Option<&str>) -> Result<Option<Query>> {
        let start = self.pos;
        let parser = self.parser;

        match self.peek() {
            Some('(') => self.parse_group(field),
            Some('"') => {
                let text = self.read_quoted()?;
                parser.per_field(field, start, |name, boost| {
                    parser.analyzed_query(name, &text, boost, Occur::Must, start)
                })
            }
            Some('[' | '{') => {
                let (min, max, min_inclusive, max_inclusive) = self.read_range()?;
                parser.per_field(field, start, |name, _| {
                    Ok(Some(Query::numeric_range(
                        name,
                        min,
                        max,
                        min_inclusive,
                        max_inclusive,
                    )))
                })
            }
            _ => {
                let word = self.read_word();
                if self.peek() == Some(':') {
                    return Err(HalberdError::parse("nested field specifier", self.pos));
                }
                self.bare_word(field, word, start)
            }
        }
    }

    fn bare_word(&self, field: Option<&str>, word: String, start: usize) -> Result<Option<Query>> {
        if word.is_empty() {
            let found = self.peek().map(String::from).unwrap_or_default();
            return Err(HalberdError::parse(format!("unexpected '{found}'"), start));
        }
        let parser = self.parser;
        parser.per_field(field, start, |name, boost| {
            parser.analyzed_query(name, &word, boost, Occur::Should, start)
        })
    }

    fn parse_group(&mut self, field: Option<&str>) -> Result<Option<Query>> {
        let open = self.pos;
        if self.depth >= MAX_DEPTH {
            return Err(HalberdError::parse("groups nested too deeply", open));
        }
        self.bump();

        self.depth += 1;
        let clauses = self.parse_clauses(field, Some(open));
        self.depth -= 1;
        Ok(combine(clauses?))
    }

    /// Read a bare word, resolving `\` escapes.
    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.bump();
                if let Some(escaped) = self.bump() {
                    word.push(escaped);
                }
                continue;
            }
            if is_boundary(Some(c)) {
                break;
            }
            word.push(c);
            self.bump();
        }
        word
    }

    fn read_quoted(&mut self) -> Result<String> {
        let open = self.pos;
        self.bump();

        let mut text = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(text),
                Some('\\') => {
                    if let Some(escaped) = self.bump() {
                        text.push(escaped);
                    }
                }
                Some(c) => text.push(c),
                None => return Err(HalberdError::parse("unterminated quote", open)),
            }
        }
    }

    fn read_range(&mut self) -> Result<(Option<i64>, Option<i64>, bool, bool)> {
        let open = self.pos;
        let min_inclusive = self.bump() == Some('[');

        let min = self.read_bound()?;
        self.skip_whitespace();
        let to = self.pos;
        if self.read_word() != "TO" {
            return Err(HalberdError::parse("expected 'TO' in range", to));
        }
        let max = self.read_bound()?;
        self.skip_whitespace();

        let max_inclusive = match self.bump() {
            Some(']') => true,
            Some('}') => false,
            _ => return Err(HalberdError::parse("unclosed range", open)),
        };
        Ok((min, max, min_inclusive, max_inclusive))
    }

    fn read_bound(&mut self) -> Result<Option<i64>> {
        self.skip_whitespace();
        let offset = self.pos;
        let word = self.read_word();
        match word.as_str() {
            "" => Err(HalberdError::parse("missing range bound", offset)),
            "*" => Ok(None),
            _ => word.parse().map(Some).map_err(|_| {
                HalberdError::parse(format!("range bound '{word}' is not an integer"), offset)
            }),
        }
    }
}
