//! Stop word removal.
//!
//! A query made only of stop words analyzes to nothing, which the query
//! parser reports as an error.
//!
//! ```
//! use halberd::analysis::token::{Token, TokenStream};
//! use halberd::analysis::token_filter::Filter;
//! use halberd::analysis::token_filter::stop::StopFilter;
//!
//! let input: TokenStream = Box::new(
//!     ["the", "quick", "brown"].into_iter().enumerate().map(|(i, w)| Token::new(w, i)),
//! );
//! let kept: Vec<_> = StopFilter::new().filter(input).unwrap().map(|t| t.text).collect();
//! assert_eq!(kept, vec!["quick", "brown"]);
//! ```

use std::sync::{Arc, LazyLock};

use ahash::AHashSet;

use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::Filter;
use crate::error::Result;

/// English stop words used by [`StandardAnalyzer`](crate::analysis::StandardAnalyzer).
pub const DEFAULT_ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

type WordSet = Arc<AHashSet<String>>;

static ENGLISH: LazyLock<WordSet> =
    LazyLock::new(|| Arc::new(DEFAULT_ENGLISH_STOP_WORDS.iter().map(|w| w.to_string()).collect()));

/// Drops tokens whose text is in a word set.
///
/// Comparison is exact; lowercase first for case-insensitive removal. With
/// [`remove_stopped(false)`](Self::remove_stopped) the tokens stay in the
/// stream flagged as stopped, and the writer skips them.
#[derive(Clone, Debug)]
pub struct StopFilter {
    words: WordSet,
    drop: bool,
}

impl StopFilter {
    /// The English list.
    pub fn new() -> Self {
        StopFilter {
            words: Arc::clone(&ENGLISH),
            drop: true,
        }
    }

    /// A custom list.
    ///
    /// ```
    /// use halberd::analysis::token_filter::stop::StopFilter;
    ///
    /// let filter = StopFilter::from_words(["foo", "bar", "foo"]);
    /// assert_eq!(filter.len(), 2);
    /// assert!(filter.is_stop_word("bar"));
    /// ```
    pub fn from_words<I>(words: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        StopFilter {
            words: Arc::new(words.into_iter().map(Into::into).collect()),
            drop: true,
        }
    }

    pub fn remove_stopped(mut self, remove: bool) -> Self {
        self.drop = remove;
        self
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Default for StopFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for StopFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        let words = Arc::clone(&self.words);
        let drop = self.drop;

        Ok(Box::new(tokens.filter_map(move |token| {
            match (token.is_stopped() || !words.contains(&token.text), drop) {
                (true, _) => Some(token),
                (false, true) => None,
                (false, false) => Some(token.stop()),
            }
        })))
    }

    fn name(&self) -> &'static str {
        "stop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::token::Token;

    fn stream(words: &[&str]) -> TokenStream {
        let tokens: Vec<Token> = words
            .iter()
            .enumerate()
            .map(|(position, word)| Token::new(*word, position))
            .collect();
        Box::new(tokens.into_iter())
    }

    #[test]
    fn test_positions_keep_gaps() {
        let filter = StopFilter::from_words(["the", "and"]);
        let kept: Vec<Token> = filter
            .filter(stream(&["cats", "and", "the", "dogs"]))
            .unwrap()
            .collect();

        let texts: Vec<&str> = kept.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["cats", "dogs"]);
        assert_eq!(kept[1].position, 3);
    }

    #[test]
    fn test_mark_instead_of_drop() {
        let filter = StopFilter::from_words(["the"]).remove_stopped(false);
        let marked: Vec<bool> = filter
            .filter(stream(&["the", "quick"]))
            .unwrap()
            .map(|t| t.is_stopped())
            .collect();
        assert_eq!(marked, vec![true, false]);
    }

    #[test]
    fn test_english_list() {
        let filter = StopFilter::new();
        assert_eq!(filter.len(), DEFAULT_ENGLISH_STOP_WORDS.len());
        assert!(filter.is_stop_word("with"));
        assert!(!filter.is_stop_word("lucene"));
        assert!(!filter.is_stop_word("The"));
    }
}
