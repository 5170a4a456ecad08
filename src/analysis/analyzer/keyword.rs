//! Analyzer for exact-match values such as ids, paths and tags.
//!
//! ```
//! use halberd::analysis::analyzer::Analyzer;
//! use halberd::analysis::analyzer::keyword::KeywordAnalyzer;
//!
//! let terms: Vec<_> = KeywordAnalyzer::new()
//!     .analyze("user-123-abc")
//!     .unwrap()
//!     .map(|t| t.text)
//!     .collect();
//! assert_eq!(terms, vec!["user-123-abc"]);
//! ```

use crate::analysis::analyzer::Analyzer;
use crate::analysis::token::TokenStream;
use crate::analysis::tokenizer::Tokenizer;
use crate::analysis::tokenizer::whole::WholeTokenizer;
use crate::error::Result;

/// Indexes the value as a single term, case and punctuation untouched.
///
/// Give it to a query parser for untokenized string fields so parsed terms
/// match the indexed values.
#[derive(Clone, Debug, Default)]
pub struct KeywordAnalyzer {
    whole: WholeTokenizer,
}

impl KeywordAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Analyzer for KeywordAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        self.whole.tokenize(text)
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_is_one_term() {
        let analyzer = KeywordAnalyzer::new();
        let terms: Vec<String> = analyzer.analyze("Hello World").unwrap().map(|t| t.text).collect();
        assert_eq!(terms, vec!["Hello World"]);
        assert_eq!(analyzer.analyze("").unwrap().count(), 0);
    }
}
