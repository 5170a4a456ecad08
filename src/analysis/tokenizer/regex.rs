//! Regex-based tokenizer implementation.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use super::Tokenizer;
use crate::analysis::token::{Token, TokenStream};
use crate::error::{HalberdError, Result};

static WORD_PATTERN: LazyLock<Arc<Regex>> =
    LazyLock::new(|| Arc::new(Regex::new(r"\w+").expect("word pattern is valid")));

/// A tokenizer that emits every match of a regular expression.
///
/// With `gaps` set, the text *between* matches is emitted instead, which
/// turns a separator pattern into a splitter.
#[derive(Clone, Debug)]
pub struct RegexTokenizer {
    pattern: Arc<Regex>,
    gaps: bool,
}

impl RegexTokenizer {
    /// Create a tokenizer matching runs of word characters (`\w+`).
    pub fn new() -> Self {
        RegexTokenizer {
            pattern: Arc::clone(&WORD_PATTERN),
            gaps: false,
        }
    }

    /// Create a tokenizer emitting matches of a custom pattern.
    pub fn with_pattern(pattern: &str) -> Result<Self> {
        Ok(RegexTokenizer {
            pattern: Arc::new(compile(pattern)?),
            gaps: false,
        })
    }

    /// Create a tokenizer emitting the text between matches of `pattern`.
    pub fn with_gaps(pattern: &str) -> Result<Self> {
        Ok(RegexTokenizer {
            pattern: Arc::new(compile(pattern)?),
            gaps: true,
        })
    }

    /// Get the regex pattern used by this tokenizer.
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| HalberdError::analysis(format!("Invalid regex pattern: {e}")))
}

impl Default for RegexTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer for RegexTokenizer {
    fn tokenize(&self, text: &str) -> Result<TokenStream> {
        let tokens: Vec<Token> = if self.gaps {
            let mut spans = Vec::new();
            let mut last_end = 0;
            for mat in self.pattern.find_iter(text) {
                if mat.start() > last_end {
                    spans.push((last_end, mat.start()));
                }
                last_end = mat.end();
            }
            if last_end < text.len() {
                spans.push((last_end, text.len()));
            }

            spans
                .into_iter()
                .enumerate()
                .map(|(position, (start, end))| {
                    Token::with_offsets(&text[start..end], position, start, end)
                })
                .collect()
        } else {
            self.pattern
                .find_iter(text)
                .filter(|mat| !mat.is_empty())
                .enumerate()
                .map(|(position, mat)| {
                    Token::with_offsets(mat.as_str(), position, mat.start(), mat.end())
                })
                .collect()
        };

        Ok(Box::new(tokens.into_iter()))
    }

    fn name(&self) -> &'static str {
        "regex"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_tokenizer() {
        let tokenizer = RegexTokenizer::new();
        let tokens: Vec<Token> = tokenizer.tokenize("hello, world").unwrap().collect();

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, "hello");
        assert_eq!(tokens[0].position, 0);
        assert_eq!((tokens[0].start_offset, tokens[0].end_offset), (0, 5));

        assert_eq!(tokens[1].text, "world");
        assert_eq!(tokens[1].position, 1);
        assert_eq!((tokens[1].start_offset, tokens[1].end_offset), (7, 12));
    }

    #[test]
    fn test_regex_tokenizer_with_gaps() {
        let tokenizer = RegexTokenizer::with_gaps(r"[,;]\s*").unwrap();
        let tokens: Vec<Token> = tokenizer.tokenize("lucene; search,index").unwrap().collect();

        let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["lucene", "search", "index"]);
        assert_eq!(tokens[2].start_offset, 15);
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(
            RegexTokenizer::with_pattern("(unclosed"),
            Err(HalberdError::Analysis(_))
        ));
    }

    #[test]
    fn test_tokenizer_name() {
        assert_eq!(RegexTokenizer::new().name(), "regex");
        assert_eq!(RegexTokenizer::new().pattern(), r"\w+");
    }
}
