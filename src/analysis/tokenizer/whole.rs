//! Single-token tokenizer for untokenized values.

use super::Tokenizer;

use crate::analysis::token::{Token, TokenStream};
use crate::error::Result;

/// Largest term the index accepts, in bytes.
pub const MAX_TERM_BYTES: usize = 32_766;

/// Emits the input as one token, cut at [`MAX_TERM_BYTES`] on a char
/// boundary. Empty input yields nothing.
#[derive(Clone, Copy, Debug)]
pub struct WholeTokenizer {
    max_bytes: usize,
}

impl WholeTokenizer {
    pub fn new() -> Self {
        WholeTokenizer {
            max_bytes: MAX_TERM_BYTES,
        }
    }

    /// Use a smaller cut-off.
    pub fn with_max_bytes(max_bytes: usize) -> Self {
        WholeTokenizer {
            max_bytes: max_bytes.min(MAX_TERM_BYTES),
        }
    }

    fn cut<'a>(&self, text: &'a str) -> &'a str {
        if text.len() <= self.max_bytes {
            return text;
        }
        let mut end = self.max_bytes;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        &text[..end]
    }
}

impl Default for WholeTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer for WholeTokenizer {
    fn tokenize(&self, text: &str) -> Result<TokenStream> {
        let value = self.cut(text);
        let token = (!value.is_empty()).then(|| Token::with_offsets(value, 0, 0, value.len()));
        Ok(Box::new(token.into_iter()))
    }

    fn name(&self) -> &'static str {
        "whole"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tokenizer: &WholeTokenizer, input: &str) -> Vec<String> {
        tokenizer.tokenize(input).unwrap().map(|t| t.text).collect()
    }

    #[test]
    fn test_path_stays_whole() {
        let tokenizer = WholeTokenizer::new();
        let token = tokenizer.tokenize("/docs/Lucene in Action.txt").unwrap().next().unwrap();
        assert_eq!(token.text, "/docs/Lucene in Action.txt");
        assert_eq!(token.end_offset, 26);
        assert!(texts(&tokenizer, "").is_empty());
    }

    #[test]
    fn test_cut_respects_char_boundary() {
        let tokenizer = WholeTokenizer::with_max_bytes(4);
        // 'é' is two bytes and straddles the limit.
        assert_eq!(texts(&tokenizer, "abcé"), vec!["abc"]);
        assert_eq!(texts(&tokenizer, "abcd"), vec!["abcd"]);
    }
}
