//! Unicode word tokenizer implementation.
//!
//! Splits text on Unicode word boundaries (UAX #29) and drops segments that
//! contain no letters or digits. Han ideographs, hiragana and katakana are
//! emitted one character per token: scripts written without spaces are then
//! searchable character by character without a segmentation dictionary.
//!
//! ```
//! use halberd::analysis::tokenizer::Tokenizer;
//! use halberd::analysis::tokenizer::unicode_word::UnicodeWordTokenizer;
//!
//! let tokenizer = UnicodeWordTokenizer::new();
//! let texts: Vec<_> = tokenizer
//!     .tokenize("Hello, world! 搜索")
//!     .unwrap()
//!     .map(|t| t.text)
//!     .collect();
//! assert_eq!(texts, vec!["Hello", "world", "搜", "索"]);
//! ```

use unicode_segmentation::UnicodeSegmentation;

use crate::analysis::token::{Token, TokenStream};
use crate::analysis::tokenizer::Tokenizer;
use crate::error::Result;

/// A tokenizer that splits text on Unicode word boundaries.
#[derive(Clone, Debug, Default)]
pub struct UnicodeWordTokenizer;

impl UnicodeWordTokenizer {
    /// Create a new Unicode word tokenizer.
    pub fn new() -> Self {
        UnicodeWordTokenizer
    }
}

/// Characters from scripts that do not separate words with spaces.
fn is_ideographic(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{309F}' |   // Hiragana
        '\u{30A0}'..='\u{30FF}' |   // Katakana
        '\u{3400}'..='\u{4DBF}' |   // CJK Extension A
        '\u{4E00}'..='\u{9FFF}' |   // CJK Unified Ideographs
        '\u{F900}'..='\u{FAFF}' |   // CJK Compatibility Ideographs
        '\u{20000}'..='\u{2CEAF}'   // CJK Extensions B-E
    )
}

impl Tokenizer for UnicodeWordTokenizer {
    fn tokenize(&self, text: &str) -> Result<TokenStream> {
        let mut tokens = Vec::new();

        for (offset, word) in text.split_word_bound_indices() {
            if !word.chars().any(char::is_alphanumeric) {
                continue;
            }

            if word.chars().any(is_ideographic) {
                // Split into runs: each ideograph alone, other characters grouped.
                let mut run_start: Option<usize> = None;
                for (i, c) in word.char_indices() {
                    if is_ideographic(c) {
                        if let Some(start) = run_start.take() {
                            push_token(&mut tokens, word, offset, start, i);
                        }
                        push_token(&mut tokens, word, offset, i, i + c.len_utf8());
                    } else if c.is_alphanumeric() {
                        run_start.get_or_insert(i);
                    } else if let Some(start) = run_start.take() {
                        push_token(&mut tokens, word, offset, start, i);
                    }
                }
                if let Some(start) = run_start {
                    push_token(&mut tokens, word, offset, start, word.len());
                }
            } else {
                let position = tokens.len();
                tokens.push(Token::with_offsets(
                    word,
                    position,
                    offset,
                    offset + word.len(),
                ));
            }
        }

        Ok(Box::new(tokens.into_iter()))
    }

    fn name(&self) -> &'static str {
        "unicode_word"
    }
}

fn push_token(tokens: &mut Vec<Token>, word: &str, base: usize, start: usize, end: usize) {
    let position = tokens.len();
    tokens.push(Token::with_offsets(
        &word[start..end],
        position,
        base + start,
        base + end,
    ));
}
