//! Splitting raw field text into tokens.
//!
//! | tokenizer | splits on |
//! |---|---|
//! | [`regex::RegexTokenizer`] | matches of a pattern (`\w+` by default) |
//! | [`unicode_word::UnicodeWordTokenizer`] | UAX #29 word boundaries, CJK ideographs one by one |
//! | [`whole::WholeTokenizer`] | nothing; the value is one token |

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// First stage of an analyzer.
///
/// Implementations keep no state between calls, so the same text always
/// produces the same tokens. Positions count from zero and offsets are byte
/// offsets into `text`.
///
/// ```
/// use halberd::analysis::token::{Token, TokenStream};
/// use halberd::analysis::tokenizer::Tokenizer;
/// use halberd::error::Result;
///
/// /// Splits tags like "rust;search;index".
/// struct TagTokenizer;
///
/// impl Tokenizer for TagTokenizer {
///     fn tokenize(&self, text: &str) -> Result<TokenStream> {
///         let mut start = 0;
///         let mut tokens = Vec::new();
///         for (position, tag) in text.split(';').enumerate() {
///             tokens.push(Token::with_offsets(tag, position, start, start + tag.len()));
///             start += tag.len() + 1;
///         }
///         Ok(Box::new(tokens.into_iter()))
///     }
///
///     fn name(&self) -> &'static str {
///         "tag"
///     }
/// }
///
/// let tags: Vec<_> = TagTokenizer.tokenize("rust;search").unwrap().collect();
/// assert_eq!(tags[1].text, "search");
/// assert_eq!(tags[1].start_offset, 5);
/// ```
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Result<TokenStream>;

    /// Short identifier, used in analyzer names and debug output.
    fn name(&self) -> &'static str;
}

pub mod regex;
pub mod unicode_word;
pub mod whole;
