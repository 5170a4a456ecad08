//! Filters rewrite or drop tokens after tokenization.
//!
//! Filters run in sequence, each consuming the previous stream lazily, e.g.
//! tokenizer, then [`lowercase`], then [`stop`].

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// A stage that maps one token stream to another.
///
/// ```
/// use halberd::analysis::token::{Token, TokenStream};
/// use halberd::analysis::token_filter::Filter;
/// use halberd::error::Result;
///
/// /// Drops tokens shorter than three bytes.
/// struct MinLength;
///
/// impl Filter for MinLength {
///     fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
///         Ok(Box::new(tokens.filter(|t| t.text.len() >= 3)))
///     }
///
///     fn name(&self) -> &'static str {
///         "min_length"
///     }
/// }
///
/// let input: TokenStream = Box::new(vec![Token::new("go", 0), Token::new("rust", 1)].into_iter());
/// let kept: Vec<_> = MinLength.filter(input).unwrap().map(|t| t.text).collect();
/// assert_eq!(kept, vec!["rust"]);
/// ```
pub trait Filter: Send + Sync {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream>;

    /// Short identifier for debug output.
    fn name(&self) -> &'static str;
}

pub mod lowercase;
pub mod stop;
