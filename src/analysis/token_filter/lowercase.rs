//! Case folding.

use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::Filter;
use crate::error::Result;

/// Lowercases token text; tokens already marked stopped are left alone.
///
/// ```
/// use halberd::analysis::token::{Token, TokenStream};
/// use halberd::analysis::token_filter::Filter;
/// use halberd::analysis::token_filter::lowercase::LowercaseFilter;
///
/// let input: TokenStream = Box::new(vec![Token::new("Apache", 0), Token::new("LUCENE", 1)].into_iter());
/// let lowered: Vec<_> = LowercaseFilter::new().filter(input).unwrap().map(|t| t.text).collect();
/// assert_eq!(lowered, vec!["apache", "lucene"]);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct LowercaseFilter;

impl LowercaseFilter {
    pub fn new() -> Self {
        LowercaseFilter
    }
}

fn fold(text: &str) -> Option<String> {
    if text.is_ascii() {
        // Skip the allocation when nothing changes.
        text.bytes()
            .any(|b| b.is_ascii_uppercase())
            .then(|| text.to_ascii_lowercase())
    } else {
        Some(text.to_lowercase())
    }
}

impl Filter for LowercaseFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        Ok(Box::new(tokens.map(|token| {
            if token.is_stopped() {
                return token;
            }
            match fold(&token.text) {
                Some(lowered) => token.with_text(lowered),
                None => token,
            }
        })))
    }

    fn name(&self) -> &'static str {
        "lowercase"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::token::Token;

    #[test]
    fn test_ascii_unicode_and_stopped() {
        let tokens = vec![
            Token::new("already", 0),
            Token::new("WORLD", 1),
            Token::new("ÉCOLE", 2),
            Token::new("Keep", 3).stop(),
        ];

        let result: Vec<String> = LowercaseFilter::new()
            .filter(Box::new(tokens.into_iter()))
            .unwrap()
            .map(|t| t.text)
            .collect();

        assert_eq!(result, vec!["already", "world", "école", "Keep"]);
    }
}
