//! Analyzers combine a tokenizer with a chain of filters.
//!
//! | Analyzer | Tokenizer | Filters |
//! |----------|-----------|---------|
//! | [`standard::StandardAnalyzer`] | unicode word | lowercase, English stop words |
//! | [`simple::SimpleAnalyzer`] | unicode word | lowercase |
//! | [`keyword::KeywordAnalyzer`] | whole input | none |
//! | [`pipeline::PipelineAnalyzer`] | any | any |
//! | [`per_field::PerFieldAnalyzer`] | per field | per field |

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for analyzers that convert text into processed tokens.
///
/// Analysis must be deterministic: the writer and the query parser rely on
/// the same text producing the same terms.
pub trait Analyzer: Send + Sync {
    /// Analyze the given text and return a stream of tokens.
    fn analyze(&self, text: &str) -> Result<TokenStream>;

    /// Analyze text belonging to a named field.
    ///
    /// Field-aware analyzers override this; everything else ignores the field.
    fn analyze_field(&self, _field: &str, text: &str) -> Result<TokenStream> {
        self.analyze(text)
    }

    /// Get the name of this analyzer (for debugging and configuration).
    fn name(&self) -> &'static str;
}

pub mod keyword;
pub mod per_field;
pub mod pipeline;
pub mod simple;
pub mod standard;
