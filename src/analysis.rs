//! Text analysis: turning field text into the terms that get indexed.
//!
//! An [`Analyzer`] is a [`Tokenizer`] followed by a chain of token
//! [`Filter`]s. The same analyzer must be used at index time and at query
//! parse time, otherwise query terms will not line up with indexed terms.
//!
//! ```
//! use halberd::analysis::{Analyzer, StandardAnalyzer};
//!
//! let analyzer = StandardAnalyzer::new();
//! let terms: Vec<String> = analyzer
//!     .analyze("The Quick brown fox")
//!     .unwrap()
//!     .map(|token| token.text)
//!     .collect();
//! assert_eq!(terms, vec!["quick", "brown", "fox"]);
//! ```

pub mod analyzer;
pub mod token;
pub mod token_filter;
pub mod tokenizer;

pub use analyzer::keyword::KeywordAnalyzer;
pub use analyzer::per_field::PerFieldAnalyzer;
pub use analyzer::pipeline::PipelineAnalyzer;
pub use analyzer::simple::SimpleAnalyzer;
pub use analyzer::standard::StandardAnalyzer;
pub use analyzer::Analyzer;
pub use token::{Token, TokenStream};
pub use token_filter::Filter;
pub use tokenizer::Tokenizer;
