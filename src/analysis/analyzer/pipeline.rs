//! Analyzer assembled from parts.
//!
//! ```
//! use std::sync::Arc;
//!
//! use halberd::analysis::analyzer::Analyzer;
//! use halberd::analysis::analyzer::pipeline::PipelineAnalyzer;
//! use halberd::analysis::token_filter::lowercase::LowercaseFilter;
//! use halberd::analysis::token_filter::stop::StopFilter;
//! use halberd::analysis::tokenizer::regex::RegexTokenizer;
//!
//! let analyzer = PipelineAnalyzer::new(Arc::new(RegexTokenizer::new()))
//!     .add_filter(Arc::new(LowercaseFilter::new()))
//!     .add_filter(Arc::new(StopFilter::from_words(["of", "the"])))
//!     .with_name("title");
//!
//! let terms: Vec<_> = analyzer
//!     .analyze("The Lord of the Rings")
//!     .unwrap()
//!     .map(|t| t.text)
//!     .collect();
//! assert_eq!(terms, vec!["lord", "rings"]);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::Filter;
use crate::analysis::tokenizer::Tokenizer;
use crate::error::Result;

/// One tokenizer followed by filters, applied in the order they were added.
#[derive(Clone)]
pub struct PipelineAnalyzer {
    tokenizer: Arc<dyn Tokenizer>,
    stages: Vec<Arc<dyn Filter>>,
    label: String,
}

impl PipelineAnalyzer {
    /// Start a pipeline. Its label defaults to `pipeline_<tokenizer>`.
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        let label = format!("pipeline_{}", tokenizer.name());
        PipelineAnalyzer {
            tokenizer,
            stages: Vec::new(),
            label,
        }
    }

    pub fn add_filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.stages.push(filter);
        self
    }

    pub fn with_name(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// The label given with [`with_name`](Self::with_name).
    pub fn pipeline_name(&self) -> &str {
        &self.label
    }

    pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
        &self.tokenizer
    }

    pub fn filters(&self) -> &[Arc<dyn Filter>] {
        &self.stages
    }
}

impl Analyzer for PipelineAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        let tokens = self.tokenizer.tokenize(text)?;
        self.stages
            .iter()
            .try_fold(tokens, |tokens, stage| stage.filter(tokens))
    }

    fn name(&self) -> &'static str {
        "pipeline"
    }
}

impl fmt::Debug for PipelineAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stages: Vec<&str> = self.stages.iter().map(|stage| stage.name()).collect();
        write!(f, "PipelineAnalyzer({}: {}", self.label, self.tokenizer.name())?;
        for stage in stages {
            write!(f, " -> {stage}")?;
        }
        write!(f, ")")
    }
}
