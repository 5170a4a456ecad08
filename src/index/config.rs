//! Index writer configuration.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzer::standard::StandardAnalyzer;

/// Configuration for an [`IndexWriter`](crate::index::writer::IndexWriter).
///
/// The analyzer is not serialized; a deserialized config uses the standard
/// analyzer.
#[derive(Clone, Serialize, Deserialize)]
pub struct IndexWriterConfig {
    /// Number of buffered documents that triggers an automatic flush.
    pub max_buffered_docs: usize,

    /// Segment count above which adjacent segments are merged after a flush.
    ///
    /// Also the number of segments merged together at once.
    pub merge_factor: usize,

    /// How long to keep retrying when the write lock is held elsewhere.
    /// `None` fails immediately.
    pub lock_timeout: Option<Duration>,

    /// Analyzer for tokenized text fields.
    ///
    /// Can be a [`PerFieldAnalyzer`](crate::analysis::PerFieldAnalyzer) to
    /// use different analyzers for different fields.
    #[serde(skip, default = "default_analyzer")]
    pub analyzer: Arc<dyn Analyzer>,
}

fn default_analyzer() -> Arc<dyn Analyzer> {
    Arc::new(StandardAnalyzer::new())
}

impl IndexWriterConfig {
    /// Default configuration with a custom analyzer.
    pub fn with_analyzer(analyzer: Arc<dyn Analyzer>) -> Self {
        IndexWriterConfig {
            analyzer,
            ..Default::default()
        }
    }
}

impl Default for IndexWriterConfig {
    fn default() -> Self {
        IndexWriterConfig {
            max_buffered_docs: 10_000,
            merge_factor: 10,
            lock_timeout: None,
            analyzer: default_analyzer(),
        }
    }
}

impl std::fmt::Debug for IndexWriterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexWriterConfig")
            .field("max_buffered_docs", &self.max_buffered_docs)
            .field("merge_factor", &self.merge_factor)
            .field("lock_timeout", &self.lock_timeout)
            .field("analyzer", &self.analyzer.name())
            .finish()
    }
}
