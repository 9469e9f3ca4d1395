//! Per-document records of the current result page.
//!
//! One `DocumentView` per document keeps the document together with its
//! hit count, rank and snippet, so the values can never drift out of
//! alignment with the page they belong to.

use corpus_types::Document;
use serde::{Deserialize, Serialize};

/// Sentinel rank reported for a page position without a rank.
pub const UNKNOWN_RANK: f32 = -1.0;

/// Sentinel hit count reported for a document without hit information.
pub const UNKNOWN_HITS: i64 = -1;

/// A document on the current result page and its derived values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentView {
    /// The document itself
    pub document: Document,

    /// Number of search hits inside the document
    #[serde(default)]
    pub hit_count: Option<u32>,

    /// Ranking score assigned by the executor
    #[serde(default)]
    pub rank: Option<f32>,

    /// Highlighted snippet assigned by the executor
    #[serde(default)]
    pub snippet: Option<String>,
}

impl DocumentView {
    /// Wrap a document with no derived values.
    pub fn new(document: Document) -> Self {
        Self {
            document,
            hit_count: None,
            rank: None,
            snippet: None,
        }
    }

    /// Builder: set the hit count
    pub fn with_hits(mut self, hits: u32) -> Self {
        self.hit_count = Some(hits);
        self
    }

    /// Builder: set the rank
    pub fn with_rank(mut self, rank: f32) -> Self {
        self.rank = Some(rank);
        self
    }

    /// Builder: set the snippet
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }
}

impl From<Document> for DocumentView {
    fn from(document: Document) -> Self {
        Self::new(document)
    }
}
