//! Query execution seam.
//!
//! A `SearchExecutor` turns a `PageRequest` built from the session into a
//! `SearchOutcome`: total hits, the requested page and the annotation and
//! embedding result sets. Ranking, similarity and database access all live
//! behind this trait.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use corpus_types::{AnnotationSearchResult, DocumentChunkEmbeddingSearchResult};
use serde::{Deserialize, Serialize};

use crate::types::{OrderByColumn, SearchOrder, SearchQuery};
use crate::view::DocumentView;

/// Everything an executor needs to produce one result page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Query parameters
    pub query: SearchQuery,

    /// 1-based page number
    pub page: usize,

    /// Page size
    pub take: usize,

    /// Sort direction
    pub order: SearchOrder,

    /// Sort column
    pub order_by: OrderByColumn,
}

impl PageRequest {
    /// Number of documents preceding the requested page.
    pub fn skip(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.take)
    }
}

/// Result of executing a page request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Total documents matching the query, across all pages
    pub total_hits: u64,

    /// Documents of the requested page, in display order
    pub documents: Vec<DocumentView>,

    /// Named-entity matches
    #[serde(default)]
    pub named_entities: Vec<AnnotationSearchResult>,

    /// Taxon matches
    #[serde(default)]
    pub taxa: Vec<AnnotationSearchResult>,

    /// Temporal expression matches
    #[serde(default)]
    pub times: Vec<AnnotationSearchResult>,

    /// Embedding chunk matches
    #[serde(default)]
    pub embeddings: Vec<DocumentChunkEmbeddingSearchResult>,
}

/// Trait for query-execution collaborators.
#[async_trait]
pub trait SearchExecutor: Send + Sync {
    /// Execute a request and return the page plus result sets.
    async fn execute(&self, request: &PageRequest) -> Result<SearchOutcome, String>;
}

/// Mock executor for testing.
///
/// Holds every matching document and slices out the requested page,
/// honouring the requested order.
#[derive(Default)]
pub struct MockSearchExecutor {
    /// Full result, before pagination
    pub outcome: SearchOutcome,
    /// Simulated latency
    pub delay: Option<Duration>,
    /// Whether every call fails
    pub fail: bool,
    calls: AtomicUsize,
}

impl MockSearchExecutor {
    /// Create an executor over the given documents.
    pub fn with_documents(documents: Vec<DocumentView>) -> Self {
        Self {
            outcome: SearchOutcome {
                total_hits: documents.len() as u64,
                documents,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Builder: set annotation result sets
    pub fn with_annotations(
        mut self,
        named_entities: Vec<AnnotationSearchResult>,
        taxa: Vec<AnnotationSearchResult>,
        times: Vec<AnnotationSearchResult>,
    ) -> Self {
        self.outcome.named_entities = named_entities;
        self.outcome.taxa = taxa;
        self.outcome.times = times;
        self
    }

    /// Builder: add latency to every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Builder: fail every call
    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Number of `execute` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchExecutor for MockSearchExecutor {
    async fn execute(&self, request: &PageRequest) -> Result<SearchOutcome, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail {
            return Err("mock executor failure".to_string());
        }

        let mut documents = self.outcome.documents.clone();
        match request.order_by {
            OrderByColumn::DocumentTitle => documents.sort_by(|a, b| {
                a.document
                    .display_title()
                    .cmp(b.document.display_title())
            }),
            OrderByColumn::Date => documents.sort_by_key(|v| v.document.id),
            OrderByColumn::Rank => documents.sort_by(|a, b| {
                a.rank
                    .unwrap_or(f32::MIN)
                    .total_cmp(&b.rank.unwrap_or(f32::MIN))
            }),
        }
        if request.order == SearchOrder::Desc {
            documents.reverse();
        }

        Ok(SearchOutcome {
            total_hits: self.outcome.total_hits,
            documents: documents
                .into_iter()
                .skip(request.skip())
                .take(request.take)
                .collect(),
            ..self.outcome.clone()
        })
    }
}
