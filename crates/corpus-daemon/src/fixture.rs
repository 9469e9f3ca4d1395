//! JSON corpus fixtures and the executor that searches them.
//!
//! A fixture holds the documents of a small corpus plus precomputed
//! annotation and embedding results. `FixtureExecutor` answers page
//! requests by whole-word token matching over the cleaned full text.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use corpus_search::{
    DocumentView, OrderByColumn, PageRequest, SearchExecutor, SearchLayer, SearchOrder,
    SearchOutcome,
};
use corpus_types::{
    AnnotationSearchResult, Document, DocumentChunkEmbeddingSearchResult, DocumentId,
    FilterOperator, MetadataFilter,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Contents of a fixture file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    pub documents: Vec<Document>,

    #[serde(default)]
    pub named_entities: Vec<AnnotationSearchResult>,

    #[serde(default)]
    pub taxa: Vec<AnnotationSearchResult>,

    #[serde(default)]
    pub times: Vec<AnnotationSearchResult>,

    #[serde(default)]
    pub embeddings: Vec<DocumentChunkEmbeddingSearchResult>,
}

impl Fixture {
    /// Read a fixture from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture {:?}", path))?;
        let fixture: Fixture = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse fixture {:?}", path))?;
        debug!(
            documents = fixture.documents.len(),
            named_entities = fixture.named_entities.len(),
            "Loaded fixture"
        );
        Ok(fixture)
    }
}

/// Executor over an in-memory fixture.
pub struct FixtureExecutor {
    fixture: Fixture,
    snippet_words: usize,
}

impl FixtureExecutor {
    pub fn new(fixture: Fixture, snippet_words: usize) -> Self {
        Self {
            fixture,
            snippet_words,
        }
    }

    fn normalize(word: &str) -> String {
        word.trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase()
    }

    /// Token occurrences and word count of a document's text.
    fn count_hits(document: &Document, tokens: &[String]) -> (u32, usize) {
        let Some(text) = document.full_text_cleaned.as_deref() else {
            return (0, 0);
        };
        let mut hits = 0;
        let mut words = 0;
        for word in text.split_whitespace() {
            words += 1;
            if tokens.contains(&Self::normalize(word)) {
                hits += 1;
            }
        }
        (hits, words)
    }

    fn metadata_value<'a>(document: &'a Document, key: &str) -> Option<&'a str> {
        match key {
            "language" => Some(document.language.as_str()),
            "title" => document.title.as_deref(),
            "document_id" => Some(document.document_id.as_str()),
            _ => None,
        }
    }

    /// Unknown keys match nothing.
    fn filter_matches(document: &Document, filter: &MetadataFilter) -> bool {
        let Some(actual) = Self::metadata_value(document, &filter.key) else {
            return false;
        };
        let expected = filter.value.as_str();
        match filter.operator {
            FilterOperator::Equals => actual == expected,
            FilterOperator::Contains => actual.contains(expected),
            FilterOperator::GreaterThan | FilterOperator::LessThan => {
                let ordering = match (actual.parse::<f64>(), expected.parse::<f64>()) {
                    (Ok(a), Ok(e)) => a.total_cmp(&e),
                    _ => actual.cmp(expected),
                };
                if filter.operator == FilterOperator::GreaterThan {
                    ordering.is_gt()
                } else {
                    ordering.is_lt()
                }
            }
        }
    }

    fn matching_views(&self, request: &PageRequest) -> Vec<DocumentView> {
        let tokens = &request.query.tokens;
        self.fixture
            .documents
            .iter()
            .filter(|d| {
                request
                    .query
                    .metadata_filters
                    .iter()
                    .all(|f| Self::filter_matches(d, f))
            })
            .filter_map(|d| {
                let (hits, words) = Self::count_hits(d, tokens);
                if !tokens.is_empty() && hits == 0 {
                    return None;
                }
                let rank = if words == 0 {
                    0.0
                } else {
                    hits as f32 / words as f32
                };
                Some(
                    DocumentView::new(d.clone())
                        .with_hits(hits)
                        .with_rank(rank)
                        .with_snippet(d.snippet(self.snippet_words)),
                )
            })
            .collect()
    }

    fn annotations_of(
        results: &[AnnotationSearchResult],
        selected: bool,
        matched: &HashSet<DocumentId>,
    ) -> Vec<AnnotationSearchResult> {
        if !selected {
            return Vec::new();
        }
        results
            .iter()
            .filter(|r| matched.contains(&r.document_id))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl SearchExecutor for FixtureExecutor {
    async fn execute(&self, request: &PageRequest) -> Result<SearchOutcome, String> {
        let mut views = self.matching_views(request);

        match request.order_by {
            OrderByColumn::DocumentTitle => views.sort_by(|a, b| {
                a.document
                    .display_title()
                    .cmp(b.document.display_title())
            }),
            OrderByColumn::Rank => views.sort_by(|a, b| {
                a.rank
                    .unwrap_or_default()
                    .total_cmp(&b.rank.unwrap_or_default())
            }),
            // Fixture documents carry no date; insertion id stands in
            OrderByColumn::Date => views.sort_by_key(|v| v.document.id),
        }
        if request.order == SearchOrder::Desc {
            views.reverse();
        }

        let matched: HashSet<DocumentId> = views.iter().map(|v| v.document.id).collect();
        let query = &request.query;

        let outcome = SearchOutcome {
            total_hits: views.len() as u64,
            named_entities: Self::annotations_of(
                &self.fixture.named_entities,
                query.has_layer(SearchLayer::NamedEntities),
                &matched,
            ),
            taxa: Self::annotations_of(
                &self.fixture.taxa,
                query.has_layer(SearchLayer::Taxon),
                &matched,
            ),
            times: Self::annotations_of(
                &self.fixture.times,
                query.has_layer(SearchLayer::Time),
                &matched,
            ),
            embeddings: if query.has_layer(SearchLayer::Embeddings) {
                self.fixture
                    .embeddings
                    .iter()
                    .filter(|e| matched.contains(&e.document_id))
                    .cloned()
                    .collect()
            } else {
                Vec::new()
            },
            documents: views
                .into_iter()
                .skip(request.skip())
                .take(request.take)
                .collect(),
        };

        debug!(
            total_hits = outcome.total_hits,
            page = request.page,
            returned = outcome.documents.len(),
            "Fixture search executed"
        );
        Ok(outcome)
    }
}
