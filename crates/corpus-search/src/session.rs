//! Search session state.
//!
//! `SearchSession` is the single source of truth for one user's active
//! search: the query, the annotation/embedding result sets, pagination and
//! ordering, and the current page of `DocumentView`s.
//!
//! Mutators are the only place where filtering, sorting and derived
//! recomputation happen; accessors are pure projections. The session does
//! no locking of its own: callers serialize access (see the session
//! manager).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use corpus_types::{
    AnnotationKind, AnnotationSearchResult, CorpusConfig, Document, DocumentChunkEmbeddingSearchResult,
    DocumentId, MetadataFilter,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SearchError;
use crate::executor::{PageRequest, SearchOutcome};
use crate::kwic::{KeywordInContextProvider, KeywordInContextState, WindowedKeywordInContext};
use crate::types::{
    OrderByColumn, PrimarySearchLayer, SearchLayer, SearchOrder, SearchQuery, SearchType, SessionId,
};
use crate::view::{DocumentView, UNKNOWN_HITS, UNKNOWN_RANK};

/// Annotations whose covered text is this short or shorter are OCR noise
/// (stray punctuation, single letters) and are dropped on assignment.
pub const MIN_ANNOTATION_TEXT_LEN: usize = 2;

/// Default page size of a new session.
pub const DEFAULT_TAKE: usize = 10;

/// Drop noise entries, then sort by occurrences descending.
///
/// The sort is stable, so re-applying to an already normalized set is a no-op.
fn normalize_annotations(mut results: Vec<AnnotationSearchResult>) -> Vec<AnnotationSearchResult> {
    results.retain(|r| r.text_len() > MIN_ANNOTATION_TEXT_LEN);
    results.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));
    results
}

/// Serializable overview of a session, for listings and logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub created: DateTime<Utc>,
    pub phrase: String,
    pub search_type: SearchType,
    pub current_page: usize,
    pub take: usize,
    pub total_hits: Option<u64>,
    pub total_pages: Option<u64>,
    pub primary_layer: String,
    pub documents_on_page: usize,
    pub cleanup_next_cycle: bool,
}

/// State of one user's in-flight search.
pub struct SearchSession {
    id: SessionId,
    created: DateTime<Utc>,
    cleanup_next_cycle: bool,

    query: SearchQuery,
    primary_layer: Option<PrimarySearchLayer>,

    current_page: usize,
    take: usize,
    total_hits: Option<u64>,
    order: SearchOrder,
    order_by: OrderByColumn,

    named_entities: Vec<AnnotationSearchResult>,
    taxa: Vec<AnnotationSearchResult>,
    times: Vec<AnnotationSearchResult>,
    embeddings: Vec<DocumentChunkEmbeddingSearchResult>,

    page: Vec<DocumentView>,
    kwic_state: Option<KeywordInContextState>,
    kwic_provider: Arc<dyn KeywordInContextProvider>,
}

impl std::fmt::Debug for SearchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchSession")
            .field("id", &self.id)
            .field("created", &self.created)
            .field("phrase", &self.query.phrase)
            .field("current_page", &self.current_page)
            .field("take", &self.take)
            .field("total_hits", &self.total_hits)
            .field("documents", &self.page.len())
            .field("cleanup_next_cycle", &self.cleanup_next_cycle)
            .finish_non_exhaustive()
    }
}

impl SearchSession {
    /// Create a session with a fresh id and creation timestamp.
    ///
    /// Everything else is unset or empty; context windows are computed
    /// with `WindowedKeywordInContext` until another provider is set.
    pub fn new(search_type: SearchType) -> Self {
        Self {
            id: SessionId::new(),
            created: Utc::now(),
            cleanup_next_cycle: false,
            query: SearchQuery {
                search_type,
                ..Default::default()
            },
            primary_layer: None,
            current_page: 1,
            take: DEFAULT_TAKE,
            total_hits: None,
            order: SearchOrder::default(),
            order_by: OrderByColumn::default(),
            named_entities: Vec::new(),
            taxa: Vec::new(),
            times: Vec::new(),
            embeddings: Vec::new(),
            page: Vec::new(),
            kwic_state: None,
            kwic_provider: Arc::new(WindowedKeywordInContext::default()),
        }
    }

    /// Builder: use a different keyword-in-context provider
    pub fn with_kwic_provider(mut self, provider: Arc<dyn KeywordInContextProvider>) -> Self {
        self.kwic_provider = provider;
        self
    }

    // ----- identity -------------------------------------------------------

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Flag the session for eviction on the manager's next sweep.
    pub fn mark_for_cleanup(&mut self) {
        self.cleanup_next_cycle = true;
    }

    pub fn is_cleanup_next_cycle(&self) -> bool {
        self.cleanup_next_cycle
    }

    // ----- query ----------------------------------------------------------

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    pub fn search_type(&self) -> SearchType {
        self.query.search_type
    }

    pub fn set_search_type(&mut self, search_type: SearchType) {
        self.query.search_type = search_type;
    }

    pub fn search_phrase(&self) -> &str {
        &self.query.phrase
    }

    pub fn set_search_phrase(&mut self, phrase: impl Into<String>) {
        self.query.phrase = phrase.into();
    }

    pub fn search_tokens(&self) -> &[String] {
        &self.query.tokens
    }

    /// Replace the search tokens. Context windows are not recomputed
    /// until the next page of documents is set.
    pub fn set_search_tokens(&mut self, tokens: Vec<String>) {
        self.query.tokens = tokens;
    }

    /// Tokens rendered as `"[a] [b]"`; empty when there are none.
    pub fn search_tokens_as_string(&self) -> String {
        self.query
            .tokens
            .iter()
            .map(|t| format!("[{}]", t))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn metadata_filters(&self) -> &[MetadataFilter] {
        &self.query.metadata_filters
    }

    pub fn set_metadata_filters(&mut self, filters: Vec<MetadataFilter>) {
        self.query.metadata_filters = filters;
    }

    pub fn corpus_id(&self) -> i64 {
        self.query.corpus_id
    }

    pub fn corpus_config(&self) -> Option<&CorpusConfig> {
        self.query.corpus_config.as_ref()
    }

    /// Set the target corpus and its configuration.
    pub fn set_corpus(&mut self, corpus_id: i64, config: Option<CorpusConfig>) {
        self.query.corpus_id = corpus_id;
        self.query.corpus_config = config;
    }

    pub fn search_layers(&self) -> &[SearchLayer] {
        &self.query.layers
    }

    /// Replace the selected layers and recompute the primary-layer label.
    ///
    /// Duplicates are dropped, selection order is kept.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::InvalidConfiguration` if `layers` is empty.
    pub fn set_search_layers(&mut self, layers: Vec<SearchLayer>) -> Result<(), SearchError> {
        if layers.is_empty() {
            return Err(SearchError::InvalidConfiguration(
                "at least one search layer is required".to_string(),
            ));
        }

        let mut deduped = Vec::with_capacity(layers.len());
        for layer in layers {
            if !deduped.contains(&layer) {
                deduped.push(layer);
            }
        }

        let primary = PrimarySearchLayer::from_layers(&deduped);
        debug!(session = %self.id, layers = ?deduped, primary = %primary, "Search layers set");
        self.query.layers = deduped;
        self.primary_layer = Some(primary);
        Ok(())
    }

    /// Label of the dominant layer; `"Semantic Roles"` until layers are set.
    pub fn primary_search_layer(&self) -> PrimarySearchLayer {
        self.primary_layer
            .unwrap_or(PrimarySearchLayer::SemanticRoles)
    }

    // ----- pagination and ordering ---------------------------------------

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Set the 1-based page number.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::InvalidConfiguration` for page 0.
    pub fn set_current_page_number(&mut self, page: usize) -> Result<(), SearchError> {
        if page == 0 {
            return Err(SearchError::InvalidConfiguration(
                "current page must be >= 1".to_string(),
            ));
        }
        self.current_page = page;
        Ok(())
    }

    pub fn take(&self) -> usize {
        self.take
    }

    /// Set the page size.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::InvalidConfiguration` for a page size of 0.
    pub fn set_take(&mut self, take: usize) -> Result<(), SearchError> {
        if take == 0 {
            return Err(SearchError::InvalidConfiguration(
                "page size must be > 0".to_string(),
            ));
        }
        self.take = take;
        Ok(())
    }

    pub fn total_hits(&self) -> Option<u64> {
        self.total_hits
    }

    pub fn set_total_hits(&mut self, total_hits: u64) {
        self.total_hits = Some(total_hits);
    }

    /// Number of result pages; `None` until total hits are known.
    pub fn total_pages(&self) -> Option<u64> {
        let take = self.take as u64;
        self.total_hits.map(|hits| {
            if hits < take {
                1
            } else {
                hits.div_ceil(take)
            }
        })
    }

    pub fn order(&self) -> SearchOrder {
        self.order
    }

    pub fn set_order(&mut self, order: SearchOrder) {
        self.order = order;
    }

    pub fn order_by(&self) -> OrderByColumn {
        self.order_by
    }

    pub fn set_order_by(&mut self, order_by: OrderByColumn) {
        self.order_by = order_by;
    }

    // ----- annotation result sets ----------------------------------------

    pub fn set_named_entity_results(&mut self, results: Vec<AnnotationSearchResult>) {
        self.named_entities = normalize_annotations(results);
    }

    pub fn set_taxon_results(&mut self, results: Vec<AnnotationSearchResult>) {
        self.taxa = normalize_annotations(results);
    }

    pub fn set_time_results(&mut self, results: Vec<AnnotationSearchResult>) {
        self.times = normalize_annotations(results);
    }

    pub fn named_entities(&self) -> &[AnnotationSearchResult] {
        &self.named_entities
    }

    pub fn taxa(&self) -> &[AnnotationSearchResult] {
        &self.taxa
    }

    pub fn times(&self) -> &[AnnotationSearchResult] {
        &self.times
    }

    /// The stored result set of one annotation kind.
    pub fn results_of_kind(&self, kind: AnnotationKind) -> &[AnnotationSearchResult] {
        match kind {
            AnnotationKind::NamedEntity => &self.named_entities,
            AnnotationKind::Taxon => &self.taxa,
            AnnotationKind::Time => &self.times,
        }
    }

    /// Results of one kind inside one document, most frequent first.
    ///
    /// `subtype` narrows named entities to one category (e.g. `PERSON`);
    /// it is ignored for kinds without subtypes.
    pub fn results_by_type_and_document(
        &self,
        kind: AnnotationKind,
        document_id: DocumentId,
        subtype: Option<&str>,
    ) -> Vec<&AnnotationSearchResult> {
        let subtype = subtype.filter(|_| kind.has_subtype());
        let mut results: Vec<&AnnotationSearchResult> = self
            .results_of_kind(kind)
            .iter()
            .filter(|r| subtype.map_or(true, |s| r.info == s))
            .filter(|r| r.document_id == document_id)
            .collect();
        results.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));
        results
    }

    /// A window of the named entities of one category.
    pub fn named_entities_by_type(
        &self,
        subtype: &str,
        skip: usize,
        take: usize,
    ) -> Vec<&AnnotationSearchResult> {
        self.named_entities
            .iter()
            .filter(|r| r.info == subtype)
            .skip(skip)
            .take(take)
            .collect()
    }

    /// A window of the taxon results.
    pub fn taxa_page(&self, skip: usize, take: usize) -> &[AnnotationSearchResult] {
        window(&self.taxa, skip, take)
    }

    /// A window of the time results.
    pub fn times_page(&self, skip: usize, take: usize) -> &[AnnotationSearchResult] {
        window(&self.times, skip, take)
    }

    // ----- embeddings -----------------------------------------------------

    pub fn set_embedding_results(&mut self, results: Vec<DocumentChunkEmbeddingSearchResult>) {
        self.embeddings = results;
    }

    pub fn embedding_results(&self) -> &[DocumentChunkEmbeddingSearchResult] {
        &self.embeddings
    }

    pub fn embedding_results_of_document(
        &self,
        document_id: DocumentId,
    ) -> Vec<&DocumentChunkEmbeddingSearchResult> {
        self.embeddings
            .iter()
            .filter(|e| e.document_id == document_id)
            .collect()
    }

    // ----- current page ---------------------------------------------------

    /// Replace the current page with plain documents.
    ///
    /// See [`SearchSession::set_current_page`].
    pub fn set_current_documents(&mut self, documents: Vec<Document>) -> Result<(), SearchError> {
        self.set_current_page(documents.into_iter().map(DocumentView::new).collect())
    }

    /// Replace the current page.
    ///
    /// When the keyword-in-context layer is selected, the provider is invoked
    /// exactly once per call with the new documents and the current tokens,
    /// even if the page did not change. Otherwise the previous context state
    /// is dropped.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::Provider` if the provider fails; the page is
    /// replaced regardless and the stale context state is dropped.
    pub fn set_current_page(&mut self, page: Vec<DocumentView>) -> Result<(), SearchError> {
        self.page = page;

        if !self.query.has_layer(SearchLayer::KeywordInContext) {
            self.kwic_state = None;
            return Ok(());
        }

        let documents: Vec<&Document> = self.page.iter().map(|v| &v.document).collect();
        match self
            .kwic_provider
            .recalculate(&documents, &self.query.tokens)
        {
            Ok(state) => {
                self.kwic_state = Some(state);
                Ok(())
            }
            Err(e) => {
                warn!(session = %self.id, error = %e, "Keyword-in-context recalculation failed");
                self.kwic_state = None;
                Err(SearchError::Provider(e))
            }
        }
    }

    pub fn current_page_documents(&self) -> &[DocumentView] {
        &self.page
    }

    /// Documents of the current page, without derived values.
    pub fn current_documents(&self) -> impl Iterator<Item = &Document> {
        self.page.iter().map(|v| &v.document)
    }

    pub fn keyword_in_context_state(&self) -> Option<&KeywordInContextState> {
        self.kwic_state.as_ref()
    }

    /// Assign hit counts to the current page, position by position.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::MisalignedPage` if `hits` does not have one
    /// entry per document on the page; nothing is assigned in that case.
    pub fn set_current_document_hits(&mut self, hits: Vec<u32>) -> Result<(), SearchError> {
        if hits.len() != self.page.len() {
            warn!(
                session = %self.id,
                expected = self.page.len(),
                actual = hits.len(),
                "Rejected misaligned hit counts"
            );
            return Err(SearchError::MisalignedPage {
                expected: self.page.len(),
                actual: hits.len(),
            });
        }
        for (view, count) in self.page.iter_mut().zip(hits) {
            view.hit_count = Some(count);
        }
        Ok(())
    }

    /// Replace the ranks of the current page, keyed by page position.
    ///
    /// Positions beyond the page are ignored.
    pub fn set_document_idx_to_rank(&mut self, ranks: HashMap<usize, f32>) {
        for view in &mut self.page {
            view.rank = None;
        }
        for (idx, rank) in ranks {
            match self.page.get_mut(idx) {
                Some(view) => view.rank = Some(rank),
                None => debug!(session = %self.id, idx, "Ignored rank beyond current page"),
            }
        }
    }

    /// Replace the snippets of the current page, keyed by page position.
    ///
    /// Positions beyond the page are ignored.
    pub fn set_document_idx_to_snippet(&mut self, snippets: HashMap<usize, String>) {
        for view in &mut self.page {
            view.snippet = None;
        }
        for (idx, snippet) in snippets {
            match self.page.get_mut(idx) {
                Some(view) => view.snippet = Some(snippet),
                None => debug!(session = %self.id, idx, "Ignored snippet beyond current page"),
            }
        }
    }

    /// Rank at a page position, `-1.0` when there is none.
    pub fn possible_rank_of_document_idx(&self, idx: usize) -> f32 {
        self.page
            .get(idx)
            .and_then(|v| v.rank)
            .unwrap_or(UNKNOWN_RANK)
    }

    /// Snippet at a page position, `None` when there is none.
    pub fn possible_snippet_of_document_idx(&self, idx: usize) -> Option<&str> {
        self.page.get(idx).and_then(|v| v.snippet.as_deref())
    }

    /// Hit count of a document on the current page, `-1` when the document
    /// is not on the page or has no recorded hit count.
    pub fn search_hits_of_document(&self, document_id: DocumentId) -> i64 {
        self.page
            .iter()
            .find(|v| v.document.id == document_id)
            .and_then(|v| v.hit_count)
            .map(i64::from)
            .unwrap_or(UNKNOWN_HITS)
    }

    // ----- executor round trip -------------------------------------------

    /// Build the executor request for the session's current state.
    pub fn page_request(&self) -> PageRequest {
        PageRequest {
            query: self.query.clone(),
            page: self.current_page,
            take: self.take,
            order: self.order,
            order_by: self.order_by,
        }
    }

    /// Store an executor outcome through the regular mutators.
    ///
    /// The page is replaced last, so context windows see the final tokens.
    pub fn apply_outcome(&mut self, outcome: SearchOutcome) -> Result<(), SearchError> {
        self.set_total_hits(outcome.total_hits);
        self.set_named_entity_results(outcome.named_entities);
        self.set_taxon_results(outcome.taxa);
        self.set_time_results(outcome.times);
        self.set_embedding_results(outcome.embeddings);
        self.set_current_page(outcome.documents)
    }

    /// Serializable overview of the session.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            created: self.created,
            phrase: self.query.phrase.clone(),
            search_type: self.query.search_type,
            current_page: self.current_page,
            take: self.take,
            total_hits: self.total_hits,
            total_pages: self.total_pages(),
            primary_layer: self.primary_search_layer().as_str().to_string(),
            documents_on_page: self.page.len(),
            cleanup_next_cycle: self.cleanup_next_cycle,
        }
    }
}

fn window<T>(items: &[T], skip: usize, take: usize) -> &[T] {
    let start = skip.min(items.len());
    let end = start.saturating_add(take).min(items.len());
    &items[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kwic::MockKeywordInContextProvider;

    fn hit(text: &str, occurrences: u32, document_id: DocumentId) -> AnnotationSearchResult {
        AnnotationSearchResult::new(text, occurrences, document_id)
    }

    fn docs(ids: &[DocumentId]) -> Vec<Document> {
        ids.iter()
            .map(|id| Document::new(*id, format!("doc-{}", id)).with_text("die Eiche im Wald"))
            .collect()
    }

    fn kwic_session(provider: Arc<MockKeywordInContextProvider>) -> SearchSession {
        let mut session = SearchSession::new(SearchType::Default).with_kwic_provider(provider);
        session
            .set_search_layers(vec![SearchLayer::Fulltext, SearchLayer::KeywordInContext])
            .unwrap();
        session.set_search_tokens(vec!["eiche".to_string()]);
        session
    }

    #[test]
    fn test_new_session_defaults() {
        let session = SearchSession::new(SearchType::Negation);
        assert_eq!(session.search_type(), SearchType::Negation);
        assert_eq!(session.current_page(), 1);
        assert_eq!(session.take(), DEFAULT_TAKE);
        assert_eq!(session.total_hits(), None);
        assert_eq!(session.total_pages(), None);
        assert!(!session.is_cleanup_next_cycle());
        assert!(session.named_entities().is_empty());
        assert!(session.current_page_documents().is_empty());
        assert!(session.keyword_in_context_state().is_none());
        assert_ne!(session.id(), SearchSession::new(SearchType::Default).id());
    }

    #[test]
    fn test_annotation_sets_filtered_and_sorted() {
        let mut session = SearchSession::new(SearchType::Default);
        let input = vec![
            hit(".", 50, 1),
            hit("Goethe", 3, 1),
            hit("ab", 40, 1),
            hit("Frankfurt", 9, 2),
            hit("Main", 3, 2),
        ];

        session.set_named_entity_results(input.clone());
        session.set_taxon_results(input.clone());
        session.set_time_results(input);

        for kind in AnnotationKind::ALL {
            let results = session.results_of_kind(kind);
            let texts: Vec<&str> = results.iter().map(|r| r.covered_text.as_str()).collect();
            assert_eq!(texts, vec!["Frankfurt", "Goethe", "Main"], "kind {}", kind);
            assert!(results.iter().all(|r| r.text_len() > 2));
            assert!(results.windows(2).all(|w| w[0].occurrences >= w[1].occurrences));
        }
    }

    #[test]
    fn test_annotation_assignment_is_idempotent() {
        let mut session = SearchSession::new(SearchType::Default);
        session.set_named_entity_results(vec![
            hit("Goethe", 3, 1),
            hit("Schiller", 3, 1),
            hit("Weimar", 7, 2),
            hit("x", 100, 2),
        ]);
        let first = session.named_entities().to_vec();

        session.set_named_entity_results(first.clone());
        assert_eq!(session.named_entities(), first.as_slice());
    }

    #[test]
    fn test_results_by_type_and_document() {
        let mut session = SearchSession::new(SearchType::Default);
        session.set_named_entity_results(vec![
            hit("Goethe", 2, 1).with_info("PERSON"),
            hit("Frankfurt", 5, 1).with_info("LOCATION"),
            hit("Schiller", 4, 1).with_info("PERSON"),
            hit("Herder", 9, 2).with_info("PERSON"),
        ]);
        session.set_taxon_results(vec![hit("Quercus", 1, 1), hit("Fagus", 3, 1)]);

        let persons =
            session.results_by_type_and_document(AnnotationKind::NamedEntity, 1, Some("PERSON"));
        let texts: Vec<&str> = persons.iter().map(|r| r.covered_text.as_str()).collect();
        assert_eq!(texts, vec!["Schiller", "Goethe"]);

        let all = session.results_by_type_and_document(AnnotationKind::NamedEntity, 1, None);
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].covered_text, "Frankfurt");

        // Subtype is ignored for taxa
        let taxa = session.results_by_type_and_document(AnnotationKind::Taxon, 1, Some("PERSON"));
        let texts: Vec<&str> = taxa.iter().map(|r| r.covered_text.as_str()).collect();
        assert_eq!(texts, vec!["Fagus", "Quercus"]);

        assert!(session
            .results_by_type_and_document(AnnotationKind::Time, 1, None)
            .is_empty());
        // Read-only projection
        assert_eq!(session.named_entities().len(), 4);
    }

    #[test]
    fn test_named_entities_by_type_window() {
        let mut session = SearchSession::new(SearchType::Default);
        session.set_named_entity_results(vec![
            hit("Goethe", 5, 1).with_info("PERSON"),
            hit("Frankfurt", 4, 1).with_info("LOCATION"),
            hit("Schiller", 3, 1).with_info("PERSON"),
            hit("Herder", 2, 2).with_info("PERSON"),
        ]);

        let window = session.named_entities_by_type("PERSON", 1, 1);
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].covered_text, "Schiller");
        assert!(session.named_entities_by_type("ORG", 0, 10).is_empty());
    }

    #[test]
    fn test_taxa_and_times_pages() {
        let mut session = SearchSession::new(SearchType::Default);
        session.set_taxon_results(vec![hit("Quercus", 3, 1), hit("Fagus", 2, 1), hit("Abies", 1, 1)]);

        assert_eq!(session.taxa_page(1, 5).len(), 2);
        assert_eq!(session.taxa_page(0, 1)[0].covered_text, "Quercus");
        assert!(session.taxa_page(10, 5).is_empty());
        assert!(session.times_page(0, 10).is_empty());
    }

    #[test]
    fn test_total_pages() {
        let mut session = SearchSession::new(SearchType::Default);
        session.set_take(10).unwrap();

        session.set_total_hits(25);
        assert_eq!(session.total_pages(), Some(3));

        session.set_total_hits(5);
        assert_eq!(session.total_pages(), Some(1));

        session.set_total_hits(10);
        assert_eq!(session.total_pages(), Some(1));

        session.set_total_hits(0);
        assert_eq!(session.total_pages(), Some(1));

        session.set_total_hits(11);
        assert_eq!(session.total_pages(), Some(2));
    }

    #[test]
    fn test_invalid_pagination_rejected() {
        let mut session = SearchSession::new(SearchType::Default);
        assert!(matches!(
            session.set_take(0),
            Err(SearchError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            session.set_current_page_number(0),
            Err(SearchError::InvalidConfiguration(_))
        ));
        // Nothing was clamped
        assert_eq!(session.take(), DEFAULT_TAKE);
        assert_eq!(session.current_page(), 1);

        session.set_current_page_number(4).unwrap();
        assert_eq!(session.current_page(), 4);
    }

    #[test]
    fn test_primary_search_layer() {
        let mut session = SearchSession::new(SearchType::Default);
        assert_eq!(session.primary_search_layer().as_str(), "Semantic Roles");

        session
            .set_search_layers(vec![SearchLayer::Fulltext, SearchLayer::NamedEntities])
            .unwrap();
        assert_eq!(session.primary_search_layer().as_str(), "Fulltext");

        session
            .set_search_layers(vec![SearchLayer::NamedEntities])
            .unwrap();
        assert_eq!(session.primary_search_layer().as_str(), "Named-Entities");
    }

    #[test]
    fn test_empty_layers_rejected() {
        let mut session = SearchSession::new(SearchType::Default);
        session.set_search_layers(vec![SearchLayer::Taxon]).unwrap();

        let result = session.set_search_layers(vec![]);
        assert!(matches!(result, Err(SearchError::InvalidConfiguration(_))));
        assert_eq!(session.search_layers(), &[SearchLayer::Taxon]);
    }

    #[test]
    fn test_layers_deduplicated() {
        let mut session = SearchSession::new(SearchType::Default);
        session
            .set_search_layers(vec![
                SearchLayer::Time,
                SearchLayer::Fulltext,
                SearchLayer::Time,
            ])
            .unwrap();
        assert_eq!(
            session.search_layers(),
            &[SearchLayer::Time, SearchLayer::Fulltext]
        );
    }

    #[test]
    fn test_kwic_recalculated_once_per_call() {
        let provider = Arc::new(MockKeywordInContextProvider::default());
        let mut session = kwic_session(provider.clone());

        session.set_current_documents(docs(&[1, 2, 3])).unwrap();
        assert_eq!(provider.call_count(), 1);
        assert_eq!(provider.last_documents(), Some(vec![1, 2, 3]));
        assert_eq!(provider.last_tokens(), Some(vec!["eiche".to_string()]));

        // Identical content still triggers a recalculation
        session.set_current_documents(docs(&[1, 2, 3])).unwrap();
        assert_eq!(provider.call_count(), 2);
        assert!(session.keyword_in_context_state().is_some());
    }

    #[test]
    fn test_kwic_not_recalculated_on_other_mutations() {
        let provider = Arc::new(MockKeywordInContextProvider::default());
        let mut session = kwic_session(provider.clone());
        session.set_current_documents(docs(&[1])).unwrap();

        session.set_search_tokens(vec!["buche".to_string()]);
        session.set_named_entity_results(vec![hit("Goethe", 1, 1)]);
        session.set_total_hits(40);
        session.set_order(SearchOrder::Desc);
        session.set_document_idx_to_rank(HashMap::from([(0, 0.5)]));
        let _ = session.possible_rank_of_document_idx(0);
        let _ = session.search_hits_of_document(1);
        assert_eq!(provider.call_count(), 1);

        // The next page picks up the new tokens
        session.set_current_documents(docs(&[2])).unwrap();
        assert_eq!(provider.last_tokens(), Some(vec!["buche".to_string()]));
    }

    #[test]
    fn test_kwic_skipped_without_layer() {
        let provider = Arc::new(MockKeywordInContextProvider::default());
        let mut session =
            SearchSession::new(SearchType::Default).with_kwic_provider(provider.clone());
        session.set_current_documents(docs(&[1])).unwrap();
        assert_eq!(provider.call_count(), 0);

        session.set_search_layers(vec![SearchLayer::Fulltext]).unwrap();
        session.set_current_documents(docs(&[1])).unwrap();
        assert_eq!(provider.call_count(), 0);
        assert!(session.keyword_in_context_state().is_none());
    }

    #[test]
    fn test_kwic_state_dropped_when_layer_deselected() {
        let provider = Arc::new(MockKeywordInContextProvider::default());
        let mut session = kwic_session(provider.clone());
        session.set_current_documents(docs(&[1])).unwrap();
        assert!(session.keyword_in_context_state().is_some());

        session.set_search_layers(vec![SearchLayer::Fulltext]).unwrap();
        session.set_search_tokens(vec!["buche".to_string()]);
        session.set_current_documents(docs(&[1])).unwrap();

        assert_eq!(provider.call_count(), 1);
        assert!(session.keyword_in_context_state().is_none());
    }

    #[test]
    fn test_kwic_provider_failure_propagates() {
        let provider = Arc::new(MockKeywordInContextProvider::failing());
        let mut session = kwic_session(provider.clone());

        let result = session.set_current_documents(docs(&[1, 2]));
        assert!(matches!(result, Err(SearchError::Provider(_))));
        assert_eq!(provider.call_count(), 1);
        assert_eq!(session.current_page_documents().len(), 2);
        assert!(session.keyword_in_context_state().is_none());
    }

    #[test]
    fn test_default_provider_finds_windows() {
        let mut session = SearchSession::new(SearchType::Default);
        session
            .set_search_layers(vec![SearchLayer::KeywordInContext])
            .unwrap();
        session.set_search_tokens(vec!["eiche".to_string()]);
        session.set_current_documents(docs(&[7])).unwrap();

        let state = session.keyword_in_context_state().unwrap();
        assert_eq!(state.contexts_of(7).len(), 1);
        assert_eq!(state.contexts_of(7)[0].left, "die");
    }

    #[test]
    fn test_rank_and_snippet_sentinels() {
        let mut session = SearchSession::new(SearchType::Default);
        session.set_current_documents(docs(&[1, 2])).unwrap();

        assert_eq!(session.possible_rank_of_document_idx(0), -1.0);
        assert_eq!(session.possible_rank_of_document_idx(99), -1.0);
        assert_eq!(session.possible_snippet_of_document_idx(0), None);

        session.set_document_idx_to_rank(HashMap::from([(1, 0.75), (5, 0.1)]));
        session.set_document_idx_to_snippet(HashMap::from([(0, "die <b>Eiche</b>".to_string())]));

        assert_eq!(session.possible_rank_of_document_idx(0), -1.0);
        assert_eq!(session.possible_rank_of_document_idx(1), 0.75);
        assert_eq!(session.possible_rank_of_document_idx(5), -1.0);
        assert_eq!(session.possible_snippet_of_document_idx(0), Some("die <b>Eiche</b>"));
        assert_eq!(session.possible_snippet_of_document_idx(1), None);
    }

    #[test]
    fn test_rank_map_replaces_previous_ranks() {
        let mut session = SearchSession::new(SearchType::Default);
        session.set_current_documents(docs(&[1, 2])).unwrap();
        session.set_document_idx_to_rank(HashMap::from([(0, 0.9)]));
        session.set_document_idx_to_rank(HashMap::from([(1, 0.4)]));

        assert_eq!(session.possible_rank_of_document_idx(0), -1.0);
        assert_eq!(session.possible_rank_of_document_idx(1), 0.4);
    }

    #[test]
    fn test_new_page_drops_derived_values() {
        let mut session = SearchSession::new(SearchType::Default);
        session.set_current_documents(docs(&[1, 2])).unwrap();
        session.set_document_idx_to_rank(HashMap::from([(0, 0.9)]));
        session.set_current_document_hits(vec![3, 4]).unwrap();

        session.set_current_documents(docs(&[3, 4])).unwrap();
        assert_eq!(session.possible_rank_of_document_idx(0), -1.0);
        assert_eq!(session.search_hits_of_document(3), -1);
    }

    #[test]
    fn test_search_hits_of_document() {
        let mut session = SearchSession::new(SearchType::Default);
        session.set_current_documents(docs(&[10, 20])).unwrap();
        assert_eq!(session.search_hits_of_document(10), -1);

        session.set_current_document_hits(vec![4, 7]).unwrap();
        assert_eq!(session.search_hits_of_document(10), 4);
        assert_eq!(session.search_hits_of_document(20), 7);
        assert_eq!(session.search_hits_of_document(30), -1);
    }

    #[test]
    fn test_misaligned_hits_rejected() {
        let mut session = SearchSession::new(SearchType::Default);
        session.set_current_documents(docs(&[10, 20])).unwrap();

        let result = session.set_current_document_hits(vec![4]);
        assert!(matches!(
            result,
            Err(SearchError::MisalignedPage {
                expected: 2,
                actual: 1
            })
        ));
        assert_eq!(session.search_hits_of_document(10), -1);
    }

    #[test]
    fn test_search_tokens_as_string() {
        let mut session = SearchSession::new(SearchType::Default);
        assert_eq!(session.search_tokens_as_string(), "");

        session.set_search_tokens(vec!["quercus".to_string(), "robur".to_string()]);
        assert_eq!(session.search_tokens_as_string(), "[quercus] [robur]");
    }

    #[test]
    fn test_embedding_results_of_document() {
        let mut session = SearchSession::new(SearchType::Default);
        session.set_embedding_results(vec![
            DocumentChunkEmbeddingSearchResult {
                document_id: 1,
                chunk_text: "oak forest".to_string(),
                begin: 0,
                end: 10,
                similarity: 0.9,
            },
            DocumentChunkEmbeddingSearchResult {
                document_id: 2,
                chunk_text: "beech".to_string(),
                begin: 0,
                end: 5,
                similarity: 0.4,
            },
        ]);

        assert_eq!(session.embedding_results().len(), 2);
        let of_one = session.embedding_results_of_document(1);
        assert_eq!(of_one.len(), 1);
        assert_eq!(of_one[0].chunk_text, "oak forest");
    }

    #[test]
    fn test_apply_outcome() {
        let provider = Arc::new(MockKeywordInContextProvider::default());
        let mut session = kwic_session(provider.clone());

        let outcome = SearchOutcome {
            total_hits: 42,
            documents: docs(&[1, 2])
                .into_iter()
                .enumerate()
                .map(|(i, d)| DocumentView::new(d).with_hits(i as u32 + 1).with_rank(0.5))
                .collect(),
            named_entities: vec![hit("Goethe", 1, 1), hit("..", 9, 1)],
            taxa: vec![hit("Quercus", 2, 2)],
            times: vec![],
            embeddings: vec![],
        };
        session.apply_outcome(outcome).unwrap();

        assert_eq!(session.total_pages(), Some(5));
        assert_eq!(session.named_entities().len(), 1);
        assert_eq!(session.taxa().len(), 1);
        assert_eq!(session.search_hits_of_document(2), 2);
        assert_eq!(session.possible_rank_of_document_idx(1), 0.5);
        assert_eq!(provider.call_count(), 1);
    }

    #[test]
    fn test_page_request_reflects_state() {
        let mut session = SearchSession::new(SearchType::Default);
        session.set_search_phrase("Quercus");
        session.set_current_page_number(2).unwrap();
        session.set_take(25).unwrap();
        session.set_order(SearchOrder::Desc);
        session.set_order_by(OrderByColumn::Rank);
        session.set_metadata_filters(vec![MetadataFilter::equals("year", "1850")]);
        session.set_corpus(3, None);

        let request = session.page_request();
        assert_eq!(request.page, 2);
        assert_eq!(request.take, 25);
        assert_eq!(request.skip(), 25);
        assert_eq!(request.order, SearchOrder::Desc);
        assert_eq!(request.order_by, OrderByColumn::Rank);
        assert_eq!(request.query.phrase, "Quercus");
        assert_eq!(request.query.corpus_id, 3);
        assert_eq!(request.query.metadata_filters.len(), 1);
    }

    #[test]
    fn test_summary_and_cleanup_flag() {
        let mut session = SearchSession::new(SearchType::Default);
        session.set_total_hits(25);
        session.mark_for_cleanup();

        let summary = session.summary();
        assert_eq!(summary.id, session.id());
        assert_eq!(summary.total_pages, Some(3));
        assert_eq!(summary.primary_layer, "Semantic Roles");
        assert!(summary.cleanup_next_cycle);

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains(&session.id().to_string()));
    }
}
