//! # corpus-search
//!
//! Search-session state for the corpus explorer.
//!
//! A [`SearchSession`] aggregates everything one user's search produces
//! across the retrieval layers: the query, the named-entity, taxon and
//! time annotation hits, embedding chunk matches, pagination, and the
//! current result page with its per-document hit counts, ranks and
//! snippets.
//!
//! ## Core Concepts
//!
//! - **Search Layer**: an axis of matching (full text, annotations, embeddings, KWIC)
//! - **Primary Layer**: display label of the dominant layer
//! - **Document View**: one page entry keeping a document and its derived values together
//! - **Keyword in Context**: word windows around query terms, recomputed on every page change
//! - **Executor**: the collaborator that actually runs the query against the corpus
//!
//! ## Usage
//!
//! ```rust,ignore
//! use corpus_search::{SearchLayer, SearchSession, SearchType};
//!
//! let mut session = SearchSession::new(SearchType::Default);
//! session.set_search_phrase("Quercus robur");
//! session.set_search_layers(vec![SearchLayer::Fulltext, SearchLayer::KeywordInContext])?;
//!
//! let outcome = executor.execute(&session.page_request()).await?;
//! session.apply_outcome(outcome)?;
//!
//! println!("page {} of {:?}", session.current_page(), session.total_pages());
//! ```
//!
//! ## Modules
//!
//! - [`types`]: Query vocabulary (SessionId, SearchLayer, SearchQuery, ordering)
//! - [`view`]: Per-document page records
//! - [`kwic`]: Keyword-in-context provider trait and default implementation
//! - [`executor`]: Query execution seam
//! - [`session`]: The session aggregate

pub mod error;
pub mod executor;
pub mod kwic;
pub mod session;
pub mod types;
pub mod view;

// Re-export main types at crate root
pub use error::SearchError;
pub use executor::{MockSearchExecutor, PageRequest, SearchExecutor, SearchOutcome};
pub use kwic::{
    KeywordContext, KeywordInContextProvider, KeywordInContextState,
    MockKeywordInContextProvider, WindowedKeywordInContext,
};
pub use session::{SearchSession, SessionSummary, DEFAULT_TAKE, MIN_ANNOTATION_TEXT_LEN};
pub use types::{
    tokenize_phrase, OrderByColumn, PrimarySearchLayer, SearchLayer, SearchOrder, SearchQuery,
    SearchType, SessionId,
};
pub use view::{DocumentView, UNKNOWN_HITS, UNKNOWN_RANK};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::executor::{PageRequest, SearchExecutor, SearchOutcome};
    pub use crate::session::SearchSession;
    pub use crate::types::{OrderByColumn, SearchLayer, SearchOrder, SearchType, SessionId};
    pub use crate::view::DocumentView;
}
