//! # corpus-types
//!
//! Shared domain types for the corpus explorer.
//!
//! This crate defines the records every other crate passes around:
//! - Documents: OCR'd corpus documents with their cleaned full text
//! - Annotations: aggregated named-entity, taxon and time matches
//! - Embeddings: chunk-level similarity hits
//! - Settings: layered configuration for the daemon and session manager
//!
//! ## Usage
//!
//! ```rust
//! use corpus_types::{AnnotationKind, AnnotationSearchResult};
//!
//! let hit = AnnotationSearchResult::new("Goethe", 4, 7).with_info("PERSON");
//! assert_eq!(hit.occurrences, 4);
//! assert_eq!(AnnotationKind::NamedEntity.as_str(), "named_entities");
//! ```

pub mod annotation;
pub mod config;
pub mod corpus;
pub mod error;

pub use annotation::{AnnotationKind, AnnotationSearchResult, DocumentChunkEmbeddingSearchResult};
pub use config::{SearchSettings, SessionSettings, Settings};
pub use corpus::{CorpusConfig, Document, DocumentId, MetadataFilter, FilterOperator};
pub use error::CorpusError;
