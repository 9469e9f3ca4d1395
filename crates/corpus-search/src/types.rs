//! Core search types.
//!
//! This module defines the vocabulary of a search session:
//! - `SessionId`: ULID identifying one session
//! - `SearchLayer`: selectable axis of matching
//! - `PrimarySearchLayer`: human-facing label of the dominant layer
//! - `SearchType`, `SearchOrder`, `OrderByColumn`: query shape and ordering
//! - `SearchQuery`: the query parameters held by a session

use std::str::FromStr;

use corpus_types::{CorpusConfig, MetadataFilter};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Globally unique identifier of a search session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Ulid);

impl SessionId {
    /// Allocate a fresh identifier.
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

/// Individual search layer identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchLayer {
    /// Full-text matching on the cleaned document text
    Fulltext,
    /// Named-entity annotations
    NamedEntities,
    /// Taxon annotations
    Taxon,
    /// Temporal expressions
    Time,
    /// Chunk embedding similarity
    Embeddings,
    /// Keyword-in-context windows around query terms
    KeywordInContext,
    /// Semantic-role frames
    SemanticRole,
}

impl SearchLayer {
    /// Returns the display name for this layer.
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchLayer::Fulltext => "fulltext",
            SearchLayer::NamedEntities => "named_entities",
            SearchLayer::Taxon => "taxon",
            SearchLayer::Time => "time",
            SearchLayer::Embeddings => "embeddings",
            SearchLayer::KeywordInContext => "keyword_in_context",
            SearchLayer::SemanticRole => "semantic_role",
        }
    }
}

impl std::fmt::Display for SearchLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SearchLayer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "fulltext" => Ok(SearchLayer::Fulltext),
            "named_entities" | "namedentities" => Ok(SearchLayer::NamedEntities),
            "taxon" | "taxa" => Ok(SearchLayer::Taxon),
            "time" | "times" => Ok(SearchLayer::Time),
            "embeddings" => Ok(SearchLayer::Embeddings),
            "keyword_in_context" | "kwic" => Ok(SearchLayer::KeywordInContext),
            "semantic_role" | "srl" => Ok(SearchLayer::SemanticRole),
            other => Err(format!("unknown search layer '{}'", other)),
        }
    }
}

/// Label of the layer that dominates the current query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimarySearchLayer {
    /// Full-text is among the selected layers
    Fulltext,
    /// Layers were set, full-text is not among them
    NamedEntities,
    /// Layers were never assigned
    SemanticRoles,
}

impl PrimarySearchLayer {
    /// Derive the label from an assigned layer set.
    pub fn from_layers(layers: &[SearchLayer]) -> Self {
        if layers.contains(&SearchLayer::Fulltext) {
            PrimarySearchLayer::Fulltext
        } else {
            PrimarySearchLayer::NamedEntities
        }
    }

    /// Returns the rendered label.
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimarySearchLayer::Fulltext => "Fulltext",
            PrimarySearchLayer::NamedEntities => "Named-Entities",
            PrimarySearchLayer::SemanticRoles => "Semantic Roles",
        }
    }
}

impl std::fmt::Display for PrimarySearchLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classification of the query shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    /// Plain phrase search
    #[default]
    Default,
    /// Query built from semantic-role frames
    SemanticRole,
    /// Phrase search excluding the given terms
    Negation,
}

/// Sort direction of the result page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchOrder {
    /// Ascending
    #[default]
    Asc,
    /// Descending
    Desc,
}

impl SearchOrder {
    /// Returns the opposite direction.
    pub fn reversed(&self) -> Self {
        match self {
            SearchOrder::Asc => SearchOrder::Desc,
            SearchOrder::Desc => SearchOrder::Asc,
        }
    }
}

/// Column the result page is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderByColumn {
    /// Document title
    #[default]
    DocumentTitle,
    /// Ranking score from the executor
    Rank,
    /// Publication date
    Date,
}

/// Split a raw phrase into lowercase search tokens.
///
/// Punctuation around words is trimmed; empty tokens are dropped.
pub fn tokenize_phrase(phrase: &str) -> Vec<String> {
    phrase
        .split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|word| !word.is_empty())
        .collect()
}

/// Query parameters of one search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// The raw search phrase
    pub phrase: String,

    /// Tokenized terms
    pub tokens: Vec<String>,

    /// Selected layers (deduplicated, in selection order)
    pub layers: Vec<SearchLayer>,

    /// Document metadata filters
    pub metadata_filters: Vec<MetadataFilter>,

    /// Query shape
    pub search_type: SearchType,

    /// Target corpus
    pub corpus_id: i64,

    /// Configuration of the target corpus
    pub corpus_config: Option<CorpusConfig>,
}

impl SearchQuery {
    /// Create a query from a raw phrase, tokenizing it.
    pub fn from_phrase(phrase: impl Into<String>) -> Self {
        let phrase = phrase.into();
        Self {
            tokens: tokenize_phrase(&phrase),
            phrase,
            ..Default::default()
        }
    }

    /// Check whether a layer is selected.
    pub fn has_layer(&self, layer: SearchLayer) -> bool {
        self.layers.contains(&layer)
    }
}
