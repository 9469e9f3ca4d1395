//! Aggregated annotation and embedding hits.
//!
//! An `AnnotationSearchResult` is one annotation text matched across the
//! corpus, counted per originating document. The search session keeps one
//! list per `AnnotationKind`.

use serde::{Deserialize, Serialize};

use crate::corpus::DocumentId;

/// Kind of span-level annotation a result set holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    /// Named entities (persons, locations, organisations, ...)
    NamedEntity,
    /// Biological taxon mentions
    Taxon,
    /// Temporal expressions
    Time,
}

impl AnnotationKind {
    /// All kinds, in display order.
    pub const ALL: [AnnotationKind; 3] = [
        AnnotationKind::NamedEntity,
        AnnotationKind::Taxon,
        AnnotationKind::Time,
    ];

    /// Returns the display name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationKind::NamedEntity => "named_entities",
            AnnotationKind::Taxon => "taxa",
            AnnotationKind::Time => "times",
        }
    }

    /// Whether results of this kind carry a subtype (entity category).
    pub fn has_subtype(&self) -> bool {
        matches!(self, AnnotationKind::NamedEntity)
    }
}

impl std::fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One annotation match aggregated across the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationSearchResult {
    /// Matched (covered) text of the annotation
    pub covered_text: String,

    /// How often the text was matched
    pub occurrences: u32,

    /// Document the match belongs to
    pub document_id: DocumentId,

    /// Category of the annotation; the entity type for named entities
    #[serde(default)]
    pub info: String,
}

impl AnnotationSearchResult {
    /// Create a result without category.
    pub fn new(covered_text: impl Into<String>, occurrences: u32, document_id: DocumentId) -> Self {
        Self {
            covered_text: covered_text.into(),
            occurrences,
            document_id,
            info: String::new(),
        }
    }

    /// Builder: set the category
    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = info.into();
        self
    }

    /// Length of the covered text in characters.
    pub fn text_len(&self) -> usize {
        self.covered_text.chars().count()
    }
}

/// A chunk of a document that matched an embedding query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunkEmbeddingSearchResult {
    /// Document the chunk belongs to
    pub document_id: DocumentId,

    /// Text of the chunk
    pub chunk_text: String,

    /// Start offset of the chunk in the cleaned full text
    #[serde(default)]
    pub begin: usize,

    /// End offset of the chunk in the cleaned full text
    #[serde(default)]
    pub end: usize,

    /// Similarity to the query (higher is closer)
    pub similarity: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_len_counts_chars() {
        let hit = AnnotationSearchResult::new("Jäger", 1, 1);
        assert_eq!(hit.text_len(), 5);
    }

    #[test]
    fn test_kind_subtype() {
        assert!(AnnotationKind::NamedEntity.has_subtype());
        assert!(!AnnotationKind::Taxon.has_subtype());
        assert!(!AnnotationKind::Time.has_subtype());
    }

    #[test]
    fn test_kind_serde_names() {
        let json = serde_json::to_string(&AnnotationKind::NamedEntity).unwrap();
        assert_eq!(json, "\"named_entity\"");
        assert_eq!(AnnotationKind::Taxon.to_string(), "taxa");
    }
}
