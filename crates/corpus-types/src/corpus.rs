//! Corpus document and corpus configuration records.
//!
//! Documents are produced by the persistence layer; this crate only
//! carries the fields the search session needs to render a result page.

use serde::{Deserialize, Serialize};

/// Database identifier of a document.
pub type DocumentId = i64;

/// Title rendered when a document has none.
const UNTITLED: &str = "(-)";

/// An OCR'd corpus document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Database identifier
    pub id: DocumentId,

    /// External identifier assigned by the source archive
    pub document_id: String,

    /// Title as extracted from the source metadata
    #[serde(default)]
    pub title: Option<String>,

    /// ISO language code
    #[serde(default)]
    pub language: String,

    /// Full text after OCR cleanup
    #[serde(default)]
    pub full_text_cleaned: Option<String>,
}

impl Document {
    /// Create a document without text.
    pub fn new(id: DocumentId, document_id: impl Into<String>) -> Self {
        Self {
            id,
            document_id: document_id.into(),
            title: None,
            language: String::new(),
            full_text_cleaned: None,
        }
    }

    /// Builder: set the title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Builder: set the language
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Builder: set the cleaned full text
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.full_text_cleaned = Some(text.into());
        self
    }

    /// Title for display, `"(-)"` when the document has none.
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.trim().is_empty() => title,
            _ => UNTITLED,
        }
    }

    /// The first `take` whitespace-separated words of the cleaned text.
    ///
    /// Returns an empty string when the document has no cleaned text.
    pub fn snippet(&self, take: usize) -> String {
        match self.full_text_cleaned.as_deref() {
            Some(text) => text.split_whitespace().take(take).collect::<Vec<_>>().join(" "),
            None => String::new(),
        }
    }
}

/// Per-corpus settings that influence which layers make sense.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Corpus display name
    pub name: String,

    /// Corpus author or owning institution
    #[serde(default)]
    pub author: String,

    /// Primary language of the corpus
    #[serde(default)]
    pub language: String,

    /// Whether named entities were annotated
    #[serde(default)]
    pub has_named_entities: bool,

    /// Whether taxa were annotated
    #[serde(default)]
    pub has_taxa: bool,

    /// Whether temporal expressions were annotated
    #[serde(default)]
    pub has_times: bool,

    /// Whether chunk embeddings were computed
    #[serde(default)]
    pub has_embeddings: bool,
}

/// Comparison used by a metadata filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    /// Exact match
    #[default]
    Equals,
    /// Substring match
    Contains,
    /// Numeric or lexical lower bound
    GreaterThan,
    /// Numeric or lexical upper bound
    LessThan,
}

/// A filter on document metadata, applied by the query executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFilter {
    /// Metadata key
    pub key: String,

    /// How `value` is compared
    #[serde(default)]
    pub operator: FilterOperator,

    /// Value to compare against
    pub value: String,
}

impl MetadataFilter {
    /// Create an equality filter.
    pub fn equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            operator: FilterOperator::Equals,
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_takes_first_words() {
        let doc = Document::new(1, "doc-1").with_text("  Die   Flora von Frankfurt am Main ");
        assert_eq!(doc.snippet(3), "Die Flora von");
        assert_eq!(doc.snippet(50), "Die Flora von Frankfurt am Main");
    }

    #[test]
    fn test_snippet_without_text_is_empty() {
        let doc = Document::new(1, "doc-1");
        assert_eq!(doc.snippet(30), "");
    }

    #[test]
    fn test_display_title_fallback() {
        assert_eq!(Document::new(1, "a").display_title(), "(-)");
        assert_eq!(Document::new(1, "a").with_title("  ").display_title(), "(-)");
        assert_eq!(Document::new(1, "a").with_title("Flora").display_title(), "Flora");
    }

    #[test]
    fn test_document_deserializes_with_defaults() {
        let doc: Document = serde_json::from_str(r#"{"id": 3, "document_id": "x"}"#).unwrap();
        assert_eq!(doc.id, 3);
        assert!(doc.title.is_none());
        assert!(doc.full_text_cleaned.is_none());
    }

    #[test]
    fn test_metadata_filter_operator_default() {
        let filter: MetadataFilter =
            serde_json::from_str(r#"{"key": "year", "value": "1900"}"#).unwrap();
        assert_eq!(filter.operator, FilterOperator::Equals);
        assert_eq!(filter, MetadataFilter::equals("year", "1900"));
    }
}
