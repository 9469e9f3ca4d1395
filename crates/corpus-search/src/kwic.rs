//! Keyword-in-context windows.
//!
//! The session decides *when* context windows are recomputed; a
//! `KeywordInContextProvider` decides *how*. `WindowedKeywordInContext`
//! is the default provider: a whole-word scan over the cleaned text.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use corpus_types::{Document, DocumentId};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One occurrence of a search token with its surrounding words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordContext {
    /// The word as it appears in the text
    pub keyword: String,

    /// Words preceding the keyword
    pub left: String,

    /// Words following the keyword
    pub right: String,

    /// Position of the keyword in the whitespace-split text
    pub word_index: usize,
}

/// Context windows of the current page, per document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordInContextState {
    contexts: HashMap<DocumentId, Vec<KeywordContext>>,
}

impl KeywordInContextState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the windows found for a document.
    pub fn insert(&mut self, document_id: DocumentId, contexts: Vec<KeywordContext>) {
        self.contexts.insert(document_id, contexts);
    }

    /// Windows of a document, empty when none were found.
    pub fn contexts_of(&self, document_id: DocumentId) -> &[KeywordContext] {
        self.contexts
            .get(&document_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of documents with at least one window.
    pub fn document_count(&self) -> usize {
        self.contexts.len()
    }

    /// Total windows across all documents.
    pub fn total_occurrences(&self) -> usize {
        self.contexts.values().map(Vec::len).sum()
    }
}

/// Computes keyword-in-context windows for a document set.
///
/// Failures are reported as strings and propagated unchanged by the session.
pub trait KeywordInContextProvider: Send + Sync {
    /// Compute windows for `tokens` over `documents`.
    fn recalculate(
        &self,
        documents: &[&Document],
        tokens: &[String],
    ) -> Result<KeywordInContextState, String>;
}

/// Default provider: case-insensitive whole-word scan.
#[derive(Debug, Clone)]
pub struct WindowedKeywordInContext {
    /// Words taken on each side of a hit
    pub window: usize,
    /// Maximum windows kept per document
    pub max_per_document: usize,
}

impl Default for WindowedKeywordInContext {
    fn default() -> Self {
        Self {
            window: 6,
            max_per_document: 20,
        }
    }
}

impl WindowedKeywordInContext {
    /// Create a provider with the given window and per-document cap.
    pub fn new(window: usize, max_per_document: usize) -> Self {
        Self {
            window,
            max_per_document,
        }
    }

    fn normalize(word: &str) -> String {
        word.trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase()
    }

    fn scan(&self, text: &str, tokens: &[String]) -> Vec<KeywordContext> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut found = Vec::new();

        for (i, word) in words.iter().enumerate() {
            if found.len() >= self.max_per_document {
                break;
            }
            let normalized = Self::normalize(word);
            if normalized.is_empty() || !tokens.contains(&normalized) {
                continue;
            }
            let end = (i + 1 + self.window).min(words.len());
            found.push(KeywordContext {
                keyword: (*word).to_string(),
                left: words[i.saturating_sub(self.window)..i].join(" "),
                right: words[i + 1..end].join(" "),
                word_index: i,
            });
        }

        found
    }
}

impl KeywordInContextProvider for WindowedKeywordInContext {
    fn recalculate(
        &self,
        documents: &[&Document],
        tokens: &[String],
    ) -> Result<KeywordInContextState, String> {
        let tokens: Vec<String> = tokens
            .iter()
            .map(|t| Self::normalize(t))
            .filter(|t| !t.is_empty())
            .collect();

        let mut state = KeywordInContextState::new();
        if tokens.is_empty() {
            return Ok(state);
        }

        for document in documents {
            let Some(text) = document.full_text_cleaned.as_deref() else {
                continue;
            };
            let contexts = self.scan(text, &tokens);
            if !contexts.is_empty() {
                state.insert(document.id, contexts);
            }
        }

        debug!(
            documents = documents.len(),
            occurrences = state.total_occurrences(),
            "Recalculated keyword-in-context windows"
        );
        Ok(state)
    }
}

/// Mock provider for testing: counts invocations and records arguments.
#[derive(Default)]
pub struct MockKeywordInContextProvider {
    calls: AtomicUsize,
    last_call: Mutex<Option<(Vec<DocumentId>, Vec<String>)>>,
    fail: bool,
}

impl MockKeywordInContextProvider {
    /// Create a provider that fails every call.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Number of `recalculate` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Document ids passed to the last call.
    pub fn last_documents(&self) -> Option<Vec<DocumentId>> {
        self.last_call
            .lock()
            .expect("mock mutex poisoned")
            .as_ref()
            .map(|(docs, _)| docs.clone())
    }

    /// Tokens passed to the last call.
    pub fn last_tokens(&self) -> Option<Vec<String>> {
        self.last_call
            .lock()
            .expect("mock mutex poisoned")
            .as_ref()
            .map(|(_, tokens)| tokens.clone())
    }
}

impl KeywordInContextProvider for MockKeywordInContextProvider {
    fn recalculate(
        &self,
        documents: &[&Document],
        tokens: &[String],
    ) -> Result<KeywordInContextState, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_call.lock().expect("mock mutex poisoned") = Some((
            documents.iter().map(|d| d.id).collect(),
            tokens.to_vec(),
        ));

        if self.fail {
            return Err("mock provider failure".to_string());
        }
        Ok(KeywordInContextState::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: DocumentId, text: &str) -> Document {
        Document::new(id, format!("doc-{}", id)).with_text(text)
    }

    #[test]
    fn test_windows_around_keyword() {
        let provider = WindowedKeywordInContext::new(2, 10);
        let d = doc(1, "Im Wald wächst die Eiche, und die Buche steht daneben.");
        let state = provider
            .recalculate(&[&d], &["eiche".to_string()])
            .unwrap();

        let contexts = state.contexts_of(1);
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].keyword, "Eiche,");
        assert_eq!(contexts[0].left, "wächst die");
        assert_eq!(contexts[0].right, "und die");
        assert_eq!(contexts[0].word_index, 4);
    }

    #[test]
    fn test_window_clamped_at_text_edges() {
        let provider = WindowedKeywordInContext::new(5, 10);
        let d = doc(1, "Eiche am Rand");
        let state = provider.recalculate(&[&d], &["Eiche".to_string()]).unwrap();

        let contexts = state.contexts_of(1);
        assert_eq!(contexts[0].left, "");
        assert_eq!(contexts[0].right, "am Rand");
    }

    #[test]
    fn test_max_per_document() {
        let provider = WindowedKeywordInContext::new(1, 2);
        let d = doc(1, "a oak b oak c oak d");
        let state = provider.recalculate(&[&d], &["oak".to_string()]).unwrap();
        assert_eq!(state.contexts_of(1).len(), 2);
    }

    #[test]
    fn test_documents_without_hits_are_absent() {
        let provider = WindowedKeywordInContext::default();
        let hit = doc(1, "the oak tree");
        let miss = doc(2, "the beech tree");
        let empty = Document::new(3, "doc-3");
        let state = provider
            .recalculate(&[&hit, &miss, &empty], &["oak".to_string()])
            .unwrap();

        assert_eq!(state.document_count(), 1);
        assert!(state.contexts_of(2).is_empty());
        assert!(state.contexts_of(3).is_empty());
        assert_eq!(state.total_occurrences(), 1);
    }

    #[test]
    fn test_no_tokens_yields_empty_state() {
        let provider = WindowedKeywordInContext::default();
        let d = doc(1, "the oak tree");
        let state = provider.recalculate(&[&d], &[]).unwrap();
        assert_eq!(state, KeywordInContextState::new());
    }

    #[test]
    fn test_mock_records_calls() {
        let mock = MockKeywordInContextProvider::default();
        let a = doc(1, "x");
        let b = doc(2, "y");
        mock.recalculate(&[&a, &b], &["oak".to_string()]).unwrap();

        assert_eq!(mock.call_count(), 1);
        assert_eq!(mock.last_documents(), Some(vec![1, 2]));
        assert_eq!(mock.last_tokens(), Some(vec!["oak".to_string()]));

        let failing = MockKeywordInContextProvider::failing();
        assert!(failing.recalculate(&[&a], &[]).is_err());
        assert_eq!(failing.call_count(), 1);
    }
}
