use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::debug;

use crate::document::{average_rating, DocumentId, DocumentRecord, DocumentStatus};
use crate::error::{Result, SearchError};
use crate::execution::ExecutionPolicy;
use crate::term::TermView;
use crate::tokenizer::{split_words_no_stop, StopWords};

/// document id -> term frequency
pub type Postings = BTreeMap<DocumentId, f64>;

/// Forward and reverse term-frequency tables plus the document store.
///
/// Every key in both tables is a [`TermView`] into some live document's
/// text, never into query or caller memory.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    word_to_documents: BTreeMap<TermView, Postings>,
    document_to_words: BTreeMap<DocumentId, BTreeMap<TermView, f64>>,
    documents: BTreeMap<DocumentId, DocumentRecord>,
    document_ids: BTreeSet<DocumentId>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a document. Nothing is mutated unless the id and every word
    /// are valid.
    pub fn add_document(
        &mut self,
        id: DocumentId,
        text: &str,
        status: DocumentStatus,
        ratings: &[i32],
        stop_words: &StopWords,
    ) -> Result<()> {
        if id < 0 {
            return Err(SearchError::invalid(format!("document id {id} is negative")));
        }
        if self.documents.contains_key(&id) {
            return Err(SearchError::invalid(format!("document id {id} already exists")));
        }

        let text: Arc<str> = Arc::from(text);
        let words = split_words_no_stop(&text, stop_words)?;

        let mut frequencies: BTreeMap<TermView, f64> = BTreeMap::new();
        if !words.is_empty() {
            let inverse_word_count = 1.0 / words.len() as f64;
            for word in &words {
                *frequencies.entry(TermView::within(&text, word)).or_insert(0.0) +=
                    inverse_word_count;
            }
        }

        for (term, tf) in &frequencies {
            match self.word_to_documents.get_mut(term.as_str()) {
                Some(postings) => {
                    postings.insert(id, *tf);
                }
                None => {
                    self.word_to_documents
                        .insert(term.clone(), BTreeMap::from([(id, *tf)]));
                }
            }
        }

        debug!(id, words = words.len(), terms = frequencies.len(), "indexed document");
        self.document_to_words.insert(id, frequencies);
        self.documents.insert(
            id,
            DocumentRecord {
                rating: average_rating(ratings),
                status,
                text,
            },
        );
        self.document_ids.insert(id);
        Ok(())
    }

    /// Purge `id` from every table. Unknown ids are ignored.
    ///
    /// Posting lists for the document's terms are detached from the forward
    /// table, the id is erased from each of them (in parallel under
    /// [`ExecutionPolicy::Parallel`]), and the non-empty ones are put back.
    /// Keys that pointed into the removed text are re-pointed at a surviving
    /// document, so no view outlives its document.
    pub fn remove_document(&mut self, policy: ExecutionPolicy, id: DocumentId) -> bool {
        let Some(terms) = self.document_to_words.remove(&id) else {
            return false;
        };
        let Some(record) = self.documents.remove(&id) else {
            return false;
        };
        self.document_ids.remove(&id);

        let mut detached: Vec<(TermView, Postings)> = terms
            .keys()
            .filter_map(|term| self.word_to_documents.remove_entry(term.as_str()))
            .collect();

        policy.for_each_mut(&mut detached, |(_, postings)| {
            postings.remove(&id);
        });

        let mut dropped = 0usize;
        for (key, postings) in detached {
            let Some(&survivor) = postings.keys().next() else {
                dropped += 1;
                continue;
            };
            let key = if key.points_into(&record.text) {
                self.document_to_words
                    .get(&survivor)
                    .and_then(|words| words.get_key_value(key.as_str()))
                    .map(|(k, _)| k.clone())
                    .unwrap_or(key)
            } else {
                key
            };
            self.word_to_documents.insert(key, postings);
        }

        debug!(id, terms = terms.len(), dropped, ?policy, "removed document");
        true
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn contains_document(&self, id: DocumentId) -> bool {
        self.document_ids.contains(&id)
    }

    /// Live ids in ascending order.
    pub fn document_ids(&self) -> impl DoubleEndedIterator<Item = DocumentId> + '_ {
        self.document_ids.iter().copied()
    }

    pub(crate) fn id_set(&self) -> &BTreeSet<DocumentId> {
        &self.document_ids
    }

    pub fn document(&self, id: DocumentId) -> Option<&DocumentRecord> {
        self.documents.get(&id)
    }

    pub fn postings(&self, term: &str) -> Option<&Postings> {
        self.word_to_documents.get(term)
    }

    /// Term frequencies of one document; empty for an unknown id.
    pub fn word_frequencies(&self, id: DocumentId) -> BTreeMap<&str, f64> {
        self.document_to_words
            .get(&id)
            .map(|words| words.iter().map(|(t, tf)| (t.as_str(), *tf)).collect())
            .unwrap_or_default()
    }

    /// The index's own copy of `term` if document `id` contains it.
    pub fn term_in_document(&self, id: DocumentId, term: &str) -> Option<&str> {
        self.document_to_words
            .get(&id)?
            .get_key_value(term)
            .map(|(t, _)| t.as_str())
    }

    /// ln(total documents / documents containing `term`).
    pub fn inverse_document_frequency(&self, term: &str) -> Option<f64> {
        let postings = self.word_to_documents.get(term)?;
        if postings.is_empty() {
            return None;
        }
        Some((self.document_count() as f64 / postings.len() as f64).ln())
    }

    pub fn term_count(&self) -> usize {
        self.word_to_documents.len()
    }

    #[cfg(test)]
    fn keys_alive_for(&self, text: &Arc<str>) -> usize {
        self.word_to_documents
            .keys()
            .chain(self.document_to_words.values().flat_map(|w| w.keys()))
            .filter(|k| k.points_into(text))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop() -> StopWords {
        StopWords::from_text("and with").unwrap()
    }

    fn add(index: &mut InvertedIndex, id: DocumentId, text: &str) -> Result<()> {
        index.add_document(id, text, DocumentStatus::Active, &[1, 2], &stop())
    }

    #[test]
    fn add_computes_term_frequencies() {
        let mut index = InvertedIndex::new();
        add(&mut index, 1, "pet with rat and rat and rat").unwrap();

        let freqs = index.word_frequencies(1);
        assert_eq!(freqs.len(), 2);
        assert!((freqs["rat"] - 0.75).abs() < 1e-12);
        assert!((freqs["pet"] - 0.25).abs() < 1e-12);
        assert_eq!(index.postings("rat").unwrap().get(&1), Some(&0.75));
        assert!(index.postings("and").is_none());
    }

    #[test]
    fn rejects_negative_and_duplicate_ids() {
        let mut index = InvertedIndex::new();
        assert!(add(&mut index, -1, "cat").unwrap_err().is_invalid_input());
        add(&mut index, 20, "fluffy cat").unwrap();
        assert!(add(&mut index, 20, "cat in the city").unwrap_err().is_invalid_input());
        assert_eq!(index.document_count(), 1);
        assert!(index.postings("city").is_none());
    }

    #[test]
    fn invalid_word_leaves_index_untouched() {
        let mut index = InvertedIndex::new();
        assert!(add(&mut index, 0, "cat in the city\u{3}").is_err());
        assert_eq!(index.document_count(), 0);
        assert_eq!(index.term_count(), 0);
        assert_eq!(index.document_ids().count(), 0);
    }

    #[test]
    fn stop_word_only_document_is_live() {
        let mut index = InvertedIndex::new();
        add(&mut index, 4, "and with and").unwrap();
        assert!(index.contains_document(4));
        assert!(index.word_frequencies(4).is_empty());
        assert_eq!(index.document_count(), 1);
    }

    #[test]
    fn unknown_id_has_no_frequencies() {
        let index = InvertedIndex::new();
        assert!(index.word_frequencies(99).is_empty());
    }

    #[test]
    fn remove_purges_all_tables() {
        for policy in [ExecutionPolicy::Sequential, ExecutionPolicy::Parallel] {
            let mut index = InvertedIndex::new();
            add(&mut index, 1, "funny pet and nasty rat").unwrap();
            add(&mut index, 2, "funny pet with curly hair").unwrap();

            assert!(index.remove_document(policy, 1));
            assert!(!index.contains_document(1));
            assert!(index.document(1).is_none());
            assert!(index.word_frequencies(1).is_empty());
            assert!(index.postings("nasty").is_none());
            assert!(index.postings("rat").is_none());
            assert_eq!(index.postings("funny").unwrap().len(), 1);
            assert_eq!(index.document_count(), 1);

            assert!(!index.remove_document(policy, 1));
            assert_eq!(index.document_count(), 1);
        }
    }

    #[test]
    fn removed_text_is_not_referenced() {
        let mut index = InvertedIndex::new();
        add(&mut index, 1, "funny pet").unwrap();
        add(&mut index, 2, "funny pet rat").unwrap();
        let text = Arc::clone(&index.document(1).unwrap().text);
        assert!(index.keys_alive_for(&text) > 0);

        index.remove_document(ExecutionPolicy::Sequential, 1);
        assert_eq!(index.keys_alive_for(&text), 0);
        assert_eq!(Arc::strong_count(&text), 1);
        assert_eq!(index.postings("funny").unwrap().keys().copied().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn idf_uses_live_document_count() {
        let mut index = InvertedIndex::new();
        add(&mut index, 1, "cat").unwrap();
        add(&mut index, 2, "dog").unwrap();
        add(&mut index, 3, "dog").unwrap();
        let idf = index.inverse_document_frequency("cat").unwrap();
        assert!((idf - 3f64.ln()).abs() < 1e-12);
        assert!(index.inverse_document_frequency("bird").is_none());
    }

    #[test]
    fn ids_iterate_ascending() {
        let mut index = InvertedIndex::new();
        for id in [5, 1, 3] {
            add(&mut index, id, "x").unwrap();
        }
        assert_eq!(index.document_ids().collect::<Vec<_>>(), vec![1, 3, 5]);
        assert_eq!(index.term_in_document(3, "x"), Some("x"));
        assert_eq!(index.term_in_document(3, "y"), None);
    }
}
