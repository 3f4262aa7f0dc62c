use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::debug;

use crate::concurrent_map::{ConcurrentMap, DEFAULT_BUCKET_COUNT};
use crate::document::{Document, DocumentId, DocumentRecord, DocumentStatus};
use crate::error::{Result, SearchError};
use crate::execution::ExecutionPolicy;
use crate::index::InvertedIndex;
use crate::query::{parse_query, Query};
use crate::tokenizer::StopWords;

/// Default cap on the number of ranked results.
pub const MAX_RESULT_DOCUMENT_COUNT: usize = 5;

/// Relevance values closer than this are ranked by rating instead.
pub const RELEVANCE_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub max_results: usize,
    pub bucket_count: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_results: MAX_RESULT_DOCUMENT_COUNT,
            bucket_count: DEFAULT_BUCKET_COUNT,
        }
    }
}

/// In-memory TF-IDF search engine.
#[derive(Debug)]
pub struct SearchEngine {
    stop_words: StopWords,
    index: InvertedIndex,
    options: EngineOptions,
}

impl SearchEngine {
    /// Create an engine with space separated stop words.
    pub fn new(stop_words_text: &str) -> Result<Self> {
        Ok(Self::with_stop_words(StopWords::from_text(stop_words_text)?))
    }

    pub fn from_stop_words<I, S>(words: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self::with_stop_words(StopWords::from_words(words)?))
    }

    pub fn with_stop_words(stop_words: StopWords) -> Self {
        Self::with_options(stop_words, EngineOptions::default())
    }

    pub fn with_options(stop_words: StopWords, options: EngineOptions) -> Self {
        Self {
            stop_words,
            index: InvertedIndex::new(),
            options,
        }
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    pub fn stop_words(&self) -> &StopWords {
        &self.stop_words
    }

    pub fn add_document(
        &mut self,
        id: DocumentId,
        text: &str,
        status: DocumentStatus,
        ratings: &[i32],
    ) -> Result<()> {
        self.index
            .add_document(id, text, status, ratings, &self.stop_words)
    }

    pub fn document_count(&self) -> usize {
        self.index.document_count()
    }

    pub fn document(&self, id: DocumentId) -> Option<&DocumentRecord> {
        self.index.document(id)
    }

    /// Live document ids, ascending.
    pub fn document_ids(&self) -> impl DoubleEndedIterator<Item = DocumentId> + '_ {
        self.index.document_ids()
    }

    /// Term frequencies of one document. Unknown ids give an empty map.
    pub fn word_frequencies(&self, id: DocumentId) -> BTreeMap<&str, f64> {
        self.index.word_frequencies(id)
    }

    pub fn remove_document(&mut self, id: DocumentId) {
        self.remove_document_with(ExecutionPolicy::Sequential, id);
    }

    /// Remove a document. Unknown ids are a no-op.
    pub fn remove_document_with(&mut self, policy: ExecutionPolicy, id: DocumentId) {
        self.index.remove_document(policy, id);
    }

    pub fn parse_query<'q>(&self, raw_query: &'q str) -> Result<Query<'q>> {
        parse_query(raw_query, &self.stop_words)
    }

    /// Top documents with [`DocumentStatus::Active`].
    pub fn find_top_documents(&self, raw_query: &str) -> Result<Vec<Document>> {
        self.find_top_documents_with_status(raw_query, DocumentStatus::Active)
    }

    pub fn find_top_documents_with_status(
        &self,
        raw_query: &str,
        status: DocumentStatus,
    ) -> Result<Vec<Document>> {
        self.find_top_documents_by(raw_query, move |_, doc_status, _| doc_status == status)
    }

    pub fn find_top_documents_by<P>(&self, raw_query: &str, predicate: P) -> Result<Vec<Document>>
    where
        P: Fn(DocumentId, DocumentStatus, i32) -> bool + Sync,
    {
        self.find_top_documents_with(ExecutionPolicy::Sequential, raw_query, predicate)
    }

    /// Rank documents for `raw_query`, keeping those accepted by `predicate`.
    ///
    /// Results are sorted by descending relevance; relevances within
    /// [`RELEVANCE_EPSILON`] are ordered by descending rating, then by id.
    /// At most `max_results` documents are returned.
    pub fn find_top_documents_with<P>(
        &self,
        policy: ExecutionPolicy,
        raw_query: &str,
        predicate: P,
    ) -> Result<Vec<Document>>
    where
        P: Fn(DocumentId, DocumentStatus, i32) -> bool + Sync,
    {
        let query = self.parse_query(raw_query)?;
        let mut documents = self.find_all_documents(policy, &query, &predicate);
        sort_by_relevance(&mut documents);
        documents.truncate(self.options.max_results);
        Ok(documents)
    }

    fn find_all_documents<P>(&self, policy: ExecutionPolicy, query: &Query<'_>, predicate: &P) -> Vec<Document>
    where
        P: Fn(DocumentId, DocumentStatus, i32) -> bool + Sync,
    {
        if query.plus.is_empty() {
            return Vec::new();
        }
        let relevance: ConcurrentMap<DocumentId, f64> = ConcurrentMap::new(self.options.bucket_count);

        policy.for_each(&query.plus, |word| {
            let (Some(postings), Some(idf)) = (
                self.index.postings(word),
                self.index.inverse_document_frequency(word),
            ) else {
                return;
            };
            for (&id, &tf) in postings {
                let Some(record) = self.index.document(id) else {
                    continue;
                };
                if predicate(id, record.status, record.rating) {
                    *relevance.access(id) += tf * idf;
                }
            }
        });

        policy.for_each(&query.minus, |word| {
            if let Some(postings) = self.index.postings(word) {
                for &id in postings.keys() {
                    relevance.erase(id);
                }
            }
        });

        let documents: Vec<Document> = relevance
            .snapshot()
            .into_iter()
            .filter_map(|(id, score)| {
                self.index
                    .document(id)
                    .map(|record| Document::new(id, score, record.rating))
            })
            .collect();
        debug!(
            plus = query.plus.len(),
            minus = query.minus.len(),
            candidates = documents.len(),
            ?policy,
            "ranked query"
        );
        documents
    }

    pub fn match_document<'s>(
        &'s self,
        raw_query: &str,
        id: DocumentId,
    ) -> Result<(Vec<&'s str>, DocumentStatus)> {
        self.match_document_with(ExecutionPolicy::Sequential, raw_query, id)
    }

    /// Plus terms of `raw_query` found in document `id`, sorted. An empty
    /// list is returned when the document contains any minus term.
    pub fn match_document_with<'s>(
        &'s self,
        policy: ExecutionPolicy,
        raw_query: &str,
        id: DocumentId,
    ) -> Result<(Vec<&'s str>, DocumentStatus)> {
        let record = self
            .index
            .document(id)
            .ok_or(SearchError::DocumentNotFound(id))?;
        let query = self.parse_query(raw_query)?;

        let excluded = policy.any(&query.minus, |word| {
            self.index.term_in_document(id, word).is_some()
        });
        if excluded {
            return Ok((Vec::new(), record.status));
        }

        let mut matched = policy.filter_map(&query.plus, |word| self.index.term_in_document(id, word));
        matched.sort_unstable();
        matched.dedup();
        Ok((matched, record.status))
    }
}

impl<'a> IntoIterator for &'a SearchEngine {
    type Item = DocumentId;
    type IntoIter = std::iter::Copied<std::collections::btree_set::Iter<'a, DocumentId>>;

    fn into_iter(self) -> Self::IntoIter {
        self.index.id_set().iter().copied()
    }
}

/// Descending relevance, then descending rating inside runs whose relevance
/// is within [`RELEVANCE_EPSILON`] of the run's first (highest) entry, then
/// ascending id. No run spans more than the epsilon.
fn sort_by_relevance(documents: &mut [Document]) {
    documents.sort_by(|a, b| b.relevance.total_cmp(&a.relevance).then(a.id.cmp(&b.id)));
    let mut start = 0;
    while start < documents.len() {
        let mut end = start + 1;
        while end < documents.len()
            && documents[start].relevance - documents[end].relevance < RELEVANCE_EPSILON
        {
            end += 1;
        }
        documents[start..end].sort_by(|a, b| match b.rating.cmp(&a.rating) {
            Ordering::Equal => a.id.cmp(&b.id),
            other => other,
        });
        start = end;
    }
}
