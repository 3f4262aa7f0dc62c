//! In-memory TF-IDF document search.
//!
//! Documents are split on spaces, stop words are dropped and the remaining
//! words are indexed with their term frequency. Queries use `+`/`-` word
//! semantics: a document is excluded as soon as it contains a minus word.

pub mod batch;
pub mod concurrent_map;
pub mod dedup;
pub mod document;
pub mod engine;
pub mod error;
pub mod execution;
pub mod index;
pub mod paginate;
pub mod query;
pub mod request_log;
pub mod term;
pub mod timing;
pub mod tokenizer;

pub use batch::{process_queries, process_queries_joined};
pub use concurrent_map::{ConcurrentMap, DEFAULT_BUCKET_COUNT};
pub use dedup::remove_duplicates;
pub use document::{Document, DocumentId, DocumentInput, DocumentRecord, DocumentStatus};
pub use engine::{EngineOptions, SearchEngine, MAX_RESULT_DOCUMENT_COUNT, RELEVANCE_EPSILON};
pub use error::{Result, SearchError};
pub use execution::ExecutionPolicy;
pub use paginate::{paginate, Page, Paginator};
pub use query::Query;
pub use request_log::RequestLog;
pub use timing::ScopedTimer;
pub use tokenizer::StopWords;
