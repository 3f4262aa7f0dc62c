use rayon::prelude::*;

use crate::document::Document;
use crate::engine::SearchEngine;
use crate::error::Result;

/// Run every query against `engine` in parallel. Results keep the order of
/// `queries`; the first failing query (in input order) fails the batch.
pub fn process_queries<S>(engine: &SearchEngine, queries: &[S]) -> Result<Vec<Vec<Document>>>
where
    S: AsRef<str> + Sync,
{
    queries
        .par_iter()
        .map(|query| engine.find_top_documents(query.as_ref()))
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}

/// [`process_queries`] flattened into one list.
pub fn process_queries_joined<S>(engine: &SearchEngine, queries: &[S]) -> Result<Vec<Document>>
where
    S: AsRef<str> + Sync,
{
    Ok(process_queries(engine, queries)?.into_iter().flatten().collect())
}
