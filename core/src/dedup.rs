use std::collections::{BTreeSet, HashSet};

use tracing::info;

use crate::document::DocumentId;
use crate::engine::SearchEngine;

/// Remove documents whose set of words (frequencies ignored) equals the set
/// of a document with a smaller id. Returns the removed ids, ascending.
pub fn remove_duplicates(engine: &mut SearchEngine) -> Vec<DocumentId> {
    let mut seen: HashSet<BTreeSet<String>> = HashSet::new();
    let mut duplicates = Vec::new();

    for id in engine.document_ids() {
        let words: BTreeSet<String> = engine
            .word_frequencies(id)
            .into_keys()
            .map(str::to_owned)
            .collect();
        if !seen.insert(words) {
            duplicates.push(id);
        }
    }

    for &id in &duplicates {
        info!("found duplicate document id {id}");
        engine.remove_document(id);
    }
    duplicates
}
