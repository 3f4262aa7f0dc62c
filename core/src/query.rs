use std::collections::BTreeSet;

use crate::error::{Result, SearchError};
use crate::tokenizer::{is_valid_word, split_words, StopWords};

/// A parsed query. Terms borrow from the raw query text; both lists are
/// sorted and free of duplicates and stop words.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query<'q> {
    pub plus: Vec<&'q str>,
    pub minus: Vec<&'q str>,
}

impl Query<'_> {
    pub fn is_empty(&self) -> bool {
        self.plus.is_empty() && self.minus.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueryWord<'q> {
    text: &'q str,
    is_minus: bool,
}

fn parse_query_word(token: &str) -> Result<QueryWord<'_>> {
    let (text, is_minus) = match token.strip_prefix('-') {
        Some(rest) => (rest, true),
        None => (token, false),
    };
    if is_minus && text.is_empty() {
        return Err(SearchError::invalid("query has a '-' without a word"));
    }
    if text.starts_with('-') {
        return Err(SearchError::invalid(format!(
            "query word {token:?} has more than one leading '-'"
        )));
    }
    if !is_valid_word(text) {
        return Err(SearchError::invalid(format!(
            "query word {token:?} contains control characters"
        )));
    }
    Ok(QueryWord { text, is_minus })
}

/// Parse raw query text into plus and minus terms.
///
/// Every token is checked on its own: `"- word"` fails because the lone
/// `-` token is invalid, not because of the space.
pub fn parse_query<'q>(text: &'q str, stop_words: &StopWords) -> Result<Query<'q>> {
    let mut plus = BTreeSet::new();
    let mut minus = BTreeSet::new();
    for token in split_words(text) {
        let word = parse_query_word(token)?;
        if stop_words.contains(word.text) {
            continue;
        }
        if word.is_minus {
            minus.insert(word.text);
        } else {
            plus.insert(word.text);
        }
    }
    Ok(Query {
        plus: plus.into_iter().collect(),
        minus: minus.into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop() -> StopWords {
        StopWords::from_text("and with").unwrap()
    }

    #[test]
    fn empty_text_is_empty_query() {
        let q = parse_query("", &stop()).unwrap();
        assert!(q.is_empty());
        assert!(parse_query("   ", &stop()).unwrap().is_empty());
    }

    #[test]
    fn splits_plus_and_minus() {
        let q = parse_query("nasty rat -not rat", &stop()).unwrap();
        assert_eq!(q.plus, vec!["nasty", "rat"]);
        assert_eq!(q.minus, vec!["not"]);
    }

    #[test]
    fn stop_words_are_dropped_from_both_sets() {
        let q = parse_query("curly and -with hair", &stop()).unwrap();
        assert_eq!(q.plus, vec!["curly", "hair"]);
        assert!(q.minus.is_empty());
    }

    #[test]
    fn malformed_minus_words() {
        for raw in ["-", "--", "--word", "cat --dog", "- groomed"] {
            let err = parse_query(raw, &stop()).unwrap_err();
            assert!(err.is_invalid_input(), "{raw:?} accepted");
        }
    }

    #[test]
    fn inner_dash_is_fine() {
        let q = parse_query("well-groomed -dog-house", &stop()).unwrap();
        assert_eq!(q.plus, vec!["well-groomed"]);
        assert_eq!(q.minus, vec!["dog-house"]);
    }

    #[test]
    fn control_characters_fail() {
        assert!(parse_query("cat\u{1f}", &stop()).is_err());
        assert!(parse_query("-cat\n", &stop()).is_err());
    }

    #[test]
    fn word_in_both_sets_is_kept_in_both() {
        let q = parse_query("rat -rat", &stop()).unwrap();
        assert_eq!(q.plus, vec!["rat"]);
        assert_eq!(q.minus, vec!["rat"]);
    }
}
