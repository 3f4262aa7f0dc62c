use std::collections::BTreeSet;

use crate::error::{Result, SearchError};

/// Split text into words on single spaces. Runs of spaces never produce
/// empty words.
pub fn split_words(text: &str) -> impl Iterator<Item = &str> {
    text.split(' ').filter(|w| !w.is_empty())
}

/// A word is valid when it holds no character below U+0020.
pub fn is_valid_word(word: &str) -> bool {
    !word.chars().any(|c| (c as u32) < 0x20)
}

/// Words excluded from indexing and from queries.
#[derive(Debug, Clone, Default)]
pub struct StopWords {
    words: BTreeSet<String>,
}

impl StopWords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from space separated text, e.g. `"and with"`.
    pub fn from_text(text: &str) -> Result<Self> {
        Self::from_words(split_words(text))
    }

    /// Build from a word list. Empty entries are skipped; entries with
    /// control characters reject the whole set.
    pub fn from_words<I, S>(words: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for word in words {
            let word = word.as_ref();
            if word.is_empty() {
                continue;
            }
            if !is_valid_word(word) {
                return Err(SearchError::invalid(format!(
                    "stop word {word:?} contains control characters"
                )));
            }
            set.insert(word.to_string());
        }
        Ok(Self { words: set })
    }

    #[inline]
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }
}

/// Split `text`, validate every word, and keep the ones that are not stop
/// words. Fails on the first invalid word without yielding a partial result.
pub fn split_words_no_stop<'t>(text: &'t str, stop_words: &StopWords) -> Result<Vec<&'t str>> {
    let mut words = Vec::new();
    for word in split_words(text) {
        if !is_valid_word(word) {
            return Err(SearchError::invalid(format!(
                "word {word:?} contains control characters"
            )));
        }
        if !stop_words.contains(word) {
            words.push(word);
        }
    }
    Ok(words)
}
