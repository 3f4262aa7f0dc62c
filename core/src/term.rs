//! Index keys that point into a document's stored text.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Deref, Range};
use std::sync::Arc;

/// A word inside a shared text buffer. Compares, hashes and orders exactly
/// like the `str` it covers, so maps keyed by `TermView` can be queried
/// with plain `&str`.
#[derive(Clone)]
pub struct TermView {
    source: Arc<str>,
    span: Range<usize>,
}

impl TermView {
    /// `word` must be a subslice of `source`.
    pub(crate) fn within(source: &Arc<str>, word: &str) -> Self {
        let start = word.as_ptr() as usize - source.as_ptr() as usize;
        debug_assert!(start + word.len() <= source.len());
        Self {
            source: Arc::clone(source),
            span: start..start + word.len(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source[self.span.clone()]
    }

    /// Whether this view keeps `text` alive.
    pub(crate) fn points_into(&self, text: &Arc<str>) -> bool {
        Arc::ptr_eq(&self.source, text)
    }
}

impl Deref for TermView {
    type Target = str;

    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl Borrow<str> for TermView {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq for TermView {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for TermView {}

impl PartialOrd for TermView {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TermView {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl Hash for TermView {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state)
    }
}

impl fmt::Debug for TermView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for TermView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn view_covers_word() {
        let text: Arc<str> = Arc::from("funny pet");
        let pet = text.split(' ').nth(1).unwrap();
        let view = TermView::within(&text, pet);
        assert_eq!(view.as_str(), "pet");
        assert!(view.points_into(&text));
        assert!(!view.points_into(&Arc::from("funny pet")));
    }

    #[test]
    fn map_lookup_by_str() {
        let a: Arc<str> = Arc::from("rat");
        let b: Arc<str> = Arc::from("curly rat");
        let mut map = BTreeMap::new();
        map.insert(TermView::within(&a, &a[..]), 1);
        *map.entry(TermView::within(&b, &b[6..])).or_insert(0) += 1;
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("rat"), Some(&2));
        // The first inserted key is kept.
        let (key, _) = map.get_key_value("rat").unwrap();
        assert!(key.points_into(&a));
    }
}
