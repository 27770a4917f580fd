//! Name-keyed lookup over a declaration collection.

use std::collections::HashMap;

/// Case-sensitive name index built fresh for one comparison.
///
/// When several items share a name, the last one wins. The index is a
/// best-effort lookup, not a uniqueness check.
#[derive(Debug)]
pub struct SymbolIndex<'a, T> {
    entries: HashMap<&'a str, (usize, &'a T)>,
}

impl<'a, T> SymbolIndex<'a, T> {
    /// Index `items` by `key_of`, remembering each item's input position.
    pub fn build<I, K>(items: I, key_of: K) -> Self
    where
        I: IntoIterator<Item = &'a T>,
        K: Fn(&'a T) -> &'a str,
    {
        let iter = items.into_iter();
        let mut entries = HashMap::with_capacity(iter.size_hint().0);
        for (position, item) in iter.enumerate() {
            entries.insert(key_of(item), (position, item));
        }
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&'a T> {
        self.entries.get(name).map(|(_, item)| *item)
    }

    /// Input position of the winning item for `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.get(name).map(|(position, _)| *position)
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<(usize, &'a T)> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
