//! Generic name-keyed reconciliation of two collections.
//!
//! Indexes the right side once and walks the left side once, so matching is
//! linear in the size of both inputs. Only name identity is used as the key.

use super::index::SymbolIndex;
use crate::types::Declaration;

/// Partition of two collections into matched pairs and one-sided leftovers.
///
/// `matched` and `left_only` keep left input order; `right_only` keeps right
/// input order.
#[derive(Debug)]
pub struct Reconciliation<'a, T> {
    pub matched: Vec<(&'a T, &'a T)>,
    pub left_only: Vec<&'a T>,
    pub right_only: Vec<&'a T>,
}

impl<'a, T> Reconciliation<'a, T> {
    /// True when every item found a partner on the other side.
    pub fn is_balanced(&self) -> bool {
        self.left_only.is_empty() && self.right_only.is_empty()
    }
}

/// Reconcile `left` against `right` by `key_of`.
///
/// Several left items with the same name all match the right item that won
/// the index; right items shadowed by a later duplicate are never consumed
/// and end up in `right_only`.
pub fn reconcile<'a, T, K>(left: &[&'a T], right: &[&'a T], key_of: K) -> Reconciliation<'a, T>
where
    K: Fn(&'a T) -> &'a str,
{
    let index = SymbolIndex::build(right.iter().copied(), &key_of);
    let mut consumed = vec![false; right.len()];

    let mut matched = Vec::new();
    let mut left_only = Vec::new();

    for &item in left {
        match index.lookup(key_of(item)) {
            Some((position, partner)) => {
                consumed[position] = true;
                matched.push((item, partner));
            }
            None => left_only.push(item),
        }
    }

    let right_only = right
        .iter()
        .zip(consumed)
        .filter(|(_, used)| !used)
        .map(|(item, _)| *item)
        .collect();

    Reconciliation {
        matched,
        left_only,
        right_only,
    }
}

/// Reconcile two declaration collections by declaration name.
pub fn reconcile_by_name<'a, T: Declaration>(
    left: &[&'a T],
    right: &[&'a T],
) -> Reconciliation<'a, T> {
    reconcile(left, right, |decl| decl.name())
}
