//! # Matryoshka Index
//!
//! An in-memory ordered index over `i32` keys, laid out as three nested
//! B+ trees — an outer tree of leaf-equivalents, each leaf-equivalent a
//! B+ tree of pages (or, with [`Hierarchy::use_superpages`], a B+ tree of
//! pages nested one level deeper inside a superpage), each page a B+ tree
//! of cache-line-sized sub-nodes.
//!
//! ## Architecture
//!
//! - **Cache-line layer** (`cl`): fixed-capacity leaf/internal sub-nodes
//!   sized to fit one cache line, searched with a branch-light predecessor
//!   scan (`keys`).
//! - **Page layer** (`page`): a small B+ tree of cache-line sub-nodes,
//!   the default leaf-equivalent of the outer tree.
//! - **Superpage layer** (`superpage`): an optional coarser leaf-equivalent
//!   holding a B+ tree of pages, for workloads that want fewer, larger
//!   leaves.
//! - **Outer layer** (`outer`): the top-level B+ tree, generic over
//!   whichever leaf-equivalent (`leaf_store::LeafStore`) the configured
//!   [`Hierarchy`] selects.
//! - **Iteration** (`iter`): a cursor that reseeks across leaf-equivalents
//!   via the sibling chain instead of re-descending the tree.
//!
//! ## Usage
//!
//! ```
//! use matryoshka_index::Index;
//!
//! let mut index = Index::create();
//! assert!(index.insert(42));
//! assert!(!index.insert(42));
//! assert!(index.contains(42));
//! assert_eq!(index.search(50), Some(42));
//! assert!(index.delete(42));
//! assert_eq!(index.size(), 0);
//! ```

pub mod arena;
pub mod bulk;
pub mod cl;
pub mod config;
pub mod error;
pub mod iter;
pub mod keys;
pub mod leaf_store;
pub mod outer;
pub mod page;
pub mod superpage;

pub use config::{ClStrategy, Hierarchy};
pub use error::{IndexError, Result};

use crate::iter::Iter as InnerIter;
use crate::outer::Outer;
use crate::page::Page;
use crate::superpage::Superpage;
use tracing::trace;

enum IndexImpl {
    Paged(Outer<Page>),
    Superpaged(Outer<Superpage>),
}

/// The public handle to a matryoshka index.
///
/// Dispatches to one of two concrete outer-tree instantiations depending on
/// the [`Hierarchy`] it was built with — a bare [`page::Page`]-leaved tree
/// by default, or a [`superpage::Superpage`]-leaved one when
/// `hierarchy.use_superpages` is set. Grounded in the teacher's `Db`: a
/// thin façade over the actual tree type that carries the configuration it
/// was opened with and nothing else.
pub struct Index {
    inner: IndexImpl,
    hierarchy: Hierarchy,
}

impl Index {
    /// An empty index with the default hierarchy (page-leaved outer tree).
    pub fn create() -> Self {
        Self::create_with(Hierarchy::default())
    }

    /// An empty index with an explicit hierarchy.
    pub fn create_with(hierarchy: Hierarchy) -> Self {
        let inner = if hierarchy.use_superpages {
            IndexImpl::Superpaged(Outer::empty(hierarchy.cl_strategy))
        } else {
            IndexImpl::Paged(Outer::empty(hierarchy.cl_strategy))
        };
        Self { inner, hierarchy }
    }

    /// Build an index from a sorted sequence of unique keys in O(n), using
    /// the default hierarchy.
    pub fn bulk_load(keys: &[i32]) -> Result<Self> {
        Self::bulk_load_with(keys, Hierarchy::default())
    }

    /// Build an index from a sorted sequence of unique keys in O(n), using
    /// an explicit hierarchy.
    pub fn bulk_load_with(keys: &[i32], hierarchy: Hierarchy) -> Result<Self> {
        if !keys.windows(2).all(|w| w[0] < w[1]) {
            return Err(IndexError::invalid_bulk_input(
                "bulk_load requires strictly ascending, duplicate-free keys",
            ));
        }
        let inner = if hierarchy.use_superpages {
            IndexImpl::Superpaged(Outer::bulk_load(keys, hierarchy.cl_strategy))
        } else {
            IndexImpl::Paged(Outer::bulk_load(keys, hierarchy.cl_strategy))
        };
        trace!(count = keys.len(), use_superpages = hierarchy.use_superpages, "bulk loaded index");
        Ok(Self { inner, hierarchy })
    }

    /// The hierarchy this index was built with.
    pub fn hierarchy(&self) -> Hierarchy {
        self.hierarchy
    }

    /// Current number of keys in the index.
    pub fn size(&self) -> usize {
        match &self.inner {
            IndexImpl::Paged(o) => o.len(),
            IndexImpl::Superpaged(o) => o.len(),
        }
    }

    /// Exact membership test.
    pub fn contains(&self, key: i32) -> bool {
        match &self.inner {
            IndexImpl::Paged(o) => o.contains(key),
            IndexImpl::Superpaged(o) => o.contains(key),
        }
    }

    /// Largest key `<= query`, or `None` if no such key exists.
    pub fn search(&self, query: i32) -> Option<i32> {
        match &self.inner {
            IndexImpl::Paged(o) => o.search(query),
            IndexImpl::Superpaged(o) => o.search(query),
        }
    }

    /// Insert `key`. Returns `true` if it was newly inserted, `false` if it
    /// was already present.
    pub fn insert(&mut self, key: i32) -> bool {
        match &mut self.inner {
            IndexImpl::Paged(o) => o.insert(key),
            IndexImpl::Superpaged(o) => o.insert(key),
        }
    }

    /// Delete `key`. Returns `true` if it was present.
    pub fn delete(&mut self, key: i32) -> bool {
        match &mut self.inner {
            IndexImpl::Paged(o) => o.delete(key),
            IndexImpl::Superpaged(o) => o.delete(key),
        }
    }

    /// Insert every key in `keys`, skipping duplicates already present.
    /// Returns the number actually inserted. Order of `keys` need not be
    /// sorted; unlike `bulk_load` this is just a loop over `insert` and
    /// accepts an index that already has keys in it.
    pub fn insert_batch(&mut self, keys: &[i32]) -> usize {
        keys.iter().filter(|&&k| self.insert(k)).count()
    }

    /// Delete every key in `keys` that is present. Returns the number
    /// actually deleted.
    pub fn delete_batch(&mut self, keys: &[i32]) -> usize {
        keys.iter().filter(|&&k| self.delete(k)).count()
    }

    /// A forward cursor positioned at the first key `>= start`.
    pub fn iter_from(&self, start: i32) -> IndexIter<'_> {
        match &self.inner {
            IndexImpl::Paged(o) => IndexIter::Paged(InnerIter::new(o, start)),
            IndexImpl::Superpaged(o) => IndexIter::Superpaged(InnerIter::new(o, start)),
        }
    }

    /// Narrate the descent path for `key` through outer tree, leaf-equivalent,
    /// page sub-tree, and cache-line sub-node. Diagnostic only; grounded in
    /// the teacher's `BTree::debug_get`.
    pub fn debug_trace(&self, key: i32) -> Vec<String> {
        let mut trace = Vec::new();
        match &self.inner {
            IndexImpl::Paged(o) => {
                trace.push(format!("outer: height={}", o.height()));
                if let Some(idx) = o.descend_to_leaf(key) {
                    let page = o.leaves().get(idx);
                    trace.push(format!(
                        "page[{idx}]: nkeys={} sub_height={} contains={}",
                        page.nkeys(),
                        page.sub_height(),
                        page.contains(key)
                    ));
                    trace.extend(page.debug_descend(key));
                } else {
                    trace.push("outer: empty tree".to_string());
                }
            }
            IndexImpl::Superpaged(o) => {
                trace.push(format!("outer: height={}", o.height()));
                if let Some(idx) = o.descend_to_leaf(key) {
                    let sp = o.leaves().get(idx);
                    trace.push(format!("superpage[{idx}]: nkeys={} contains={}", sp.nkeys(), sp.contains(key)));
                    trace.extend(sp.debug_descend(key));
                } else {
                    trace.push("outer: empty tree".to_string());
                }
            }
        }
        trace
    }
}

/// A forward cursor over an [`Index`]. Holds a borrow of the index it was
/// created from, so it cannot outlive mutation of that index — matching the
/// spec's "undefined if the index is mutated mid-traversal" contract by
/// construction rather than by runtime check.
pub enum IndexIter<'a> {
    Paged(InnerIter<'a, Page>),
    Superpaged(InnerIter<'a, Superpage>),
}

impl<'a> IndexIter<'a> {
    /// The next key in ascending order, or `None` once exhausted.
    pub fn iter_next(&mut self) -> Option<i32> {
        match self {
            IndexIter::Paged(it) => it.next(),
            IndexIter::Superpaged(it) => it.next(),
        }
    }

    /// Explicit teardown, named to match the operation table; an ordinary
    /// drop does the same thing since this cursor owns nothing but a
    /// scratch buffer and a borrow.
    pub fn iter_destroy(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_insert_contains_delete_roundtrip() {
        let mut idx = Index::create();
        assert_eq!(idx.size(), 0);
        for k in (0..5000).rev() {
            assert!(idx.insert(k));
        }
        assert!(!idx.insert(100));
        assert_eq!(idx.size(), 5000);
        for k in 0..5000 {
            assert!(idx.contains(k));
        }
        for k in (0..5000).step_by(3) {
            assert!(idx.delete(k));
        }
        assert_eq!(idx.size(), 5000 - (0..5000).step_by(3).count());
        for k in (0..5000).step_by(3) {
            assert!(!idx.contains(k));
        }
    }

    #[test]
    fn search_is_largest_key_not_exceeding_query() {
        let idx = Index::bulk_load(&[10, 20, 30, 40]).unwrap();
        assert_eq!(idx.search(25), Some(20));
        assert_eq!(idx.search(10), Some(10));
        assert_eq!(idx.search(5), None);
        assert_eq!(idx.search(1000), Some(40));
    }

    #[test]
    fn bulk_load_rejects_unsorted_or_duplicate_input() {
        assert!(Index::bulk_load(&[3, 1, 2]).is_err());
        assert!(Index::bulk_load(&[1, 1, 2]).is_err());
        assert!(Index::bulk_load(&[1, 2, 3]).is_ok());
        assert!(Index::bulk_load(&[]).is_ok());
    }

    #[test]
    fn insert_batch_and_delete_batch_count_correctly() {
        let mut idx = Index::create();
        let keys: Vec<i32> = (0..1000).collect();
        assert_eq!(idx.insert_batch(&keys), 1000);
        assert_eq!(idx.insert_batch(&keys), 0);
        assert_eq!(idx.delete_batch(&keys[..500]), 500);
        assert_eq!(idx.delete_batch(&keys[..500]), 0);
        assert_eq!(idx.size(), 500);
    }

    #[test]
    fn iter_from_yields_ascending_keys_from_start() {
        let idx = Index::bulk_load(&(0..10_000).collect::<Vec<_>>()).unwrap();
        let mut it = idx.iter_from(9995);
        let mut collected = Vec::new();
        while let Some(k) = it.iter_next() {
            collected.push(k);
        }
        assert_eq!(collected, vec![9995, 9996, 9997, 9998, 9999]);
        it.iter_destroy();
    }

    #[test]
    fn iter_from_past_the_end_yields_nothing() {
        let idx = Index::bulk_load(&[1, 2, 3]).unwrap();
        let mut it = idx.iter_from(100);
        assert_eq!(it.iter_next(), None);
    }

    #[test]
    fn superpage_hierarchy_behaves_the_same_as_default() {
        let mut idx = Index::create_with(Hierarchy::high_capacity());
        for k in (0..50_000).rev() {
            idx.insert(k);
        }
        assert_eq!(idx.size(), 50_000);
        for k in (0..50_000).step_by(37) {
            assert!(idx.contains(k));
        }
        for k in (0..50_000).step_by(2) {
            assert!(idx.delete(k));
        }
        assert_eq!(idx.size(), 25_000);
    }

    #[test]
    fn debug_trace_reports_descent_without_panicking() {
        let idx = Index::bulk_load(&[1, 2, 3, 4, 5]).unwrap();
        let lines = idx.debug_trace(3);
        assert!(!lines.is_empty());
        let empty = Index::create();
        assert!(!empty.debug_trace(0).is_empty());
    }

    #[test]
    fn debug_trace_descends_into_cache_line_sub_tree() {
        let idx = Index::bulk_load(&(0..5000).collect::<Vec<_>>()).unwrap();
        let lines = idx.debug_trace(2500);
        assert!(lines.iter().any(|l| l.starts_with("page[")));
        assert!(lines.iter().any(|l| l.starts_with("cl[")));

        let mut sp_idx = Index::create_with(Hierarchy::default().with_superpages(true));
        for k in (0..5000).rev() {
            sp_idx.insert(k);
        }
        let sp_lines = sp_idx.debug_trace(2500);
        assert!(sp_lines.iter().any(|l| l.starts_with("superpage[")));
        assert!(sp_lines.iter().any(|l| l.starts_with("page[")));
        assert!(sp_lines.iter().any(|l| l.starts_with("cl[")));
    }
}
