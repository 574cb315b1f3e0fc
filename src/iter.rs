//! Component H — forward iteration from an arbitrary starting key.
//!
//! Grounded in the teacher's `btree::cursor::Cursor`: a cursor owns a small
//! scratch buffer of the current leaf's contents plus a position into it,
//! and refills the buffer from the next leaf via the sibling chain once
//! exhausted, rather than re-descending the tree on every step.

use crate::leaf_store::LeafStore;
use crate::outer::Outer;

/// A forward cursor over an [`Outer`] tree, positioned at the first key
/// `>= start` when constructed via [`Outer::iter_from`] equivalent
/// (see `crate::lib::Index::iter_from`).
pub struct Iter<'a, L: LeafStore> {
    outer: &'a Outer<L>,
    buf: Vec<i32>,
    pos: usize,
    next_leaf: Option<u32>,
}

impl<'a, L: LeafStore> Iter<'a, L> {
    pub(crate) fn new(outer: &'a Outer<L>, start: i32) -> Self {
        match outer.descend_to_leaf(start) {
            None => Iter { outer, buf: Vec::new(), pos: 0, next_leaf: None },
            Some(idx) => {
                let leaf = outer.leaves().get(idx);
                let buf = leaf.extract_sorted();
                let pos = crate::keys::lower_bound(&buf, start);
                let next_leaf = leaf.next();
                let mut it = Iter { outer, buf, pos, next_leaf };
                it.refill_if_exhausted();
                it
            }
        }
    }

    fn refill_if_exhausted(&mut self) {
        while self.pos >= self.buf.len() {
            match self.next_leaf {
                None => break,
                Some(idx) => {
                    let leaf = self.outer.leaves().get(idx);
                    self.buf = leaf.extract_sorted();
                    self.pos = 0;
                    self.next_leaf = leaf.next();
                }
            }
        }
    }

    /// The next key in ascending order, or `None` once the tree is
    /// exhausted. Mirrors `iter_next`'s "advance or signal end" contract;
    /// `iter_destroy` has no counterpart here since dropping the `Iter`
    /// (an ordinary borrow, not an owning handle) already reclaims nothing
    /// beyond its own scratch buffer.
    pub fn next(&mut self) -> Option<i32> {
        self.refill_if_exhausted();
        if self.pos < self.buf.len() {
            let v = self.buf[self.pos];
            self.pos += 1;
            Some(v)
        } else {
            None
        }
    }
}
