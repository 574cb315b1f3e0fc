//! The `LeafStore` trait: what the outer tree (component E) needs from
//! whichever type serves as its leaf-equivalent — a bare [`crate::page::Page`]
//! or, when the hierarchy opts into `use_superpages`, a
//! [`crate::superpage::Superpage`]. One trait, two realizations, matching
//! the teacher's `buffer::pool::BufferPool` trait (one interface, swapped
//! implementation chosen at construction time rather than per-call).
//!
//! The outer tree is generic over `L: LeafStore` (see [`crate::outer::Outer`])
//! so the descent/insert/delete/split/merge machinery at the outer level is
//! written exactly once and instantiated for either leaf-equivalent.

use crate::config::ClStrategy;
use crate::page::Page;
use crate::superpage::{SpInsertOutcome, Superpage};

/// Outcome of attempting to insert into a leaf-equivalent without first
/// checking whether it has room.
pub enum LeafInsert {
    AlreadyPresent,
    Inserted,
    /// No room for this key (and, for a page, no room even after an
    /// internal cache-line cascade). The outer tree must split this
    /// leaf-equivalent and retry.
    Full,
}

pub trait LeafStore: Sized {
    fn empty() -> Self;
    fn contains(&self, key: i32) -> bool;
    fn predecessor(&self, key: i32) -> Option<i32>;
    fn min_key(&self) -> Option<i32>;
    fn nkeys(&self) -> usize;
    fn is_underflow(&self) -> bool;
    fn extract_sorted(&self) -> Vec<i32>;
    fn build_from_sorted(keys: &[i32], strategy: ClStrategy) -> Self;

    /// Target chunk size and minimum fill used to partition a sorted key
    /// sequence into leaf-equivalents during bulk load (component G), one
    /// level up from this type's own internal `pack_chunks` call.
    fn bulk_chunk_cap() -> usize;
    fn bulk_chunk_min() -> usize;

    /// Record which cache-line strategy this leaf-equivalent's owning
    /// `Outer` is configured with, so structural ops that rebuild this
    /// leaf-equivalent later (splits, rebalances) without going through
    /// `build_from_sorted` directly still honor it. A no-op for leaf types
    /// with no nested strategy-sensitive construction of their own.
    fn set_cl_strategy(&mut self, strategy: ClStrategy);

    /// Outer-level sibling pointers — arena indices into the outer tree's
    /// leaf-equivalent arena, forming the global ascending-key linked list
    /// (see `crate::outer` and DESIGN.md's "leaf chain granularity" note).
    fn prev(&self) -> Option<u32>;
    fn set_prev(&mut self, v: Option<u32>);
    fn next(&self) -> Option<u32>;
    fn set_next(&mut self, v: Option<u32>);

    /// Cached `(root_slot, sub_height)` tag the outer tree stores alongside
    /// a leaf child pointer, refreshed after every mutation that could
    /// change it (§4.E "pointer tagging").
    fn root_tag(&self) -> (u16, u8);

    /// Attempt to insert without assuming there is room; reports `Full`
    /// instead of panicking or corrupting state if there is not.
    fn try_insert(&mut self, key: i32) -> LeafInsert;

    /// Delete `key`; returns whether it was present. Underflow is reported
    /// separately via `is_underflow` so the caller can check it after any
    /// operation, not just this one.
    fn try_delete(&mut self, key: i32) -> bool;
}

impl LeafStore for Page {
    fn empty() -> Self {
        Page::empty()
    }

    fn contains(&self, key: i32) -> bool {
        Page::contains(self, key)
    }

    fn predecessor(&self, key: i32) -> Option<i32> {
        Page::predecessor(self, key)
    }

    fn min_key(&self) -> Option<i32> {
        Page::min_key(self)
    }

    fn nkeys(&self) -> usize {
        Page::nkeys(self)
    }

    fn is_underflow(&self) -> bool {
        Page::is_underflow(self)
    }

    fn extract_sorted(&self) -> Vec<i32> {
        Page::extract_sorted(self)
    }

    fn build_from_sorted(keys: &[i32], strategy: ClStrategy) -> Self {
        Page::build_from_sorted(keys, strategy)
    }

    fn bulk_chunk_cap() -> usize {
        crate::page::PAGE_MAX_KEYS
    }

    fn bulk_chunk_min() -> usize {
        crate::page::PAGE_MIN_KEYS
    }

    fn set_cl_strategy(&mut self, _strategy: ClStrategy) {
        // A bare page's own future rebuilds always go through
        // `build_from_sorted`, which already takes a strategy argument;
        // there is no later standalone-`Page` structural op that needs a
        // remembered strategy the way a `Superpage`'s nested pages do.
    }

    fn prev(&self) -> Option<u32> {
        self.prev
    }

    fn set_prev(&mut self, v: Option<u32>) {
        self.prev = v;
    }

    fn next(&self) -> Option<u32> {
        self.next
    }

    fn set_next(&mut self, v: Option<u32>) {
        self.next = v;
    }

    fn root_tag(&self) -> (u16, u8) {
        (self.root_slot_raw() as u16, self.sub_height())
    }

    fn try_insert(&mut self, key: i32) -> LeafInsert {
        if Page::contains(self, key) {
            return LeafInsert::AlreadyPresent;
        }
        if Page::is_full(self) {
            return LeafInsert::Full;
        }
        Page::insert(self, key);
        LeafInsert::Inserted
    }

    fn try_delete(&mut self, key: i32) -> bool {
        Page::delete(self, key)
    }
}

impl LeafStore for Superpage {
    fn empty() -> Self {
        Superpage::empty()
    }

    fn contains(&self, key: i32) -> bool {
        Superpage::contains(self, key)
    }

    fn predecessor(&self, key: i32) -> Option<i32> {
        Superpage::predecessor(self, key)
    }

    fn min_key(&self) -> Option<i32> {
        Superpage::min_key(self)
    }

    fn nkeys(&self) -> usize {
        Superpage::nkeys(self)
    }

    fn is_underflow(&self) -> bool {
        Superpage::is_underflow(self)
    }

    fn extract_sorted(&self) -> Vec<i32> {
        Superpage::extract_sorted(self)
    }

    fn build_from_sorted(keys: &[i32], strategy: ClStrategy) -> Self {
        Superpage::build_from_sorted(keys, strategy)
    }

    fn bulk_chunk_cap() -> usize {
        crate::superpage::SP_MAX_KEYS
    }

    fn bulk_chunk_min() -> usize {
        crate::superpage::SP_MIN_KEYS
    }

    fn set_cl_strategy(&mut self, strategy: ClStrategy) {
        self.cl_strategy = strategy;
    }

    fn prev(&self) -> Option<u32> {
        self.prev
    }

    fn set_prev(&mut self, v: Option<u32>) {
        self.prev = v;
    }

    fn next(&self) -> Option<u32> {
        self.next
    }

    fn set_next(&mut self, v: Option<u32>) {
        self.next = v;
    }

    fn root_tag(&self) -> (u16, u8) {
        self.root_tag_raw()
    }

    fn try_insert(&mut self, key: i32) -> LeafInsert {
        match Superpage::insert(self, key) {
            SpInsertOutcome::AlreadyPresent => LeafInsert::AlreadyPresent,
            SpInsertOutcome::Inserted => LeafInsert::Inserted,
            SpInsertOutcome::Full => LeafInsert::Full,
        }
    }

    fn try_delete(&mut self, key: i32) -> bool {
        use crate::superpage::SpDeleteOutcome;
        match Superpage::delete(self, key) {
            SpDeleteOutcome::NotFound => false,
            SpDeleteOutcome::Deleted | SpDeleteOutcome::Underflowed => true,
        }
    }
}
