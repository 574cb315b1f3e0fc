//! Component D — the superpage sub-tree.
//!
//! A `Superpage` is the coarser-grained alternative leaf-equivalent: a
//! conceptual 2 MiB region holding a B+ tree of [`crate::page::Page`]s
//! instead of a B+ tree of cache-line sub-nodes. Structurally this is the
//! same technique as [`crate::page::Page`] one level up — same slot/bitmap
//! allocator shape, same "split full node" and "virtually merged
//! redistribute-or-merge" moves — grounded in the same source the page
//! module is (the teacher's `page::slotted::SlottedPage` header+slot-array
//! shape), replayed with page-nodes standing in for cache-line sub-nodes.
//!
//! The spec caps a superpage's internal structure at height <= 1: one
//! optional page-level internal node routing to up to [`SP_MAX_LEAVES`]
//! page-leaves, or a single page-leaf at height 0. That bound falls out of
//! the slot budget (511 non-header slots; one internal node can address far
//! more children than that) so this module does not implement a general
//! recursive cascade the way [`crate::page::Page`] does for CL sub-nodes —
//! there is only ever at most one internal level to maintain.

use crate::config::ClStrategy;
use crate::page::Page;
use tracing::{trace, warn};

/// Non-header slots available inside a superpage (slots 1..=511; slot 0 is
/// the superpage header).
pub const SP_SLOTS: usize = 511;
/// Maximum page-leaves addressable by the single internal level.
pub const SP_MAX_LEAVES: usize = 510;
/// Minimum non-root page-leaf count under the internal root before a
/// redistribute/merge is considered instead of a plain descent.
pub const SP_MIN_LEAVES: usize = SP_MAX_LEAVES / 4;

/// Nominal per-superpage key budget, used only for underflow heuristics:
/// the largest plausible key count across all its page-leaves.
pub const SP_MAX_KEYS: usize = SP_MAX_LEAVES * crate::page::PAGE_MAX_KEYS;
/// Minimum key count below which a non-root superpage is considered
/// underflowed — one quarter of [`SP_MAX_KEYS`], mirroring `min_page_keys`.
pub const SP_MIN_KEYS: usize = SP_MAX_KEYS / 4;

/// A page-level internal node: routes to page-leaves by separator key.
/// Dynamically sized (unlike [`crate::cl::ClInternal`]) because this level
/// is not on the cache-line-granularity hot path the CL layer is.
#[derive(Clone)]
pub struct SpInternal {
    seps: Vec<i32>,
    children: Vec<u16>,
}

impl SpInternal {
    fn new(left_child: u16) -> Self {
        Self {
            seps: Vec::new(),
            children: vec![left_child],
        }
    }

    fn len(&self) -> usize {
        self.seps.len()
    }

    fn child_for(&self, query: i32) -> usize {
        crate::keys::child_index(&self.seps, query)
    }

    fn child_at(&self, idx: usize) -> u16 {
        self.children[idx]
    }

    fn insert_at(&mut self, pos: usize, sep: i32, new_child: u16) {
        self.seps.insert(pos, sep);
        self.children.insert(pos + 1, new_child);
    }

    fn remove_at(&mut self, sep_pos: usize) -> u16 {
        self.seps.remove(sep_pos);
        self.children.remove(sep_pos + 1)
    }

    fn replace_sep_at(&mut self, pos: usize, sep: i32) {
        self.seps[pos] = sep;
    }
}

enum PageNode {
    Leaf(Page),
    Internal(SpInternal),
}

pub enum SpInsertOutcome {
    AlreadyPresent,
    Inserted,
    /// The superpage has no room left for another page-leaf; the caller
    /// (the outer tree) must split this superpage.
    Full,
}

pub enum SpDeleteOutcome {
    NotFound,
    Deleted,
    Underflowed,
}

/// A superpage: a (height <= 1) B+ tree of pages.
pub struct Superpage {
    nkeys: u64,
    root_page: u16,
    sub_height: u8,
    page_bitmap: [u64; 8], // 512 bits; bit 0 (header) always set
    pages: Vec<Option<PageNode>>,
    cl_strategy: ClStrategy,
    pub prev: Option<u32>,
    pub next: Option<u32>,
}

impl Superpage {
    pub fn empty() -> Self {
        let mut bitmap = [0u64; 8];
        bitmap[0] = 1;
        Self {
            nkeys: 0,
            root_page: 0,
            sub_height: 0,
            page_bitmap: bitmap,
            pages: (0..SP_SLOTS).map(|_| None).collect(),
            cl_strategy: ClStrategy::Default,
            prev: None,
            next: None,
        }
    }

    pub fn nkeys(&self) -> usize {
        self.nkeys as usize
    }

    pub fn is_empty(&self) -> bool {
        self.nkeys == 0
    }

    pub fn is_underflow(&self) -> bool {
        self.nkeys() < SP_MIN_KEYS
    }

    /// `(root_page, sub_height)`, exposed for the outer tree's cached
    /// leaf-pointer tag.
    pub fn root_tag_raw(&self) -> (u16, u8) {
        (self.root_page, self.sub_height)
    }

    fn bitmap_set(&mut self, i: u16) {
        self.page_bitmap[(i / 64) as usize] |= 1u64 << (i % 64);
    }

    fn bitmap_clear(&mut self, i: u16) {
        self.page_bitmap[(i / 64) as usize] &= !(1u64 << (i % 64));
    }

    fn bitmap_used(&self) -> usize {
        self.page_bitmap.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Allocate a page slot (index 1..=511); panics if none remain — callers
    /// must check [`Superpage::has_free_page`] first.
    fn alloc_page(&mut self, node: PageNode) -> u16 {
        for i in 1u16..=SP_SLOTS as u16 {
            if self.page_bitmap[(i / 64) as usize] & (1u64 << (i % 64)) == 0 {
                self.bitmap_set(i);
                self.pages[(i - 1) as usize] = Some(node);
                return i;
            }
        }
        panic!("superpage: no free page slot (caller should have split first)");
    }

    fn free_page(&mut self, i: u16) {
        self.bitmap_clear(i);
        self.pages[(i - 1) as usize] = None;
    }

    pub fn has_free_page(&self) -> bool {
        self.bitmap_used() < SP_SLOTS + 1
    }

    fn page(&self, i: u16) -> &PageNode {
        self.pages[(i - 1) as usize].as_ref().expect("superpage: access to unallocated page slot")
    }

    fn page_mut(&mut self, i: u16) -> &mut PageNode {
        self.pages[(i - 1) as usize].as_mut().expect("superpage: access to unallocated page slot")
    }

    fn leftmost_page(&self) -> Option<&Page> {
        if self.root_page == 0 {
            return None;
        }
        let mut slot = self.root_page;
        loop {
            match self.page(slot) {
                PageNode::Leaf(p) => return Some(p),
                PageNode::Internal(i) => slot = i.child_at(0),
            }
        }
    }

    pub fn min_key(&self) -> Option<i32> {
        self.leftmost_page().and_then(|p| p.min_key())
    }

    pub fn contains(&self, query: i32) -> bool {
        if self.root_page == 0 {
            return false;
        }
        let mut slot = self.root_page;
        loop {
            match self.page(slot) {
                PageNode::Leaf(p) => return p.contains(query),
                PageNode::Internal(i) => slot = i.child_at(i.child_for(query)),
            }
        }
    }

    pub fn predecessor(&self, query: i32) -> Option<i32> {
        if self.root_page == 0 {
            return None;
        }
        let mut slot = self.root_page;
        loop {
            match self.page(slot) {
                PageNode::Leaf(p) => return p.predecessor(query),
                PageNode::Internal(i) => slot = i.child_at(i.child_for(query)),
            }
        }
    }

    /// Narrate the page sub-tree descent for `query`, one line per page
    /// visited, then hand off to that page's own cache-line descent.
    /// Mirrors `predecessor`'s own walk without the early return, for
    /// `Index::debug_trace`.
    pub fn debug_descend(&self, query: i32) -> Vec<String> {
        let mut lines = Vec::new();
        if self.root_page == 0 {
            lines.push("superpage: empty sub-tree".to_string());
            return lines;
        }
        let mut slot = self.root_page;
        loop {
            match self.page(slot) {
                PageNode::Leaf(p) => {
                    lines.push(format!("page[{slot}]: nkeys={} sub_height={}", p.nkeys(), p.sub_height()));
                    lines.extend(p.debug_descend(query));
                    return lines;
                }
                PageNode::Internal(i) => {
                    let pos = i.child_for(query);
                    lines.push(format!("page-internal[{slot}]: nseps={} child_pos={pos}", i.len()));
                    slot = i.child_at(pos);
                }
            }
        }
    }

    fn free_count(&self) -> usize {
        512 - self.bitmap_used()
    }

    pub fn insert(&mut self, key: i32) -> SpInsertOutcome {
        if self.root_page == 0 {
            let mut page = Page::empty();
            page.insert(key);
            self.root_page = self.alloc_page(PageNode::Leaf(page));
            self.sub_height = 0;
            self.nkeys = 1;
            return SpInsertOutcome::Inserted;
        }
        if self.contains(key) {
            return SpInsertOutcome::AlreadyPresent;
        }
        // Conservatively require room for both a possible page split and a
        // possible new root-internal allocation before touching anything —
        // a cascading insert that consumes the last free page slot partway
        // through (page split succeeds, root allocation then fails) would
        // leave two page-leaves with no internal routing them. The spec
        // flags running out of superpage slots as rare; reserving two slots
        // up front trades a negligible amount of capacity at the very top
        // of the range for never reaching that state.
        if self.free_count() < 2 {
            warn!(free = self.free_count(), "superpage page-slot budget exhausted, rejecting insert");
            return SpInsertOutcome::Full;
        }

        match self.insert_into(self.root_page, self.sub_height, key) {
            SpInsertStep::AlreadyPresent => SpInsertOutcome::AlreadyPresent,
            SpInsertStep::Inserted => {
                self.nkeys += 1;
                SpInsertOutcome::Inserted
            }
            SpInsertStep::Split { sep, new_child } => {
                let mut new_root = SpInternal::new(self.root_page);
                new_root.insert_at(0, sep, new_child);
                self.root_page = self.alloc_page(PageNode::Internal(new_root));
                self.sub_height = 1;
                self.nkeys += 1;
                trace!(sep, "superpage page-root split");
                SpInsertOutcome::Inserted
            }
            SpInsertStep::NoRoom => SpInsertOutcome::Full,
        }
    }

    fn insert_into(&mut self, slot: u16, height: u8, key: i32) -> SpInsertStep {
        if height == 0 {
            let page = match self.page_mut(slot) {
                PageNode::Leaf(p) => p,
                PageNode::Internal(_) => unreachable!("height 0 is a page-leaf"),
            };
            if page.contains(key) {
                return SpInsertStep::AlreadyPresent;
            }
            if !page.is_full() {
                page.insert(key);
                return SpInsertStep::Inserted;
            }
            if !self.has_free_page() {
                return SpInsertStep::NoRoom;
            }
            // Page split: extract-sorted, then bulk-rebuild both halves
            // (§4.C "page split"), restoring the sibling chain afterward.
            let mut keys = page.extract_sorted();
            let (want_left, _) = key_insert_position(&keys, key);
            keys.insert(want_left, key);
            let mid = keys.len() / 2;
            let left_keys = &keys[..mid];
            let right_keys = &keys[mid..];
            let prev = page.prev;
            let next = page.next;
            let mut new_left = Page::build_from_sorted(left_keys, self.cl_strategy);
            let mut new_right = Page::build_from_sorted(right_keys, self.cl_strategy);
            new_left.prev = prev;
            new_right.prev = None; // linked below once the slot is known
            new_right.next = next;
            let sep = new_right.min_key().expect("split right half is non-empty");
            *self.page_mut(slot) = PageNode::Leaf(new_left);
            let new_slot = self.alloc_page(PageNode::Leaf(new_right));
            if let PageNode::Leaf(r) = self.page_mut(new_slot) {
                r.prev = Some(slot as u32);
            }
            if let PageNode::Leaf(l) = self.page_mut(slot) {
                l.next = Some(new_slot as u32);
            }
            SpInsertStep::Split { sep, new_child: new_slot }
        } else {
            let (pos, child) = match self.page(slot) {
                PageNode::Internal(i) => (i.child_for(key), i.child_at(i.child_for(key))),
                PageNode::Leaf(_) => unreachable!("height > 0 implies internal"),
            };
            match self.insert_into(child, height - 1, key) {
                SpInsertStep::AlreadyPresent => SpInsertStep::AlreadyPresent,
                SpInsertStep::Inserted => SpInsertStep::Inserted,
                SpInsertStep::NoRoom => SpInsertStep::NoRoom,
                SpInsertStep::Split { sep, new_child } => {
                    let inode = match self.page_mut(slot) {
                        PageNode::Internal(i) => i,
                        PageNode::Leaf(_) => unreachable!(),
                    };
                    inode.insert_at(pos, sep, new_child);
                    SpInsertStep::Inserted
                }
            }
        }
    }

    pub fn delete(&mut self, key: i32) -> SpDeleteOutcome {
        if self.root_page == 0 {
            return SpDeleteOutcome::NotFound;
        }
        match self.delete_from(self.root_page, self.sub_height, key) {
            SpDeleteStep::NotFound => SpDeleteOutcome::NotFound,
            SpDeleteStep::Deleted | SpDeleteStep::Underflowed => {
                self.nkeys -= 1;
                self.collapse_root_if_needed();
                if self.is_underflow() && self.root_page != 0 {
                    SpDeleteOutcome::Underflowed
                } else {
                    SpDeleteOutcome::Deleted
                }
            }
        }
    }

    fn collapse_root_if_needed(&mut self) {
        if self.nkeys == 0 {
            if self.root_page != 0 {
                self.free_page(self.root_page);
            }
            self.root_page = 0;
            self.sub_height = 0;
            return;
        }
        if self.sub_height == 0 {
            return;
        }
        if let PageNode::Internal(i) = self.page(self.root_page) {
            if i.len() == 0 {
                let only_child = i.child_at(0);
                self.free_page(self.root_page);
                self.root_page = only_child;
                self.sub_height = 0;
            }
        }
    }

    fn delete_from(&mut self, slot: u16, height: u8, key: i32) -> SpDeleteStep {
        if height == 0 {
            let page = match self.page_mut(slot) {
                PageNode::Leaf(p) => p,
                PageNode::Internal(_) => unreachable!(),
            };
            if !page.delete(key) {
                return SpDeleteStep::NotFound;
            }
            if slot == self.root_page || !page.is_underflow() {
                return SpDeleteStep::Deleted;
            }
            SpDeleteStep::Underflowed
        } else {
            let (pos, child) = match self.page(slot) {
                PageNode::Internal(i) => (i.child_for(key), i.child_at(i.child_for(key))),
                PageNode::Leaf(_) => unreachable!(),
            };
            match self.delete_from(child, height - 1, key) {
                SpDeleteStep::NotFound => SpDeleteStep::NotFound,
                SpDeleteStep::Deleted => SpDeleteStep::Deleted,
                SpDeleteStep::Underflowed => self.fix_page_underflow(slot, pos, child),
            }
        }
    }

    /// Repair an underflowed page-leaf by redistributing with a sibling
    /// page or merging with one, copying extracted sorted keys and
    /// re-bulk-loading both (§4.D).
    fn fix_page_underflow(&mut self, slot: u16, child_pos: usize, child: u16) -> SpDeleteStep {
        let inode = match self.page(slot) {
            PageNode::Internal(i) => i,
            PageNode::Leaf(_) => unreachable!(),
        };
        let nchildren = inode.len() + 1;
        let (sep_pos, lslot, rslot) = if child_pos > 0 {
            (child_pos - 1, inode.child_at(child_pos - 1), child)
        } else {
            debug_assert!(child_pos + 1 < nchildren, "underflowed page-leaf with no siblings");
            (child_pos, child, inode.child_at(child_pos + 1))
        };

        let left_keys = match self.page(lslot) {
            PageNode::Leaf(p) => p.extract_sorted(),
            PageNode::Internal(_) => unreachable!("page-leaves only at height 0"),
        };
        let right_keys = match self.page(rslot) {
            PageNode::Leaf(p) => p.extract_sorted(),
            PageNode::Internal(_) => unreachable!(),
        };
        let left_prev = match self.page(lslot) {
            PageNode::Leaf(p) => p.prev,
            PageNode::Internal(_) => unreachable!(),
        };
        let right_next = match self.page(rslot) {
            PageNode::Leaf(p) => p.next,
            PageNode::Internal(_) => unreachable!(),
        };

        let total = left_keys.len() + right_keys.len();
        if total <= crate::page::PAGE_MAX_KEYS {
            let mut all = left_keys;
            all.extend_from_slice(&right_keys);
            let mut merged = Page::build_from_sorted(&all, self.cl_strategy);
            merged.prev = left_prev;
            merged.next = right_next;
            *self.page_mut(lslot) = PageNode::Leaf(merged);
            self.free_page(rslot);
            let inode = match self.page_mut(slot) {
                PageNode::Internal(i) => i,
                PageNode::Leaf(_) => unreachable!(),
            };
            inode.remove_at(sep_pos);
        } else {
            let mut all = left_keys;
            all.extend_from_slice(&right_keys);
            let mid = all.len() / 2;
            let mut new_left = Page::build_from_sorted(&all[..mid], self.cl_strategy);
            let mut new_right = Page::build_from_sorted(&all[mid..], self.cl_strategy);
            new_left.prev = left_prev;
            new_left.next = Some(rslot as u32);
            new_right.prev = Some(lslot as u32);
            new_right.next = right_next;
            let sep = new_right.min_key().expect("redistributed right half is non-empty");
            *self.page_mut(lslot) = PageNode::Leaf(new_left);
            *self.page_mut(rslot) = PageNode::Leaf(new_right);
            let inode = match self.page_mut(slot) {
                PageNode::Internal(i) => i,
                PageNode::Leaf(_) => unreachable!(),
            };
            inode.replace_sep_at(sep_pos, sep);
        }

        let inode = match self.page(slot) {
            PageNode::Internal(i) => i,
            PageNode::Leaf(_) => unreachable!(),
        };
        if slot == self.root_page || inode.len() > 0 {
            SpDeleteStep::Deleted
        } else {
            SpDeleteStep::Underflowed
        }
    }

    /// Extract every key across all page-leaves, in ascending order.
    pub fn extract_sorted(&self) -> Vec<i32> {
        let mut out = Vec::with_capacity(self.nkeys());
        if self.root_page != 0 {
            self.extract_into(self.root_page, &mut out);
        }
        out
    }

    fn extract_into(&self, slot: u16, out: &mut Vec<i32>) {
        match self.page(slot) {
            PageNode::Leaf(p) => out.extend_from_slice(&p.extract_sorted()),
            PageNode::Internal(i) => {
                for &child in &i.children {
                    self.extract_into(child, out);
                }
            }
        }
    }

    /// Smallest page-leaf slot index reachable from the root (used when
    /// splicing the global sibling list across a split).
    pub fn leftmost_leaf_slot(&self) -> Option<u16> {
        if self.root_page == 0 {
            return None;
        }
        let mut slot = self.root_page;
        loop {
            match self.page(slot) {
                PageNode::Leaf(_) => return Some(slot),
                PageNode::Internal(i) => slot = i.child_at(0),
            }
        }
    }

    pub fn rightmost_leaf_slot(&self) -> Option<u16> {
        if self.root_page == 0 {
            return None;
        }
        let mut slot = self.root_page;
        loop {
            match self.page(slot) {
                PageNode::Leaf(_) => return Some(slot),
                PageNode::Internal(i) => slot = *i.children.last().unwrap(),
            }
        }
    }

    pub fn leaf_page(&self, slot: u16) -> &Page {
        match self.page(slot) {
            PageNode::Leaf(p) => p,
            PageNode::Internal(_) => panic!("superpage: slot {slot} is not a page-leaf"),
        }
    }

    pub fn leaf_page_mut(&mut self, slot: u16) -> &mut Page {
        match self.page_mut(slot) {
            PageNode::Leaf(p) => p,
            PageNode::Internal(_) => panic!("superpage: slot {slot} is not a page-leaf"),
        }
    }

    /// Build a freshly packed superpage from a sorted, deduplicated key
    /// slice: chunk into pages, bulk-load each, link them in order, then
    /// build (at most) one internal level over them (§4.G).
    pub fn build_from_sorted(keys: &[i32], strategy: ClStrategy) -> Self {
        let mut sp = Superpage::empty();
        sp.cl_strategy = strategy;
        if keys.is_empty() {
            return sp;
        }

        let chunks = crate::bulk::pack_chunks(keys.len(), crate::page::PAGE_MAX_KEYS, crate::page::PAGE_MIN_KEYS);
        assert!(chunks.len() <= SP_MAX_LEAVES, "superpage bulk-load exceeds page-leaf capacity");

        let mut offset = 0;
        let mut slots = Vec::with_capacity(chunks.len());
        let mut mins = Vec::with_capacity(chunks.len());
        for &len in &chunks {
            let chunk = &keys[offset..offset + len];
            offset += len;
            let page = Page::build_from_sorted(chunk, strategy);
            mins.push(page.min_key().expect("non-empty chunk"));
            slots.push(sp.alloc_page(PageNode::Leaf(page)));
        }
        for w in slots.windows(2) {
            let (a, b) = (w[0], w[1]);
            if let PageNode::Leaf(p) = sp.page_mut(a) {
                p.next = Some(b as u32);
            }
            if let PageNode::Leaf(p) = sp.page_mut(b) {
                p.prev = Some(a as u32);
            }
        }

        if slots.len() == 1 {
            sp.root_page = slots[0];
            sp.sub_height = 0;
        } else {
            let mut node = SpInternal::new(slots[0]);
            for i in 1..slots.len() {
                node.insert_at(i - 1, mins[i], slots[i]);
            }
            sp.root_page = sp.alloc_page(PageNode::Internal(node));
            sp.sub_height = 1;
        }
        sp.nkeys = keys.len() as u64;
        sp
    }
}

enum SpInsertStep {
    AlreadyPresent,
    Inserted,
    Split { sep: i32, new_child: u16 },
    NoRoom,
}

enum SpDeleteStep {
    NotFound,
    Deleted,
    Underflowed,
}

fn key_insert_position(sorted: &[i32], key: i32) -> (usize, bool) {
    let pos = crate::keys::lower_bound(sorted, key);
    (pos, pos < sorted.len() && sorted[pos] == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_contains_roundtrip() {
        let mut sp = Superpage::empty();
        for k in 0..2000 {
            assert!(matches!(sp.insert(k), SpInsertOutcome::Inserted));
        }
        assert!(matches!(sp.insert(5), SpInsertOutcome::AlreadyPresent));
        for k in 0..2000 {
            assert!(sp.contains(k));
        }
        assert_eq!(sp.nkeys(), 2000);
        assert_eq!(sp.extract_sorted(), (0..2000).collect::<Vec<_>>());
    }

    #[test]
    fn insert_crosses_many_pages_and_builds_internal_level() {
        let mut sp = Superpage::empty();
        for k in 0..20_000 {
            sp.insert(k);
        }
        assert_eq!(sp.nkeys(), 20_000);
        assert_eq!(sp.extract_sorted(), (0..20_000).collect::<Vec<_>>());
        assert_eq!(sp.sub_height, 1);
    }

    #[test]
    fn delete_removes_and_preserves_order() {
        let mut sp = Superpage::empty();
        for k in 0..5000 {
            sp.insert(k);
        }
        for k in (0..5000).step_by(2) {
            assert!(matches!(sp.delete(k), SpDeleteOutcome::Deleted | SpDeleteOutcome::Underflowed));
        }
        assert_eq!(sp.nkeys(), 2500);
        let remaining: Vec<i32> = (0..5000).filter(|k| k % 2 == 1).collect();
        assert_eq!(sp.extract_sorted(), remaining);
    }

    #[test]
    fn bulk_built_matches_incremental() {
        let keys: Vec<i32> = (0..10_000).collect();
        let sp = Superpage::build_from_sorted(&keys, ClStrategy::Default);
        assert_eq!(sp.nkeys(), 10_000);
        assert_eq!(sp.extract_sorted(), keys);
    }
}
