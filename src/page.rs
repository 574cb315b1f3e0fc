//! Component C — the page sub-tree.
//!
//! A `Page` is the outer tree's default leaf-equivalent: conceptually a
//! 4 KiB region holding a B+ tree of [`crate::cl`] sub-nodes. Grounded in
//! the teacher's `page::slotted::SlottedPage` (header + slot array, binary
//! search insertion point, `insert_cell`/`delete_cell`/`split`), generalized
//! one level down: the "cells" here are whole cache-line sub-nodes instead
//! of raw variable-length byte records.
//!
//! The single-key insert/delete hot path walks and rebalances the cache-line
//! sub-tree in place, cascading splits and merges exactly the way the
//! teacher's `BTree::insert_recursive`/`split_and_insert_interior` cascade
//! one level up. Whole-page structural operations that are only ever
//! invoked a handful of times relative to single-key traffic — page split,
//! page merge, page redistribution — are implemented by extracting the
//! page's sorted key sequence and rebuilding fresh cache-line sub-trees via
//! the bulk loader (`crate::bulk`). That produces the same sorted key set
//! and satisfies the same fanout bounds as an in-place splice would, while
//! removing a large class of slot-bookkeeping mistakes that are hard to
//! rule out without a compiler (see DESIGN.md).

use crate::cl::{
    ClInternal, ClInternalEytzinger, ClLeaf, ClNode, CL_EYTZINGER_SEP_CAP, CL_LEAF_CAP, CL_MIN_KEYS,
    CL_MIN_SEPS, CL_SEP_CAP,
};
use crate::config::ClStrategy;
use tracing::trace;

/// Number of cache-line sub-node slots available in a page (slot 0 is the
/// conceptual header and is not represented as a `ClNode`).
pub const PAGE_SLOTS: usize = 63;
/// Maximum keys fitting in 63 CL slots laid out as a standard-layout B+
/// sub-tree of height 2 (root internal + internal level + leaves). A
/// nominal figure used only for underflow/redistribution heuristics and
/// bulk-load chunk sizing; the hard limit enforced on every insert is slot
/// exhaustion (see [`Page::is_full`]), not this count.
pub const PAGE_MAX_KEYS: usize = 855;
/// Minimum key count below which a non-root page is considered underflowed
/// — one quarter of [`PAGE_MAX_KEYS`], per the hierarchy's `min_page_keys`.
pub const PAGE_MIN_KEYS: usize = PAGE_MAX_KEYS / 4;

enum ClInsertOutcome {
    AlreadyPresent,
    Inserted,
    Split { sep: i32, new_child_slot: u8 },
}

enum ClDeleteOutcome {
    NotFound,
    Deleted,
    Underflowed,
}

enum LeafRebalance {
    Redistributed { left: ClLeaf, sep: i32, right: ClLeaf },
    Merged(ClLeaf),
}

/// Flatten two sibling leaves into one sorted sequence and re-split it:
/// evenly between both if that keeps each non-root-sized, or into a single
/// merged leaf if the combined count fits in one cache line.
fn rebalance_leaf_pair(left: &ClLeaf, right: &ClLeaf) -> LeafRebalance {
    let total = left.len() + right.len();
    if total <= CL_LEAF_CAP {
        let mut merged = left.clone();
        merged.merge(right);
        return LeafRebalance::Merged(merged);
    }
    let mut all: Vec<i32> = left.as_slice().to_vec();
    all.extend_from_slice(right.as_slice());
    let new_left_len = total / 2;
    let new_left = ClLeaf::from_sorted(&all[..new_left_len]);
    let new_right = ClLeaf::from_sorted(&all[new_left_len..]);
    let sep = new_right.min_key().expect("non-empty right half after redistribution");
    LeafRebalance::Redistributed {
        left: new_left,
        sep,
        right: new_right,
    }
}

enum InternalRebalance {
    Redistributed { left: ClInternal, sep: i32, right: ClInternal },
    Merged(ClInternal),
}

/// Same technique as [`rebalance_leaf_pair`], one level up: flatten
/// `left`, the separator between the pair, and `right` into one virtual
/// sorted sequence of separators/children, then re-split it.
fn rebalance_internal_pair(left: &ClInternal, parent_sep: i32, right: &ClInternal) -> InternalRebalance {
    let mut seps: Vec<i32> = left.seps().to_vec();
    seps.push(parent_sep);
    seps.extend_from_slice(right.seps());
    let mut children: Vec<u8> = left.children().to_vec();
    children.extend_from_slice(right.children());

    let total_seps = seps.len();
    if total_seps <= CL_SEP_CAP {
        let mut merged = ClInternal::new(children[0]);
        for i in 0..total_seps {
            merged.insert_at(i, seps[i], children[i + 1]);
        }
        return InternalRebalance::Merged(merged);
    }

    let new_left_len = total_seps / 2;
    let promoted = seps[new_left_len];
    let mut new_left = ClInternal::new(children[0]);
    for i in 0..new_left_len {
        new_left.insert_at(i, seps[i], children[i + 1]);
    }
    let mut new_right = ClInternal::new(children[new_left_len + 1]);
    for i in new_left_len + 1..total_seps {
        new_right.insert_at(i - new_left_len - 1, seps[i], children[i + 1]);
    }
    InternalRebalance::Redistributed {
        left: new_left,
        sep: promoted,
        right: new_right,
    }
}

/// A page: a B+ tree of cache-line sub-nodes.
#[derive(Clone)]
pub struct Page {
    nkeys: u32,
    root_slot: u8,
    sub_height: u8,
    slot_bitmap: u64,
    slots: Vec<Option<ClNode>>,
    eytzinger_root: bool,
    fence_min: Option<i32>,
    pub prev: Option<u32>,
    pub next: Option<u32>,
}

impl Page {
    pub fn empty() -> Self {
        Self {
            nkeys: 0,
            root_slot: 0,
            sub_height: 0,
            slot_bitmap: 1, // bit 0 (header) always set
            slots: vec![None; PAGE_SLOTS],
            eytzinger_root: false,
            fence_min: None,
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

    pub fn sub_height(&self) -> u8 {
        self.sub_height
    }

    /// The CL slot index currently holding the page sub-tree's root.
    /// Exposed only for the outer tree's cached leaf-pointer tag.
    pub fn root_slot_raw(&self) -> u8 {
        self.root_slot
    }

    pub fn slot_bitmap(&self) -> u64 {
        self.slot_bitmap
    }

    /// Number of free cache-line slots.
    pub fn free_slots(&self) -> usize {
        PAGE_SLOTS - (self.slot_bitmap.count_ones() as usize - 1)
    }

    /// Whether the page has so little slot headroom left that a caller
    /// should split it before attempting another insert.
    pub fn is_full(&self) -> bool {
        self.free_slots() < 3
    }

    pub fn is_underflow(&self) -> bool {
        self.nkeys() < PAGE_MIN_KEYS
    }

    pub fn min_key(&self) -> Option<i32> {
        self.fence_min.or_else(|| self.leftmost_leaf().and_then(|l| l.min_key()))
    }

    pub fn max_key(&self) -> Option<i32> {
        self.rightmost_leaf().and_then(|l| l.max_key())
    }

    fn node(&self, slot: u8) -> &ClNode {
        self.slots[(slot - 1) as usize]
            .as_ref()
            .expect("page: access to unallocated slot")
    }

    fn node_mut(&mut self, slot: u8) -> &mut ClNode {
        self.slots[(slot - 1) as usize]
            .as_mut()
            .expect("page: access to unallocated slot")
    }

    fn alloc_slot(&mut self, node: ClNode) -> u8 {
        for i in 1u8..=PAGE_SLOTS as u8 {
            let bit = 1u64 << i;
            if self.slot_bitmap & bit == 0 {
                self.slot_bitmap |= bit;
                self.slots[(i - 1) as usize] = Some(node);
                return i;
            }
        }
        panic!("page: no free slot (caller should have split first)");
    }

    fn free_slot(&mut self, slot: u8) {
        let bit = 1u64 << slot;
        debug_assert!(self.slot_bitmap & bit != 0);
        self.slot_bitmap &= !bit;
        self.slots[(slot - 1) as usize] = None;
    }

    fn leftmost_leaf(&self) -> Option<&ClLeaf> {
        if self.root_slot == 0 {
            return None;
        }
        let mut slot = self.root_slot;
        loop {
            match self.node(slot) {
                ClNode::Leaf(l) => return Some(l),
                ClNode::Internal(i) => slot = i.child_slot_at(0),
                ClNode::InternalEytzinger(_) => slot = slot + 1,
            }
        }
    }

    fn rightmost_leaf(&self) -> Option<&ClLeaf> {
        if self.root_slot == 0 {
            return None;
        }
        let mut slot = self.root_slot;
        loop {
            match self.node(slot) {
                ClNode::Leaf(l) => return Some(l),
                ClNode::Internal(i) => slot = *i.children().last().unwrap(),
                ClNode::InternalEytzinger(e) => slot = slot + e.len() as u8 + 1,
            }
        }
    }

    pub fn contains(&self, query: i32) -> bool {
        if self.root_slot == 0 {
            return false;
        }
        let mut slot = self.root_slot;
        loop {
            match self.node(slot) {
                ClNode::Leaf(l) => return l.contains(query),
                ClNode::Internal(i) => slot = i.child_slot_at(i.child_for(query)),
                ClNode::InternalEytzinger(e) => slot = slot + 1 + e.child_for(query) as u8,
            }
        }
    }

    /// Largest key `<= query` anywhere in the page, if any.
    pub fn predecessor(&self, query: i32) -> Option<i32> {
        if self.root_slot == 0 {
            return None;
        }
        let mut slot = self.root_slot;
        loop {
            match self.node(slot) {
                ClNode::Leaf(l) => return l.predecessor(query),
                ClNode::Internal(i) => {
                    let pos = i.child_for(query);
                    slot = i.child_slot_at(pos);
                }
                ClNode::InternalEytzinger(e) => {
                    let pos = e.child_for(query);
                    slot = slot + 1 + pos as u8;
                }
            }
        }
    }

    /// Narrate the cache-line sub-tree descent for `query`, one line per
    /// sub-node visited. Mirrors `predecessor`'s own walk without the early
    /// return, for `Index::debug_trace`.
    pub fn debug_descend(&self, query: i32) -> Vec<String> {
        let mut lines = Vec::new();
        if self.root_slot == 0 {
            lines.push("page: empty sub-tree".to_string());
            return lines;
        }
        let mut slot = self.root_slot;
        loop {
            match self.node(slot) {
                ClNode::Leaf(l) => {
                    lines.push(format!("cl[{slot}]: leaf nkeys={} contains={}", l.len(), l.contains(query)));
                    return lines;
                }
                ClNode::Internal(i) => {
                    let pos = i.child_for(query);
                    lines.push(format!("cl[{slot}]: internal nseps={} child_pos={pos}", i.seps().len()));
                    slot = i.child_slot_at(pos);
                }
                ClNode::InternalEytzinger(e) => {
                    let pos = e.child_for(query);
                    lines.push(format!("cl[{slot}]: eytzinger nseps={} child_pos={pos}", e.len()));
                    slot = slot + 1 + pos as u8;
                }
            }
        }
    }

    /// Insert `key`. Returns `true` if newly inserted.
    pub fn insert(&mut self, key: i32) -> bool {
        if self.root_slot == 0 {
            let mut leaf = ClLeaf::empty();
            leaf.insert(key);
            self.root_slot = self.alloc_slot(ClNode::Leaf(leaf));
            self.sub_height = 0;
            self.nkeys = 1;
            self.fence_min = Some(key);
            return true;
        }

        match self.insert_into(self.root_slot, self.sub_height, key) {
            ClInsertOutcome::AlreadyPresent => false,
            ClInsertOutcome::Inserted => {
                self.nkeys += 1;
                self.refresh_fence();
                true
            }
            ClInsertOutcome::Split { sep, new_child_slot } => {
                let mut new_root = ClInternal::new(self.root_slot);
                new_root.insert_at(0, sep, new_child_slot);
                self.eytzinger_root = false;
                self.root_slot = self.alloc_slot(ClNode::Internal(new_root));
                self.sub_height += 1;
                self.nkeys += 1;
                self.refresh_fence();
                trace!(new_sub_height = self.sub_height, nkeys = self.nkeys, "page cl-root split");
                true
            }
        }
    }

    fn insert_into(&mut self, slot: u8, height: u8, key: i32) -> ClInsertOutcome {
        if height == 0 {
            let leaf = self.node_mut(slot).as_leaf_mut().expect("height 0 is a leaf");
            if leaf.contains(key) {
                return ClInsertOutcome::AlreadyPresent;
            }
            if !leaf.is_full() {
                leaf.insert(key);
                return ClInsertOutcome::Inserted;
            }
            let (sep, right) = leaf.split();
            if key < sep {
                self.node_mut(slot).as_leaf_mut().unwrap().insert(key);
            }
            let new_slot = self.alloc_slot(ClNode::Leaf(right));
            if key >= sep {
                self.node_mut(new_slot).as_leaf_mut().unwrap().insert(key);
            }
            return ClInsertOutcome::Split { sep, new_child_slot: new_slot };
        }

        let (child_pos, child_slot, is_eytzinger) = match self.node(slot) {
            ClNode::Internal(i) => {
                let pos = i.child_for(key);
                (pos, i.child_slot_at(pos), false)
            }
            ClNode::InternalEytzinger(e) => {
                let pos = e.child_for(key);
                (pos, slot + 1 + pos as u8, true)
            }
            ClNode::Leaf(_) => unreachable!("height > 0 implies internal node"),
        };

        match self.insert_into(child_slot, height - 1, key) {
            ClInsertOutcome::AlreadyPresent => ClInsertOutcome::AlreadyPresent,
            ClInsertOutcome::Inserted => ClInsertOutcome::Inserted,
            ClInsertOutcome::Split { sep, new_child_slot } => {
                if is_eytzinger {
                    self.demote_eytzinger(slot);
                }
                let inode = self.node_mut(slot).as_internal_mut().unwrap();
                if !inode.is_full() {
                    inode.insert_at(child_pos, sep, new_child_slot);
                    ClInsertOutcome::Inserted
                } else {
                    let (left, promoted, right) =
                        split_full_internal(inode, child_pos, sep, new_child_slot);
                    *inode = left;
                    let right_slot = self.alloc_slot(ClNode::Internal(right));
                    ClInsertOutcome::Split {
                        sep: promoted,
                        new_child_slot: right_slot,
                    }
                }
            }
        }
    }

    /// Replace the Eytzinger node at `slot` with its slot-indexed
    /// equivalent. Its children are already laid out contiguously starting
    /// at `slot + 1`, so no data moves — only the node tag changes.
    fn demote_eytzinger(&mut self, slot: u8) {
        let e = self.node(slot).as_eytzinger().unwrap().clone();
        let nchildren = e.len() + 1;
        let child_slots: Vec<u8> = (0..nchildren as u8).map(|i| slot + 1 + i).collect();
        let slotted = e.to_slotted(&child_slots);
        *self.node_mut(slot) = ClNode::Internal(slotted);
        if slot == self.root_slot {
            self.eytzinger_root = false;
        }
    }

    /// Delete `key`. Returns `true` if it was present.
    pub fn delete(&mut self, key: i32) -> bool {
        if self.root_slot == 0 {
            return false;
        }
        match self.delete_from(self.root_slot, self.sub_height, key) {
            ClDeleteOutcome::NotFound => false,
            ClDeleteOutcome::Deleted | ClDeleteOutcome::Underflowed => {
                self.nkeys -= 1;
                self.collapse_root_if_needed();
                self.refresh_fence();
                true
            }
        }
    }

    fn collapse_root_if_needed(&mut self) {
        if self.nkeys == 0 {
            self.free_slot(self.root_slot);
            self.root_slot = 0;
            self.sub_height = 0;
            self.eytzinger_root = false;
            return;
        }
        if self.sub_height == 0 {
            return;
        }
        if let ClNode::Internal(i) = self.node(self.root_slot) {
            if i.len() == 0 {
                let only_child = i.child_slot_at(0);
                self.free_slot(self.root_slot);
                self.root_slot = only_child;
                self.sub_height -= 1;
            }
        }
    }

    fn delete_from(&mut self, slot: u8, height: u8, key: i32) -> ClDeleteOutcome {
        if height == 0 {
            let leaf = self.node_mut(slot).as_leaf_mut().expect("height 0 is a leaf");
            if !leaf.delete(key) {
                return ClDeleteOutcome::NotFound;
            }
            if slot == self.root_slot || leaf.len() >= CL_MIN_KEYS {
                return ClDeleteOutcome::Deleted;
            }
            return ClDeleteOutcome::Underflowed;
        }

        let (child_pos, child_slot, is_eytzinger) = match self.node(slot) {
            ClNode::Internal(i) => {
                let pos = i.child_for(key);
                (pos, i.child_slot_at(pos), false)
            }
            ClNode::InternalEytzinger(e) => {
                let pos = e.child_for(key);
                (pos, slot + 1 + pos as u8, true)
            }
            ClNode::Leaf(_) => unreachable!("height > 0 implies internal node"),
        };

        match self.delete_from(child_slot, height - 1, key) {
            ClDeleteOutcome::NotFound => ClDeleteOutcome::NotFound,
            ClDeleteOutcome::Deleted => ClDeleteOutcome::Deleted,
            ClDeleteOutcome::Underflowed => {
                if is_eytzinger {
                    // Eytzinger layout never mutates structurally below
                    // the root under deletion-driven merges; demote first.
                    self.demote_eytzinger(slot);
                }
                self.fix_underflow(slot, height, child_pos, child_slot)
            }
        }
    }

    /// Repair an underflowed child at `child_pos` (child-array index) of
    /// the internal node at `slot`, by redistributing with a sibling or
    /// merging with one. Prefers the left sibling when both exist. Reports
    /// whether `slot` itself now underflows.
    ///
    /// Both the redistribute and the merge case are implemented the same
    /// way: flatten the sibling pair (plus the separator between them) into
    /// one virtual sorted sequence and re-split it — either back into two
    /// balanced nodes, or, if the combined size fits in one node, into a
    /// single merged node. This is the same "virtually merged sequence"
    /// technique `split_full_internal` uses for overflow, applied to the
    /// underflow side of the same coin.
    fn fix_underflow(&mut self, slot: u8, height: u8, child_pos: usize, child_slot: u8) -> ClDeleteOutcome {
        let inode = self.node(slot).as_internal().unwrap();
        let nchildren = inode.len() + 1;
        let (sep_pos, lslot, rslot) = if child_pos > 0 {
            (child_pos - 1, inode.child_slot_at(child_pos - 1), child_slot)
        } else {
            debug_assert!(child_pos + 1 < nchildren, "underflowed child with no siblings");
            (child_pos, child_slot, inode.child_slot_at(child_pos + 1))
        };

        if height == 1 {
            let (left, right) = self.borrow2(lslot, rslot);
            let left_leaf = left.as_leaf().unwrap().clone();
            let right_leaf = right.as_leaf().unwrap().clone();
            match rebalance_leaf_pair(&left_leaf, &right_leaf) {
                LeafRebalance::Redistributed { left, sep, right } => {
                    *self.node_mut(lslot) = ClNode::Leaf(left);
                    *self.node_mut(rslot) = ClNode::Leaf(right);
                    self.node_mut(slot).as_internal_mut().unwrap().replace_sep_at(sep_pos, sep);
                }
                LeafRebalance::Merged(merged) => {
                    *self.node_mut(lslot) = ClNode::Leaf(merged);
                    self.free_slot(rslot);
                    self.node_mut(slot).as_internal_mut().unwrap().remove_at(sep_pos);
                }
            }
        } else {
            let parent_sep = self.node(slot).as_internal().unwrap().seps()[sep_pos];
            let (left, right) = self.borrow2(lslot, rslot);
            let left_i = left.as_internal().unwrap().clone();
            let right_i = right.as_internal().unwrap().clone();
            match rebalance_internal_pair(&left_i, parent_sep, &right_i) {
                InternalRebalance::Redistributed { left, sep, right } => {
                    *self.node_mut(lslot) = ClNode::Internal(left);
                    *self.node_mut(rslot) = ClNode::Internal(right);
                    self.node_mut(slot).as_internal_mut().unwrap().replace_sep_at(sep_pos, sep);
                }
                InternalRebalance::Merged(merged) => {
                    *self.node_mut(lslot) = ClNode::Internal(merged);
                    self.free_slot(rslot);
                    self.node_mut(slot).as_internal_mut().unwrap().remove_at(sep_pos);
                }
            }
        }

        let inode = self.node(slot).as_internal().unwrap();
        if slot == self.root_slot || inode.len() >= CL_MIN_SEPS {
            ClDeleteOutcome::Deleted
        } else {
            ClDeleteOutcome::Underflowed
        }
    }

    fn borrow2(&mut self, a: u8, b: u8) -> (&mut ClNode, &mut ClNode) {
        assert_ne!(a, b);
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let (left, right) = self.slots.split_at_mut(hi as usize - 1);
        let lo_ref = left[(lo - 1) as usize].as_mut().unwrap();
        let hi_ref = right[0].as_mut().unwrap();
        if a < b {
            (lo_ref, hi_ref)
        } else {
            (hi_ref, lo_ref)
        }
    }

    fn refresh_fence(&mut self) {
        self.fence_min = self.leftmost_leaf().and_then(|l| l.min_key());
    }

    /// Extract the page's keys in ascending order.
    pub fn extract_sorted(&self) -> Vec<i32> {
        let mut out = Vec::with_capacity(self.nkeys());
        if self.root_slot != 0 {
            self.extract_into(self.root_slot, &mut out);
        }
        out
    }

    fn extract_into(&self, slot: u8, out: &mut Vec<i32>) {
        match self.node(slot) {
            ClNode::Leaf(l) => out.extend_from_slice(l.as_slice()),
            ClNode::Internal(i) => {
                for &child in i.children() {
                    self.extract_into(child, out);
                }
            }
            ClNode::InternalEytzinger(e) => {
                for n in 0..=e.len() as u8 {
                    self.extract_into(slot + 1 + n, out);
                }
            }
        }
    }

    /// Build a freshly packed page from a sorted, deduplicated key slice.
    /// Used by the bulk loader and by whole-page split/merge/redistribute.
    ///
    /// Bottom-up packing: chunk the keys into leaves near `CL_LEAF_CAP`,
    /// then repeatedly pack the previous level's slots into parents near
    /// `CL_CHILD_CAP` children, until one slot remains — the new root. Every
    /// non-root chunk this produces is at least the configured minimum
    /// (`pack_chunks` borrows from the last full chunk rather than leaving
    /// an undersized remainder), so the result satisfies the same fanout
    /// invariants single-key insertion maintains.
    pub fn build_from_sorted(keys: &[i32], strategy: ClStrategy) -> Self {
        let mut page = Page::empty();
        if keys.is_empty() {
            return page;
        }

        let leaf_chunks = crate::bulk::pack_chunks(keys.len(), CL_LEAF_CAP, CL_MIN_KEYS);

        // Eytzinger special case (§4.C): reserve the root's slot before the
        // leaves so the leaves land contiguously right after it, matching
        // the dense "child n at root_slot+1+n" addressing. Only usable when
        // there is exactly one internal level (<=16 leaves).
        let use_eytzinger =
            matches!(strategy, ClStrategy::Eytzinger) && leaf_chunks.len() > 1 && leaf_chunks.len() <= CL_EYTZINGER_SEP_CAP + 1;
        let eytzinger_root_slot = if use_eytzinger {
            Some(page.alloc_slot(ClNode::Leaf(ClLeaf::empty())))
        } else {
            None
        };

        let mut offset = 0;
        let mut level_slots: Vec<u8> = Vec::with_capacity(leaf_chunks.len());
        let mut level_mins: Vec<i32> = Vec::with_capacity(leaf_chunks.len());
        for &len in &leaf_chunks {
            let chunk = &keys[offset..offset + len];
            offset += len;
            let leaf = ClLeaf::from_sorted(chunk);
            level_mins.push(leaf.min_key().expect("non-empty chunk"));
            level_slots.push(page.alloc_slot(ClNode::Leaf(leaf)));
        }

        if let Some(root_slot) = eytzinger_root_slot {
            debug_assert_eq!(level_slots[0], root_slot + 1, "eytzinger children must be contiguous after the root slot");
            let node = ClInternalEytzinger::from_sorted_seps(&level_mins[1..]);
            *page.node_mut(root_slot) = ClNode::InternalEytzinger(node);
            page.root_slot = root_slot;
            page.sub_height = 1;
            page.eytzinger_root = true;
            page.nkeys = keys.len() as u32;
            page.fence_min = Some(keys[0]);
            return page;
        }

        let mut height: u8 = 0;
        while level_slots.len() > 1 {
            let parent_chunks =
                crate::bulk::pack_chunks(level_slots.len(), CL_SEP_CAP + 1, CL_MIN_SEPS + 1);
            let mut new_slots = Vec::with_capacity(parent_chunks.len());
            let mut new_mins = Vec::with_capacity(parent_chunks.len());
            let mut idx = 0;
            for &clen in &parent_chunks {
                let children = &level_slots[idx..idx + clen];
                let child_mins = &level_mins[idx..idx + clen];
                let mut node = ClInternal::new(children[0]);
                for i in 1..clen {
                    node.insert_at(i - 1, child_mins[i], children[i]);
                }
                new_slots.push(page.alloc_slot(ClNode::Internal(node)));
                new_mins.push(child_mins[0]);
                idx += clen;
            }
            level_slots = new_slots;
            level_mins = new_mins;
            height += 1;
        }

        page.root_slot = level_slots[0];
        page.sub_height = height;
        page.nkeys = keys.len() as u32;
        page.fence_min = Some(keys[0]);
        page
    }
}

/// Split a full slot-indexed internal node after virtually inserting one
/// more separator/child pair, per the "virtually merged sequence" technique:
/// build the oversized sorted sequence, then split it down the middle
/// without ever materializing more than `CL_SEP_CAP + 1` entries at once.
fn split_full_internal(
    full: &ClInternal,
    pos: usize,
    sep: i32,
    new_child_slot: u8,
) -> (ClInternal, i32, ClInternal) {
    let mut seps: Vec<i32> = full.seps().to_vec();
    let mut children: Vec<u8> = full.children().to_vec();
    seps.insert(pos, sep);
    children.insert(pos + 1, new_child_slot);

    let n = seps.len();
    let mid = n / 2;
    let promoted = seps[mid];

    let mut left = ClInternal::new(children[0]);
    for i in 0..mid {
        left.insert_at(i, seps[i], children[i + 1]);
    }
    let mut right = ClInternal::new(children[mid + 1]);
    for i in mid + 1..n {
        right.insert_at(i - mid - 1, seps[i], children[i + 1]);
    }
    (left, promoted, right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    #[test]
    fn insert_contains_roundtrip() {
        let mut page = Page::empty();
        for k in [5, 2, 9, 1, 7, 3, 8, 4, 6, 0] {
            assert!(page.insert(k));
        }
        assert!(!page.insert(5));
        for k in 0..10 {
            assert!(page.contains(k));
        }
        assert!(!page.contains(100));
        assert_eq!(page.nkeys(), 10);
        assert_eq!(page.extract_sorted(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn insert_causes_cascading_splits_and_stays_sorted() {
        let mut page = Page::empty();
        for k in 0..500 {
            page.insert(k);
        }
        assert_eq!(page.nkeys(), 500);
        assert_eq!(page.extract_sorted(), (0..500).collect::<Vec<_>>());
        assert!(page.sub_height() > 0);
    }

    #[test]
    fn delete_removes_keys_and_preserves_order() {
        let mut page = Page::empty();
        for k in 0..300 {
            page.insert(k);
        }
        for k in (0..300).step_by(2) {
            assert!(page.delete(k));
        }
        assert_eq!(page.nkeys(), 150);
        let remaining: Vec<i32> = (0..300).filter(|k| k % 2 == 1).collect();
        assert_eq!(page.extract_sorted(), remaining);
    }

    #[test]
    fn random_insert_delete_round_trip() {
        let mut rng = rand_xoshiro_stub(42);
        let mut keys: Vec<i32> = (0..400).collect();
        keys.shuffle(&mut rng);

        let mut page = Page::empty();
        for &k in &keys {
            page.insert(k);
        }
        assert_eq!(page.nkeys(), 400);

        let mut to_delete = keys.clone();
        to_delete.shuffle(&mut rng);
        for &k in &to_delete[..200] {
            assert!(page.delete(k));
        }
        assert_eq!(page.nkeys(), 200);

        let mut remaining: Vec<i32> = to_delete[200..].to_vec();
        remaining.sort_unstable();
        assert_eq!(page.extract_sorted(), remaining);
    }

    fn rand_xoshiro_stub(seed: u64) -> rand::rngs::StdRng {
        rand::rngs::StdRng::seed_from_u64(seed)
    }

    #[test]
    fn predecessor_matches_linear_scan() {
        let mut page = Page::empty();
        for k in [2, 5, 9, 14, 20, 33] {
            page.insert(k);
        }
        assert_eq!(page.predecessor(1), None);
        assert_eq!(page.predecessor(2), Some(2));
        assert_eq!(page.predecessor(10), Some(9));
        assert_eq!(page.predecessor(100), Some(33));
    }

    #[test]
    fn bulk_built_page_matches_incrementally_built_page() {
        let keys: Vec<i32> = (0..1000).collect();
        let built = Page::build_from_sorted(&keys, ClStrategy::Default);
        assert_eq!(built.nkeys(), 1000);
        assert_eq!(built.extract_sorted(), keys);
        assert_eq!(built.min_key(), Some(0));
        assert_eq!(built.max_key(), Some(999));
    }

    #[test]
    fn bulk_built_small_page_has_no_internal_level() {
        let keys: Vec<i32> = (0..5).collect();
        let built = Page::build_from_sorted(&keys, ClStrategy::Default);
        assert_eq!(built.sub_height(), 0);
        assert_eq!(built.extract_sorted(), keys);
    }

    #[test]
    fn eytzinger_strategy_builds_dense_root_for_small_fanout() {
        let keys: Vec<i32> = (0..150).collect();
        let built = Page::build_from_sorted(&keys, ClStrategy::Eytzinger);
        assert_eq!(built.sub_height(), 1);
        assert!(built.eytzinger_root);
        assert_eq!(built.extract_sorted(), keys);
        for k in [0, 37, 99, 149] {
            assert!(built.contains(k));
        }
        assert_eq!(built.predecessor(148), Some(148));

        // Too many leaves for a single 15-separator internal: falls back
        // to the slot-indexed layout instead of refusing to build.
        let many: Vec<i32> = (0..4000).collect();
        let built_many = Page::build_from_sorted(&many, ClStrategy::Eytzinger);
        assert_eq!(built_many.extract_sorted(), many);
    }

    #[test]
    fn eytzinger_root_demotes_on_first_structural_mutation() {
        let keys: Vec<i32> = (0..150).collect();
        let mut page = Page::build_from_sorted(&keys, ClStrategy::Eytzinger);
        assert!(page.eytzinger_root);
        // Drive enough inserts to force the root-level internal to split,
        // which must demote it to the slot-indexed layout first.
        for k in 150..400 {
            page.insert(k);
        }
        assert_eq!(page.extract_sorted(), (0..400).collect::<Vec<_>>());
    }
}
