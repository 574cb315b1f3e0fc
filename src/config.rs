//! Tree-shape configuration.
//!
//! `Hierarchy` is the analogue of the teacher's `BTreeConfig`: a small,
//! serializable value describing the fanout and layout choices in force for
//! a particular index instance. Unlike the teacher's config, none of these
//! numbers describe an on-disk format — they describe the in-memory
//! capacity of each nesting level.

use serde::{Deserialize, Serialize};

/// How a cache-line internal sub-node addresses its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClStrategy {
    /// Slot-indexed children: up to 12 separators, 13 explicit child slots.
    Default,
    /// Dense BFS (Eytzinger) addressing: up to 15 separators, no explicit
    /// child array. Only usable while the page sub-tree has height <= 1.
    Eytzinger,
    /// Reserved for a fence-key fast path. Currently behaves identically to
    /// `Default` — see DESIGN.md's "CL strategy" open-question entry.
    FenceKeys,
}

impl Default for ClStrategy {
    fn default() -> Self {
        ClStrategy::Default
    }
}

/// Tree-shape configuration for an [`crate::Index`].
///
/// Mirrors the teacher's `BTreeConfig::new`/`high_capacity` builder pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hierarchy {
    /// Strategy used by cache-line internal sub-nodes.
    pub cl_strategy: ClStrategy,
    /// Whether leaf-equivalents of the outer tree are superpages (each
    /// containing a page sub-tree) rather than bare pages. Off by default —
    /// most workloads fit comfortably in a page-leaved outer tree.
    pub use_superpages: bool,
}

impl Default for Hierarchy {
    fn default() -> Self {
        Self {
            cl_strategy: ClStrategy::Default,
            use_superpages: false,
        }
    }
}

impl Hierarchy {
    /// The default hierarchy: page-leaved outer tree, slot-indexed CL nodes.
    pub fn new() -> Self {
        Self::default()
    }

    /// A hierarchy tuned for very large key sets: superpage leaves and
    /// Eytzinger-addressed cache lines wherever the sub-tree height allows.
    pub fn high_capacity() -> Self {
        Self {
            cl_strategy: ClStrategy::Eytzinger,
            use_superpages: true,
        }
    }

    pub fn with_cl_strategy(mut self, strategy: ClStrategy) -> Self {
        self.cl_strategy = strategy;
        self
    }

    pub fn with_superpages(mut self, enabled: bool) -> Self {
        self.use_superpages = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_hierarchy_uses_page_leaves() {
        let h = Hierarchy::default();
        assert!(!h.use_superpages);
        assert_eq!(h.cl_strategy, ClStrategy::Default);
    }

    #[test]
    fn high_capacity_uses_superpages_and_eytzinger() {
        let h = Hierarchy::high_capacity();
        assert!(h.use_superpages);
        assert_eq!(h.cl_strategy, ClStrategy::Eytzinger);
    }

    #[test]
    fn builder_methods_compose() {
        let h = Hierarchy::new().with_superpages(true).with_cl_strategy(ClStrategy::Eytzinger);
        assert!(h.use_superpages);
        assert_eq!(h.cl_strategy, ClStrategy::Eytzinger);
    }
}
