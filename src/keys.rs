//! Component A — predecessor search over a small sorted array.
//!
//! The teacher's `SlottedPage::find_insert_position`/`search` binary-search
//! a cell-pointer array of variable-length keys; the arrays here are fixed
//! and small enough (at most 15 entries, one cache line's worth of `i32`s)
//! that a real build would dispatch to a SIMD compare-and-find-lowest-set-bit
//! routine. This crate implements the same three primitives as a scalar
//! binary search over a slice — functionally identical to the vectorized
//! version, since the contract does not mandate vector instructions.

/// Smallest index `i` such that `keys[i] >= query`, or `keys.len()` if none.
pub fn lower_bound(keys: &[i32], query: i32) -> usize {
    keys.partition_point(|&k| k < query)
}

/// Largest index `i` such that `keys[i] <= query`, or `None` if `keys` is
/// empty or every key exceeds `query`. Ties go left: an exact match at index
/// `i` is its own predecessor.
pub fn predecessor(keys: &[i32], query: i32) -> Option<usize> {
    let bound = keys.partition_point(|&k| k <= query);
    if bound == 0 {
        None
    } else {
        Some(bound - 1)
    }
}

/// Smallest index `i` such that `keys[i] > query`, or `keys.len()` if none.
/// Used to route descent in a B+ internal node: child `i` covers
/// `[keys[i-1], keys[i])`.
pub fn child_index(keys: &[i32], query: i32) -> usize {
    keys.partition_point(|&k| k <= query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lower_bound_matches_spec_examples() {
        let keys = [2, 5, 9, 14];
        assert_eq!(lower_bound(&keys, 0), 0);
        assert_eq!(lower_bound(&keys, 2), 0);
        assert_eq!(lower_bound(&keys, 3), 1);
        assert_eq!(lower_bound(&keys, 14), 3);
        assert_eq!(lower_bound(&keys, 15), 4);
    }

    #[test]
    fn predecessor_ties_go_left_inclusive() {
        let keys = [2, 5, 9, 14];
        assert_eq!(predecessor(&keys, 1), None);
        assert_eq!(predecessor(&keys, 2), Some(0));
        assert_eq!(predecessor(&keys, 4), Some(0));
        assert_eq!(predecessor(&keys, 9), Some(2));
        assert_eq!(predecessor(&keys, 100), Some(3));
    }

    #[test]
    fn child_index_routes_half_open_ranges() {
        let seps = [10, 20, 30];
        // 4 children: (-inf,10) [10,20) [20,30) [30,inf)
        assert_eq!(child_index(&seps, 5), 0);
        assert_eq!(child_index(&seps, 10), 1);
        assert_eq!(child_index(&seps, 15), 1);
        assert_eq!(child_index(&seps, 20), 2);
        assert_eq!(child_index(&seps, 30), 3);
        assert_eq!(child_index(&seps, 31), 3);
    }

    #[test]
    fn empty_array_is_handled() {
        let keys: [i32; 0] = [];
        assert_eq!(lower_bound(&keys, 5), 0);
        assert_eq!(predecessor(&keys, 5), None);
        assert_eq!(child_index(&keys, 5), 0);
    }
}
