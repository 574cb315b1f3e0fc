//! End-to-end scenarios S1-S7, plus the round-trip laws, run against the
//! public `Index` handle rather than any internal component.

use matryoshka_index::{Hierarchy, Index};

#[test]
fn s1_predecessor_on_sparse_keys() {
    let keys: Vec<i32> = (0..1000).step_by(10).collect();
    let idx = Index::bulk_load(&keys).unwrap();
    assert_eq!(idx.size(), 100);
    assert_eq!(idx.search(0), Some(0));
    assert_eq!(idx.search(9), Some(0));
    assert_eq!(idx.search(10), Some(10));
    assert_eq!(idx.search(999), Some(990));
    assert_eq!(idx.search(-1), None);
}

#[test]
fn s2_descending_inserts_cross_leaf_boundary() {
    let mut idx = Index::create();
    for k in (0..1000).rev() {
        idx.insert(k);
    }
    assert_eq!(idx.size(), 1000);
    for i in 0..1000 {
        assert!(idx.contains(i));
    }
    let mut it = idx.iter_from(i32::MIN);
    let mut collected = Vec::new();
    while let Some(k) = it.iter_next() {
        collected.push(k);
    }
    assert_eq!(collected, (0..1000).collect::<Vec<_>>());
}

#[test]
fn s3_large_bulk_load() {
    let keys: Vec<i32> = (0..100_000).collect();
    let idx = Index::bulk_load(&keys).unwrap();
    assert_eq!(idx.size(), 100_000);
    for i in (0..100_000).step_by(97) {
        assert!(idx.contains(i));
    }
}

#[test]
fn s4_deplete_from_the_middle_out() {
    let mut idx = Index::bulk_load(&(0..5000).collect::<Vec<_>>()).unwrap();
    for k in (2500..5000).rev() {
        assert!(idx.delete(k));
    }
    for k in (0..2500).rev() {
        assert!(idx.delete(k));
    }
    assert_eq!(idx.size(), 0);
    let mut it = idx.iter_from(i32::MIN);
    assert_eq!(it.iter_next(), None);
}

#[test]
fn s5_heavy_deletion_with_tree_collapse() {
    let mut idx = Index::create();
    for k in 0..999 {
        idx.insert(k);
    }
    for k in 0..999 {
        if k % 10 != 0 {
            assert!(idx.delete(k));
        }
    }
    assert_eq!(idx.size(), 100);
    for k in 0..999 {
        assert_eq!(idx.contains(k), k % 10 == 0);
    }
}

#[test]
fn s6_iterator_across_leaves() {
    let idx = Index::bulk_load(&(0..2000).collect::<Vec<_>>()).unwrap();
    let mut it = idx.iter_from(i32::MIN);
    let mut collected = Vec::new();
    while let Some(k) = it.iter_next() {
        collected.push(k);
    }
    assert_eq!(collected.len(), 2000);
    assert!(collected.windows(2).all(|w| w[0] < w[1]));

    let sparse: Vec<i32> = (0..1000).step_by(10).collect();
    let idx2 = Index::bulk_load(&sparse).unwrap();
    let mut it2 = idx2.iter_from(55);
    assert_eq!(it2.iter_next(), Some(60));
}

#[test]
fn s7_superpage_configuration() {
    let mut idx = Index::create_with(Hierarchy::default().with_superpages(true));
    for k in 0..5000 {
        idx.insert(k);
    }
    for k in 0..5000 {
        if k % 2 != 0 {
            idx.delete(k);
        }
    }
    assert_eq!(idx.size(), 2500);
    for k in 0..5000 {
        assert_eq!(idx.contains(k), k % 2 == 0);
    }
}

#[test]
fn insert_then_delete_returns_to_pre_insert_state() {
    let mut idx = Index::bulk_load(&[1, 2, 3, 5, 8]).unwrap();
    let before: Vec<i32> = {
        let mut it = idx.iter_from(i32::MIN);
        let mut v = Vec::new();
        while let Some(k) = it.iter_next() {
            v.push(k);
        }
        v
    };
    assert!(idx.insert(4));
    assert!(idx.delete(4));
    let after: Vec<i32> = {
        let mut it = idx.iter_from(i32::MIN);
        let mut v = Vec::new();
        while let Some(k) = it.iter_next() {
            v.push(k);
        }
        v
    };
    assert_eq!(before, after);
}

#[test]
fn double_insert_law() {
    let mut idx = Index::create();
    assert!(idx.insert(7));
    assert!(!idx.insert(7));
    assert_eq!(idx.size(), 1);
}

#[test]
fn double_delete_law() {
    let mut idx = Index::create();
    idx.insert(7);
    assert!(idx.delete(7));
    assert!(!idx.delete(7));
}

#[test]
fn bulk_load_law_matches_input_order() {
    let sorted: Vec<i32> = (-500..500).collect();
    let idx = Index::bulk_load(&sorted).unwrap();
    let mut it = idx.iter_from(i32::MIN);
    let mut collected = Vec::new();
    while let Some(k) = it.iter_next() {
        collected.push(k);
    }
    assert_eq!(collected, sorted);
}
