use super::{list, Tree, TreeSet};

use crate::node::{direction, symbol, Node, NodeRef};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

fn validate_tree<K: AsRef<[u8]>, V>(t: &Tree<K, V>) {
    fn rec<K: AsRef<[u8]>, V>(n: &NodeRef<K, V>, path: &mut Vec<(usize, u16, usize)>) -> usize {
        match &**n {
            Node::External(e) => {
                let key = e.key.as_ref();
                for &(byte, other_bits, dir) in path.iter() {
                    assert_eq!(
                        direction(other_bits, symbol(key, byte)),
                        dir,
                        "leaf on the wrong side of its ancestor at byte {byte}"
                    );
                }
                1
            }
            Node::Internal(i) => {
                assert_eq!(
                    (0x1FF ^ i.other_bits).count_ones(),
                    1,
                    "other_bits must clear exactly one bit: {:#x}",
                    i.other_bits
                );
                if let Some(&(byte, other_bits, _)) = path.last() {
                    assert!(
                        byte < i.byte || (byte == i.byte && other_bits < i.other_bits),
                        "critical bits must strictly increase along a path"
                    );
                }
                let mut size = 0;
                for dir in 0..2 {
                    path.push((i.byte, i.other_bits, dir));
                    size += rec(&i.child[dir], path);
                    path.pop();
                }
                assert_eq!(i.size, size, "stored size must match leaf count");
                size
            }
        }
    }

    let leaf_count = t.root.as_ref().map_or(0, |root| rec(root, &mut Vec::new()));
    assert_eq!(leaf_count, t.len(), "reachable leaf count must match Tree::len");
}

#[derive(Clone, Debug)]
enum Op {
    Insert(Vec<u8>, u64),
    Remove(Vec<u8>),
    Get(Vec<u8>),
    Snapshot,
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    // Mostly a tiny alphabet so keys collide and share prefixes, NULs
    // included.
    prop_oneof![
        4 => prop::collection::vec(prop::sample::select(vec![0u8, 1, b'a', b'b', 0xFF]), 0..=8),
        1 => prop::collection::vec(any::<u8>(), 0..=32),
    ]
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let key = key_strategy();
    let op = prop_oneof![
        50 => (key.clone(), any::<u64>()).prop_map(|(k, v)| Op::Insert(k, v)),
        25 => key.clone().prop_map(Op::Remove),
        22 => key.clone().prop_map(Op::Get),
        3 => Just(Op::Snapshot),
    ];
    prop::collection::vec(op, 0..=1000)
}

fn list_element_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{0,6}",
        "[ -~]{0,12}",
        "[{}\\\\\" \t\n#$;a]{0,8}",
    ]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence_map(ops in ops_strategy()) {
        let mut t: Tree<Vec<u8>, u64> = Tree::new();
        let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();
        let mut snapshots = Vec::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    let added_t = t.insert(key.clone(), value);
                    let added_m = m.insert(key, value).is_none();
                    prop_assert_eq!(added_t, added_m);
                }
                Op::Remove(key) => {
                    let removed_t = t.remove(&key);
                    let removed_m = m.remove(key.as_slice()).is_some();
                    prop_assert_eq!(removed_t, removed_m);
                }
                Op::Get(key) => {
                    prop_assert_eq!(t.lookup(&key), m.get(key.as_slice()));
                    prop_assert_eq!(t.get(&key).is_err(), !m.contains_key(key.as_slice()));
                }
                Op::Snapshot => snapshots.push((t.clone(), m.clone())),
            }

            prop_assert_eq!(t.len(), m.len());
        }

        validate_tree(&t);
        prop_assert!(t.iter().eq(m.iter()));
        for (tree, model) in &snapshots {
            validate_tree(tree);
            prop_assert!(tree.iter().eq(model.iter()));
        }
    }

    #[test]
    fn prop_persistent_versions(ops in ops_strategy()) {
        let mut versions = vec![(Tree::<Vec<u8>, u64>::new(), BTreeMap::new())];

        for op in ops {
            let (t, m) = versions.last().cloned().unwrap_or_default();
            match op {
                Op::Insert(key, value) => {
                    let mut m = m;
                    m.insert(key.clone(), value);
                    versions.push((t.with(key, value), m));
                }
                Op::Remove(key) => {
                    let mut m = m;
                    m.remove(key.as_slice());
                    versions.push((t.without(&key), m));
                }
                Op::Get(_) | Op::Snapshot => {}
            }
        }

        for (tree, model) in &versions {
            validate_tree(tree);
            prop_assert_eq!(tree.len(), model.len());
            prop_assert!(tree.iter().eq(model.iter()));
        }
    }

    #[test]
    fn prop_equivalence_set(ops in ops_strategy()) {
        let mut s: TreeSet<Vec<u8>> = TreeSet::new();
        let mut m: BTreeSet<Vec<u8>> = BTreeSet::new();

        for op in ops {
            match op {
                Op::Insert(key, _) => {
                    prop_assert_eq!(s.insert(key.clone()), m.insert(key));
                }
                Op::Remove(key) => {
                    prop_assert_eq!(s.remove(&key), m.remove(key.as_slice()));
                }
                Op::Get(key) => {
                    prop_assert_eq!(s.contains(&key), m.contains(key.as_slice()));
                }
                Op::Snapshot => {}
            }
            prop_assert_eq!(s.len(), m.len());
        }

        prop_assert!(s.iter().eq(m.iter()));
        prop_assert_eq!(s.first(), m.first());
        prop_assert_eq!(s.last(), m.last());
    }

    #[test]
    fn prop_merge_matches_model(
        inputs in prop::collection::vec(
            prop::collection::vec((key_strategy(), any::<u64>()), 0..=40),
            0..=5,
        )
    ) {
        let trees: Vec<Tree<Vec<u8>, u64>> = inputs.iter().map(|e| e.iter().cloned().collect()).collect();
        let mut model = BTreeMap::new();
        for entries in &inputs {
            model.extend(entries.iter().cloned());
        }

        let merged = Tree::merge(&trees);
        validate_tree(&merged);
        prop_assert!(merged.iter().eq(model.iter()));

        // Inputs are untouched.
        for (tree, entries) in trees.iter().zip(&inputs) {
            let own: BTreeMap<_, _> = entries.iter().cloned().collect();
            prop_assert!(tree.iter().eq(own.iter()));
        }
    }

    #[test]
    fn prop_list_round_trip(elements in prop::collection::vec(list_element_strategy(), 0..=12)) {
        let text = list::join(&elements);
        prop_assert_eq!(list::split(&text).unwrap(), elements);
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

fn small_keys() -> Vec<Vec<u8>> {
    vec![
        b"a".to_vec(),
        b"b".to_vec(),
        b"".to_vec(),
        b"aa".to_vec(),
        b"a\0".to_vec(),
        b"ba".to_vec(),
    ]
}

#[test]
fn exhaustive_insert_order_small_set() {
    let keys = small_keys();

    for_each_permutation(&keys, |perm| {
        let mut t: Tree<Vec<u8>, u64> = Tree::new();
        let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();

        for (i, k) in perm.into_iter().enumerate() {
            let v = i as u64;
            assert_eq!(t.insert(k.clone(), v), m.insert(k, v).is_none());
        }

        validate_tree(&t);
        assert!(t.iter().eq(m.iter()));
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    let keys = small_keys();

    // Insert in a fixed order, then remove in all permutations, both in
    // place and from a version that keeps the base alive.
    let base: Tree<Vec<u8>, u64> = keys.iter().cloned().zip(0..).collect();
    let base_map: BTreeMap<Vec<u8>, u64> = keys.iter().cloned().zip(0..).collect();

    for_each_permutation(&keys, |perm| {
        let mut owned: Tree<Vec<u8>, u64> = keys.iter().cloned().zip(0..).collect();
        let mut shared = base.clone();
        let mut m = base_map.clone();

        for k in perm {
            let removed = m.remove(k.as_slice()).is_some();
            assert_eq!(owned.remove(&k), removed);
            assert_eq!(shared.remove(&k), removed);
            assert_eq!(owned.len(), m.len());
            validate_tree(&owned);
            validate_tree(&shared);
        }
        assert!(owned.is_empty());
        assert!(shared.root.is_none());
        assert!(base.iter().eq(base_map.iter()));
    });
}
