//! The critbit engine: lookup, insertion and removal over node handles.
//!
//! Insertion has two strategies. When no node on the path to the insertion
//! point is shared, the new internal node is spliced in place and the sizes
//! along the path are bumped. Otherwise the path is rebuilt from the
//! insertion point up to the root, leaving the original nodes untouched for
//! their other owners. Removal always rebuilds.

use std::rc::Rc;

use crate::node::{critical, is_shared, External, Node, NodeRef, Split};

/// Whether re-inserting an existing key replaces its value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Mode {
    Map,
    Set,
}

/// An entry on its way into a tree.
pub(crate) enum Incoming<K, V> {
    Entry(K, V),
    /// An external node taken from another tree, spliced in as-is.
    Leaf(NodeRef<K, V>),
}

impl<K: AsRef<[u8]>, V> Incoming<K, V> {
    fn key(&self) -> &[u8] {
        match self {
            Incoming::Entry(key, _) => key.as_ref(),
            Incoming::Leaf(node) => node.leaf().map_or(&[][..], |e| e.key.as_ref()),
        }
    }

    fn into_leaf(self) -> NodeRef<K, V> {
        match self {
            Incoming::Entry(key, value) => Node::external(key, value),
            Incoming::Leaf(node) => node,
        }
    }
}

// =============================================================================
// Lookup
// =============================================================================

pub(crate) fn lookup<'a, K: AsRef<[u8]>, V>(
    root: Option<&'a NodeRef<K, V>>,
    key: &[u8],
) -> Option<&'a External<K, V>> {
    let mut n = root?;
    loop {
        match &**n {
            Node::Internal(i) => n = &i.child[i.direction(key)],
            // Descent only finds the most plausible leaf; confirm it.
            Node::External(e) => return (e.key.as_ref() == key).then_some(e),
        }
    }
}

/// Leftmost (`dir == 0`) or rightmost (`dir == 1`) leaf.
pub(crate) fn edge<K, V>(root: Option<&NodeRef<K, V>>, dir: usize) -> Option<&External<K, V>> {
    let mut n = root?;
    loop {
        match &**n {
            Node::Internal(i) => n = &i.child[dir],
            Node::External(e) => return Some(e),
        }
    }
}

struct Closest<'a, K, V> {
    leaf: &'a External<K, V>,
    leaf_shared: bool,
    path_shared: bool,
}

fn closest<'a, K: AsRef<[u8]>, V>(mut n: &'a NodeRef<K, V>, key: &[u8]) -> Closest<'a, K, V> {
    let mut path_shared = false;
    loop {
        match &**n {
            Node::Internal(i) => {
                path_shared |= is_shared(n);
                n = &i.child[i.direction(key)];
            }
            Node::External(leaf) => {
                return Closest {
                    leaf,
                    leaf_shared: is_shared(n),
                    path_shared,
                }
            }
        }
    }
}

// =============================================================================
// Insertion
// =============================================================================

/// Inserts or updates an entry. Returns `true` when the key was not present.
pub(crate) fn set<K: AsRef<[u8]>, V>(
    root: &mut Option<NodeRef<K, V>>,
    incoming: Incoming<K, V>,
    mode: Mode,
) -> bool {
    if root.is_none() {
        *root = Some(incoming.into_leaf());
        return true;
    }
    let Some(top) = root.as_mut() else {
        return false;
    };

    let (split, path_shared, leaf_shared) = {
        let c = closest(top, incoming.key());
        (critical(incoming.key(), c.leaf.key.as_ref()), c.path_shared, c.leaf_shared)
    };

    match split {
        None if mode == Mode::Set => false,
        None => {
            if path_shared || leaf_shared {
                tracing::trace!("critbit update: copy-on-write");
                *top = rebuild(top, incoming, None);
            } else {
                place(top, incoming, None);
            }
            false
        }
        Some(split) => {
            if path_shared {
                tracing::trace!(byte = split.byte, "critbit insert: copy-on-write");
                *top = rebuild(top, incoming, Some(split));
            } else {
                place(top, incoming, Some(split));
            }
            true
        }
    }
}

/// Copy-on-write insertion: returns a new subtree, leaving `n` intact.
fn rebuild<K: AsRef<[u8]>, V>(
    n: &NodeRef<K, V>,
    incoming: Incoming<K, V>,
    split: Option<Split>,
) -> NodeRef<K, V> {
    if let Node::Internal(i) = &**n {
        if i.precedes(split) {
            let dir = i.direction(incoming.key());
            let mut child = i.child.clone();
            child[dir] = rebuild(&i.child[dir], incoming, split);
            return Node::internal(child, i.byte, i.other_bits);
        }
    }
    match split {
        Some(split) => Node::internal(
            split.arrange(incoming.into_leaf(), Rc::clone(n)),
            split.byte,
            split.other_bits,
        ),
        None => incoming.into_leaf(),
    }
}

/// In-place insertion into an exclusively owned path.
///
/// Walks slot by slot, bumping sizes on the way down. The first internal node
/// that is not uniquely owned is rebuilt instead of mutated.
fn place<K: AsRef<[u8]>, V>(mut slot: &mut NodeRef<K, V>, incoming: Incoming<K, V>, split: Option<Split>) {
    loop {
        if !matches!(&**slot, Node::Internal(i) if i.precedes(split)) {
            break;
        }
        if is_shared(slot) {
            tracing::trace!("critbit insert: copy-on-write below owned path");
            *slot = rebuild(slot, incoming, split);
            return;
        }
        // Sole owner with no weak handles, so this always borrows.
        let Some(Node::Internal(i)) = Rc::get_mut(slot) else {
            return;
        };
        if split.is_some() {
            i.size += 1;
        }
        let dir = i.direction(incoming.key());
        slot = &mut i.child[dir];
    }

    match (split, incoming) {
        (Some(split), incoming) => {
            let old = Rc::clone(slot);
            *slot = Node::internal(split.arrange(incoming.into_leaf(), old), split.byte, split.other_bits);
        }
        (None, Incoming::Entry(key, value)) => match Rc::get_mut(slot) {
            Some(Node::External(e)) => e.value = value,
            _ => *slot = Node::external(key, value),
        },
        (None, Incoming::Leaf(leaf)) => *slot = leaf,
    }
}

// =============================================================================
// Removal
// =============================================================================

pub(crate) enum Removal<K, V> {
    /// Key not present; the tree is unchanged.
    Absent,
    /// The subtree held only the removed key.
    Emptied,
    Replaced(NodeRef<K, V>),
}

pub(crate) fn remove<K: AsRef<[u8]>, V>(n: &NodeRef<K, V>, key: &[u8]) -> Removal<K, V> {
    match &**n {
        Node::External(e) => {
            if e.key.as_ref() == key {
                Removal::Emptied
            } else {
                Removal::Absent
            }
        }
        Node::Internal(i) => {
            let dir = i.direction(key);
            match remove(&i.child[dir], key) {
                Removal::Absent => Removal::Absent,
                Removal::Emptied => Removal::Replaced(Rc::clone(&i.child[1 - dir])),
                Removal::Replaced(c) => {
                    let mut child = i.child.clone();
                    child[dir] = c;
                    Removal::Replaced(Node::internal(child, i.byte, i.other_bits))
                }
            }
        }
    }
}

/// Removes `key` below `root`. Returns `false` when the key was absent.
pub(crate) fn remove_from<K: AsRef<[u8]>, V>(root: &mut Option<NodeRef<K, V>>, key: &[u8]) -> bool {
    let Some(top) = root.as_ref() else {
        return false;
    };
    match remove(top, key) {
        Removal::Absent => false,
        Removal::Emptied => {
            *root = None;
            true
        }
        Removal::Replaced(n) => {
            *root = Some(n);
            true
        }
    }
}
