//! Reference-counted critbit nodes.
//!
//! A node is either an internal branch testing one bit of one key byte, or an
//! external leaf owning a key and its value. Handles are `Rc`s: cloning a
//! handle retains the node, dropping it releases the node, and dropping the
//! last handle releases the children (internal) or the key and value
//! (external).

use std::rc::Rc;

// =============================================================================
// Key symbols
// =============================================================================
//
// Each key position is read as a 9-bit symbol: a presence bit above the eight
// data bits. Positions past the end of the key read as 0, which orders a key
// before every longer key sharing its prefix.

const PRESENT: u16 = 0x100;
const SYMBOL_MASK: u16 = 0x1FF;
const SYMBOL_BITS: u32 = 9;

/// A node with more strong handles than this is shared.
const SOLE_OWNER: usize = 1;

#[inline]
pub(crate) fn symbol(key: &[u8], byte: usize) -> u16 {
    key.get(byte).map_or(0, |&c| PRESENT | u16::from(c))
}

/// Side (0 or 1) a symbol falls on for a node testing `other_bits`.
#[inline]
pub(crate) fn direction(other_bits: u16, sym: u16) -> usize {
    ((1 + u32::from(other_bits | sym)) >> SYMBOL_BITS) as usize
}

/// Position of a new internal node, derived from the first difference
/// between an incoming key and the closest existing leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Split {
    pub(crate) byte: usize,
    pub(crate) other_bits: u16,
    /// Side the existing subtree takes under the new node.
    pub(crate) dir: usize,
}

impl Split {
    /// Orders the new leaf and the displaced subtree as children.
    pub(crate) fn arrange<K, V>(self, new: NodeRef<K, V>, old: NodeRef<K, V>) -> [NodeRef<K, V>; 2] {
        if self.dir == 1 {
            [new, old]
        } else {
            [old, new]
        }
    }
}

/// Finds the critical bit between `key` and `existing`, or `None` when the
/// two keys are equal.
pub(crate) fn critical(key: &[u8], existing: &[u8]) -> Option<Split> {
    let len = key.len().max(existing.len());
    (0..len).find_map(|byte| {
        let mut bit = symbol(key, byte) ^ symbol(existing, byte);
        if bit == 0 {
            return None;
        }
        // Keep only the most significant differing bit.
        while bit & (bit - 1) != 0 {
            bit &= bit - 1;
        }
        let other_bits = bit ^ SYMBOL_MASK;
        Some(Split {
            byte,
            other_bits,
            dir: direction(other_bits, symbol(existing, byte)),
        })
    })
}

// =============================================================================
// Nodes
// =============================================================================

/// Shared handle to a node.
pub(crate) type NodeRef<K, V> = Rc<Node<K, V>>;

pub(crate) enum Node<K, V> {
    Internal(Internal<K, V>),
    External(External<K, V>),
}

pub(crate) struct Internal<K, V> {
    pub(crate) child: [NodeRef<K, V>; 2],
    pub(crate) byte: usize,
    pub(crate) other_bits: u16,
    /// Number of external nodes below.
    pub(crate) size: usize,
}

pub(crate) struct External<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
}

impl<K, V> Node<K, V> {
    pub(crate) fn external(key: K, value: V) -> NodeRef<K, V> {
        Rc::new(Node::External(External { key, value }))
    }

    pub(crate) fn internal(child: [NodeRef<K, V>; 2], byte: usize, other_bits: u16) -> NodeRef<K, V> {
        let size = child[0].size() + child[1].size();
        Rc::new(Node::Internal(Internal {
            child,
            byte,
            other_bits,
            size,
        }))
    }

    #[inline]
    pub(crate) fn size(&self) -> usize {
        match self {
            Node::Internal(i) => i.size,
            Node::External(_) => 1,
        }
    }

    #[inline]
    pub(crate) fn leaf(&self) -> Option<&External<K, V>> {
        match self {
            Node::External(e) => Some(e),
            Node::Internal(_) => None,
        }
    }
}

impl<K: AsRef<[u8]>, V> Internal<K, V> {
    #[inline]
    pub(crate) fn direction(&self, key: &[u8]) -> usize {
        direction(self.other_bits, symbol(key, self.byte))
    }

    /// Whether a new node at `split` belongs below this one. `None` stands for
    /// an update of an existing key, which always descends to the leaf.
    #[inline]
    pub(crate) fn precedes(&self, split: Option<Split>) -> bool {
        match split {
            None => true,
            Some(s) => self.byte < s.byte || (self.byte == s.byte && s.other_bits > self.other_bits),
        }
    }
}

// =============================================================================
// Sharing
// =============================================================================

/// True when another owner besides the caller holds this node, so it must
/// not be mutated in place.
#[inline]
pub(crate) fn is_shared<K, V>(node: &NodeRef<K, V>) -> bool {
    Rc::strong_count(node) > SOLE_OWNER
}

/// Number of handles currently holding this node.
#[inline]
pub(crate) fn shares<K, V>(node: &NodeRef<K, V>) -> usize {
    Rc::strong_count(node)
}
