//! Folding several trees into one.

use std::convert::Infallible;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::critbit::{self, Incoming, Mode};
use crate::node::{Node, NodeRef};
use crate::STACK_INLINE;

/// Merges roots left to right, later entries winning for maps.
///
/// The first non-empty root becomes the accumulator without being copied;
/// leaves of later roots are spliced into it as shared nodes. Inputs are
/// pulled lazily, so an `Err` stops the merge before later inputs are
/// converted. Everything retained so far is released on that path.
pub(crate) fn merge_roots<K, V, E, I>(inputs: I, mode: Mode) -> Result<Option<NodeRef<K, V>>, E>
where
    K: AsRef<[u8]>,
    I: IntoIterator<Item = Result<Option<NodeRef<K, V>>, E>>,
{
    let mut inputs = inputs.into_iter();
    let mut acc = None;
    let mut merged = 0usize;

    for input in inputs.by_ref() {
        if let Some(root) = input? {
            acc = Some(root);
            merged += 1;
            break;
        }
    }

    let mut stack: SmallVec<[NodeRef<K, V>; STACK_INLINE]> = SmallVec::new();
    for input in inputs {
        let Some(mut n) = input? else {
            continue;
        };
        merged += 1;
        loop {
            while let Node::Internal(i) = &*n {
                let (left, right) = (Rc::clone(&i.child[0]), Rc::clone(&i.child[1]));
                stack.push(right);
                n = left;
            }
            critbit::set(&mut acc, Incoming::Leaf(n), mode);
            match stack.pop() {
                Some(next) => n = next,
                None => break,
            }
        }
    }

    tracing::debug!(
        inputs = merged,
        size = acc.as_ref().map_or(0, |n| n.size()),
        "merged trees"
    );
    Ok(acc)
}

/// Merges roots that are already trees; nothing can fail.
pub(crate) fn merge_trees<K, V, I>(roots: I, mode: Mode) -> Option<NodeRef<K, V>>
where
    K: AsRef<[u8]>,
    I: IntoIterator<Item = Option<NodeRef<K, V>>>,
{
    match merge_roots(roots.into_iter().map(Ok::<_, Infallible>), mode) {
        Ok(root) => root,
        Err(never) => match never {},
    }
}
