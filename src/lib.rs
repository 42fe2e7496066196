//! # critbit-rs
//!
//! Persistent ordered maps and sets built on reference-counted critbit trees.
//!
//! Every update either returns a new version that shares all untouched nodes
//! with the old one, or, when the caller holds the only reference to the
//! nodes on the update path, mutates them in place. Traversal is available as
//! a plain iterator or as a resumable for-each that can be suspended between
//! entries.
//!
//! ## Example
//!
//! ```rust
//! use critbit_rs::{Flow, Tree};
//!
//! let t: Tree<String, u32> = [("foo", 1), ("bar", 2), ("baz", 3)]
//!     .into_iter()
//!     .map(|(k, v)| (k.to_string(), v))
//!     .collect();
//! assert_eq!(t.keys().collect::<Vec<_>>(), ["bar", "baz", "foo"]);
//!
//! let t2 = t.without("bar");
//! assert!(t.contains_key("bar"));
//! assert!(!t2.contains_key("bar"));
//!
//! let mut sum = 0;
//! t.for_each(|_, v| {
//!     sum += v;
//!     Ok::<_, critbit_rs::BoxError>(Flow::Continue)
//! })
//! .unwrap();
//! assert_eq!(sum, 6);
//! ```

#![deny(unsafe_code)]

mod critbit;
mod error;
pub mod list;
mod merge;
mod node;
mod set;
mod traverse;
mod tree;

pub use error::{BoxError, Error, Result};
pub use set::TreeSet;
pub use traverse::{Bindings, Flow, ForEach, Iter, State};
pub use tree::{NodeInfo, Tree};

// =============================================================================
// Configuration
// =============================================================================

/// Inline capacity of explicit traversal and merge stacks. Trees deeper than
/// this spill to the heap.
const STACK_INLINE: usize = 8;


#[cfg(test)]
mod proptests;
