//! Ordered key→value maps over critbit nodes.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::critbit::{self, Incoming, Mode};
use crate::error::{BoxError, Error, Result};
use crate::list;
use crate::merge::{merge_roots, merge_trees};
use crate::node::{shares, Node, NodeRef};
use crate::traverse::{Bindings, Flow, ForEach, Iter};

/// A persistent ordered map keyed by raw bytes.
///
/// Cloning is O(1) and shares every node; the clone and the original then
/// diverge by copy-on-write. A tree that is the sole owner of its nodes is
/// updated in place.
pub struct Tree<K, V> {
    pub(crate) root: Option<NodeRef<K, V>>,
}

/// Shape of a tree's root node.
#[derive(Debug)]
pub enum NodeInfo<'a, K, V> {
    Empty,
    Internal {
        shares: usize,
        byte: usize,
        other_bits: u16,
    },
    External {
        shares: usize,
        key: &'a K,
        value: &'a V,
    },
}

impl<K, V> Tree<K, V> {
    pub fn new() -> Self {
        Self { root: None }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.root.as_ref().map_or(0, |n| n.size())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.root.as_ref())
    }

    pub fn keys(&self) -> impl ExactSizeIterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl ExactSizeIterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    pub fn to_entries(&self) -> Vec<(&K, &V)> {
        self.iter().collect()
    }

    /// Entry with the smallest key.
    pub fn min(&self) -> Option<(&K, &V)> {
        critbit::edge(self.root.as_ref(), 0).map(|e| (&e.key, &e.value))
    }

    /// Entry with the largest key.
    pub fn max(&self) -> Option<(&K, &V)> {
        critbit::edge(self.root.as_ref(), 1).map(|e| (&e.key, &e.value))
    }

    /// Starts a suspendable traversal over a snapshot of this tree.
    pub fn walk(&self) -> ForEach<K, V> {
        ForEach::new(self.root.as_ref())
    }

    pub fn node_info(&self) -> NodeInfo<'_, K, V> {
        let Some(root) = self.root.as_ref() else {
            return NodeInfo::Empty;
        };
        match &**root {
            Node::Internal(i) => NodeInfo::Internal {
                shares: shares(root),
                byte: i.byte,
                other_bits: i.other_bits,
            },
            Node::External(e) => NodeInfo::External {
                shares: shares(root),
                key: &e.key,
                value: &e.value,
            },
        }
    }

    /// The subtree on side `dir & 1` of the root.
    pub fn child(&self, dir: usize) -> Result<Self> {
        match self.root.as_deref() {
            Some(Node::Internal(i)) => Ok(Self {
                root: Some(Rc::clone(&i.child[dir & 1])),
            }),
            _ => Err(Error::invalid_input("tree has no children")),
        }
    }
}

impl<K: AsRef<[u8]>, V> Tree<K, V> {
    /// Value for `key`, or [`Error::NotFound`].
    pub fn get(&self, key: impl AsRef<[u8]>) -> Result<&V> {
        let key = key.as_ref();
        self.lookup(key).ok_or_else(|| Error::not_found(key))
    }

    pub fn lookup(&self, key: impl AsRef<[u8]>) -> Option<&V> {
        critbit::lookup(self.root.as_ref(), key.as_ref()).map(|e| &e.value)
    }

    pub fn get_or<'a>(&'a self, key: impl AsRef<[u8]>, default: &'a V) -> &'a V {
        self.lookup(key).unwrap_or(default)
    }

    pub fn contains_key(&self, key: impl AsRef<[u8]>) -> bool {
        critbit::lookup(self.root.as_ref(), key.as_ref()).is_some()
    }

    /// Sets `key` to `value`. Returns `true` if the key was not present.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        critbit::set(&mut self.root, Incoming::Entry(key, value), Mode::Map)
    }

    /// Removes `key`. Returns `false` if it was not present.
    pub fn remove(&mut self, key: impl AsRef<[u8]>) -> bool {
        critbit::remove_from(&mut self.root, key.as_ref())
    }

    /// A new version with `key` set to `value`; `self` is unchanged.
    #[must_use]
    pub fn with(&self, key: K, value: V) -> Self {
        let mut tree = self.clone();
        tree.insert(key, value);
        tree
    }

    /// A new version without `key`; `self` is unchanged.
    #[must_use]
    pub fn without(&self, key: impl AsRef<[u8]>) -> Self {
        let mut tree = self.clone();
        tree.remove(key);
        tree
    }

    /// Merges trees left to right; on conflicting keys the last one wins.
    pub fn merge<'a, I>(trees: I) -> Self
    where
        I: IntoIterator<Item = &'a Tree<K, V>>,
        K: 'a,
        V: 'a,
    {
        Self {
            root: merge_trees(trees.into_iter().map(|t| t.root.clone()), Mode::Map),
        }
    }

    /// Merges inputs that first have to be converted into trees. Conversion
    /// stops at the first failure.
    pub fn try_merge<I, T>(inputs: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: TryInto<Tree<K, V>, Error = Error>,
    {
        let roots = inputs.into_iter().map(|t| t.try_into().map(|t: Tree<K, V>| t.root));
        Ok(Self {
            root: merge_roots(roots, Mode::Map)?,
        })
    }

    /// Runs `body` for every entry in ascending order until it breaks or
    /// fails.
    pub fn for_each<F, E>(&self, body: F) -> Result<()>
    where
        F: FnMut(&K, &V) -> std::result::Result<Flow, E>,
        E: Into<BoxError>,
    {
        self.walk().run_with(body)
    }

    /// Binds every entry into `bindings`, then runs `body` against them.
    pub fn for_each_bound<B, F, E>(&self, bindings: &mut B, body: F) -> Result<()>
    where
        B: Bindings<K, V>,
        F: FnMut(&mut B) -> std::result::Result<Flow, E>,
        E: Into<BoxError>,
    {
        self.walk().run(bindings, body)
    }

    /// Runs an asynchronous `body` for every entry; the traversal waits on
    /// each step before emitting the next entry.
    pub async fn for_each_async<F, Fut, E>(&self, body: F) -> Result<()>
    where
        F: FnMut(&K, &V) -> Fut,
        Fut: std::future::Future<Output = std::result::Result<Flow, E>>,
        E: Into<BoxError>,
    {
        self.walk().run_async(body).await
    }
}

impl<T: AsRef<[u8]>> Tree<T, T> {
    /// Builds a map from alternating keys and values.
    pub fn from_flat<I: IntoIterator<Item = T>>(items: I) -> Result<Self> {
        let mut tree = Self::new();
        let mut items = items.into_iter();
        while let Some(key) = items.next() {
            let Some(value) = items.next() else {
                return Err(Error::invalid_input("missing value to go with key"));
            };
            tree.insert(key, value);
        }
        Ok(tree)
    }
}

impl<K, V> Default for Tree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for Tree<K, V> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
        }
    }
}

impl<K: AsRef<[u8]>, V> FromIterator<(K, V)> for Tree<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}

impl<K: AsRef<[u8]>, V> Extend<(K, V)> for Tree<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<'a, K, V> IntoIterator for &'a Tree<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: AsRef<[u8]>, V: PartialEq> PartialEq for Tree<K, V> {
    fn eq(&self, other: &Self) -> bool {
        if let (Some(a), Some(b)) = (&self.root, &other.root) {
            if Rc::ptr_eq(a, b) {
                return true;
            }
        }
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|((ka, va), (kb, vb))| ka.as_ref() == kb.as_ref() && va == vb)
    }
}

impl<K: AsRef<[u8]>, V: Eq> Eq for Tree<K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Tree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Alternating keys and values in ascending key order, as list text.
impl<K: fmt::Display, V: fmt::Display> fmt::Display for Tree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        for (key, value) in self.iter() {
            list::push_element(&mut out, &key.to_string());
            list::push_element(&mut out, &value.to_string());
        }
        f.write_str(&out)
    }
}

impl<K, V> FromStr for Tree<K, V>
where
    K: From<String> + AsRef<[u8]>,
    V: From<String>,
{
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let elements = list::split(s)?;
        if elements.len() % 2 == 1 {
            return Err(Error::invalid_input("missing value to go with key"));
        }
        let mut tree = Self::new();
        let mut elements = elements.into_iter();
        while let (Some(key), Some(value)) = (elements.next(), elements.next()) {
            tree.insert(K::from(key), V::from(value));
        }
        Ok(tree)
    }
}

impl<K, V> TryFrom<&str> for Tree<K, V>
where
    K: From<String> + AsRef<[u8]>,
    V: From<String>,
{
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        s.parse()
    }
}
