//! Ordered key sets over the same critbit nodes as [`Tree`](crate::Tree).

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::critbit::{self, Incoming, Mode};
use crate::error::{BoxError, Error, Result};
use crate::list;
use crate::merge::{merge_roots, merge_trees};
use crate::node::NodeRef;
use crate::traverse::{Bindings, Flow, ForEach, Iter};

/// A persistent ordered set of byte-string keys.
///
/// Leaves carry a `()` placeholder. Re-adding a present key leaves the set
/// untouched and allocates nothing.
pub struct TreeSet<K> {
    root: Option<NodeRef<K, ()>>,
}

impl<K> TreeSet<K> {
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

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &K> + Clone + '_ {
        Iter::new(self.root.as_ref()).map(|(k, _)| k)
    }

    pub fn to_vec(&self) -> Vec<&K> {
        self.iter().collect()
    }

    pub fn first(&self) -> Option<&K> {
        critbit::edge(self.root.as_ref(), 0).map(|e| &e.key)
    }

    pub fn last(&self) -> Option<&K> {
        critbit::edge(self.root.as_ref(), 1).map(|e| &e.key)
    }

    /// Starts a suspendable traversal; entries carry `()` as their value.
    pub fn walk(&self) -> ForEach<K, ()> {
        ForEach::new(self.root.as_ref())
    }
}

impl<K: AsRef<[u8]>> TreeSet<K> {
    pub fn contains(&self, key: impl AsRef<[u8]>) -> bool {
        critbit::lookup(self.root.as_ref(), key.as_ref()).is_some()
    }

    /// Adds `key`. Returns `false` if it was already present.
    pub fn insert(&mut self, key: K) -> bool {
        critbit::set(&mut self.root, Incoming::Entry(key, ()), Mode::Set)
    }

    pub fn remove(&mut self, key: impl AsRef<[u8]>) -> bool {
        critbit::remove_from(&mut self.root, key.as_ref())
    }

    #[must_use]
    pub fn with(&self, key: K) -> Self {
        let mut set = self.clone();
        set.insert(key);
        set
    }

    #[must_use]
    pub fn without(&self, key: impl AsRef<[u8]>) -> Self {
        let mut set = self.clone();
        set.remove(key);
        set
    }

    /// Union of all sets, sharing the first non-empty one as the base.
    pub fn merge<'a, I>(sets: I) -> Self
    where
        I: IntoIterator<Item = &'a TreeSet<K>>,
        K: 'a,
    {
        Self {
            root: merge_trees(sets.into_iter().map(|s| s.root.clone()), Mode::Set),
        }
    }

    pub fn try_merge<I, T>(inputs: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: TryInto<TreeSet<K>, Error = Error>,
    {
        let roots = inputs.into_iter().map(|t| t.try_into().map(|s: TreeSet<K>| s.root));
        Ok(Self {
            root: merge_roots(roots, Mode::Set)?,
        })
    }

    pub fn for_each<F, E>(&self, mut body: F) -> Result<()>
    where
        F: FnMut(&K) -> std::result::Result<Flow, E>,
        E: Into<BoxError>,
    {
        self.walk().run_with(|key, _| body(key))
    }

    pub fn for_each_bound<B, F, E>(&self, bindings: &mut B, body: F) -> Result<()>
    where
        B: Bindings<K, ()>,
        F: FnMut(&mut B) -> std::result::Result<Flow, E>,
        E: Into<BoxError>,
    {
        self.walk().run(bindings, body)
    }

    pub async fn for_each_async<F, Fut, E>(&self, mut body: F) -> Result<()>
    where
        F: FnMut(&K) -> Fut,
        Fut: std::future::Future<Output = std::result::Result<Flow, E>>,
        E: Into<BoxError>,
    {
        self.walk().run_async(|key, _| body(key)).await
    }
}

impl<K> Default for TreeSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Clone for TreeSet<K> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
        }
    }
}

impl<K: AsRef<[u8]>> FromIterator<K> for TreeSet<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<K: AsRef<[u8]>> Extend<K> for TreeSet<K> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<K: AsRef<[u8]>> PartialEq for TreeSet<K> {
    fn eq(&self, other: &Self) -> bool {
        if let (Some(a), Some(b)) = (&self.root, &other.root) {
            if Rc::ptr_eq(a, b) {
                return true;
            }
        }
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a.as_ref() == b.as_ref())
    }
}

impl<K: AsRef<[u8]>> Eq for TreeSet<K> {}

impl<K: fmt::Debug> fmt::Debug for TreeSet<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K: fmt::Display> fmt::Display for TreeSet<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        for key in self.iter() {
            list::push_element(&mut out, &key.to_string());
        }
        f.write_str(&out)
    }
}

impl<K: From<String> + AsRef<[u8]>> FromStr for TreeSet<K> {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(list::split(s)?.into_iter().map(K::from).collect())
    }
}

impl<K: From<String> + AsRef<[u8]>> TryFrom<&str> for TreeSet<K> {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        s.parse()
    }
}
