//! Ordered traversal.
//!
//! [`Iter`] borrows a tree and walks it with an explicit stack. [`ForEach`]
//! owns retained handles to the subtrees it has yet to visit, so it can be
//! suspended between entries while the caller runs a body, even one that
//! modifies the tree being walked.

use std::future::Future;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::error::{BoxError, Error, Result};
use crate::node::{External, Node, NodeRef};
use crate::STACK_INLINE;

// =============================================================================
// Borrowing iterator
// =============================================================================

/// Iterator over the entries of a tree in ascending key order.
pub struct Iter<'a, K, V> {
    stack: SmallVec<[&'a NodeRef<K, V>; STACK_INLINE]>,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(root: Option<&'a NodeRef<K, V>>) -> Self {
        let mut stack = SmallVec::new();
        let remaining = root.map_or(0, |n| n.size());
        stack.extend(root);
        Self { stack, remaining }
    }

    fn next_leaf(&mut self) -> Option<&'a External<K, V>> {
        let mut n = self.stack.pop()?;
        loop {
            match &**n {
                Node::Internal(i) => {
                    self.stack.push(&i.child[1]);
                    n = &i.child[0];
                }
                Node::External(e) => {
                    self.remaining -= 1;
                    return Some(e);
                }
            }
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.next_leaf().map(|e| (&e.key, &e.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            stack: self.stack.clone(),
            remaining: self.remaining,
        }
    }
}

// =============================================================================
// Resumable for-each
// =============================================================================

/// Outcome of a for-each body for one entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Stop early; the traversal still succeeds.
    Break,
}

/// Where a [`ForEach`] is in its life cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// Root pushed, nothing visited yet.
    Init,
    /// Ready to emit the next entry.
    Visiting,
    /// An entry is bound; waiting for the body's outcome.
    Suspended,
    Done,
    Failed,
}

/// Caller-visible storage an entry is bound into before the body runs.
pub trait Bindings<K, V> {
    type Error: Into<BoxError>;

    fn bind(&mut self, key: &K, value: &V) -> std::result::Result<(), Self::Error>;
}

impl<K, V, E, F> Bindings<K, V> for F
where
    F: FnMut(&K, &V) -> std::result::Result<(), E>,
    E: Into<BoxError>,
{
    type Error = E;

    fn bind(&mut self, key: &K, value: &V) -> std::result::Result<(), E> {
        self(key, value)
    }
}

/// A suspendable in-order traversal.
///
/// [`next_entry`](Self::next_entry) emits one entry and suspends;
/// [`resume`](Self::resume) feeds back the body's outcome. Calling
/// `next_entry` while suspended resumes with [`Flow::Continue`]. Dropping a
/// `ForEach` at any point releases everything it retains.
pub struct ForEach<K, V> {
    stack: SmallVec<[NodeRef<K, V>; STACK_INLINE]>,
    current: Option<NodeRef<K, V>>,
    state: State,
}

impl<K, V> ForEach<K, V> {
    pub(crate) fn new(root: Option<&NodeRef<K, V>>) -> Self {
        let mut stack = SmallVec::new();
        let state = match root {
            Some(root) => {
                stack.push(Rc::clone(root));
                State::Init
            }
            None => State::Done,
        };
        Self {
            stack,
            current: None,
            state,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// The entry bound while suspended.
    pub fn entry(&self) -> Option<(&K, &V)> {
        let leaf = self.current.as_deref()?.leaf()?;
        Some((&leaf.key, &leaf.value))
    }

    /// Emits the next entry and suspends, or returns `None` once the
    /// traversal has finished.
    pub fn next_entry(&mut self) -> Option<(&K, &V)> {
        match self.state {
            State::Done | State::Failed => return None,
            State::Suspended => self.current = None,
            State::Init | State::Visiting => {}
        }
        self.state = State::Visiting;

        let Some(mut n) = self.stack.pop() else {
            self.finish(State::Done);
            return None;
        };
        loop {
            let next = match &*n {
                Node::Internal(i) => {
                    self.stack.push(Rc::clone(&i.child[1]));
                    Rc::clone(&i.child[0])
                }
                Node::External(_) => break,
            };
            n = next;
        }

        self.current = Some(n);
        self.state = State::Suspended;
        self.entry()
    }

    /// Applies the outcome of the body for the bound entry. Ignored unless
    /// suspended.
    pub fn resume<E: Into<BoxError>>(&mut self, outcome: std::result::Result<Flow, E>) -> Result<()> {
        if self.state != State::Suspended {
            return Ok(());
        }
        self.current = None;
        match outcome {
            Ok(Flow::Continue) => {
                self.state = State::Visiting;
                Ok(())
            }
            Ok(Flow::Break) => {
                tracing::trace!(pending = self.stack.len(), "for-each: break");
                self.finish(State::Done);
                Ok(())
            }
            Err(e) => {
                let e = e.into();
                tracing::debug!(error = %e, "for-each: step failed");
                self.finish(State::Failed);
                Err(Error::StepFailed(e))
            }
        }
    }

    /// Drives the traversal to completion: bind each entry, then run `body`
    /// against the bindings.
    pub fn run<B, F, E>(mut self, bindings: &mut B, mut body: F) -> Result<()>
    where
        B: Bindings<K, V>,
        F: FnMut(&mut B) -> std::result::Result<Flow, E>,
        E: Into<BoxError>,
    {
        while let Some((key, value)) = self.next_entry() {
            if let Err(e) = bindings.bind(key, value) {
                let e = e.into();
                tracing::debug!(error = %e, "for-each: binding failed");
                self.finish(State::Failed);
                return Err(Error::BindFailed(e));
            }
            let outcome = body(bindings);
            self.resume(outcome)?;
        }
        Ok(())
    }

    /// Like [`run`](Self::run) with the entry passed straight to `body`.
    pub fn run_with<F, E>(mut self, mut body: F) -> Result<()>
    where
        F: FnMut(&K, &V) -> std::result::Result<Flow, E>,
        E: Into<BoxError>,
    {
        while let Some((key, value)) = self.next_entry() {
            let outcome = body(key, value);
            self.resume(outcome)?;
        }
        Ok(())
    }

    /// Drives the traversal with a body that may itself suspend.
    pub async fn run_async<F, Fut, E>(mut self, mut body: F) -> Result<()>
    where
        F: FnMut(&K, &V) -> Fut,
        Fut: Future<Output = std::result::Result<Flow, E>>,
        E: Into<BoxError>,
    {
        while let Some((key, value)) = self.next_entry() {
            let step = body(key, value);
            let outcome = step.await;
            self.resume(outcome)?;
        }
        Ok(())
    }

    fn finish(&mut self, state: State) {
        tracing::trace!(?state, released = self.stack.len(), "for-each: finished");
        self.stack.clear();
        self.current = None;
        self.state = state;
    }
}
