//! De-duplication stages.
//!
//! # Overview
//! - [`Semantic::distinct`] - first occurrence of each value (`Eq + Hash`)
//! - [`Semantic::distinct_by`] - first occurrence of each derived key
//! - [`Semantic::distinct_with`] - first occurrence under a pairwise equivalence
//!
//! The seen-set lives inside one traversal, so re-running the pipeline starts
//! from an empty set. Repeats are dropped before the downstream interrupt sees
//! them and keep no timestamp of their own.

use crate::generator::{Element, Generator, SharedGenerator, Timestamp};
use crate::semantic::Semantic;
use anyhow::Result;
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::hash::Hash;

/// First occurrence per key; `key` derives the identity of an element.
struct DistinctByGen<E, K, F> {
    upstream: SharedGenerator<E>,
    key: F,
    _k: std::marker::PhantomData<fn() -> K>,
}
impl<E, K, F> Generator<E> for DistinctByGen<E, K, F>
where
    E: Element,
    K: Eq + Hash,
    F: Fn(&E) -> K + Send + Sync,
{
    fn generate(
        &self,
        accept: &mut dyn FnMut(E, Timestamp),
        interrupt: &mut dyn FnMut(&E) -> bool,
    ) -> Result<()> {
        let seen: RefCell<HashSet<K>> = RefCell::new(HashSet::new());
        let fresh: Cell<Option<K>> = Cell::new(None);
        self.upstream.generate(
            &mut |e, ts| {
                if let Some(k) = fresh.take() {
                    seen.borrow_mut().insert(k);
                    accept(e, ts);
                }
            },
            &mut |e| {
                let k = (self.key)(e);
                if seen.borrow().contains(&k) {
                    fresh.set(None);
                    return false;
                }
                fresh.set(Some(k));
                interrupt(e)
            },
        )
    }
}

struct DistinctWithGen<E, F> {
    upstream: SharedGenerator<E>,
    same: F,
}
impl<E, F> Generator<E> for DistinctWithGen<E, F>
where
    E: Element,
    F: Fn(&E, &E) -> bool + Send + Sync,
{
    fn generate(
        &self,
        accept: &mut dyn FnMut(E, Timestamp),
        interrupt: &mut dyn FnMut(&E) -> bool,
    ) -> Result<()> {
        let kept: RefCell<Vec<E>> = RefCell::new(Vec::new());
        let fresh = Cell::new(false);
        self.upstream.generate(
            &mut |e, ts| {
                if fresh.get() {
                    kept.borrow_mut().push(e.clone());
                    accept(e, ts);
                }
            },
            &mut |e| {
                let is_new = !kept.borrow().iter().any(|k| (self.same)(k, e));
                fresh.set(is_new);
                is_new && interrupt(e)
            },
        )
    }
}

impl<E: Element + Eq + Hash> Semantic<E> {
    /// First occurrence of each value, in emission order.
    #[must_use]
    pub fn distinct(&self) -> Semantic<E> {
        self.distinct_by(E::clone)
    }
}

impl<E: Element> Semantic<E> {
    /// First occurrence of each `key(&e)`.
    #[must_use]
    pub fn distinct_by<K, F>(&self, key: F) -> Semantic<E>
    where
        K: Eq + Hash + 'static,
        F: Fn(&E) -> K + Send + Sync + 'static,
    {
        self.derive(DistinctByGen {
            upstream: self.generator(),
            key,
            _k: std::marker::PhantomData,
        })
    }

    /// First element of each class under `same`. Comparisons are linear in
    /// the number of classes kept so far.
    #[must_use]
    pub fn distinct_with<F>(&self, same: F) -> Semantic<E>
    where
        F: Fn(&E, &E) -> bool + Send + Sync + 'static,
    {
        self.derive(DistinctWithGen {
            upstream: self.generator(),
            same,
        })
    }
}
