//! Re-indexing and sorting.
//!
//! Re-indexing stages never move elements: they rewrite the timestamp each
//! element carries, and an ordered view ([`Semantic::to_ordered`]) later sorts
//! by it. Emission order, and therefore anything computed by an unordered
//! terminal, is unaffected.
//!
//! ```ignore
//! use semflow::*;
//! let p = of(vec![1, 2, 3]);
//! assert_eq!(p.reverse().to_ordered()?.to_vec()?, vec![3, 2, 1]);
//! assert_eq!(p.reverse().to_vec()?, vec![1, 2, 3]); // emission order
//! ```
//!
//! `sorted*` materialize immediately and return an
//! [`OrderedCollectable`] with fresh timestamps `0..N`.

use crate::collectable::{Arrangement, OrderedCollectable};
use crate::generator::{Element, Generator, SharedGenerator, Timestamp, Timestamped};
use crate::semantic::Semantic;
use anyhow::Result;
use rayon::prelude::*;
use std::cell::Cell;
use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Rewrites the timestamp handed to `accept` as `f(&e, ts)`.
struct RedirectGen<E, F> {
    upstream: SharedGenerator<E>,
    f: F,
}
impl<E, F> Generator<E> for RedirectGen<E, F>
where
    E: Element,
    F: Fn(&E, Timestamp) -> Timestamp + Send + Sync,
{
    fn generate(
        &self,
        accept: &mut dyn FnMut(E, Timestamp),
        interrupt: &mut dyn FnMut(&E) -> bool,
    ) -> Result<()> {
        self.upstream.generate(
            &mut |e, ts| {
                let ts = (self.f)(&e, ts);
                accept(e, ts);
            },
            interrupt,
        )
    }
}

struct ReindexGen<E> {
    upstream: SharedGenerator<E>,
}
impl<E: Element> Generator<E> for ReindexGen<E> {
    fn generate(
        &self,
        accept: &mut dyn FnMut(E, Timestamp),
        interrupt: &mut dyn FnMut(&E) -> bool,
    ) -> Result<()> {
        let next = Cell::new(0 as Timestamp);
        self.upstream.generate(
            &mut |e, _| {
                let ts = next.get();
                next.set(ts + 1);
                accept(e, ts);
            },
            interrupt,
        )
    }
}

fn hash_of<K: Hash>(key: &K) -> Timestamp {
    let mut h = DefaultHasher::new();
    key.hash(&mut h);
    h.finish() as Timestamp
}

impl<E: Element> Semantic<E> {
    /// Replace every timestamp with `f(&element, timestamp)`.
    #[must_use]
    pub fn redirect<F>(&self, f: F) -> Semantic<E>
    where
        F: Fn(&E, Timestamp) -> Timestamp + Send + Sync + 'static,
    {
        self.derive(RedirectGen {
            upstream: self.generator(),
            f,
        })
    }

    /// Negate timestamps, so ordered views come out back to front.
    #[must_use]
    pub fn reverse(&self) -> Semantic<E> {
        self.redirect(|_, ts| ts.wrapping_neg())
    }

    /// Random timestamps. Each run draws new ones.
    #[must_use]
    pub fn shuffle(&self) -> Semantic<E> {
        self.redirect(|_, _| rand::random::<Timestamp>())
    }

    /// Timestamps derived from the hash of `key(&e)`: a fixed pseudo-random
    /// order, equal keys adjacent.
    #[must_use]
    pub fn shuffle_by<K, F>(&self, key: F) -> Semantic<E>
    where
        K: Hash,
        F: Fn(&E) -> K + Send + Sync + 'static,
    {
        self.redirect(move |e, _| hash_of(&key(e)))
    }

    /// Shift every timestamp by `offset`.
    #[must_use]
    pub fn translate(&self, offset: Timestamp) -> Semantic<E> {
        self.redirect(move |_, ts| ts.wrapping_add(offset))
    }

    /// Shift each timestamp by an element-dependent amount.
    #[must_use]
    pub fn offset<F>(&self, f: F) -> Semantic<E>
    where
        F: Fn(&E) -> Timestamp + Send + Sync + 'static,
    {
        self.redirect(move |e, ts| ts.wrapping_add(f(e)))
    }

    /// Renumber timestamps `0, 1, 2, ...` in emission order, discarding any
    /// earlier re-indexing.
    #[must_use]
    pub fn reindex(&self) -> Semantic<E> {
        self.derive(ReindexGen {
            upstream: self.generator(),
        })
    }

    /// Materialize and stable-sort by `cmp`; equal elements keep their
    /// timestamp order.
    ///
    /// # Errors
    /// Propagates failures from the source or any stage.
    pub fn sorted_by<F>(&self, cmp: F) -> Result<OrderedCollectable<E>>
    where
        F: Fn(&E, &E) -> Ordering + Sync,
    {
        let ordered = self.to_ordered_with(Arrangement::Natural)?;
        let mut values: Vec<E> = ordered.iter().cloned().collect();
        if self.runner.partitions() > 1 {
            values.par_sort_by(|a, b| cmp(a, b));
        } else {
            values.sort_by(|a, b| cmp(a, b));
        }
        let items = values
            .into_iter()
            .enumerate()
            .map(|(i, v)| Timestamped::new(i as Timestamp, v))
            .collect();
        Ok(OrderedCollectable::from_sorted(
            items,
            self.runner.clone(),
            Arrangement::Natural,
        ))
    }

    /// [`sorted_by`](Self::sorted_by) comparing `key(&e)`.
    ///
    /// # Errors
    /// Propagates failures from the source or any stage.
    pub fn sorted_by_key<K, F>(&self, key: F) -> Result<OrderedCollectable<E>>
    where
        K: Ord,
        F: Fn(&E) -> K + Sync,
    {
        self.sorted_by(|a, b| key(a).cmp(&key(b)))
    }
}

impl<E: Element + Ord> Semantic<E> {
    /// Materialize in ascending order.
    ///
    /// # Errors
    /// Propagates failures from the source or any stage.
    pub fn sorted(&self) -> Result<OrderedCollectable<E>> {
        self.sorted_by(Ord::cmp)
    }
}

