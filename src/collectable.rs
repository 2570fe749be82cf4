//! Aggregation views and the terminal operations they share.
//!
//! [`Collectable`] is implemented by three views:
//!
//! - [`Semantic`] itself, so terminals can be called straight on a pipeline;
//! - [`UnorderedCollectable`], the lazy view returned by
//!   [`Semantic::to_unordered`]. Each terminal call runs the generator again.
//!   With `N` partitions, every partition drives the generator and folds the
//!   emissions whose ordinal is congruent to its index modulo `N`;
//! - [`OrderedCollectable`], materialized once into a timestamp-sorted buffer.
//!   Parallel folds split that buffer into `N` contiguous chunks.
//!
//! Implementors only provide [`Collectable::fold_partitions`]; every terminal
//! is built on top of it. Terminals whose output has an order (`to_vec`,
//! `group`, `partition`, `join`, ...) re-sequence partial results by emission
//! ordinal, so they return the same value sequentially and in parallel.
//! [`Collectable::collect`] merges partials in partition order and relies on
//! the combiner being associative and commutative for that guarantee.

use crate::collector::CombineFn;
use crate::combiners::{Count, ToHashSet, ToSet};
use crate::format;
use crate::generator::{Element, SharedGenerator, Timestamp, Timestamped};
use crate::runner::Runner;
use crate::semantic::Semantic;
use crate::statistics::{Numeric, Statistics};
use crate::window::WindowCollectable;
use anyhow::Result;
use rayon::prelude::*;
use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::fmt::Display;
use std::hash::Hash;
use std::io::Write;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// One element as seen by a partition fold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Emission<E> {
    pub value: E,
    /// Timestamp the element carried when it reached the view.
    pub ts: Timestamp,
    /// Position in the view's emission order, `0..N`.
    pub ordinal: usize,
}

#[inline]
fn flow(stop: bool) -> ControlFlow<()> {
    if stop {
        ControlFlow::Break(())
    } else {
        ControlFlow::Continue(())
    }
}

fn merge_partials<V, A, O, C>(combiner: &C, partials: Vec<A>) -> O
where
    C: CombineFn<V, A, O> + ?Sized,
{
    let mut it = partials.into_iter();
    let mut acc = it.next().unwrap_or_else(|| combiner.create());
    for p in it {
        combiner.merge(&mut acc, p);
    }
    combiner.finish(acc)
}

pub trait Collectable<E: Element> {
    fn runner(&self) -> &Runner;

    /// Fold every partition from its own `identity()` and return the partial
    /// accumulators in partition order.
    ///
    /// `step` returning `Break` stops that partition early.
    ///
    /// # Errors
    /// Fails when the source fails or a partition task panics.
    fn fold_partitions<A, I, S>(&self, identity: I, step: S) -> Result<Vec<A>>
    where
        A: Send + 'static,
        I: Fn() -> A + Send + Sync + 'static,
        S: Fn(&mut A, Emission<E>) -> ControlFlow<()> + Send + Sync + 'static;

    /// Fold with a [`CombineFn`]: one accumulator per partition, merged in
    /// partition order, then finished.
    ///
    /// # Errors
    /// Fails when the source fails or a partition task panics.
    fn collect<A, O, C>(&self, combiner: C) -> Result<O>
    where
        A: Send + 'static,
        C: CombineFn<E, A, O>,
    {
        let c = Arc::new(combiner);
        let (create, fold) = (Arc::clone(&c), Arc::clone(&c));
        let partials = self.fold_partitions(
            move || create.create(),
            move |acc, em| {
                fold.add_timestamped(acc, em.value, em.ts);
                flow(fold.is_done(acc))
            },
        )?;
        Ok(merge_partials::<E, A, O, C>(&*c, partials))
    }

    /// Like [`collect`](Self::collect), also reporting how the fold ran.
    ///
    /// # Errors
    /// Fails when the source fails or a partition task panics.
    #[cfg(feature = "metrics")]
    fn collect_with_metrics<A, O, C>(&self, combiner: C) -> Result<(O, crate::metrics::ExecutionMetrics)>
    where
        A: Send + 'static,
        C: CombineFn<E, A, O>,
    {
        use std::sync::atomic::AtomicUsize;
        let started = std::time::Instant::now();
        let folded = Arc::new(AtomicUsize::new(0));
        let c = Arc::new(combiner);
        let (create, fold, seen) = (Arc::clone(&c), Arc::clone(&c), Arc::clone(&folded));
        let partials = self.fold_partitions(
            move || create.create(),
            move |acc, em| {
                seen.fetch_add(1, Ordering::Relaxed);
                fold.add_timestamped(acc, em.value, em.ts);
                flow(fold.is_done(acc))
            },
        )?;
        let partitions = partials.len();
        let out = merge_partials::<E, A, O, C>(&*c, partials);
        let metrics = crate::metrics::ExecutionMetrics::new(
            self.runner().mode,
            partitions,
            folded.load(Ordering::Relaxed),
            started.elapsed(),
        );
        Ok((out, metrics))
    }

    /// Number of elements.
    ///
    /// # Errors
    /// Fails when the source fails.
    fn count(&self) -> Result<usize> {
        self.collect(Count)
    }

    /// Call `f` on every element. In parallel the calls come from several
    /// threads in no particular order.
    ///
    /// # Errors
    /// Fails when the source fails.
    fn for_each<F>(&self, f: F) -> Result<()>
    where
        F: Fn(E) + Send + Sync + 'static,
    {
        self.fold_partitions(
            || (),
            move |_, em| {
                f(em.value);
                ControlFlow::Continue(())
            },
        )?;
        Ok(())
    }

    /// Elements in emission order.
    ///
    /// # Errors
    /// Fails when the source fails.
    fn to_vec(&self) -> Result<Vec<E>> {
        let partials = self.fold_partitions(Vec::new, |acc: &mut Vec<(usize, E)>, em| {
            acc.push((em.ordinal, em.value));
            ControlFlow::Continue(())
        })?;
        let interleaved = partials.len() > 1;
        let mut rows: Vec<(usize, E)> = partials.into_iter().flatten().collect();
        if interleaved {
            rows.sort_unstable_by_key(|(ordinal, _)| *ordinal);
        }
        Ok(rows.into_iter().map(|(_, v)| v).collect())
    }

    /// # Errors
    /// Fails when the source fails.
    fn to_list(&self) -> Result<VecDeque<E>> {
        Ok(self.to_vec()?.into())
    }

    /// # Errors
    /// Fails when the source fails.
    fn to_set(&self) -> Result<BTreeSet<E>>
    where
        E: Ord,
    {
        self.collect(ToSet::new())
    }

    /// # Errors
    /// Fails when the source fails.
    fn to_hash_set(&self) -> Result<HashSet<E>>
    where
        E: Eq + Hash,
    {
        self.collect(ToHashSet::new())
    }

    /// Key/value map; for duplicate keys the value of the last element in
    /// emission order wins.
    ///
    /// # Errors
    /// Fails when the source fails.
    fn to_map<K, V, KF, VF>(&self, key: KF, value: VF) -> Result<BTreeMap<K, V>>
    where
        K: Ord,
        KF: Fn(&E) -> K,
        VF: Fn(&E) -> V,
    {
        let mut out = BTreeMap::new();
        for e in self.to_vec()? {
            out.insert(key(&e), value(&e));
        }
        Ok(out)
    }

    /// Elements grouped by `key`, each group in emission order.
    ///
    /// # Errors
    /// Fails when the source fails.
    fn group<K, KF>(&self, key: KF) -> Result<BTreeMap<K, Vec<E>>>
    where
        K: Ord,
        KF: Fn(&E) -> K,
    {
        self.group_by(key, E::clone)
    }

    /// Values extracted by `value`, grouped by `key`.
    ///
    /// # Errors
    /// Fails when the source fails.
    fn group_by<K, V, KF, VF>(&self, key: KF, value: VF) -> Result<BTreeMap<K, Vec<V>>>
    where
        K: Ord,
        KF: Fn(&E) -> K,
        VF: Fn(&E) -> V,
    {
        let mut out: BTreeMap<K, Vec<V>> = BTreeMap::new();
        for e in self.to_vec()? {
            out.entry(key(&e)).or_default().push(value(&e));
        }
        Ok(out)
    }

    /// Consecutive chunks of `size` elements; the last chunk may be shorter.
    ///
    /// # Errors
    /// Fails when `size` is zero or the source fails.
    fn partition(&self, size: usize) -> Result<Vec<Vec<E>>> {
        anyhow::ensure!(size > 0, "partition size must be positive");
        Ok(self.to_vec()?.chunks(size).map(<[E]>::to_vec).collect())
    }

    /// Buckets by `classifier`, ordered by bucket number; empty buckets are
    /// not represented.
    ///
    /// # Errors
    /// Fails when the source fails.
    fn partition_by<F>(&self, classifier: F) -> Result<Vec<Vec<E>>>
    where
        F: Fn(&E) -> usize,
    {
        Ok(self.group(classifier)?.into_values().collect())
    }

    /// Combine all elements with `f`; `None` for an empty view.
    ///
    /// Partials are combined in partition order, so in parallel `f` must be
    /// associative and commutative.
    ///
    /// # Errors
    /// Fails when the source fails.
    fn reduce<F>(&self, f: F) -> Result<Option<E>>
    where
        F: Fn(E, E) -> E + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let step = Arc::clone(&f);
        let partials = self.fold_partitions(
            || None,
            move |acc: &mut Option<E>, em| {
                *acc = Some(match acc.take() {
                    Some(prev) => step(prev, em.value),
                    None => em.value,
                });
                ControlFlow::Continue(())
            },
        )?;
        Ok(partials.into_iter().flatten().reduce(|a, b| f(a, b)))
    }

    /// Left fold in emission order, starting from `init`.
    ///
    /// # Errors
    /// Fails when the source fails.
    fn fold<R, F>(&self, init: R, f: F) -> Result<R>
    where
        F: Fn(R, E) -> R,
    {
        Ok(self.to_vec()?.into_iter().fold(init, f))
    }

    /// `true` if some element satisfies `pred`; stops every partition once
    /// one match is seen.
    ///
    /// # Errors
    /// Fails when the source fails.
    fn any_match<P>(&self, pred: P) -> Result<bool>
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        let hit = Arc::new(AtomicBool::new(false));
        let seen = Arc::clone(&hit);
        self.fold_partitions(
            || (),
            move |_, em| {
                if seen.load(Ordering::Acquire) {
                    return ControlFlow::Break(());
                }
                let found = pred(&em.value);
                if found {
                    seen.store(true, Ordering::Release);
                }
                flow(found)
            },
        )?;
        Ok(hit.load(Ordering::Acquire))
    }

    /// `true` if every element satisfies `pred` (vacuously for empty views).
    ///
    /// # Errors
    /// Fails when the source fails.
    fn all_match<P>(&self, pred: P) -> Result<bool>
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Ok(!self.any_match(move |e| !pred(e))?)
    }

    /// # Errors
    /// Fails when the source fails.
    fn none_match<P>(&self, pred: P) -> Result<bool>
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Ok(!self.any_match(pred)?)
    }

    /// The first element in emission order.
    ///
    /// Each partition stops at its own first element and the partials are
    /// compared by ordinal, so the result is the same in parallel.
    ///
    /// # Errors
    /// Fails when the source fails.
    fn find_first(&self) -> Result<Option<E>> {
        let partials = self.fold_partitions(
            || None,
            |acc: &mut Option<(usize, E)>, em| {
                *acc = Some((em.ordinal, em.value));
                ControlFlow::Break(())
            },
        )?;
        Ok(partials
            .into_iter()
            .flatten()
            .min_by_key(|(ordinal, _)| *ordinal)
            .map(|(_, v)| v))
    }

    /// Some element, whichever partition reaches one first.
    ///
    /// # Errors
    /// Fails when the source fails.
    fn find_any(&self) -> Result<Option<E>> {
        let found = Arc::new(AtomicBool::new(false));
        let partials = self.fold_partitions(
            || None,
            move |acc: &mut Option<E>, em| {
                if !found.swap(true, Ordering::AcqRel) {
                    *acc = Some(em.value);
                }
                ControlFlow::Break(())
            },
        )?;
        Ok(partials.into_iter().flatten().next())
    }

    /// Smallest element. Among equal minima the earliest emitted wins,
    /// sequentially and in parallel.
    ///
    /// # Errors
    /// Fails when the source fails.
    fn min(&self) -> Result<Option<E>>
    where
        E: Ord,
    {
        first_extreme(self, |a: &E, b: &E| a < b)
    }

    /// Largest element, the earliest emitted among equal maxima.
    ///
    /// # Errors
    /// Fails when the source fails.
    fn max(&self) -> Result<Option<E>>
    where
        E: Ord,
    {
        first_extreme(self, |a: &E, b: &E| a > b)
    }

    /// `"[a,b,c]"`.
    ///
    /// # Errors
    /// Fails when the source fails.
    fn join(&self) -> Result<String>
    where
        E: Display,
    {
        self.join_with("[", ",", "]")
    }

    /// # Errors
    /// Fails when the source fails.
    fn join_with(&self, prefix: &str, delimiter: &str, suffix: &str) -> Result<String>
    where
        E: Display,
    {
        self.join_by(prefix, delimiter, suffix, ToString::to_string)
    }

    /// Join elements rendered by `formatter`.
    ///
    /// # Errors
    /// Fails when the source fails.
    fn join_by<F>(&self, prefix: &str, delimiter: &str, suffix: &str, formatter: F) -> Result<String>
    where
        F: Fn(&E) -> String,
    {
        let values = self.to_vec()?;
        Ok(format::render(&values, prefix, delimiter, suffix, formatter))
    }

    /// Write [`join`](Self::join) to `out`.
    ///
    /// # Errors
    /// Fails when the source or the writer fails.
    fn write_to<W>(&self, out: &mut W) -> Result<()>
    where
        W: Write,
        E: Display,
    {
        format::write_line(out, &self.join()?)
    }

    /// Print [`join`](Self::join) to stdout.
    ///
    /// # Errors
    /// Fails when the source or stdout fails.
    fn cout(&self) -> Result<()>
    where
        E: Display,
    {
        self.write_to(&mut std::io::stdout().lock())
    }
}

/// The element no other element beats, earliest in emission order on ties.
fn first_extreme<E, C>(view: &C, beats: fn(&E, &E) -> bool) -> Result<Option<E>>
where
    E: Element,
    C: Collectable<E> + ?Sized,
{
    let partials = view.fold_partitions(
        || None,
        move |acc: &mut Option<(usize, E)>, em| {
            if !matches!(acc, Some((_, cur)) if !beats(&em.value, cur)) {
                *acc = Some((em.ordinal, em.value));
            }
            ControlFlow::Continue(())
        },
    )?;
    Ok(partials
        .into_iter()
        .flatten()
        .reduce(|a, b| {
            if beats(&b.1, &a.1) || (!beats(&a.1, &b.1) && b.0 < a.0) { b } else { a }
        })
        .map(|(_, v)| v))
}

/// Fold a generator over `runner`'s partitions by emission ordinal.
pub(crate) fn fold_generator<E, A, I, S>(
    generator: &SharedGenerator<E>,
    runner: &Runner,
    identity: I,
    step: S,
) -> Result<Vec<A>>
where
    E: Element,
    A: Send + 'static,
    I: Fn() -> A + Send + Sync + 'static,
    S: Fn(&mut A, Emission<E>) -> ControlFlow<()> + Send + Sync + 'static,
{
    let generator = Arc::clone(generator);
    runner.run_partitions(runner.partitions(), move |part, parts| {
        let mut acc = identity();
        let mut ordinal = 0usize;
        let done = Cell::new(false);
        generator.generate(
            &mut |value, ts| {
                let o = ordinal;
                ordinal += 1;
                if o % parts == part && step(&mut acc, Emission { value, ts, ordinal: o }).is_break() {
                    done.set(true);
                }
            },
            &mut |_| done.get(),
        )?;
        Ok(acc)
    })
}

impl<E: Element> Collectable<E> for Semantic<E> {
    fn runner(&self) -> &Runner {
        &self.runner
    }

    fn fold_partitions<A, I, S>(&self, identity: I, step: S) -> Result<Vec<A>>
    where
        A: Send + 'static,
        I: Fn() -> A + Send + Sync + 'static,
        S: Fn(&mut A, Emission<E>) -> ControlFlow<()> + Send + Sync + 'static,
    {
        fold_generator(&self.generator, &self.runner, identity, step)
    }
}

/* ===================== UnorderedCollectable ===================== */

/// Lazy aggregation view: every terminal re-runs the generator.
pub struct UnorderedCollectable<E> {
    generator: SharedGenerator<E>,
    runner: Runner,
}

impl<E> Clone for UnorderedCollectable<E> {
    fn clone(&self) -> Self {
        Self {
            generator: Arc::clone(&self.generator),
            runner: self.runner.clone(),
        }
    }
}

impl<E: Element> UnorderedCollectable<E> {
    pub(crate) fn new(generator: SharedGenerator<E>, runner: Runner) -> Self {
        Self { generator, runner }
    }

    /// Back to a pipeline stage over the same generator.
    pub fn into_semantic(self) -> Semantic<E> {
        Semantic {
            generator: self.generator,
            runner: self.runner,
        }
    }
}

impl<E: Element> Collectable<E> for UnorderedCollectable<E> {
    fn runner(&self) -> &Runner {
        &self.runner
    }

    fn fold_partitions<A, I, S>(&self, identity: I, step: S) -> Result<Vec<A>>
    where
        A: Send + 'static,
        I: Fn() -> A + Send + Sync + 'static,
        S: Fn(&mut A, Emission<E>) -> ControlFlow<()> + Send + Sync + 'static,
    {
        fold_generator(&self.generator, &self.runner, identity, step)
    }
}

/* ===================== OrderedCollectable ===================== */

/// How timestamps are normalized before ordering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Arrangement {
    /// Signed timestamp order: `reverse()` (negated timestamps) comes out
    /// back to front.
    #[default]
    Natural,
    /// Timestamps wrapped into `[0, N)` with the Euclidean remainder, `N`
    /// being the element count. `-1` lands on the last slot.
    Wrapping,
}

impl Arrangement {
    fn arrange(self, ts: Timestamp, len: usize) -> Timestamp {
        match self {
            Arrangement::Natural => ts,
            Arrangement::Wrapping => ts.rem_euclid((len as Timestamp).max(1)),
        }
    }
}

/// Materialized, timestamp-ordered view.
///
/// Elements with equal arranged timestamps keep their emission order.
/// Folds see timestamps `0..N` (positions in this order).
pub struct OrderedCollectable<E> {
    items: Arc<Vec<Timestamped<E>>>,
    runner: Runner,
    arrangement: Arrangement,
}

impl<E> Clone for OrderedCollectable<E> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
            runner: self.runner.clone(),
            arrangement: self.arrangement,
        }
    }
}

impl<E: Element> OrderedCollectable<E> {
    /// Drain `source` once and order it by arranged timestamp.
    pub(crate) fn materialize(source: &UnorderedCollectable<E>, arrangement: Arrangement) -> Result<Self> {
        let partials = source.fold_partitions(Vec::new, |acc: &mut Vec<(usize, Timestamped<E>)>, em| {
            acc.push((em.ordinal, Timestamped::new(em.ts, em.value)));
            ControlFlow::Continue(())
        })?;
        let parallel = partials.len() > 1;
        let mut rows: Vec<(usize, Timestamped<E>)> = partials.into_iter().flatten().collect();
        let len = rows.len();
        for (_, row) in &mut rows {
            row.ts = arrangement.arrange(row.ts, len);
        }
        let key = |(ordinal, row): &(usize, Timestamped<E>)| (row.ts, *ordinal);
        if parallel {
            rows.par_sort_unstable_by_key(key);
        } else {
            rows.sort_unstable_by_key(key);
        }
        debug!(elements = len, ?arrangement, parallel, "materialized ordered view");
        Ok(Self::from_sorted(
            rows.into_iter().map(|(_, row)| row).collect(),
            source.runner().clone(),
            arrangement,
        ))
    }

    pub(crate) fn from_sorted(items: Vec<Timestamped<E>>, runner: Runner, arrangement: Arrangement) -> Self {
        Self {
            items: Arc::new(items),
            runner,
            arrangement,
        }
    }

    pub fn arrangement(&self) -> Arrangement {
        self.arrangement
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Element at position `index` in timestamp order.
    pub fn get(&self, index: usize) -> Option<&E> {
        self.items.get(index).map(|t| &t.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> + '_ {
        self.items.iter().map(|t| &t.value)
    }

    /// Entries with their arranged timestamps.
    pub fn as_slice(&self) -> &[Timestamped<E>] {
        &self.items
    }

    /// A pipeline replaying this order with timestamps `0..N`.
    pub fn into_semantic(&self) -> Semantic<E> {
        let items = Arc::clone(&self.items);
        let replay = move |accept: &mut dyn FnMut(E, Timestamp), interrupt: &mut dyn FnMut(&E) -> bool| -> Result<()> {
            for (pos, item) in items.iter().enumerate() {
                if interrupt(&item.value) {
                    break;
                }
                accept(item.value.clone(), pos as Timestamp);
            }
            Ok(())
        };
        Semantic {
            generator: Arc::new(replay),
            runner: self.runner.clone(),
        }
    }

    pub fn to_window(&self) -> WindowCollectable<E> {
        WindowCollectable::new(self.clone())
    }

    pub fn to_statistics(&self) -> Statistics<E, E>
    where
        E: Numeric,
    {
        Statistics::new(self.clone(), |e: &E| *e)
    }

    pub fn to_statistics_by<D, F>(&self, mapper: F) -> Statistics<E, D>
    where
        D: Numeric,
        F: Fn(&E) -> D + Send + Sync + 'static,
    {
        Statistics::new(self.clone(), mapper)
    }
}

impl<E: Element> Collectable<E> for OrderedCollectable<E> {
    fn runner(&self) -> &Runner {
        &self.runner
    }

    fn fold_partitions<A, I, S>(&self, identity: I, step: S) -> Result<Vec<A>>
    where
        A: Send + 'static,
        I: Fn() -> A + Send + Sync + 'static,
        S: Fn(&mut A, Emission<E>) -> ControlFlow<()> + Send + Sync + 'static,
    {
        let items = Arc::clone(&self.items);
        let len = items.len();
        self.runner.run_partitions(self.runner.partitions(), move |part, parts| {
            let chunk = len.div_ceil(parts).max(1);
            let start = (part * chunk).min(len);
            let end = (start + chunk).min(len);
            let mut acc = identity();
            for (ordinal, item) in items[start..end].iter().enumerate().map(|(i, t)| (start + i, t)) {
                let em = Emission {
                    value: item.value.clone(),
                    ts: ordinal as Timestamp,
                    ordinal,
                };
                if step(&mut acc, em).is_break() {
                    break;
                }
            }
            Ok(acc)
        })
    }
}
