//! The fold protocol terminals are expressed in.
//!
//! [`CombineFn`] is the four-step fold every aggregation uses:
//! `create` an accumulator, `add_input` elements into it, `merge` partial
//! accumulators from different partitions, `finish` into the output.
//! Sequential execution never calls `merge`; parallel execution folds each
//! partition from its own `create()` and merges the partials in partition
//! order. For both to agree, `merge` must be associative and `create()` must
//! be a unit for it. This is a precondition, not something that can be
//! checked: violating it gives an unspecified (but non-crashing) result.
//!
//! [`Collector`] builds a `CombineFn` from four closures when a one-off fold
//! doesn't warrant its own type.

use crate::generator::Timestamp;
use std::sync::Arc;

pub trait CombineFn<V, A, O>: Send + Sync + 'static {
    fn create(&self) -> A;
    fn add_input(&self, acc: &mut A, v: V);
    fn merge(&self, acc: &mut A, other: A);
    fn finish(&self, acc: A) -> O;

    /// Timestamp-aware accumulation; defaults to [`CombineFn::add_input`].
    fn add_timestamped(&self, acc: &mut A, v: V, _ts: Timestamp) {
        self.add_input(acc, v);
    }

    /// `true` once `acc` can no longer change the result, letting the
    /// partition stop early.
    fn is_done(&self, _acc: &A) -> bool {
        false
    }
}

type Identity<A> = Arc<dyn Fn() -> A + Send + Sync>;
type Accumulate<A, E> = Arc<dyn Fn(&mut A, E) + Send + Sync>;
type Combine<A> = Arc<dyn Fn(&mut A, A) + Send + Sync>;
type Finish<A, R> = Arc<dyn Fn(A) -> R + Send + Sync>;
type Interrupt<A> = Arc<dyn Fn(&A) -> bool + Send + Sync>;

/// A fold assembled from closures: identity, accumulator, combiner, finisher.
///
/// ```ignore
/// use semflow::*;
///
/// let longest = Collector::new(
///     String::new,
///     |acc: &mut String, s: String| if s.len() > acc.len() { *acc = s },
///     |acc: &mut String, other: String| if other.len() > acc.len() { *acc = other },
///     |acc: String| acc,
/// );
/// let out = of(vec!["a".to_string(), "ccc".into(), "bb".into()]).collect(longest)?;
/// assert_eq!(out, "ccc");
/// # anyhow::Result::<()>::Ok(())
/// ```
pub struct Collector<E, A, R> {
    identity: Identity<A>,
    accumulator: Accumulate<A, E>,
    combiner: Combine<A>,
    finisher: Finish<A, R>,
    interrupt: Option<Interrupt<A>>,
}

impl<E, A, R> Clone for Collector<E, A, R> {
    fn clone(&self) -> Self {
        Self {
            identity: Arc::clone(&self.identity),
            accumulator: Arc::clone(&self.accumulator),
            combiner: Arc::clone(&self.combiner),
            finisher: Arc::clone(&self.finisher),
            interrupt: self.interrupt.clone(),
        }
    }
}

impl<E, A, R> Collector<E, A, R> {
    pub fn new<I, F, C, Z>(identity: I, accumulator: F, combiner: C, finisher: Z) -> Self
    where
        I: Fn() -> A + Send + Sync + 'static,
        F: Fn(&mut A, E) + Send + Sync + 'static,
        C: Fn(&mut A, A) + Send + Sync + 'static,
        Z: Fn(A) -> R + Send + Sync + 'static,
    {
        Self {
            identity: Arc::new(identity),
            accumulator: Arc::new(accumulator),
            combiner: Arc::new(combiner),
            finisher: Arc::new(finisher),
            interrupt: None,
        }
    }

    /// Stop a partition as soon as `done(&acc)` holds.
    #[must_use]
    pub fn with_interrupt<P>(mut self, done: P) -> Self
    where
        P: Fn(&A) -> bool + Send + Sync + 'static,
    {
        self.interrupt = Some(Arc::new(done));
        self
    }
}

impl<E, A, R> CombineFn<E, A, R> for Collector<E, A, R>
where
    E: 'static,
    A: 'static,
    R: 'static,
{
    fn create(&self) -> A {
        (self.identity)()
    }

    fn add_input(&self, acc: &mut A, v: E) {
        (self.accumulator)(acc, v);
    }

    fn merge(&self, acc: &mut A, other: A) {
        (self.combiner)(acc, other);
    }

    fn finish(&self, acc: A) -> R {
        (self.finisher)(acc)
    }

    fn is_done(&self, acc: &A) -> bool {
        self.interrupt.as_ref().is_some_and(|p| p(acc))
    }
}
