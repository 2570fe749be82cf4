//! Basic arithmetic combiners: Count, Sum, Min, Max

use crate::Element;
use crate::collector::CombineFn;
use std::cmp::Ord;
use std::marker::PhantomData;
use std::mem::take;
use std::ops::Add;

/* ===================== Count ===================== */

/// Number of elements.
#[derive(Clone, Copy, Debug, Default)]
pub struct Count;

impl<V> CombineFn<V, usize, usize> for Count {
    fn create(&self) -> usize {
        0
    }

    fn add_input(&self, acc: &mut usize, _v: V) {
        *acc += 1;
    }

    fn merge(&self, acc: &mut usize, other: usize) {
        *acc += other;
    }

    fn finish(&self, acc: usize) -> usize {
        acc
    }
}

/* ===================== Sum<T> ===================== */

/// Sum of values.
///
/// - Accumulator: `T`
/// - Output: `T`
///
/// Requires `T: Add<Output=T> + Default`; an empty stream sums to `T::default()`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sum<T>(pub PhantomData<T>);
impl<T> Sum<T> {
    /// Convenience constructor (same as `Default`).
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> CombineFn<T, T, T> for Sum<T>
where
    T: Element + Add<Output = T> + Default,
{
    fn create(&self) -> T {
        T::default()
    }

    fn add_input(&self, acc: &mut T, v: T) {
        *acc = take(acc) + v;
    }

    fn merge(&self, acc: &mut T, other: T) {
        *acc = take(acc) + other;
    }

    fn finish(&self, acc: T) -> T {
        acc
    }
}

/* ===================== Min<T> ===================== */

/// Minimum value (requires `Ord`).
///
/// Within one accumulator the first of equal minima wins. Through
/// [`Collectable::collect`](crate::Collectable::collect) partials merge in
/// partition order, and parallel partitions interleave by ordinal, so equal
/// minima may resolve to a later emission. Use
/// [`Collectable::min`](crate::Collectable::min) when ties must follow
/// emission order.
///
/// - Accumulator: `Option<T>`
/// - Output: `Option<T>` (`None` for an empty stream)
#[derive(Clone, Copy, Debug, Default)]
pub struct Min<T>(pub PhantomData<T>);
impl<T> Min<T> {
    /// Convenience constructor (same as `Default`).
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> CombineFn<T, Option<T>, Option<T>> for Min<T>
where
    T: Element + Ord,
{
    fn create(&self) -> Option<T> {
        None
    }

    fn add_input(&self, acc: &mut Option<T>, v: T) {
        match acc {
            Some(cur) => {
                if v < *cur {
                    *cur = v
                }
            }
            None => *acc = Some(v),
        }
    }

    fn merge(&self, acc: &mut Option<T>, other: Option<T>) {
        if let Some(b) = other {
            self.add_input(acc, b);
        }
    }

    fn finish(&self, acc: Option<T>) -> Option<T> {
        acc
    }
}

/* ===================== Max<T> ===================== */

/// Maximum value (requires `Ord`). Ties resolve as for [`Min`]; prefer
/// [`Collectable::max`](crate::Collectable::max) for emission-order ties.
///
/// - Accumulator: `Option<T>`
/// - Output: `Option<T>` (`None` for an empty stream)
#[derive(Clone, Copy, Debug, Default)]
pub struct Max<T>(pub PhantomData<T>);
impl<T> Max<T> {
    /// Convenience constructor (same as `Default`).
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> CombineFn<T, Option<T>, Option<T>> for Max<T>
where
    T: Element + Ord,
{
    fn create(&self) -> Option<T> {
        None
    }

    fn add_input(&self, acc: &mut Option<T>, v: T) {
        match acc {
            Some(cur) => {
                if v > *cur {
                    *cur = v
                }
            }
            None => *acc = Some(v),
        }
    }

    fn merge(&self, acc: &mut Option<T>, other: Option<T>) {
        if let Some(b) = other {
            self.add_input(acc, b);
        }
    }

    fn finish(&self, acc: Option<T>) -> Option<T> {
        acc
    }
}
