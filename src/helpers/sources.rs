//! In-memory sources for building a [`Semantic<E>`].
//!
//! ### Overview
//! - [`empty`] -- no elements.
//! - [`of`] / [`from_vec`] -- owns a `Vec<E>`; [`from_slice`] clones a slice.
//! - [`from_iter`] -- any `IntoIterator` (arrays, `VecDeque`, `BTreeSet`, `HashSet`, ...).
//! - [`fill`] / [`fill_with`] -- `n` copies of a value, or `n` calls of a supplier.
//! - [`range`] / [`range_step`] -- arithmetic progressions over primitive numbers.
//! - [`iterate`] -- any [`Generator`], including a plain closure.
//!
//! Every source numbers its elements `0..N` in emission order and stops at
//! the first element the interrupt rejects. Sources are sequential by default;
//! call [`Semantic::parallel`] to fan terminals out.
//!
//! ### Example
//! ```ignore
//! use semflow::*;
//!
//! let evens = range(0, 10).filter(|n| n % 2 == 0);
//! assert_eq!(evens.to_vec()?, vec![0, 2, 4, 6, 8]);
//!
//! let custom = iterate(|accept: &mut dyn FnMut(u8, Timestamp), interrupt: &mut dyn FnMut(&u8) -> bool| {
//!     for (i, b) in b"hi".iter().copied().enumerate() {
//!         if interrupt(&b) { break; }
//!         accept(b, i as Timestamp);
//!     }
//!     Ok(())
//! });
//! assert_eq!(custom.count()?, 2);
//! ```

use crate::generator::{Element, Generator, Timestamp};
use crate::semantic::Semantic;
use crate::statistics::Numeric;
use anyhow::Result;
use std::sync::Arc;

/// Push every item of `items` through the accept/interrupt protocol.
pub(crate) fn emit_all<E, I>(
    items: I,
    accept: &mut dyn FnMut(E, Timestamp),
    interrupt: &mut dyn FnMut(&E) -> bool,
) where
    I: IntoIterator<Item = E>,
{
    for (i, e) in items.into_iter().enumerate() {
        if interrupt(&e) {
            break;
        }
        accept(e, i as Timestamp);
    }
}

struct VecSource<E> {
    items: Arc<Vec<E>>,
}
impl<E: Element> Generator<E> for VecSource<E> {
    fn generate(
        &self,
        accept: &mut dyn FnMut(E, Timestamp),
        interrupt: &mut dyn FnMut(&E) -> bool,
    ) -> Result<()> {
        emit_all(self.items.iter().cloned(), accept, interrupt);
        Ok(())
    }
}

struct FillWith<F> {
    supplier: F,
    n: usize,
}
impl<E, F> Generator<E> for FillWith<F>
where
    E: Element,
    F: Fn() -> E + Send + Sync,
{
    fn generate(
        &self,
        accept: &mut dyn FnMut(E, Timestamp),
        interrupt: &mut dyn FnMut(&E) -> bool,
    ) -> Result<()> {
        emit_all((0..self.n).map(|_| (self.supplier)()), accept, interrupt);
        Ok(())
    }
}

struct Progression<T> {
    start: T,
    end: T,
    step: T,
}
impl<T> Generator<T> for Progression<T>
where
    T: Numeric,
{
    fn generate(
        &self,
        accept: &mut dyn FnMut(T, Timestamp),
        interrupt: &mut dyn FnMut(&T) -> bool,
    ) -> Result<()> {
        let ascending = self.step > T::ZERO;
        if !ascending && !(self.step < T::ZERO) {
            return Ok(());
        }
        let mut v = self.start;
        let mut ts: Timestamp = 0;
        while (ascending && v < self.end) || (!ascending && v > self.end) {
            if interrupt(&v) {
                break;
            }
            accept(v, ts);
            ts += 1;
            match v.checked_step(self.step) {
                Some(next) => v = next,
                None => break,
            }
        }
        Ok(())
    }
}

/// A pipeline with no elements.
pub fn empty<E: Element>() -> Semantic<E> {
    from_vec(Vec::new())
}

/// A pipeline over `items`, in order.
pub fn of<E: Element>(items: Vec<E>) -> Semantic<E> {
    from_vec(items)
}

pub fn from_vec<E: Element>(items: Vec<E>) -> Semantic<E> {
    Semantic::from_generator(VecSource {
        items: Arc::new(items),
    })
}

pub fn from_slice<E: Element>(items: &[E]) -> Semantic<E> {
    from_vec(items.to_vec())
}

/// Collect `iter` up front; the pipeline replays the collected elements.
pub fn from_iter<E, I>(iter: I) -> Semantic<E>
where
    E: Element,
    I: IntoIterator<Item = E>,
{
    from_vec(iter.into_iter().collect())
}

/// `value` repeated `n` times.
pub fn fill<E: Element>(value: E, n: usize) -> Semantic<E> {
    fill_with(move || value.clone(), n)
}

/// `n` elements produced by calling `supplier` each run.
pub fn fill_with<E, F>(supplier: F, n: usize) -> Semantic<E>
where
    E: Element,
    F: Fn() -> E + Send + Sync + 'static,
{
    Semantic::from_generator(FillWith { supplier, n })
}

/// `start, start + 1, ...` while below `end`.
pub fn range<T>(start: T, end: T) -> Semantic<T>
where
    T: Numeric,
{
    range_step(start, end, T::ONE)
}

/// `start, start + step, ...` while before `end` in the direction of `step`.
/// A zero step yields nothing.
pub fn range_step<T>(start: T, end: T, step: T) -> Semantic<T>
where
    T: Numeric,
{
    Semantic::from_generator(Progression { start, end, step })
}

/// A pipeline driven by `generator`.
pub fn iterate<E, G>(generator: G) -> Semantic<E>
where
    E: Element,
    G: Generator<E> + 'static,
{
    Semantic::from_generator(generator)
}
