//! Built-in combiners for [`Collectable::collect`](crate::Collectable::collect).
//!
//! Each is a reusable [`CombineFn`](crate::CombineFn) over a stream of
//! elements:
//!
//! - [`Count`] -- number of elements.
//! - [`Sum<T>`] -- sum of values.
//! - [`Min<T>`] / [`Max<T>`] -- smallest / largest value, `None` when empty.
//! - [`AverageF64`] -- arithmetic mean as `f64`, `0.0` when empty.
//! - [`ToVec<T>`] / [`ToSet<T>`] / [`ToHashSet<T>`] -- gather into a container.
//! - [`ToMap`] / [`GroupBy`] -- keyed maps (`BTreeMap`).
//! - [`AnyMatch`] / [`AllMatch`] -- predicate tests that stop early.
//! - [`Joining`] -- `Display` rendering with prefix, delimiter and suffix.
//!
//! Every combiner's `merge` is associative with `create()` as its unit, so
//! sequential and parallel execution agree.
//!
//! # Examples
//! ```ignore
//! use semflow::*;
//! use semflow::combiners::{Sum, Max, AverageF64};
//!
//! let s = range(1u64, 5).collect(Sum::<u64>::default())?;
//! assert_eq!(s, 10);
//!
//! let mx = of(vec![3u32, 9, 4]).parallel_with(2).collect(Max::<u32>::default())?;
//! assert_eq!(mx, Some(9));
//!
//! let avg = of(vec![1u32, 2, 3]).collect(AverageF64)?;
//! assert_eq!(avg, 2.0);
//! # anyhow::Result::<()>::Ok(())
//! ```

mod basic;
mod collections;
mod keyed;
mod predicates;
mod statistical;

pub use basic::{Count, Max, Min, Sum};
pub use collections::{ToHashSet, ToSet, ToVec};
pub use keyed::{GroupBy, ToMap};
pub use predicates::{AllMatch, AnyMatch, Joining};
pub use statistical::AverageF64;
