//! # Semflow
//!
//! A **lazy data pipeline library** for Rust. A pipeline is a chain of
//! push-style generators: nothing runs until a terminal operation
//! (`to_vec`, `count`, `collect`, ...) drives the source, and the same
//! pipeline can be driven again.
//!
//! ## Key Features
//!
//! - **Lazy, re-runnable pipelines** - stages only describe work; every terminal call runs it
//! - **Timestamps** - each element carries a logical index that re-indexing stages rewrite
//! - **Short-circuiting** - `limit`, `take_while`, `any_match`, `find_first` stop the source early
//! - **Built-in combiners** - Count, Sum, Min, Max, AverageF64, ToVec, ToMap, GroupBy, Joining, and more
//! - **Sequential and parallel execution** - parallel terminals run on a shared [`TaskPool`]
//! - **Ordered views** - sort by timestamp, then window or compute statistics
//! - **Reader sources** - bytes, chunks, lines, delimited fields (feature `io-streams`)
//!
//! ## Quick Start
//!
//! ```ignore
//! use semflow::*;
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let words = of(vec!["hello world".to_string(), "hello rust".to_string()])
//!     .flat_map(|line: &String| of(line.split_whitespace().map(String::from).collect()));
//!
//! let counts = words.group(|w| w.clone())?;
//! assert_eq!(counts["hello"].len(), 2);
//!
//! let total = range(0u64, 1_000).parallel_with(4).collect(Sum::<u64>::new())?;
//! assert_eq!(total, 499_500);
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Generators
//!
//! A [`Generator<E>`] calls `accept(element, timestamp)` for each element,
//! after asking `interrupt(&element)` whether to stop. Any
//! `Fn(&mut dyn FnMut(E, Timestamp), &mut dyn FnMut(&E) -> bool) -> Result<()>`
//! closure is a generator; [`iterate`] turns one into a pipeline.
//!
//! ### Semantic
//!
//! A [`Semantic<E>`] is one pipeline stage: a shared generator plus the
//! [`Runner`] that says how terminals execute. Stages are cheap to clone.
//!
//! #### Element-wise
//! - [`filter`](Semantic::filter), [`map`](Semantic::map), [`flat_map`](Semantic::flat_map), [`peek`](Semantic::peek)
//! - [`concat`](Semantic::concat) - one pipeline after another
//!
//! #### Slicing
//! - [`limit`](Semantic::limit), [`skip`](Semantic::skip), [`sub`](Semantic::sub)
//! - [`take_while`](Semantic::take_while), [`drop_while`](Semantic::drop_while)
//! - [`distinct`](Semantic::distinct), [`distinct_by`](Semantic::distinct_by)
//!
//! #### Re-indexing
//! - [`redirect`](Semantic::redirect), [`reverse`](Semantic::reverse), [`shuffle`](Semantic::shuffle),
//!   [`translate`](Semantic::translate), [`reindex`](Semantic::reindex)
//! - [`sorted`](Semantic::sorted), [`sorted_by`](Semantic::sorted_by) - materialize and renumber
//!
//! ### Collectables
//!
//! Terminals live on the [`Collectable`] trait, implemented by [`Semantic`],
//! [`UnorderedCollectable`] and [`OrderedCollectable`]. An ordered view is
//! materialized once, sorted by timestamp, and can be windowed
//! ([`WindowCollectable`]) or summarized ([`Statistics`]).
//!
//! ### Combiners
//!
//! The [`combiners`] module provides reusable folds for
//! [`collect`](Collectable::collect). Implement [`CombineFn`] for your own, or
//! build a one-off fold with [`Collector`].
//!
//! ### Execution Modes
//!
//! - **Sequential** - [`sequential()`](Semantic::sequential), the default
//! - **Parallel** - [`parallel()`](Semantic::parallel) / [`parallel_with(n)`](Semantic::parallel_with)
//!
//! Terminals with an output order give the same result in both modes.
//!
//! ## Feature Flags
//!
//! - `metrics` - Enable [`collect_with_metrics`](Collectable::collect_with_metrics)
//! - `io-streams` - Enable reader-backed sources
//!
//! ## Module Overview
//!
//! - [`semantic`] - The pipeline stage type and element-wise stages
//! - [`collectable`] - Terminal operations and the unordered/ordered views
//! - [`combiners`] - Built-in aggregation functions
//! - [`runner`] / [`pool`] - Execution settings and the worker pool
//! - [`window`] / [`statistics`] - Views over ordered data
//! - [`helpers`] - Sources
//! - [`testing`] - Assertions and fixtures for tests

pub mod collectable;
pub mod collector;
pub mod combiners;
pub mod error;
pub mod format;
pub mod generator;
pub mod helpers;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod pool;
pub mod runner;
pub mod semantic;
pub mod statistics;
pub mod testing;
pub mod window;

// General re-exports
pub use collectable::{Arrangement, Collectable, Emission, OrderedCollectable, UnorderedCollectable};
pub use collector::{CombineFn, Collector};
pub use combiners::{
    AllMatch, AnyMatch, AverageF64, Count, GroupBy, Joining, Max, Min, Sum, ToHashSet, ToMap, ToSet, ToVec,
};
pub use error::{PoolError, PoolResult};
pub use generator::{Element, Generator, SharedGenerator, Timestamp, Timestamped};
pub use helpers::*;
pub use pool::{TaskHandle, TaskPool, is_worker_thread};
pub use runner::{ExecMode, Runner};
pub use semantic::Semantic;
pub use statistics::{Metric, Numeric, Statistics};
pub use window::{Window, WindowCollectable};

// Gated re-exports
#[cfg(feature = "metrics")]
pub use metrics::ExecutionMetrics;
