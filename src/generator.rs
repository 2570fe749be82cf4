//! The push-style generator contract every pipeline stage closes over.
//!
//! A [`Generator<E>`] drives one traversal of a logical sequence by calling an
//! `accept` callback with `(element, timestamp)` pairs. Before each emission it
//! asks an `interrupt` predicate whether to stop:
//!
//! 1. `interrupt(&e)` is called for the element about to be emitted;
//! 2. if it returns `true`, the generator returns immediately without calling
//!    `accept` for `e` (or anything after it);
//! 3. otherwise `accept(e, ts)` is called exactly once for `e`.
//!
//! Combinators rely on this pairing: whatever an `interrupt` call decides
//! about an element is what the following `accept` call sees.
//!
//! Timestamps are logical indices, not positions. Sources number their
//! elements `0..N` in emission order; re-indexing stages (`reverse`,
//! `redirect`, `shuffle`, ...) only rewrite the timestamp handed to `accept`.
//! Ordered consumers later sort by timestamp to recover a logical order.
//!
//! Generators are shared as [`SharedGenerator`] (an `Arc`) and are immutable:
//! any per-run state lives inside `generate`, so the same generator may be
//! driven again, or by several workers at once.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Logical index attached to each emitted element.
pub type Timestamp = i64;

/// Bound shared by every element type flowing through a pipeline.
pub trait Element: 'static + Send + Sync + Clone {}
impl<T> Element for T where T: 'static + Send + Sync + Clone {}

/// A push-style, re-runnable traversal.
pub trait Generator<E>: Send + Sync {
    /// Run one traversal. See the [module docs](self) for the
    /// `accept`/`interrupt` protocol.
    ///
    /// # Errors
    /// Only fallible sources (readers) and stages that drive nested pipelines
    /// fail; the error aborts the traversal and surfaces from the terminal.
    fn generate(
        &self,
        accept: &mut dyn FnMut(E, Timestamp),
        interrupt: &mut dyn FnMut(&E) -> bool,
    ) -> Result<()>;
}

impl<E, F> Generator<E> for F
where
    F: Fn(&mut dyn FnMut(E, Timestamp), &mut dyn FnMut(&E) -> bool) -> Result<()> + Send + Sync,
{
    fn generate(
        &self,
        accept: &mut dyn FnMut(E, Timestamp),
        interrupt: &mut dyn FnMut(&E) -> bool,
    ) -> Result<()> {
        self(accept, interrupt)
    }
}

/// Reference-counted generator handle.
pub type SharedGenerator<E> = Arc<dyn Generator<E>>;

/// An element together with the timestamp it was emitted with.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Timestamped<T> {
    pub ts: Timestamp,
    pub value: T,
}

impl<T> Timestamped<T> {
    #[inline]
    pub fn new(ts: Timestamp, value: T) -> Self {
        Self { ts, value }
    }
}

/// Drive `generator` to completion, collecting every emission in order.
pub(crate) fn drain<E>(generator: &dyn Generator<E>) -> Result<Vec<Timestamped<E>>> {
    let mut out = Vec::new();
    generator.generate(&mut |e, ts| out.push(Timestamped::new(ts, e)), &mut |_| false)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_generators() {
        let g = |accept: &mut dyn FnMut(u8, Timestamp), interrupt: &mut dyn FnMut(&u8) -> bool| {
            for (i, v) in [7u8, 8, 9].into_iter().enumerate() {
                if interrupt(&v) {
                    break;
                }
                accept(v, i as Timestamp);
            }
            Ok::<(), anyhow::Error>(())
        };
        let out = drain(&g).unwrap();
        assert_eq!(
            out,
            vec![Timestamped::new(0, 7), Timestamped::new(1, 8), Timestamped::new(2, 9)]
        );
    }
}
