//! Positional and predicate-based slicing of a pipeline.
//!
//! # Overview
//! - [`Semantic::limit`] - at most `n` elements, then stop the source
//! - [`Semantic::skip`] - drop the first `n` elements
//! - [`Semantic::sub`] - emission positions in a half-open range
//! - [`Semantic::take_while`] / [`Semantic::drop_while`] - prefix / suffix by predicate
//!
//! `skip` and `sub` rebase timestamps so the first kept element sits where the
//! first dropped one was. Dropped elements never reach the downstream
//! interrupt.

use crate::generator::{Element, Generator, SharedGenerator, Timestamp};
use crate::semantic::Semantic;
use anyhow::Result;
use std::cell::Cell;

struct LimitGen<E> {
    upstream: SharedGenerator<E>,
    n: usize,
}
impl<E: Element> Generator<E> for LimitGen<E> {
    fn generate(
        &self,
        accept: &mut dyn FnMut(E, Timestamp),
        interrupt: &mut dyn FnMut(&E) -> bool,
    ) -> Result<()> {
        let taken = Cell::new(0usize);
        self.upstream.generate(
            &mut |e, ts| {
                taken.set(taken.get() + 1);
                accept(e, ts);
            },
            &mut |e| taken.get() >= self.n || interrupt(e),
        )
    }
}

/// Keeps emission positions `lo..hi`, rebasing timestamps by `-lo`.
struct RangeGen<E> {
    upstream: SharedGenerator<E>,
    lo: usize,
    hi: Option<usize>,
}
impl<E: Element> Generator<E> for RangeGen<E> {
    fn generate(
        &self,
        accept: &mut dyn FnMut(E, Timestamp),
        interrupt: &mut dyn FnMut(&E) -> bool,
    ) -> Result<()> {
        let seen = Cell::new(0usize);
        let shift = self.lo as Timestamp;
        self.upstream.generate(
            &mut |e, ts| {
                let pos = seen.get();
                seen.set(pos + 1);
                if pos >= self.lo {
                    accept(e, ts.wrapping_sub(shift));
                }
            },
            &mut |e| {
                let pos = seen.get();
                if self.hi.is_some_and(|hi| pos >= hi) {
                    return true;
                }
                pos >= self.lo && interrupt(e)
            },
        )
    }
}

struct TakeWhileGen<E, P> {
    upstream: SharedGenerator<E>,
    pred: P,
}
impl<E, P> Generator<E> for TakeWhileGen<E, P>
where
    E: Element,
    P: Fn(&E) -> bool + Send + Sync,
{
    fn generate(
        &self,
        accept: &mut dyn FnMut(E, Timestamp),
        interrupt: &mut dyn FnMut(&E) -> bool,
    ) -> Result<()> {
        self.upstream
            .generate(accept, &mut |e| !(self.pred)(e) || interrupt(e))
    }
}

struct DropWhileGen<E, P> {
    upstream: SharedGenerator<E>,
    pred: P,
}
impl<E, P> Generator<E> for DropWhileGen<E, P>
where
    E: Element,
    P: Fn(&E) -> bool + Send + Sync,
{
    fn generate(
        &self,
        accept: &mut dyn FnMut(E, Timestamp),
        interrupt: &mut dyn FnMut(&E) -> bool,
    ) -> Result<()> {
        let dropping = Cell::new(true);
        self.upstream.generate(
            &mut |e, ts| {
                if !dropping.get() {
                    accept(e, ts);
                }
            },
            &mut |e| {
                if dropping.get() {
                    if (self.pred)(e) {
                        return false;
                    }
                    dropping.set(false);
                }
                interrupt(e)
            },
        )
    }
}

impl<E: Element> Semantic<E> {
    /// At most `n` elements. The source is interrupted as soon as `n` have
    /// been emitted; `limit(0)` emits nothing.
    #[must_use]
    pub fn limit(&self, n: usize) -> Semantic<E> {
        self.derive(LimitGen {
            upstream: self.generator(),
            n,
        })
    }

    /// Everything after the first `n` elements, timestamps shifted down by `n`.
    #[must_use]
    pub fn skip(&self, n: usize) -> Semantic<E> {
        self.derive(RangeGen {
            upstream: self.generator(),
            lo: n,
            hi: None,
        })
    }

    /// Elements at emission positions in `[min(start, end), max(start, end))`.
    ///
    /// ```ignore
    /// use semflow::*;
    /// assert_eq!(range(0, 10).sub(7, 3).to_vec()?, vec![3, 4, 5, 6]);
    /// ```
    #[must_use]
    pub fn sub(&self, start: usize, end: usize) -> Semantic<E> {
        self.derive(RangeGen {
            upstream: self.generator(),
            lo: start.min(end),
            hi: Some(start.max(end)),
        })
    }

    /// The longest prefix whose elements satisfy `pred`.
    #[must_use]
    pub fn take_while<P>(&self, pred: P) -> Semantic<E>
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.derive(TakeWhileGen {
            upstream: self.generator(),
            pred,
        })
    }

    /// Everything from the first element failing `pred` on.
    #[must_use]
    pub fn drop_while<P>(&self, pred: P) -> Semantic<E>
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.derive(DropWhileGen {
            upstream: self.generator(),
            pred,
        })
    }
}
