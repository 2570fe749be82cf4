use crate::collectable::{Arrangement, OrderedCollectable, UnorderedCollectable};
use crate::generator::{Element, Generator, SharedGenerator, Timestamp};
use crate::pool::TaskPool;
use crate::runner::{ExecMode, Runner};
use anyhow::Result;
use std::cell::Cell;
use std::marker::PhantomData;
use std::sync::Arc;

/// A lazily composed pipeline stage: a shared generator plus the execution
/// settings terminals will use.
///
/// Every method returns a new `Semantic`; nothing is traversed until a
/// terminal ([`Collectable`](crate::Collectable) methods, `to_ordered`,
/// `sorted`, ...) runs. Each terminal re-runs the whole chain from its source.
pub struct Semantic<E> {
    pub(crate) generator: SharedGenerator<E>,
    pub(crate) runner: Runner,
}

impl<E> Clone for Semantic<E> {
    fn clone(&self) -> Self {
        Self {
            generator: Arc::clone(&self.generator),
            runner: self.runner.clone(),
        }
    }
}

/* ===================== Stages ===================== */

struct FilterGen<E, P> {
    upstream: SharedGenerator<E>,
    pred: P,
}
impl<E, P> Generator<E> for FilterGen<E, P>
where
    E: Element,
    P: Fn(&E) -> bool + Send + Sync,
{
    fn generate(
        &self,
        accept: &mut dyn FnMut(E, Timestamp),
        interrupt: &mut dyn FnMut(&E) -> bool,
    ) -> Result<()> {
        let keep = Cell::new(false);
        self.upstream.generate(
            &mut |e, ts| {
                if keep.get() {
                    accept(e, ts);
                }
            },
            &mut |e| {
                let k = (self.pred)(e);
                keep.set(k);
                k && interrupt(e)
            },
        )
    }
}

struct MapGen<I, O, F> {
    upstream: SharedGenerator<I>,
    f: F,
    _o: PhantomData<fn() -> O>,
}
impl<I, O, F> Generator<O> for MapGen<I, O, F>
where
    I: Element,
    O: Element,
    F: Fn(&I) -> O + Send + Sync,
{
    fn generate(
        &self,
        accept: &mut dyn FnMut(O, Timestamp),
        interrupt: &mut dyn FnMut(&O) -> bool,
    ) -> Result<()> {
        // The mapped value is computed once, in `interrupt`, and handed to `accept`.
        let pending: Cell<Option<O>> = Cell::new(None);
        self.upstream.generate(
            &mut |i, ts| {
                let o = match pending.take() {
                    Some(o) => o,
                    None => (self.f)(&i),
                };
                accept(o, ts);
            },
            &mut |i| {
                let o = (self.f)(i);
                let stop = interrupt(&o);
                pending.set(Some(o));
                stop
            },
        )
    }
}

struct FlatMapGen<I, O, F> {
    upstream: SharedGenerator<I>,
    f: F,
    _o: PhantomData<fn() -> O>,
}
impl<I, O, F> Generator<O> for FlatMapGen<I, O, F>
where
    I: Element,
    O: Element,
    F: Fn(&I) -> Semantic<O> + Send + Sync,
{
    fn generate(
        &self,
        accept: &mut dyn FnMut(O, Timestamp),
        interrupt: &mut dyn FnMut(&O) -> bool,
    ) -> Result<()> {
        let next_ts = Cell::new(0 as Timestamp);
        let stopped = Cell::new(false);
        let mut failure = None;
        self.upstream.generate(
            &mut |i, _| {
                let inner = (self.f)(&i);
                let res = inner.generator.generate(
                    &mut |o, _| {
                        let ts = next_ts.get();
                        next_ts.set(ts + 1);
                        accept(o, ts);
                    },
                    &mut |o| {
                        let stop = interrupt(o);
                        if stop {
                            stopped.set(true);
                        }
                        stop
                    },
                );
                if let Err(e) = res {
                    failure = Some(e);
                    stopped.set(true);
                }
            },
            &mut |_| stopped.get(),
        )?;
        failure.map_or(Ok(()), Err)
    }
}

struct PeekGen<E, F> {
    upstream: SharedGenerator<E>,
    f: F,
}
impl<E, F> Generator<E> for PeekGen<E, F>
where
    E: Element,
    F: Fn(&E) + Send + Sync,
{
    fn generate(
        &self,
        accept: &mut dyn FnMut(E, Timestamp),
        interrupt: &mut dyn FnMut(&E) -> bool,
    ) -> Result<()> {
        self.upstream.generate(
            &mut |e, ts| {
                (self.f)(&e);
                accept(e, ts);
            },
            interrupt,
        )
    }
}

struct ConcatGen<E> {
    first: SharedGenerator<E>,
    second: SharedGenerator<E>,
}
impl<E: Element> Generator<E> for ConcatGen<E> {
    fn generate(
        &self,
        accept: &mut dyn FnMut(E, Timestamp),
        interrupt: &mut dyn FnMut(&E) -> bool,
    ) -> Result<()> {
        let emitted = Cell::new(0 as Timestamp);
        let stopped = Cell::new(false);
        self.first.generate(
            &mut |e, ts| {
                emitted.set(emitted.get() + 1);
                accept(e, ts);
            },
            &mut |e| {
                let stop = interrupt(e);
                stopped.set(stop);
                stop
            },
        )?;
        if stopped.get() {
            return Ok(());
        }
        let offset = emitted.get();
        self.second
            .generate(&mut |e, ts| accept(e, ts.wrapping_add(offset)), interrupt)
    }
}

impl<E: Element> Semantic<E> {
    /// Wrap a generator into a sequential pipeline stage.
    pub fn from_generator<G>(generator: G) -> Self
    where
        G: Generator<E> + 'static,
    {
        Self {
            generator: Arc::new(generator),
            runner: Runner::default(),
        }
    }

    /// New stage over `generator` with this stage's execution settings.
    pub(crate) fn derive<O, G>(&self, generator: G) -> Semantic<O>
    where
        G: Generator<O> + 'static,
    {
        Semantic {
            generator: Arc::new(generator),
            runner: self.runner.clone(),
        }
    }

    /// The shared generator behind this stage.
    pub fn generator(&self) -> SharedGenerator<E> {
        Arc::clone(&self.generator)
    }

    /// Execution settings terminals on this pipeline use.
    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    /// Keep elements for which `pred` holds; timestamps are unchanged.
    #[must_use]
    pub fn filter<P>(&self, pred: P) -> Semantic<E>
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.derive(FilterGen {
            upstream: self.generator(),
            pred,
        })
    }

    /// Transform every element; timestamps are unchanged.
    ///
    /// Downstream interrupts see the mapped value, and `f` runs once per
    /// element.
    #[must_use]
    pub fn map<O, F>(&self, f: F) -> Semantic<O>
    where
        O: Element,
        F: Fn(&E) -> O + Send + Sync + 'static,
    {
        self.derive(MapGen {
            upstream: self.generator(),
            f,
            _o: PhantomData,
        })
    }

    /// Replace each element by the elements of the pipeline `f` returns for it.
    ///
    /// Inner pipelines each start their own index space; the flattened stream
    /// renumbers them with one counter, so timestamps run `0, 1, 2, ...`
    /// across all inner pipelines.
    #[must_use]
    pub fn flat_map<O, F>(&self, f: F) -> Semantic<O>
    where
        O: Element,
        F: Fn(&E) -> Semantic<O> + Send + Sync + 'static,
    {
        self.derive(FlatMapGen {
            upstream: self.generator(),
            f,
            _o: PhantomData,
        })
    }

    /// [`flat_map`](Self::flat_map) onto the same element type.
    #[must_use]
    pub fn flat<F>(&self, f: F) -> Semantic<E>
    where
        F: Fn(&E) -> Semantic<E> + Send + Sync + 'static,
    {
        self.flat_map(f)
    }

    /// Observe each emitted element without changing it.
    #[must_use]
    pub fn peek<F>(&self, f: F) -> Semantic<E>
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.derive(PeekGen {
            upstream: self.generator(),
            f,
        })
    }

    /// All of `self`, then all of `other`, with `other`'s timestamps shifted
    /// by the number of elements `self` emitted.
    #[must_use]
    pub fn concat(&self, other: &Semantic<E>) -> Semantic<E> {
        self.derive(ConcatGen {
            first: self.generator(),
            second: other.generator(),
        })
    }

    /// Run terminals with one partition per hardware thread.
    #[must_use]
    pub fn parallel(&self) -> Semantic<E> {
        self.parallel_with(num_cpus::get())
    }

    /// Run terminals over `workers` partitions (`<= 1` means sequential).
    #[must_use]
    pub fn parallel_with(&self, workers: usize) -> Semantic<E> {
        let mut out = self.clone();
        out.runner.mode = if workers > 1 {
            ExecMode::Parallel { workers }
        } else {
            ExecMode::Sequential
        };
        out
    }

    /// Run terminals on the calling thread as a single partition.
    #[must_use]
    pub fn sequential(&self) -> Semantic<E> {
        self.parallel_with(1)
    }

    /// Run parallel terminals on `pool` instead of the global pool.
    #[must_use]
    pub fn with_pool(&self, pool: Arc<TaskPool>) -> Semantic<E> {
        let mut out = self.clone();
        out.runner.pool = Some(pool);
        out
    }

    /// Lazy aggregation view with this stage's settings.
    pub fn to_unordered(&self) -> UnorderedCollectable<E> {
        UnorderedCollectable::new(self.generator(), self.runner.clone())
    }

    /// Materialize into timestamp order (signed timestamp order).
    ///
    /// # Errors
    /// Propagates failures from the source or any stage.
    pub fn to_ordered(&self) -> Result<OrderedCollectable<E>> {
        self.to_ordered_with(Arrangement::Natural)
    }

    /// Materialize into timestamp order using `arrangement` to normalize
    /// timestamps first.
    ///
    /// # Errors
    /// Propagates failures from the source or any stage.
    pub fn to_ordered_with(&self, arrangement: Arrangement) -> Result<OrderedCollectable<E>> {
        OrderedCollectable::materialize(&self.to_unordered(), arrangement)
    }
}
