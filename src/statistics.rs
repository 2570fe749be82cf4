//! Descriptive statistics over an ordered view.
//!
//! [`Statistics<E, D>`] pairs an [`OrderedCollectable<E>`] with a mapper
//! `E -> D` into a [`Numeric`] domain. Every metric is computed once, through
//! the view's own terminals (so a parallel view computes them in parallel),
//! and memoized until [`Statistics::clear`] or [`Statistics::assign`].
//!
//! Conventions:
//! - variance and standard deviation use the sample (`n - 1`) denominator;
//! - skewness and kurtosis are population standardized moments taken with the
//!   sample standard deviation; kurtosis is excess kurtosis (minus 3);
//! - quartiles are index splits of the sorted data (`s[n/4]`, `s[n/2]`,
//!   `s[3n/4]`), not interpolated;
//! - the mode is the most frequent value, the smallest one on ties;
//! - inputs too small for a metric (empty, or fewer than 2/3/4 values for
//!   variance/skewness/kurtosis) yield `0.0`.
//!
//! ```ignore
//! use semflow::*;
//! let stats = of(vec![2, 4, 4, 4, 5, 5, 7, 9]).to_statistics()?;
//! assert_eq!(stats.mean()?, 5.0);
//! assert_eq!(stats.mode()?, 4.0);
//! ```

use crate::collectable::{Collectable, OrderedCollectable};
use crate::collector::Collector;
use crate::combiners::AverageF64;
use crate::generator::Element;
use crate::helpers::sources::from_vec;
use crate::semantic::Semantic;
use anyhow::Result;
use ordered_float::OrderedFloat;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// Primitive numbers usable as a statistics domain or a `range` source.
pub trait Numeric: Element + Copy + PartialOrd {
    const ZERO: Self;
    const ONE: Self;
    fn to_f64(self) -> f64;
    /// `self + step`, or `None` when the sum leaves the type's range.
    fn checked_step(self, step: Self) -> Option<Self>;
}

macro_rules! impl_numeric {
    (@common $t:ty) => {
        const ZERO: Self = 0 as $t;
        const ONE: Self = 1 as $t;

        #[inline]
        #[allow(clippy::cast_precision_loss, clippy::cast_lossless)]
        fn to_f64(self) -> f64 {
            self as f64
        }
    };
    (int: $($t:ty),* $(,)?) => {
        $(
            impl Numeric for $t {
                impl_numeric!(@common $t);

                #[inline]
                fn checked_step(self, step: Self) -> Option<Self> {
                    self.checked_add(step)
                }
            }
        )*
    };
    (float: $($t:ty),* $(,)?) => {
        $(
            impl Numeric for $t {
                impl_numeric!(@common $t);

                #[inline]
                fn checked_step(self, step: Self) -> Option<Self> {
                    Some(self + step)
                }
            }
        )*
    };
}

impl_numeric!(int: i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
impl_numeric!(float: f32, f64);

/// Memoized metric identities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Metric {
    Sum,
    Mean,
    Median,
    Mode,
    Variance,
    Skewness,
    Kurtosis,
    Quartiles,
}

#[derive(Clone, Copy, Debug)]
enum Cached {
    Scalar(f64),
    Triple([f64; 3]),
}

type Frequencies = BTreeMap<OrderedFloat<f64>, usize>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Statistics<E, D> {
    data: OrderedCollectable<E>,
    mapper: Arc<dyn Fn(&E) -> D + Send + Sync>,
    cache: Mutex<HashMap<Metric, Cached>>,
    frequencies: Mutex<Option<Arc<Frequencies>>>,
}

impl<E: Element, D: Numeric> Statistics<E, D> {
    pub fn new<F>(data: OrderedCollectable<E>, mapper: F) -> Self
    where
        F: Fn(&E) -> D + Send + Sync + 'static,
    {
        Self {
            data,
            mapper: Arc::new(mapper),
            cache: Mutex::new(HashMap::new()),
            frequencies: Mutex::new(None),
        }
    }

    /// Replace the data set, keeping the mapper and execution settings.
    ///
    /// # Errors
    /// Fails when materializing the new data fails.
    pub fn assign<I>(&mut self, elements: I) -> Result<()>
    where
        I: IntoIterator<Item = E>,
    {
        let mut source = from_vec(elements.into_iter().collect());
        source.runner = self.data.runner().clone();
        self.data = source.to_ordered()?;
        self.clear();
        Ok(())
    }

    /// Drop every memoized metric.
    pub fn clear(&self) {
        lock(&self.cache).clear();
        *lock(&self.frequencies) = None;
    }

    pub fn is_cached(&self, metric: Metric) -> bool {
        lock(&self.cache).contains_key(&metric)
    }

    pub fn data(&self) -> &OrderedCollectable<E> {
        &self.data
    }

    pub fn count(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The mapped values, in the view's order.
    pub fn values(&self) -> Semantic<D> {
        let mapper = Arc::clone(&self.mapper);
        self.data.into_semantic().map(move |e| mapper(e))
    }

    fn cached<F>(&self, metric: Metric, compute: F) -> Result<Cached>
    where
        F: FnOnce() -> Result<Cached>,
    {
        if let Some(hit) = lock(&self.cache).get(&metric) {
            return Ok(*hit);
        }
        // Computed outside the lock: metrics call each other.
        trace!(?metric, "computing statistic");
        let value = compute()?;
        lock(&self.cache).insert(metric, value);
        Ok(value)
    }

    fn scalar<F>(&self, metric: Metric, compute: F) -> Result<f64>
    where
        F: FnOnce() -> Result<f64>,
    {
        match self.cached(metric, || compute().map(Cached::Scalar))? {
            Cached::Scalar(v) => Ok(v),
            Cached::Triple(t) => Ok(t[0]),
        }
    }

    /// Sum of a function of every value, folded with the view's runner.
    fn sum_of<F>(&self, f: F) -> Result<f64>
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        self.values().collect(Collector::new(
            || 0.0,
            move |acc: &mut f64, v: D| *acc += f(v.to_f64()),
            |acc: &mut f64, other| *acc += other,
            |acc| acc,
        ))
    }

    fn sorted(&self) -> Result<Vec<f64>> {
        let mut out: Vec<f64> = self.values().to_vec()?.into_iter().map(Numeric::to_f64).collect();
        out.sort_by(f64::total_cmp);
        Ok(out)
    }

    /// # Errors
    /// Fails when a partition task fails.
    pub fn sum(&self) -> Result<f64> {
        self.scalar(Metric::Sum, || self.sum_of(|v| v))
    }

    /// # Errors
    /// Fails when a partition task fails.
    pub fn mean(&self) -> Result<f64> {
        self.scalar(Metric::Mean, || self.values().collect(AverageF64))
    }

    /// Middle value; the average of the two middle values for even counts.
    ///
    /// # Errors
    /// Fails when a partition task fails.
    pub fn median(&self) -> Result<f64> {
        self.scalar(Metric::Median, || {
            let s = self.sorted()?;
            let n = s.len();
            Ok(match n {
                0 => 0.0,
                _ if n % 2 == 0 => (s[n / 2 - 1] + s[n / 2]) / 2.0,
                _ => s[n / 2],
            })
        })
    }

    /// # Errors
    /// Fails when a partition task fails.
    pub fn mode(&self) -> Result<f64> {
        self.scalar(Metric::Mode, || {
            let freq = self.frequency_shared()?;
            let mut best: Option<(f64, usize)> = None;
            for (value, &count) in freq.iter() {
                if best.is_none_or(|(_, c)| count > c) {
                    best = Some((value.into_inner(), count));
                }
            }
            Ok(best.map_or(0.0, |(v, _)| v))
        })
    }

    /// # Errors
    /// Fails when a partition task fails.
    #[allow(clippy::cast_precision_loss)]
    pub fn variance(&self) -> Result<f64> {
        self.scalar(Metric::Variance, || {
            let n = self.count();
            if n < 2 {
                return Ok(0.0);
            }
            let mean = self.mean()?;
            let squares = self.sum_of(move |v| (v - mean) * (v - mean))?;
            Ok(squares / (n - 1) as f64)
        })
    }

    /// # Errors
    /// Fails when a partition task fails.
    pub fn standard_deviation(&self) -> Result<f64> {
        Ok(self.variance()?.sqrt())
    }

    #[allow(clippy::cast_precision_loss)]
    fn standardized_moment(&self, power: i32) -> Result<f64> {
        let mean = self.mean()?;
        let sd = self.standard_deviation()?;
        if sd == 0.0 {
            return Ok(0.0);
        }
        let total = self.sum_of(move |v| ((v - mean) / sd).powi(power))?;
        Ok(total / self.count() as f64)
    }

    /// # Errors
    /// Fails when a partition task fails.
    pub fn skewness(&self) -> Result<f64> {
        self.scalar(Metric::Skewness, || {
            if self.count() < 3 {
                return Ok(0.0);
            }
            self.standardized_moment(3)
        })
    }

    /// Excess kurtosis; `0.0` for constant data.
    ///
    /// # Errors
    /// Fails when a partition task fails.
    pub fn kurtosis(&self) -> Result<f64> {
        self.scalar(Metric::Kurtosis, || {
            if self.count() < 4 {
                return Ok(0.0);
            }
            // The fourth moment is zero only when the deviation is.
            let m4 = self.standardized_moment(4)?;
            Ok(if m4 == 0.0 { 0.0 } else { m4 - 3.0 })
        })
    }

    /// `[Q1, Q2, Q3]` by index split; all zero when empty.
    ///
    /// # Errors
    /// Fails when a partition task fails.
    pub fn quartiles(&self) -> Result<[f64; 3]> {
        let cached = self.cached(Metric::Quartiles, || {
            let s = self.sorted()?;
            let n = s.len();
            if n == 0 {
                return Ok(Cached::Triple([0.0; 3]));
            }
            Ok(Cached::Triple([s[n / 4], s[n / 2], s[3 * n / 4]]))
        })?;
        match cached {
            Cached::Triple(q) => Ok(q),
            Cached::Scalar(v) => Ok([v; 3]),
        }
    }

    /// `Q3 - Q1`.
    ///
    /// # Errors
    /// Fails when a partition task fails.
    pub fn interquartile_range(&self) -> Result<f64> {
        let [q1, _, q3] = self.quartiles()?;
        Ok(q3 - q1)
    }

    fn frequency_shared(&self) -> Result<Arc<Frequencies>> {
        if let Some(f) = lock(&self.frequencies).as_ref() {
            return Ok(Arc::clone(f));
        }
        let mut freq = Frequencies::new();
        for v in self.values().to_vec()? {
            *freq.entry(OrderedFloat(v.to_f64())).or_default() += 1;
        }
        let freq = Arc::new(freq);
        *lock(&self.frequencies) = Some(Arc::clone(&freq));
        Ok(freq)
    }

    /// Occurrences of each value.
    ///
    /// # Errors
    /// Fails when a partition task fails.
    pub fn frequency(&self) -> Result<BTreeMap<OrderedFloat<f64>, usize>> {
        Ok((*self.frequency_shared()?).clone())
    }

    /// # Errors
    /// Fails when a partition task fails.
    pub fn maximum(&self) -> Result<Option<D>> {
        Ok(self
            .values()
            .to_vec()?
            .into_iter()
            .max_by(|a, b| a.to_f64().total_cmp(&b.to_f64())))
    }

    /// # Errors
    /// Fails when a partition task fails.
    pub fn minimum(&self) -> Result<Option<D>> {
        Ok(self
            .values()
            .to_vec()?
            .into_iter()
            .min_by(|a, b| a.to_f64().total_cmp(&b.to_f64())))
    }

    /// `maximum - minimum`; `0.0` when empty.
    ///
    /// # Errors
    /// Fails when a partition task fails.
    pub fn range(&self) -> Result<f64> {
        match (self.maximum()?, self.minimum()?) {
            (Some(hi), Some(lo)) => Ok(hi.to_f64() - lo.to_f64()),
            _ => Ok(0.0),
        }
    }
}

impl<E: Element> Semantic<E> {
    /// Materialize and wrap in [`Statistics`] over the elements themselves.
    ///
    /// # Errors
    /// Propagates failures from the source or any stage.
    pub fn to_statistics(&self) -> Result<Statistics<E, E>>
    where
        E: Numeric,
    {
        Ok(self.to_ordered()?.to_statistics())
    }

    /// Materialize and wrap in [`Statistics`] over `mapper(&e)`.
    ///
    /// # Errors
    /// Propagates failures from the source or any stage.
    pub fn to_statistics_by<D, F>(&self, mapper: F) -> Result<Statistics<E, D>>
    where
        D: Numeric,
        F: Fn(&E) -> D + Send + Sync + 'static,
    {
        Ok(self.to_ordered()?.to_statistics_by(mapper))
    }
}
