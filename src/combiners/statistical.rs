//! Statistical combiners: `AverageF64`

use crate::collector::CombineFn;
use crate::statistics::Numeric;

/* ===================== AverageF64 ===================== */

/// Arithmetic mean as `f64`.
///
/// Values must implement [`Numeric`] (every primitive number does).
///
/// - Accumulator: `(sum_f64, count)`
/// - Output: `f64`
///
/// Empty streams produce `0.0`.
#[derive(Clone, Copy, Debug, Default)]
pub struct AverageF64;

impl<V> CombineFn<V, (f64, usize), f64> for AverageF64
where
    V: Numeric,
{
    fn create(&self) -> (f64, usize) {
        (0.0, 0)
    }

    fn add_input(&self, acc: &mut (f64, usize), v: V) {
        acc.0 += v.to_f64();
        acc.1 += 1;
    }

    fn merge(&self, acc: &mut (f64, usize), other: (f64, usize)) {
        acc.0 += other.0;
        acc.1 += other.1;
    }

    #[allow(clippy::cast_precision_loss)]
    fn finish(&self, acc: (f64, usize)) -> f64 {
        if acc.1 == 0 {
            0.0
        } else {
            acc.0 / (acc.1 as f64)
        }
    }
}
