//! Windows over an ordered view.
//!
//! A [`Window`] is a half-open range `[start, end)` of positions in an
//! [`OrderedCollectable`]. [`WindowCollectable`] cuts the view into
//! consecutive (tumbling) or overlapping (sliding) windows and exposes them
//! either materialized or as a new pipeline of `Vec<E>`.

use crate::collectable::{Collectable, OrderedCollectable};
use crate::generator::{Element, Timestamp};
use crate::helpers::sources::from_vec;
use crate::semantic::Semantic;
use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

/// A closed-open position range: [start, end).
///
/// Windows order by `start`, then `end`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Window {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl Window {
    #[inline]
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        debug_assert!(end >= start);
        Self { start, end }
    }

    #[inline]
    pub fn len(&self) -> usize {
        usize::try_from(self.end - self.start).unwrap_or(0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    #[inline]
    pub fn contains(&self, pos: Timestamp) -> bool {
        self.start <= pos && pos < self.end
    }
}

/// Window bounds over `len` positions.
///
/// Windows start at `0, step, 2 * step, ...` and stop after the first window
/// that reaches `len`, so no trailing window lies entirely inside an earlier
/// one. A `len` shorter than `size` gives one partial window; zero gives none.
fn bounds(len: usize, size: usize, step: usize) -> Result<Vec<Window>> {
    ensure!(size > 0, "window size must be positive");
    ensure!(step > 0, "window step must be positive");
    let mut out = Vec::new();
    let mut start = 0usize;
    while start < len {
        let end = start.saturating_add(size).min(len);
        out.push(Window::new(start as Timestamp, end as Timestamp));
        if end >= len {
            break;
        }
        start = start.saturating_add(step);
    }
    Ok(out)
}

/// Tumbling and sliding windows over an [`OrderedCollectable`].
///
/// ```ignore
/// use semflow::*;
/// let w = range(0, 7).to_window()?;
/// assert_eq!(w.tumbling_windows(3)?, vec![vec![0, 1, 2], vec![3, 4, 5], vec![6]]);
/// assert_eq!(w.sliding_windows(4, 2)?, vec![vec![0, 1, 2, 3], vec![2, 3, 4, 5], vec![4, 5, 6]]);
/// ```
pub struct WindowCollectable<E> {
    data: OrderedCollectable<E>,
}

impl<E> Clone for WindowCollectable<E> {
    fn clone(&self) -> Self {
        Self { data: self.data.clone() }
    }
}

impl<E: Element> WindowCollectable<E> {
    pub(crate) fn new(data: OrderedCollectable<E>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &OrderedCollectable<E> {
        &self.data
    }

    /// Windows of `size` positions advancing by `step`, each with its bounds.
    ///
    /// # Errors
    /// Fails when `size` or `step` is zero.
    pub fn windows(&self, size: usize, step: usize) -> Result<Vec<(Window, Vec<E>)>> {
        let items = self.data.as_slice();
        Ok(bounds(items.len(), size, step)?
            .into_iter()
            .map(|w| {
                let (lo, hi) = (w.start as usize, w.end as usize);
                (w, items[lo..hi].iter().map(|t| t.value.clone()).collect())
            })
            .collect())
    }

    /// # Errors
    /// Fails when `size` or `step` is zero.
    pub fn sliding_windows(&self, size: usize, step: usize) -> Result<Vec<Vec<E>>> {
        Ok(self.windows(size, step)?.into_iter().map(|(_, w)| w).collect())
    }

    /// Consecutive, non-overlapping windows; the last may be shorter.
    ///
    /// # Errors
    /// Fails when `size` is zero.
    pub fn tumbling_windows(&self, size: usize) -> Result<Vec<Vec<E>>> {
        self.sliding_windows(size, size)
    }

    /// [`tumbling_windows`](Self::tumbling_windows) as a pipeline, timestamps
    /// numbering the windows.
    ///
    /// # Errors
    /// Fails when `size` is zero.
    pub fn tumble(&self, size: usize) -> Result<Semantic<Vec<E>>> {
        self.slide(size, size)
    }

    /// [`sliding_windows`](Self::sliding_windows) as a pipeline.
    ///
    /// # Errors
    /// Fails when `size` or `step` is zero.
    pub fn slide(&self, size: usize, step: usize) -> Result<Semantic<Vec<E>>> {
        let mut out = from_vec(self.sliding_windows(size, step)?);
        out.runner = self.data.runner().clone();
        Ok(out)
    }

    /// The underlying elements, back as a pipeline in window order.
    pub fn flatten(&self) -> Semantic<E> {
        self.data.into_semantic()
    }
}

impl<E: Element> Semantic<E> {
    /// Materialize in timestamp order and window it.
    ///
    /// # Errors
    /// Propagates failures from the source or any stage.
    pub fn to_window(&self) -> Result<WindowCollectable<E>> {
        Ok(self.to_ordered()?.to_window())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sliding_bounds() -> Result<()> {
        let w = bounds(5, 2, 3)?;
        assert_eq!(w, vec![Window::new(0, 2), Window::new(3, 5)]);
        assert_eq!(bounds(2, 5, 1)?, vec![Window::new(0, 2)]);
        assert!(bounds(0, 3, 1)?.is_empty());
        assert!(bounds(3, 0, 1).is_err());
        assert!(bounds(3, 1, 0).is_err());
        assert_eq!(bounds(3, usize::MAX, 1)?, vec![Window::new(0, 3)]);
        Ok(())
    }
}
