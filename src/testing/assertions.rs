//! Assertion functions for testing pipeline outputs.
//!
//! This module provides specialized assertion functions for comparing
//! collections produced by pipelines with expected results.

use crate::generator::Element;
use crate::semantic::Semantic;
use anyhow::Result;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Concurrency degrees every parallel-equivalence check runs with.
pub const PARALLEL_DEGREES: [usize; 4] = [1, 2, 4, 8];

/// Assert that two collections are equal in order and content.
///
/// # Panics
///
/// Panics if the collections differ in length or content.
///
/// # Example
///
/// ```
/// use semflow::testing::assert_collections_equal;
///
/// assert_collections_equal(&[1, 2, 3], &[1, 2, 3]);
/// ```
pub fn assert_collections_equal<T: Debug + PartialEq>(actual: &[T], expected: &[T]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Collection length mismatch:\n  Expected length: {}\n  Actual length: {}\n  Expected: {expected:?}\n  Actual: {actual:?}",
        expected.len(),
        actual.len()
    );

    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        assert_eq!(
            a, e,
            "Collection mismatch at index {i}:\n  Expected: {e:?}\n  Actual: {a:?}\n  Full expected: {expected:?}\n  Full actual: {actual:?}"
        );
    }
}

/// Assert that two collections hold the same elements with the same
/// multiplicities, ignoring order.
///
/// # Panics
///
/// Panics if the collections differ as multisets.
///
/// # Example
///
/// ```
/// use semflow::testing::assert_collections_unordered_equal;
///
/// assert_collections_unordered_equal(&[3, 1, 1, 2], &[1, 2, 1, 3]);
/// ```
pub fn assert_collections_unordered_equal<T: Debug + Eq + Hash>(actual: &[T], expected: &[T]) {
    fn counts<T: Eq + Hash>(items: &[T]) -> HashMap<&T, usize> {
        let mut m = HashMap::new();
        for item in items {
            *m.entry(item).or_insert(0) += 1;
        }
        m
    }

    assert_eq!(
        actual.len(),
        expected.len(),
        "Collection length mismatch:\n  Expected: {expected:?}\n  Actual: {actual:?}"
    );
    let (a, e) = (counts(actual), counts(expected));
    if a != e {
        let missing: Vec<_> = e.keys().filter(|k| a.get(*k) != e.get(*k)).collect();
        panic!(
            "Collection content mismatch:\n  Differing elements: {missing:?}\n  Expected: {expected:?}\n  Actual: {actual:?}"
        );
    }
}

/// Assert that every element satisfies a predicate.
///
/// # Panics
///
/// Panics if any element does not satisfy the predicate.
pub fn assert_all<T: Debug>(collection: &[T], predicate: impl Fn(&T) -> bool) {
    for (i, item) in collection.iter().enumerate() {
        assert!(
            predicate(item),
            "Predicate failed for element at index {i}:\n  Element: {item:?}\n  Collection: {collection:?}"
        );
    }
}

/// Assert `|actual - expected| <= tolerance`.
///
/// # Panics
///
/// Panics when the values are further apart than `tolerance`.
pub fn assert_approx_eq(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "Values differ by more than {tolerance}:\n  Expected: {expected}\n  Actual: {actual}"
    );
}

/// Run `terminal` on `pipeline` sequentially and at every degree in
/// [`PARALLEL_DEGREES`], assert all results agree, and return the
/// sequential one.
///
/// # Errors
/// Returns the first error a run produced.
///
/// # Panics
///
/// Panics if a parallel run disagrees with the sequential run.
///
/// # Example
///
/// ```no_run
/// use semflow::*;
/// use semflow::testing::assert_parallel_eq;
///
/// # fn main() -> anyhow::Result<()> {
/// let total = assert_parallel_eq(&range(0u64, 100), |p| p.collect(Sum::<u64>::new()))?;
/// assert_eq!(total, 4950);
/// # Ok(())
/// # }
/// ```
pub fn assert_parallel_eq<E, R, F>(pipeline: &Semantic<E>, terminal: F) -> Result<R>
where
    E: Element,
    R: Debug + PartialEq,
    F: Fn(&Semantic<E>) -> Result<R>,
{
    let expected = terminal(&pipeline.sequential())?;
    for k in PARALLEL_DEGREES {
        let actual = terminal(&pipeline.parallel_with(k))?;
        assert_eq!(actual, expected, "parallel_with({k}) disagrees with the sequential run");
    }
    Ok(expected)
}
