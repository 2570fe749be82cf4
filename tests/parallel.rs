use anyhow::Result;
use semflow::testing::{PARALLEL_DEGREES, assert_collections_unordered_equal, assert_parallel_eq};
use semflow::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Sizes around every tested degree: empty, one, exactly k, and off-multiples.
const SIZES: [u64; 9] = [0, 1, 2, 3, 4, 7, 8, 9, 101];

#[test]
fn associative_collectors_agree_across_degrees() -> Result<()> {
    for n in SIZES {
        let p = range(0u64, n).map(|v| v * 7 % 13);
        let sum = assert_parallel_eq(&p, |q| q.collect(Sum::<u64>::new()))?;
        assert_eq!(sum, (0..n).map(|v| v * 7 % 13).sum::<u64>());
        let count = assert_parallel_eq(&p, |q| q.count())?;
        assert_eq!(count as u64, n);
        let set = assert_parallel_eq(&p, |q| q.to_set())?;
        assert_eq!(set, (0..n).map(|v| v * 7 % 13).collect::<BTreeSet<_>>());
        assert_parallel_eq(&p, |q| q.min())?;
        assert_parallel_eq(&p, |q| q.max())?;
    }
    Ok(())
}

#[test]
fn ordered_terminals_agree_across_degrees() -> Result<()> {
    for n in SIZES {
        let p = range(0u64, n).filter(|v| v % 3 != 1);
        let v = assert_parallel_eq(&p, |q| q.to_vec())?;
        assert_eq!(v, (0..n).filter(|v| v % 3 != 1).collect::<Vec<_>>());
        assert_parallel_eq(&p, |q| q.group(|v| v % 4))?;
        assert_parallel_eq(&p, |q| q.partition(3))?;
        assert_parallel_eq(&p, |q| q.join())?;
        assert_parallel_eq(&p, |q| q.to_map(|v| v % 5, |v| *v))?;
        assert_parallel_eq(&p, |q| q.fold(0u64, |acc, v| acc * 31 + v))?;
        assert_parallel_eq(&p, |q| q.find_first())?;
        assert_parallel_eq(&p, |q| q.to_ordered()?.to_vec())?;
        assert_parallel_eq(&p, |q| q.reverse().to_ordered()?.to_vec())?;
    }
    Ok(())
}

#[test]
fn short_circuit_predicates_agree_across_degrees() -> Result<()> {
    for n in SIZES {
        let p = range(0u64, n);
        assert_parallel_eq(&p, |q| q.any_match(|v| *v == 5))?;
        assert_parallel_eq(&p, |q| q.all_match(|v| *v < 50))?;
        assert_parallel_eq(&p, |q| q.none_match(|v| *v > 99))?;
    }
    Ok(())
}

#[test]
fn find_any_returns_some_element() -> Result<()> {
    let p = range(10u32, 30).parallel_with(4);
    let hit = p.find_any()?;
    assert!(hit.is_some_and(|v| (10..30).contains(&v)));
    assert_eq!(empty::<u32>().parallel_with(4).find_any()?, None);
    Ok(())
}

#[test]
fn reduce_matches_sequential_for_commutative_op() -> Result<()> {
    for k in PARALLEL_DEGREES {
        let out = range(1u64, 11).parallel_with(k).reduce(|a, b| a * b)?;
        assert_eq!(out, Some(3_628_800));
    }
    assert_eq!(empty::<u64>().parallel_with(4).reduce(|a, b| a + b)?, None);
    Ok(())
}

#[test]
fn for_each_visits_every_element_once() -> Result<()> {
    let seen = Arc::new(AtomicUsize::new(0));
    let total = Arc::clone(&seen);
    range(0usize, 1_000).parallel_with(8).for_each(move |v| {
        total.fetch_add(v, Ordering::SeqCst);
    })?;
    assert_eq!(seen.load(Ordering::SeqCst), 499_500);
    Ok(())
}

#[test]
fn explicit_pool_is_used_for_partitions() -> Result<()> {
    let pool = Arc::new(TaskPool::new(3)?);
    let names = range(0u32, 30)
        .with_pool(Arc::clone(&pool))
        .parallel_with(3)
        .map(|v| (*v, std::thread::current().name().unwrap_or_default().to_string()))
        .to_vec()?;
    assert_eq!(names.len(), 30);
    assert!(names.iter().all(|(_, n)| n.starts_with("semflow-worker-")));
    pool.shutdown();

    // A stopped pool rejects the partition tasks.
    assert!(range(0u32, 10).with_pool(pool).parallel_with(2).count().is_err());
    Ok(())
}

#[test]
fn nested_parallel_terminal_runs_inline() -> Result<()> {
    let pool = Arc::new(TaskPool::new(2)?);
    let outer = range(0u64, 4)
        .with_pool(Arc::clone(&pool))
        .parallel_with(2)
        .map(|n| range(0u64, *n + 1).parallel_with(8).collect(Sum::<u64>::new()).unwrap_or(0));
    let mut sums = outer.to_vec()?;
    sums.sort_unstable();
    assert_eq!(sums, vec![0, 1, 3, 6]);
    Ok(())
}

#[test]
fn ordered_view_splits_into_chunks() -> Result<()> {
    let ordered = range(0u32, 10).shuffle().to_ordered()?;
    let values = ordered.to_vec()?;
    for k in PARALLEL_DEGREES {
        let p = ordered.into_semantic().parallel_with(k);
        assert_eq!(p.to_ordered()?.to_vec()?, values);
        // Plain `ToVec` appends partials in partition order.
        assert_collections_unordered_equal(&p.collect(ToVec::new())?, &values);
    }
    Ok(())
}

/// Ordered by `key` only, so elements with equal keys tie.
#[derive(Clone, Debug)]
struct Tagged {
    key: u8,
    tag: usize,
}
impl PartialEq for Tagged {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}
impl Eq for Tagged {}
impl PartialOrd for Tagged {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Tagged {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

#[test]
fn min_and_max_ties_resolve_to_earliest_emission() -> Result<()> {
    let keys = [5u8, 1, 9, 1, 9, 1, 5, 9];
    let items: Vec<Tagged> = keys.iter().enumerate().map(|(tag, &key)| Tagged { key, tag }).collect();
    let p = of(items);
    for k in PARALLEL_DEGREES {
        let q = p.parallel_with(k);
        assert_eq!(q.min()?.map(|t| t.tag), Some(1), "min with {k} partitions");
        assert_eq!(q.max()?.map(|t| t.tag), Some(2), "max with {k} partitions");
    }
    Ok(())
}
