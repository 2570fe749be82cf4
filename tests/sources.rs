use anyhow::Result;
use semflow::*;
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

#[test]
fn in_memory_sources() -> Result<()> {
    assert!(empty::<String>().to_vec()?.is_empty());
    assert_eq!(of(vec![1, 2]).to_vec()?, vec![1, 2]);
    assert_eq!(from_slice(&["a", "b"]).to_vec()?, vec!["a", "b"]);
    assert_eq!(from_iter([3, 1, 2]).to_vec()?, vec![3, 1, 2]);
    assert_eq!(from_iter(VecDeque::from(vec![7, 8])).to_vec()?, vec![7, 8]);
    assert_eq!(from_iter(BTreeSet::from([9, 4, 6])).to_vec()?, vec![4, 6, 9]);
    assert_eq!(fill('x', 3).join_with("", "", "")?, "xxx");
    Ok(())
}

#[test]
fn fill_with_calls_supplier_on_every_run() -> Result<()> {
    let next = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&next);
    let p = fill_with(move || counter.fetch_add(1, Ordering::SeqCst), 3);
    assert_eq!(p.to_vec()?, vec![0, 1, 2]);
    assert_eq!(p.to_vec()?, vec![3, 4, 5]);
    Ok(())
}

#[test]
fn numeric_ranges() -> Result<()> {
    assert_eq!(range(0, 5).to_vec()?, vec![0, 1, 2, 3, 4]);
    assert!(range(5, 5).to_vec()?.is_empty());
    assert!(range(5, 0).to_vec()?.is_empty());
    assert_eq!(range_step(10, 0, -3).to_vec()?, vec![10, 7, 4, 1]);
    assert_eq!(range_step(0u8, 10, 4).to_vec()?, vec![0, 4, 8]);
    assert!(range_step(0, 10, 0).to_vec()?.is_empty());
    assert_eq!(range_step(0.0, 1.0, 0.25).to_vec()?, vec![0.0, 0.25, 0.5, 0.75]);
    Ok(())
}

#[test]
fn ranges_ending_at_the_type_limits() -> Result<()> {
    assert_eq!(range_step(0u8, 255, 200).to_vec()?, vec![0, 200]);
    assert_eq!(range_step(250u8, u8::MAX, 3).to_vec()?, vec![250, 253]);
    assert_eq!(range(u8::MAX - 2, u8::MAX).to_vec()?, vec![253, 254]);
    assert_eq!(range_step(i64::MIN + 1, i64::MIN, -1).to_vec()?, vec![i64::MIN + 1]);
    assert_eq!(range_step(i32::MAX - 1, i32::MAX, i32::MAX).count()?, 1);
    Ok(())
}
