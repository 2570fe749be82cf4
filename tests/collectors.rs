use anyhow::Result;
use semflow::testing::{assert_all, assert_collections_equal};
use semflow::*;
use std::collections::{BTreeMap, HashSet};

fn words() -> Semantic<&'static str> {
    of(vec!["ant", "bee", "cat", "ape", "bat", "cow", "asp"])
}

#[test]
fn builtin_combiners() -> Result<()> {
    let nums = of(vec![4u32, 9, 1, 9]);
    assert_eq!(nums.collect(Count)?, 4);
    assert_eq!(nums.collect(Sum::<u32>::new())?, 23);
    assert_eq!(nums.collect(Min::<u32>::new())?, Some(1));
    assert_eq!(nums.collect(Max::<u32>::new())?, Some(9));
    assert_eq!(nums.collect(AverageF64)?, 5.75);
    assert_eq!(nums.collect(ToVec::new())?, vec![4, 9, 1, 9]);
    assert_eq!(nums.collect(ToSet::new())?.into_iter().collect::<Vec<_>>(), vec![1, 4, 9]);
    assert_eq!(nums.collect(ToHashSet::new())?, HashSet::from([1, 4, 9]));
    assert_eq!(nums.collect(Joining::new("(", " ", ")"))?, "(4 9 1 9)");
    assert_eq!(empty::<u32>().collect(Max::<u32>::new())?, None);
    assert_eq!(empty::<u32>().collect(AverageF64)?, 0.0);
    Ok(())
}

#[test]
fn keyed_combiners() -> Result<()> {
    let by_letter = words().collect(GroupBy::new(|w: &&str| w.as_bytes()[0]))?;
    assert_eq!(by_letter[&b'a'], vec!["ant", "ape", "asp"]);
    assert_eq!(by_letter[&b'c'], vec!["cat", "cow"]);

    let lengths = words().collect(ToMap::new(|w: &&str| w.to_string(), |w: &&str| w.len()))?;
    assert_eq!(lengths.len(), 7);
    assert_all(&lengths.values().copied().collect::<Vec<_>>(), |n| *n == 3);
    Ok(())
}

#[test]
fn predicate_combiners_stop_early() -> Result<()> {
    let source = semflow::testing::CountingSource::new(1_000);
    assert!(source.semantic().collect(AnyMatch::new(|v: &usize| *v == 3))?);
    assert_eq!(source.produced(), 4);

    source.reset();
    assert!(!source.semantic().collect(AllMatch::new(|v: &usize| *v < 2))?);
    assert_eq!(source.produced(), 3);

    assert!(empty::<u8>().collect(AllMatch::new(|_: &u8| false))?);
    Ok(())
}

#[test]
fn closure_collector() -> Result<()> {
    let longest = Collector::new(
        String::new,
        |acc: &mut String, s: &'static str| {
            if s.len() > acc.len() {
                *acc = s.to_string();
            }
        },
        |acc: &mut String, other: String| {
            if other.len() > acc.len() {
                *acc = other;
            }
        },
        |acc: String| acc,
    );
    let out = of(vec!["a", "ccc", "bb"]).collect(longest.clone())?;
    assert_eq!(out, "ccc");
    assert_eq!(of(vec!["a", "ccc", "bb"]).parallel_with(2).collect(longest)?, "ccc");

    // Stop once the running total passes 10.
    let capped = Collector::new(|| 0u32, |acc: &mut u32, v: u32| *acc += v, |acc: &mut u32, o: u32| *acc += o, |acc: u32| acc)
        .with_interrupt(|acc: &u32| *acc > 10);
    assert_eq!(range(1u32, 100).collect(capped)?, 15);
    Ok(())
}

#[test]
fn containers() -> Result<()> {
    let nums = of(vec![3, 1, 3, 2]);
    assert_collections_equal(&nums.to_vec()?, &[3, 1, 3, 2]);
    assert_eq!(nums.to_list()?, [3, 1, 3, 2]);
    assert_eq!(nums.to_set()?.len(), 3);
    assert_eq!(nums.to_hash_set()?.len(), 3);

    let last_wins = of(vec![("a", 1), ("b", 2), ("a", 3)]).to_map(|p| p.0, |p| p.1)?;
    assert_eq!(last_wins, BTreeMap::from([("a", 3), ("b", 2)]));
    Ok(())
}

#[test]
fn grouping_and_partitioning() -> Result<()> {
    let groups = words().group(|w| w.len() + usize::from(w.starts_with('a')))?;
    assert_eq!(groups[&4], vec!["ant", "ape", "asp"]);

    let firsts = words().group_by(|w| w.chars().next(), |w| w.len())?;
    assert_eq!(firsts[&Some('b')], vec![3, 3]);

    let chunks = range(0, 7).partition(3)?;
    assert_eq!(chunks, vec![vec![0, 1, 2], vec![3, 4, 5], vec![6]]);
    assert!(range(0, 7).partition(0).is_err());
    assert!(empty::<i32>().partition(2)?.is_empty());

    let buckets = range(0, 10).partition_by(|v| (*v as usize) % 3)?;
    assert_eq!(buckets, vec![vec![0, 3, 6, 9], vec![1, 4, 7], vec![2, 5, 8]]);
    let sparse = of(vec![5usize, 50]).partition_by(|v| *v / 10)?;
    assert_eq!(sparse, vec![vec![5], vec![50]]);
    Ok(())
}

#[test]
fn reductions() -> Result<()> {
    assert_eq!(range(1, 5).reduce(|a, b| a + b)?, Some(10));
    assert_eq!(empty::<i32>().reduce(|a, b| a + b)?, None);
    assert_eq!(of(vec!["x", "y", "z"]).fold(String::new(), |acc, s| acc + s)?, "xyz");
    assert_eq!(of(vec![4, 2, 8]).min()?, Some(2));
    assert_eq!(of(vec![4, 2, 8]).max()?, Some(8));
    assert_eq!(empty::<u8>().min()?, None);
    Ok(())
}

#[test]
fn matching_and_finding() -> Result<()> {
    let p = of(vec![2, 4, 6, 7]);
    assert!(p.any_match(|v| v % 2 == 1)?);
    assert!(!p.all_match(|v| v % 2 == 0)?);
    assert!(p.none_match(|v| *v > 10)?);
    assert!(empty::<i32>().all_match(|_| false)?);
    assert!(!empty::<i32>().any_match(|_| true)?);
    assert_eq!(p.filter(|v| *v > 3).find_first()?, Some(4));
    assert_eq!(p.filter(|v| *v > 100).find_first()?, None);
    assert!(p.find_any()?.is_some());
    Ok(())
}

#[test]
fn joining_and_writing() -> Result<()> {
    let p = of(vec![1, 2, 3]);
    assert_eq!(p.join()?, "[1,2,3]");
    assert_eq!(p.join_with("<", " | ", ">")?, "<1 | 2 | 3>");
    assert_eq!(p.join_by("", "-", "", |v| format!("#{v}"))?, "#1-#2-#3");
    assert_eq!(empty::<i32>().join()?, "[]");

    let mut out = Vec::new();
    p.write_to(&mut out)?;
    assert_eq!(String::from_utf8(out)?, "[1,2,3]\n");
    p.cout()?;
    Ok(())
}
