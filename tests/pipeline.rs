use anyhow::Result;
use semflow::testing::{CountingSource, assert_collections_equal};
use semflow::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn timestamps<E: Element>(p: &Semantic<E>) -> Result<Vec<Timestamp>> {
    let out = p
        .to_unordered()
        .fold_partitions(Vec::new, |acc: &mut Vec<Timestamp>, em| {
            acc.push(em.ts);
            std::ops::ControlFlow::Continue(())
        })?;
    Ok(out.into_iter().flatten().collect())
}

#[test]
fn sources_number_elements_in_construction_order() -> Result<()> {
    for n in [0usize, 1, 5, 64] {
        let items: Vec<usize> = (0..n).collect();
        let expected: Vec<Timestamp> = (0..n as Timestamp).collect();

        assert_eq!(timestamps(&of(items.clone()))?, expected);
        assert_eq!(timestamps(&from_slice(&items))?, expected);
        assert_eq!(timestamps(&from_iter(items.iter().copied()))?, expected);
        assert_eq!(timestamps(&fill(7u8, n))?, expected);
        assert_eq!(timestamps(&range(0usize, n))?, expected);
        assert_eq!(of(items.clone()).to_vec()?, items);
    }
    Ok(())
}

#[test]
fn building_a_chain_visits_nothing() -> Result<()> {
    let source = CountingSource::new(100);
    let chain = source
        .semantic()
        .filter(|v| v % 2 == 0)
        .map(|v| v * 3)
        .skip(2)
        .limit(5)
        .distinct()
        .reverse()
        .parallel_with(4);
    let _unordered = chain.to_unordered();
    assert_eq!(source.produced(), 0);

    assert_eq!(chain.sequential().count()?, 5);
    assert!(source.produced() > 0);
    Ok(())
}

#[test]
fn limit_interrupts_the_source() -> Result<()> {
    let source = CountingSource::new(1_000);
    let out = source.semantic().limit(3).to_vec()?;
    assert_collections_equal(&out, &[0, 1, 2]);
    assert_eq!(source.produced(), 3);

    source.reset();
    assert!(source.semantic().any_match(|v| *v == 10)?);
    assert_eq!(source.produced(), 11);

    source.reset();
    assert_eq!(source.semantic().find_first()?, Some(0));
    assert_eq!(source.produced(), 1);
    Ok(())
}

#[test]
fn filter_then_map() -> Result<()> {
    let out = of(vec![1, 2, 3, 4, 5]).filter(|x| x % 2 == 0).map(|x| x * 10).to_vec()?;
    assert_eq!(out, vec![20, 40]);
    Ok(())
}

#[test]
fn map_runs_once_per_element() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let out = range(0u32, 10)
        .map(move |v| {
            seen.fetch_add(1, Ordering::SeqCst);
            v + 1
        })
        .take_while(|v| *v < 5)
        .to_vec()?;
    assert_eq!(out, vec![1, 2, 3, 4]);
    // The fifth mapped value is computed for the interrupt, then rejected.
    assert_eq!(calls.load(Ordering::SeqCst), 5);
    Ok(())
}

#[test]
fn sorted_and_reversed() -> Result<()> {
    assert_eq!(of(vec![5, 3, 1, 4, 2]).sorted()?.to_vec()?, vec![1, 2, 3, 4, 5]);
    assert_eq!(of(vec![1, 2, 3]).reverse().to_ordered()?.to_vec()?, vec![3, 2, 1]);
    Ok(())
}

#[test]
fn skip_and_limit_boundaries() -> Result<()> {
    assert_eq!(range(0, 10).skip(3).limit(4).to_vec()?, vec![3, 4, 5, 6]);
    assert!(range(0, 10).skip(10).to_vec()?.is_empty());
    assert!(range(0, 10).skip(25).to_vec()?.is_empty());
    assert!(range(0, 10).limit(0).to_vec()?.is_empty());
    assert_eq!(range(0, 3).limit(10).to_vec()?, vec![0, 1, 2]);
    Ok(())
}

#[test]
fn skip_rebases_timestamps() -> Result<()> {
    assert_eq!(timestamps(&range(0, 6).skip(2))?, vec![0, 1, 2, 3]);
    assert_eq!(range(0, 10).sub(7, 3).to_vec()?, vec![3, 4, 5, 6]);
    assert_eq!(timestamps(&range(0, 10).sub(3, 7))?, vec![0, 1, 2, 3]);
    Ok(())
}

#[test]
fn concat_keeps_indices_distinct() -> Result<()> {
    let joined = range(0, 4).concat(&range(10, 13));
    let ordered = joined.to_ordered()?;
    assert_eq!(ordered.len(), 7);
    let ts: Vec<Timestamp> = ordered.as_slice().iter().map(|t| t.ts).collect();
    assert_eq!(ts, (0..7).collect::<Vec<_>>());
    assert_eq!(ordered.to_vec()?, vec![0, 1, 2, 3, 10, 11, 12]);

    assert_eq!(empty::<i32>().concat(&of(vec![1])).to_vec()?, vec![1]);
    Ok(())
}

#[test]
fn distinct_keeps_first_occurrence() -> Result<()> {
    assert_eq!(of(vec![1, 2, 1, 3, 2, 4]).distinct().to_vec()?, vec![1, 2, 3, 4]);

    let words = of(vec!["apple", "avocado", "banana", "blueberry", "cherry"]);
    let by_letter = words.distinct_by(|w| w.chars().next()).to_vec()?;
    assert_eq!(by_letter, vec!["apple", "banana", "cherry"]);

    let close = of(vec![1.0, 1.05, 2.0, 2.01, 3.5]).distinct_with(|a: &f64, b: &f64| (a - b).abs() < 0.1);
    assert_eq!(close.to_vec()?, vec![1.0, 2.0, 3.5]);
    Ok(())
}

#[test]
fn flat_map_renumbers_across_inner_pipelines() -> Result<()> {
    let nested = of(vec![2usize, 0, 3]).flat_map(|n| range(0usize, *n));
    assert_eq!(nested.to_vec()?, vec![0, 1, 0, 1, 2]);
    assert_eq!(timestamps(&nested)?, vec![0, 1, 2, 3, 4]);

    // Stopping inside an inner pipeline stops the outer one too.
    let source = CountingSource::new(100);
    let out = source.semantic().flat_map(|v| fill(*v, 2)).limit(3).to_vec()?;
    assert_eq!(out, vec![0, 0, 1]);
    assert_eq!(source.produced(), 2);

    let words = of(vec!["a b".to_string(), "c".to_string()])
        .flat(|line| of(line.split(' ').map(String::from).collect()));
    assert_eq!(words.to_vec()?, vec!["a", "b", "c"]);
    Ok(())
}

#[test]
fn take_and_drop_while() -> Result<()> {
    let data = of(vec![1, 2, 5, 1, 7]);
    assert_eq!(data.take_while(|v| *v < 3).to_vec()?, vec![1, 2]);
    assert_eq!(data.drop_while(|v| *v < 3).to_vec()?, vec![5, 1, 7]);
    assert!(data.take_while(|_| false).to_vec()?.is_empty());
    Ok(())
}

#[test]
fn peek_observes_emitted_elements() -> Result<()> {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let total = range(0u64, 10)
        .peek(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .limit(4)
        .collect(Sum::<u64>::new())?;
    assert_eq!(total, 6);
    assert_eq!(seen.load(Ordering::SeqCst), 4);
    Ok(())
}

#[test]
fn pipelines_rerun_from_the_source() -> Result<()> {
    let source = CountingSource::new(5);
    let p = source.semantic().map(|v| v * 2);
    assert_eq!(p.to_vec()?, vec![0, 2, 4, 6, 8]);
    assert_eq!(p.count()?, 5);
    assert_eq!(source.produced(), 10);

    // Diamond: one upstream feeding two branches.
    let evens = p.filter(|v| v % 4 == 0);
    let odds = p.filter(|v| v % 4 != 0);
    assert_eq!(evens.concat(&odds).to_vec()?, vec![0, 4, 8, 2, 6]);
    Ok(())
}

#[test]
fn iterate_wraps_a_closure() -> Result<()> {
    let squares = iterate(|accept: &mut dyn FnMut(u32, Timestamp), interrupt: &mut dyn FnMut(&u32) -> bool| -> Result<()> {
        for i in 0..5u32 {
            let v = i * i;
            if interrupt(&v) {
                break;
            }
            accept(v, Timestamp::from(i));
        }
        Ok(())
    });
    assert_eq!(squares.to_vec()?, vec![0, 1, 4, 9, 16]);
    assert_eq!(squares.limit(2).to_vec()?, vec![0, 1]);
    Ok(())
}

#[test]
fn failing_generator_surfaces_from_terminal() {
    let broken = iterate(|accept: &mut dyn FnMut(u8, Timestamp), _: &mut dyn FnMut(&u8) -> bool| -> Result<()> {
        accept(1, 0);
        anyhow::bail!("source went away")
    });
    let err = broken.map(|v| v + 1).to_vec().unwrap_err();
    assert!(err.to_string().contains("source went away"));
    assert!(broken.parallel_with(2).count().is_err());
}
