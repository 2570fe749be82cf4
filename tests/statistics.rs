use anyhow::Result;
use semflow::testing::assert_approx_eq;
use semflow::*;

const SAMPLE: [i32; 8] = [2, 4, 4, 4, 5, 5, 7, 9];

#[test]
fn reference_sample() -> Result<()> {
    let stats = from_slice(&SAMPLE).to_statistics()?;
    assert_eq!(stats.count(), 8);
    assert_approx_eq(stats.sum()?, 40.0, 1e-12);
    assert_approx_eq(stats.mean()?, 5.0, 1e-12);
    assert_approx_eq(stats.variance()?, 32.0 / 7.0, 1e-9);
    assert_approx_eq(stats.standard_deviation()?, (32.0f64 / 7.0).sqrt(), 1e-9);
    assert_approx_eq(stats.mode()?, 4.0, 0.0);
    assert_approx_eq(stats.median()?, 4.5, 1e-12);
    assert_eq!(stats.quartiles()?, [4.0, 5.0, 7.0]);
    assert_approx_eq(stats.interquartile_range()?, 3.0, 1e-12);
    assert_eq!(stats.maximum()?, Some(9));
    assert_eq!(stats.minimum()?, Some(2));
    assert_approx_eq(stats.range()?, 7.0, 0.0);
    Ok(())
}

#[test]
fn parallel_view_gives_same_statistics() -> Result<()> {
    let seq = from_slice(&SAMPLE).to_statistics()?;
    for k in semflow::testing::PARALLEL_DEGREES {
        let par = from_slice(&SAMPLE).parallel_with(k).to_statistics()?;
        assert_approx_eq(par.mean()?, seq.mean()?, 1e-12);
        assert_approx_eq(par.variance()?, seq.variance()?, 1e-9);
        assert_approx_eq(par.skewness()?, seq.skewness()?, 1e-9);
        assert_approx_eq(par.kurtosis()?, seq.kurtosis()?, 1e-9);
    }
    Ok(())
}

#[test]
fn shape_statistics() -> Result<()> {
    let symmetric = of(vec![1.0, 2.0, 3.0, 4.0, 5.0]).to_statistics()?;
    assert_approx_eq(symmetric.skewness()?, 0.0, 1e-12);

    let skewed = of(vec![1.0, 1.0, 1.0, 10.0]).to_statistics()?;
    assert!(skewed.skewness()? > 0.0);

    // Standardized moments with the sample standard deviation, over n.
    let sd = (1.25f64 / 3.0 * 4.0).sqrt();
    let expected: f64 = [-1.5f64, -0.5, 0.5, 1.5].iter().map(|d| (d / sd).powi(4)).sum::<f64>() / 4.0 - 3.0;
    let flat = of(vec![1.0, 2.0, 3.0, 4.0]).to_statistics()?;
    assert_approx_eq(flat.kurtosis()?, expected, 1e-9);
    Ok(())
}

#[test]
fn small_inputs_yield_zero() -> Result<()> {
    let none = empty::<f64>().to_statistics()?;
    assert!(none.is_empty());
    assert_eq!(none.mean()?, 0.0);
    assert_eq!(none.median()?, 0.0);
    assert_eq!(none.mode()?, 0.0);
    assert_eq!(none.quartiles()?, [0.0; 3]);
    assert_eq!(none.maximum()?, None);
    assert_eq!(none.range()?, 0.0);

    let one = of(vec![3u8]).to_statistics()?;
    assert_eq!(one.variance()?, 0.0);
    assert_eq!(one.skewness()?, 0.0);

    let constant = fill(2.5f32, 6).to_statistics()?;
    assert_eq!(constant.skewness()?, 0.0);
    assert_eq!(constant.kurtosis()?, 0.0);
    Ok(())
}

#[test]
fn mode_prefers_smallest_of_tied_values() -> Result<()> {
    let stats = of(vec![9, 3, 9, 3, 1]).to_statistics()?;
    assert_eq!(stats.mode()?, 3.0);
    let freq = stats.frequency()?;
    assert_eq!(freq.values().copied().collect::<Vec<_>>(), vec![1, 2, 2]);
    Ok(())
}

#[test]
fn metrics_are_cached_until_data_changes() -> Result<()> {
    let mut stats = of(vec![1, 2, 3]).to_statistics()?;
    assert!(!stats.is_cached(Metric::Mean));
    assert_eq!(stats.mean()?, 2.0);
    assert!(stats.is_cached(Metric::Mean));
    stats.variance()?;
    assert!(stats.is_cached(Metric::Variance));

    stats.assign(vec![10, 20])?;
    assert!(!stats.is_cached(Metric::Mean));
    assert!(!stats.is_cached(Metric::Variance));
    assert_eq!(stats.mean()?, 15.0);
    assert_eq!(stats.count(), 2);

    stats.clear();
    assert!(!stats.is_cached(Metric::Mean));
    Ok(())
}

#[test]
fn statistics_over_a_projection() -> Result<()> {
    #[derive(Clone)]
    struct Order {
        qty: u32,
    }
    let orders = of(vec![Order { qty: 3 }, Order { qty: 5 }, Order { qty: 10 }]);
    let stats = orders.to_statistics_by(|o| o.qty)?;
    assert_approx_eq(stats.mean()?, 6.0, 1e-12);
    assert_eq!(stats.values().to_vec()?, vec![3, 5, 10]);
    assert_eq!(stats.maximum()?, Some(10));
    Ok(())
}
