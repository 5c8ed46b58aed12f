use itertools::{Itertools, izip};
use polars::{
    frame::DataFrame,
    prelude::{DataType, Expr, IntoLazy, QuantileMethod, SortMultipleOptions, col, lit},
};
use serde::Serialize;

use crate::{
    error::{ReportError, SentimentResult},
    polars_ext::{DataFrameExt, frame_error},
    schema::SentimentCol,
};

/// Number of equal-width bins of the `News_Count` histogram.
pub const HISTOGRAM_BINS: usize = 25;

/// Whisker reach in multiples of the interquartile range.
const WHISKER_IQR: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Describe {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Smallest of the most frequent values.
    pub mode: f64,
    /// Sample standard deviation (n - 1); 0 for a single value.
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub q1: f64,
    pub q3: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    /// `bins + 1` ascending edges; the last bin is closed on both sides.
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxStats {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

/// Descriptive statistics of a numeric column.
pub fn describe(df: &DataFrame, column: SentimentCol) -> SentimentResult<Describe> {
    let values = df
        .float_values(column.as_str())?
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();
    if values.is_empty() {
        return Err(ReportError::EmptyDataset.into());
    }

    let out = df
        .clone()
        .lazy()
        .select([
            value(column).mean().alias("__mean"),
            value(column).median().alias("__median"),
            value(column).std(1).fill_null(lit(0.0)).alias("__std"),
            value(column).min().alias("__min"),
            value(column).max().alias("__max"),
            quantile(column, 0.25).alias("__q1"),
            quantile(column, 0.75).alias("__q3"),
        ])
        .collect()
        .map_err(|e| frame_error(&format!("Failed to describe '{column}'"), e))?;

    let scalar = |name: &str| -> SentimentResult<f64> {
        Ok(out
            .float_values(name)?
            .first()
            .copied()
            .flatten()
            .unwrap_or_default())
    };

    Ok(Describe {
        count: values.len(),
        mean: scalar("__mean")?,
        median: scalar("__median")?,
        mode: mode(&values).unwrap_or_default(),
        std: scalar("__std")?,
        min: scalar("__min")?,
        max: scalar("__max")?,
        q1: scalar("__q1")?,
        q3: scalar("__q3")?,
    })
}

/// Box plot geometry of `column` for each label, ordered by label.
///
/// Quartiles use the same linear interpolation as [`describe`]; whiskers sit at the most
/// extreme values within 1.5 IQR of the box.
pub fn box_stats_by_label(
    df: &DataFrame,
    column: SentimentCol,
) -> SentimentResult<Vec<(i32, BoxStats)>> {
    let label = || col(SentimentCol::Label.name());
    let quartiles = df
        .clone()
        .lazy()
        .filter(label().is_not_null())
        .group_by([label()])
        .agg([
            quantile(column, 0.25).alias("__q1"),
            value(column).median().alias("__median"),
            quantile(column, 0.75).alias("__q3"),
        ])
        .sort([SentimentCol::Label.name()], SortMultipleOptions::default())
        .collect()
        .map_err(|e| frame_error(&format!("Failed to compute quartiles of '{column}'"), e))?;

    let labels = df.int_values(SentimentCol::Label.as_str())?;
    let values = df.float_values(column.as_str())?;

    Ok(izip!(
        quartiles.int_values(SentimentCol::Label.as_str())?,
        quartiles.float_values("__q1")?,
        quartiles.float_values("__median")?,
        quartiles.float_values("__q3")?,
    )
    .filter_map(|(group, q1, median, q3)| {
        let group = group?;
        let members = labels
            .iter()
            .zip(&values)
            .filter(|(l, _)| **l == Some(group))
            .filter_map(|(_, v)| *v)
            .collect::<Vec<_>>();
        let bounds = [q1, median, q3].map(|q| q.unwrap_or(f64::NAN));
        Some((
            i32::try_from(group).unwrap_or_default(),
            box_geometry(bounds, &members),
        ))
    })
    .collect())
}

fn box_geometry([q1, median, q3]: [f64; 3], values: &[f64]) -> BoxStats {
    let sorted = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .sorted_by(f64::total_cmp)
        .collect::<Vec<_>>();

    let reach = WHISKER_IQR * (q3 - q1);
    let (low_fence, high_fence) = (q1 - reach, q3 + reach);

    let inside = || sorted.iter().copied().filter(|v| *v >= low_fence && *v <= high_fence);
    BoxStats {
        q1,
        median,
        q3,
        lower_whisker: inside().next().unwrap_or(q1),
        upper_whisker: inside().last().unwrap_or(q3),
        outliers: sorted
            .iter()
            .copied()
            .filter(|v| *v < low_fence || *v > high_fence)
            .collect(),
    }
}

/// Counts `values` into `bins` equal-width bins spanning `[min, max]`.
///
/// A constant input is centred in a unit-wide range.
pub fn histogram(values: &[f64], bins: usize) -> Histogram {
    let bins = bins.max(1);
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let (lo, hi) = match finite.clone().minmax_by(f64::total_cmp).into_option() {
        Some((lo, hi)) if lo < hi => (lo, hi),
        Some((v, _)) => (v - 0.5, v + 0.5),
        None => (0.0, 1.0),
    };

    let width = (hi - lo) / bins as f64;
    let edges = (0..=bins).map(|i| lo + width * i as f64).collect::<Vec<_>>();

    let mut counts = vec![0; bins];
    for v in finite {
        let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    Histogram { edges, counts }
}

/// Most frequent value, ties broken towards the smallest.
fn mode(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .map(|v| v.to_bits())
        .counts()
        .into_iter()
        .map(|(bits, n)| (n, f64::from_bits(bits)))
        .max_by(|(na, va), (nb, vb)| na.cmp(nb).then_with(|| vb.total_cmp(va)))
        .map(|(_, v)| v)
}

fn value(column: SentimentCol) -> Expr {
    col(column.name()).cast(DataType::Float64)
}

fn quantile(column: SentimentCol, q: f64) -> Expr {
    value(column).quantile(lit(q), QuantileMethod::Linear)
}

#[cfg(test)]
mod tests {
    use polars::df;

    use super::*;

    #[test]
    fn test_describe_news_count() {
        let df = df![
            "Label" => &[0i32, 1, 1, 0, 1],
            "News_Count" => &[25i32, 23, 25, 20, 24],
        ]
        .expect("Failed to create mock DF");

        let d = describe(&df, SentimentCol::NewsCount).expect("describe");

        assert_eq!(d.count, 5);
        assert!((d.mean - 23.4).abs() < 1e-9);
        assert_eq!(d.median, 24.0);
        assert_eq!(d.mode, 25.0);
        assert_eq!((d.min, d.max), (20.0, 25.0));
        assert_eq!((d.q1, d.q3), (23.0, 25.0));
        // Sample variance: (2.56 + 0.16 + 2.56 + 11.56 + 0.36) / 4 = 4.3
        assert!((d.std - 4.3f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_mode_prefers_smallest_on_tie() {
        assert_eq!(mode(&[3.0, 1.0, 3.0, 1.0, 2.0]), Some(1.0));
        assert_eq!(mode(&[]), None);
    }

    #[test]
    fn test_histogram_closes_last_bin() {
        let h = histogram(&[0.0, 1.0, 2.0, 3.0, 4.0], 4);
        assert_eq!(h.edges, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(h.counts, vec![1, 1, 1, 2]);

        let constant = histogram(&[25.0, 25.0], HISTOGRAM_BINS);
        assert_eq!(constant.counts.iter().sum::<usize>(), 2);
        assert_eq!(constant.edges.len(), HISTOGRAM_BINS + 1);
    }

    #[test]
    fn test_box_stats_whiskers_and_outliers() {
        let df = df![
            "Label" => &[1i32; 6],
            "News_Count" => &[3i32, 100, 1, 5, 2, 4],
        ]
        .expect("Failed to create mock DF");

        let boxes = box_stats_by_label(&df, SentimentCol::NewsCount).expect("box stats");
        assert_eq!(boxes.len(), 1);
        let (label, b) = &boxes[0];
        assert_eq!(*label, 1);
        assert_eq!(b.q1, 2.25);
        assert_eq!(b.median, 3.5);
        assert_eq!(b.q3, 4.75);
        assert_eq!(b.lower_whisker, 1.0);
        assert_eq!(b.upper_whisker, 5.0);
        assert_eq!(b.outliers, vec![100.0]);
    }

    #[test]
    fn test_box_stats_by_label() {
        let df = df![
            "Label" => &[1i32, 0, 1, 0],
            "News_Count" => &[25i32, 20, 23, 22],
        ]
        .expect("Failed to create mock DF");

        let boxes = box_stats_by_label(&df, SentimentCol::NewsCount).expect("box stats");
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].0, 0);
        assert_eq!(boxes[0].1.median, 21.0);
        assert_eq!(boxes[1].0, 1);
        assert_eq!(boxes[1].1.median, 24.0);

        let d = describe(&df, SentimentCol::NewsCount).expect("describe");
        let all = df![
            "Label" => &[0i32; 4],
            "News_Count" => &[25i32, 20, 23, 22],
        ]
        .expect("Failed to create mock DF");
        let pooled = box_stats_by_label(&all, SentimentCol::NewsCount).expect("box stats");
        assert_eq!((pooled[0].1.q1, pooled[0].1.q3), (d.q1, d.q3));
    }
}
