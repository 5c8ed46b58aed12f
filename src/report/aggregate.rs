use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate};
use polars::{
    frame::DataFrame,
    prelude::{DataType, Expr, IntoLazy, PlSmallStr, SortMultipleOptions, col, lit},
};
use serde::Serialize;

use crate::{
    error::{DataError, SentimentResult},
    polars_ext::{DataFrameExt, ExprExt, frame_error},
    schema::SentimentCol,
};

const DOWN: &str = "__down";
const UP: &str = "__up";
const TOTAL: &str = "__total";
const DOWN_PCT: &str = "__down_pct";
const UP_PCT: &str = "__up_pct";
const MEAN: &str = "__mean";

/// English weekday names, indexed by `DayOfWeek`.
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

pub fn weekday_name(day_of_week: i32) -> &'static str {
    usize::try_from(day_of_week)
        .ok()
        .and_then(|i| WEEKDAY_NAMES.get(i).copied())
        .unwrap_or("Unknown")
}

// ================================================================================================
// Result Types
// ================================================================================================

/// Row counts per label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LabelCounts {
    pub down: usize,
    pub up: usize,
}

impl LabelCounts {
    pub fn total(&self) -> usize {
        self.down + self.up
    }

    pub fn get(&self, label: i32) -> usize {
        if label == 0 { self.down } else { self.up }
    }

    /// Percentage of rows carrying `label`, 0 for an empty group.
    pub fn percent(&self, label: i32) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.get(label) as f64 / total as f64 * 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthlyCounts {
    /// First day of the calendar month.
    pub month: NaiveDate,
    pub counts: LabelCounts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearlyCounts {
    pub year: i32,
    pub counts: LabelCounts,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeekdayCounts {
    /// 0 = Monday .. 6 = Sunday.
    pub weekday: i32,
    pub counts: LabelCounts,
    pub down_pct: f64,
    pub up_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthlyMean {
    pub month: NaiveDate,
    pub mean: f64,
}

/// Mean label per (year, quarter); `cells[y][q]` pairs `years[y]` with `quarters[q]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuarterGrid {
    pub years: Vec<i32>,
    pub quarters: Vec<i32>,
    pub cells: Vec<Vec<Option<f64>>>,
}

impl QuarterGrid {
    pub fn get(&self, year: i32, quarter: i32) -> Option<f64> {
        let y = self.years.iter().position(|v| *v == year)?;
        let q = self.quarters.iter().position(|v| *v == quarter)?;
        self.cells[y][q]
    }
}

// ================================================================================================
// Aggregations
// ================================================================================================

pub fn label_counts(df: &DataFrame) -> SentimentResult<LabelCounts> {
    let out = df
        .clone()
        .lazy()
        .select(label_count_exprs())
        .collect()
        .map_err(|e| frame_error("Failed to count labels", e))?;

    Ok(LabelCounts {
        down: first_count(&out, DOWN)?,
        up: first_count(&out, UP)?,
    })
}

/// Label counts for every calendar month between the first and last row, zero-filled.
pub fn monthly_label_counts(df: &DataFrame) -> SentimentResult<Vec<MonthlyCounts>> {
    let out = grouped_label_counts(df, &[SentimentCol::Year, SentimentCol::Month])?;
    let years = out.int_values(SentimentCol::Year.as_str())?;
    let months = out.int_values(SentimentCol::Month.as_str())?;
    let downs = counts(&out, DOWN)?;
    let ups = counts(&out, UP)?;

    let mut observed = BTreeMap::new();
    for (i, (year, month)) in years.into_iter().zip(months).enumerate() {
        let month = month_start(year, month)?;
        observed.insert(
            month,
            LabelCounts {
                down: downs[i],
                up: ups[i],
            },
        );
    }

    let (Some(first), Some(last)) = (
        observed.keys().next().copied(),
        observed.keys().next_back().copied(),
    ) else {
        return Ok(Vec::new());
    };

    let mut filled = Vec::new();
    let mut month = first;
    while month <= last {
        filled.push(MonthlyCounts {
            month,
            counts: observed.get(&month).copied().unwrap_or_default(),
        });
        month = month
            .checked_add_months(Months::new(1))
            .ok_or_else(|| DataError::Schema(format!("month after {month} is out of range")))?;
    }

    Ok(filled)
}

pub fn yearly_label_counts(df: &DataFrame) -> SentimentResult<Vec<YearlyCounts>> {
    let out = grouped_label_counts(df, &[SentimentCol::Year])?;
    let years = out.int_values(SentimentCol::Year.as_str())?;
    let downs = counts(&out, DOWN)?;
    let ups = counts(&out, UP)?;

    years
        .into_iter()
        .enumerate()
        .map(|(i, year)| {
            Ok(YearlyCounts {
                year: narrow(year, SentimentCol::Year)?,
                counts: LabelCounts {
                    down: downs[i],
                    up: ups[i],
                },
            })
        })
        .collect()
}

/// Label counts and shares for the weekdays present in the data.
pub fn weekday_pattern(df: &DataFrame) -> SentimentResult<Vec<WeekdayCounts>> {
    let out = df
        .clone()
        .lazy()
        .group_by([col(SentimentCol::DayOfWeek.name())])
        .agg(label_count_exprs())
        .with_column((col(DOWN) + col(UP)).alias(TOTAL))
        .with_columns([
            (col(DOWN).safe_div(col(TOTAL), None) * lit(100.0)).alias(DOWN_PCT),
            (col(UP).safe_div(col(TOTAL), None) * lit(100.0)).alias(UP_PCT),
        ])
        .sort([SentimentCol::DayOfWeek.name()], SortMultipleOptions::default())
        .collect()
        .map_err(|e| frame_error("Failed to aggregate weekday pattern", e))?;

    let weekdays = out.int_values(SentimentCol::DayOfWeek.as_str())?;
    let downs = counts(&out, DOWN)?;
    let ups = counts(&out, UP)?;
    let down_pct = out.float_values(DOWN_PCT)?;
    let up_pct = out.float_values(UP_PCT)?;

    weekdays
        .into_iter()
        .enumerate()
        .map(|(i, weekday)| {
            Ok(WeekdayCounts {
                weekday: narrow(weekday, SentimentCol::DayOfWeek)?,
                counts: LabelCounts {
                    down: downs[i],
                    up: ups[i],
                },
                down_pct: down_pct[i].unwrap_or_default(),
                up_pct: up_pct[i].unwrap_or_default(),
            })
        })
        .collect()
}

/// Mean `News_Count` per calendar month; months without rows are absent.
pub fn monthly_news_mean(df: &DataFrame) -> SentimentResult<Vec<MonthlyMean>> {
    let keys = [SentimentCol::Year, SentimentCol::Month];
    let out = df
        .clone()
        .lazy()
        .group_by(keys.iter().map(|k| col(k.name())).collect::<Vec<_>>())
        .agg([col(SentimentCol::NewsCount.name())
            .cast(DataType::Float64)
            .mean()
            .alias(MEAN)])
        .sort(
            keys.iter().map(|k| k.name()).collect::<Vec<PlSmallStr>>(),
            SortMultipleOptions::default(),
        )
        .collect()
        .map_err(|e| frame_error("Failed to aggregate monthly news counts", e))?;

    let years = out.int_values(SentimentCol::Year.as_str())?;
    let months = out.int_values(SentimentCol::Month.as_str())?;
    let means = out.float_values(MEAN)?;

    years
        .into_iter()
        .zip(months)
        .zip(means)
        .map(|((year, month), mean)| {
            Ok(MonthlyMean {
                month: month_start(year, month)?,
                mean: mean.unwrap_or_default(),
            })
        })
        .collect()
}

/// Mean label for each (year, quarter) combination present in the data.
pub fn quarter_grid(df: &DataFrame) -> SentimentResult<QuarterGrid> {
    let keys = [SentimentCol::Year, SentimentCol::Quarter];
    let out = df
        .clone()
        .lazy()
        .group_by(keys.iter().map(|k| col(k.name())).collect::<Vec<_>>())
        .agg([col(SentimentCol::Label.name())
            .cast(DataType::Float64)
            .mean()
            .alias(MEAN)])
        .collect()
        .map_err(|e| frame_error("Failed to aggregate quarterly sentiment", e))?;

    let years = out
        .int_values(SentimentCol::Year.as_str())?
        .into_iter()
        .map(|v| narrow(v, SentimentCol::Year))
        .collect::<SentimentResult<Vec<_>>>()?;
    let quarters = out
        .int_values(SentimentCol::Quarter.as_str())?
        .into_iter()
        .map(|v| narrow(v, SentimentCol::Quarter))
        .collect::<SentimentResult<Vec<_>>>()?;
    let means = out.float_values(MEAN)?;

    let mut grid = QuarterGrid {
        years: sorted_unique(&years),
        quarters: sorted_unique(&quarters),
        cells: Vec::new(),
    };
    grid.cells = vec![vec![None; grid.quarters.len()]; grid.years.len()];

    for ((year, quarter), mean) in years.iter().zip(&quarters).zip(means) {
        let y = grid.years.binary_search(year).unwrap_or_default();
        let q = grid.quarters.binary_search(quarter).unwrap_or_default();
        grid.cells[y][q] = mean;
    }

    Ok(grid)
}

// ================================================================================================
// Helpers
// ================================================================================================

fn label_count_exprs() -> [Expr; 2] {
    let label = || col(SentimentCol::Label.name());
    [
        label().eq(lit(0)).cast(DataType::Int64).sum().alias(DOWN),
        label().eq(lit(1)).cast(DataType::Int64).sum().alias(UP),
    ]
}

fn grouped_label_counts(df: &DataFrame, keys: &[SentimentCol]) -> SentimentResult<DataFrame> {
    df.clone()
        .lazy()
        .group_by(keys.iter().map(|k| col(k.name())).collect::<Vec<_>>())
        .agg(label_count_exprs())
        .sort(
            keys.iter().map(|k| k.name()).collect::<Vec<PlSmallStr>>(),
            SortMultipleOptions::default(),
        )
        .collect()
        .map_err(|e| frame_error("Failed to aggregate label counts", e))
}

fn counts(df: &DataFrame, name: &str) -> SentimentResult<Vec<usize>> {
    Ok(df
        .int_values(name)?
        .into_iter()
        .map(|v| v.and_then(|n| usize::try_from(n).ok()).unwrap_or_default())
        .collect())
}

fn first_count(df: &DataFrame, name: &str) -> SentimentResult<usize> {
    Ok(counts(df, name)?.first().copied().unwrap_or_default())
}

fn narrow(value: Option<i64>, column: SentimentCol) -> SentimentResult<i32> {
    value
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(|| DataError::Schema(format!("invalid '{column}' group key")).into())
}

fn month_start(year: Option<i64>, month: Option<i64>) -> SentimentResult<NaiveDate> {
    let year = narrow(year, SentimentCol::Year)?;
    let month = narrow(month, SentimentCol::Month)?;
    u32::try_from(month)
        .ok()
        .and_then(|m| NaiveDate::from_ymd_opt(year, m, 1))
        .ok_or_else(|| DataError::Schema(format!("invalid year/month {year}-{month}")).into())
}

fn sorted_unique(values: &[i32]) -> Vec<i32> {
    let mut out = values.to_vec();
    out.sort_unstable();
    out.dedup();
    out
}

/// Formats a month start as `YYYY-MM`.
pub fn month_label(month: NaiveDate) -> String {
    format!("{:04}-{:02}", month.year(), month.month())
}

#[cfg(test)]
mod tests {
    use polars::df;

    use super::*;

    fn frame() -> DataFrame {
        df![
            "Label" => &[0i32, 1, 1, 0, 1],
            "Year" => &[2008i32, 2008, 2008, 2009, 2009],
            "Month" => &[8i32, 8, 11, 1, 1],
            "DayOfWeek" => &[4i32, 0, 0, 1, 4],
            "Quarter" => &[3i32, 3, 4, 1, 1],
            "News_Count" => &[25i32, 23, 25, 20, 24],
        ]
        .expect("Failed to create mock DF")
    }

    #[test]
    fn test_label_counts() {
        let counts = label_counts(&frame()).expect("label counts");
        assert_eq!(counts, LabelCounts { down: 2, up: 3 });
        assert_eq!(counts.total(), 5);
        assert!((counts.percent(1) - 60.0).abs() < 1e-9);
        assert_eq!(LabelCounts::default().percent(0), 0.0);
    }

    #[test]
    fn test_monthly_counts_fill_gaps() {
        let monthly = monthly_label_counts(&frame()).expect("monthly counts");

        // 2008-08 .. 2009-01 inclusive.
        assert_eq!(monthly.len(), 6);
        assert_eq!(month_label(monthly[0].month), "2008-08");
        assert_eq!(monthly[0].counts, LabelCounts { down: 1, up: 1 });
        assert_eq!(monthly[1].counts, LabelCounts::default());
        assert_eq!(monthly[3].counts, LabelCounts { down: 0, up: 1 });
        assert_eq!(month_label(monthly[5].month), "2009-01");
    }

    #[test]
    fn test_yearly_counts() {
        let yearly = yearly_label_counts(&frame()).expect("yearly counts");
        assert_eq!(
            yearly,
            vec![
                YearlyCounts {
                    year: 2008,
                    counts: LabelCounts { down: 1, up: 2 }
                },
                YearlyCounts {
                    year: 2009,
                    counts: LabelCounts { down: 1, up: 1 }
                },
            ]
        );
    }

    #[test]
    fn test_weekday_pattern_only_present_days() {
        let pattern = weekday_pattern(&frame()).expect("weekday pattern");

        assert_eq!(
            pattern.iter().map(|w| w.weekday).collect::<Vec<_>>(),
            vec![0, 1, 4]
        );
        assert_eq!(pattern[0].counts, LabelCounts { down: 0, up: 2 });
        assert!((pattern[0].up_pct - 100.0).abs() < 1e-9);
        assert!((pattern[2].down_pct - 50.0).abs() < 1e-9);
        assert_eq!(weekday_name(pattern[2].weekday), "Friday");
    }

    #[test]
    fn test_monthly_news_mean_skips_empty_months() {
        let means = monthly_news_mean(&frame()).expect("monthly means");
        assert_eq!(means.len(), 3);
        assert!((means[0].mean - 24.0).abs() < 1e-9);
        assert_eq!(month_label(means[2].month), "2009-01");
        assert!((means[2].mean - 22.0).abs() < 1e-9);
    }

    #[test]
    fn test_quarter_grid() {
        let grid = quarter_grid(&frame()).expect("quarter grid");
        assert_eq!(grid.years, vec![2008, 2009]);
        assert_eq!(grid.quarters, vec![1, 3, 4]);
        assert_eq!(grid.get(2008, 3), Some(0.5));
        assert_eq!(grid.get(2008, 4), Some(1.0));
        assert_eq!(grid.get(2009, 1), Some(0.5));
        assert_eq!(grid.get(2008, 1), None);
        assert_eq!(grid.get(2009, 4), None);
    }

    #[test]
    fn test_quarter_grid_single_cell() {
        let df = df![
            "Label" => &[1i32, 0, 1],
            "Year" => &[2012i32, 2012, 2012],
            "Quarter" => &[2i32, 2, 2],
        ]
        .expect("Failed to create mock DF");

        let grid = quarter_grid(&df).expect("quarter grid");
        assert_eq!(grid.years, vec![2012]);
        assert_eq!(grid.quarters, vec![2]);
        assert_eq!(grid.cells.len(), 1);
        let mean = grid.cells[0][0].expect("cell value");
        assert!((mean - 2.0 / 3.0).abs() < 1e-9);
    }
}
