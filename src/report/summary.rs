use itertools::Itertools;
use polars::frame::DataFrame;

use crate::{
    error::SentimentResult,
    polars_ext::DataFrameExt,
    report::{
        aggregate::{self, weekday_name},
        stats,
    },
    schema::SentimentCol,
};

const RULE_WIDTH: usize = 60;

/// Plain-text summary of the reporting dataset.
pub fn text_report(df: &DataFrame) -> SentimentResult<String> {
    let dates = df.date_values(SentimentCol::Date.as_str())?;
    let range = dates.iter().flatten().minmax().into_option();
    let (first, last) = range.map_or_else(
        || ("n/a".to_string(), "n/a".to_string()),
        |(a, b)| (a.to_string(), b.to_string()),
    );
    let days = range.map_or_else(
        || "n/a".to_string(),
        |(a, b)| (*b - *a).num_days().to_string(),
    );

    let counts = aggregate::label_counts(df)?;
    let news = stats::describe(df, SentimentCol::NewsCount)?;
    let yearly = aggregate::yearly_label_counts(df)?;
    let weekdays = aggregate::weekday_pattern(df)?;

    let mut lines = vec![
        "=".repeat(RULE_WIDTH),
        "STOCK SENTIMENT EXPLORATORY REPORT".to_string(),
        "=".repeat(RULE_WIDTH),
        String::new(),
        "General".to_string(),
        format!("  Rows:       {}", df.height()),
        format!("  Columns:    {}", df.width()),
        format!("  Date range: {first} to {last}"),
        format!("  Days:       {days}"),
        String::new(),
        "Label distribution".to_string(),
    ];
    lines.extend([(0, "Down"), (1, "Up")].into_iter().map(|(label, name)| {
        format!(
            "  {label} ({name}): {:>6} ({:.2}%)",
            counts.get(label),
            counts.percent(label)
        )
    }));

    lines.extend([
        String::new(),
        "News_Count".to_string(),
        format!("  Mean:    {:.2}", news.mean),
        format!("  Median:  {:.2}", news.median),
        format!("  Mode:    {:.0}", news.mode),
        format!("  Std Dev: {:.2}", news.std),
        format!("  Min:     {:.0}", news.min),
        format!("  Max:     {:.0}", news.max),
        format!("  Q1:      {:.2}", news.q1),
        format!("  Q3:      {:.2}", news.q3),
        String::new(),
        "Rows per year".to_string(),
    ]);
    lines.extend(
        yearly
            .iter()
            .map(|y| format!("  {}: {:>5}", y.year, y.counts.total())),
    );

    lines.extend([String::new(), "Rows per weekday".to_string()]);
    lines.extend(
        weekdays
            .iter()
            .map(|w| format!("  {:<9}: {:>5}", weekday_name(w.weekday), w.counts.total())),
    );
    lines.push("=".repeat(RULE_WIDTH));

    Ok(lines.join("\n"))
}
