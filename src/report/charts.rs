use std::{f64::consts::TAU, path::Path};

use plotters::{
    coord::{CoordTranslate, Shift},
    prelude::*,
    style::text_anchor::{HPos, Pos, VPos},
};
use strum::{Display, EnumIter};

use crate::{
    error::SentimentResult,
    report::{
        aggregate::{
            LabelCounts, MonthlyCounts, MonthlyMean, QuarterGrid, WeekdayCounts, YearlyCounts,
            month_label, weekday_name,
        },
        stats::{BoxStats, Describe, Histogram},
        style::{ChartStyle, diverging_color},
    },
};

type Area<'a> = DrawingArea<SVGBackend<'a>, Shift>;

const LABEL_NAMES: [&str; 2] = ["Down (0)", "Up (1)"];
const LABELS: [i32; 2] = [0, 1];

/// The six chart artifacts of a report, in rendering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum ChartFile {
    #[strum(serialize = "01_sentiment_distribution")]
    SentimentDistribution,
    #[strum(serialize = "02_temporal_trend")]
    TemporalTrend,
    #[strum(serialize = "03_yearly_sentiment")]
    YearlySentiment,
    #[strum(serialize = "04_weekday_pattern")]
    WeekdayPattern,
    #[strum(serialize = "05_news_count_distribution")]
    NewsCountDistribution,
    #[strum(serialize = "06_quarterly_heatmap")]
    QuarterlyHeatmap,
}

impl ChartFile {
    pub fn file_name(&self) -> String {
        format!("{self}.svg")
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::SentimentDistribution => "Market Sentiment Distribution",
            Self::TemporalTrend => "Monthly Sentiment Trend",
            Self::YearlySentiment => "Sentiment by Year",
            Self::WeekdayPattern => "Sentiment by Day of Week",
            Self::NewsCountDistribution => "Daily Headline Count",
            Self::QuarterlyHeatmap => "Mean Label by Year and Quarter",
        }
    }
}

// ================================================================================================
// 01 Label distribution
// ================================================================================================

pub(crate) fn sentiment_distribution(
    path: &Path,
    style: &ChartStyle,
    counts: &LabelCounts,
) -> SentimentResult<()> {
    let root = canvas(path, style, ChartFile::SentimentDistribution)?;
    let panels = root.split_evenly((1, 2));

    let y_max = headroom(counts.down.max(counts.up) as f64);
    let mut chart = ChartBuilder::on(&panels[0])
        .caption("Days per label", style.label_font())
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5f64..1.5f64, 0f64..y_max)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(3)
        .x_label_formatter(&|v| category_label(&LABEL_NAMES, *v))
        .y_desc("Days")
        .label_style(style.label_font())
        .draw()?;
    chart.draw_series(LABELS.iter().map(|&label| {
        let x = f64::from(label);
        Rectangle::new(
            [(x - 0.35, 0.0), (x + 0.35, counts.get(label) as f64)],
            style.label_color(label).filled(),
        )
    }))?;
    chart.draw_series(LABELS.iter().map(|&label| {
        let n = counts.get(label);
        Text::new(
            n.to_string(),
            (f64::from(label), n as f64),
            anchored(style, VPos::Bottom),
        )
    }))?;

    let pie = panels[1].titled("Share of days", style.label_font())?;
    draw_pie(&pie, style, counts)?;

    root.present()?;
    Ok(())
}

fn draw_pie(area: &Area, style: &ChartStyle, counts: &LabelCounts) -> SentimentResult<()> {
    let (w, h) = area.dim_in_pixel();
    let center = (w as i32 / 2, h as i32 / 2);
    let radius = f64::from(w.min(h)) * 0.35;
    let total = counts.total().max(1) as f64;

    let mut start = -TAU / 4.0;
    for (label, name) in LABELS.iter().zip(LABEL_NAMES) {
        let n = counts.get(*label);
        if n == 0 {
            continue;
        }
        let sweep = n as f64 / total * TAU;
        let mid = start + sweep / 2.0;

        area.draw(&Polygon::new(
            wedge(center, radius, start, sweep),
            style.label_color(*label).filled(),
        ))?;
        area.draw(&Text::new(
            format!("{:.1}%", counts.percent(*label)),
            polar(center, radius * 0.6, mid),
            anchored(style, VPos::Center),
        ))?;
        area.draw(&Text::new(
            name,
            polar(center, radius * 1.15, mid),
            anchored(style, VPos::Center),
        ))?;

        start += sweep;
    }
    Ok(())
}

fn polar(center: (i32, i32), radius: f64, angle: f64) -> (i32, i32) {
    (
        center.0 + (radius * angle.cos()).round() as i32,
        center.1 + (radius * angle.sin()).round() as i32,
    )
}

fn wedge(center: (i32, i32), radius: f64, start: f64, sweep: f64) -> Vec<(i32, i32)> {
    let steps = ((sweep / TAU) * 180.0).ceil().max(2.0) as usize;
    std::iter::once(center)
        .chain((0..=steps).map(|i| polar(center, radius, start + sweep * i as f64 / steps as f64)))
        .collect()
}

// ================================================================================================
// 02 Monthly trend
// ================================================================================================

pub(crate) fn temporal_trend(
    path: &Path,
    style: &ChartStyle,
    monthly: &[MonthlyCounts],
) -> SentimentResult<()> {
    let root = canvas(path, style, ChartFile::TemporalTrend)?;

    let names = monthly.iter().map(|m| month_label(m.month)).collect::<Vec<_>>();
    let y_max = headroom(
        monthly
            .iter()
            .map(|m| m.counts.down.max(m.counts.up))
            .max()
            .unwrap_or_default() as f64,
    );

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(category_range(monthly.len()), 0f64..y_max)?;
    chart
        .configure_mesh()
        .x_labels(12)
        .x_label_formatter(&|v| category_label(&names, *v))
        .x_desc("Month")
        .y_desc("Days")
        .label_style(style.label_font())
        .draw()?;

    for (label, name) in LABELS.iter().zip(LABEL_NAMES) {
        let color = style.label_color(*label);
        let points = monthly
            .iter()
            .enumerate()
            .map(|(i, m)| (i as f64, m.counts.get(*label) as f64))
            .collect::<Vec<_>>();

        chart
            .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?
            .label(name)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        chart.draw_series(points.into_iter().map(|p| Circle::new(p, 3, color.filled())))?;
    }
    draw_legend(&mut chart, style)?;

    root.present()?;
    Ok(())
}

// ================================================================================================
// 03 Yearly bars
// ================================================================================================

pub(crate) fn yearly_sentiment(
    path: &Path,
    style: &ChartStyle,
    yearly: &[YearlyCounts],
) -> SentimentResult<()> {
    let root = canvas(path, style, ChartFile::YearlySentiment)?;

    let names = yearly.iter().map(|y| y.year.to_string()).collect::<Vec<_>>();
    let y_max = headroom(
        yearly
            .iter()
            .map(|y| y.counts.down.max(y.counts.up))
            .max()
            .unwrap_or_default() as f64,
    );

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(category_range(yearly.len()), 0f64..y_max)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(yearly.len() + 1)
        .x_label_formatter(&|v| category_label(&names, *v))
        .x_desc("Year")
        .y_desc("Days")
        .label_style(style.label_font())
        .draw()?;

    for ((label, name), offset) in LABELS.iter().zip(LABEL_NAMES).zip([-0.2, 0.2]) {
        let color = style.label_color(*label);
        chart
            .draw_series(yearly.iter().enumerate().map(|(i, y)| {
                let x = i as f64 + offset;
                Rectangle::new(
                    [(x - 0.18, 0.0), (x + 0.18, y.counts.get(*label) as f64)],
                    color.filled(),
                )
            }))?
            .label(name)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }
    draw_legend(&mut chart, style)?;

    root.present()?;
    Ok(())
}

// ================================================================================================
// 04 Weekday pattern
// ================================================================================================

pub(crate) fn weekday_pattern(
    path: &Path,
    style: &ChartStyle,
    weekdays: &[WeekdayCounts],
) -> SentimentResult<()> {
    let root = canvas(path, style, ChartFile::WeekdayPattern)?;
    let panels = root.split_evenly((1, 2));
    let names = weekdays
        .iter()
        .map(|w| weekday_name(w.weekday).to_string())
        .collect::<Vec<_>>();

    let y_max = headroom(
        weekdays
            .iter()
            .map(|w| w.counts.total())
            .max()
            .unwrap_or_default() as f64,
    );
    let counts = weekdays
        .iter()
        .map(|w| (w.counts.down as f64, w.counts.up as f64))
        .collect::<Vec<_>>();
    draw_stacked(&panels[0], style, "Days per weekday", &names, &counts, y_max, "Days")?;

    let shares = weekdays
        .iter()
        .map(|w| (w.down_pct, w.up_pct))
        .collect::<Vec<_>>();
    draw_stacked(&panels[1], style, "Share per weekday", &names, &shares, 100.0, "Percent")?;

    root.present()?;
    Ok(())
}

fn draw_stacked(
    area: &Area,
    style: &ChartStyle,
    caption: &str,
    names: &[String],
    values: &[(f64, f64)],
    y_max: f64,
    y_desc: &str,
) -> SentimentResult<()> {
    let mut chart = ChartBuilder::on(area)
        .caption(caption, style.label_font())
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(category_range(values.len()), 0f64..y_max)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(values.len() + 1)
        .x_label_formatter(&|v| category_label(names, *v))
        .y_desc(y_desc)
        .label_style(style.label_font())
        .draw()?;

    let (down, up) = (style.down, style.up);
    chart
        .draw_series(values.iter().enumerate().map(|(i, (d, _))| {
            let x = i as f64;
            Rectangle::new([(x - 0.35, 0.0), (x + 0.35, *d)], down.filled())
        }))?
        .label(LABEL_NAMES[0])
        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], down.filled()));
    chart
        .draw_series(values.iter().enumerate().map(|(i, (d, u))| {
            let x = i as f64;
            Rectangle::new([(x - 0.35, *d), (x + 0.35, d + u)], up.filled())
        }))?
        .label(LABEL_NAMES[1])
        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], up.filled()));
    draw_legend(&mut chart, style)?;

    Ok(())
}

// ================================================================================================
// 05 News count distribution
// ================================================================================================

pub(crate) struct NewsCountView<'a> {
    pub histogram: &'a Histogram,
    pub boxes: &'a [(i32, BoxStats)],
    pub monthly_mean: &'a [MonthlyMean],
    pub describe: &'a Describe,
}

pub(crate) fn news_count_distribution(
    path: &Path,
    style: &ChartStyle,
    view: &NewsCountView<'_>,
) -> SentimentResult<()> {
    let (w, h) = style.canvas;
    let root = SVGBackend::new(path, (w, h * 2)).into_drawing_area();
    root.fill(&style.background)?;
    let root = root.titled(ChartFile::NewsCountDistribution.title(), style.title_font())?;
    let panels = root.split_evenly((2, 2));

    draw_histogram(&panels[0], style, view.histogram, view.describe.mean)?;
    draw_boxes(&panels[1], style, view.boxes)?;
    draw_monthly_mean(&panels[2], style, view.monthly_mean)?;
    draw_stats_panel(&panels[3], style, view.describe)?;

    root.present()?;
    Ok(())
}

fn draw_histogram(
    area: &Area,
    style: &ChartStyle,
    histogram: &Histogram,
    mean: f64,
) -> SentimentResult<()> {
    let lo = histogram.edges.first().copied().unwrap_or(0.0);
    let hi = histogram.edges.last().copied().unwrap_or(1.0);
    let y_max = headroom(histogram.counts.iter().copied().max().unwrap_or_default() as f64);

    let mut chart = ChartBuilder::on(area)
        .caption("Headlines per day", style.label_font())
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(lo..hi, 0f64..y_max)?;
    chart
        .configure_mesh()
        .x_desc("News_Count")
        .y_desc("Days")
        .label_style(style.label_font())
        .draw()?;

    let accent = style.accent;
    chart.draw_series(
        histogram
            .edges
            .iter()
            .zip(histogram.edges.iter().skip(1))
            .zip(&histogram.counts)
            .map(|((l, r), n)| Rectangle::new([(*l, 0.0), (*r, *n as f64)], accent.mix(0.7).filled())),
    )?;

    let reference = style.reference;
    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(mean, 0.0), (mean, y_max)],
            reference.stroke_width(2),
        )))?
        .label(format!("Mean {mean:.2}"))
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], reference.stroke_width(2)));
    draw_legend(&mut chart, style)?;

    Ok(())
}

fn draw_boxes(area: &Area, style: &ChartStyle, boxes: &[(i32, BoxStats)]) -> SentimentResult<()> {
    let lows = boxes
        .iter()
        .flat_map(|(_, b)| std::iter::once(b.lower_whisker).chain(b.outliers.iter().copied()));
    let highs = boxes
        .iter()
        .flat_map(|(_, b)| std::iter::once(b.upper_whisker).chain(b.outliers.iter().copied()));
    let y_lo = lows.fold(f64::INFINITY, f64::min);
    let y_hi = highs.fold(f64::NEG_INFINITY, f64::max);
    let (y_lo, y_hi) = if y_lo.is_finite() && y_hi.is_finite() {
        (y_lo - 1.0, y_hi + 1.0)
    } else {
        (0.0, 1.0)
    };

    let names = boxes
        .iter()
        .map(|(label, _)| label_name(*label))
        .collect::<Vec<_>>();

    let mut chart = ChartBuilder::on(area)
        .caption("Headlines per day by label", style.label_font())
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(category_range(boxes.len()), y_lo..y_hi)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(boxes.len() + 1)
        .x_label_formatter(&|v| category_label(&names, *v))
        .y_desc("News_Count")
        .label_style(style.label_font())
        .draw()?;

    let half = 0.3;
    chart.draw_series(boxes.iter().enumerate().map(|(i, (label, b))| {
        let x = i as f64;
        Rectangle::new(
            [(x - half, b.q1), (x + half, b.q3)],
            style.label_color(*label).mix(0.6).filled(),
        )
    }))?;
    chart.draw_series(boxes.iter().enumerate().map(|(i, (_, b))| {
        let x = i as f64;
        Rectangle::new([(x - half, b.q1), (x + half, b.q3)], BLACK.stroke_width(1))
    }))?;
    chart.draw_series(boxes.iter().enumerate().flat_map(|(i, (_, b))| {
        let x = i as f64;
        [
            vec![(x - half, b.median), (x + half, b.median)],
            vec![(x, b.q3), (x, b.upper_whisker)],
            vec![(x, b.q1), (x, b.lower_whisker)],
            vec![(x - half / 2.0, b.upper_whisker), (x + half / 2.0, b.upper_whisker)],
            vec![(x - half / 2.0, b.lower_whisker), (x + half / 2.0, b.lower_whisker)],
        ]
        .into_iter()
        .map(|line| PathElement::new(line, BLACK.stroke_width(2)))
    }))?;
    chart.draw_series(boxes.iter().enumerate().flat_map(|(i, (_, b))| {
        b.outliers
            .iter()
            .map(move |v| Circle::new((i as f64, *v), 3, BLACK.stroke_width(1)))
    }))?;

    Ok(())
}

fn draw_monthly_mean(area: &Area, style: &ChartStyle, means: &[MonthlyMean]) -> SentimentResult<()> {
    let names = means.iter().map(|m| month_label(m.month)).collect::<Vec<_>>();
    let y_lo = means.iter().map(|m| m.mean).fold(f64::INFINITY, f64::min);
    let y_hi = means.iter().map(|m| m.mean).fold(f64::NEG_INFINITY, f64::max);
    let (y_lo, y_hi) = if y_lo.is_finite() && y_hi.is_finite() {
        (y_lo - 1.0, y_hi + 1.0)
    } else {
        (0.0, 1.0)
    };

    let mut chart = ChartBuilder::on(area)
        .caption("Monthly mean headlines per day", style.label_font())
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(category_range(means.len()), y_lo..y_hi)?;
    chart
        .configure_mesh()
        .x_labels(8)
        .x_label_formatter(&|v| category_label(&names, *v))
        .y_desc("Mean News_Count")
        .label_style(style.label_font())
        .draw()?;

    let accent = style.accent;
    let points = means
        .iter()
        .enumerate()
        .map(|(i, m)| (i as f64, m.mean))
        .collect::<Vec<_>>();
    chart.draw_series(LineSeries::new(points.iter().copied(), accent.stroke_width(2)))?;
    chart.draw_series(points.into_iter().map(|p| Circle::new(p, 2, accent.filled())))?;

    Ok(())
}

fn draw_stats_panel(area: &Area, style: &ChartStyle, d: &Describe) -> SentimentResult<()> {
    let area = area.margin(20, 20, 20, 20);
    area.fill(&style.panel)?;

    let lines = [
        "News_Count statistics".to_string(),
        format!("Count:   {}", d.count),
        format!("Mean:    {:.2}", d.mean),
        format!("Median:  {:.2}", d.median),
        format!("Mode:    {:.0}", d.mode),
        format!("Std Dev: {:.2}", d.std),
        format!("Min:     {:.0}", d.min),
        format!("Max:     {:.0}", d.max),
        format!("Q1:      {:.2}", d.q1),
        format!("Q3:      {:.2}", d.q3),
    ];
    let line_height = style.label_size as i32 * 2;
    for (i, line) in lines.iter().enumerate() {
        area.draw(&Text::new(
            line.as_str(),
            (20, 20 + line_height * i as i32),
            style.label_font().into_font(),
        ))?;
    }
    Ok(())
}

// ================================================================================================
// 06 Heatmap
// ================================================================================================

pub(crate) fn quarterly_heatmap(
    path: &Path,
    style: &ChartStyle,
    grid: &QuarterGrid,
) -> SentimentResult<()> {
    let root = canvas(path, style, ChartFile::QuarterlyHeatmap)?;

    let quarter_names = grid
        .quarters
        .iter()
        .map(|q| format!("Q{q}"))
        .collect::<Vec<_>>();
    let year_names = grid.years.iter().map(|y| y.to_string()).collect::<Vec<_>>();

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(
            category_range(grid.quarters.len()),
            category_range(grid.years.len()),
        )?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(grid.quarters.len() + 1)
        .y_labels(grid.years.len() + 1)
        .x_label_formatter(&|v| category_label(&quarter_names, *v))
        .y_label_formatter(&|v| category_label(&year_names, *v))
        .x_desc("Quarter")
        .y_desc("Year")
        .label_style(style.label_font())
        .draw()?;

    let cells = grid
        .cells
        .iter()
        .enumerate()
        .flat_map(|(y, row)| {
            row.iter()
                .enumerate()
                .filter_map(move |(q, v)| v.map(|v| (q as f64, y as f64, v)))
        })
        .collect::<Vec<_>>();

    chart.draw_series(cells.iter().map(|&(q, y, v)| {
        Rectangle::new(
            [(q - 0.5, y - 0.5), (q + 0.5, y + 0.5)],
            diverging_color(v).filled(),
        )
    }))?;
    chart.draw_series(
        cells
            .iter()
            .map(|&(q, y, v)| Text::new(format!("{v:.3}"), (q, y), anchored(style, VPos::Center))),
    )?;

    root.present()?;
    Ok(())
}

// ================================================================================================
// Helpers
// ================================================================================================

/// Creates a titled SVG canvas at `path`.
fn canvas<'a>(path: &'a Path, style: &ChartStyle, chart: ChartFile) -> SentimentResult<Area<'a>> {
    let root = SVGBackend::new(path, style.canvas).into_drawing_area();
    root.fill(&style.background)?;
    Ok(root.titled(chart.title(), style.title_font())?)
}

fn draw_legend<'a, DB, CT>(
    chart: &mut ChartContext<'a, DB, CT>,
    style: &ChartStyle,
) -> SentimentResult<()>
where
    DB: DrawingBackend + 'a,
    CT: CoordTranslate,
{
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(style.background.mix(0.8))
        .border_style(BLACK)
        .label_font(style.label_font())
        .draw()?;
    Ok(())
}

fn anchored(style: &ChartStyle, vpos: VPos) -> TextStyle<'_> {
    TextStyle::from(style.label_font().into_font()).pos(Pos::new(HPos::Center, vpos))
}

/// Axis range placing `n` categories at the integers `0..n`.
fn category_range(n: usize) -> std::ops::Range<f64> {
    -0.5..(n.max(1) as f64 - 0.5)
}

/// Name of the category at axis position `v`, empty between categories.
fn category_label<S: AsRef<str>>(names: &[S], v: f64) -> String {
    let idx = v.round();
    if (v - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    names
        .get(idx as usize)
        .map(|n| n.as_ref().to_string())
        .unwrap_or_default()
}

fn label_name(label: i32) -> String {
    match label {
        0 | 1 => LABEL_NAMES[label as usize].to_string(),
        other => other.to_string(),
    }
}

/// Upper axis bound leaving room above the tallest value.
fn headroom(max: f64) -> f64 {
    (max * 1.15).max(1.0)
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_chart_file_names() {
        let names = ChartFile::iter().map(|c| c.file_name()).collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                "01_sentiment_distribution.svg",
                "02_temporal_trend.svg",
                "03_yearly_sentiment.svg",
                "04_weekday_pattern.svg",
                "05_news_count_distribution.svg",
                "06_quarterly_heatmap.svg",
            ]
        );
    }

    #[test]
    fn test_category_label() {
        let names = ["Q1", "Q3"];
        assert_eq!(category_label(&names, 0.0), "Q1");
        assert_eq!(category_label(&names, 1.0), "Q3");
        assert_eq!(category_label(&names, 0.5), "");
        assert_eq!(category_label(&names, 2.0), "");
        assert_eq!(category_label(&names, -1.0), "");
    }

    #[test]
    fn test_wedge_closes_on_center() {
        let points = wedge((100, 100), 50.0, 0.0, TAU / 4.0);
        assert_eq!(points[0], (100, 100));
        assert_eq!(points[1], (150, 100));
        assert_eq!(points.last(), Some(&(100, 150)));
    }

    #[test]
    fn test_category_range() {
        assert_eq!(category_range(1), -0.5..0.5);
        assert_eq!(category_range(0), -0.5..0.5);
        assert_eq!(category_range(4), -0.5..3.5);
    }
}
