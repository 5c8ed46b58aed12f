pub mod aggregate;
pub mod charts;
pub mod dataset;
pub mod stats;
pub mod style;
pub mod summary;

use std::path::{Path, PathBuf};

use strum::IntoEnumIterator;
use tracing::info;

use crate::{
    config::ReportConfig,
    error::{SentimentResult, SequenceError},
    io::ensure_dir,
    polars_ext::DataFrameExt,
    report::charts::{ChartFile, NewsCountView},
    schema::SentimentCol,
    table::CleanTable,
};

/// Exploratory charts and text summary over the clean CSV sink.
///
/// [`load_data`](Self::load_data) must run before any chart or the text
/// report; earlier calls fail with [`SequenceError::NotLoaded`].
#[derive(Debug, Clone)]
pub struct ExploratoryReport {
    config: ReportConfig,
    data: Option<CleanTable>,
}

impl ExploratoryReport {
    pub fn new(config: ReportConfig) -> Self {
        Self { config, data: None }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Reloads and verifies the clean CSV sink.
    pub fn load_data(&mut self) -> SentimentResult<&CleanTable> {
        let table = dataset::load_report_table(self.config.data_path())?;
        Ok(&*self.data.insert(table))
    }

    pub fn data(&self) -> SentimentResult<&CleanTable> {
        Ok(self.data.as_ref().ok_or(SequenceError::NotLoaded)?)
    }

    pub fn plot_sentiment_distribution(&self) -> SentimentResult<PathBuf> {
        let df = self.data()?.as_df();
        let counts = aggregate::label_counts(df)?;
        self.render(ChartFile::SentimentDistribution, |path, style| {
            charts::sentiment_distribution(path, style, &counts)
        })
    }

    pub fn plot_temporal_trend(&self) -> SentimentResult<PathBuf> {
        let monthly = aggregate::monthly_label_counts(self.data()?.as_df())?;
        self.render(ChartFile::TemporalTrend, |path, style| {
            charts::temporal_trend(path, style, &monthly)
        })
    }

    pub fn plot_yearly_sentiment(&self) -> SentimentResult<PathBuf> {
        let yearly = aggregate::yearly_label_counts(self.data()?.as_df())?;
        self.render(ChartFile::YearlySentiment, |path, style| {
            charts::yearly_sentiment(path, style, &yearly)
        })
    }

    pub fn plot_weekday_pattern(&self) -> SentimentResult<PathBuf> {
        let weekdays = aggregate::weekday_pattern(self.data()?.as_df())?;
        self.render(ChartFile::WeekdayPattern, |path, style| {
            charts::weekday_pattern(path, style, &weekdays)
        })
    }

    pub fn plot_news_count_distribution(&self) -> SentimentResult<PathBuf> {
        let df = self.data()?.as_df();
        let values = df
            .float_values(SentimentCol::NewsCount.as_str())?
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();

        let histogram = stats::histogram(&values, stats::HISTOGRAM_BINS);
        let boxes = stats::box_stats_by_label(df, SentimentCol::NewsCount)?;
        let monthly_mean = aggregate::monthly_news_mean(df)?;
        let describe = stats::describe(df, SentimentCol::NewsCount)?;

        let view = NewsCountView {
            histogram: &histogram,
            boxes: &boxes,
            monthly_mean: &monthly_mean,
            describe: &describe,
        };
        self.render(ChartFile::NewsCountDistribution, |path, style| {
            charts::news_count_distribution(path, style, &view)
        })
    }

    pub fn plot_quarterly_heatmap(&self) -> SentimentResult<PathBuf> {
        let grid = aggregate::quarter_grid(self.data()?.as_df())?;
        self.render(ChartFile::QuarterlyHeatmap, |path, style| {
            charts::quarterly_heatmap(path, style, &grid)
        })
    }

    /// Renders all six charts in order and returns their paths.
    #[tracing::instrument(skip_all, fields(dir = %self.config.output_dir().display()))]
    pub fn generate_all_plots(&self) -> SentimentResult<Vec<PathBuf>> {
        self.data()?;
        ChartFile::iter()
            .map(|chart| match chart {
                ChartFile::SentimentDistribution => self.plot_sentiment_distribution(),
                ChartFile::TemporalTrend => self.plot_temporal_trend(),
                ChartFile::YearlySentiment => self.plot_yearly_sentiment(),
                ChartFile::WeekdayPattern => self.plot_weekday_pattern(),
                ChartFile::NewsCountDistribution => self.plot_news_count_distribution(),
                ChartFile::QuarterlyHeatmap => self.plot_quarterly_heatmap(),
            })
            .collect()
    }

    pub fn summary_report(&self) -> SentimentResult<String> {
        summary::text_report(self.data()?.as_df())
    }

    fn render<F>(&self, chart: ChartFile, draw: F) -> SentimentResult<PathBuf>
    where
        F: FnOnce(&Path, &style::ChartStyle) -> SentimentResult<()>,
    {
        let path = ensure_dir(self.config.output_dir())?.join(chart.file_name());
        draw(&path, self.config.style())?;
        info!(path = %path.display(), "Chart written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SentimentError;

    #[test]
    fn test_operations_before_load() {
        let report = ExploratoryReport::new(ReportConfig::default());

        for err in [
            report.data().map(|_| ()).expect_err("data before load"),
            report.plot_sentiment_distribution().map(|_| ()).expect_err("plot before load"),
            report.plot_quarterly_heatmap().map(|_| ()).expect_err("plot before load"),
            report.generate_all_plots().map(|_| ()).expect_err("plots before load"),
            report.summary_report().map(|_| ()).expect_err("report before load"),
        ] {
            assert!(matches!(
                err,
                SentimentError::Sequence(SequenceError::NotLoaded)
            ));
        }
    }
}
