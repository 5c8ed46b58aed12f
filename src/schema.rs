use std::sync::Arc;

use polars::prelude::{DataType, Field, PlSmallStr, Schema, SchemaRef};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Number of headline slots (`Top1`..`Top25`) carried by every row.
pub const HEADLINE_SLOTS: u8 = 25;

/// The fixed, non-headline vocabulary of the sentiment dataset.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "PascalCase")]
pub enum SentimentCol {
    // ========================================================================
    // Raw
    // ========================================================================
    /// Calendar day of the row.
    Date,
    /// Market direction for the day (0 = down, 1 = up).
    Label,

    // ========================================================================
    // Derived
    // ========================================================================
    /// Calendar year of `Date`.
    Year,
    /// Calendar month of `Date` (1-12).
    Month,
    /// Weekday of `Date`, 0 = Monday .. 6 = Sunday.
    DayOfWeek,
    /// Calendar quarter of `Date` (1-4).
    Quarter,
    /// Number of non-empty headline slots in the row.
    #[strum(serialize = "News_Count")]
    NewsCount,
}

impl From<SentimentCol> for PlSmallStr {
    fn from(value: SentimentCol) -> Self {
        value.as_str().into()
    }
}

impl SentimentCol {
    pub fn name(&self) -> PlSmallStr {
        (*self).into()
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Physical type of the column in the clean table.
    pub fn dtype(&self) -> DataType {
        match self {
            Self::Date => DataType::Date,
            Self::Label
            | Self::Year
            | Self::Month
            | Self::DayOfWeek
            | Self::Quarter
            | Self::NewsCount => DataType::Int32,
        }
    }

    pub fn field(&self) -> Field {
        Field::new(self.name(), self.dtype())
    }

    /// Columns computed from `Date` and the headline slots during the transform.
    pub fn derived() -> impl Iterator<Item = SentimentCol> {
        Self::iter().filter(|c| !matches!(c, Self::Date | Self::Label))
    }
}

/// One of the `Top1`..`Top25` headline columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeadlineSlot(u8);

impl HeadlineSlot {
    /// Returns the slot with the given 1-based index, if it exists.
    pub fn new(index: u8) -> Option<Self> {
        (1..=HEADLINE_SLOTS).contains(&index).then_some(Self(index))
    }

    pub fn all() -> impl Iterator<Item = HeadlineSlot> {
        (1..=HEADLINE_SLOTS).map(HeadlineSlot)
    }

    pub fn index(&self) -> u8 {
        self.0
    }

    pub fn name(&self) -> PlSmallStr {
        format!("Top{}", self.0).into()
    }

    pub fn field(&self) -> Field {
        Field::new(self.name(), DataType::String)
    }
}

/// Names of all headline columns in slot order.
pub fn headline_columns() -> Vec<PlSmallStr> {
    HeadlineSlot::all().map(|slot| slot.name()).collect()
}

/// Columns the raw input must provide, in canonical order.
pub fn raw_columns() -> Vec<PlSmallStr> {
    [SentimentCol::Date.name(), SentimentCol::Label.name()]
        .into_iter()
        .chain(headline_columns())
        .collect()
}

/// Columns of the clean table, in canonical order.
pub fn clean_columns() -> Vec<PlSmallStr> {
    raw_columns()
        .into_iter()
        .chain(SentimentCol::derived().map(|c| c.name()))
        .collect()
}

/// Canonical schema of the clean table.
pub fn clean_schema() -> SchemaRef {
    let fields = [SentimentCol::Date.field(), SentimentCol::Label.field()]
        .into_iter()
        .chain(HeadlineSlot::all().map(|slot| slot.field()))
        .chain(SentimentCol::derived().map(|c| c.field()));

    Arc::new(Schema::from_iter(fields))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_names_match_dataset_headers() {
        assert_eq!(SentimentCol::Date.as_str(), "Date");
        assert_eq!(SentimentCol::DayOfWeek.as_str(), "DayOfWeek");
        assert_eq!(SentimentCol::NewsCount.as_str(), "News_Count");
        assert_eq!(
            "News_Count".parse::<SentimentCol>().expect("failed to parse column"),
            SentimentCol::NewsCount
        );
    }

    #[test]
    fn test_clean_schema_order() {
        let schema = clean_schema();
        let names = schema
            .iter_names()
            .map(|n| n.to_string())
            .collect::<Vec<_>>();

        assert_eq!(names.len(), 2 + HEADLINE_SLOTS as usize + 5);
        assert_eq!(names[0], "Date");
        assert_eq!(names[1], "Label");
        assert_eq!(names[2], "Top1");
        assert_eq!(names[26], "Top25");
        assert_eq!(
            &names[27..],
            &["Year", "Month", "DayOfWeek", "Quarter", "News_Count"]
        );
        assert_eq!(schema.get("Date"), Some(&DataType::Date));
        assert_eq!(schema.get("Top7"), Some(&DataType::String));
    }

    #[test]
    fn test_headline_slot_bounds() {
        assert!(HeadlineSlot::new(0).is_none());
        assert!(HeadlineSlot::new(26).is_none());
        assert_eq!(
            HeadlineSlot::new(25).map(|s| s.name()),
            Some(PlSmallStr::from("Top25"))
        );
    }
}
