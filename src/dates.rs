use std::str::FromStr;

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DateRangeSelection {
    Custom {
        start: NaiveDate,
        end: Option<NaiveDate>,
    },
    LastNDays { days: u32 },
}

impl DateRangeSelection {
    pub const PRESETS: [u32; 3] = [7, 30, 90];

    /// Widest preset; clamping makes it cover the whole dataset.
    pub fn everything() -> Self {
        DateRangeSelection::LastNDays { days: u32::MAX }
    }

    pub fn single_day(day: NaiveDate) -> Self {
        DateRangeSelection::Custom {
            start: day,
            end: None,
        }
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        DateRangeSelection::Custom {
            start,
            end: Some(end),
        }
    }

    pub fn label(&self) -> String {
        match self {
            DateRangeSelection::Custom { .. } => "custom range".to_string(),
            DateRangeSelection::LastNDays { days: u32::MAX } => "all dates".to_string(),
            DateRangeSelection::LastNDays { days } => format!("last {days} days"),
        }
    }
}

/// Inclusive interval a selection resolves to. `start > end` is allowed and
/// simply contains no date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }
}

pub fn resolve(
    selection: DateRangeSelection,
    dataset_min: NaiveDate,
    dataset_max: NaiveDate,
) -> DateRange {
    match selection {
        DateRangeSelection::Custom { start, end } => DateRange {
            start,
            end: end.unwrap_or(start),
        },
        DateRangeSelection::LastNDays { days } => {
            let span = u64::from(days.max(1) - 1);
            let start = dataset_max
                .checked_sub_days(Days::new(span))
                .map_or(dataset_min, |start| start.max(dataset_min));
            DateRange {
                start,
                end: dataset_max,
            }
        }
    }
}

/// Parses preset names such as `last-7`, `7d`, `30` or `Last 90 days`.
/// `custom` is not a preset and is rejected here.
impl FromStr for DateRangeSelection {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.trim().to_ascii_lowercase();
        let digits: String = lowered
            .trim_start_matches("last")
            .trim_start_matches(['-', '_', ' '])
            .trim_end_matches("days")
            .trim_end_matches('d')
            .trim()
            .to_string();

        match digits.parse::<u32>() {
            Ok(days) if days > 0 => Ok(DateRangeSelection::LastNDays { days }),
            _ => Err(ConfigError::UnknownDateRange(value.to_string())),
        }
    }
}
