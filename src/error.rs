use thiserror::Error;

use crate::models::Dimension;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("required fields missing from the source: {missing:?}; fields found: {found:?}")]
    MissingFields {
        missing: Vec<String>,
        found: Vec<String>,
    },

    #[error("row {row}: {field} is empty")]
    EmptyValue { row: usize, field: &'static str },

    #[error("row {row}: cannot parse {field} from {value:?}")]
    InvalidDate {
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error("row {row}: week start {week_start} falls after lead date {lead_date}")]
    WeekAfterLead {
        row: usize,
        week_start: chrono::NaiveDate,
        lead_date: chrono::NaiveDate,
    },

    #[error("week label {label:?} maps to both {first} and {second}")]
    WeekLabelConflict {
        label: String,
        first: chrono::NaiveDate,
        second: chrono::NaiveDate,
    },

    #[error("week starting {week_start} carries labels {first:?} and {second:?}")]
    WeekStartConflict {
        week_start: chrono::NaiveDate,
        first: String,
        second: String,
    },

    #[error(
        "lead on {lead_date} starts week {week_start}, before week {earlier_week_start} of the lead on {earlier_lead_date}"
    )]
    WeekOrder {
        lead_date: chrono::NaiveDate,
        week_start: chrono::NaiveDate,
        earlier_lead_date: chrono::NaiveDate,
        earlier_week_start: chrono::NaiveDate,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown dimension {0:?}")]
    UnknownDimension(String),

    #[error("unknown view {0:?}")]
    UnknownView(String),

    #[error("unknown date range {0:?}")]
    UnknownDateRange(String),

    #[error("dimension {0} cannot cascade from itself")]
    SelfDependency(Dimension),

    #[error("cascade graph has a cycle through {0:?}")]
    CascadeCycle(Vec<Dimension>),

    #[error("duplicate view name {0:?}")]
    DuplicateView(String),

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
