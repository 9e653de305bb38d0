use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeadRecord {
    pub id: usize,
    pub lead_date: NaiveDate,
    pub week_start: NaiveDate,
    pub week_label: String,
    pub dealer: String,
    pub region: String,
    pub location: String,
    pub location_canonical: String,
    pub source_ref: Option<String>,
}

impl LeadRecord {
    /// Value used for matching and grouping along `dimension`.
    pub fn value(&self, dimension: Dimension) -> &str {
        match dimension {
            Dimension::Region => &self.region,
            Dimension::Location => &self.location_canonical,
            Dimension::Dealer => &self.dealer,
            Dimension::WeekLabel => &self.week_label,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Region,
    Location,
    Dealer,
    WeekLabel,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Region,
        Dimension::Location,
        Dimension::Dealer,
        Dimension::WeekLabel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Region => "region",
            Dimension::Location => "location",
            Dimension::Dealer => "dealer",
            Dimension::WeekLabel => "week_label",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "region" | "state" => Ok(Dimension::Region),
            "location" => Ok(Dimension::Location),
            "dealer" => Ok(Dimension::Dealer),
            "week" | "week_label" => Ok(Dimension::WeekLabel),
            _ => Err(ConfigError::UnknownDimension(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeeklyCount {
    pub week_start: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedValue {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KpiSummary {
    pub total_leads: usize,
    pub average_leads_per_day: f64,
    pub distinct_dealer_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum AggregationResult {
    TimeSeries { points: Vec<WeeklyCount> },
    CategoricalRanking {
        dimension: Dimension,
        entries: Vec<RankedValue>,
    },
    KpiSummary(KpiSummary),
}
