use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;

use crate::error::LoadError;
use crate::models::{Dimension, LeadRecord};

/// Read-only collection of validated lead records for one analysis session.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<LeadRecord>,
    bounds: Option<(NaiveDate, NaiveDate)>,
}

impl RecordStore {
    /// Takes ownership of loaded records, renumbers them by position and
    /// checks that week labels and week starts correspond one to one and
    /// that week starts never go backwards as lead dates advance.
    pub fn new(mut records: Vec<LeadRecord>) -> Result<Self, LoadError> {
        check_weeks(&records)?;

        for (position, record) in records.iter_mut().enumerate() {
            record.id = position;
        }

        let bounds = records
            .iter()
            .map(|record| record.lead_date)
            .fold(None, |acc: Option<(NaiveDate, NaiveDate)>, date| match acc {
                None => Some((date, date)),
                Some((min, max)) => Some((min.min(date), max.max(date))),
            });

        tracing::debug!(records = records.len(), ?bounds, "record store built");
        Ok(Self { records, bounds })
    }

    pub fn records(&self) -> &[LeadRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Earliest and latest lead date, `None` for an empty store.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.bounds
    }

    /// Distinct values of `dimension` among records accepted by `accept`.
    /// An empty value is a member like any other, so selecting the whole
    /// universe keeps records with a blank field. Week labels come back in
    /// week order, everything else sorted.
    pub fn universe<F>(&self, dimension: Dimension, accept: F) -> Vec<String>
    where
        F: Fn(&LeadRecord) -> bool,
    {
        let matching = self.records.iter().filter(|record| accept(*record));

        if dimension == Dimension::WeekLabel {
            let weeks: BTreeSet<(NaiveDate, &str)> = matching
                .map(|record| (record.week_start, record.week_label.as_str()))
                .collect();
            return weeks
                .into_iter()
                .map(|(_, label)| label.to_string())
                .collect();
        }

        let values: BTreeSet<&str> = matching.map(|record| record.value(dimension)).collect();
        values.into_iter().map(str::to_string).collect()
    }
}

fn check_weeks(records: &[LeadRecord]) -> Result<(), LoadError> {
    let mut label_to_start: HashMap<&str, NaiveDate> = HashMap::new();
    let mut start_to_label: HashMap<NaiveDate, &str> = HashMap::new();

    for record in records {
        let start = *label_to_start
            .entry(record.week_label.as_str())
            .or_insert(record.week_start);
        if start != record.week_start {
            return Err(LoadError::WeekLabelConflict {
                label: record.week_label.clone(),
                first: start,
                second: record.week_start,
            });
        }

        let label = *start_to_label
            .entry(record.week_start)
            .or_insert(record.week_label.as_str());
        if label != record.week_label {
            return Err(LoadError::WeekStartConflict {
                week_start: record.week_start,
                first: label.to_string(),
                second: record.week_label.clone(),
            });
        }
    }

    let mut by_date: Vec<(NaiveDate, NaiveDate)> = records
        .iter()
        .map(|record| (record.lead_date, record.week_start))
        .collect();
    by_date.sort_unstable();
    for pair in by_date.windows(2) {
        let (earlier_lead_date, earlier_week_start) = pair[0];
        let (lead_date, week_start) = pair[1];
        if week_start < earlier_week_start {
            return Err(LoadError::WeekOrder {
                lead_date,
                week_start,
                earlier_lead_date,
                earlier_week_start,
            });
        }
    }

    Ok(())
}
