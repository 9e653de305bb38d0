use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::{Dimension, KpiSummary, LeadRecord, RankedValue, WeeklyCount};

/// Leads per reporting week, ascending. Weeks with no leads are left out.
pub fn time_series(records: &[&LeadRecord]) -> Vec<WeeklyCount> {
    let mut weeks: BTreeMap<chrono::NaiveDate, usize> = BTreeMap::new();
    for record in records {
        *weeks.entry(record.week_start).or_insert(0) += 1;
    }

    weeks
        .into_iter()
        .map(|(week_start, count)| WeeklyCount { week_start, count })
        .collect()
}

/// Counts per value of `dimension`, highest first. Equal counts keep the
/// order in which the values were first seen; records with an empty value
/// are skipped.
pub fn rank(records: &[&LeadRecord], dimension: Dimension, top_k: Option<usize>) -> Vec<RankedValue> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut ranked: Vec<RankedValue> = Vec::new();

    for record in records {
        let value = record.value(dimension);
        if value.is_empty() {
            continue;
        }
        match positions.get(value) {
            Some(&index) => ranked[index].count += 1,
            None => {
                positions.insert(value, ranked.len());
                ranked.push(RankedValue {
                    value: value.to_string(),
                    count: 1,
                });
            }
        }
    }

    // sort_by is stable, so first-seen order survives among ties
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    if let Some(limit) = top_k {
        ranked.truncate(limit);
    }
    ranked
}

pub fn kpis(records: &[&LeadRecord]) -> KpiSummary {
    let total_leads = records.len();
    let dealers: HashSet<&str> = records
        .iter()
        .map(|record| record.dealer.as_str())
        .filter(|dealer| !dealer.is_empty())
        .collect();

    let first = records.iter().map(|record| record.lead_date).min();
    let last = records.iter().map(|record| record.lead_date).max();
    let average_leads_per_day = match (first, last) {
        (Some(first), Some(last)) => {
            let span_days = (last - first).num_days() + 1;
            total_leads as f64 / span_days as f64
        }
        _ => 0.0,
    };

    KpiSummary {
        total_leads,
        average_leads_per_day,
        distinct_dealer_count: dealers.len(),
    }
}
