use std::fmt::Write;

use crate::compose::{ComposedView, Resolution};
use crate::filters::{FilterMode, Predicate, ResolvedFilters};
use crate::models::{AggregationResult, KpiSummary, RankedValue, WeeklyCount};

pub const EMPTY_STATE: &str = "No data available for the selected filters.";

pub fn build_json(resolution: &Resolution) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(resolution)?)
}

pub fn build_report(resolution: &Resolution) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Digital Dealer Leads Report");
    let _ = writeln!(output, "Total rows in dataset: {}", resolution.total_records);
    match resolution.date_range {
        Some(range) if range.is_inverted() => {
            let _ = writeln!(
                output,
                "Showing {}: {} → {} (start is after end)",
                resolution.date_label, range.start, range.end
            );
        }
        Some(range) => {
            let _ = writeln!(
                output,
                "Showing {}: {} → {}",
                resolution.date_label, range.start, range.end
            );
        }
        None => {
            let _ = writeln!(output, "Dataset is empty.");
        }
    }
    write_filter_summary(&mut output, &resolution.filters);
    let _ = writeln!(output, "Rows after filters: {}", resolution.global_count);

    for view in resolution.views.iter() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {}", view.title);
        write_view(&mut output, view);
    }

    output
}

fn write_filter_summary(output: &mut String, filters: &ResolvedFilters) {
    for resolved in filters.dimensions.iter() {
        if resolved.mode == FilterMode::All {
            continue;
        }
        let _ = writeln!(
            output,
            "Filter {}: {} of {} values",
            resolved.dimension,
            selected_count(&resolved.predicate),
            resolved.universe.len()
        );
    }
}

fn selected_count(predicate: &Predicate) -> usize {
    match predicate {
        Predicate::Members { values, .. } => values.len(),
        _ => 0,
    }
}

fn write_view(output: &mut String, view: &ComposedView) {
    match &view.result {
        AggregationResult::KpiSummary(summary) => write_kpis(output, summary),
        _ if view.is_empty() => {
            let _ = writeln!(output, "{EMPTY_STATE}");
        }
        AggregationResult::TimeSeries { points } => write_series(output, points),
        AggregationResult::CategoricalRanking { dimension, entries } => {
            write_ranking(output, &dimension.to_string(), entries)
        }
    }
}

fn write_kpis(output: &mut String, summary: &KpiSummary) {
    let _ = writeln!(output, "- Total Leads: {}", summary.total_leads);
    let _ = writeln!(
        output,
        "- Avg Leads per Day: {:.1}",
        summary.average_leads_per_day
    );
    let _ = writeln!(output, "- Number of Dealers: {}", summary.distinct_dealer_count);
}

fn write_series(output: &mut String, points: &[WeeklyCount]) {
    let _ = writeln!(output, "| Week Start | Leads |");
    let _ = writeln!(output, "|---|---|");
    for point in points {
        let _ = writeln!(output, "| {} | {} |", point.week_start, point.count);
    }
}

fn write_ranking(output: &mut String, label: &str, entries: &[RankedValue]) {
    let _ = writeln!(output, "| {label} | Leads |");
    let _ = writeln!(output, "|---|---|");
    for entry in entries {
        let _ = writeln!(output, "| {} | {} |", entry.value, entry.count);
    }
}
