use std::path::Path;

use dealer_lead_insights::compose::ViewComposer;
use dealer_lead_insights::config::{ComposerConfig, FilterScope};
use dealer_lead_insights::dates::DateRangeSelection;
use dealer_lead_insights::filters::{CategoricalFilter, FilterState};
use dealer_lead_insights::loader;
use dealer_lead_insights::models::{AggregationResult, Dimension, KpiSummary, RankedValue};
use dealer_lead_insights::report;
use dealer_lead_insights::store::RecordStore;

fn fixture_store() -> RecordStore {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/leads.csv");
    loader::load_store(&path).expect("fixture loads")
}

fn kpis(resolution: &dealer_lead_insights::compose::Resolution) -> KpiSummary {
    match &resolution.view("kpis").expect("kpis").result {
        AggregationResult::KpiSummary(summary) => *summary,
        other => panic!("unexpected {other:?}"),
    }
}

fn ranking(resolution: &dealer_lead_insights::compose::Resolution, view: &str) -> Vec<RankedValue> {
    match &resolution.view(view).expect("view").result {
        AggregationResult::CategoricalRanking { entries, .. } => entries.clone(),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn whole_dataset_summary() {
    let store = fixture_store();
    assert_eq!(store.len(), 10);

    let resolution = ViewComposer::default()
        .resolve(&store, &FilterState::default())
        .expect("resolve");

    let summary = kpis(&resolution);
    assert_eq!(summary.total_leads, 10);
    assert_eq!(summary.distinct_dealer_count, 4);
    // 2024-03-04 through 2024-03-31 is 28 days
    assert!((summary.average_leads_per_day - 10.0 / 28.0).abs() < 1e-9);

    match &resolution.view("weekly").expect("weekly").result {
        AggregationResult::TimeSeries { points } => {
            let counts: Vec<usize> = points.iter().map(|point| point.count).collect();
            // week of 2024-03-18 has no leads and stays absent
            assert_eq!(counts, vec![3, 3, 4]);
        }
        other => panic!("unexpected {other:?}"),
    }

    let dealers = ranking(&resolution, "dealers");
    assert_eq!(dealers[0].value, "Harbour City Motors");
    assert_eq!(dealers[0].count, 4);

    let locations = ranking(&resolution, "locations");
    assert_eq!(locations[0].value, "Sydney");
    assert_eq!(locations[0].count, 2);
    assert!(locations.iter().any(|entry| entry.value == "North Sydney"));
    assert_eq!(locations.iter().map(|entry| entry.count).sum::<usize>(), 9);
}

#[test]
fn last_seven_days_with_region_filter() {
    let store = fixture_store();
    let mut state = FilterState::new(DateRangeSelection::LastNDays { days: 7 });
    state.set(Dimension::Region, CategoricalFilter::explicit(["QLD", "VIC"]));

    let resolution = ViewComposer::default().resolve(&store, &state).expect("resolve");
    let range = resolution.date_range.expect("range");
    assert_eq!(range.start.to_string(), "2024-03-25");
    assert_eq!(range.end.to_string(), "2024-03-31");
    assert_eq!(resolution.global_count, 3);

    let summary = kpis(&resolution);
    assert_eq!(summary.distinct_dealer_count, 2);
    // span of the surviving records, 03-26 to 03-31
    assert!((summary.average_leads_per_day - 0.5).abs() < 1e-9);
}

#[test]
fn region_narrowing_cascades_into_location_picker() {
    let store = fixture_store();
    let composer = ViewComposer::default();
    let mut state = FilterState::default();
    state.set(Dimension::Region, CategoricalFilter::explicit(["NSW"]));

    let locations = composer
        .universe(&store, &state, Dimension::Location)
        .expect("universe");
    assert_eq!(locations, vec!["North Sydney", "Parramatta", "Sydney"]);

    state.set(Dimension::Location, CategoricalFilter::explicit(["Geelong"]));
    let resolution = composer.resolve(&store, &state).expect("resolve");
    assert_eq!(resolution.global_count, 0);
    assert!(report::build_report(&resolution).contains(report::EMPTY_STATE));
}

#[test]
fn selecting_every_location_keeps_blank_locations() {
    let store = fixture_store();
    let composer = ViewComposer::default();
    let mut state = FilterState::default();

    let universe = composer
        .universe(&store, &state, Dimension::Location)
        .expect("universe");
    assert_eq!(universe.first().map(String::as_str), Some(""));

    state.set(Dimension::Location, CategoricalFilter::explicit(universe));
    let resolution = composer.resolve(&store, &state).expect("resolve");
    assert_eq!(resolution.global_count, store.len());
    assert_eq!(kpis(&resolution).total_leads, 10);
}

#[test]
fn region_scoped_to_one_view() {
    let store = fixture_store();
    let mut config = ComposerConfig::default();
    config
        .set_scope(Dimension::Region, FilterScope::Local("dealers".to_string()))
        .expect("scope");

    let mut state = FilterState::default();
    state.set(Dimension::Region, CategoricalFilter::explicit(["VIC"]));

    let resolution = ViewComposer::new(config).resolve(&store, &state).expect("resolve");
    assert_eq!(resolution.global_count, 10);

    let dealers = ranking(&resolution, "dealers");
    let names: Vec<&str> = dealers.iter().map(|entry| entry.value.as_str()).collect();
    assert_eq!(names, vec!["Bayside Auto", "Westgate Cars"]);
    assert_eq!(kpis(&resolution).total_leads, 10);
}

#[test]
fn missing_columns_are_reported() {
    let csv = "Lead_Date,Dealer/Website\n2024-03-04,Harbour City Motors\n";
    let err = loader::load_reader(csv.as_bytes()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("week_start"));
    assert!(message.contains("region"));
    assert!(message.contains("Dealer/Website"));
}
