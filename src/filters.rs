use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::dates::{self, DateRange, DateRangeSelection};
use crate::error::ConfigError;
use crate::models::{Dimension, LeadRecord};
use crate::store::RecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    #[default]
    All,
    Explicit,
}

/// A user's selection for one dimension. In `All` mode `selected` is kept
/// but never consulted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CategoricalFilter {
    pub mode: FilterMode,
    pub selected: BTreeSet<String>,
}

impl CategoricalFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn explicit<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: FilterMode::Explicit,
            selected: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn select_all(&mut self) {
        self.mode = FilterMode::All;
    }
}

/// Record predicate produced by resolving a filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    AcceptAll,
    AcceptNone,
    Members {
        dimension: Dimension,
        values: BTreeSet<String>,
    },
    Dates { range: DateRange },
}

impl Predicate {
    pub fn matches(&self, record: &LeadRecord) -> bool {
        match self {
            Predicate::AcceptAll => true,
            Predicate::AcceptNone => false,
            Predicate::Members { dimension, values } => values.contains(record.value(*dimension)),
            Predicate::Dates { range } => range.contains(record.lead_date),
        }
    }
}

pub fn matches_all(predicates: &[&Predicate], record: &LeadRecord) -> bool {
    predicates.iter().all(|predicate| predicate.matches(record))
}

/// Turns a selection into a predicate, intersecting explicit choices with the
/// values still reachable in `universe`.
pub fn effective_predicate(
    dimension: Dimension,
    filter: &CategoricalFilter,
    universe: &[String],
) -> Predicate {
    match filter.mode {
        FilterMode::All => Predicate::AcceptAll,
        FilterMode::Explicit => {
            let values: BTreeSet<String> = universe
                .iter()
                .filter(|value| filter.selected.contains(value.as_str()))
                .cloned()
                .collect();
            if values.is_empty() {
                Predicate::AcceptNone
            } else {
                Predicate::Members { dimension, values }
            }
        }
    }
}

/// Which dimensions restrict the value universe of which others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeGraph {
    parents: BTreeMap<Dimension, Vec<Dimension>>,
}

impl Default for CascadeGraph {
    fn default() -> Self {
        let mut parents = BTreeMap::new();
        parents.insert(Dimension::Location, vec![Dimension::Region]);
        Self { parents }
    }
}

impl CascadeGraph {
    pub fn new(parents: BTreeMap<Dimension, Vec<Dimension>>) -> Result<Self, ConfigError> {
        let graph = Self { parents };
        graph.evaluation_order()?;
        Ok(graph)
    }

    pub fn parents(&self, dimension: Dimension) -> &[Dimension] {
        self.parents
            .get(&dimension)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Dimensions ordered so that every parent precedes its children. Ties
    /// keep `Dimension::ALL` order.
    pub fn evaluation_order(&self) -> Result<Vec<Dimension>, ConfigError> {
        let mut order = Vec::with_capacity(Dimension::ALL.len());
        let mut placed: BTreeSet<Dimension> = BTreeSet::new();

        for (child, parents) in self.parents.iter() {
            if parents.contains(child) {
                return Err(ConfigError::SelfDependency(*child));
            }
        }

        while order.len() < Dimension::ALL.len() {
            let next = Dimension::ALL.iter().copied().find(|dimension| {
                !placed.contains(dimension)
                    && self
                        .parents(*dimension)
                        .iter()
                        .all(|parent| placed.contains(parent))
            });

            match next {
                Some(dimension) => {
                    placed.insert(dimension);
                    order.push(dimension);
                }
                None => {
                    let stuck = Dimension::ALL
                        .iter()
                        .copied()
                        .filter(|dimension| !placed.contains(dimension))
                        .collect();
                    return Err(ConfigError::CascadeCycle(stuck));
                }
            }
        }

        Ok(order)
    }
}

/// Caller-owned per-session filter selections.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterState {
    pub date_range: DateRangeSelection,
    pub dimensions: BTreeMap<Dimension, CategoricalFilter>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            date_range: DateRangeSelection::everything(),
            dimensions: BTreeMap::new(),
        }
    }
}

impl FilterState {
    pub fn new(date_range: DateRangeSelection) -> Self {
        Self {
            date_range,
            dimensions: BTreeMap::new(),
        }
    }

    pub fn filter(&self, dimension: Dimension) -> CategoricalFilter {
        self.dimensions.get(&dimension).cloned().unwrap_or_default()
    }

    pub fn set(&mut self, dimension: Dimension, filter: CategoricalFilter) {
        self.dimensions.insert(dimension, filter);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedFilter {
    pub dimension: Dimension,
    pub mode: FilterMode,
    pub universe: Vec<String>,
    pub predicate: Predicate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedFilters {
    pub date_range: Option<DateRange>,
    pub date_predicate: Predicate,
    pub dimensions: Vec<ResolvedFilter>,
}

impl ResolvedFilters {
    pub fn get(&self, dimension: Dimension) -> Option<&ResolvedFilter> {
        self.dimensions
            .iter()
            .find(|resolved| resolved.dimension == dimension)
    }
}

/// Resolves the date range and every dimension in cascade order. A
/// dimension's universe is drawn from records that pass all of its parents'
/// effective predicates.
pub fn resolve_filters(
    store: &RecordStore,
    state: &FilterState,
    cascade: &CascadeGraph,
) -> Result<ResolvedFilters, ConfigError> {
    let date_range = store
        .date_bounds()
        .map(|(min, max)| dates::resolve(state.date_range, min, max));
    let date_predicate = match date_range {
        Some(range) => Predicate::Dates { range },
        None => Predicate::AcceptNone,
    };

    let mut resolved: BTreeMap<Dimension, ResolvedFilter> = BTreeMap::new();

    for dimension in cascade.evaluation_order()? {
        let parents: Vec<&Predicate> = cascade
            .parents(dimension)
            .iter()
            .filter_map(|parent| resolved.get(parent))
            .map(|filter| &filter.predicate)
            .collect();

        let universe = store.universe(dimension, |record| matches_all(&parents, record));
        let filter = state.filter(dimension);
        let predicate = effective_predicate(dimension, &filter, &universe);

        tracing::debug!(
            %dimension,
            mode = ?filter.mode,
            universe = universe.len(),
            "resolved categorical filter"
        );

        resolved.insert(
            dimension,
            ResolvedFilter {
                dimension,
                mode: filter.mode,
                universe,
                predicate,
            },
        );
    }

    Ok(ResolvedFilters {
        date_range,
        date_predicate,
        dimensions: Dimension::ALL
            .iter()
            .filter_map(|dimension| resolved.remove(dimension))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::store::fixtures::{arb_leads, date, lead};

    fn sample_store() -> RecordStore {
        RecordStore::new(vec![
            lead(date(2024, 1, 1), "Alpha", "NSW", "sydney"),
            lead(date(2024, 1, 2), "Beta", "NSW", "parramatta"),
            lead(date(2024, 1, 3), "Gamma", "VIC", "geelong"),
            lead(date(2024, 1, 4), "Alpha", "VIC", "sydney"),
        ])
        .expect("store")
    }

    fn count(store: &RecordStore, predicate: &Predicate) -> usize {
        store
            .records()
            .iter()
            .filter(|record| predicate.matches(record))
            .count()
    }

    #[test]
    fn select_all_ignores_stale_selection() {
        let store = sample_store();
        let mut filter = CategoricalFilter::explicit(["NSW"]);
        filter.select_all();

        let universe = store.universe(Dimension::Region, |_| true);
        let predicate = effective_predicate(Dimension::Region, &filter, &universe);
        assert_eq!(predicate, Predicate::AcceptAll);
        assert_eq!(count(&store, &predicate), store.len());
    }

    fn surviving(store: &RecordStore, resolved: &ResolvedFilters) -> usize {
        let mut predicates = vec![&resolved.date_predicate];
        predicates.extend(resolved.dimensions.iter().map(|filter| &filter.predicate));
        store
            .records()
            .iter()
            .filter(|record| matches_all(&predicates, record))
            .count()
    }

    #[test]
    fn select_all_equals_explicit_full_universe() {
        let store = RecordStore::new(vec![
            lead(date(2024, 1, 1), "Alpha", "NSW", "sydney"),
            lead(date(2024, 1, 2), "", "NSW", ""),
            lead(date(2024, 1, 3), "Gamma", "", "geelong"),
        ])
        .expect("store");

        for dimension in Dimension::ALL {
            let universe = store.universe(dimension, |_| true);
            let all = effective_predicate(dimension, &CategoricalFilter::all(), &universe);
            let full = effective_predicate(
                dimension,
                &CategoricalFilter::explicit(universe.clone()),
                &universe,
            );
            for record in store.records() {
                assert_eq!(all.matches(record), full.matches(record), "{dimension}");
            }
        }

        let universe = store.universe(Dimension::Location, |_| true);
        assert_eq!(universe, vec!["", "Geelong", "Sydney"]);
    }

    #[test]
    fn blank_value_can_be_selected_on_its_own() {
        let store = RecordStore::new(vec![
            lead(date(2024, 1, 1), "Alpha", "NSW", "sydney"),
            lead(date(2024, 1, 2), "Beta", "NSW", ""),
        ])
        .expect("store");
        let universe = store.universe(Dimension::Location, |_| true);
        let predicate =
            effective_predicate(Dimension::Location, &CategoricalFilter::explicit([""]), &universe);
        assert_eq!(count(&store, &predicate), 1);
    }

    #[test]
    fn empty_explicit_selection_matches_nothing() {
        let store = sample_store();
        for dimension in Dimension::ALL {
            let universe = store.universe(dimension, |_| true);
            let predicate = effective_predicate(
                dimension,
                &CategoricalFilter::explicit(Vec::<String>::new()),
                &universe,
            );
            assert_eq!(count(&store, &predicate), 0);
        }
    }

    #[test]
    fn explicit_selection_filters_members() {
        let store = sample_store();
        let universe = store.universe(Dimension::Region, |_| true);
        let predicate =
            effective_predicate(Dimension::Region, &CategoricalFilter::explicit(["NSW"]), &universe);
        assert_eq!(count(&store, &predicate), 2);
    }

    #[test]
    fn selection_outside_live_universe_is_deselected() {
        let universe = vec!["Sydney".to_string()];
        let predicate = effective_predicate(
            Dimension::Location,
            &CategoricalFilter::explicit(["Geelong"]),
            &universe,
        );
        assert_eq!(predicate, Predicate::AcceptNone);
    }

    #[test]
    fn location_universe_cascades_from_region() {
        let store = sample_store();
        let mut state = FilterState::default();
        state.set(Dimension::Region, CategoricalFilter::explicit(["NSW"]));

        let resolved = resolve_filters(&store, &state, &CascadeGraph::default()).expect("resolve");
        let location = resolved.get(Dimension::Location).expect("location");
        assert_eq!(location.universe, vec!["Parramatta", "Sydney"]);
        assert!(!location.universe.contains(&"Geelong".to_string()));

        let dealer = resolved.get(Dimension::Dealer).expect("dealer");
        assert_eq!(dealer.universe, vec!["Alpha", "Beta", "Gamma"]);
    }

    #[test]
    fn narrowing_region_drops_stale_location_choice() {
        let store = sample_store();
        let mut state = FilterState::default();
        state.set(Dimension::Location, CategoricalFilter::explicit(["Geelong"]));

        let resolved = resolve_filters(&store, &state, &CascadeGraph::default()).expect("resolve");
        let location = resolved.get(Dimension::Location).expect("location");
        assert_eq!(count(&store, &location.predicate), 1);

        state.set(Dimension::Region, CategoricalFilter::explicit(["NSW"]));
        let resolved = resolve_filters(&store, &state, &CascadeGraph::default()).expect("resolve");
        let location = resolved.get(Dimension::Location).expect("location");
        assert_eq!(location.predicate, Predicate::AcceptNone);
        assert!(state
            .filter(Dimension::Location)
            .selected
            .contains("Geelong"));
    }

    #[test]
    fn evaluation_order_places_parents_first() {
        let order = CascadeGraph::default().evaluation_order().expect("order");
        let region = order.iter().position(|d| *d == Dimension::Region).unwrap();
        let location = order.iter().position(|d| *d == Dimension::Location).unwrap();
        assert!(region < location);
        assert_eq!(order.len(), Dimension::ALL.len());
    }

    #[test]
    fn chained_parents_resolve_in_order() {
        let mut parents = BTreeMap::new();
        parents.insert(Dimension::Region, vec![Dimension::Dealer]);
        parents.insert(Dimension::Location, vec![Dimension::Region]);
        let graph = CascadeGraph::new(parents).expect("graph");
        let order = graph.evaluation_order().expect("order");
        assert_eq!(
            order,
            vec![
                Dimension::Dealer,
                Dimension::Region,
                Dimension::Location,
                Dimension::WeekLabel
            ]
        );
    }

    #[test]
    fn rejects_cycles_and_self_edges() {
        let mut parents = BTreeMap::new();
        parents.insert(Dimension::Region, vec![Dimension::Location]);
        parents.insert(Dimension::Location, vec![Dimension::Region]);
        assert!(matches!(
            CascadeGraph::new(parents),
            Err(ConfigError::CascadeCycle(_))
        ));

        let mut parents = BTreeMap::new();
        parents.insert(Dimension::Dealer, vec![Dimension::Dealer]);
        assert!(matches!(
            CascadeGraph::new(parents),
            Err(ConfigError::SelfDependency(Dimension::Dealer))
        ));
    }

    #[test]
    fn default_state_covers_whole_dataset() {
        let store = sample_store();
        let resolved =
            resolve_filters(&store, &FilterState::default(), &CascadeGraph::default()).expect("resolve");
        assert_eq!(
            resolved.date_range.map(|range| (range.start, range.end)),
            Some((date(2024, 1, 1), date(2024, 1, 4)))
        );
        assert_eq!(count(&store, &resolved.date_predicate), store.len());
    }

    #[test]
    fn empty_store_resolves_to_nothing() {
        let store = RecordStore::new(Vec::new()).expect("store");
        let resolved =
            resolve_filters(&store, &FilterState::default(), &CascadeGraph::default()).expect("resolve");
        assert_eq!(resolved.date_range, None);
        assert_eq!(resolved.date_predicate, Predicate::AcceptNone);
    }

    proptest! {
        #[test]
        fn select_all_matches_explicit_universe_for_any_dataset(records in arb_leads()) {
            let store = RecordStore::new(records).expect("store");
            let cascade = CascadeGraph::default();
            let everything = resolve_filters(&store, &FilterState::default(), &cascade)
                .expect("resolve");
            let expected = surviving(&store, &everything);
            prop_assert_eq!(expected, store.len());

            for dimension in Dimension::ALL {
                let universe = everything
                    .get(dimension)
                    .map(|filter| filter.universe.clone())
                    .unwrap_or_default();
                let mut state = FilterState::default();
                state.set(dimension, CategoricalFilter::explicit(universe));
                let resolved = resolve_filters(&store, &state, &cascade).expect("resolve");
                prop_assert_eq!(surviving(&store, &resolved), expected, "{}", dimension);
            }
        }

        #[test]
        fn empty_explicit_selection_keeps_no_records(records in arb_leads()) {
            let store = RecordStore::new(records).expect("store");
            for dimension in Dimension::ALL {
                let mut state = FilterState::default();
                state.set(dimension, CategoricalFilter::explicit(Vec::<String>::new()));
                let resolved =
                    resolve_filters(&store, &state, &CascadeGraph::default()).expect("resolve");
                prop_assert_eq!(surviving(&store, &resolved), 0, "{}", dimension);
            }
        }
    }
}
