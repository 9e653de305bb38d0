use serde::Serialize;

use crate::aggregate;
use crate::config::{ComposerConfig, ViewShape, ViewSpec};
use crate::dates::DateRange;
use crate::error::ConfigError;
use crate::filters::{self, FilterState, Predicate, ResolvedFilters};
use crate::models::{AggregationResult, Dimension, LeadRecord};
use crate::store::RecordStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposedView {
    pub name: String,
    pub title: String,
    pub residual_count: usize,
    pub result: AggregationResult,
}

impl ComposedView {
    pub fn is_empty(&self) -> bool {
        self.residual_count == 0
    }
}

/// Output of one resolution pass over the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub total_records: usize,
    pub date_label: String,
    pub date_range: Option<DateRange>,
    /// Records left after the date range and every global filter.
    pub global_count: usize,
    pub filters: ResolvedFilters,
    pub views: Vec<ComposedView>,
}

impl Resolution {
    pub fn view(&self, name: &str) -> Option<&ComposedView> {
        self.views.iter().find(|view| view.name == name)
    }
}

/// Assembles per-view predicates from global and local filters and runs the
/// aggregations. Holds configuration only; filter state is passed in.
#[derive(Debug, Clone, Default)]
pub struct ViewComposer {
    config: ComposerConfig,
}

impl ViewComposer {
    pub fn new(config: ComposerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    pub fn resolve(&self, store: &RecordStore, state: &FilterState) -> Result<Resolution, ConfigError> {
        let filters = filters::resolve_filters(store, state, &self.config.cascade)?;

        let global: Vec<&Predicate> = self.predicates_for(&filters, None);
        let global_count = store
            .records()
            .iter()
            .filter(|record| filters::matches_all(&global, record))
            .count();

        let views = self
            .config
            .views
            .iter()
            .map(|spec| self.compose_view(store, &filters, spec))
            .collect();

        tracing::info!(
            total = store.len(),
            after_global_filters = global_count,
            range = %state.date_range.label(),
            "filters resolved"
        );

        Ok(Resolution {
            total_records: store.len(),
            date_label: state.date_range.label(),
            date_range: filters.date_range,
            global_count,
            filters,
            views,
        })
    }

    /// Values a picker for `dimension` should offer under the current state.
    pub fn universe(
        &self,
        store: &RecordStore,
        state: &FilterState,
        dimension: Dimension,
    ) -> Result<Vec<String>, ConfigError> {
        let filters = filters::resolve_filters(store, state, &self.config.cascade)?;
        Ok(filters
            .get(dimension)
            .map(|resolved| resolved.universe.clone())
            .unwrap_or_default())
    }

    // `view = None` collects global predicates only.
    fn predicates_for<'a>(&self, filters: &'a ResolvedFilters, view: Option<&str>) -> Vec<&'a Predicate> {
        let mut predicates = vec![&filters.date_predicate];
        for resolved in filters.dimensions.iter() {
            let scope = self.config.scope(resolved.dimension);
            let applies = match view {
                Some(name) => scope.applies_to(name),
                None => scope.applies_to_all(),
            };
            if applies {
                predicates.push(&resolved.predicate);
            }
        }
        predicates
    }

    fn compose_view(&self, store: &RecordStore, filters: &ResolvedFilters, spec: &ViewSpec) -> ComposedView {
        let predicates = self.predicates_for(filters, Some(spec.name.as_str()));
        let subset: Vec<&LeadRecord> = store
            .records()
            .iter()
            .filter(|record| filters::matches_all(&predicates, record))
            .collect();

        let result = match &spec.shape {
            ViewShape::TimeSeries => AggregationResult::TimeSeries {
                points: aggregate::time_series(&subset),
            },
            ViewShape::Ranking { dimension, top_k } => AggregationResult::CategoricalRanking {
                dimension: *dimension,
                entries: aggregate::rank(&subset, *dimension, *top_k),
            },
            ViewShape::Kpis => AggregationResult::KpiSummary(aggregate::kpis(&subset)),
        };

        tracing::debug!(view = %spec.name, residual = subset.len(), "view composed");

        ComposedView {
            name: spec.name.clone(),
            title: spec.title.clone(),
            residual_count: subset.len(),
            result,
        }
    }
}
