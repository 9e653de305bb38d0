use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::filters::CascadeGraph;
use crate::models::Dimension;

pub const DEFAULT_DEALER_TOP_K: usize = 25;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewShape {
    TimeSeries,
    Ranking {
        dimension: Dimension,
        #[serde(default)]
        top_k: Option<usize>,
    },
    Kpis,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSpec {
    pub name: String,
    pub title: String,
    pub shape: ViewShape,
}

impl ViewSpec {
    pub fn new(name: &str, title: &str, shape: ViewShape) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            shape,
        }
    }
}

/// Where a dimension's predicate applies: to every view, or only to the
/// named one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterScope {
    #[default]
    Global,
    Local(String),
}

impl FilterScope {
    pub fn applies_to(&self, view: &str) -> bool {
        match self {
            FilterScope::Global => true,
            FilterScope::Local(name) => name == view,
        }
    }

    pub fn applies_to_all(&self) -> bool {
        matches!(self, FilterScope::Global)
    }

    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("global") {
            FilterScope::Global
        } else {
            FilterScope::Local(value.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposerConfig {
    pub views: Vec<ViewSpec>,
    pub scopes: BTreeMap<Dimension, FilterScope>,
    pub cascade: CascadeGraph,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            views: default_views(),
            scopes: BTreeMap::new(),
            cascade: CascadeGraph::default(),
        }
    }
}

pub fn default_views() -> Vec<ViewSpec> {
    vec![
        ViewSpec::new("kpis", "Key Figures", ViewShape::Kpis),
        ViewSpec::new("weekly", "Leads Over Time (Weekly)", ViewShape::TimeSeries),
        ViewSpec::new(
            "dealers",
            "Leads by Dealer",
            ViewShape::Ranking {
                dimension: Dimension::Dealer,
                top_k: Some(DEFAULT_DEALER_TOP_K),
            },
        ),
        ViewSpec::new(
            "regions",
            "Leads by State",
            ViewShape::Ranking {
                dimension: Dimension::Region,
                top_k: None,
            },
        ),
        ViewSpec::new(
            "locations",
            "Leads by Location",
            ViewShape::Ranking {
                dimension: Dimension::Location,
                top_k: None,
            },
        ),
    ]
}

impl ComposerConfig {
    pub fn scope(&self, dimension: Dimension) -> &FilterScope {
        static GLOBAL: FilterScope = FilterScope::Global;
        self.scopes.get(&dimension).unwrap_or(&GLOBAL)
    }

    pub fn set_scope(&mut self, dimension: Dimension, scope: FilterScope) -> Result<(), ConfigError> {
        if let FilterScope::Local(view) = &scope {
            if !self.views.iter().any(|spec| &spec.name == view) {
                return Err(ConfigError::UnknownView(view.clone()));
            }
        }
        self.scopes.insert(dimension, scope);
        Ok(())
    }

    pub fn view_mut(&mut self, name: &str) -> Option<&mut ViewSpec> {
        self.views.iter_mut().find(|spec| spec.name == name)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_json::from_str(raw)?;
        file.into_config()
    }
}

/// On-disk layout; every section is optional and falls back to defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    views: Option<Vec<ViewSpec>>,
    #[serde(default)]
    scopes: BTreeMap<Dimension, FilterScope>,
    #[serde(default)]
    cascade: Option<BTreeMap<Dimension, Vec<Dimension>>>,
}

impl ConfigFile {
    fn into_config(self) -> Result<ComposerConfig, ConfigError> {
        let views = self.views.unwrap_or_else(default_views);

        let mut names = BTreeSet::new();
        for spec in views.iter() {
            if !names.insert(spec.name.as_str()) {
                return Err(ConfigError::DuplicateView(spec.name.clone()));
            }
        }

        let cascade = match self.cascade {
            Some(parents) => CascadeGraph::new(parents)?,
            None => CascadeGraph::default(),
        };

        let mut config = ComposerConfig {
            views,
            scopes: BTreeMap::new(),
            cascade,
        };
        for (dimension, scope) in self.scopes {
            config.set_scope(dimension, scope)?;
        }

        Ok(config)
    }
}
