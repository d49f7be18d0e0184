use std::collections::{BTreeMap, HashMap};
use std::fmt;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::model::TimeWindow;
use crate::settings::RegistrySettings;
use crate::template::{self, MetricPattern, PropertyPattern};

/// Declaration of one component property backed by a collector metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyInfo {
    /// Metric name template.
    pub metric: String,

    #[serde(default = "PropertyInfo::default_capable")]
    pub point_in_time: bool,

    #[serde(default = "PropertyInfo::default_capable")]
    pub temporal: bool,
}

impl PropertyInfo {
    pub fn new(metric: impl Into<String>, point_in_time: bool, temporal: bool) -> Self {
        Self { metric: metric.into(), point_in_time, temporal }
    }

    pub const fn default_capable() -> bool {
        true
    }

    /// Whether this property may be collected for a request in `window`'s mode.
    pub const fn supports(&self, window: &TimeWindow) -> bool {
        match window {
            TimeWindow::PointInTime => self.point_in_time,
            TimeWindow::Range { .. } => self.temporal,
        }
    }
}

/// Property id to declaration, for one component.
pub type ComponentMetrics = BTreeMap<String, PropertyInfo>;

/// Maps component names to their declared metric properties.
pub trait MetricRegistry: Send + Sync {
    /// Declared properties of `component`, or `None` if the component exposes no metrics.
    fn metrics_for(&self, component: &str) -> Option<&ComponentMetrics>;

    /// Resolves a requested property id against `component`'s declarations: the declaration
    /// itself, every declaration beneath it when the id names a category, or an entry
    /// synthesized on demand when the id instantiates a property id holding placeholders.
    fn resolve(&self, component: &str, property_id: &str) -> Vec<(String, PropertyInfo)>;
}

#[derive(Debug)]
struct TemplatedProperty {
    pattern: PropertyPattern,
    metric: MetricPattern,
    info: PropertyInfo,
}

#[derive(Debug)]
struct ComponentEntry {
    metrics: ComponentMetrics,
    templated: Vec<TemplatedProperty>,
}

/// Registry built from settings. Templates and placeholders are validated when loaded.
/// Synthesized properties are cached up to `max_synthesized` entries; beyond that they are
/// rebuilt on every lookup.
pub struct StaticMetricRegistry {
    components: HashMap<String, ComponentEntry>,
    synthesized: DashMap<(String, String), PropertyInfo>,
    max_synthesized: usize,
}

impl fmt::Debug for StaticMetricRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticMetricRegistry")
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .field("nr_synthesized", &self.synthesized.len())
            .field("max_synthesized", &self.max_synthesized)
            .finish()
    }
}

impl StaticMetricRegistry {
    #[tracing::instrument(level = "debug", skip(settings))]
    pub fn from_settings(settings: &RegistrySettings) -> Result<Self, ConfigurationError> {
        let mut components = HashMap::with_capacity(settings.components.len());
        for (component, metrics) in settings.components.iter() {
            components.insert(component.clone(), Self::load_component(component, metrics)?);
        }

        Ok(Self {
            components,
            synthesized: DashMap::new(),
            max_synthesized: settings.max_synthesized,
        })
    }

    fn load_component(component: &str, metrics: &ComponentMetrics) -> Result<ComponentEntry, ConfigurationError> {
        let mut patterns: BTreeMap<&str, MetricPattern> = BTreeMap::new();
        let mut templated = Vec::new();

        for (property_id, info) in metrics.iter() {
            let config_error = |source| ConfigurationError::Template {
                component: component.to_string(),
                property_id: property_id.clone(),
                source,
            };

            let metric = MetricPattern::compile(info.metric.as_str()).map_err(config_error)?;

            let captures = metric.capture_count();
            let unbound = template::placeholders(property_id)
                .into_iter()
                .find(|p| *p == 0 || captures < *p);
            if let Some(placeholder) = unbound {
                return Err(ConfigurationError::Placeholder {
                    component: component.to_string(),
                    property_id: property_id.clone(),
                    metric: info.metric.clone(),
                    placeholder,
                    captures,
                });
            }

            if template::contains_arguments(property_id) {
                let pattern = PropertyPattern::compile(property_id.as_str()).map_err(config_error)?;
                templated.push(TemplatedProperty { pattern, metric: metric.clone(), info: info.clone() });
            }

            patterns.insert(info.metric.as_str(), metric);
        }

        warn_on_overlapping_templates(component, &patterns);

        Ok(ComponentEntry { metrics: metrics.clone(), templated })
    }

    fn synthesize(&self, component: &str, entry: &ComponentEntry, property_id: &str) -> Option<PropertyInfo> {
        let key = (component.to_string(), property_id.to_string());
        if let Some(info) = self.synthesized.get(&key) {
            return Some(info.clone());
        }

        let info = entry.templated.iter().find_map(|t| {
            let bindings = t.pattern.bind(property_id)?;
            let metric = t.metric.instantiate(&bindings)?;
            Some(PropertyInfo { metric, ..t.info.clone() })
        })?;

        tracing::debug!(%component, %property_id, metric=%info.metric, "synthesized metric property on demand");
        if self.synthesized.len() < self.max_synthesized {
            self.synthesized.insert(key, info.clone());
        } else {
            tracing::debug!(max_synthesized=%self.max_synthesized, "synthesized property cache is full - not caching");
        }
        Some(info)
    }
}

impl MetricRegistry for StaticMetricRegistry {
    fn metrics_for(&self, component: &str) -> Option<&ComponentMetrics> {
        self.components.get(component).map(|entry| &entry.metrics)
    }

    fn resolve(&self, component: &str, property_id: &str) -> Vec<(String, PropertyInfo)> {
        let Some(entry) = self.components.get(component) else {
            return Vec::new();
        };

        if let Some(info) = entry.metrics.get(property_id) {
            return vec![(property_id.to_string(), info.clone())];
        }

        let category = format!("{}/", property_id.trim_end_matches('/'));
        let beneath: Vec<_> = entry
            .metrics
            .range(category.clone()..)
            .take_while(|(id, _)| id.starts_with(category.as_str()))
            .map(|(id, info)| (id.clone(), info.clone()))
            .collect();
        if !beneath.is_empty() {
            return beneath;
        }

        self.synthesize(component, entry, property_id)
            .map(|info| vec![(property_id.to_string(), info)])
            .unwrap_or_default()
    }
}

/// Templates of one component should be mutually exclusive; otherwise which property receives a
/// returned metric depends on template order. Flags literal templates matched by another template.
fn warn_on_overlapping_templates(component: &str, patterns: &BTreeMap<&str, MetricPattern>) {
    for (literal, _) in patterns.iter().filter(|(_, p)| p.is_literal()) {
        for (template, pattern) in patterns.iter().filter(|(t, p)| !p.is_literal() && t != &literal) {
            if pattern.is_match(literal) {
                tracing::warn!(
                    %component, %literal, %template,
                    "metric templates overlap - returned metric may populate either property"
                );
            }
        }
    }
}
