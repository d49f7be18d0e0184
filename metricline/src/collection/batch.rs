use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use itertools::Itertools;

use super::overrides;
use crate::model::{Resource, ResourceKeys, TimeWindow};
use crate::registry::MetricRegistry;
use crate::template::{MetricPattern, PatternSet};
use crate::timeline::TimelineQuery;

/// Position of a resource in the slice handed to a collection call.
pub type ResourceId = usize;

/// Host scoping of requesting resources within a batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HostKey {
    Host(String),
    /// Pseudo-host of resources that are not host-scoped.
    Aggregate,
}

impl HostKey {
    pub fn for_host(host: Option<&str>) -> Self {
        host.map(|h| Self::Host(h.to_string())).unwrap_or(Self::Aggregate)
    }

    /// Whether a requester under this key takes a series reported for `series_host`.
    pub fn accepts(&self, series_host: Option<&str>) -> bool {
        match (self, series_host) {
            (Self::Aggregate, _) | (_, None) => true,
            (Self::Host(host), Some(series_host)) => host == series_host,
        }
    }
}

impl fmt::Display for HostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host(host) => write!(f, "{host}"),
            Self::Aggregate => write!(f, "<aggregate>"),
        }
    }
}

/// The property ids a caller wants on each resource, and the time window for each.
/// Property ids without a window are collected point-in-time.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectionRequest {
    property_ids: BTreeSet<String>,
    windows: HashMap<String, TimeWindow>,
}

impl CollectionRequest {
    pub fn new<I, S>(property_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            property_ids: property_ids.into_iter().map(Into::into).collect(),
            windows: HashMap::new(),
        }
    }

    pub fn with_window(mut self, property_id: impl Into<String>, window: TimeWindow) -> Self {
        let property_id = property_id.into();
        self.property_ids.insert(property_id.clone());
        self.windows.insert(property_id, window);
        self
    }

    pub fn window_for(&self, property_id: &str) -> TimeWindow {
        self.windows.get(property_id).copied().unwrap_or_default()
    }

    pub fn property_ids(&self) -> impl Iterator<Item = &str> {
        self.property_ids.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.property_ids.is_empty()
    }
}

/// A requested metric template and the destination properties it feeds.
#[derive(Debug, Clone)]
pub struct MetricTarget {
    pub pattern: MetricPattern,
    /// Destination property id, possibly holding placeholders, to its requesting resources.
    pub properties: BTreeMap<String, BTreeSet<ResourceId>>,
}

/// Resources of a batch that share one collector app id, hence one query.
#[derive(Debug, Clone, Default)]
pub struct AppScope {
    pub hosts: BTreeMap<HostKey, BTreeSet<ResourceId>>,
    pub resource_hosts: HashMap<ResourceId, HostKey>,
    /// Raw metric template to target.
    pub metrics: BTreeMap<String, MetricTarget>,
    patterns: PatternSet,
}

impl AppScope {
    fn put_resource(&mut self, resource: ResourceId, host: HostKey) {
        self.hosts.entry(host.clone()).or_default().insert(resource);
        self.resource_hosts.insert(resource, host);
    }

    fn put_property(&mut self, pattern: &MetricPattern, property_id: String, resource: ResourceId) {
        let patterns = &mut self.patterns;
        self.metrics
            .entry(pattern.template().to_string())
            .or_insert_with(|| {
                patterns.insert(pattern.clone());
                MetricTarget { pattern: pattern.clone(), properties: BTreeMap::new() }
            })
            .properties
            .entry(property_id)
            .or_default()
            .insert(resource);
    }

    pub fn host_of(&self, resource: ResourceId) -> Option<&HostKey> {
        self.resource_hosts.get(&resource)
    }

    /// Comma-joined host filter; none when any requester is not host-scoped.
    pub fn host_filter(&self) -> Option<String> {
        if self.hosts.is_empty() || self.hosts.contains_key(&HostKey::Aggregate) {
            return None;
        }

        Some(self.hosts.keys().map(|h| h.to_string()).join(","))
    }

    /// Sorted, deduplicated collector query names of the requested templates.
    pub fn metric_names_param(&self) -> String {
        self.metrics
            .values()
            .map(|target| target.pattern.query_name())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .join(",")
    }

    /// The target a returned metric name belongs to, with its captured arguments. An exact
    /// template name wins over a pattern match; otherwise templates are tried in template order.
    pub fn find_target(&self, metric_name: &str) -> Option<(&MetricTarget, Vec<String>)> {
        if let Some(target) = self.metrics.get(metric_name).filter(|t| t.pattern.is_literal()) {
            return Some((target, Vec::new()));
        }

        let matched = self.patterns.find_match(metric_name)?;
        self.metrics
            .get(matched.pattern.template())
            .map(|target| (target, matched.arguments))
    }

    pub fn query(&self, app_id: &str, window: TimeWindow) -> TimelineQuery {
        TimelineQuery {
            app_id: app_id.to_string(),
            metric_names: self.metric_names_param(),
            host_names: self.host_filter(),
            window,
        }
    }
}

/// Everything one cluster needs collected over one time window.
#[derive(Debug, Clone)]
pub struct CollectionBatch {
    pub cluster: String,
    pub window: TimeWindow,
    /// App id to its scope.
    pub scopes: BTreeMap<String, AppScope>,
}

impl CollectionBatch {
    pub fn new(cluster: impl Into<String>, window: TimeWindow) -> Self {
        Self { cluster: cluster.into(), window, scopes: BTreeMap::new() }
    }

    pub fn nr_queries(&self) -> usize {
        self.scopes.len()
    }

    pub fn nr_resources(&self) -> usize {
        self.scopes
            .values()
            .flat_map(|scope| scope.resource_hosts.keys())
            .collect::<BTreeSet<_>>()
            .len()
    }
}

/// Cluster to window to batch.
pub type Batches = BTreeMap<String, BTreeMap<TimeWindow, CollectionBatch>>;

/// Groups every eligible (resource, metric property) pair of the request into per-cluster,
/// per-window batches.
#[tracing::instrument(level = "debug", skip(registry, keys, resources), fields(nr_resources=%resources.len()))]
pub fn build_batches<R: Resource>(
    registry: &dyn MetricRegistry, keys: &ResourceKeys, resources: &[R], request: &CollectionRequest,
) -> Batches {
    let mut batches = Batches::new();
    let mut patterns: HashMap<String, Option<MetricPattern>> = HashMap::new();

    for (resource_id, resource) in resources.iter().enumerate() {
        let (Some(cluster), Some(component)) = (keys.cluster_of(resource), keys.component_of(resource)) else {
            tracing::debug!(%resource_id, "resource is missing cluster or component - skipping");
            continue;
        };

        let host = HostKey::for_host(keys.host_of(resource));
        let app_id = overrides::app_id_for(component);

        for requested in request.property_ids() {
            let window = request.window_for(requested);

            for (property_id, info) in registry.resolve(component, requested) {
                if !info.supports(&window) {
                    continue;
                }

                let pattern = patterns
                    .entry(info.metric.clone())
                    .or_insert_with(|| match MetricPattern::compile(info.metric.as_str()) {
                        Ok(pattern) => Some(pattern),
                        Err(error) => {
                            tracing::warn!(?error, %component, %property_id, "skipping malformed metric template");
                            None
                        },
                    });
                let Some(pattern) = pattern.as_ref() else { continue };

                let scope = batches
                    .entry(cluster.to_string())
                    .or_default()
                    .entry(window)
                    .or_insert_with(|| CollectionBatch::new(cluster, window))
                    .scopes
                    .entry(app_id.to_string())
                    .or_default();

                scope.put_resource(resource_id, host.clone());
                scope.put_property(pattern, property_id, resource_id);
            }
        }
    }

    batches
}
