//! Populates resources with metrics read from the timeline metrics collector.
//!
//! A collection call batches the requested (resource, property) pairs per cluster and time window,
//! skips clusters whose collector is not live, fetches every query of a cluster concurrently, and
//! then writes the returned series onto the requesting resources one batch at a time.

mod batch;
mod liveness;
mod overrides;
mod populate;

pub use batch::{
    build_batches, AppScope, Batches, CollectionBatch, CollectionRequest, HostKey, MetricTarget, ResourceId,
};
pub use liveness::LivenessGate;
pub use overrides::{app_id_for, APP_ID_OVERRIDES, HOST_COMPONENT};
pub use populate::populate;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramTimer, HistogramVec, IntCounter, IntCounterVec, Opts};
use serde::Serialize;

use crate::error::{ConfigurationError, TopologyError};
use crate::model::{MetricSeries, Resource, ResourceKeys, TimeWindow};
use crate::registry::{MetricRegistry, StaticMetricRegistry};
use crate::settings::{CollectorSettings, Settings};
use crate::timeline::{CollectorEndpoint, HttpTransport, MetricsTransport, TimelineClient, TimelineQuery};
use crate::topology::CollectorTopology;

pub static COLLECTION_TIME: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "collection_time",
            "Time spent collecting timeline metrics for a cluster in seconds",
        )
        .buckets(vec![0.1, 0.15, 0.2, 0.3, 0.4, 0.5, 1.0, 2.5, 5.0, 7.5, 10.0]),
        &["cluster"],
    )
    .expect("failed creating collection_time metric")
});

#[inline]
fn start_collection_timer(cluster: &str) -> HistogramTimer {
    COLLECTION_TIME.with_label_values(&[cluster]).start_timer()
}

pub static COLLECTION_SKIPPED_CLUSTERS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "collection_skipped_clusters",
            "Number of cluster collections skipped since the collector was unavailable",
        ),
        &["reason"],
    )
    .expect("failed creating collection_skipped_clusters metric")
});

pub static COLLECTION_PROPERTIES_POPULATED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "collection_properties_populated",
        "Number of metric property values written onto resources",
    )
    .expect("failed creating collection_properties_populated metric")
});

const SKIPPED_NOT_LIVE: &str = "collector_not_live";

/// Summary of one collection call.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionOutcome {
    pub nr_batches: usize,
    pub nr_fetches: usize,
    pub skipped_clusters: Vec<String>,
    pub nr_series: usize,
    pub nr_properties_written: usize,
}

impl CollectionOutcome {
    fn merge(&mut self, other: Self) {
        self.nr_batches += other.nr_batches;
        self.nr_fetches += other.nr_fetches;
        self.skipped_clusters.extend(other.skipped_clusters);
        self.nr_series += other.nr_series;
        self.nr_properties_written += other.nr_properties_written;
    }
}

#[derive(Clone)]
pub struct TimelineMetricsCollector {
    registry: Arc<dyn MetricRegistry>,
    topology: Arc<dyn CollectorTopology>,
    gate: LivenessGate,
    client: TimelineClient,
    keys: ResourceKeys,
    scheme: String,
    default_port: u16,
    max_concurrent_fetches: usize,
}

impl fmt::Debug for TimelineMetricsCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimelineMetricsCollector")
            .field("client", &self.client)
            .field("keys", &self.keys)
            .field("scheme", &self.scheme)
            .field("default_port", &self.default_port)
            .field("max_concurrent_fetches", &self.max_concurrent_fetches)
            .finish()
    }
}

impl TimelineMetricsCollector {
    pub fn new(
        registry: Arc<dyn MetricRegistry>, topology: Arc<dyn CollectorTopology>, transport: Arc<dyn MetricsTransport>,
        keys: ResourceKeys, settings: &CollectorSettings,
    ) -> Self {
        Self {
            registry,
            gate: LivenessGate::new(topology.clone()),
            topology,
            client: TimelineClient::new(transport, settings.metrics_path.as_str()),
            keys,
            scheme: settings.scheme.clone(),
            default_port: settings.default_port,
            max_concurrent_fetches: settings.max_concurrent_fetches.max(1),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigurationError> {
        settings.validate()?;
        let registry = StaticMetricRegistry::from_settings(&settings.registry)?;
        let transport = HttpTransport::from_settings(&settings.collector)?;
        Ok(Self::new(
            Arc::new(registry),
            Arc::new(settings.topology.clone()),
            Arc::new(transport),
            settings.resource.clone(),
            &settings.collector,
        ))
    }

    pub const fn keys(&self) -> &ResourceKeys {
        &self.keys
    }

    /// The collector address of `cluster`; the configured default port when topology names none.
    pub fn resolve_endpoint(&self, cluster: &str) -> Result<CollectorEndpoint, TopologyError> {
        let host = self.topology.collector_hostname(cluster)?;
        let port = self.topology.collector_port(cluster)?.unwrap_or(self.default_port);
        Ok(CollectorEndpoint::new(self.scheme.as_str(), host, port))
    }

    /// Populates `resources` with the metric properties of `request`. Never fails: clusters whose
    /// collector is unavailable and fetches that fail leave their resources unpopulated.
    #[tracing::instrument(level = "info", skip(self, resources), fields(nr_resources=%resources.len()))]
    pub async fn populate_resources<R: Resource>(
        &self, resources: &mut [R], request: &CollectionRequest,
    ) -> CollectionOutcome {
        let mut outcome = CollectionOutcome::default();
        if request.is_empty() || resources.is_empty() {
            return outcome;
        }

        let batches = build_batches(self.registry.as_ref(), &self.keys, resources, request);
        for (cluster, cluster_batches) in batches.iter() {
            let cluster_outcome = self.collect_cluster(cluster, cluster_batches, resources).await;
            outcome.merge(cluster_outcome);
        }

        COLLECTION_PROPERTIES_POPULATED.inc_by(outcome.nr_properties_written as u64);
        tracing::info!(?outcome, "timeline metrics collection finished");
        outcome
    }

    #[tracing::instrument(level = "debug", skip(self, batches, resources))]
    async fn collect_cluster<R: Resource>(
        &self, cluster: &str, batches: &BTreeMap<TimeWindow, CollectionBatch>, resources: &mut [R],
    ) -> CollectionOutcome {
        let mut outcome = CollectionOutcome { nr_batches: batches.len(), ..CollectionOutcome::default() };

        if !self.gate.is_collectable(cluster) {
            COLLECTION_SKIPPED_CLUSTERS.with_label_values(&[SKIPPED_NOT_LIVE]).inc();
            outcome.skipped_clusters.push(cluster.to_string());
            return outcome;
        }

        let endpoint = match self.resolve_endpoint(cluster) {
            Ok(endpoint) => endpoint,
            Err(error) => {
                tracing::warn!(?error, %cluster, "failed to resolve metrics collector - skipping cluster");
                COLLECTION_SKIPPED_CLUSTERS.with_label_values(&[error.label()]).inc();
                outcome.skipped_clusters.push(cluster.to_string());
                return outcome;
            },
        };

        let _timer = start_collection_timer(cluster);
        for batch in batches.values() {
            tracing::debug!(
                %cluster, window=%batch.window, nr_queries=%batch.nr_queries(), nr_resources=%batch.nr_resources(),
                "collecting timeline metrics batch"
            );
        }

        let queries: Vec<(TimeWindow, &str, TimelineQuery)> = batches
            .iter()
            .filter(|(window, _)| {
                let bounded = window.is_bounded();
                if !bounded {
                    tracing::debug!(%cluster, %window, "time window is missing a bound - skipping batch");
                }
                bounded
            })
            .flat_map(|(window, batch)| {
                batch
                    .scopes
                    .iter()
                    .map(move |(app_id, scope)| (*window, app_id.as_str(), scope.query(app_id, *window)))
            })
            .collect();

        outcome.nr_fetches = queries.len();

        let endpoint = &endpoint;
        let fetched: Vec<(TimeWindow, &str, Vec<MetricSeries>)> = stream::iter(queries)
            .map(|(window, app_id, query)| async move {
                let series = self.client.fetch(endpoint, &query).await;
                (window, app_id, series)
            })
            .buffered(self.max_concurrent_fetches)
            .collect()
            .await;

        for (window, app_id, series) in fetched {
            let Some(scope) = batches.get(&window).and_then(|batch| batch.scopes.get(app_id)) else {
                continue;
            };

            outcome.nr_series += series.len();
            outcome.nr_properties_written += populate(resources, window, scope, &series);
        }

        outcome
    }
}
