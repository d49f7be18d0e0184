use std::fmt;
use std::sync::Arc;

use tracing::Instrument;
use url::Url;

use super::{MetricsTransport, TimelineMetrics};
use crate::error::CollectionError;
use crate::model::{MetricSeries, TimeWindow};

/// Collector address resolved once per cluster for a collection call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectorEndpoint {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl CollectorEndpoint {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self { scheme: scheme.into(), host: host.into(), port }
    }

    pub fn base_url(&self) -> Result<Url, CollectionError> {
        let url = Url::parse(format!("{}://{}:{}/", self.scheme, self.host, self.port).as_str())?;
        if url.cannot_be_a_base() {
            return Err(CollectionError::NotABaseUrl(url));
        }
        Ok(url)
    }
}

impl fmt::Display for CollectorEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// Parameters of one collector query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineQuery {
    pub app_id: String,
    /// Comma-joined metric query names.
    pub metric_names: String,
    /// Comma-joined host filter; no filter when absent.
    pub host_names: Option<String>,
    pub window: TimeWindow,
}

pub const METRIC_NAMES_PARAM: &str = "metricNames";
pub const HOSTNAME_PARAM: &str = "hostname";
pub const APP_ID_PARAM: &str = "appId";
pub const START_TIME_PARAM: &str = "startTime";
pub const END_TIME_PARAM: &str = "endTime";

/// Builds the collector query url. Empty parameters and open range bounds are omitted.
pub fn query_url(endpoint: &CollectorEndpoint, path: &str, query: &TimelineQuery) -> Result<Url, CollectionError> {
    let mut url = endpoint.base_url()?.join(path.trim_start_matches('/'))?;

    {
        let mut params = url.query_pairs_mut();
        if !query.metric_names.is_empty() {
            params.append_pair(METRIC_NAMES_PARAM, query.metric_names.as_str());
        }

        if let Some(hosts) = query.host_names.as_deref().filter(|h| !h.is_empty()) {
            params.append_pair(HOSTNAME_PARAM, hosts);
        }

        if !query.app_id.is_empty() {
            params.append_pair(APP_ID_PARAM, query.app_id.as_str());
        }

        if let Some(start) = query.window.query_start() {
            params.append_pair(START_TIME_PARAM, start.to_string().as_str());
        }

        if let Some(end) = query.window.query_end() {
            params.append_pair(END_TIME_PARAM, end.to_string().as_str());
        }
    }

    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(url)
}

/// Fetches and decodes timeline metrics for one query.
#[derive(Clone)]
pub struct TimelineClient {
    transport: Arc<dyn MetricsTransport>,
    path: String,
}

impl fmt::Debug for TimelineClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimelineClient").field("path", &self.path).finish()
    }
}

impl TimelineClient {
    pub fn new(transport: Arc<dyn MetricsTransport>, path: impl Into<String>) -> Self {
        Self { transport, path: path.into() }
    }

    pub fn path(&self) -> &str {
        self.path.as_str()
    }

    /// Series returned for `query`. A window missing a bound yields nothing without a call, and a
    /// failed fetch is logged and counted and yields nothing.
    #[tracing::instrument(level = "debug", skip(self, query), fields(app_id=%query.app_id, window=%query.window))]
    pub async fn fetch(&self, endpoint: &CollectorEndpoint, query: &TimelineQuery) -> Vec<MetricSeries> {
        if !query.window.is_bounded() {
            tracing::debug!("window is missing a bound - skipping collector query");
            return Vec::new();
        }

        match self.try_fetch(endpoint, query).await {
            Ok(series) => series,
            Err(error) => {
                tracing::error!(?error, %endpoint, "failed to fetch timeline metrics - no metrics for this query");
                super::track_timeline_errors(query.app_id.as_str(), &error);
                Vec::new()
            },
        }
    }

    pub async fn try_fetch(
        &self, endpoint: &CollectorEndpoint, query: &TimelineQuery,
    ) -> Result<Vec<MetricSeries>, CollectionError> {
        let _timer = super::start_timeline_fetch_timer(query.app_id.as_str());
        let url = query_url(endpoint, self.path.as_str(), query)?;
        let span = tracing::info_span!("query collector timeline metrics", %url);

        let body = self.transport.read_from(&url).instrument(span).await?;
        let metrics: TimelineMetrics = serde_json::from_slice(&body)?;
        let series = metrics.into_series();
        tracing::debug!(nr_series=%series.len(), "timeline metrics received");
        Ok(series)
    }
}
