mod api_model;
mod client;
mod transport;

pub use api_model::{TimelineMetric, TimelineMetrics};
pub use client::{query_url, CollectorEndpoint, TimelineClient, TimelineQuery};
pub use transport::{HttpTransport, MetricsTransport};

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramTimer, HistogramVec, IntCounterVec, Opts};

use crate::error::CollectionError;

#[allow(clippy::cognitive_complexity)]
pub(crate) fn log_response(label: &str, response: &reqwest::Response) {
    const PREAMBLE: &str = "collector response received";
    let status = response.status();
    if status.is_success() || status.is_informational() {
        tracing::debug!(?response, "{PREAMBLE}: {label}");
    } else if status.is_client_error() {
        tracing::warn!(?response, "{PREAMBLE}: {label}");
    } else {
        tracing::error!(?response, "{PREAMBLE}: {label}");
    }
}

pub static TIMELINE_FETCH_TIME: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "timeline_fetch_time",
            "Time spent fetching timeline metrics from the collector in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.15, 0.2, 0.3, 0.4, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["app_id"],
    )
    .expect("failed creating timeline_fetch_time metric")
});

#[inline]
fn start_timeline_fetch_timer(app_id: &str) -> HistogramTimer {
    TIMELINE_FETCH_TIME.with_label_values(&[app_id]).start_timer()
}

pub static TIMELINE_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("timeline_errors", "Number of errors fetching timeline metrics from the collector"),
        &["app_id", "error_type"],
    )
    .expect("failed creating timeline_errors metric")
});

#[inline]
pub(crate) fn track_timeline_errors(app_id: &str, error: &CollectionError) {
    TIMELINE_ERRORS.with_label_values(&[app_id, error.label()]).inc()
}
