use std::str::FromStr;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use validator::Validate;

use crate::error::ConfigurationError;
use crate::topology::DEFAULT_COLLECTOR_PORT;

/// How to reach the timeline metrics collector of each cluster.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CollectorSettings {
    #[serde(default = "CollectorSettings::default_scheme")]
    pub scheme: String,

    /// Collector port used when the cluster topology does not name one.
    #[serde(default = "CollectorSettings::default_port")]
    pub default_port: u16,

    #[serde(default = "CollectorSettings::default_metrics_path")]
    pub metrics_path: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<(String, String)>,

    #[serde(default = "CollectorSettings::default_max_retries")]
    pub max_retries: u32,

    #[serde(default, rename = "timeout_secs", skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "Option<DurationSeconds>")]
    pub timeout: Option<Duration>,

    #[serde(default, rename = "pool_idle_timeout_secs", skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "Option<DurationSeconds>")]
    pub pool_idle_timeout: Option<Duration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_max_idle_per_host: Option<usize>,

    /// Upper bound on concurrent collector fetches for one cluster.
    #[validate(range(min = 1))]
    #[serde(default = "CollectorSettings::default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            scheme: Self::default_scheme(),
            default_port: Self::default_port(),
            metrics_path: Self::default_metrics_path(),
            headers: Vec::default(),
            max_retries: Self::default_max_retries(),
            timeout: None,
            pool_idle_timeout: None,
            pool_max_idle_per_host: None,
            max_concurrent_fetches: Self::default_max_concurrent_fetches(),
        }
    }
}

impl CollectorSettings {
    const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;
    const DEFAULT_MAX_RETRIES: u32 = 0;
    const DEFAULT_METRICS_PATH: &'static str = "/ws/v1/timeline/metrics";
    const DEFAULT_SCHEME: &'static str = "http";

    pub fn default_scheme() -> String {
        Self::DEFAULT_SCHEME.to_string()
    }

    pub const fn default_port() -> u16 {
        DEFAULT_COLLECTOR_PORT
    }

    pub fn default_metrics_path() -> String {
        Self::DEFAULT_METRICS_PATH.to_string()
    }

    pub const fn default_max_retries() -> u32 {
        Self::DEFAULT_MAX_RETRIES
    }

    pub const fn default_max_concurrent_fetches() -> usize {
        Self::DEFAULT_MAX_CONCURRENT_FETCHES
    }

    pub fn header_map(&self) -> Result<HeaderMap, ConfigurationError> {
        let mut result = HeaderMap::with_capacity(self.headers.len());

        for (k, v) in self.headers.iter() {
            let name = HeaderName::from_str(k.as_str())?;
            let value = HeaderValue::from_str(v.as_str())?;
            result.insert(name, value);
        }

        Ok(result)
    }
}
