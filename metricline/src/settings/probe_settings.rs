use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use validator::Validate;

use crate::collection::CollectionRequest;
use crate::model::{PropertyBag, ResourceKeys, TimeWindow};

/// The binary's periodic refresh: which resources to populate, with which properties, how often.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ProbeSettings {
    #[serde(rename = "interval_secs", default = "ProbeSettings::default_interval")]
    #[serde_as(as = "DurationSeconds")]
    pub interval: Duration,

    /// Length of the trailing window requested; point-in-time values when absent.
    #[serde(default, rename = "window_secs", skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "Option<DurationSeconds>")]
    pub window: Option<Duration>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ProbeResource>,

    #[validate(length(min = 1))]
    #[serde(default = "ProbeSettings::default_property_ids")]
    pub property_ids: Vec<String>,
}

/// A resource the probe populates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResource {
    pub cluster: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    pub component: String,
}

impl ProbeResource {
    /// The resource as a property bag keyed by `keys`.
    pub fn to_property_bag(&self, keys: &ResourceKeys) -> PropertyBag {
        let bag = PropertyBag::new()
            .with(keys.cluster.as_str(), self.cluster.as_str())
            .with(keys.component.as_str(), self.component.as_str());

        match (keys.host.as_deref(), self.host.as_deref()) {
            (Some(key), Some(host)) => bag.with(key, host),
            _ => bag,
        }
    }
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            interval: Self::default_interval(),
            window: None,
            resources: Vec::default(),
            property_ids: Self::default_property_ids(),
        }
    }
}

impl ProbeSettings {
    const DEFAULT_INTERVAL: Duration = Duration::from_secs(15);
    const DEFAULT_PROPERTY_ID: &'static str = "metrics";

    pub const fn default_interval() -> Duration {
        Self::DEFAULT_INTERVAL
    }

    pub fn default_property_ids() -> Vec<String> {
        vec![Self::DEFAULT_PROPERTY_ID.to_string()]
    }

    pub fn property_bags(&self, keys: &ResourceKeys) -> Vec<PropertyBag> {
        self.resources.iter().map(|r| r.to_property_bag(keys)).collect()
    }

    /// The collection request for one refresh ending at `now`.
    pub fn request(&self, now: DateTime<Utc>) -> CollectionRequest {
        let mut request = CollectionRequest::new(self.property_ids.iter().cloned());

        if let Some(window) = self.window {
            let end = now.timestamp();
            let start = end.saturating_sub(i64::try_from(window.as_secs()).unwrap_or(i64::MAX));
            let window = TimeWindow::range(start, end);
            for property_id in self.property_ids.iter() {
                request = request.with_window(property_id.clone(), window);
            }
        }

        request
    }
}
