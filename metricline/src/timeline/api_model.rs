use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::MetricSeries;

/// Response document of the collector's timeline metrics endpoint.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineMetrics {
    #[serde(default)]
    pub metrics: Vec<TimelineMetric>,
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineMetric {
    #[serde(rename = "metricname", default)]
    pub metric_name: Option<String>,

    #[serde(rename = "hostname", default, skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,

    #[serde(rename = "appid", default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,

    #[serde(rename = "instanceid", default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,

    #[serde(rename = "starttime", default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,

    #[serde(rename = "metrics", default)]
    pub metric_values: Option<BTreeMap<i64, Option<f64>>>,
}

impl TimelineMetric {
    /// Converts into a series; elements without a name or without any values are dropped.
    pub fn into_series(self) -> Option<MetricSeries> {
        let name = self.metric_name.filter(|name| !name.is_empty())?;
        let samples: BTreeMap<i64, f64> = self
            .metric_values?
            .into_iter()
            .filter_map(|(ts, value)| value.map(|v| (ts, v)))
            .collect();

        if samples.is_empty() {
            return None;
        }

        Some(MetricSeries { name, host: self.host_name, app_id: self.app_id, samples })
    }
}

impl TimelineMetrics {
    pub fn into_series(self) -> Vec<MetricSeries> {
        self.metrics.into_iter().filter_map(TimelineMetric::into_series).collect()
    }
}
