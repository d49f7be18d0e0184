use std::collections::BTreeMap;

use super::{PropertyValue, Sample, TimeWindow};

/// A named metric series returned by the collector.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSeries {
    pub name: String,
    pub host: Option<String>,
    pub app_id: Option<String>,
    pub samples: BTreeMap<i64, f64>,
}

impl MetricSeries {
    pub fn new(name: impl Into<String>, samples: BTreeMap<i64, f64>) -> Self {
        Self { name: name.into(), host: None, app_id: None, samples }
    }

    pub fn with_host(self, host: impl Into<String>) -> Self {
        Self { host: Some(host.into()), ..self }
    }

    /// Max-timestamp sample.
    pub fn latest(&self) -> Option<Sample> {
        self.samples.iter().next_back().map(|(ts, value)| Sample::new(*ts, *value))
    }

    pub fn to_samples(&self) -> Vec<Sample> {
        self.samples.iter().map(|(ts, value)| Sample::new(*ts, *value)).collect()
    }

    /// Value written for this series: the latest sample for point-in-time, or the full ordered
    /// series for a range. An empty series has no value.
    pub fn value_for(&self, window: &TimeWindow) -> Option<PropertyValue> {
        if self.samples.is_empty() {
            return None;
        }

        match window {
            TimeWindow::PointInTime => self.latest().map(|s| PropertyValue::Number(s.value)),
            TimeWindow::Range { .. } => Some(PropertyValue::Series(self.to_samples())),
        }
    }
}
