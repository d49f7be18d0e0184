use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One timestamped sample of a metric series.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: i64,
    pub value: f64,
}

impl Sample {
    pub const fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Value held under a resource property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Number(f64),
    Series(Vec<Sample>),
    Text(String),
}

impl PropertyValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<Vec<Sample>> for PropertyValue {
    fn from(samples: Vec<Sample>) -> Self {
        Self::Series(samples)
    }
}

impl From<String> for PropertyValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for PropertyValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// An externally owned property container that metrics are read from and written into.
pub trait Resource {
    fn property(&self, key: &str) -> Option<&PropertyValue>;

    fn set_property(&mut self, key: String, value: PropertyValue);

    fn text_property(&self, key: &str) -> Option<&str> {
        self.property(key).and_then(PropertyValue::as_text)
    }
}

/// A plain map-backed [`Resource`].
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyBag(BTreeMap<String, PropertyValue>);

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.0.iter()
    }
}

impl Resource for PropertyBag {
    fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.0.get(key)
    }

    fn set_property(&mut self, key: String, value: PropertyValue) {
        self.0.insert(key, value);
    }
}

impl FromIterator<(String, PropertyValue)> for PropertyBag {
    fn from_iter<T: IntoIterator<Item = (String, PropertyValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Names of the resource properties identifying a resource's cluster, host and component.
/// Resources without a host property are collected against the cluster-wide aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceKeys {
    #[serde(default = "ResourceKeys::default_cluster")]
    pub cluster: String,

    #[serde(default = "ResourceKeys::default_host")]
    pub host: Option<String>,

    #[serde(default = "ResourceKeys::default_component")]
    pub component: String,
}

impl Default for ResourceKeys {
    fn default() -> Self {
        Self {
            cluster: Self::default_cluster(),
            host: Self::default_host(),
            component: Self::default_component(),
        }
    }
}

impl ResourceKeys {
    const DEFAULT_CLUSTER: &'static str = "HostRoles/cluster_name";
    const DEFAULT_COMPONENT: &'static str = "HostRoles/component_name";
    const DEFAULT_HOST: &'static str = "HostRoles/host_name";

    pub fn new(cluster: impl Into<String>, host: Option<String>, component: impl Into<String>) -> Self {
        Self { cluster: cluster.into(), host, component: component.into() }
    }

    pub fn default_cluster() -> String {
        Self::DEFAULT_CLUSTER.to_string()
    }

    pub fn default_host() -> Option<String> {
        Some(Self::DEFAULT_HOST.to_string())
    }

    pub fn default_component() -> String {
        Self::DEFAULT_COMPONENT.to_string()
    }

    pub fn cluster_of<'r, R: Resource>(&self, resource: &'r R) -> Option<&'r str> {
        resource.text_property(self.cluster.as_str())
    }

    pub fn host_of<'r, R: Resource>(&self, resource: &'r R) -> Option<&'r str> {
        self.host
            .as_deref()
            .and_then(|key| resource.text_property(key))
            .filter(|host| !host.is_empty())
    }

    pub fn component_of<'r, R: Resource>(&self, resource: &'r R) -> Option<&'r str> {
        resource.text_property(self.component.as_str())
    }
}
