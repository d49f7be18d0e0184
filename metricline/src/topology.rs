use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::error::TopologyError;

/// Port the collector listens on when the topology does not name one.
pub const DEFAULT_COLLECTOR_PORT: u16 = 8188;

/// Answers where the metrics collector of a cluster runs and whether it is live.
#[cfg_attr(test, mockall::automock)]
pub trait CollectorTopology: Send + Sync {
    fn collector_host_live(&self, cluster: &str) -> Result<bool, TopologyError>;

    fn collector_component_live(&self, cluster: &str) -> Result<bool, TopologyError>;

    fn collector_hostname(&self, cluster: &str) -> Result<String, TopologyError>;

    fn collector_port(&self, cluster: &str) -> Result<Option<u16>, TopologyError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterTopology {
    pub collector_host: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collector_port: Option<u16>,

    #[serde(default = "ClusterTopology::default_live")]
    pub host_live: bool,

    #[serde(default = "ClusterTopology::default_live")]
    pub component_live: bool,
}

impl ClusterTopology {
    pub fn new(collector_host: impl Into<String>) -> Self {
        Self {
            collector_host: collector_host.into(),
            collector_port: None,
            host_live: true,
            component_live: true,
        }
    }

    pub const fn default_live() -> bool {
        true
    }
}

/// Fixed topology, e.g. from settings. Clusters are serialized as a sequence of pairs.
#[serde_as]
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticTopology {
    #[serde(default)]
    #[serde_as(as = "Vec<(_, _)>")]
    pub clusters: BTreeMap<String, ClusterTopology>,
}

impl StaticTopology {
    fn cluster(&self, cluster: &str) -> Result<&ClusterTopology, TopologyError> {
        self.clusters
            .get(cluster)
            .ok_or_else(|| TopologyError::UnknownCluster(cluster.to_string()))
    }
}

impl CollectorTopology for StaticTopology {
    fn collector_host_live(&self, cluster: &str) -> Result<bool, TopologyError> {
        self.cluster(cluster).map(|c| c.host_live)
    }

    fn collector_component_live(&self, cluster: &str) -> Result<bool, TopologyError> {
        self.cluster(cluster).map(|c| c.component_live)
    }

    fn collector_hostname(&self, cluster: &str) -> Result<String, TopologyError> {
        self.cluster(cluster).map(|c| c.collector_host.clone())
    }

    fn collector_port(&self, cluster: &str) -> Result<Option<u16>, TopologyError> {
        self.cluster(cluster).map(|c| c.collector_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claim::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_static_topology_lookup() {
        let topology = StaticTopology {
            clusters: maplit::btreemap! {
                "c1".to_string() => ClusterTopology { collector_port: Some(6188), ..ClusterTopology::new("ams-host") },
            },
        };

        assert_eq!(assert_ok!(topology.collector_hostname("c1")), "ams-host");
        assert_eq!(assert_ok!(topology.collector_port("c1")), Some(6188));
        assert!(assert_ok!(topology.collector_host_live("c1")));
        assert_eq!(
            assert_err!(topology.collector_component_live("c2")),
            TopologyError::UnknownCluster("c2".to_string())
        );
    }

    #[test]
    fn test_static_topology_ron() {
        let actual: StaticTopology = assert_ok!(ron::from_str(
            r#"(clusters: [("Prod-1", (collector_host: "ams-host", component_live: false))])"#
        ));
        let cluster = assert_some!(actual.clusters.get("Prod-1"));
        assert_eq!(cluster, &ClusterTopology { component_live: false, ..ClusterTopology::new("ams-host") });
    }

    #[test]
    fn test_cluster_topology_ron_defaults() {
        let actual: ClusterTopology = assert_ok!(ron::from_str(r#"(collector_host: "ams-host")"#));
        assert_eq!(actual, ClusterTopology::new("ams-host"));
    }
}
