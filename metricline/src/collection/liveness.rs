use std::sync::Arc;

use crate::topology::CollectorTopology;

/// Decides whether the collector of a cluster may be queried.
#[derive(Clone)]
pub struct LivenessGate {
    topology: Arc<dyn CollectorTopology>,
}

impl std::fmt::Debug for LivenessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LivenessGate").finish()
    }
}

impl LivenessGate {
    pub fn new(topology: Arc<dyn CollectorTopology>) -> Self {
        Self { topology }
    }

    /// Both the collector host and the collector component must be live. A failed lookup counts
    /// as not live.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn is_collectable(&self, cluster: &str) -> bool {
        let host_live = match self.topology.collector_host_live(cluster) {
            Ok(live) => live,
            Err(error) => {
                tracing::warn!(?error, %cluster, "collector host liveness lookup failed");
                false
            },
        };

        let component_live = host_live
            && match self.topology.collector_component_live(cluster) {
                Ok(live) => live,
                Err(error) => {
                    tracing::warn!(?error, %cluster, "collector component liveness lookup failed");
                    false
                },
            };

        if !component_live {
            tracing::info!(
                %cluster, %host_live,
                "metrics collector is not available - skipping timeline metrics collection for cluster"
            );
        }

        component_live
    }
}
