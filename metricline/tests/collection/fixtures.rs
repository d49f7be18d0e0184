use metricline::collection::TimelineMetricsCollector;
use metricline::model::{PropertyBag, ResourceKeys};
use metricline::registry::PropertyInfo;
use metricline::settings::{CollectorSettings, RegistrySettings, Settings};
use metricline::topology::{ClusterTopology, StaticTopology};
use serde_json::json;
use wiremock::MockServer;

pub const CLUSTER: &str = "c1";
pub const METRICS_PATH: &str = "/ws/v1/timeline/metrics";

pub fn registry_settings() -> RegistrySettings {
    RegistrySettings {
        components: maplit::btreemap! {
            "DATANODE".to_string() => maplit::btreemap! {
                "metrics/dfs/datanode/bytes_read".to_string() =>
                    PropertyInfo::new("dfs.datanode.BytesRead", true, true),
                "metrics/dfs/datanode/blocks_cached".to_string() =>
                    PropertyInfo::new("dfs.datanode.BlocksCached", true, false),
                "metrics/$1/count".to_string() => PropertyInfo::new("foo.(bar|baz).count", true, true),
            },
            "HOST".to_string() => maplit::btreemap! {
                "metrics/cpu/cpu_user".to_string() => PropertyInfo::new("cpu_user", true, true),
            },
        },
        ..RegistrySettings::default()
    }
}

pub fn settings_for(mock_server: &MockServer, collector_live: bool) -> Settings {
    Settings {
        collector: CollectorSettings::default(),
        resource: ResourceKeys::default(),
        registry: registry_settings(),
        topology: StaticTopology {
            clusters: maplit::btreemap! {
                CLUSTER.to_string() => ClusterTopology {
                    collector_port: Some(mock_server.address().port()),
                    component_live: collector_live,
                    ..ClusterTopology::new(mock_server.address().ip().to_string())
                },
            },
        },
        probe: Default::default(),
    }
}

pub fn collector_for(mock_server: &MockServer, collector_live: bool) -> anyhow::Result<TimelineMetricsCollector> {
    let collector = TimelineMetricsCollector::from_settings(&settings_for(mock_server, collector_live))?;
    Ok(collector)
}

pub fn resource(host: Option<&str>, component: &str) -> PropertyBag {
    let bag = PropertyBag::new()
        .with("HostRoles/cluster_name", CLUSTER)
        .with("HostRoles/component_name", component);

    match host {
        Some(host) => bag.with("HostRoles/host_name", host),
        None => bag,
    }
}

pub fn timeline_metric(name: &str, host: Option<&str>, app_id: &str, values: &[(i64, f64)]) -> serde_json::Value {
    let values: serde_json::Map<String, serde_json::Value> =
        values.iter().map(|(ts, v)| (ts.to_string(), json!(v))).collect();

    json!({
        "metricname": name,
        "hostname": host,
        "appid": app_id,
        "metrics": values,
    })
}

pub fn timeline_body(metrics: Vec<serde_json::Value>) -> serde_json::Value {
    json!({ "metrics": metrics })
}
