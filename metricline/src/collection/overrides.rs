use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Host-level metrics are reported under every app id.
pub const HOST_COMPONENT: &str = "HOST";

/// Components whose metrics the collector files under another app id.
pub static APP_ID_OVERRIDES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    maplit::hashmap! {
        HOST_COMPONENT => "*",
        "HBASE_MASTER" => "HBASE",
        "HBASE_REGIONSERVER" => "HBASE",
        "METRIC_COLLECTOR" => "AMS-HBASE",
    }
});

/// Collector app id under which `component`'s metrics are queried.
pub fn app_id_for(component: &str) -> &str {
    APP_ID_OVERRIDES.get(component).copied().unwrap_or(component)
}
