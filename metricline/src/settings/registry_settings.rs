use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::registry::ComponentMetrics;

/// Component name to the metric properties it declares. Serialized as sequences of pairs since
/// component names and property ids are case-sensitive.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    #[serde_as(as = "Vec<(_, Vec<(_, _)>)>")]
    pub components: BTreeMap<String, ComponentMetrics>,

    /// Upper bound on instantiated property ids the registry remembers after synthesizing them.
    #[serde(skip_serializing_if = "RegistrySettings::is_default_max_synthesized")]
    pub max_synthesized: usize,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            components: BTreeMap::default(),
            max_synthesized: Self::DEFAULT_MAX_SYNTHESIZED,
        }
    }
}

impl RegistrySettings {
    pub const DEFAULT_MAX_SYNTHESIZED: usize = 10_000;

    fn is_default_max_synthesized(max_synthesized: &usize) -> bool {
        *max_synthesized == Self::DEFAULT_MAX_SYNTHESIZED
    }
}
