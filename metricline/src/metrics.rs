use prometheus::Registry;

use crate::{collection, timeline};

#[tracing::instrument(level = "trace")]
pub fn register_metrics(registry: &Registry) -> Result<(), prometheus::Error> {
    registry.register(Box::new(collection::COLLECTION_TIME.clone()))?;
    registry.register(Box::new(collection::COLLECTION_SKIPPED_CLUSTERS.clone()))?;
    registry.register(Box::new(collection::COLLECTION_PROPERTIES_POPULATED.clone()))?;

    registry.register(Box::new(timeline::TIMELINE_FETCH_TIME.clone()))?;
    registry.register(Box::new(timeline::TIMELINE_ERRORS.clone()))?;

    Ok(())
}
