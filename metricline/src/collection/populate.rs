use super::batch::AppScope;
use crate::model::{MetricSeries, Resource, TimeWindow};
use crate::template;

/// Writes each returned series onto the resources of `scope` that requested it. Returns the
/// number of property values written.
#[tracing::instrument(level = "debug", skip(resources, scope, series), fields(nr_series=%series.len()))]
pub fn populate<R: Resource>(
    resources: &mut [R], window: TimeWindow, scope: &AppScope, series: &[MetricSeries],
) -> usize {
    let mut nr_written = 0;

    for s in series {
        let Some((target, arguments)) = scope.find_target(s.name.as_str()) else {
            tracing::trace!(metric=%s.name, "no requested template matches returned metric - discarding");
            continue;
        };

        let Some(value) = s.value_for(&window) else { continue };

        for (property_template, requesters) in target.properties.iter() {
            let property_id = template::substitute_arguments(property_template, &arguments);

            for resource_id in requesters.iter().copied() {
                let accepts = scope
                    .host_of(resource_id)
                    .map_or(false, |host| host.accepts(s.host.as_deref()));
                if !accepts {
                    continue;
                }

                if let Some(resource) = resources.get_mut(resource_id) {
                    resource.set_property(property_id.clone(), value.clone());
                    nr_written += 1;
                }
            }
        }
    }

    nr_written
}
