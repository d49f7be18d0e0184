mod resource;
mod series;
mod window;

pub use resource::{PropertyBag, PropertyValue, Resource, ResourceKeys, Sample};
pub use series::MetricSeries;
pub use window::{TimeWindow, UNBOUNDED};
