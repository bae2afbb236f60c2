pub mod key;
pub mod metrics;
pub mod query;
pub mod registry;
pub mod snapshot;
pub mod tags;

pub use key::KeyId;
pub use metrics::{MetricHandle, MetricKind, Sample, TrendSummary};
pub use query::Query;
pub use registry::{MetricId, Registry};
pub use snapshot::{SeriesSnapshot, SeriesValue, Snapshot};
pub use tags::TagSet;
