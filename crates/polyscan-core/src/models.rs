pub mod area;
pub mod boundary;
pub mod frequency;
pub mod predicate;
pub mod record;

pub use area::AreaInsights;
pub use boundary::{validate_boundary, BoundaryPoint};
pub use frequency::{BucketValue, FrequencyBucket, InsightSummary, InsightsResponse, NestedInsights};
pub use predicate::{AttributeFilter, Connective, Predicate, Relation};
pub use record::{GeometryRecord, GeometryType, RecordGeometry, ROOT_FOLDER, UNNAMED};
