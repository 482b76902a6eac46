mod classify;
mod coerce;
mod geometry;
mod normalize;
mod result;

pub use classify::{classify, ConfidenceBand, DisplayBucket, DEFAULT_PARTICLE_LABEL};
pub use geometry::{parse_box, BoundingBox, BoxConvention};
pub use normalize::{normalize_response, normalize_response_str};
pub use result::{
    CalibrationInfo, Detection, DetectionResult, FieldOfView, ImageSize, SizeCategory,
    SizeCounts, SizeMetrics, DEFAULT_LABEL,
};
