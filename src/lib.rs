//! Particle Scope
//!
//! Normalization, overlay geometry and result history for a remote particle
//! detection service.
//!
//! # Data flow
//!
//! ```text
//! raw service response ──► detect::normalize_response ──► DetectionResult
//!                                                          ├─► overlay::project_all   (per render)
//!                                                          ├─► storage::HistoryStore  (on save)
//!                                                          └─► report::{csv,html}     (on export)
//! ```
//!
//! Untyped JSON never travels past `detect::normalize_response`; every other
//! module works on the canonical types.
//!
//! # Module Structure
//!
//! - `detect`: canonical types, box parsing, response normalization, display buckets
//! - `overlay`: percentage placement of detections on a rendered image
//! - `storage`: bounded, persisted result history
//! - `session`: request ordering (last user action wins) and auto-save
//! - `transport`: detection service port
//! - `report`: CSV and printable HTML exports
//! - `config`: file + environment configuration

pub mod config;
pub mod detect;
pub mod overlay;
pub mod report;
pub mod session;
pub mod storage;
pub mod transport;

pub use detect::{
    classify, normalize_response, normalize_response_str, parse_box, BoundingBox, BoxConvention,
    CalibrationInfo, ConfidenceBand, Detection, DetectionResult, DisplayBucket, SizeCategory,
    SizeCounts, SizeMetrics,
};
pub use overlay::{project, project_all, LabelAnchor, OverlayRect, ProjectedOverlay, RenderedSize};
pub use session::{AnalysisSession, Completion, FailureNotice, RequestTicket};
pub use storage::{
    HistoryItem, HistoryPersistence, HistoryStore, InMemoryHistoryPersistence,
    SqliteHistoryPersistence, HISTORY_CAPACITY,
};
pub use transport::{CannedDetectionService, DetectionService, ImagePayload};
