//! Export artifacts for a canonical result.
//!
//! - `csv`: one row per detection.
//! - `html`: printable document with the detection table, size totals and
//!   calibration summary.

mod csv;
mod html;

pub use csv::csv_report;
pub use html::html_report;

use crate::detect::{Detection, SizeMetrics};

const NOT_AVAILABLE: &str = "N/A";

/// Cells shared by both emitters, in column order.
pub(crate) struct DetectionRow {
    pub index: usize,
    pub label: String,
    pub confidence_pct: String,
    pub size_category: String,
    pub diagonal_um: String,
    pub width_um: String,
    pub height_um: String,
    pub bbox: String,
}

pub(crate) const COLUMNS: [&str; 8] = [
    "Index",
    "Label",
    "Confidence (%)",
    "Size Category",
    "Diagonal (um)",
    "Width (um)",
    "Height (um)",
    "BBox",
];

impl DetectionRow {
    pub fn from_detection(index: usize, detection: &Detection) -> Self {
        let metric = |pick: fn(&SizeMetrics) -> f64| {
            detection
                .size_metrics
                .as_ref()
                .map(|m| format!("{:.2}", pick(m)))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string())
        };
        let b = detection.bbox;
        Self {
            index: index + 1,
            label: detection.label.clone(),
            confidence_pct: format!("{:.1}", detection.confidence * 100.0),
            size_category: detection
                .size_category
                .map(|c| c.to_string())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            diagonal_um: metric(|m| m.diagonal_um),
            width_um: metric(|m| m.width_um),
            height_um: metric(|m| m.height_um),
            bbox: format!("{} {} {} {}", b.x, b.y, b.w, b.h),
        }
    }

    pub fn cells(&self) -> [String; 8] {
        [
            self.index.to_string(),
            self.label.clone(),
            self.confidence_pct.clone(),
            self.size_category.clone(),
            self.diagonal_um.clone(),
            self.width_um.clone(),
            self.height_um.clone(),
            self.bbox.clone(),
        ]
    }
}
