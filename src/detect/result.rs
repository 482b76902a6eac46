use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::geometry::BoundingBox;

/// Label assigned when upstream leaves it empty or missing.
pub const DEFAULT_LABEL: &str = "object";

/// Canonical result of one completed analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    /// Detection total as reported upstream. Not reconciled with
    /// `detections.len()`.
    pub count: u64,
    /// Detections in upstream order.
    pub detections: Vec<Detection>,
    /// Original image dimensions as reported by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_size: Option<ImageSize>,
    #[serde(default)]
    pub size_counts: SizeCounts,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibration_info: Option<CalibrationInfo>,
    /// Assigned locally when the result was normalized.
    pub timestamp: DateTime<Utc>,
}

impl DetectionResult {
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            detections: Vec::new(),
            image_size: None,
            size_counts: SizeCounts::default(),
            calibration_info: None,
            timestamp,
        }
    }
}

/// One located particle candidate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub confidence: f64,
    pub bbox: BoundingBox,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_metrics: Option<SizeMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_category: Option<SizeCategory>,
}

impl Detection {
    /// Case-insensitive label comparison, Unicode-aware.
    pub fn has_label(&self, tag: &str) -> bool {
        self.label.trim().to_lowercase() == tag.trim().to_lowercase()
    }
}

/// Physical extent of a detection, in micrometres.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeMetrics {
    pub width_um: f64,
    pub height_um: f64,
    pub diagonal_um: f64,
}

/// Closed set of physical size buckets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeCategory {
    /// Diagonal below 1 µm.
    Nanoplastic,
    /// 1 to 100 µm.
    Small,
    /// 100 to 1000 µm.
    Medium,
    /// 1000 to 5000 µm.
    Large,
}

impl SizeCategory {
    pub const ALL: [SizeCategory; 4] = [
        SizeCategory::Nanoplastic,
        SizeCategory::Small,
        SizeCategory::Medium,
        SizeCategory::Large,
    ];

    /// Parse an upstream tag. Unknown tags are `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "nanoplastic" => Some(SizeCategory::Nanoplastic),
            "small" => Some(SizeCategory::Small),
            "medium" => Some(SizeCategory::Medium),
            "large" => Some(SizeCategory::Large),
            _ => None,
        }
    }

    /// Bucket a physical diagonal. Values past the large range still map to
    /// `Large`; non-finite or negative diagonals have no bucket.
    pub fn from_diagonal_um(diagonal_um: f64) -> Option<Self> {
        if !diagonal_um.is_finite() || diagonal_um < 0.0 {
            return None;
        }
        Some(if diagonal_um < 1.0 {
            SizeCategory::Nanoplastic
        } else if diagonal_um < 100.0 {
            SizeCategory::Small
        } else if diagonal_um < 1000.0 {
            SizeCategory::Medium
        } else {
            SizeCategory::Large
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SizeCategory::Nanoplastic => "nanoplastic",
            SizeCategory::Small => "small",
            SizeCategory::Medium => "medium",
            SizeCategory::Large => "large",
        }
    }

    /// Human-readable range, e.g. `1-100 µm`.
    pub fn range_label(&self) -> &'static str {
        match self {
            SizeCategory::Nanoplastic => "<1 µm",
            SizeCategory::Small => "1-100 µm",
            SizeCategory::Medium => "100-1000 µm",
            SizeCategory::Large => "1000-5000 µm",
        }
    }
}

impl std::fmt::Display for SizeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-category detection totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeCounts {
    pub nanoplastic: u64,
    pub small: u64,
    pub medium: u64,
    pub large: u64,
}

impl SizeCounts {
    pub fn get(&self, category: SizeCategory) -> u64 {
        match category {
            SizeCategory::Nanoplastic => self.nanoplastic,
            SizeCategory::Small => self.small,
            SizeCategory::Medium => self.medium,
            SizeCategory::Large => self.large,
        }
    }

    pub fn total(&self) -> u64 {
        SizeCategory::ALL.iter().map(|c| self.get(*c)).sum()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// Scale information reported by the service. Display only; never used for
/// overlay geometry.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationInfo {
    pub microns_per_pixel: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_of_view: Option<FieldOfView>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOfView {
    pub width_um: f64,
    pub height_um: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagonal_buckets_follow_ranges() {
        assert_eq!(SizeCategory::from_diagonal_um(0.5), Some(SizeCategory::Nanoplastic));
        assert_eq!(SizeCategory::from_diagonal_um(1.0), Some(SizeCategory::Small));
        assert_eq!(SizeCategory::from_diagonal_um(99.9), Some(SizeCategory::Small));
        assert_eq!(SizeCategory::from_diagonal_um(100.0), Some(SizeCategory::Medium));
        assert_eq!(SizeCategory::from_diagonal_um(1000.0), Some(SizeCategory::Large));
        assert_eq!(SizeCategory::from_diagonal_um(7200.0), Some(SizeCategory::Large));
        assert_eq!(SizeCategory::from_diagonal_um(-1.0), None);
        assert_eq!(SizeCategory::from_diagonal_um(f64::NAN), None);
    }

    #[test]
    fn category_parse_is_case_insensitive() {
        assert_eq!(SizeCategory::parse(" Medium "), Some(SizeCategory::Medium));
        assert_eq!(SizeCategory::parse("huge"), None);
    }

    #[test]
    fn size_counts_total() {
        let counts = SizeCounts {
            nanoplastic: 1,
            small: 2,
            medium: 3,
            large: 4,
        };
        assert_eq!(counts.total(), 10);
        assert_eq!(counts.get(SizeCategory::Medium), 3);
    }

    #[test]
    fn label_match_ignores_case() {
        let det = Detection {
            confidence: 0.5,
            bbox: BoundingBox::default(),
            label: "MicroPlastic".to_string(),
            size_metrics: None,
            size_category: None,
        };
        assert!(det.has_label("microplastic"));
        assert!(!det.has_label("fiber"));
    }
}
