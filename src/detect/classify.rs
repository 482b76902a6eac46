//! Display bucketing for detections.
//!
//! Two mutually exclusive policies: detections of the particle of interest
//! that carry a size category are shown by physical size; everything else is
//! shown by confidence band.

use super::result::{Detection, SizeCategory};

/// Default particle-of-interest tag.
pub const DEFAULT_PARTICLE_LABEL: &str = "microplastic";

const HIGH_CONFIDENCE: f64 = 0.7;
const MEDIUM_CONFIDENCE: f64 = 0.4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    /// Strict lower thresholds: exactly 0.7 is `Medium`, exactly 0.4 is `Low`.
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence > HIGH_CONFIDENCE {
            ConfidenceBand::High
        } else if confidence > MEDIUM_CONFIDENCE {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::Low
        }
    }
}

/// How a detection is drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DisplayBucket {
    Size(SizeCategory),
    Confidence(ConfidenceBand),
}

impl DisplayBucket {
    /// Stroke color as a CSS hex string.
    pub fn color(&self) -> &'static str {
        match self {
            DisplayBucket::Size(SizeCategory::Nanoplastic) => "#8e44ad",
            DisplayBucket::Size(SizeCategory::Small) => "#2980b9",
            DisplayBucket::Size(SizeCategory::Medium) => "#f39c12",
            DisplayBucket::Size(SizeCategory::Large) => "#c0392b",
            DisplayBucket::Confidence(ConfidenceBand::High) => "#27ae60",
            DisplayBucket::Confidence(ConfidenceBand::Medium) => "#f1c40f",
            DisplayBucket::Confidence(ConfidenceBand::Low) => "#e67e22",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DisplayBucket::Size(SizeCategory::Nanoplastic) => "Nanoplastic (<1 µm)",
            DisplayBucket::Size(SizeCategory::Small) => "Small (1-100 µm)",
            DisplayBucket::Size(SizeCategory::Medium) => "Medium (100-1000 µm)",
            DisplayBucket::Size(SizeCategory::Large) => "Large (1000-5000 µm)",
            DisplayBucket::Confidence(ConfidenceBand::High) => "High confidence",
            DisplayBucket::Confidence(ConfidenceBand::Medium) => "Medium confidence",
            DisplayBucket::Confidence(ConfidenceBand::Low) => "Low confidence",
        }
    }
}

/// Pick the display bucket for a detection.
pub fn classify(detection: &Detection, particle_label: &str) -> DisplayBucket {
    match detection.size_category {
        Some(category) if detection.has_label(particle_label) => DisplayBucket::Size(category),
        _ => DisplayBucket::Confidence(ConfidenceBand::from_confidence(detection.confidence)),
    }
}
