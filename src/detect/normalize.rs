//! Decode boundary for detection-service responses.
//!
//! Everything the service returns is treated as untrusted and loosely typed.
//! `normalize_response` is total: wrong types and missing fields fall back to
//! defaults, and a malformed detection degrades on its own without taking
//! the rest of the response with it.

use chrono::Utc;
use serde_json::{Map, Value};

use super::coerce::{coerce_number, count_or_zero, field, number_or_zero};
use super::geometry::parse_box;
use super::result::{
    CalibrationInfo, Detection, DetectionResult, FieldOfView, ImageSize, SizeCategory,
    SizeCounts, SizeMetrics, DEFAULT_LABEL,
};

const SIZE_METRICS_KEYS: [&str; 2] = ["size_metrics", "sizeMetrics"];
const SIZE_CATEGORY_KEYS: [&str; 2] = ["size_category", "sizeCategory"];
const SIZE_COUNTS_KEYS: [&str; 2] = ["size_counts", "sizeCounts"];
const IMAGE_SIZE_KEYS: [&str; 2] = ["image_size", "imageSize"];
const CALIBRATION_KEYS: [&str; 2] = ["calibration_info", "calibrationInfo"];

/// Normalize a raw service response into the canonical result.
///
/// The timestamp is always taken from the local clock.
pub fn normalize_response(raw: &Value) -> DetectionResult {
    let now = Utc::now();
    let Some(obj) = raw.as_object() else {
        log::debug!("detection response is not an object; using empty result");
        return DetectionResult::empty(now);
    };

    let count = count_or_zero(obj.get("count"));
    let detections: Vec<Detection> = match obj.get("detections").and_then(Value::as_array) {
        Some(items) => items.iter().map(normalize_detection).collect(),
        None => Vec::new(),
    };
    if count != detections.len() as u64 {
        log::debug!(
            "detection count {} differs from {} returned detections",
            count,
            detections.len()
        );
    }

    DetectionResult {
        count,
        detections,
        image_size: field(obj, &IMAGE_SIZE_KEYS).and_then(parse_image_size),
        size_counts: field(obj, &SIZE_COUNTS_KEYS)
            .and_then(parse_size_counts)
            .unwrap_or_default(),
        calibration_info: field(obj, &CALIBRATION_KEYS).and_then(parse_calibration),
        timestamp: now,
    }
}

/// Parse JSON text and normalize it. Unparseable text yields the empty result.
pub fn normalize_response_str(raw: &str) -> DetectionResult {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => normalize_response(&value),
        Err(e) => {
            log::warn!("detection response is not valid JSON: {}", e);
            DetectionResult::empty(Utc::now())
        }
    }
}

fn normalize_detection(value: &Value) -> Detection {
    let empty = Map::new();
    let obj = value.as_object().unwrap_or(&empty);

    let label = obj
        .get("label")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .unwrap_or(DEFAULT_LABEL)
        .to_string();

    Detection {
        confidence: number_or_zero(obj.get("confidence")),
        bbox: parse_box(obj.get("bbox")),
        label,
        size_metrics: field(obj, &SIZE_METRICS_KEYS).and_then(parse_size_metrics),
        size_category: field(obj, &SIZE_CATEGORY_KEYS)
            .and_then(Value::as_str)
            .and_then(SizeCategory::parse),
    }
}

fn parse_size_metrics(value: &Value) -> Option<SizeMetrics> {
    let obj = value.as_object()?;
    Some(SizeMetrics {
        width_um: number_or_zero(field(obj, &["width_um", "widthUm"])),
        height_um: number_or_zero(field(obj, &["height_um", "heightUm"])),
        diagonal_um: number_or_zero(field(obj, &["diagonal_um", "diagonalUm"])),
    })
}

/// All four named counts must be numeric; anything less is treated as absent.
fn parse_size_counts(value: &Value) -> Option<SizeCounts> {
    let obj = value.as_object()?;
    let count = |key: &str| {
        obj.get(key)
            .and_then(coerce_number)
            .map(|_| count_or_zero(obj.get(key)))
    };
    Some(SizeCounts {
        nanoplastic: count("nanoplastic")?,
        small: count("small")?,
        medium: count("medium")?,
        large: count("large")?,
    })
}

fn parse_image_size(value: &Value) -> Option<ImageSize> {
    let obj = value.as_object()?;
    let dim = |key: &str| {
        let v = obj.get(key).and_then(coerce_number)?.round();
        (1.0..=u32::MAX as f64).contains(&v).then_some(v as u32)
    };
    Some(ImageSize {
        width: dim("width")?,
        height: dim("height")?,
    })
}

fn parse_calibration(value: &Value) -> Option<CalibrationInfo> {
    let obj = value.as_object()?;
    let microns_per_pixel =
        field(obj, &["microns_per_pixel", "micronsPerPixel"]).and_then(coerce_number)?;
    let field_of_view = field(obj, &["field_of_view", "fieldOfView"])
        .and_then(Value::as_object)
        .and_then(|fov| {
            Some(FieldOfView {
                width_um: field(fov, &["width_um", "widthUm"]).and_then(coerce_number)?,
                height_um: field(fov, &["height_um", "heightUm"]).and_then(coerce_number)?,
            })
        });
    Some(CalibrationInfo {
        microns_per_pixel,
        field_of_view,
    })
}
