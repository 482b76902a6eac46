//! Overlay placement for detections on a rendered image.
//!
//! Rectangles are expressed as percentages of the rendered element so they
//! stay aligned however the element is scaled on screen. The target extent is
//! the element's natural pixel size, not the capture size the service saw.

use crate::detect::{classify, Detection, DetectionResult, DisplayBucket};

/// Labels for boxes whose top edge lies above this line are drawn inside the
/// box instead of above it.
pub const LABEL_FLIP_TOP_PCT: f64 = 10.0;

/// Natural pixel size of the rendered image element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderedSize {
    pub width: u32,
    pub height: u32,
}

impl RenderedSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelAnchor {
    /// Immediately above the box.
    Above,
    /// Inside the box, against its top edge.
    InsideTop,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayRect {
    pub left_pct: f64,
    pub top_pct: f64,
    pub width_pct: f64,
    pub height_pct: f64,
    pub label_anchor: LabelAnchor,
}

/// A projected rectangle together with what it annotates.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectedOverlay {
    /// Position of the detection in upstream order.
    pub index: usize,
    pub rect: OverlayRect,
    pub bucket: DisplayBucket,
    pub caption: String,
}

/// Project one detection onto the rendered image.
///
/// Returns `None` until the rendered size is known and non-zero.
pub fn project(detection: &Detection, rendered: Option<RenderedSize>) -> Option<OverlayRect> {
    let size = rendered.filter(|s| s.width > 0 && s.height > 0)?;
    let width = f64::from(size.width);
    let height = f64::from(size.height);

    let px = detection.bbox.to_pixels(width, height);
    let top_pct = px.y / height * 100.0;
    let label_anchor = if top_pct < LABEL_FLIP_TOP_PCT {
        LabelAnchor::InsideTop
    } else {
        LabelAnchor::Above
    };

    Some(OverlayRect {
        left_pct: px.x / width * 100.0,
        top_pct,
        width_pct: px.w / width * 100.0,
        height_pct: px.h / height * 100.0,
        label_anchor,
    })
}

/// Project every detection in a result, keeping upstream order.
pub fn project_all(
    result: &DetectionResult,
    rendered: Option<RenderedSize>,
    particle_label: &str,
) -> Vec<ProjectedOverlay> {
    if rendered.is_none() {
        log::debug!("rendered image size unknown; skipping overlays");
    }
    result
        .detections
        .iter()
        .enumerate()
        .filter_map(|(index, detection)| {
            let rect = project(detection, rendered)?;
            Some(ProjectedOverlay {
                index,
                rect,
                bucket: classify(detection, particle_label),
                caption: caption(detection),
            })
        })
        .collect()
}

fn caption(detection: &Detection) -> String {
    let pct = detection.confidence * 100.0;
    match detection.size_metrics {
        Some(m) => format!("{} {:.0}% ({:.1} µm)", detection.label, pct, m.diagonal_um),
        None => format!("{} {:.0}%", detection.label, pct),
    }
}
