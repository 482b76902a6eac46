//! Bounding-box parsing and coordinate convention resolution.
//!
//! Upstream boxes arrive as `[x, y, w, h]` either as fractions of the image
//! extent or as absolute pixels of the original capture. The convention is
//! not declared on the wire, so it is inferred from the values themselves.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::coerce::number_or_zero;

/// Canonical `(x, y, w, h)` box. All components are finite.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// How a box's components should be read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoxConvention {
    /// Fractions of the image width/height.
    Normalized,
    /// Pixel units.
    Absolute,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        let finite = |v: f64| if v.is_finite() { v } else { 0.0 };
        Self {
            x: finite(x),
            y: finite(y),
            w: finite(w),
            h: finite(h),
        }
    }

    /// Infer the coordinate convention.
    ///
    /// A box is normalized iff every component is `<= 1`. A genuinely
    /// absolute box lying inside the first pixel and narrower/shorter than a
    /// pixel is misread as normalized; that case is left as-is until the
    /// service declares its convention explicitly.
    pub fn convention(&self) -> BoxConvention {
        if self.x <= 1.0 && self.y <= 1.0 && self.w <= 1.0 && self.h <= 1.0 {
            BoxConvention::Normalized
        } else {
            BoxConvention::Absolute
        }
    }

    /// Resolve into absolute pixels of an image `width` x `height`.
    pub fn to_pixels(&self, width: f64, height: f64) -> BoundingBox {
        match self.convention() {
            BoxConvention::Normalized => BoundingBox::new(
                self.x * width,
                self.y * height,
                self.w * width,
                self.h * height,
            ),
            BoxConvention::Absolute => *self,
        }
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.x, self.y, self.w, self.h]
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from([x, y, w, h]: [f64; 4]) -> Self {
        Self::new(x, y, w, h)
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        b.as_array()
    }
}

/// Parse a raw `bbox` value.
///
/// Missing values, non-arrays and arrays shorter than four elements yield
/// `(0, 0, 0, 0)`. Within a valid array each non-numeric component becomes 0.
/// Elements past the fourth are ignored.
pub fn parse_box(raw: Option<&Value>) -> BoundingBox {
    let Some(items) = raw.and_then(Value::as_array) else {
        return BoundingBox::default();
    };
    if items.len() < 4 {
        return BoundingBox::default();
    }
    BoundingBox::new(
        number_or_zero(items.first()),
        number_or_zero(items.get(1)),
        number_or_zero(items.get(2)),
        number_or_zero(items.get(3)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_box_defaults_malformed_input() {
        let zero = BoundingBox::default();
        assert_eq!(parse_box(None), zero);
        assert_eq!(parse_box(Some(&json!("0.1,0.2,0.3,0.4"))), zero);
        assert_eq!(parse_box(Some(&json!([0.1, 0.2, 0.3]))), zero);
        assert_eq!(parse_box(Some(&json!({ "x": 1 }))), zero);
    }

    #[test]
    fn parse_box_zeroes_bad_components() {
        let parsed = parse_box(Some(&json!([12, "oops", null, "40"])));
        assert_eq!(parsed, BoundingBox::new(12.0, 0.0, 0.0, 40.0));
    }

    #[test]
    fn parse_box_ignores_trailing_elements() {
        let parsed = parse_box(Some(&json!([1, 2, 3, 4, 5, 6])));
        assert_eq!(parsed.as_array(), [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn parse_box_always_finite() {
        for raw in [
            json!([1e308, -1e308, 0, 0]),
            json!(["inf", "-inf", "NaN", 2]),
            json!([[], {}, true, false]),
        ] {
            let b = parse_box(Some(&raw));
            assert!(b.as_array().iter().all(|v| v.is_finite()), "{raw}");
        }
    }

    #[test]
    fn convention_is_normalized_only_when_all_components_fit() {
        assert_eq!(
            BoundingBox::new(0.1, 0.2, 0.3, 0.4).convention(),
            BoxConvention::Normalized
        );
        assert_eq!(
            BoundingBox::new(1.0, 1.0, 1.0, 1.0).convention(),
            BoxConvention::Normalized
        );
        assert_eq!(
            BoundingBox::new(0.1, 0.2, 0.3, 1.5).convention(),
            BoxConvention::Absolute
        );
        assert_eq!(
            BoundingBox::new(120.0, 80.0, 30.0, 20.0).convention(),
            BoxConvention::Absolute
        );
    }

    #[test]
    fn sub_pixel_absolute_box_reads_as_normalized() {
        // Known ambiguity: indistinguishable from a fractional box.
        let b = BoundingBox::new(0.0, 0.0, 0.5, 0.5);
        assert_eq!(b.convention(), BoxConvention::Normalized);
        assert_eq!(b.to_pixels(200.0, 100.0), BoundingBox::new(0.0, 0.0, 100.0, 50.0));
    }

    #[test]
    fn to_pixels_scales_normalized_and_keeps_absolute() {
        let norm = BoundingBox::new(0.5, 0.25, 0.1, 0.2);
        assert_eq!(
            norm.to_pixels(640.0, 480.0),
            BoundingBox::new(320.0, 120.0, 64.0, 96.0)
        );
        let abs = BoundingBox::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(abs.to_pixels(640.0, 480.0), abs);
    }

    #[test]
    fn serializes_as_four_element_array() {
        let b = BoundingBox::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(serde_json::to_value(b).unwrap(), json!([1.0, 2.0, 3.0, 4.0]));
    }
}
