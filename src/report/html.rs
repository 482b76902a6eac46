use crate::detect::{DetectionResult, SizeCategory};

use super::{DetectionRow, COLUMNS};

const STYLE: &str = "body{font-family:sans-serif}table{border-collapse:collapse}\
                     td,th{border:1px solid #999;padding:2px 6px}img{max-width:100%}";

/// Render a printable HTML document for `result`.
///
/// `image` is embedded as-is as the `src` of an `<img>` element, so it should
/// be a data URL or a path the viewer can resolve.
pub fn html_report(result: &DetectionResult, image: &str, filename: &str) -> String {
    let mut out = String::new();
    line(&mut out, "<!DOCTYPE html>");
    line(&mut out, "<html><head><meta charset=\"utf-8\">");
    line(&mut out, &format!("<title>Particle report: {}</title>", escape(filename)));
    line(&mut out, &format!("<style>{}</style>", STYLE));
    line(&mut out, "</head><body>");
    line(&mut out, "<h1>Particle report</h1>");
    line(&mut out, &format!("<p>File: {}</p>", escape(filename)));
    line(
        &mut out,
        &format!(
            "<p>Analyzed: {}</p>",
            result.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ),
    );
    line(&mut out, &format!("<p>Total detections: {}</p>", result.count));
    line(
        &mut out,
        &format!("<img src=\"{}\" alt=\"{}\">", escape(image), escape(filename)),
    );

    line(&mut out, "<h2>Size distribution</h2>");
    line(&mut out, "<table><tr><th>Category</th><th>Range</th><th>Count</th></tr>");
    for category in SizeCategory::ALL {
        line(
            &mut out,
            &format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                category,
                category.range_label(),
                result.size_counts.get(category)
            ),
        );
    }
    line(&mut out, "</table>");

    line(&mut out, "<h2>Calibration</h2>");
    match &result.calibration_info {
        Some(cal) => {
            line(
                &mut out,
                &format!("<p>Scale: {:.4} µm/pixel</p>", cal.microns_per_pixel),
            );
            if let Some(fov) = &cal.field_of_view {
                line(
                    &mut out,
                    &format!(
                        "<p>Field of view: {:.1} × {:.1} µm</p>",
                        fov.width_um, fov.height_um
                    ),
                );
            }
        }
        None => line(&mut out, "<p>Not calibrated</p>"),
    }

    line(&mut out, "<h2>Detections</h2>");
    out.push_str("<table><tr>");
    for column in COLUMNS {
        out.push_str(&format!("<th>{}</th>", escape(column)));
    }
    line(&mut out, "</tr>");
    for (index, detection) in result.detections.iter().enumerate() {
        out.push_str("<tr>");
        for cell in DetectionRow::from_detection(index, detection).cells() {
            out.push_str(&format!("<td>{}</td>", escape(&cell)));
        }
        line(&mut out, "</tr>");
    }
    line(&mut out, "</table>");
    line(&mut out, "</body></html>");
    out
}

fn line(out: &mut String, text: &str) {
    out.push_str(text);
    out.push('\n');
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::normalize_response;
    use serde_json::json;

    #[test]
    fn includes_totals_calibration_and_rows() {
        let result = normalize_response(&json!({
            "count": 1,
            "detections": [{
                "confidence": 0.9,
                "bbox": [1, 2, 3, 4],
                "label": "<script>",
                "size_category": "large"
            }],
            "size_counts": { "nanoplastic": 0, "small": 0, "medium": 0, "large": 1 },
            "calibration_info": {
                "microns_per_pixel": 1.25,
                "field_of_view": { "width_um": 5000, "height_um": 3750 }
            }
        }));
        let html = html_report(&result, "data:image/png;base64,AAAA", "scan.png");
        assert!(html.contains("<title>Particle report: scan.png</title>"));
        assert!(html.contains("<tr><td>large</td><td>1000-5000 µm</td><td>1</td></tr>"));
        assert!(html.contains("Scale: 1.2500 µm/pixel"));
        assert!(html.contains("Field of view: 5000.0 × 3750.0 µm"));
        assert!(html.contains("<td>&lt;script&gt;</td>"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("src=\"data:image/png;base64,AAAA\""));
    }

    #[test]
    fn uncalibrated_result_says_so() {
        let result = normalize_response(&json!({ "count": 0 }));
        let html = html_report(&result, "", "empty.jpg");
        assert!(html.contains("Not calibrated"));
        assert!(html.contains("Total detections: 0"));
    }

    #[test]
    fn document_is_complete_and_lists_every_column() {
        let result = normalize_response(&json!({
            "count": 2,
            "detections": [
                { "confidence": 0.5, "bbox": [0.1, 0.1, 0.1, 0.1] },
                { "confidence": 0.6, "bbox": [0.2, 0.2, 0.1, 0.1] }
            ]
        }));
        let html = html_report(&result, "", "pair.png");
        assert!(html.starts_with("<!DOCTYPE html>\n"));
        assert!(html.ends_with("</body></html>\n"));
        for column in COLUMNS {
            assert!(html.contains(&format!("<th>{}</th>", escape(column))));
        }
        assert_eq!(html.matches("<tr><td>").count(), 4 + 2);
    }
}
