use crate::detect::DetectionResult;

use super::{DetectionRow, COLUMNS};

/// Render detections as CSV, one row per detection.
pub fn csv_report(result: &DetectionResult) -> String {
    let mut out = String::new();
    push_row(&mut out, COLUMNS.iter().map(|c| c.to_string()));
    for (index, detection) in result.detections.iter().enumerate() {
        let row = DetectionRow::from_detection(index, detection);
        push_row(&mut out, row.cells().into_iter());
    }
    out
}

fn push_row(out: &mut String, cells: impl Iterator<Item = String>) {
    let line = cells.map(|c| escape(&c)).collect::<Vec<_>>().join(",");
    out.push_str(&line);
    out.push('\n');
}

fn escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
