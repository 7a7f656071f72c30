use serde_json::json;

use labelgate_ocr::normalize_ocr_payload;

use crate::support::{load_json_or_exit, print_json};

pub fn run(ocr_path: String, pretty: bool) {
    let ocr_json = load_json_or_exit(&ocr_path, "OCR response");
    let normalized = normalize_ocr_payload(&ocr_json);

    let output = json!({
        "lines": normalized.lines,
        "tokens": normalized.tokens,
        "coordinateSpace": normalized.coordinate_space,
        "diagnostics": normalized.diagnostics,
    });
    print_json(&output, pretty);
}
