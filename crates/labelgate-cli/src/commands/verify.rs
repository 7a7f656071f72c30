use chrono::Utc;
use serde_json::json;

use labelgate_ocr::normalize_ocr_payload;
use labelgate_policy::parse_application_json;
use labelgate_verify::verify_label;

use crate::support::{load_json_or_exit, print_json};

pub fn run(application_path: String, ocr_path: String, pretty: bool) {
    let application_json = load_json_or_exit(&application_path, "application");
    let ocr_json = load_json_or_exit(&ocr_path, "OCR response");

    let application = match parse_application_json(&application_json) {
        Ok(application) => application,
        Err(error) => {
            eprintln!("error: {error}");
            std::process::exit(1);
        }
    };

    let started_at = Utc::now();
    let normalized = normalize_ocr_payload(&ocr_json);
    let fields = match verify_label(&application, &normalized.lines, &normalized.tokens) {
        Ok(fields) => fields,
        Err(error) => {
            eprintln!("error: {error}");
            std::process::exit(1);
        }
    };
    let ended_at = Utc::now();

    let report = json!({
        "applicationId": application.application_id,
        "alcoholClass": application.alcohol_class,
        "fields": fields,
        "ocrLines": normalized.lines,
        "ocrDiagnostics": normalized.diagnostics,
        "coordinateSpace": normalized.coordinate_space,
        "startedAt": started_at.to_rfc3339(),
        "endedAt": ended_at.to_rfc3339(),
        "durationMs": (ended_at - started_at).num_milliseconds(),
    });
    print_json(&report, pretty);
}
