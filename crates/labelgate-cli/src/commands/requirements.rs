use serde_json::json;

use labelgate_kernel::FieldKey;
use labelgate_policy::{field_requirement_profile, parse_application_json};

use crate::support::{load_json_or_exit, print_json};

pub fn run(application_path: String, pretty: bool) {
    let application_json = load_json_or_exit(&application_path, "application");
    let application = match parse_application_json(&application_json) {
        Ok(application) => application,
        Err(error) => {
            eprintln!("error: {error}");
            std::process::exit(1);
        }
    };

    let profiles: Vec<_> = FieldKey::ALL
        .iter()
        .map(|field| {
            let profile = field_requirement_profile(&application, *field);
            json!({
                "field": field,
                "label": field.label(),
                "profile": profile,
            })
        })
        .collect();

    let output = json!({
        "applicationId": application.application_id,
        "alcoholClass": application.alcohol_class,
        "isImport": application.is_import,
        "requirements": profiles,
    });
    print_json(&output, pretty);
}
