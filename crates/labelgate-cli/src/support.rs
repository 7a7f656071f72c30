//! Shared helpers for CLI commands.

use serde_json::Value;

pub fn load_json_or_exit(path: &str, what: &str) -> Value {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            eprintln!("error: failed to read {what} file {path}: {error}");
            std::process::exit(1);
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(error) => {
            eprintln!("error: failed to parse {what} file {path} as JSON: {error}");
            std::process::exit(1);
        }
    }
}

pub fn print_json(value: &Value, pretty: bool) {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };

    match rendered {
        Ok(text) => println!("{text}"),
        Err(error) => {
            eprintln!("error: failed to serialize output: {error}");
            std::process::exit(1);
        }
    }
}
