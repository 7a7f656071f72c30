use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "labelgate",
    about = "Labelgate: deterministic label-field verification over application + OCR JSON",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Verify one label/application pair and emit the field verdicts
    Verify {
        /// Path to the application JSON (legacy test form or structured record)
        #[arg(long)]
        application: String,

        /// Path to the raw OCR provider response JSON
        #[arg(long)]
        ocr: String,

        /// Pretty-print the JSON report
        #[arg(long)]
        pretty: bool,
    },

    /// Normalize a raw OCR payload into canonical lines/tokens/diagnostics
    NormalizeOcr {
        /// Path to the raw OCR provider response JSON
        #[arg(long)]
        ocr: String,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Resolve the per-field requirement profiles for an application
    Requirements {
        /// Path to the application JSON (legacy test form or structured record)
        #[arg(long)]
        application: String,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_verify_invocation() {
        let cli = Cli::try_parse_from([
            "labelgate",
            "verify",
            "--application",
            "form.json",
            "--ocr",
            "ocr.json",
            "--pretty",
        ])
        .unwrap();
        match cli.command {
            Commands::Verify {
                application,
                ocr,
                pretty,
            } => {
                assert_eq!(application, "form.json");
                assert_eq!(ocr, "ocr.json");
                assert!(pretty);
            }
            _ => panic!("expected verify subcommand"),
        }
    }

    #[test]
    fn rejects_missing_required_arguments() {
        assert!(Cli::try_parse_from(["labelgate", "verify", "--ocr", "ocr.json"]).is_err());
    }
}
