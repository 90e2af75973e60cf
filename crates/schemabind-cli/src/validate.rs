//! # Validate Subcommand
//!
//! Streams one or more JSON documents through [`Decoder::validate_reader`]
//! against a single schema and reports, per document, either success or the
//! first violation with its path.
//!
//! ## Usage
//!
//! ```bash
//! # Validate two files against a YAML schema:
//! schemabind validate --schema reading.schema.yaml a.json b.json
//!
//! # Validate stdin, machine-readable output:
//! cat a.json | schemabind validate --schema reading.schema.json --format json
//! ```

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use serde::Serialize;

use schemabind::{
    DecodeError, DecodeOptions, Decoder, ErrorKind, SchemaDocument, SchemaFragment,
    DEFAULT_MAX_DEPTH,
};

/// Name used in reports for a document read from stdin.
const STDIN_NAME: &str = "-";

/// Report rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per document.
    Text,
    /// A single JSON report.
    Json,
}

/// Arguments for the validate subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Schema document (`.json`, `.yaml` or `.yml`).
    #[arg(long, short)]
    pub schema: PathBuf,

    /// Documents to validate. Reads stdin when none is given or for `-`.
    pub documents: Vec<PathBuf>,

    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Accept data after the root value of each document.
    #[arg(long)]
    pub allow_trailing_data: bool,

    /// Maximum container nesting depth.
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,
}

impl ValidateArgs {
    fn options(&self) -> DecodeOptions {
        DecodeOptions {
            max_depth: self.max_depth,
            allow_trailing_data: self.allow_trailing_data,
        }
    }
}

/// Outcome for one document.
#[derive(Debug, Serialize, PartialEq)]
pub struct DocumentReport {
    /// File path, or `-` for stdin.
    pub source: String,
    /// Whether the document passed.
    pub valid: bool,
    /// The failure, when `valid` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

/// A [`DecodeError`] flattened for reporting.
#[derive(Debug, Serialize, PartialEq)]
pub struct ErrorReport {
    /// Snake-case error category.
    pub kind: &'static str,
    /// JSON Pointer to the offending value, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
    /// Human-readable message.
    pub message: String,
}

impl From<&DecodeError> for ErrorReport {
    fn from(err: &DecodeError) -> Self {
        Self {
            kind: kind_name(err.kind()),
            pointer: err.path().map(|p| p.to_json_pointer()),
            message: err.to_string(),
        }
    }
}

/// Full report for one invocation.
#[derive(Debug, Serialize)]
pub struct ValidationReport {
    /// Schema file the documents were checked against.
    pub schema: String,
    /// Per-document outcomes, in argument order.
    pub documents: Vec<DocumentReport>,
    /// Number of documents that failed.
    pub failed: usize,
}

fn kind_name(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::InvalidDestination => "invalid_destination",
        ErrorKind::Stream => "stream",
        ErrorKind::StructuralMismatch => "structural_mismatch",
        ErrorKind::UnknownProperty => "unknown_property",
        ErrorKind::ConstraintViolation => "constraint_violation",
        ErrorKind::MalformedKey => "malformed_key",
        ErrorKind::DepthLimitExceeded => "depth_limit_exceeded",
    }
}

/// Validates one document read from `source`.
pub fn validate_source<R: Read>(
    decoder: &Decoder,
    schema: SchemaFragment<'_>,
    name: &str,
    source: R,
) -> DocumentReport {
    match decoder.validate_reader(source, schema) {
        Ok(()) => {
            tracing::debug!(source = name, "document valid");
            DocumentReport {
                source: name.to_string(),
                valid: true,
                error: None,
            }
        }
        Err(err) => {
            tracing::info!(source = name, error = %err, "document invalid");
            DocumentReport {
                source: name.to_string(),
                valid: false,
                error: Some(ErrorReport::from(&err)),
            }
        }
    }
}

/// Renders `report` in the requested format.
pub fn render(report: &ValidationReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(report).context("failed to serialize report")
        }
        OutputFormat::Text => {
            let lines: Vec<String> = report
                .documents
                .iter()
                .map(|doc| match &doc.error {
                    None => format!("{}: ok", doc.source),
                    Some(err) => format!("{}: {}", doc.source, err.message),
                })
                .collect();
            Ok(lines.join("\n"))
        }
    }
}

/// Execute the validate subcommand. Returns the process exit code.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let document = SchemaDocument::from_path(&args.schema)
        .with_context(|| format!("failed to load schema {}", args.schema.display()))?;
    let decoder = Decoder::new().with_options(args.options());
    tracing::debug!(schema = %args.schema.display(), options = ?decoder.options(), "schema loaded");

    let mut documents = Vec::new();
    if args.documents.is_empty() {
        let stdin = std::io::stdin().lock();
        documents.push(validate_source(&decoder, document.root(), STDIN_NAME, stdin));
    }
    for path in &args.documents {
        let name = path.display().to_string();
        if name == STDIN_NAME {
            let stdin = std::io::stdin().lock();
            documents.push(validate_source(&decoder, document.root(), STDIN_NAME, stdin));
            continue;
        }
        let file =
            File::open(path).with_context(|| format!("failed to open document {name}"))?;
        documents.push(validate_source(
            &decoder,
            document.root(),
            &name,
            BufReader::new(file),
        ));
    }

    let failed = documents.iter().filter(|doc| !doc.valid).count();
    let report = ValidationReport {
        schema: args.schema.display().to_string(),
        documents,
        failed,
    };
    println!("{}", render(&report, args.format)?);
    Ok(if failed == 0 { 0 } else { 1 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "count": {"type": "integer", "maximum": 10}
            }
        })
    }

    #[test]
    fn test_valid_document_report() {
        let schema = schema();
        let report = validate_source(
            &Decoder::new(),
            SchemaFragment::root(&schema),
            "doc.json",
            r#"{"name": "a", "count": 3}"#.as_bytes(),
        );
        assert!(report.valid);
        assert!(report.error.is_none());
    }

    #[test]
    fn test_invalid_document_report_carries_pointer() {
        let schema = schema();
        let report = validate_source(
            &Decoder::new(),
            SchemaFragment::root(&schema),
            "doc.json",
            r#"{"count": 11}"#.as_bytes(),
        );
        assert!(!report.valid);
        let error = report.error.unwrap();
        assert_eq!(error.kind, "constraint_violation");
        assert_eq!(error.pointer.as_deref(), Some("/count"));
    }

    #[test]
    fn test_unknown_property_report() {
        let schema = schema();
        let report = validate_source(
            &Decoder::new(),
            SchemaFragment::root(&schema),
            "-",
            r#"{"other": true}"#.as_bytes(),
        );
        assert_eq!(report.error.unwrap().kind, "unknown_property");
    }

    #[test]
    fn test_render_text() {
        let report = ValidationReport {
            schema: "s.json".to_string(),
            documents: vec![
                DocumentReport {
                    source: "a.json".to_string(),
                    valid: true,
                    error: None,
                },
                DocumentReport {
                    source: "b.json".to_string(),
                    valid: false,
                    error: Some(ErrorReport {
                        kind: "stream",
                        pointer: Some(String::new()),
                        message: "stream error at (root): unexpected end of token stream"
                            .to_string(),
                    }),
                },
            ],
            failed: 1,
        };
        let text = render(&report, OutputFormat::Text).unwrap();
        assert_eq!(
            text,
            "a.json: ok\nb.json: stream error at (root): unexpected end of token stream"
        );
    }

    #[test]
    fn test_render_json_omits_empty_error() {
        let report = ValidationReport {
            schema: "s.json".to_string(),
            documents: vec![DocumentReport {
                source: "a.json".to_string(),
                valid: true,
                error: None,
            }],
            failed: 0,
        };
        let rendered: serde_json::Value =
            serde_json::from_str(&render(&report, OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(
            rendered,
            json!({
                "schema": "s.json",
                "documents": [{"source": "a.json", "valid": true}],
                "failed": 0
            })
        );
    }
}
