//! # schemabind CLI Entry Point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use schemabind_cli::validate::{run_validate, ValidateArgs};

/// Streaming JSON Schema validation.
///
/// Reads each document once, token by token, and stops at the first value
/// that violates the schema.
#[derive(Parser, Debug)]
#[command(name = "schemabind", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate JSON documents against a schema.
    Validate(ValidateArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v when set.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Validate(args) => run_validate(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemabind_cli::validate::OutputFormat;
    use std::path::PathBuf;

    #[test]
    fn cli_parse_validate_stdin() {
        let cli = Cli::try_parse_from(["schemabind", "validate", "--schema", "s.json"]).unwrap();
        let Commands::Validate(args) = cli.command;
        assert_eq!(args.schema, PathBuf::from("s.json"));
        assert!(args.documents.is_empty());
        assert_eq!(args.format, OutputFormat::Text);
        assert!(!args.allow_trailing_data);
        assert_eq!(args.max_depth, schemabind::DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn cli_parse_validate_documents_and_flags() {
        let cli = Cli::try_parse_from([
            "schemabind",
            "-vv",
            "validate",
            "-s",
            "s.yaml",
            "a.json",
            "b.json",
            "--format",
            "json",
            "--allow-trailing-data",
            "--max-depth",
            "16",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Validate(args) = cli.command;
        assert_eq!(
            args.documents,
            vec![PathBuf::from("a.json"), PathBuf::from("b.json")]
        );
        assert_eq!(args.format, OutputFormat::Json);
        assert!(args.allow_trailing_data);
        assert_eq!(args.max_depth, 16);
    }

    #[test]
    fn cli_parse_validate_requires_schema() {
        assert!(Cli::try_parse_from(["schemabind", "validate", "a.json"]).is_err());
    }

    #[test]
    fn cli_parse_rejects_unknown_format() {
        assert!(Cli::try_parse_from([
            "schemabind",
            "validate",
            "--schema",
            "s.json",
            "--format",
            "xml"
        ])
        .is_err());
    }
}
