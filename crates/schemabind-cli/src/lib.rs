//! # schemabind-cli — Command-Line Front End
//!
//! Validates JSON documents against a JSON Schema with the streaming
//! engine from the `schemabind` crate, without binding them anywhere.
//!
//! ## Subcommands
//!
//! - `validate` — check documents from files or stdin against one schema
//!
//! ## Crate Policy
//!
//! - Argument parsing lives in `main.rs`; handlers live in their own modules.
//! - Handlers return the process exit code; errors that prevent a run (an
//!   unreadable schema, a missing file) are reported through `anyhow`.

pub mod validate;
