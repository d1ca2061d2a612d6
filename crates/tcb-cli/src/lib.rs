//! TCB command-line interface
//!
//! Provides commands for:
//! - `validate`: check an edit payload
//! - `extract`: project a full configuration onto its editable part
//! - `merge`: merge an edit payload onto a base configuration
//! - `diff`: compare two configurations
//! - `deps`: list entities referencing an entity
//! - `deploy`: merge an edit payload into a filesystem store

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::{read_document, run};
