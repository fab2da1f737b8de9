// ditteau-core/src/infrastructure/error.rs

use miette::Diagnostic;
use thiserror::Error;

use crate::domain::error::ConfigError;

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    // --- FILESYSTEM (IO) ---
    #[error("File System Error: {0}")]
    #[diagnostic(
        code(ditteau::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    #[error("Failed to read '{path}': {source}")]
    #[diagnostic(code(ditteau::infra::io))]
    #[allow(unused_assignments)]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    // --- CONFIG / YAML ---
    #[error("YAML Parsing Error in '{path}': {source}")]
    #[diagnostic(
        code(ditteau::infra::yaml),
        help("Check your YAML syntax (indentation, types).")
    )]
    #[allow(unused_assignments)]
    YamlError {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("Project configuration not found: {0}")]
    #[diagnostic(
        code(ditteau::infra::config_missing),
        help("Create a ditteau.yaml at the project root.")
    )]
    ConfigNotFound(String),

    #[error("Invalid value '{value}' for {variable}: {reason}")]
    #[diagnostic(code(ditteau::infra::env_override))]
    #[allow(unused_assignments)]
    InvalidOverride {
        variable: String,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    // --- ROWS / JSON ---
    #[error("JSON Error: {0}")]
    #[diagnostic(
        code(ditteau::infra::json),
        help("Rows must be a JSON array of objects, a single object, or JSON Lines.")
    )]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid row input: {0}")]
    #[diagnostic(code(ditteau::infra::rows))]
    InvalidRows(String),
}
