// ditteau-core/src/error.rs

use crate::domain::error::{ConfigError, EvaluationError};
use crate::infrastructure::error::InfrastructureError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DitteauError {
    // --- INVALID ROLES / POLICIES / BINDINGS ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    // --- MALFORMED ROWS ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Evaluation(#[from] EvaluationError),

    // --- IO, PARSING ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Infrastructure(#[from] InfrastructureError),

    #[error("Policy store has no source directory to reload from")]
    #[diagnostic(code(ditteau::store::no_source))]
    NoReloadSource,
}

impl From<std::io::Error> for DitteauError {
    fn from(err: std::io::Error) -> Self {
        DitteauError::Infrastructure(InfrastructureError::Io(err))
    }
}
