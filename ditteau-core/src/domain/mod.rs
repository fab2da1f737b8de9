// ditteau-core/src/domain/mod.rs

pub mod error;
pub mod governance;
pub mod graph;

// Re-exports
pub use error::{ConfigError, EvaluationError};
