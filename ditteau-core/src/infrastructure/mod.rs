// ditteau-core/src/infrastructure/mod.rs

pub mod config;
pub mod error;
pub mod fs;
pub mod rows;
