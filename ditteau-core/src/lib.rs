// ditteau-core/src/lib.rs

#![allow(missing_docs)]
// Memory safety
#![deny(unsafe_code)]
// Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// Performance
#![warn(clippy::perf)]

// --- HEXAGONAL MODULES ---

// 1. Ports: contracts at the edges (Clock)
pub mod ports;

// 2. Domain: roles, policies, bindings, evaluation.
// Depends on nothing else in the crate.
pub mod domain;

// 3. Infrastructure: YAML config, JSON rows, atomic writes.
pub mod infrastructure;

// 4. Application: policy store, batch evaluation, catalog, audit.
pub mod application;

// --- GLOBAL ERROR ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
pub use domain::governance::{
    AccessDecision, EvaluationContext, Evaluator, PolicySnapshot, RowDecision,
};
pub use error::DitteauError;
