// ditteau-core/src/application/mod.rs

pub mod audit;
pub mod batch;
pub mod catalog;
pub mod store;

// --- RE-EXPORTS (FACADE PATTERN) ---
// `use ditteau_core::application::{evaluate_batch, PolicyStore};`

pub use audit::{AuditReport, Finding, PiiScanner, Severity, audit_coverage};
pub use batch::{BatchReport, BatchSummary, evaluate_batch, resolve_as_of};
pub use catalog::{PolicyCatalog, PolicyReference, ReferenceKind, RoleEntry};
pub use store::PolicyStore;
