// ditteau-core/src/domain/governance/mod.rs

pub mod binding;
pub mod condition;
pub mod evaluator;
pub mod masking;
pub mod policy;
pub mod roles;
pub mod snapshot;
pub mod tags;
pub mod value;

// Re-exports
pub use binding::{ColumnBinding, PolicyBinding, RowFilter};
pub use condition::{AcademicCalendar, Condition};
pub use evaluator::{
    AccessDecision, EvaluationContext, Evaluator, MaskOutcome, RowDecision, TraceEntry,
    UnknownRoleWarning, Visibility,
};
pub use masking::MaskingStrategy;
pub use policy::{AccessCase, MaskingCase, MaskingRule, RolePredicate, RowAccessRule};
pub use roles::{RoleRegistry, RoleRegistryBuilder};
pub use snapshot::{PolicySnapshot, PolicySnapshotBuilder};
pub use tags::{TagDefinition, TagTaxonomy};
pub use value::{AttributeRow, AttributeType, Value};
