// ditteau-core/src/domain/error.rs

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

/// Invalid role or policy definitions, detected while a snapshot is built.
/// Always fatal to the configuration load.
#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("Circular role inheritance detected involving: {0}")]
    #[diagnostic(
        code(ditteau::config::role_cycle),
        help("Role inheritance must form a DAG. Check the `inherits` lists.")
    )]
    CyclicRoleHierarchy(String),

    #[error("Unknown role '{role}' referenced by {context}")]
    #[diagnostic(
        code(ditteau::config::unknown_role),
        help("Declare the role under `roles:` before referencing it.")
    )]
    #[allow(unused_assignments)]
    UnknownRole { context: String, role: String },

    #[error("Duplicate {kind} '{name}'")]
    #[diagnostic(code(ditteau::config::duplicate))]
    #[allow(unused_assignments)]
    DuplicateName { kind: &'static str, name: String },

    #[error("Unknown attribute type '{0}'")]
    #[diagnostic(
        code(ditteau::config::attribute_type),
        help("Expected one of: string, integer, float, boolean, date.")
    )]
    UnknownAttributeType(String),

    #[error("Unknown masking strategy '{0}'")]
    #[diagnostic(code(ditteau::config::strategy))]
    UnknownStrategy(String),

    #[error("Masking strategy '{strategy}' in policy '{policy}' is invalid: {reason}")]
    #[diagnostic(code(ditteau::config::strategy))]
    #[allow(unused_assignments)]
    InvalidStrategy {
        policy: String,
        strategy: String,
        reason: String,
    },

    #[error(
        "Masking strategy '{strategy}' in policy '{policy}' cannot transform '{attribute_type}' values"
    )]
    #[diagnostic(code(ditteau::config::transform_type))]
    #[allow(unused_assignments)]
    TransformTypeMismatch {
        policy: String,
        strategy: String,
        attribute_type: String,
    },

    #[error("Unknown condition '{0}'")]
    #[diagnostic(
        code(ditteau::config::condition),
        help(
            "Expected one of: always, is_null, equals, in, not_in, between, matches, academic_year_window, any_of, all_of."
        )
    )]
    UnknownCondition(String),

    #[error("Condition '{condition}' in policy '{policy}' is invalid: {reason}")]
    #[diagnostic(code(ditteau::config::condition))]
    #[allow(unused_assignments)]
    InvalidCondition {
        policy: String,
        condition: String,
        reason: String,
    },

    #[error("Unknown {kind} '{name}' referenced by dataset '{dataset}'")]
    #[diagnostic(code(ditteau::config::unknown_policy))]
    #[allow(unused_assignments)]
    UnknownPolicy {
        kind: &'static str,
        name: String,
        dataset: String,
    },

    #[error("Dataset '{dataset}' has no column '{column}'")]
    #[diagnostic(code(ditteau::config::unknown_column))]
    #[allow(unused_assignments)]
    UnknownColumn { dataset: String, column: String },

    #[error(
        "Policy '{policy}' consumes '{expected}' but column '{dataset}.{column}' is declared as '{found}'"
    )]
    #[diagnostic(code(ditteau::config::binding_type))]
    #[allow(unused_assignments)]
    BindingTypeMismatch {
        dataset: String,
        column: String,
        policy: String,
        expected: String,
        found: String,
    },

    #[error("Dataset '{0}' must bind at least one row access policy or mask at least one column")]
    #[diagnostic(code(ditteau::config::empty_binding))]
    EmptyBinding(String),

    #[error("Unknown tag '{tag}' on column '{column}'")]
    #[diagnostic(code(ditteau::config::unknown_tag))]
    #[allow(unused_assignments)]
    UnknownTag { column: String, tag: String },

    #[error("Tag '{tag}' does not allow value '{value}' (column '{column}')")]
    #[diagnostic(code(ditteau::config::tag_value))]
    #[allow(unused_assignments)]
    TagValueNotAllowed {
        column: String,
        tag: String,
        value: String,
    },

    #[error("Invalid configuration: {0}")]
    #[diagnostic(code(ditteau::config::invalid))]
    Invalid(String),
}

/// A malformed input row. The caller hides the affected row and carries on.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvaluationError {
    #[error("Dataset '{dataset}' has no policy binding")]
    #[diagnostic(code(ditteau::eval::unknown_dataset))]
    #[allow(unused_assignments)]
    UnknownDataset { dataset: String },

    #[error("Row of dataset '{dataset}' is missing attribute '{column}'")]
    #[diagnostic(code(ditteau::eval::missing_attribute))]
    #[allow(unused_assignments)]
    MissingAttribute { dataset: String, column: String },

    #[error("Attribute '{column}' expected '{expected}' but found '{found}'")]
    #[diagnostic(code(ditteau::eval::type_mismatch))]
    #[allow(unused_assignments)]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },

    #[error("Row {index} is malformed: {reason}")]
    #[diagnostic(
        code(ditteau::eval::malformed_row),
        help("Each row must be a JSON object mapping column names to values.")
    )]
    #[allow(unused_assignments)]
    MalformedRow { index: usize, reason: String },
}
