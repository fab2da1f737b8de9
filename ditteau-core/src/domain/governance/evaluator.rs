// ditteau-core/src/domain/governance/evaluator.rs

//! Policy evaluation.
//!
//! Row filters run first and combine with AND; each filter holds when any of
//! its `(role, condition)` pairs holds. Masks run only on visible rows, one
//! column at a time, first matching case wins. Evaluation is a pure function
//! of the snapshot, the context and the row.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use tracing::{debug, error, warn};

use super::binding::PolicyBinding;
use super::policy::MaskingRule;
use super::roles::RoleRegistry;
use super::snapshot::PolicySnapshot;
use super::value::{AttributeRow, Value};
use crate::domain::error::EvaluationError;

/// Per-request inputs: who is asking, and the date the request is evaluated at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationContext {
    role: String,
    as_of: NaiveDate,
}

impl EvaluationContext {
    pub fn new(role: &str, as_of: NaiveDate) -> Self {
        Self {
            role: role.to_string(),
            as_of,
        }
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }
}

/// The acting role is absent from the registry. Evaluation proceeds with no
/// memberships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnknownRoleWarning {
    pub role: String,
}

impl fmt::Display for UnknownRoleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "role '{}' is not registered; treated as having no memberships", self.role)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum TraceEntry {
    RowFilter {
        policy: String,
        column: String,
        matched_case: Option<usize>,
    },
    Mask {
        column: String,
        policy: String,
        matched_case: Option<usize>,
        strategy: String,
    },
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RowFilter {
                policy,
                column,
                matched_case,
            } => match matched_case {
                Some(i) => write!(f, "filter {} on {}: case#{}", policy, column, i),
                None => write!(f, "filter {} on {}: no match", policy, column),
            },
            Self::Mask {
                column,
                policy,
                matched_case,
                strategy,
            } => match matched_case {
                Some(i) => write!(f, "mask {} via {}: case#{} -> {}", column, policy, i, strategy),
                None => write!(f, "mask {} via {}: default -> {}", column, policy, strategy),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaskOutcome {
    pub matched_case: Option<usize>,
    pub strategy: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Visibility {
    pub visible: bool,
    pub trace: Vec<TraceEntry>,
}

/// The outcome for one row. `row` is `None` whenever `visible` is false.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowDecision {
    pub dataset: String,
    pub visible: bool,
    pub row: Option<AttributeRow>,
    pub trace: Vec<TraceEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<UnknownRoleWarning>,
}

impl RowDecision {
    /// One-line rendering of the decision trace.
    pub fn trace_summary(&self) -> String {
        format!("{}: {}", self.dataset, render_trace(self.visible, &self.trace))
    }
}

fn render_trace(visible: bool, trace: &[TraceEntry]) -> String {
    let verdict = if visible { "visible" } else { "hidden" };
    if trace.is_empty() {
        return verdict.to_string();
    }
    let steps: Vec<String> = trace.iter().map(ToString::to_string).collect();
    format!("{} [{}]", verdict, steps.join("; "))
}

/// Fail-closed decision: evaluation errors become a hidden row carrying the error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessDecision {
    pub visible: bool,
    pub row: Option<AttributeRow>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<TraceEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<UnknownRoleWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<EvaluationError>,
}

impl AccessDecision {
    /// Same rendering as [`RowDecision::trace_summary`]; an error replaces the trace.
    pub fn trace_summary(&self) -> String {
        match &self.error {
            Some(e) => format!("hidden ({})", e),
            None => render_trace(self.visible, &self.trace),
        }
    }

    pub fn denied(error: EvaluationError, warnings: Vec<UnknownRoleWarning>) -> Self {
        Self {
            visible: false,
            row: None,
            trace: Vec::new(),
            warnings,
            error: Some(error),
        }
    }
}

impl From<RowDecision> for AccessDecision {
    fn from(d: RowDecision) -> Self {
        Self {
            visible: d.visible,
            row: d.row,
            trace: d.trace,
            warnings: d.warnings,
            error: None,
        }
    }
}

pub struct Evaluator<'s> {
    snapshot: &'s PolicySnapshot,
}

impl<'s> Evaluator<'s> {
    pub fn new(snapshot: &'s PolicySnapshot) -> Self {
        Self { snapshot }
    }

    fn registry(&self) -> &RoleRegistry {
        self.snapshot.roles()
    }

    /// Returns the warning for an unregistered acting role, if any.
    pub fn check_role(&self, ctx: &EvaluationContext) -> Option<UnknownRoleWarning> {
        if self.registry().contains(ctx.role()) {
            return None;
        }
        Some(UnknownRoleWarning {
            role: ctx.role().to_string(),
        })
    }

    /// Applies exactly one transform of `rule` to `value`: the first case whose
    /// role predicate matches, otherwise the default.
    pub fn evaluate_mask(
        &self,
        rule: &MaskingRule,
        ctx: &EvaluationContext,
        value: &Value,
    ) -> MaskOutcome {
        let (matched_case, strategy) = rule.select(self.registry(), ctx.role());
        MaskOutcome {
            matched_case,
            strategy: strategy.to_string(),
            value: strategy.apply(value),
        }
    }

    /// AND across the binding's row filters, OR across each filter's cases.
    /// Stops at the first filter that denies.
    pub fn evaluate_visibility(
        &self,
        binding: &PolicyBinding,
        ctx: &EvaluationContext,
        row: &AttributeRow,
    ) -> Result<Visibility, EvaluationError> {
        let mut trace = Vec::with_capacity(binding.row_filters().len());

        for filter in binding.row_filters() {
            let value = row
                .get(&filter.column)
                .ok_or_else(|| EvaluationError::MissingAttribute {
                    dataset: binding.dataset().to_string(),
                    column: filter.column.clone(),
                })?;
            value.expect_type(&filter.column, filter.rule.attribute_type())?;

            let matched_case = filter.rule.cases().iter().position(|case| {
                case.predicate.matches(self.registry(), ctx.role())
                    && case.condition.holds(value, ctx.as_of())
            });

            trace.push(TraceEntry::RowFilter {
                policy: filter.rule.name().to_string(),
                column: filter.column.clone(),
                matched_case,
            });

            if matched_case.is_none() {
                return Ok(Visibility {
                    visible: false,
                    trace,
                });
            }
        }

        Ok(Visibility {
            visible: true,
            trace,
        })
    }

    /// Row visibility, then column masking. Hidden rows are never projected.
    pub fn evaluate_row(
        &self,
        binding: &PolicyBinding,
        ctx: &EvaluationContext,
        row: &AttributeRow,
    ) -> Result<RowDecision, EvaluationError> {
        let warnings: Vec<UnknownRoleWarning> = self.check_role(ctx).into_iter().collect();
        let Visibility { visible, mut trace } = self.evaluate_visibility(binding, ctx, row)?;

        if !visible {
            return Ok(RowDecision {
                dataset: binding.dataset().to_string(),
                visible,
                row: None,
                trace,
                warnings,
            });
        }

        let mut projected = row.clone();
        for (column, rule) in binding.masked_columns() {
            let value = row
                .get(&column.name)
                .ok_or_else(|| EvaluationError::MissingAttribute {
                    dataset: binding.dataset().to_string(),
                    column: column.name.clone(),
                })?;
            value.expect_type(&column.name, rule.attribute_type())?;

            let outcome = self.evaluate_mask(rule, ctx, value);
            trace.push(TraceEntry::Mask {
                column: column.name.clone(),
                policy: rule.name().to_string(),
                matched_case: outcome.matched_case,
                strategy: outcome.strategy,
            });
            projected.insert(column.name.clone(), outcome.value);
        }

        let decision = RowDecision {
            dataset: binding.dataset().to_string(),
            visible,
            row: Some(projected),
            trace,
            warnings,
        };
        debug!(trace = %decision.trace_summary(), "Row evaluated");
        Ok(decision)
    }

    /// Looks up the dataset's binding and evaluates the row against it.
    pub fn evaluate(
        &self,
        ctx: &EvaluationContext,
        dataset: &str,
        row: &AttributeRow,
    ) -> Result<RowDecision, EvaluationError> {
        let binding = self
            .snapshot
            .binding(dataset)
            .ok_or_else(|| EvaluationError::UnknownDataset {
                dataset: dataset.to_string(),
            })?;
        self.evaluate_row(binding, ctx, row)
    }

    /// Fail-closed wrapper around [`Evaluator::evaluate`]: any evaluation error
    /// yields a hidden row and is logged.
    pub fn decide(&self, ctx: &EvaluationContext, dataset: &str, row: &AttributeRow) -> AccessDecision {
        if let Some(w) = self.check_role(ctx) {
            warn!(role = %w.role, "Acting role is not registered; denying by default");
        }
        match self.evaluate(ctx, dataset, row) {
            Ok(decision) => decision.into(),
            Err(e) => {
                error!(dataset, role = ctx.role(), error = %e, "Row evaluation failed; hiding row");
                let warnings = self.check_role(ctx).into_iter().collect();
                AccessDecision::denied(e, warnings)
            }
        }
    }
}
