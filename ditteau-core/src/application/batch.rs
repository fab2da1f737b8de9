// ditteau-core/src/application/batch.rs

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::domain::error::EvaluationError;
use crate::domain::governance::{
    AccessDecision, EvaluationContext, Evaluator, PolicySnapshot, UnknownRoleWarning,
};
use crate::infrastructure::rows::RowInput;
use crate::ports::Clock;

/// Picks the evaluation date: explicit request, then the snapshot's pinned
/// reference date, then the clock.
pub fn resolve_as_of(
    snapshot: &PolicySnapshot,
    clock: &dyn Clock,
    requested: Option<NaiveDate>,
) -> NaiveDate {
    requested
        .or_else(|| snapshot.reference_date())
        .unwrap_or_else(|| clock.today())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub visible: usize,
    pub hidden: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub dataset: String,
    pub role: String,
    pub as_of: String,
    pub summary: BatchSummary,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<UnknownRoleWarning>,
    pub decisions: Vec<AccessDecision>,
}

impl BatchReport {
    pub fn visible_rows(&self) -> impl Iterator<Item = &AccessDecision> {
        self.decisions.iter().filter(|d| d.visible)
    }
}

/// Evaluates every row independently. A malformed row is hidden and reported;
/// it never aborts the batch.
#[instrument(skip(snapshot, ctx, rows), fields(role = ctx.role(), rows = rows.len()))]
pub fn evaluate_batch(
    snapshot: &PolicySnapshot,
    ctx: &EvaluationContext,
    dataset: &str,
    rows: &[RowInput],
) -> BatchReport {
    let evaluator = Evaluator::new(snapshot);

    let warnings: Vec<UnknownRoleWarning> = evaluator.check_role(ctx).into_iter().collect();
    for w in &warnings {
        warn!(role = %w.role, "Acting role is not registered; every row will be hidden");
    }

    let binding = snapshot.binding(dataset);
    if binding.is_none() {
        error!(dataset, "Dataset has no policy binding; hiding all rows");
    }

    let mut summary = BatchSummary::default();
    let decisions: Vec<AccessDecision> = rows
        .iter()
        .enumerate()
        .map(|(index, input)| {
            let outcome = binding
                .ok_or_else(|| EvaluationError::UnknownDataset {
                    dataset: dataset.to_string(),
                })
                .and_then(|b| {
                    let json = input.as_ref().map_err(Clone::clone)?;
                    let row = b.decode_row(json)?;
                    evaluator.evaluate_row(b, ctx, &row)
                });

            let mut decision = match outcome {
                Ok(d) => AccessDecision::from(d),
                Err(e) => {
                    if binding.is_some() {
                        error!(dataset, index, error = %e, "Malformed row; hiding it");
                    }
                    AccessDecision::denied(e, Vec::new())
                }
            };
            decision.warnings.clear();

            summary.total += 1;
            if decision.error.is_some() {
                summary.errors += 1;
            }
            if decision.visible {
                summary.visible += 1;
            } else {
                summary.hidden += 1;
            }
            decision
        })
        .collect();

    info!(
        dataset,
        visible = summary.visible,
        hidden = summary.hidden,
        errors = summary.errors,
        "Batch evaluated"
    );

    BatchReport {
        dataset: dataset.to_string(),
        role: ctx.role().to_string(),
        as_of: ctx.as_of().format("%Y-%m-%d").to_string(),
        summary,
        warnings,
        decisions,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::governance::{
        AttributeType, ColumnBinding, Condition, MaskingRule, MaskingStrategy, PolicyBinding,
        RoleRegistry, RolePredicate, RowAccessRule, Value,
    };
    use crate::infrastructure::rows::parse_rows;
    use crate::ports::FixedClock;
    use anyhow::Result;

    fn snapshot(reference: Option<NaiveDate>) -> Result<PolicySnapshot> {
        let roles = RoleRegistry::builder()
            .role("ANALYST_BASE_ROLE", Vec::<String>::new())
            .role("REGISTRAR_ANALYST_ROLE", ["ANALYST_BASE_ROLE"])
            .build()?;
        let mut builder = PolicySnapshot::builder("ditteau", roles).reference_date(reference);

        let status = builder.add_row_access_policy(
            RowAccessRule::new("enrollment_status_access", AttributeType::String).with_case(
                RolePredicate::any_of(["REGISTRAR_ANALYST_ROLE"]),
                Condition::In(vec![Value::from("ENROLLED"), Value::from("WITHDRAWN")]),
            )?,
        )?;
        let ssn = builder.add_masking_policy(MaskingRule::new(
            "ssn_mask",
            AttributeType::String,
            MaskingStrategy::last_four(),
        )?)?;
        builder.add_binding(
            PolicyBinding::new("student_enrollment")
                .with_column(ColumnBinding::new("enrollment_status", AttributeType::String))?
                .with_column(ColumnBinding::new("ssn", AttributeType::String).masked_by(ssn))?
                .with_row_filter(status, "enrollment_status")?,
        )?;
        Ok(builder.build())
    }

    fn ctx(role: &str) -> EvaluationContext {
        EvaluationContext::new(role, NaiveDate::from_ymd_opt(2025, 2, 1).unwrap())
    }

    const ROWS: &str = r#"[
        {"enrollment_status": "ENROLLED", "ssn": "123-45-6789"},
        {"enrollment_status": "DROPPED", "ssn": "987-65-4321"},
        {"enrollment_status": 42, "ssn": "111-22-3333"},
        {"ssn": "444-55-6666"}
    ]"#;

    #[test]
    fn test_malformed_rows_are_hidden_not_fatal() -> Result<()> {
        let snap = snapshot(None)?;
        let report = evaluate_batch(&snap, &ctx("REGISTRAR_ANALYST_ROLE"), "student_enrollment", &parse_rows(ROWS)?);

        assert_eq!(
            report.summary,
            BatchSummary {
                total: 4,
                visible: 1,
                hidden: 3,
                errors: 2,
            }
        );
        let first = report.visible_rows().next().unwrap();
        assert_eq!(
            first.row.as_ref().unwrap()["ssn"],
            Value::from("XXX-XX-6789")
        );
        assert!(matches!(
            report.decisions[2].error,
            Some(EvaluationError::TypeMismatch { .. })
        ));
        assert!(matches!(
            report.decisions[3].error,
            Some(EvaluationError::MissingAttribute { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_unparseable_rows_are_hidden_in_place() -> Result<()> {
        let snap = snapshot(None)?;
        let rows = parse_rows(
            r#"[
                {"enrollment_status": "ENROLLED", "ssn": "123-45-6789"},
                "ENROLLED",
                {"enrollment_status": "WITHDRAWN", "ssn": "987-65-4321"}
            ]"#,
        )?;
        let report = evaluate_batch(&snap, &ctx("REGISTRAR_ANALYST_ROLE"), "student_enrollment", &rows);

        assert_eq!(
            report.summary,
            BatchSummary {
                total: 3,
                visible: 2,
                hidden: 1,
                errors: 1,
            }
        );
        assert!(matches!(
            report.decisions[1].error,
            Some(EvaluationError::MalformedRow { index: 1, .. })
        ));
        assert!(report.decisions[2].visible);
        Ok(())
    }

    #[test]
    fn test_unknown_role_warned_once_and_denied() -> Result<()> {
        let snap = snapshot(None)?;
        let report = evaluate_batch(&snap, &ctx("GUEST"), "student_enrollment", &parse_rows(ROWS)?);

        assert_eq!(report.warnings.len(), 1);
        assert!(report.decisions.iter().all(|d| d.warnings.is_empty()));
        assert_eq!(report.summary.visible, 0);
        Ok(())
    }

    #[test]
    fn test_unknown_dataset_hides_everything() -> Result<()> {
        let snap = snapshot(None)?;
        let report = evaluate_batch(&snap, &ctx("REGISTRAR_ANALYST_ROLE"), "payroll", &parse_rows(ROWS)?);

        assert_eq!(report.summary.errors, 4);
        assert!(report.decisions.iter().all(|d| matches!(
            &d.error,
            Some(EvaluationError::UnknownDataset { dataset }) if dataset == "payroll"
        )));
        Ok(())
    }

    #[test]
    fn test_as_of_resolution_order() -> Result<()> {
        let pinned = NaiveDate::from_ymd_opt(2024, 9, 1);
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let requested = NaiveDate::from_ymd_opt(2023, 5, 5);
        let clock = FixedClock(today);

        assert_eq!(resolve_as_of(&snapshot(pinned)?, &clock, requested), requested.unwrap());
        assert_eq!(resolve_as_of(&snapshot(pinned)?, &clock, None), pinned.unwrap());
        assert_eq!(resolve_as_of(&snapshot(None)?, &clock, None), today);
        Ok(())
    }
}
