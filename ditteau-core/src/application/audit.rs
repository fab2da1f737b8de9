// ditteau-core/src/application/audit.rs

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use tracing::info;

use crate::domain::governance::{AttributeType, MaskingStrategy, PolicySnapshot};
use crate::infrastructure::rows::JsonRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Violation,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub message: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let icon = match self.severity {
            Severity::Violation => "❌",
            Severity::Warning => "⚠️ ",
        };
        write!(f, "{} [{}] {}", icon, self.code, self.message)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditReport {
    pub findings: Vec<Finding>,
}

impl AuditReport {
    pub fn violations(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Violation)
    }

    pub fn has_violations(&self) -> bool {
        self.violations().next().is_some()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Warning)
    }
}

/// Checks masking coverage of sensitive columns and flags unbound policies.
pub fn audit_coverage(snapshot: &PolicySnapshot) -> AuditReport {
    let mut findings = Vec::new();
    let mut bound_masks = BTreeSet::new();
    let mut bound_filters = BTreeSet::new();

    for binding in snapshot.bindings() {
        for filter in binding.row_filters() {
            bound_filters.insert(filter.rule.name().to_string());
        }

        for column in binding.columns() {
            let sensitive = snapshot.tags().is_sensitive(&column.tags);
            match &column.mask {
                Some(rule) => {
                    bound_masks.insert(rule.name().to_string());
                    if sensitive && rule.default_strategy() == &MaskingStrategy::Identity {
                        findings.push(Finding {
                            severity: Severity::Warning,
                            code: "permissive_default",
                            dataset: Some(binding.dataset().to_string()),
                            column: Some(column.name.clone()),
                            message: format!(
                                "Sensitive column '{}.{}' is masked by '{}' whose default is identity",
                                binding.dataset(),
                                column.name,
                                rule.name()
                            ),
                        });
                    }
                }
                None if sensitive => findings.push(Finding {
                    severity: Severity::Violation,
                    code: "unmasked_sensitive_column",
                    dataset: Some(binding.dataset().to_string()),
                    column: Some(column.name.clone()),
                    message: format!(
                        "Column '{}.{}' carries a sensitive tag but no masking policy",
                        binding.dataset(),
                        column.name
                    ),
                }),
                None => {}
            }
        }
    }

    for rule in snapshot.masking_policies() {
        if !bound_masks.contains(rule.name()) {
            findings.push(unused("masking policy", rule.name()));
        }
    }
    for rule in snapshot.row_access_policies() {
        if !bound_filters.contains(rule.name()) {
            findings.push(unused("row access policy", rule.name()));
        }
    }

    findings.sort_by(|a, b| a.severity.cmp(&b.severity));
    info!(findings = findings.len(), "Coverage audit complete");
    AuditReport { findings }
}

fn unused(kind: &str, name: &str) -> Finding {
    Finding {
        severity: Severity::Warning,
        code: "unused_policy",
        dataset: None,
        column: None,
        message: format!("The {} '{}' is not bound to any dataset", kind, name),
    }
}

/// Scans sample values of unmasked string columns for data that looks like PII.
pub struct PiiScanner {
    patterns: Vec<(&'static str, Regex)>,
}

impl PiiScanner {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            patterns: vec![
                (
                    "EMAIL",
                    Regex::new(r"(?i)[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}")?,
                ),
                ("SSN", Regex::new(r"\b\d{3}-\d{2}-\d{4}\b")?),
            ],
        })
    }

    pub fn scan(&self, snapshot: &PolicySnapshot, dataset: &str, rows: &[JsonRow]) -> Vec<Finding> {
        let Some(binding) = snapshot.binding(dataset) else {
            return Vec::new();
        };

        binding
            .columns()
            .iter()
            .filter(|c| c.mask.is_none() && c.attribute_type == AttributeType::String)
            .filter_map(|column| {
                let label = rows
                    .iter()
                    .filter_map(|r| r.get(&column.name).and_then(|v| v.as_str()))
                    .find_map(|text| self.detect(text))?;
                Some(Finding {
                    severity: Severity::Warning,
                    code: "possible_pii_leak",
                    dataset: Some(dataset.to_string()),
                    column: Some(column.name.clone()),
                    message: format!(
                        "Unmasked column '{}.{}' contains values that look like {}",
                        dataset, column.name, label
                    ),
                })
            })
            .collect()
    }

    fn detect(&self, text: &str) -> Option<&'static str> {
        self.patterns
            .iter()
            .find(|(_, re)| re.is_match(text))
            .map(|(label, _)| *label)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::governance::{
        ColumnBinding, MaskingRule, PolicyBinding, RoleRegistry, TagDefinition, TagTaxonomy,
    };
    use crate::infrastructure::rows::parse_rows;
    use anyhow::Result;

    fn snapshot(mask_ssn: bool) -> Result<PolicySnapshot> {
        let roles = RoleRegistry::builder()
            .role("DATA_ADMIN_ROLE", Vec::<String>::new())
            .build()?;
        let mut tags = TagTaxonomy::default();
        tags.define(TagDefinition {
            name: "pii_type".to_string(),
            allowed_values: ["ssn", "email"].iter().map(|s| s.to_string()).collect(),
            sensitive: true,
            description: None,
        })?;

        let mut builder = PolicySnapshot::builder("ditteau", roles).tags(tags)?;
        let ssn = builder.add_masking_policy(MaskingRule::new(
            "ssn_mask",
            AttributeType::String,
            MaskingStrategy::last_four(),
        )?)?;
        let email = builder.add_masking_policy(MaskingRule::new(
            "email_mask",
            AttributeType::String,
            MaskingStrategy::Identity,
        )?)?;
        builder.add_masking_policy(MaskingRule::new(
            "dob_mask",
            AttributeType::Date,
            MaskingStrategy::YearOnly,
        )?)?;

        let mut ssn_col = ColumnBinding::new("ssn", AttributeType::String).tagged("pii_type", "ssn");
        if mask_ssn {
            ssn_col = ssn_col.masked_by(ssn);
        }
        builder.add_binding(
            PolicyBinding::new("person")
                .with_column(ssn_col)?
                .with_column(
                    ColumnBinding::new("email", AttributeType::String)
                        .tagged("pii_type", "email")
                        .masked_by(email),
                )?
                .with_column(ColumnBinding::new("notes", AttributeType::String))?,
        )?;
        Ok(builder.build())
    }

    #[test]
    fn test_unmasked_sensitive_column_is_a_violation() -> Result<()> {
        let report = audit_coverage(&snapshot(false)?);
        assert!(report.has_violations());

        let v = report.violations().next().unwrap();
        assert_eq!(v.code, "unmasked_sensitive_column");
        assert_eq!(v.column.as_deref(), Some("ssn"));
        Ok(())
    }

    #[test]
    fn test_warnings_for_unused_and_permissive_policies() -> Result<()> {
        let report = audit_coverage(&snapshot(true)?);
        assert!(!report.has_violations());

        let codes: Vec<&str> = report.warnings().map(|f| f.code).collect();
        assert_eq!(codes, vec!["permissive_default", "unused_policy"]);
        assert!(report.findings[1].message.contains("dob_mask"));
        Ok(())
    }

    #[test]
    fn test_scanner_flags_pii_in_unmasked_columns() -> Result<()> {
        let rows: Vec<JsonRow> = parse_rows(
            r#"[
                {"ssn": "123-45-6789", "email": "a@b.edu", "notes": "call back"},
                {"ssn": "987-65-4321", "email": "c@d.edu", "notes": "reach me at jo@ditteau.org"}
            ]"#,
        )?
        .into_iter()
        .collect::<Result<_, _>>()?;
        let findings = PiiScanner::new()?.scan(&snapshot(true)?, "person", &rows);

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].column.as_deref(), Some("notes"));
        assert!(findings[0].message.contains("EMAIL"));
        Ok(())
    }
}
