// ditteau-core/src/infrastructure/config/policies.rs

// Declarative policy documents (YAML) and their compilation into a validated
// `PolicySnapshot`. Every semantic error surfaces here as a `ConfigError`,
// never at evaluation time.

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use std::sync::Arc;
use validator::Validate;

use crate::domain::error::ConfigError;
use crate::domain::governance::{
    AcademicCalendar, AttributeType, ColumnBinding, Condition, MaskingRule, MaskingStrategy,
    PolicyBinding, PolicySnapshot, RoleRegistry, RolePredicate, RowAccessRule, TagDefinition,
    TagTaxonomy, Value,
};

// =============================================================================
//  1. DOCUMENT
// =============================================================================

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProjectConfig {
    pub name: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(rename = "config-paths", default)]
    pub config_paths: Vec<String>,

    #[serde(rename = "reference-date", default, skip_serializing_if = "Option::is_none")]
    pub reference_date: Option<NaiveDate>,

    #[serde(
        rename = "academic-year-start-month",
        default = "default_start_month"
    )]
    pub academic_year_start_month: u32,

    #[serde(flatten)]
    pub policies: PolicyDocument,
}

/// The policy lists. The main file and every satellite fragment share this shape.
#[derive(Debug, Deserialize, Serialize, Clone, Default, Validate)]
pub struct PolicyDocument {
    #[serde(default)]
    #[validate(nested)]
    pub roles: Vec<RoleSpec>,

    #[serde(default)]
    #[validate(nested)]
    pub tags: Vec<TagSpec>,

    #[serde(default)]
    #[validate(nested)]
    pub masking_policies: Vec<MaskingPolicySpec>,

    #[serde(default)]
    #[validate(nested)]
    pub row_access_policies: Vec<RowAccessPolicySpec>,

    #[serde(default)]
    #[validate(nested)]
    pub datasets: Vec<DatasetSpec>,
}

impl PolicyDocument {
    pub fn merge(&mut self, other: PolicyDocument) {
        self.roles.extend(other.roles);
        self.tags.extend(other.tags);
        self.masking_policies.extend(other.masking_policies);
        self.row_access_policies.extend(other.row_access_policies);
        self.datasets.extend(other.datasets);
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct RoleSpec {
    #[validate(length(min = 1, message = "Role name cannot be empty"))]
    pub name: String,
    #[serde(default)]
    pub inherits: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct TagSpec {
    #[validate(length(min = 1, message = "Tag name cannot be empty"))]
    pub name: String,
    #[serde(default)]
    pub allowed_values: Vec<String>,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct MaskingPolicySpec {
    #[validate(length(min = 1, message = "Policy name cannot be empty"))]
    pub name: String,
    pub attribute_type: String,
    #[serde(default)]
    #[validate(nested)]
    pub rules: Vec<MaskingRuleSpec>,
    pub default: TransformSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct MaskingRuleSpec {
    #[validate(length(min = 1, message = "A rule must name at least one role"))]
    pub roles: Vec<String>,
    #[serde(flatten)]
    pub transform: TransformSpec,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct TransformSpec {
    pub transform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask_char: Option<char>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separators: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_yaml::Value>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct RowAccessPolicySpec {
    #[validate(length(min = 1, message = "Policy name cannot be empty"))]
    pub name: String,
    pub attribute_type: String,
    #[serde(default)]
    #[validate(nested)]
    pub rules: Vec<AccessRuleSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct AccessRuleSpec {
    #[validate(length(min = 1, message = "A rule must name at least one role"))]
    pub roles: Vec<String>,
    #[serde(flatten)]
    pub condition: ConditionSpec,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ConditionSpec {
    #[serde(default = "default_condition")]
    pub condition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years_back: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ConditionSpec>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct DatasetSpec {
    #[validate(length(min = 1, message = "Dataset name cannot be empty"))]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub row_access: Vec<RowFilterSpec>,
    #[serde(default)]
    #[validate(nested)]
    pub columns: Vec<ColumnSpec>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RowFilterSpec {
    pub policy: String,
    pub on: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct ColumnSpec {
    #[validate(length(min = 1, message = "Column name cannot be empty"))]
    pub name: String,
    #[serde(rename = "type")]
    pub attribute_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub masking_policy: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_start_month() -> u32 {
    AcademicCalendar::DEFAULT_START_MONTH
}

fn default_condition() -> String {
    "always".to_string()
}

// =============================================================================
//  2. COMPILATION
// =============================================================================

impl ProjectConfig {
    /// Validates the document and builds an immutable snapshot.
    pub fn compile(&self) -> Result<PolicySnapshot, ConfigError> {
        self.policies
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let calendar = AcademicCalendar::new(self.academic_year_start_month).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "academic-year-start-month must be within 1..=12 (got {})",
                self.academic_year_start_month
            ))
        })?;

        let doc = &self.policies;

        let roles = doc
            .roles
            .iter()
            .fold(RoleRegistry::builder(), |b, r| b.role(&r.name, r.inherits.iter().cloned()))
            .build()?;

        let mut taxonomy = TagTaxonomy::default();
        for tag in &doc.tags {
            taxonomy.define(TagDefinition {
                name: tag.name.clone(),
                allowed_values: tag.allowed_values.iter().cloned().collect::<BTreeSet<_>>(),
                sensitive: tag.sensitive,
                description: tag.description.clone(),
            })?;
        }

        let mut builder = PolicySnapshot::builder(&self.name, roles)
            .tags(taxonomy)?
            .calendar(calendar)
            .reference_date(self.reference_date);

        let mut masks: BTreeMap<&str, Arc<MaskingRule>> = BTreeMap::new();
        for spec in &doc.masking_policies {
            let rule = compile_masking_policy(spec)?;
            masks.insert(&spec.name, builder.add_masking_policy(rule)?);
        }

        let mut filters: BTreeMap<&str, Arc<RowAccessRule>> = BTreeMap::new();
        for spec in &doc.row_access_policies {
            let rule = compile_row_access_policy(spec, calendar)?;
            filters.insert(&spec.name, builder.add_row_access_policy(rule)?);
        }

        for dataset in &doc.datasets {
            let mut binding = PolicyBinding::new(&dataset.name);

            for col in &dataset.columns {
                let ty = AttributeType::from_str(&col.attribute_type)?;
                let mut column = ColumnBinding::new(&col.name, ty);
                if let Some(policy) = &col.masking_policy {
                    let rule = masks.get(policy.as_str()).ok_or_else(|| ConfigError::UnknownPolicy {
                        kind: "masking policy",
                        name: policy.clone(),
                        dataset: dataset.name.clone(),
                    })?;
                    column = column.masked_by(Arc::clone(rule));
                }
                column.tags = col.tags.clone();
                binding = binding.with_column(column)?;
            }

            for filter in &dataset.row_access {
                let rule = filters
                    .get(filter.policy.as_str())
                    .ok_or_else(|| ConfigError::UnknownPolicy {
                        kind: "row access policy",
                        name: filter.policy.clone(),
                        dataset: dataset.name.clone(),
                    })?;
                binding = binding.with_row_filter(Arc::clone(rule), &filter.on)?;
            }

            builder.add_binding(binding)?;
        }

        Ok(builder.build())
    }
}

fn compile_masking_policy(spec: &MaskingPolicySpec) -> Result<MaskingRule, ConfigError> {
    let ty = AttributeType::from_str(&spec.attribute_type)?;
    let default = compile_transform(&spec.name, ty, &spec.default)?;

    let mut rule = MaskingRule::new(&spec.name, ty, default)?;
    for case in &spec.rules {
        let strategy = compile_transform(&spec.name, ty, &case.transform)?;
        rule = rule.with_case(RolePredicate::any_of(case.roles.iter().cloned()), strategy)?;
    }
    Ok(rule)
}

fn compile_transform(
    policy: &str,
    ty: AttributeType,
    spec: &TransformSpec,
) -> Result<MaskingStrategy, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidStrategy {
        policy: policy.to_string(),
        strategy: spec.transform.clone(),
        reason: reason.to_string(),
    };

    let parsed = MaskingStrategy::from_str(&spec.transform)?;
    let accepted: &[&str] = match parsed {
        MaskingStrategy::Partial { .. } => &["keep"],
        MaskingStrategy::KeepLast { .. } => &["keep", "mask_char", "separators"],
        MaskingStrategy::RoundTo { .. } => &["multiple"],
        MaskingStrategy::Constant(_) => &["value"],
        _ => &[],
    };
    let supplied = [
        ("keep", spec.keep.is_some()),
        ("mask_char", spec.mask_char.is_some()),
        ("separators", spec.separators.is_some()),
        ("multiple", spec.multiple.is_some()),
        ("value", spec.value.is_some()),
    ];
    if let Some((param, _)) = supplied
        .into_iter()
        .find(|(param, set)| *set && !accepted.contains(param))
    {
        return Err(invalid(&format!("`{}` does not apply to this strategy", param)));
    }

    let strategy = match parsed {
        MaskingStrategy::Partial { keep } => MaskingStrategy::Partial {
            keep: spec.keep.unwrap_or(keep),
        },
        MaskingStrategy::KeepLast {
            keep,
            mask_char,
            separators,
        } => MaskingStrategy::KeepLast {
            keep: spec.keep.unwrap_or(keep),
            mask_char: spec.mask_char.unwrap_or(mask_char),
            separators: spec
                .separators
                .as_ref()
                .map_or(separators, |s| s.chars().collect()),
        },
        MaskingStrategy::RoundTo { .. } => MaskingStrategy::RoundTo {
            multiple: spec.multiple.ok_or_else(|| invalid("`multiple` is required"))?,
        },
        MaskingStrategy::Constant(_) => {
            let literal = spec.value.clone().unwrap_or(serde_yaml::Value::Null);
            let value = Value::from_yaml_literal(&literal, ty).map_err(|e| invalid(&e))?;
            MaskingStrategy::Constant(value)
        }
        other => other,
    };
    Ok(strategy)
}

fn compile_row_access_policy(
    spec: &RowAccessPolicySpec,
    calendar: AcademicCalendar,
) -> Result<RowAccessRule, ConfigError> {
    let ty = AttributeType::from_str(&spec.attribute_type)?;

    let mut rule = RowAccessRule::new(&spec.name, ty);
    for case in &spec.rules {
        let condition = compile_condition(&spec.name, ty, &case.condition, calendar)?;
        rule = rule.with_case(RolePredicate::any_of(case.roles.iter().cloned()), condition)?;
    }
    Ok(rule)
}

fn compile_condition(
    policy: &str,
    ty: AttributeType,
    spec: &ConditionSpec,
    calendar: AcademicCalendar,
) -> Result<Condition, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidCondition {
        policy: policy.to_string(),
        condition: spec.condition.clone(),
        reason,
    };
    let literal = |y: &serde_yaml::Value| Value::from_yaml_literal(y, ty).map_err(invalid);
    let literals = || -> Result<Vec<Value>, ConfigError> {
        if spec.values.is_empty() {
            return Err(invalid("`values` must list at least one value".to_string()));
        }
        spec.values.iter().map(literal).collect()
    };
    let nested = || -> Result<Vec<Condition>, ConfigError> {
        spec.conditions
            .iter()
            .map(|c| compile_condition(policy, ty, c, calendar))
            .collect()
    };

    let condition = match spec.condition.to_lowercase().as_str() {
        "always" => Condition::Always,
        "is_null" => Condition::IsNull,
        "equals" => {
            let value = spec
                .value
                .as_ref()
                .ok_or_else(|| invalid("`value` is required".to_string()))?;
            Condition::Equals(literal(value)?)
        }
        "in" => Condition::In(literals()?),
        "not_in" => Condition::NotIn(literals()?),
        "between" => Condition::Between {
            min: spec.min.as_ref().map(literal).transpose()?,
            max: spec.max.as_ref().map(literal).transpose()?,
        },
        "matches" => {
            let pattern = spec
                .pattern
                .as_ref()
                .ok_or_else(|| invalid("`pattern` is required".to_string()))?;
            Condition::Matches(Regex::new(pattern).map_err(|e| invalid(e.to_string()))?)
        }
        "academic_year_window" => Condition::AcademicYearWindow {
            years_back: spec
                .years_back
                .ok_or_else(|| invalid("`years_back` is required".to_string()))?,
            calendar,
        },
        "any_of" => Condition::AnyOf(nested()?),
        "all_of" => Condition::AllOf(nested()?),
        other => return Err(ConfigError::UnknownCondition(other.to_string())),
    };
    Ok(condition)
}
