// ditteau-core/src/domain/governance/binding.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use super::policy::{MaskingRule, RowAccessRule};
use super::value::{AttributeRow, AttributeType, Value};
use crate::domain::error::{ConfigError, EvaluationError};

#[derive(Debug, Clone)]
pub struct ColumnBinding {
    pub name: String,
    pub attribute_type: AttributeType,
    pub mask: Option<Arc<MaskingRule>>,
    pub tags: BTreeMap<String, String>,
}

impl ColumnBinding {
    pub fn new(name: &str, attribute_type: AttributeType) -> Self {
        Self {
            name: name.to_string(),
            attribute_type,
            mask: None,
            tags: BTreeMap::new(),
        }
    }

    pub fn masked_by(mut self, rule: Arc<MaskingRule>) -> Self {
        self.mask = Some(rule);
        self
    }

    pub fn tagged(mut self, tag: &str, value: &str) -> Self {
        self.tags.insert(tag.to_string(), value.to_string());
        self
    }
}

/// A row access rule bound to the column it reads.
#[derive(Debug, Clone)]
pub struct RowFilter {
    pub rule: Arc<RowAccessRule>,
    pub column: String,
}

/// Policies attached to one dataset: AND-combined row filters and
/// independently masked columns. Immutable once inside a snapshot.
#[derive(Debug, Clone)]
pub struct PolicyBinding {
    dataset: String,
    columns: Vec<ColumnBinding>,
    row_filters: Vec<RowFilter>,
}

impl PolicyBinding {
    pub fn new(dataset: &str) -> Self {
        Self {
            dataset: dataset.to_string(),
            columns: Vec::new(),
            row_filters: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: ColumnBinding) -> Result<Self, ConfigError> {
        if self.column(&column.name).is_some() {
            return Err(ConfigError::DuplicateName {
                kind: "column",
                name: format!("{}.{}", self.dataset, column.name),
            });
        }
        if let Some(rule) = &column.mask {
            self.check_type(&column, rule.name(), rule.attribute_type())?;
        }
        self.columns.push(column);
        Ok(self)
    }

    pub fn with_row_filter(
        mut self,
        rule: Arc<RowAccessRule>,
        column: &str,
    ) -> Result<Self, ConfigError> {
        let bound = self.column(column).ok_or_else(|| ConfigError::UnknownColumn {
            dataset: self.dataset.clone(),
            column: column.to_string(),
        })?;
        self.check_type(bound, rule.name(), rule.attribute_type())?;

        if self
            .row_filters
            .iter()
            .any(|f| f.column == column && f.rule.name() == rule.name())
        {
            return Err(ConfigError::DuplicateName {
                kind: "row access binding",
                name: format!("{} on {}.{}", rule.name(), self.dataset, column),
            });
        }

        self.row_filters.push(RowFilter {
            rule,
            column: column.to_string(),
        });
        Ok(self)
    }

    fn check_type(
        &self,
        column: &ColumnBinding,
        policy: &str,
        expected: AttributeType,
    ) -> Result<(), ConfigError> {
        if column.attribute_type != expected {
            return Err(ConfigError::BindingTypeMismatch {
                dataset: self.dataset.clone(),
                column: column.name.clone(),
                policy: policy.to_string(),
                expected: expected.to_string(),
                found: column.attribute_type.to_string(),
            });
        }
        Ok(())
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn columns(&self) -> &[ColumnBinding] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnBinding> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn row_filters(&self) -> &[RowFilter] {
        &self.row_filters
    }

    pub fn masked_columns(&self) -> impl Iterator<Item = (&ColumnBinding, &Arc<MaskingRule>)> {
        self.columns
            .iter()
            .filter_map(|c| c.mask.as_ref().map(|m| (c, m)))
    }

    /// Decodes a JSON object into an attribute row. Declared columns are typed;
    /// undeclared ones are decoded by shape.
    pub fn decode_row(
        &self,
        json: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<AttributeRow, EvaluationError> {
        json.iter()
            .map(|(name, raw)| {
                let value = match self.column(name) {
                    Some(col) => Value::from_json_typed(raw, name, col.attribute_type)?,
                    None => Value::from_json_untyped(raw),
                };
                Ok::<_, EvaluationError>((name.clone(), value))
            })
            .collect()
    }
}
