// ditteau-core/src/domain/governance/snapshot.rs

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::binding::PolicyBinding;
use super::condition::AcademicCalendar;
use super::policy::{MaskingRule, RowAccessRule};
use super::roles::RoleRegistry;
use super::tags::TagTaxonomy;
use crate::domain::error::ConfigError;

/// A complete, validated configuration. Read-only after construction; a new
/// configuration is a new snapshot.
#[derive(Debug, Clone)]
pub struct PolicySnapshot {
    name: String,
    roles: RoleRegistry,
    tags: TagTaxonomy,
    calendar: AcademicCalendar,
    reference_date: Option<NaiveDate>,
    masking_policies: BTreeMap<String, Arc<MaskingRule>>,
    row_access_policies: BTreeMap<String, Arc<RowAccessRule>>,
    bindings: BTreeMap<String, PolicyBinding>,
}

impl PolicySnapshot {
    pub fn builder(name: &str, roles: RoleRegistry) -> PolicySnapshotBuilder {
        PolicySnapshotBuilder {
            snapshot: PolicySnapshot {
                name: name.to_string(),
                roles,
                tags: TagTaxonomy::default(),
                calendar: AcademicCalendar::default(),
                reference_date: None,
                masking_policies: BTreeMap::new(),
                row_access_policies: BTreeMap::new(),
                bindings: BTreeMap::new(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn roles(&self) -> &RoleRegistry {
        &self.roles
    }

    pub fn tags(&self) -> &TagTaxonomy {
        &self.tags
    }

    pub fn calendar(&self) -> AcademicCalendar {
        self.calendar
    }

    /// Pinned reference date from configuration, if any.
    pub fn reference_date(&self) -> Option<NaiveDate> {
        self.reference_date
    }

    pub fn binding(&self, dataset: &str) -> Option<&PolicyBinding> {
        self.bindings.get(dataset)
    }

    pub fn bindings(&self) -> impl Iterator<Item = &PolicyBinding> {
        self.bindings.values()
    }

    pub fn masking_policies(&self) -> impl Iterator<Item = &Arc<MaskingRule>> {
        self.masking_policies.values()
    }

    pub fn row_access_policies(&self) -> impl Iterator<Item = &Arc<RowAccessRule>> {
        self.row_access_policies.values()
    }

    pub fn masking_policy(&self, name: &str) -> Option<&Arc<MaskingRule>> {
        self.masking_policies.get(name)
    }

    pub fn row_access_policy(&self, name: &str) -> Option<&Arc<RowAccessRule>> {
        self.row_access_policies.get(name)
    }
}

pub struct PolicySnapshotBuilder {
    snapshot: PolicySnapshot,
}

impl PolicySnapshotBuilder {
    /// Replaces the taxonomy. Bindings added earlier are re-checked against it.
    pub fn tags(mut self, tags: TagTaxonomy) -> Result<Self, ConfigError> {
        for binding in self.snapshot.bindings.values() {
            check_tags(&tags, binding)?;
        }
        self.snapshot.tags = tags;
        Ok(self)
    }

    pub fn calendar(mut self, calendar: AcademicCalendar) -> Self {
        self.snapshot.calendar = calendar;
        self
    }

    pub fn reference_date(mut self, date: Option<NaiveDate>) -> Self {
        self.snapshot.reference_date = date;
        self
    }

    pub fn roles(&self) -> &RoleRegistry {
        &self.snapshot.roles
    }

    pub fn add_masking_policy(&mut self, rule: MaskingRule) -> Result<Arc<MaskingRule>, ConfigError> {
        let name = rule.name().to_string();
        if self.snapshot.masking_policies.contains_key(&name) {
            return Err(ConfigError::DuplicateName {
                kind: "masking policy",
                name,
            });
        }
        self.check_roles(&name, rule.referenced_roles())?;

        let rule = Arc::new(rule);
        self.snapshot.masking_policies.insert(name, Arc::clone(&rule));
        Ok(rule)
    }

    pub fn add_row_access_policy(
        &mut self,
        rule: RowAccessRule,
    ) -> Result<Arc<RowAccessRule>, ConfigError> {
        let name = rule.name().to_string();
        if self.snapshot.row_access_policies.contains_key(&name) {
            return Err(ConfigError::DuplicateName {
                kind: "row access policy",
                name,
            });
        }
        self.check_roles(&name, rule.referenced_roles())?;

        let rule = Arc::new(rule);
        self.snapshot.row_access_policies.insert(name, Arc::clone(&rule));
        Ok(rule)
    }

    pub fn add_binding(&mut self, binding: PolicyBinding) -> Result<(), ConfigError> {
        let dataset = binding.dataset().to_string();
        if self.snapshot.bindings.contains_key(&dataset) {
            return Err(ConfigError::DuplicateName {
                kind: "dataset",
                name: dataset,
            });
        }
        if binding.row_filters().is_empty() && binding.masked_columns().next().is_none() {
            return Err(ConfigError::EmptyBinding(dataset));
        }
        check_tags(&self.snapshot.tags, &binding)?;
        self.snapshot.bindings.insert(dataset, binding);
        Ok(())
    }

    fn check_roles<'a>(
        &self,
        policy: &str,
        mut roles: impl Iterator<Item = &'a String>,
    ) -> Result<(), ConfigError> {
        match roles.find(|r| !self.snapshot.roles.contains(r)) {
            Some(role) => Err(ConfigError::UnknownRole {
                context: format!("policy '{}'", policy),
                role: role.clone(),
            }),
            None => Ok(()),
        }
    }

    pub fn build(self) -> PolicySnapshot {
        self.snapshot
    }
}

fn check_tags(tags: &TagTaxonomy, binding: &PolicyBinding) -> Result<(), ConfigError> {
    for column in binding.columns() {
        tags.check_assignments(&format!("{}.{}", binding.dataset(), column.name), &column.tags)?;
    }
    Ok(())
}
