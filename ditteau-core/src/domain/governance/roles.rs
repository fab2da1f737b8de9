// ditteau-core/src/domain/governance/roles.rs

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::error::ConfigError;
use crate::domain::graph::GraphSolver;

/// Static set of named roles and their inheritance.
///
/// Memberships are resolved once, when the registry is built: every role maps
/// to the closed set of roles it "is" (itself plus every transitive parent).
/// Role names are case-sensitive.
#[derive(Debug, Clone, Default)]
pub struct RoleRegistry {
    parents: BTreeMap<String, Vec<String>>,
    memberships: BTreeMap<String, BTreeSet<String>>,
}

impl RoleRegistry {
    pub fn builder() -> RoleRegistryBuilder {
        RoleRegistryBuilder::default()
    }

    pub fn contains(&self, role: &str) -> bool {
        self.memberships.contains_key(role)
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.memberships.keys().map(String::as_str)
    }

    pub fn parents_of(&self, role: &str) -> &[String] {
        self.parents.get(role).map_or(&[], Vec::as_slice)
    }

    /// The closed membership set of `role`. Unknown roles have none.
    pub fn memberships(&self, role: &str) -> Option<&BTreeSet<String>> {
        self.memberships.get(role)
    }

    /// True if `role` equals, or transitively inherits from, any role in `role_set`.
    pub fn is_member<'a, I>(&self, role: &str, role_set: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        match self.memberships.get(role) {
            Some(closure) => role_set.into_iter().any(|r| closure.contains(r)),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.memberships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memberships.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct RoleRegistryBuilder {
    parents: BTreeMap<String, Vec<String>>,
    duplicates: Vec<String>,
}

impl RoleRegistryBuilder {
    pub fn role<I, S>(mut self, name: &str, inherits: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let parents = inherits.into_iter().map(Into::into).collect();
        if self.parents.insert(name.to_string(), parents).is_some() {
            self.duplicates.push(name.to_string());
        }
        self
    }

    /// Validates the graph and precomputes transitive memberships.
    pub fn build(self) -> Result<RoleRegistry, ConfigError> {
        if let Some(name) = self.duplicates.into_iter().next() {
            return Err(ConfigError::DuplicateName { kind: "role", name });
        }

        for (role, parents) in &self.parents {
            if let Some(missing) = parents.iter().find(|p| !self.parents.contains_key(*p)) {
                return Err(ConfigError::UnknownRole {
                    context: format!("role '{}'", role),
                    role: missing.clone(),
                });
            }
        }

        // Layers guarantee every parent is resolved before its children.
        let layers = GraphSolver::layers(&self.parents)?;

        let mut memberships: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for role in layers.into_iter().flatten() {
            let mut closure = BTreeSet::from([role.clone()]);
            for parent in self.parents.get(&role).into_iter().flatten() {
                if let Some(inherited) = memberships.get(parent) {
                    closure.extend(inherited.iter().cloned());
                }
            }
            memberships.insert(role, closure);
        }

        Ok(RoleRegistry {
            parents: self.parents,
            memberships,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn set(roles: &[&str]) -> Vec<String> {
        roles.iter().map(|r| r.to_string()).collect()
    }

    fn registry() -> Result<RoleRegistry> {
        Ok(RoleRegistry::builder()
            .role("ANALYST_BASE_ROLE", Vec::<String>::new())
            .role("IR_ANALYST_ROLE", ["ANALYST_BASE_ROLE"])
            .role("SENIOR_IR_ANALYST_ROLE", ["IR_ANALYST_ROLE"])
            .role("DATA_ADMIN_ROLE", Vec::<String>::new())
            .build()?)
    }

    #[test]
    fn test_membership_is_transitive() -> Result<()> {
        let reg = registry()?;
        assert!(reg.is_member("SENIOR_IR_ANALYST_ROLE", &set(&["ANALYST_BASE_ROLE"])));
        assert!(reg.is_member("IR_ANALYST_ROLE", &set(&["IR_ANALYST_ROLE"])));
        assert!(!reg.is_member("ANALYST_BASE_ROLE", &set(&["IR_ANALYST_ROLE"])));
        assert!(!reg.is_member("DATA_ADMIN_ROLE", &set(&["ANALYST_BASE_ROLE"])));
        Ok(())
    }

    #[test]
    fn test_unknown_role_has_no_memberships() -> Result<()> {
        let reg = registry()?;
        assert!(!reg.contains("GUEST"));
        assert!(reg.memberships("GUEST").is_none());
        assert!(!reg.is_member("GUEST", &set(&["GUEST", "ANALYST_BASE_ROLE"])));
        Ok(())
    }

    #[test]
    fn test_role_names_are_case_sensitive() -> Result<()> {
        let reg = registry()?;
        assert!(!reg.is_member("ir_analyst_role", &set(&["IR_ANALYST_ROLE"])));
        Ok(())
    }

    #[test]
    fn test_cycle_rejected_at_registration() {
        let result = RoleRegistry::builder()
            .role("A", ["B"])
            .role("B", ["C"])
            .role("C", ["A"])
            .build();
        assert!(matches!(result, Err(ConfigError::CyclicRoleHierarchy(_))));
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let result = RoleRegistry::builder().role("A", ["MISSING"]).build();
        assert!(matches!(result, Err(ConfigError::UnknownRole { .. })));
    }

    #[test]
    fn test_duplicate_role_rejected() {
        let result = RoleRegistry::builder()
            .role("A", Vec::<String>::new())
            .role("A", Vec::<String>::new())
            .build();
        assert!(matches!(result, Err(ConfigError::DuplicateName { kind: "role", .. })));
    }
}
