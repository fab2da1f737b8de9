// ditteau-core/src/domain/governance/policy.rs

use std::collections::BTreeSet;

use super::condition::Condition;
use super::masking::MaskingStrategy;
use super::roles::RoleRegistry;
use super::value::AttributeType;
use crate::domain::error::ConfigError;

/// Set-membership test on the acting role, resolved through the role hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePredicate {
    roles: BTreeSet<String>,
}

impl RolePredicate {
    pub fn any_of<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    pub fn matches(&self, registry: &RoleRegistry, role: &str) -> bool {
        registry.is_member(role, &self.roles)
    }
}

#[derive(Debug, Clone)]
pub struct MaskingCase {
    pub predicate: RolePredicate,
    pub strategy: MaskingStrategy,
}

/// Ordered `(role predicate, transform)` list plus a default transform.
/// The first matching predicate wins; the default fires when none match.
#[derive(Debug, Clone)]
pub struct MaskingRule {
    name: String,
    attribute_type: AttributeType,
    cases: Vec<MaskingCase>,
    default: MaskingStrategy,
}

impl MaskingRule {
    pub fn new(
        name: &str,
        attribute_type: AttributeType,
        default: MaskingStrategy,
    ) -> Result<Self, ConfigError> {
        check_strategy(name, attribute_type, &default)?;
        Ok(Self {
            name: name.to_string(),
            attribute_type,
            cases: Vec::new(),
            default,
        })
    }

    pub fn with_case(
        mut self,
        predicate: RolePredicate,
        strategy: MaskingStrategy,
    ) -> Result<Self, ConfigError> {
        check_strategy(&self.name, self.attribute_type, &strategy)?;
        self.cases.push(MaskingCase {
            predicate,
            strategy,
        });
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute_type(&self) -> AttributeType {
        self.attribute_type
    }

    pub fn cases(&self) -> &[MaskingCase] {
        &self.cases
    }

    pub fn default_strategy(&self) -> &MaskingStrategy {
        &self.default
    }

    /// Picks the strategy for `role`: `(Some(index), strategy)` for a declared
    /// case, `(None, default)` otherwise.
    pub fn select(&self, registry: &RoleRegistry, role: &str) -> (Option<usize>, &MaskingStrategy) {
        self.cases
            .iter()
            .position(|case| case.predicate.matches(registry, role))
            .map_or((None, &self.default), |i| (Some(i), &self.cases[i].strategy))
    }

    pub(crate) fn referenced_roles(&self) -> impl Iterator<Item = &String> {
        self.cases.iter().flat_map(|c| c.predicate.roles().iter())
    }
}

fn check_strategy(
    policy: &str,
    ty: AttributeType,
    strategy: &MaskingStrategy,
) -> Result<(), ConfigError> {
    if !strategy.accepts(ty) {
        return Err(ConfigError::TransformTypeMismatch {
            policy: policy.to_string(),
            strategy: strategy.name().to_string(),
            attribute_type: ty.to_string(),
        });
    }
    if let MaskingStrategy::RoundTo { multiple } = strategy {
        let integral = ty != AttributeType::Integer || multiple.fract() == 0.0;
        if !multiple.is_finite() || *multiple <= 0.0 || !integral {
            return Err(ConfigError::InvalidStrategy {
                policy: policy.to_string(),
                strategy: strategy.name().to_string(),
                reason: format!("multiple must be a positive {} (got {})", ty, multiple),
            });
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct AccessCase {
    pub predicate: RolePredicate,
    pub condition: Condition,
}

/// Ordered `(role predicate, value predicate)` list. The rule holds when any
/// pair holds; a role matching no pair is denied.
#[derive(Debug, Clone)]
pub struct RowAccessRule {
    name: String,
    attribute_type: AttributeType,
    cases: Vec<AccessCase>,
}

impl RowAccessRule {
    pub fn new(name: &str, attribute_type: AttributeType) -> Self {
        Self {
            name: name.to_string(),
            attribute_type,
            cases: Vec::new(),
        }
    }

    pub fn with_case(
        mut self,
        predicate: RolePredicate,
        condition: Condition,
    ) -> Result<Self, ConfigError> {
        condition
            .check_type(self.attribute_type)
            .map_err(|reason| ConfigError::InvalidCondition {
                policy: self.name.clone(),
                condition: condition.name().to_string(),
                reason,
            })?;
        self.cases.push(AccessCase {
            predicate,
            condition,
        });
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute_type(&self) -> AttributeType {
        self.attribute_type
    }

    pub fn cases(&self) -> &[AccessCase] {
        &self.cases
    }

    pub(crate) fn referenced_roles(&self) -> impl Iterator<Item = &String> {
        self.cases.iter().flat_map(|c| c.predicate.roles().iter())
    }
}
