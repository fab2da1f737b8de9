// ditteau-core/src/domain/governance/tags.rs

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::error::ConfigError;

/// Classification label definition. Tags are bookkeeping only: they never
/// change an access decision, but the coverage audit reads the `sensitive` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDefinition {
    pub name: String,
    /// Empty means any value is accepted.
    pub allowed_values: BTreeSet<String>,
    pub sensitive: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TagTaxonomy {
    tags: BTreeMap<String, TagDefinition>,
}

impl TagTaxonomy {
    pub fn define(&mut self, tag: TagDefinition) -> Result<(), ConfigError> {
        if self.tags.contains_key(&tag.name) {
            return Err(ConfigError::DuplicateName {
                kind: "tag",
                name: tag.name,
            });
        }
        self.tags.insert(tag.name.clone(), tag);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TagDefinition> {
        self.tags.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagDefinition> {
        self.tags.values()
    }

    /// Validates a column's tag assignments against the taxonomy.
    pub fn check_assignments(
        &self,
        column: &str,
        assignments: &BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        for (tag, value) in assignments {
            let def = self.get(tag).ok_or_else(|| ConfigError::UnknownTag {
                column: column.to_string(),
                tag: tag.clone(),
            })?;
            if !def.allowed_values.is_empty() && !def.allowed_values.contains(value) {
                return Err(ConfigError::TagValueNotAllowed {
                    column: column.to_string(),
                    tag: tag.clone(),
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }

    /// True if any of the assignments uses a tag flagged as sensitive.
    pub fn is_sensitive(&self, assignments: &BTreeMap<String, String>) -> bool {
        assignments
            .keys()
            .any(|t| self.get(t).is_some_and(|d| d.sensitive))
    }
}
