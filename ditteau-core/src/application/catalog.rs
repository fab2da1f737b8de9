// ditteau-core/src/application/catalog.rs

use chrono::{DateTime, Utc};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::governance::PolicySnapshot;

// --- DTOs ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Masking,
    RowAccess,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Masking => "masking",
            Self::RowAccess => "row_access",
        }
    }
}

/// One attachment of a policy to a dataset column.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyReference {
    pub dataset: String,
    pub column: String,
    pub kind: ReferenceKind,
    pub policy: String,
    pub attribute_type: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleEntry {
    pub name: String,
    pub inherits: Vec<String>,
    /// Every role this one "is", itself included.
    pub memberships: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagEntry {
    pub name: String,
    pub sensitive: bool,
    /// Empty means any value is accepted.
    pub allowed_values: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CatalogStats {
    pub datasets: usize,
    pub masking_policies: usize,
    pub row_access_policies: usize,
    pub masked_columns: usize,
    pub row_filters: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PolicyCatalog {
    pub generated_at: String,
    pub project_name: String,
    pub roles: Vec<RoleEntry>,
    pub tags: Vec<TagEntry>,
    pub references: Vec<PolicyReference>,
    pub stats: CatalogStats,
}

impl PolicyCatalog {
    pub fn build(snapshot: &PolicySnapshot, generated_at: DateTime<Utc>) -> Self {
        let mut references = Vec::new();
        let mut stats = CatalogStats {
            masking_policies: snapshot.masking_policies().count(),
            row_access_policies: snapshot.row_access_policies().count(),
            ..CatalogStats::default()
        };

        for binding in snapshot.bindings() {
            stats.datasets += 1;

            for filter in binding.row_filters() {
                stats.row_filters += 1;
                let tags = binding
                    .column(&filter.column)
                    .map(|c| c.tags.clone())
                    .unwrap_or_default();
                references.push(PolicyReference {
                    dataset: binding.dataset().to_string(),
                    column: filter.column.clone(),
                    kind: ReferenceKind::RowAccess,
                    policy: filter.rule.name().to_string(),
                    attribute_type: filter.rule.attribute_type().to_string(),
                    tags,
                });
            }

            for (column, rule) in binding.masked_columns() {
                stats.masked_columns += 1;
                references.push(PolicyReference {
                    dataset: binding.dataset().to_string(),
                    column: column.name.clone(),
                    kind: ReferenceKind::Masking,
                    policy: rule.name().to_string(),
                    attribute_type: column.attribute_type.to_string(),
                    tags: column.tags.clone(),
                });
            }
        }

        let registry = snapshot.roles();
        let roles = registry
            .roles()
            .map(|name| RoleEntry {
                name: name.to_string(),
                inherits: registry.parents_of(name).to_vec(),
                memberships: registry
                    .memberships(name)
                    .map(|m| m.iter().cloned().collect())
                    .unwrap_or_default(),
            })
            .collect();

        let tags = snapshot
            .tags()
            .iter()
            .map(|t| TagEntry {
                name: t.name.clone(),
                sensitive: t.sensitive,
                allowed_values: t.allowed_values.iter().cloned().collect(),
                description: t.description.clone(),
            })
            .collect();

        Self {
            generated_at: generated_at.to_rfc3339(),
            project_name: snapshot.name().to_string(),
            roles,
            tags,
            references,
            stats,
        }
    }

    /// Keeps only the references of `dataset`.
    pub fn for_dataset(mut self, dataset: &str) -> Self {
        self.references.retain(|r| r.dataset == dataset);
        self
    }

    pub fn references_table(&self) -> Table {
        let mut table = styled_table(&["Dataset", "Column", "Kind", "Policy", "Type", "Tags"]);
        for r in &self.references {
            let tags: Vec<String> = r.tags.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            table.add_row(vec![
                r.dataset.clone(),
                r.column.clone(),
                r.kind.as_str().to_string(),
                r.policy.clone(),
                r.attribute_type.clone(),
                tags.join(", "),
            ]);
        }
        table
    }

    pub fn roles_table(&self) -> Table {
        let mut table = styled_table(&["Role", "Inherits", "Effective memberships"]);
        for role in &self.roles {
            table.add_row(vec![
                role.name.clone(),
                role.inherits.join(", "),
                role.memberships.join(", "),
            ]);
        }
        table
    }

    pub fn tags_table(&self) -> Table {
        let mut table = styled_table(&["Tag", "Sensitive", "Allowed values"]);
        for tag in &self.tags {
            let allowed = if tag.allowed_values.is_empty() {
                "*".to_string()
            } else {
                tag.allowed_values.join(", ")
            };
            table.add_row(vec![
                tag.name.clone(),
                if tag.sensitive { "yes" } else { "no" }.to_string(),
                allowed,
            ]);
        }
        table
    }
}

fn styled_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            header
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        );
    table
}
