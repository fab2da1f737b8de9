// ditteau-core/src/infrastructure/config/project.rs

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

use super::policies::{PolicyDocument, ProjectConfig};
use crate::domain::governance::PolicySnapshot;
use crate::infrastructure::error::InfrastructureError;

pub const MAIN_CONFIG_CANDIDATES: [&str; 2] = ["ditteau.yaml", "ditteau_project.yaml"];

pub const ENV_REFERENCE_DATE: &str = "DITTEAU_REFERENCE_DATE";
pub const ENV_START_MONTH: &str = "DITTEAU_ACADEMIC_YEAR_START_MONTH";

/// Loads the main manifest, merges satellite fragments and applies
/// environment overrides. The result is not yet validated.
#[instrument(skip(project_dir))]
pub fn load_project_config(project_dir: &Path) -> Result<ProjectConfig, InfrastructureError> {
    let config_path = find_main_config(project_dir)?;
    info!(path = ?config_path, "Loading policy manifest");

    let mut config: ProjectConfig = load_fragment(&config_path)?;

    for folder in config.config_paths.clone() {
        let config_dir = project_dir.join(&folder);
        if config_dir.is_dir() {
            load_satellite_configs(&mut config, &config_dir)?;
        } else {
            debug!(path = ?config_dir, "Config path does not exist, skipping");
        }
    }

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;

    Ok(config)
}

/// Loads and compiles the project into an immutable snapshot.
#[instrument(skip(project_dir))]
pub fn load_snapshot(project_dir: &Path) -> Result<PolicySnapshot, InfrastructureError> {
    let config = load_project_config(project_dir)?;
    let snapshot = config.compile()?;
    info!(
        roles = snapshot.roles().len(),
        datasets = snapshot.bindings().count(),
        "Policy snapshot compiled"
    );
    Ok(snapshot)
}

pub fn find_main_config(root: &Path) -> Result<PathBuf, InfrastructureError> {
    MAIN_CONFIG_CANDIDATES
        .iter()
        .map(|name| root.join(name))
        .find(|p| p.exists())
        .ok_or_else(|| {
            InfrastructureError::ConfigNotFound(format!(
                "No configuration file found in {:?}. Checked: {:?}",
                root, MAIN_CONFIG_CANDIDATES
            ))
        })
}

fn load_fragment<T: DeserializeOwned>(path: &Path) -> Result<T, InfrastructureError> {
    let content = fs::read_to_string(path).map_err(|source| InfrastructureError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| InfrastructureError::YamlError {
        path: path.display().to_string(),
        source,
    })
}

/// Appends every `*.yml` / `*.yaml` under `config_dir`, in path order.
fn load_satellite_configs(
    config: &mut ProjectConfig,
    config_dir: &Path,
) -> Result<(), InfrastructureError> {
    let entries = WalkDir::new(config_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == "yml" || ext == "yaml")
        });

    for entry in entries {
        let fragment: PolicyDocument = load_fragment(entry.path())?;
        info!(
            path = ?entry.path(),
            masks = fragment.masking_policies.len(),
            filters = fragment.row_access_policies.len(),
            datasets = fragment.datasets.len(),
            "  🔒 Policy fragment loaded"
        );
        config.policies.merge(fragment);
    }

    Ok(())
}

fn apply_env_overrides<F>(config: &mut ProjectConfig, lookup: F) -> Result<(), InfrastructureError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup(ENV_REFERENCE_DATE) {
        let date = NaiveDate::parse_from_str(&val, "%Y-%m-%d").map_err(|e| {
            InfrastructureError::InvalidOverride {
                variable: ENV_REFERENCE_DATE.to_string(),
                value: val.clone(),
                reason: e.to_string(),
            }
        })?;
        info!(old = ?config.reference_date, new = %date, "Overriding reference date via ENV");
        config.reference_date = Some(date);
    }
    if let Some(val) = lookup(ENV_START_MONTH) {
        let month = val
            .parse::<u32>()
            .map_err(|e| InfrastructureError::InvalidOverride {
                variable: ENV_START_MONTH.to_string(),
                value: val.clone(),
                reason: e.to_string(),
            })?;
        info!(old = config.academic_year_start_month, new = month, "Overriding academic year start via ENV");
        config.academic_year_start_month = month;
    }
    Ok(())
}
