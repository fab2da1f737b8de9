// ditteau-core/src/application/store.rs

use arc_swap::ArcSwap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use crate::domain::governance::PolicySnapshot;
use crate::error::DitteauError;
use crate::infrastructure::config::load_snapshot;

/// Holds the active snapshot. Readers take a cheap `Arc` and keep evaluating
/// against it even if a reload swaps in a new configuration meanwhile.
pub struct PolicyStore {
    current: ArcSwap<PolicySnapshot>,
    source: Option<PathBuf>,
}

impl PolicyStore {
    pub fn new(snapshot: PolicySnapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(snapshot),
            source: None,
        }
    }

    /// Compiles the project at `project_dir` and remembers it for [`PolicyStore::reload`].
    pub fn open(project_dir: &Path) -> Result<Self, DitteauError> {
        let snapshot = load_snapshot(project_dir)?;
        Ok(Self {
            current: ArcSwap::from_pointee(snapshot),
            source: Some(project_dir.to_path_buf()),
        })
    }

    pub fn load(&self) -> Arc<PolicySnapshot> {
        self.current.load_full()
    }

    /// Installs `snapshot` and returns the one it replaced.
    pub fn replace(&self, snapshot: PolicySnapshot) -> Arc<PolicySnapshot> {
        let previous = self.current.swap(Arc::new(snapshot));
        info!(previous = previous.name(), "Policy snapshot replaced");
        previous
    }

    /// Recompiles from disk. On failure the active snapshot stays in place.
    pub fn reload(&self) -> Result<Arc<PolicySnapshot>, DitteauError> {
        let dir = self.source.as_deref().ok_or(DitteauError::NoReloadSource)?;
        match load_snapshot(dir) {
            Ok(snapshot) => {
                self.replace(snapshot);
                Ok(self.load())
            }
            Err(e) => {
                error!(path = ?dir, error = %e, "Reload failed; keeping active snapshot");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::governance::{
        AttributeType, ColumnBinding, Condition, EvaluationContext, Evaluator, PolicyBinding,
        RoleRegistry, RolePredicate, RowAccessRule, Value,
    };
    use anyhow::Result;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn snapshot(allowed: &str) -> Result<PolicySnapshot> {
        let roles = RoleRegistry::builder()
            .role("REGISTRAR_ANALYST_ROLE", Vec::<String>::new())
            .build()?;
        let mut builder = PolicySnapshot::builder(allowed, roles);
        let rule = builder.add_row_access_policy(
            RowAccessRule::new("status_access", AttributeType::String).with_case(
                RolePredicate::any_of(["REGISTRAR_ANALYST_ROLE"]),
                Condition::Equals(Value::from(allowed)),
            )?,
        )?;
        builder.add_binding(
            PolicyBinding::new("student_enrollment")
                .with_column(ColumnBinding::new("enrollment_status", AttributeType::String))?
                .with_row_filter(rule, "enrollment_status")?,
        )?;
        Ok(builder.build())
    }

    fn row(status: &str) -> BTreeMap<String, Value> {
        BTreeMap::from([("enrollment_status".to_string(), Value::from(status))])
    }

    #[test]
    fn test_readers_keep_their_snapshot_across_replace() -> Result<()> {
        let store = PolicyStore::new(snapshot("ENROLLED")?);
        let held = store.load();

        let previous = store.replace(snapshot("WITHDRAWN")?);
        assert_eq!(previous.name(), "ENROLLED");
        assert_eq!(held.name(), "ENROLLED");
        assert_eq!(store.load().name(), "WITHDRAWN");
        Ok(())
    }

    #[test]
    fn test_concurrent_evaluation_against_shared_snapshot() -> Result<()> {
        let store = PolicyStore::new(snapshot("ENROLLED")?);
        let ctx = EvaluationContext::new(
            "REGISTRAR_ANALYST_ROLE",
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
        );

        std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let store = &store;
                    let ctx = &ctx;
                    s.spawn(move || {
                        let snap = store.load();
                        let status = if i % 2 == 0 { "ENROLLED" } else { "DROPPED" };
                        let decision = Evaluator::new(&snap).decide(ctx, "student_enrollment", &row(status));
                        (i, decision.visible)
                    })
                })
                .collect();

            for h in handles {
                let (i, visible) = h.join().unwrap();
                assert_eq!(visible, i % 2 == 0);
            }
        });
        Ok(())
    }

    #[test]
    fn test_reload_without_source_fails() -> Result<()> {
        let store = PolicyStore::new(snapshot("ENROLLED")?);
        assert!(matches!(store.reload(), Err(DitteauError::NoReloadSource)));
        Ok(())
    }

    #[test]
    fn test_failed_reload_keeps_active_snapshot() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(
            dir.path().join("ditteau.yaml"),
            "name: v1\nroles: [{name: R}]\n",
        )?;
        let store = PolicyStore::open(dir.path())?;
        assert_eq!(store.load().name(), "v1");

        std::fs::write(
            dir.path().join("ditteau.yaml"),
            "name: v2\nroles: [{name: R, inherits: [R]}]\n",
        )?;
        assert!(store.reload().is_err());
        assert_eq!(store.load().name(), "v1");

        std::fs::write(dir.path().join("ditteau.yaml"), "name: v3\nroles: [{name: R}]\n")?;
        assert_eq!(store.reload()?.name(), "v3");
        Ok(())
    }
}
