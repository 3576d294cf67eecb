//! Rule agent - the host side of the lifecycle.
//!
//! Persists one local state per named rule under the state directory, drives
//! the reconciler for each command, and snapshots the rule service between
//! invocations.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::clients::MemoryRuleClient;
use crate::error::LifecycleError;
use crate::model::{Binding, DesiredRule, LocalState};
use crate::reconciler::{FirewallRuleReconciler, ReadOutcome, Reconciler, ReconcilerConfig};

const SERVICE_FILE: &str = "service.json";
const STATE_DIR: &str = "state";

/// Host agent that owns local states and the rule service snapshot.
pub struct RuleAgent {
    state_dir: PathBuf,
    service: Arc<MemoryRuleClient>,
    reconciler: FirewallRuleReconciler,
}

impl RuleAgent {
    /// Open (or initialize) an agent rooted at `state_dir`.
    pub async fn open(state_dir: &Path, config: ReconcilerConfig) -> Result<Self> {
        tokio::fs::create_dir_all(state_dir.join(STATE_DIR))
            .await
            .with_context(|| format!("Failed to create state directory {}", state_dir.display()))?;

        let service = Arc::new(
            MemoryRuleClient::load(&state_dir.join(SERVICE_FILE))
                .await
                .context("Failed to load rule service snapshot")?,
        );
        let reconciler = FirewallRuleReconciler::with_config(service.clone(), config);

        Ok(Self {
            state_dir: state_dir.to_path_buf(),
            service,
            reconciler,
        })
    }

    /// The rule service this agent reconciles against.
    pub fn service(&self) -> &MemoryRuleClient {
        &self.service
    }

    /// Create a rule and record its state under `name`.
    pub async fn create(&self, name: &str, desired: &DesiredRule) -> Result<LocalState> {
        let path = self.state_path(name)?;
        if tokio::fs::try_exists(&path).await? {
            bail!("Rule {} already exists, use update instead", name);
        }

        let result = self.reconciler.create(desired).await;
        let persisted = self.persist_service().await;

        let state = match result {
            Ok(state) => state,
            Err(e) => {
                if let LifecycleError::ReadBack { state, .. } = &e {
                    // The remote rule exists; keep the binding so it is not orphaned.
                    self.store_state(name, state).await?;
                }
                Self::report_persist_failure(&persisted);
                return Err(e.into());
            }
        };
        persisted?;

        match state.binding() {
            Binding::Unbound => bail!("Rule {} was created but no longer exists remotely", name),
            Binding::Bound(id) => info!("Created rule {} ({})", name, id),
        }
        self.store_state(name, &state).await?;
        Ok(state)
    }

    /// Refresh the state of `name`. Returns `None` if the remote rule is gone.
    pub async fn read(&self, name: &str) -> Result<Option<LocalState>> {
        let mut state = self.load_state(name).await?;
        let outcome = self.reconciler.read(&mut state).await?;
        self.settle(name, state, outcome).await
    }

    /// Replace the remote rule of `name` with `desired`.
    pub async fn update(&self, name: &str, desired: &DesiredRule) -> Result<Option<LocalState>> {
        let mut state = self.load_state(name).await?;
        let result = self.reconciler.update(&mut state, desired).await;
        let persisted = self.persist_service().await;
        if result.is_err() {
            Self::report_persist_failure(&persisted);
        }
        let outcome = result?;
        persisted?;
        self.settle(name, state, outcome).await
    }

    /// Delete the remote rule of `name` and forget its state.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let state = self.load_state(name).await?;
        let result = self.reconciler.delete(&state).await;
        let persisted = self.persist_service().await;
        if result.is_err() {
            Self::report_persist_failure(&persisted);
        }
        result?;
        persisted?;

        self.drop_state(name).await?;
        info!("Deleted rule {}", name);
        Ok(())
    }

    /// Adopt an existing remote rule under `name`.
    pub async fn import(&self, name: &str, token: &str) -> Result<LocalState> {
        let path = self.state_path(name)?;
        if tokio::fs::try_exists(&path).await? {
            bail!("Rule {} already exists", name);
        }

        let state = self.reconciler.import(token).await?;
        match state.binding() {
            Binding::Unbound => bail!("Cannot import {}: firewall rule does not exist", token),
            Binding::Bound(id) => {
                info!("Imported rule {} ({}) from zone {}", name, id, state.zone_id)
            }
        }

        self.store_state(name, &state).await?;
        Ok(state)
    }

    /// Local state of `name` as last recorded, without contacting the service.
    pub async fn show(&self, name: &str) -> Result<LocalState> {
        self.load_state(name).await
    }

    async fn settle(
        &self,
        name: &str,
        state: LocalState,
        outcome: ReadOutcome,
    ) -> Result<Option<LocalState>> {
        match outcome {
            ReadOutcome::Present => {
                self.store_state(name, &state).await?;
                Ok(Some(state))
            }
            ReadOutcome::Gone => {
                warn!("Rule {} no longer exists remotely, dropping local state", name);
                self.drop_state(name).await?;
                Ok(None)
            }
        }
    }

    fn state_path(&self, name: &str) -> Result<PathBuf> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            bail!("Invalid rule name: {:?}", name);
        }
        Ok(self
            .state_dir
            .join(STATE_DIR)
            .join(format!("{}.json", name)))
    }

    async fn load_state(&self, name: &str) -> Result<LocalState> {
        let path = self.state_path(name)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => bail!("Unknown rule: {}", name),
            Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
        };
        serde_json::from_slice(&bytes).with_context(|| format!("Corrupt state file {}", path.display()))
    }

    async fn store_state(&self, name: &str, state: &LocalState) -> Result<()> {
        let path = self.state_path(name)?;
        let bytes = serde_json::to_vec_pretty(state)?;
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    async fn drop_state(&self, name: &str) -> Result<()> {
        let path = self.state_path(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }

    /// Log a snapshot failure that is about to be shadowed by a lifecycle error.
    fn report_persist_failure(persisted: &Result<()>) {
        if let Err(e) = persisted {
            warn!("{:#}", e);
        }
    }

    async fn persist_service(&self) -> Result<()> {
        self.service
            .save(&self.state_dir.join(SERVICE_FILE))
            .await
            .context("Failed to save rule service snapshot")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::RuleClient;
    use crate::model::{RuleAction, RuleFields};
    use tempfile::TempDir;

    fn desired() -> DesiredRule {
        DesiredRule::new("zone-a", RuleFields::new("filter-1", RuleAction::Block))
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = TempDir::new().unwrap();

        let agent = RuleAgent::open(dir.path(), ReconcilerConfig::default())
            .await
            .unwrap();
        let created = agent.create("edge", &desired()).await.unwrap();
        assert!(agent.create("edge", &desired()).await.is_err());
        drop(agent);

        let agent = RuleAgent::open(dir.path(), ReconcilerConfig::default())
            .await
            .unwrap();
        assert_eq!(agent.show("edge").await.unwrap(), created);
        let read = agent.read("edge").await.unwrap().unwrap();
        assert_eq!(read, created);
    }

    #[tokio::test]
    async fn test_read_drops_state_of_vanished_rule() {
        let dir = TempDir::new().unwrap();
        let agent = RuleAgent::open(dir.path(), ReconcilerConfig::default())
            .await
            .unwrap();
        let state = agent.create("edge", &desired()).await.unwrap();
        agent
            .service()
            .remove("zone-a", state.id.as_deref().unwrap())
            .await
            .unwrap();

        assert!(agent.read("edge").await.unwrap().is_none());
        assert!(agent.show("edge").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_and_import() {
        let dir = TempDir::new().unwrap();
        let agent = RuleAgent::open(dir.path(), ReconcilerConfig::default())
            .await
            .unwrap();
        let state = agent.create("edge", &desired()).await.unwrap();
        let id = state.id.clone().unwrap();

        // Adopt the same rule under a second name
        let token = format!("zone-a/{}", id);
        let imported = agent.import("adopted", &token).await.unwrap();
        assert_eq!(imported.fields, state.fields);

        agent.delete("edge").await.unwrap();
        assert!(agent.show("edge").await.is_err());
        assert!(agent.service().get_rule("zone-a", &id).await.is_err());

        // The adopted record now points at nothing; strict delete fails
        assert!(agent.delete("adopted").await.is_err());
        assert!(agent.import("other", &token).await.is_err());
        assert!(agent.import("other", "no-separator").await.is_err());
    }

    #[tokio::test]
    async fn test_lifecycle_error_wins_over_snapshot_failure() {
        let dir = TempDir::new().unwrap();
        let agent = RuleAgent::open(dir.path(), ReconcilerConfig::default())
            .await
            .unwrap();
        let state = agent.create("edge", &desired()).await.unwrap();
        agent.create("other", &desired()).await.unwrap();
        agent
            .service()
            .remove("zone-a", state.id.as_deref().unwrap())
            .await
            .unwrap();

        // Snapshot writes fail from here on
        let snapshot = dir.path().join(SERVICE_FILE);
        std::fs::remove_file(&snapshot).unwrap();
        std::fs::create_dir(&snapshot).unwrap();

        let err = agent.delete("edge").await.unwrap_err();
        match err.downcast_ref::<LifecycleError>() {
            Some(LifecycleError::Delete { id, source, .. }) => {
                assert_eq!(Some(id.as_str()), state.id.as_deref());
                assert!(source.is_not_found());
            }
            other => panic!("expected delete failure, got {:?}", other),
        }

        // Without a lifecycle error the snapshot failure is reported
        let err = agent.delete("other").await.unwrap_err();
        assert!(err.downcast_ref::<LifecycleError>().is_none());
        assert!(err.to_string().contains("snapshot"));
        assert!(agent.show("other").await.is_ok());
    }

    #[tokio::test]
    async fn test_rejects_path_like_names() {
        let dir = TempDir::new().unwrap();
        let agent = RuleAgent::open(dir.path(), ReconcilerConfig::default())
            .await
            .unwrap();
        assert!(agent.create("../escape", &desired()).await.is_err());
        assert!(agent.show("").await.is_err());
    }
}
