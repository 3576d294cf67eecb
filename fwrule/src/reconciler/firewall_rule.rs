//! Firewall rule reconciler - manages zone firewall rules via the rule service.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{ReadOutcome, Reconciler, ReconcilerConfig};
use crate::clients::RuleClient;
use crate::error::{ClientError, LifecycleError, Operation, Result};
use crate::import::ImportId;
use crate::mapper;
use crate::model::{DesiredRule, LocalState, RuleFields};

/// Firewall rule reconciler that interacts with a [`RuleClient`].
pub struct FirewallRuleReconciler {
    client: Arc<dyn RuleClient>,
    config: ReconcilerConfig,
}

impl FirewallRuleReconciler {
    pub fn new(client: Arc<dyn RuleClient>) -> Self {
        Self::with_config(client, ReconcilerConfig::default())
    }

    pub fn with_config(client: Arc<dyn RuleClient>, config: ReconcilerConfig) -> Self {
        Self { client, config }
    }

    /// Get a rule and map it to local fields. `Ok(None)` means the rule is gone.
    async fn fetch(
        &self,
        zone_id: &str,
        id: &str,
    ) -> std::result::Result<Option<RuleFields>, ClientError> {
        match self.client.get_rule(zone_id, id).await {
            Ok(remote) => {
                debug!("Firewall rule read configuration: {:?}", remote);
                Ok(Some(mapper::to_local(&remote)))
            }
            Err(e) if e.is_not_found() => {
                info!("Firewall rule {} no longer exists in zone {}", id, zone_id);
                Ok(None)
            }
            Err(e) => {
                debug!("Firewall rule {} read error: {:?}", id, e);
                Err(e)
            }
        }
    }

    /// Apply a fetch result to `state`.
    fn apply(state: &mut LocalState, fetched: Option<RuleFields>) -> ReadOutcome {
        match fetched {
            Some(fields) => {
                state.fields = Some(fields);
                ReadOutcome::Present
            }
            None => {
                state.unbind();
                ReadOutcome::Gone
            }
        }
    }

    fn bound_id(state: &LocalState, operation: Operation) -> Result<String> {
        state
            .id
            .clone()
            .ok_or(LifecycleError::NotBound { operation })
    }
}

#[async_trait]
impl Reconciler for FirewallRuleReconciler {
    type Desired = DesiredRule;
    type State = LocalState;

    async fn create(&self, desired: &DesiredRule) -> Result<LocalState> {
        let zone_id = &desired.zone_id;
        let payload = mapper::to_remote(&desired.fields, None);
        debug!("Creating firewall rule from struct: {:?}", payload);

        let created = self
            .client
            .create_rules(zone_id, vec![payload])
            .await
            .map_err(|source| LifecycleError::Create {
                zone_id: zone_id.clone(),
                source,
            })?;

        let id = match created.into_iter().next() {
            Some(rule) if !rule.id.is_empty() => rule.id,
            _ => {
                return Err(LifecycleError::EmptyResponse {
                    operation: Operation::Create,
                    zone_id: zone_id.clone(),
                })
            }
        };

        info!("Firewall rule ID: {}", id);
        let mut state = LocalState::bound(zone_id.clone(), id.clone());

        // The service may fill in defaults, so mirror what it stored.
        match self.fetch(zone_id, &id).await {
            Ok(fetched) => {
                if Self::apply(&mut state, fetched) == ReadOutcome::Gone {
                    warn!("Firewall rule {} vanished right after creation", id);
                }
                Ok(state)
            }
            Err(source) => Err(LifecycleError::ReadBack {
                zone_id: zone_id.clone(),
                id,
                state: Box::new(state),
                source,
            }),
        }
    }

    async fn read(&self, state: &mut LocalState) -> Result<ReadOutcome> {
        let id = Self::bound_id(state, Operation::Read)?;
        let fetched = self
            .fetch(&state.zone_id, &id)
            .await
            .map_err(|source| LifecycleError::Read {
                zone_id: state.zone_id.clone(),
                id: id.clone(),
                source,
            })?;
        Ok(Self::apply(state, fetched))
    }

    async fn update(&self, state: &mut LocalState, desired: &DesiredRule) -> Result<ReadOutcome> {
        let id = Self::bound_id(state, Operation::Update)?;
        if desired.zone_id != state.zone_id {
            return Err(LifecycleError::ZoneChanged {
                bound: state.zone_id.clone(),
                requested: desired.zone_id.clone(),
            });
        }

        let payload = mapper::to_remote(&desired.fields, Some(&id));
        debug!("Updating firewall rule from struct: {:?}", payload);

        let updated = self
            .client
            .update_rule(&state.zone_id, payload)
            .await
            .map_err(|source| LifecycleError::Update {
                zone_id: state.zone_id.clone(),
                id: id.clone(),
                source,
            })?;

        if updated.id.is_empty() {
            return Err(LifecycleError::EmptyResponse {
                operation: Operation::Update,
                zone_id: state.zone_id.clone(),
            });
        }

        let outcome = self.read(state).await?;
        if outcome == ReadOutcome::Gone {
            warn!("Firewall rule {} vanished right after update", id);
        }
        Ok(outcome)
    }

    async fn delete(&self, state: &LocalState) -> Result<()> {
        let id = Self::bound_id(state, Operation::Delete)?;
        info!("Deleting firewall rule: id {} for zone {}", id, state.zone_id);

        match self.client.delete_rule(&state.zone_id, &id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() && self.config.idempotent_delete => {
                info!("Firewall rule {} was already deleted", id);
                Ok(())
            }
            Err(source) => Err(LifecycleError::Delete {
                zone_id: state.zone_id.clone(),
                id,
                source,
            }),
        }
    }

    async fn import(&self, token: &str) -> Result<LocalState> {
        let import_id = ImportId::parse(token)?;
        debug!(
            "Importing firewall rule: id {} for zone {}",
            import_id.rule_id, import_id.zone_id
        );

        let mut state = LocalState::bound(import_id.zone_id, import_id.rule_id);
        if self.read(&mut state).await? == ReadOutcome::Gone {
            warn!("Imported firewall rule {} does not exist", token);
        }
        Ok(state)
    }
}
