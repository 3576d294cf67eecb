//! In-process rule service.
//!
//! Keeps rules per zone in memory and can persist them as a JSON snapshot,
//! which lets the CLI run lifecycle operations across invocations.

use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind as IoErrorKind;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::{ClientResult, RuleClient};
use crate::error::ClientError;
use crate::model::RemoteRule;

type Zones = HashMap<String, BTreeMap<String, RemoteRule>>;

/// Rule service backed by a map of zone id to rules.
#[derive(Default)]
pub struct MemoryRuleClient {
    zones: Mutex<Zones>,
}

impl MemoryRuleClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot written by [`save`](Self::save). A missing file yields an empty service.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let zones = match tokio::fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == IoErrorKind::NotFound => Zones::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            zones: Mutex::new(zones),
        })
    }

    /// Write all zones to `path` as JSON.
    pub async fn save(&self, path: &Path) -> anyhow::Result<()> {
        let zones = self.zones.lock().await;
        let sorted: BTreeMap<&String, &BTreeMap<String, RemoteRule>> = zones.iter().collect();
        let bytes = serde_json::to_vec_pretty(&sorted)?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    /// Store a rule as-is, bypassing validation. Used to stage out-of-band state.
    pub async fn insert(&self, zone_id: &str, rule: RemoteRule) {
        let mut zones = self.zones.lock().await;
        zones
            .entry(zone_id.to_string())
            .or_default()
            .insert(rule.id.clone(), rule);
    }

    /// Remove a rule without going through the client interface.
    pub async fn remove(&self, zone_id: &str, id: &str) -> Option<RemoteRule> {
        let mut zones = self.zones.lock().await;
        zones.get_mut(zone_id).and_then(|rules| rules.remove(id))
    }

    /// List all rules of a zone in id order.
    pub async fn list_rules(&self, zone_id: &str) -> Vec<RemoteRule> {
        let zones = self.zones.lock().await;
        zones
            .get(zone_id)
            .map(|rules| rules.values().cloned().collect())
            .unwrap_or_default()
    }

    fn validate(rule: &RemoteRule) -> ClientResult<()> {
        if rule.filter.id.trim().is_empty() {
            return Err(ClientError::invalid("filter id is required"));
        }
        Ok(())
    }
}

#[async_trait]
impl RuleClient for MemoryRuleClient {
    async fn create_rules(
        &self,
        zone_id: &str,
        rules: Vec<RemoteRule>,
    ) -> ClientResult<Vec<RemoteRule>> {
        for rule in &rules {
            Self::validate(rule)?;
        }

        let mut zones = self.zones.lock().await;
        let zone = zones.entry(zone_id.to_string()).or_default();
        let created = rules
            .into_iter()
            .map(|mut rule| {
                rule.id = Uuid::new_v4().simple().to_string();
                debug!("Storing rule {} in zone {}", rule.id, zone_id);
                zone.insert(rule.id.clone(), rule.clone());
                rule
            })
            .collect();
        Ok(created)
    }

    async fn get_rule(&self, zone_id: &str, id: &str) -> ClientResult<RemoteRule> {
        let zones = self.zones.lock().await;
        zones
            .get(zone_id)
            .and_then(|rules| rules.get(id))
            .cloned()
            .ok_or_else(|| ClientError::not_found(format!("rule {} in zone {}", id, zone_id)))
    }

    async fn update_rule(&self, zone_id: &str, rule: RemoteRule) -> ClientResult<RemoteRule> {
        Self::validate(&rule)?;

        let mut zones = self.zones.lock().await;
        let stored = zones
            .get_mut(zone_id)
            .and_then(|rules| rules.get_mut(&rule.id))
            .ok_or_else(|| {
                ClientError::not_found(format!("rule {} in zone {}", rule.id, zone_id))
            })?;
        *stored = rule;
        Ok(stored.clone())
    }

    async fn delete_rule(&self, zone_id: &str, id: &str) -> ClientResult<()> {
        let mut zones = self.zones.lock().await;
        zones
            .get_mut(zone_id)
            .and_then(|rules| rules.remove(id))
            .map(|_| ())
            .ok_or_else(|| ClientError::not_found(format!("rule {} in zone {}", id, zone_id)))
    }
}
