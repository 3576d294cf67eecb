//! Reconcilers for remote resource types.
//!
//! A reconciler drives one local record through its lifecycle against the
//! remote service. The host calls one operation at a time per record.

pub mod firewall_rule;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use firewall_rule::FirewallRuleReconciler;

/// Result of reading a bound record back from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The remote object exists and local fields were replaced with it.
    Present,
    /// The remote object is gone; the local binding was cleared.
    Gone,
}

/// Reconciler behaviour knobs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Treat "not found" on delete as success instead of a failure.
    #[serde(default)]
    pub idempotent_delete: bool,
}

/// Trait for resource reconcilers.
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// Desired state supplied by the host.
    type Desired: Send + Sync;
    /// Local state owned by the host.
    type State: Send + Sync;

    /// Create the remote object and return the hydrated local state.
    async fn create(&self, desired: &Self::Desired) -> Result<Self::State>;

    /// Refresh local state from the remote object.
    async fn read(&self, state: &mut Self::State) -> Result<ReadOutcome>;

    /// Replace the remote object with `desired`, then refresh.
    async fn update(&self, state: &mut Self::State, desired: &Self::Desired)
        -> Result<ReadOutcome>;

    /// Delete the remote object.
    async fn delete(&self, state: &Self::State) -> Result<()>;

    /// Adopt an existing remote object identified by an import token.
    async fn import(&self, token: &str) -> Result<Self::State>;
}
