//! Clients for the remote rule service.
//!
//! The controller only sees the [`RuleClient`] trait; transport, auth and
//! retry policy live behind it.
//! - memory: in-process service used by the CLI and tests

pub mod memory;

use async_trait::async_trait;

use crate::error::ClientError;
use crate::model::RemoteRule;

pub use memory::MemoryRuleClient;

/// Result type for rule service calls.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Remote rule service, scoped by zone.
#[async_trait]
pub trait RuleClient: Send + Sync {
    /// Create rules in a zone, returning the stored records with their ids.
    async fn create_rules(&self, zone_id: &str, rules: Vec<RemoteRule>)
        -> ClientResult<Vec<RemoteRule>>;

    /// Get a rule by id.
    async fn get_rule(&self, zone_id: &str, id: &str) -> ClientResult<RemoteRule>;

    /// Replace a rule. `rule.id` addresses the rule.
    async fn update_rule(&self, zone_id: &str, rule: RemoteRule) -> ClientResult<RemoteRule>;

    /// Delete a rule by id.
    async fn delete_rule(&self, zone_id: &str, id: &str) -> ClientResult<()>;
}
