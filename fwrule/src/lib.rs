//! fwrule: lifecycle reconciliation for zone firewall rules.
//!
//! A firewall rule references a previously created filter (match expression)
//! and is reconciled against the remote rule service through create, read,
//! update, delete and import.
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use fwrule::{DesiredRule, FirewallRuleReconciler, MemoryRuleClient, Reconciler, RuleAction, RuleFields};
//!
//! let reconciler = FirewallRuleReconciler::new(Arc::new(MemoryRuleClient::new()));
//! let desired = DesiredRule::new("zone-a", RuleFields::new("filter-1", RuleAction::Block));
//! let mut state = reconciler.create(&desired).await?;
//! reconciler.read(&mut state).await?;
//! ```

pub mod agent;
pub mod clients;
pub mod error;
pub mod import;
pub mod mapper;
pub mod model;
pub mod reconciler;

// Re-export commonly used types at crate root
pub use agent::RuleAgent;
pub use clients::{MemoryRuleClient, RuleClient};
pub use error::{ClientError, ErrorClass, ErrorKind, LifecycleError, Operation};
pub use import::ImportId;
pub use model::{Binding, DesiredRule, FilterRef, LocalState, RemoteRule, RuleAction, RuleFields};
pub use reconciler::{FirewallRuleReconciler, ReadOutcome, Reconciler, ReconcilerConfig};
