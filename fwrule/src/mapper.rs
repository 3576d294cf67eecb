//! Translation between local rule fields and the remote rule record.
//!
//! Both directions are pure. `to_remote` does not merge with prior remote
//! state: every unset field is written as the remote zero value.

use crate::model::{FilterRef, RemoteRule, RuleFields};

/// Build the remote payload for `fields`. `id` is `None` for creation.
pub fn to_remote(fields: &RuleFields, id: Option<&str>) -> RemoteRule {
    RemoteRule {
        id: id.unwrap_or_default().to_string(),
        filter: FilterRef {
            id: fields.filter_id.clone(),
        },
        paused: fields.paused,
        description: fields.description.clone(),
        action: fields.action,
        priority: fields.priority,
        // BTreeSet iteration is sorted, so the payload order is stable.
        products: fields
            .products
            .as_ref()
            .map(|products| products.iter().cloned().collect()),
    }
}

/// Flatten a remote record back into local fields. Product order is dropped.
pub fn to_local(remote: &RemoteRule) -> RuleFields {
    RuleFields {
        filter_id: remote.filter.id.clone(),
        description: remote.description.clone(),
        paused: remote.paused,
        action: remote.action,
        priority: remote.priority,
        products: remote
            .products
            .as_ref()
            .map(|products| products.iter().cloned().collect()),
    }
}
