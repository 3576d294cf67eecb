//! Shared test helpers: a scripted rule service that records every call.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use fwrule::clients::ClientResult;
use fwrule::{ClientError, FilterRef, RemoteRule, RuleAction, RuleClient};

/// A call received by the stub.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create { zone_id: String, rules: Vec<RemoteRule> },
    Get { zone_id: String, id: String },
    Update { zone_id: String, rule: RemoteRule },
    Delete { zone_id: String, id: String },
}

/// Rule service stub answering from per-operation queues.
///
/// An empty queue answers with a transport error so unexpected calls fail loudly.
#[derive(Default)]
pub struct StubClient {
    calls: Mutex<Vec<Call>>,
    creates: Mutex<VecDeque<ClientResult<Vec<RemoteRule>>>>,
    gets: Mutex<VecDeque<ClientResult<RemoteRule>>>,
    updates: Mutex<VecDeque<ClientResult<RemoteRule>>>,
    deletes: Mutex<VecDeque<ClientResult<()>>>,
}

impl StubClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_create(&self, result: ClientResult<Vec<RemoteRule>>) -> &Self {
        self.creates.lock().unwrap().push_back(result);
        self
    }

    pub fn on_get(&self, result: ClientResult<RemoteRule>) -> &Self {
        self.gets.lock().unwrap().push_back(result);
        self
    }

    pub fn on_update(&self, result: ClientResult<RemoteRule>) -> &Self {
        self.updates.lock().unwrap().push_back(result);
        self
    }

    pub fn on_delete(&self, result: ClientResult<()>) -> &Self {
        self.deletes.lock().unwrap().push_back(result);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn updates_sent(&self) -> Vec<RemoteRule> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Update { rule, .. } => Some(rule),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn next<T>(queue: &Mutex<VecDeque<ClientResult<T>>>, op: &str) -> ClientResult<T> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::transport(format!("unexpected {} call", op))))
    }
}

#[async_trait]
impl RuleClient for StubClient {
    async fn create_rules(
        &self,
        zone_id: &str,
        rules: Vec<RemoteRule>,
    ) -> ClientResult<Vec<RemoteRule>> {
        self.record(Call::Create {
            zone_id: zone_id.to_string(),
            rules,
        });
        Self::next(&self.creates, "create")
    }

    async fn get_rule(&self, zone_id: &str, id: &str) -> ClientResult<RemoteRule> {
        self.record(Call::Get {
            zone_id: zone_id.to_string(),
            id: id.to_string(),
        });
        Self::next(&self.gets, "get")
    }

    async fn update_rule(&self, zone_id: &str, rule: RemoteRule) -> ClientResult<RemoteRule> {
        self.record(Call::Update {
            zone_id: zone_id.to_string(),
            rule,
        });
        Self::next(&self.updates, "update")
    }

    async fn delete_rule(&self, zone_id: &str, id: &str) -> ClientResult<()> {
        self.record(Call::Delete {
            zone_id: zone_id.to_string(),
            id: id.to_string(),
        });
        Self::next(&self.deletes, "delete")
    }
}

/// A remote record as the service would store it.
pub fn remote_rule(id: &str, filter_id: &str, action: RuleAction) -> RemoteRule {
    RemoteRule {
        id: id.to_string(),
        filter: FilterRef {
            id: filter_id.to_string(),
        },
        paused: false,
        description: None,
        action,
        priority: None,
        products: None,
    }
}
