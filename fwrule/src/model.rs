//! Firewall rule data model: desired state, remote record, and local state.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Action taken on traffic matching the rule's filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Block,
    Challenge,
    JsChallenge,
    ManagedChallenge,
    Allow,
    Log,
    Bypass,
}

impl RuleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleAction::Block => "block",
            RuleAction::Challenge => "challenge",
            RuleAction::JsChallenge => "js_challenge",
            RuleAction::ManagedChallenge => "managed_challenge",
            RuleAction::Allow => "allow",
            RuleAction::Log => "log",
            RuleAction::Bypass => "bypass",
        }
    }
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "block" => Ok(RuleAction::Block),
            "challenge" => Ok(RuleAction::Challenge),
            "js_challenge" => Ok(RuleAction::JsChallenge),
            "managed_challenge" => Ok(RuleAction::ManagedChallenge),
            "allow" => Ok(RuleAction::Allow),
            "log" => Ok(RuleAction::Log),
            "bypass" => Ok(RuleAction::Bypass),
            other => Err(format!("unknown rule action: {}", other)),
        }
    }
}

/// Mirrored rule fields, shared by desired and local state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFields {
    /// Id of the previously created filter (match expression).
    pub filter_id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub paused: bool,
    pub action: RuleAction,
    #[serde(default)]
    pub priority: Option<i64>,
    /// Products the `bypass` action skips.
    #[serde(default)]
    pub products: Option<BTreeSet<String>>,
}

impl RuleFields {
    pub fn new(filter_id: impl Into<String>, action: RuleAction) -> Self {
        Self {
            filter_id: filter_id.into(),
            description: None,
            paused: false,
            action,
            priority: None,
            products: None,
        }
    }
}

/// Desired state the host wants reflected remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredRule {
    pub zone_id: String,
    #[serde(flatten)]
    pub fields: RuleFields,
}

impl DesiredRule {
    pub fn new(zone_id: impl Into<String>, fields: RuleFields) -> Self {
        Self {
            zone_id: zone_id.into(),
            fields,
        }
    }
}

/// Reference to a filter object, nested in the remote rule record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRef {
    pub id: String,
}

/// Rule record as exchanged with the rule service.
///
/// Unset optional fields are sent as explicit `null` so the service resets
/// them to its own zero value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRule {
    /// Assigned by the service; empty in create payloads.
    #[serde(default)]
    pub id: String,
    pub filter: FilterRef,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub description: Option<String>,
    pub action: RuleAction,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub products: Option<Vec<String>>,
}

/// Binding between a local record and a remote object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding<'a> {
    Unbound,
    Bound(&'a str),
}

/// Local state owned by the host and mutated only by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalState {
    pub zone_id: String,
    /// Set iff a remote object is known to exist for this record.
    #[serde(default)]
    pub id: Option<String>,
    /// Fields as last read from the service.
    #[serde(default)]
    pub fields: Option<RuleFields>,
}

impl LocalState {
    pub fn unbound(zone_id: impl Into<String>) -> Self {
        Self {
            zone_id: zone_id.into(),
            id: None,
            fields: None,
        }
    }

    pub fn bound(zone_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            zone_id: zone_id.into(),
            id: Some(id.into()),
            fields: None,
        }
    }

    pub fn binding(&self) -> Binding<'_> {
        match self.id.as_deref() {
            Some(id) => Binding::Bound(id),
            None => Binding::Unbound,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.id.is_some()
    }

    /// Drop the binding after the remote object was found gone.
    pub(crate) fn unbind(&mut self) {
        self.id = None;
        self.fields = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_str_roundtrip() {
        for action in [
            RuleAction::Block,
            RuleAction::Challenge,
            RuleAction::JsChallenge,
            RuleAction::ManagedChallenge,
            RuleAction::Allow,
            RuleAction::Log,
            RuleAction::Bypass,
        ] {
            assert_eq!(action.as_str().parse::<RuleAction>().unwrap(), action);
        }
        assert!("deny".parse::<RuleAction>().is_err());
    }

    #[test]
    fn test_desired_rule_json_is_flat() {
        let json = r#"{
            "zone_id": "zone-a",
            "filter_id": "filter-1",
            "action": "js_challenge",
            "products": ["waf", "uaBlock"]
        }"#;
        let desired: DesiredRule = serde_json::from_str(json).unwrap();
        assert_eq!(desired.zone_id, "zone-a");
        assert_eq!(desired.fields.filter_id, "filter-1");
        assert_eq!(desired.fields.action, RuleAction::JsChallenge);
        assert!(!desired.fields.paused);
        assert_eq!(desired.fields.priority, None);
        assert_eq!(desired.fields.products.unwrap().len(), 2);
    }

    #[test]
    fn test_remote_rule_serializes_unset_fields_as_null() {
        let remote = RemoteRule {
            id: String::new(),
            filter: FilterRef {
                id: "filter-1".to_string(),
            },
            paused: false,
            description: None,
            action: RuleAction::Block,
            priority: None,
            products: None,
        };
        let value = serde_json::to_value(&remote).unwrap();
        assert!(value["description"].is_null());
        assert!(value.as_object().unwrap().contains_key("priority"));
        assert_eq!(value["filter"]["id"], "filter-1");
        assert_eq!(value["action"], "block");
    }

    #[test]
    fn test_binding() {
        let mut state = LocalState::bound("zone-a", "rule-1");
        assert_eq!(state.binding(), Binding::Bound("rule-1"));

        state.unbind();
        assert_eq!(state.binding(), Binding::Unbound);
        assert!(!state.is_bound());
        assert_eq!(state.zone_id, "zone-a");
    }
}
