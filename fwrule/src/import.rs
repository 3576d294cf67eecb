//! Composite import identifiers of the form `<zone_id>/<rule_id>`.

use std::fmt;
use std::str::FromStr;

use crate::error::LifecycleError;

/// Zone and rule id of a pre-existing remote rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportId {
    pub zone_id: String,
    pub rule_id: String,
}

impl ImportId {
    pub fn new(zone_id: impl Into<String>, rule_id: impl Into<String>) -> Self {
        Self {
            zone_id: zone_id.into(),
            rule_id: rule_id.into(),
        }
    }

    /// Split on the first `/`. Both segments must be non-empty; any further
    /// `/` stays in the rule id.
    pub fn parse(token: &str) -> Result<Self, LifecycleError> {
        match token.split_once('/') {
            Some((zone_id, rule_id)) if !zone_id.is_empty() && !rule_id.is_empty() => {
                Ok(Self::new(zone_id, rule_id))
            }
            _ => Err(LifecycleError::MalformedImportToken(token.to_string())),
        }
    }
}

impl FromStr for ImportId {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ImportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.zone_id, self.rule_id)
    }
}
