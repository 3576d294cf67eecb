//! Error types for the rule service boundary and the lifecycle controller.

use std::fmt;

use thiserror::Error;

use crate::model::LocalState;

/// Classification a [`RuleClient`](crate::clients::RuleClient) attaches to every failure.
///
/// The controller decides on absence by matching this kind, so clients must
/// map their own "does not exist" responses onto [`ErrorKind::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The addressed object does not exist (HTTP 404 or equivalent).
    NotFound,
    /// The service rejected the payload.
    Invalid,
    /// The request did not complete (connection, timeout, 5xx).
    Transport,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::Invalid => "invalid",
            ErrorKind::Transport => "transport",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by the rule service client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ClientError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ClientError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Invalid, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

/// Lifecycle operation named in usage and contract errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced to the host by lifecycle operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("error creating firewall rule for zone {zone_id:?}: {source}")]
    Create {
        zone_id: String,
        #[source]
        source: ClientError,
    },

    #[error("error finding firewall rule {id:?} in zone {zone_id:?}: {source}")]
    Read {
        zone_id: String,
        id: String,
        #[source]
        source: ClientError,
    },

    #[error("error updating firewall rule {id:?} in zone {zone_id:?}: {source}")]
    Update {
        zone_id: String,
        id: String,
        #[source]
        source: ClientError,
    },

    #[error("error deleting firewall rule {id:?} in zone {zone_id:?}: {source}")]
    Delete {
        zone_id: String,
        id: String,
        #[source]
        source: ClientError,
    },

    #[error("firewall rule {id:?} in zone {zone_id:?} was written but could not be read back: {source}")]
    ReadBack {
        zone_id: String,
        id: String,
        /// Bound state of the written rule, so the host can keep the binding.
        state: Box<LocalState>,
        #[source]
        source: ClientError,
    },

    #[error("{operation} in zone {zone_id:?} succeeded but returned no identifying data")]
    EmptyResponse {
        operation: Operation,
        zone_id: String,
    },

    #[error("invalid id ({0:?}) specified, should be in format \"zone_id/rule_id\"")]
    MalformedImportToken(String),

    #[error("cannot {operation} a firewall rule that is not bound to a remote object")]
    NotBound { operation: Operation },

    #[error("zone of a bound firewall rule cannot change ({bound:?} -> {requested:?})")]
    ZoneChanged { bound: String, requested: String },
}

/// Coarse failure taxonomy reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Create/update reported success without identifying data.
    CollaboratorContractViolation,
    /// Any other failure reported by the rule service.
    TransportOrValidationFailure,
    /// Import token did not split into two non-empty segments.
    MalformedImportToken,
    /// The host drove the state machine incorrectly.
    Usage,
}

impl LifecycleError {
    pub fn class(&self) -> ErrorClass {
        match self {
            LifecycleError::Create { .. }
            | LifecycleError::Read { .. }
            | LifecycleError::Update { .. }
            | LifecycleError::Delete { .. }
            | LifecycleError::ReadBack { .. } => ErrorClass::TransportOrValidationFailure,
            LifecycleError::EmptyResponse { .. } => ErrorClass::CollaboratorContractViolation,
            LifecycleError::MalformedImportToken(_) => ErrorClass::MalformedImportToken,
            LifecycleError::NotBound { .. } | LifecycleError::ZoneChanged { .. } => {
                ErrorClass::Usage
            }
        }
    }

    /// The client error underneath a remote call failure, if any.
    pub fn client_error(&self) -> Option<&ClientError> {
        match self {
            LifecycleError::Create { source, .. }
            | LifecycleError::Read { source, .. }
            | LifecycleError::Update { source, .. }
            | LifecycleError::Delete { source, .. }
            | LifecycleError::ReadBack { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type for lifecycle operations.
pub type Result<T> = std::result::Result<T, LifecycleError>;
