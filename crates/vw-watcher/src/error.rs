//! Error types for the vw-watcher crate.
//!
//! This module provides [`WatchError`], returned by the change watcher,
//! [`ProtocolError`], returned by property collector calls, and
//! [`TraversalError`], returned when a selection graph is malformed.

/// Fault classes reported by the property collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FaultKind {
    /// A call argument (filter spec, options) was rejected.
    InvalidArgument,
    /// The presented version cursor is not one the collector issued.
    InvalidCollectorVersion,
    /// The referenced filter or object does not exist.
    ManagedObjectNotFound,
    /// A pending wait was interrupted by `cancel_wait_for_updates`.
    RequestCanceled,
    /// The session is not (or no longer) authenticated.
    NotAuthenticated,
    /// The transport failed underneath the call.
    Transport,
}

impl FaultKind {
    /// Returns the protocol name of the fault.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::InvalidArgument => "InvalidArgument",
            Self::InvalidCollectorVersion => "InvalidCollectorVersion",
            Self::ManagedObjectNotFound => "ManagedObjectNotFound",
            Self::RequestCanceled => "RequestCanceled",
            Self::NotAuthenticated => "NotAuthenticated",
            Self::Transport => "Transport",
        }
    }
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A failed property collector call.
///
/// # Examples
///
/// ```
/// use vw_watcher::{FaultKind, ProtocolError};
///
/// let err = ProtocolError::new(FaultKind::InvalidArgument, "empty property set");
/// assert_eq!(err.fault, FaultKind::InvalidArgument);
/// assert_eq!(err.to_string(), "InvalidArgument: empty property set");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{fault}: {message}")]
pub struct ProtocolError {
    /// The fault class.
    pub fault: FaultKind,
    /// Collector-provided detail.
    pub message: String,
}

impl ProtocolError {
    /// Creates a protocol error.
    #[must_use]
    pub fn new(fault: FaultKind, message: impl Into<String>) -> Self {
        Self {
            fault,
            message: message.into(),
        }
    }

    /// Creates a [`FaultKind::RequestCanceled`] error.
    #[must_use]
    pub fn request_canceled() -> Self {
        Self::new(FaultKind::RequestCanceled, "the wait was canceled")
    }
}

/// A selection graph that cannot be handed to the collector.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TraversalError {
    /// A node was referenced by name but never defined.
    #[error("selection node '{0}' is referenced but never defined")]
    Undefined(String),

    /// A node name was defined twice.
    #[error("selection node '{0}' is defined more than once")]
    Redefined(String),

    /// The graph has no entry node to apply at the root object.
    #[error("selection graph has no entry node")]
    NoEntry,
}

/// Errors returned by the change watcher.
///
/// Every error ends the watch: the filter is torn down and the error is
/// returned. Reaching the wait bound or being cancelled are not errors; they
/// are reported as [`WatchOutcome`](crate::WatchOutcome) values.
///
/// # Error Recovery Strategy
///
/// - **Connection errors** ([`WatchError::Connection`]): Fatal - no filter was
///   created, nothing to clean up
/// - **Protocol errors** ([`WatchError::Protocol`]): Fatal - the filter is
///   destroyed before the error is returned
/// - **Invalid specs** ([`WatchError::InvalidSpec`]): Fatal - raised before the
///   filter is created
///
/// # Examples
///
/// ```
/// use vw_watcher::{FaultKind, ProtocolError, WatchError};
///
/// fn handle_error(err: &WatchError) {
///     match err {
///         WatchError::Connection { host, reason } => eprintln!("{host}: {reason}"),
///         WatchError::Protocol(e) => eprintln!("collector fault: {e}"),
///         WatchError::InvalidSpec(e) => eprintln!("bad traversal: {e}"),
///     }
/// }
///
/// let err = WatchError::from(ProtocolError::new(FaultKind::Transport, "reset"));
/// assert_eq!(err.fault(), Some(FaultKind::Transport));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The session could not be established.
    #[error("failed to connect to {host}: {reason}")]
    Connection {
        /// The endpoint that was dialed.
        host: String,
        /// Why the connection or login failed.
        reason: String,
    },

    /// A property collector call failed.
    #[error("property collector call failed: {0}")]
    Protocol(#[from] ProtocolError),

    /// The selection graph is malformed.
    #[error("invalid filter specification: {0}")]
    InvalidSpec(#[from] TraversalError),
}

impl WatchError {
    /// Creates a new [`WatchError::Connection`] error.
    #[must_use]
    pub fn connection(host: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Connection {
            host: host.into(),
            reason: reason.into(),
        }
    }

    /// Returns the collector fault, for protocol errors.
    #[must_use]
    pub const fn fault(&self) -> Option<FaultKind> {
        match self {
            Self::Protocol(e) => Some(e.fault),
            Self::Connection { .. } | Self::InvalidSpec(_) => None,
        }
    }

    /// Returns `true` if the failure happened before any filter existed.
    #[must_use]
    pub const fn is_setup_failure(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::InvalidSpec(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error() {
        let err = WatchError::connection("vc01", "incorrect user name or password");
        assert!(err.is_setup_failure());
        assert!(err.fault().is_none());
        assert_eq!(
            err.to_string(),
            "failed to connect to vc01: incorrect user name or password"
        );
    }

    #[test]
    fn test_protocol_error_conversion() {
        let err: WatchError = ProtocolError::new(FaultKind::InvalidCollectorVersion, "v9").into();
        assert!(!err.is_setup_failure());
        assert_eq!(err.fault(), Some(FaultKind::InvalidCollectorVersion));
        assert!(err.to_string().contains("InvalidCollectorVersion: v9"));
    }

    #[test]
    fn test_traversal_error_conversion() {
        let err: WatchError = TraversalError::Undefined("traverseFolders".to_owned()).into();
        assert!(err.is_setup_failure());
        assert!(err.to_string().contains("traverseFolders"));
    }

    #[test]
    fn test_request_canceled() {
        assert_eq!(ProtocolError::request_canceled().fault, FaultKind::RequestCanceled);
    }
}
