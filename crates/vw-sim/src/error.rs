//! Error types for the vw-sim crate.
//!
//! [`SimError`] covers inventory construction and mutation. Errors raised
//! while serving property collector calls are reported to the caller as
//! [`ProtocolError`](vw_watcher::ProtocolError) values instead, exactly as a
//! remote collector would.

use camino::Utf8PathBuf;
use vw_core::ObjectReference;

/// Errors raised while building or mutating a simulated inventory.
///
/// # Error Recovery Strategy
///
/// - **Unknown objects** ([`SimError::UnknownObject`]): Recoverable - the
///   inventory is unchanged
/// - **Wrong parent type** ([`SimError::InvalidParent`]): Recoverable - the
///   inventory is unchanged
/// - **Root removal** ([`SimError::RootRemoval`]): Recoverable - the root
///   folder always exists
/// - **Document errors** ([`SimError::MissingFile`], [`SimError::Io`],
///   [`SimError::Parse`]): Fatal for the load, no inventory is produced
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// The referenced object is not part of the inventory.
    #[error("unknown managed object {0}")]
    UnknownObject(ObjectReference),

    /// The parent cannot contain an object of the requested type.
    #[error("{parent} cannot contain a {kind}")]
    InvalidParent {
        /// The intended parent.
        parent: ObjectReference,
        /// The managed type that was to be created.
        kind: String,
    },

    /// The root folder cannot be removed.
    #[error("the root folder cannot be removed")]
    RootRemoval,

    /// The inventory document does not exist.
    #[error("inventory file not found: {0}")]
    MissingFile(Utf8PathBuf),

    /// Failed to read the inventory document.
    #[error("failed to read inventory: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the inventory document.
    #[error("failed to parse inventory: {0}")]
    Parse(#[from] serde_json::Error),
}

impl SimError {
    /// Creates a new [`SimError::InvalidParent`] error.
    #[must_use]
    pub fn invalid_parent(parent: &ObjectReference, kind: impl Into<String>) -> Self {
        Self::InvalidParent {
            parent: parent.clone(),
            kind: kind.into(),
        }
    }

    /// Returns `true` if the inventory was left unchanged and the caller may
    /// carry on.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnknownObject(_) | Self::InvalidParent { .. } | Self::RootRemoval
        )
    }
}
