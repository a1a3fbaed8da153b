//! Managed object references and handles.
//!
//! This module provides [`ObjectReference`], the opaque identifier the
//! property collector uses for every managed object, the well-known type and
//! property path names used by the inventory traversal, and [`FilterHandle`]
//! for naming server-side filters.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Managed object type of a virtual machine.
pub const VIRTUAL_MACHINE: &str = "VirtualMachine";

/// Managed object type of an inventory folder.
pub const FOLDER: &str = "Folder";

/// Managed object type of a datacenter.
pub const DATACENTER: &str = "Datacenter";

/// Folder property listing the folder's direct children.
pub const CHILD_ENTITY: &str = "childEntity";

/// Datacenter property referencing the datacenter's VM folder.
pub const VM_FOLDER: &str = "vmFolder";

/// Virtual machine property holding the VM summary.
pub const SUMMARY: &str = "summary";

/// A reference to a remote managed object.
///
/// An object reference pairs an opaque server-issued identifier with the
/// managed object type. References are immutable once obtained and are
/// compared by both parts.
///
/// # Examples
///
/// ```
/// use vw_core::ObjectReference;
///
/// let vm = ObjectReference::virtual_machine("vm-42");
/// assert!(vm.is_a(vw_core::VIRTUAL_MACHINE));
/// assert_eq!(vm.to_string(), "VirtualMachine:vm-42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectReference {
    /// The managed object type, e.g. `VirtualMachine`.
    #[serde(rename = "type")]
    pub kind: String,

    /// The opaque identifier, e.g. `vm-42`.
    pub value: String,
}

impl ObjectReference {
    /// Creates a reference from a type tag and identifier.
    #[must_use]
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }

    /// Creates a `VirtualMachine` reference.
    #[inline]
    #[must_use]
    pub fn virtual_machine(value: impl Into<String>) -> Self {
        Self::new(VIRTUAL_MACHINE, value)
    }

    /// Creates a `Folder` reference.
    #[inline]
    #[must_use]
    pub fn folder(value: impl Into<String>) -> Self {
        Self::new(FOLDER, value)
    }

    /// Creates a `Datacenter` reference.
    #[inline]
    #[must_use]
    pub fn datacenter(value: impl Into<String>) -> Self {
        Self::new(DATACENTER, value)
    }

    /// Returns `true` if this reference has the given managed object type.
    #[inline]
    #[must_use]
    pub fn is_a(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// A handle naming a filter created on the property collector.
///
/// Handles are issued by the collector and only meaningful to the session
/// that created them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterHandle(String);

impl FilterHandle {
    /// Creates a handle from a collector-issued identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
