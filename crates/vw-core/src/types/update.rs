//! Update sets returned by the property collector.
//!
//! A single wait call returns at most one [`UpdateSet`]. It carries the new
//! [`Version`] cursor, a truncation flag, and one [`PropertyFilterUpdate`]
//! group per filter that observed changes. Each group holds the ordered
//! [`ObjectUpdate`] list for that filter.
//!
//! # Structure
//!
//! ```text
//! UpdateSet { version, truncated }
//!   └── PropertyFilterUpdate (filter-1)
//!         ├── ObjectUpdate (enter  VirtualMachine:vm-1)
//!         │     └── PropertyChange (assign summary = {...})
//!         └── ObjectUpdate (modify VirtualMachine:vm-2)
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use super::reference::{FilterHandle, ObjectReference};

/// Opaque version cursor issued by the property collector.
///
/// The empty version asks the collector for everything from the beginning.
/// Versions are never parsed or compared by value; they are ordered by the
/// order in which they arrive.
///
/// # Examples
///
/// ```
/// use vw_core::Version;
///
/// let initial = Version::initial();
/// assert!(initial.is_initial());
///
/// let next = Version::new("3");
/// assert!(!next.is_initial());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    /// Returns the empty "from the beginning" version.
    #[inline]
    #[must_use]
    pub const fn initial() -> Self {
        Self(String::new())
    }

    /// Creates a version from a collector-issued token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns `true` if this is the initial (empty) version.
    #[inline]
    #[must_use]
    pub fn is_initial(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the raw token.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_initial() {
            f.write_str("<initial>")
        } else {
            f.write_str(&self.0)
        }
    }
}

/// How a property value changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyChangeOp {
    /// An element was added to a collection property.
    Add,
    /// An element was removed from a collection property.
    Remove,
    /// The property was assigned a new value.
    Assign,
    /// The property became unreachable through an indirect path.
    IndirectRemove,
}

/// A single changed property of a managed object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyChange {
    /// Property path, e.g. `summary`.
    pub name: String,

    /// Kind of change.
    pub op: PropertyChangeOp,

    /// New value. Absent for removals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub val: Option<serde_json::Value>,
}

impl PropertyChange {
    /// Creates an [`Assign`](PropertyChangeOp::Assign) change.
    #[must_use]
    pub fn assign(name: impl Into<String>, val: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            op: PropertyChangeOp::Assign,
            val: Some(val),
        }
    }

    /// Creates a [`Remove`](PropertyChangeOp::Remove) change.
    #[must_use]
    pub fn remove(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op: PropertyChangeOp::Remove,
            val: None,
        }
    }
}

/// How an object relates to the filter's result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectUpdateKind {
    /// The object entered the result set.
    Enter,
    /// Properties of an object already in the result set changed.
    Modify,
    /// The object left the result set.
    Leave,
}

/// Changes reported for one managed object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectUpdate {
    /// Relation of the object to the result set.
    pub kind: ObjectUpdateKind,

    /// The object that changed.
    pub obj: ObjectReference,

    /// Changed properties, in collector order.
    #[serde(default)]
    pub change_set: Vec<PropertyChange>,
}

impl ObjectUpdate {
    /// Creates an update for `obj` with the given changes.
    #[must_use]
    pub fn new(kind: ObjectUpdateKind, obj: ObjectReference, change_set: Vec<PropertyChange>) -> Self {
        Self {
            kind,
            obj,
            change_set,
        }
    }

    /// Returns the change for the named property, if reported.
    #[must_use]
    pub fn change(&self, name: &str) -> Option<&PropertyChange> {
        self.change_set.iter().find(|c| c.name == name)
    }
}

/// The updates observed by one filter within a single response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyFilterUpdate {
    /// The filter that produced these updates.
    pub filter: FilterHandle,

    /// Ordered object updates.
    #[serde(default)]
    pub object_set: Vec<ObjectUpdate>,
}

/// A response to a wait-for-updates call.
///
/// # Examples
///
/// ```
/// use vw_core::{UpdateSet, Version};
///
/// let set = UpdateSet::new(Version::new("1"));
/// assert!(!set.is_truncated());
/// assert_eq!(set.object_count(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSet {
    /// Cursor to present on the next wait call.
    pub version: Version,

    /// Set when more updates are pending for the same version sequence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncated: Option<bool>,

    /// Per-filter update groups, in collector order.
    #[serde(default)]
    pub filter_set: Vec<PropertyFilterUpdate>,
}

impl UpdateSet {
    /// Creates an empty, non-truncated update set.
    #[must_use]
    pub fn new(version: Version) -> Self {
        Self {
            version,
            truncated: None,
            filter_set: Vec::new(),
        }
    }

    /// Returns `true` only when the collector flagged the set as truncated.
    #[inline]
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.truncated == Some(true)
    }

    /// Returns the total number of object updates across all groups.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.filter_set.iter().map(|f| f.object_set.len()).sum()
    }

    /// Iterates over every object update in delivery order.
    pub fn objects(&self) -> impl Iterator<Item = &ObjectUpdate> {
        self.filter_set.iter().flat_map(|f| f.object_set.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vm_update(id: &str) -> ObjectUpdate {
        ObjectUpdate::new(
            ObjectUpdateKind::Enter,
            ObjectReference::virtual_machine(id),
            vec![PropertyChange::assign("summary", json!({"name": id}))],
        )
    }

    #[test]
    fn test_version_initial() {
        assert!(Version::initial().is_initial());
        assert!(Version::default().is_initial());
        assert_eq!(Version::initial().to_string(), "<initial>");
        assert_eq!(Version::new("12").to_string(), "12");
    }

    #[test]
    fn test_truncation_flag() {
        let mut set = UpdateSet::new(Version::new("1"));
        assert!(!set.is_truncated());
        set.truncated = Some(false);
        assert!(!set.is_truncated());
        set.truncated = Some(true);
        assert!(set.is_truncated());
    }

    #[test]
    fn test_objects_iterates_groups_in_order() {
        let mut set = UpdateSet::new(Version::new("1"));
        set.filter_set.push(PropertyFilterUpdate {
            filter: FilterHandle::new("f1"),
            object_set: vec![vm_update("vm-1"), vm_update("vm-2")],
        });
        set.filter_set.push(PropertyFilterUpdate {
            filter: FilterHandle::new("f2"),
            object_set: vec![vm_update("vm-3")],
        });

        let ids: Vec<&str> = set.objects().map(|u| u.obj.value.as_str()).collect();
        assert_eq!(ids, ["vm-1", "vm-2", "vm-3"]);
        assert_eq!(set.object_count(), 3);
    }

    #[test]
    fn test_change_lookup() {
        let update = vm_update("vm-9");
        assert!(update.change("summary").is_some());
        assert!(update.change("config").is_none());
    }

    #[test]
    fn test_update_set_json_shape() {
        let mut set = UpdateSet::new(Version::new("4"));
        set.filter_set.push(PropertyFilterUpdate {
            filter: FilterHandle::new("f1"),
            object_set: vec![ObjectUpdate::new(
                ObjectUpdateKind::Leave,
                ObjectReference::virtual_machine("vm-1"),
                Vec::new(),
            )],
        });

        let value = serde_json::to_value(&set).unwrap();
        assert_eq!(value["version"], "4");
        assert!(value.get("truncated").is_none());
        assert_eq!(value["filterSet"][0]["objectSet"][0]["kind"], "leave");
        assert_eq!(value["filterSet"][0]["objectSet"][0]["obj"]["type"], "VirtualMachine");
    }
}
