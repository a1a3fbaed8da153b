//! Poll options and property selections.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::reference::{SUMMARY, VIRTUAL_MACHINE};

/// Default upper bound for a single wait call, in seconds.
pub const DEFAULT_MAX_WAIT_SECONDS: u32 = 5;

/// Options bounding a single wait-for-updates call.
///
/// # Examples
///
/// ```
/// use vw_core::WaitOptions;
///
/// let bounded = WaitOptions::bounded(5);
/// assert!(bounded.is_bounded());
///
/// let unbounded = WaitOptions::unbounded();
/// assert!(!unbounded.is_bounded());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitOptions {
    /// How long the collector may block before returning an empty result.
    /// `None` blocks until a change arrives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_wait_seconds: Option<u32>,

    /// Page size hint; larger results are truncated and continued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_object_updates: Option<u32>,
}

impl WaitOptions {
    /// Options with the given wait bound and no page size.
    #[inline]
    #[must_use]
    pub const fn bounded(seconds: u32) -> Self {
        Self {
            max_wait_seconds: Some(seconds),
            max_object_updates: None,
        }
    }

    /// Options that block until a change arrives.
    #[inline]
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            max_wait_seconds: None,
            max_object_updates: None,
        }
    }

    /// Returns `true` if a wait bound is configured.
    #[inline]
    #[must_use]
    pub const fn is_bounded(&self) -> bool {
        self.max_wait_seconds.is_some()
    }
}

/// The properties to report for objects of one managed type.
///
/// # Examples
///
/// ```
/// use vw_core::PropertySpec;
///
/// let spec = PropertySpec::virtual_machine_summary();
/// assert_eq!(spec.kind, "VirtualMachine");
/// assert!(spec.includes("summary"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySpec {
    /// Managed object type the paths apply to.
    #[serde(rename = "type")]
    pub kind: String,

    /// Property paths to report.
    pub path_set: SmallVec<[String; 2]>,
}

impl PropertySpec {
    /// Creates a property spec for `kind` reporting `paths`.
    #[must_use]
    pub fn new<I, S>(kind: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: kind.into(),
            path_set: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// `VirtualMachine -> ["summary"]`.
    #[must_use]
    pub fn virtual_machine_summary() -> Self {
        Self::new(VIRTUAL_MACHINE, [SUMMARY])
    }

    /// Returns `true` if `path` is one of the reported paths.
    #[must_use]
    pub fn includes(&self, path: &str) -> bool {
        self.path_set.iter().any(|p| p == path)
    }
}
