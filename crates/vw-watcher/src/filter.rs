//! Filter specifications for the property collector.
//!
//! A [`FilterSpecification`] tells the collector where to start (the root
//! object), how to walk from there (a [`SelectionGraph`]), and which
//! properties to report for which types. [`FilterConfiguration`] pairs it
//! with the [`WaitOptions`] bounding each poll.
//!
//! # Examples
//!
//! ```
//! use vw_core::ObjectReference;
//! use vw_watcher::{FilterConfiguration, TraversalSpecBuilder};
//!
//! let root = ObjectReference::folder("group-d1");
//! let graph = TraversalSpecBuilder::virtual_machines()?;
//! let config = FilterConfiguration::for_virtual_machines(root, graph);
//!
//! assert_eq!(config.wait_options().max_wait_seconds, Some(5));
//! assert!(config.spec().reports("VirtualMachine", "summary"));
//! # Ok::<(), vw_watcher::TraversalError>(())
//! ```

use vw_core::{DEFAULT_MAX_WAIT_SECONDS, ObjectReference, PropertySpec, WaitOptions, WatchConfig};

use crate::traversal::SelectionGraph;

/// Where the collector starts walking and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSpec {
    /// The starting object.
    pub obj: ObjectReference,

    /// When set, the starting object itself is not reported.
    pub skip: bool,

    /// Selection graph applied from the starting object.
    pub select_set: SelectionGraph,
}

/// A complete filter: starting points plus the properties to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpecification {
    /// Starting points.
    pub object_set: Vec<ObjectSpec>,

    /// Properties to report, per managed type.
    pub prop_set: Vec<PropertySpec>,

    /// Ask the collector to report nested property changes individually
    /// instead of whole top-level values.
    pub partial_updates: bool,
}

impl FilterSpecification {
    /// Returns the property selection for `kind`, if any.
    #[must_use]
    pub fn properties_for(&self, kind: &str) -> Option<&PropertySpec> {
        self.prop_set.iter().find(|p| p.kind == kind)
    }

    /// Returns `true` if `path` is reported for objects of `kind`.
    #[must_use]
    pub fn reports(&self, kind: &str, path: &str) -> bool {
        self.properties_for(kind).is_some_and(|p| p.includes(path))
    }
}

/// A filter specification together with its poll options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfiguration {
    spec: FilterSpecification,
    options: WaitOptions,
}

impl FilterConfiguration {
    /// Combines a root, a traversal graph, and property selections.
    ///
    /// The wait bound defaults to five seconds so that a watcher observes
    /// cancellation even when nothing in the inventory changes.
    #[must_use]
    pub fn new(root: ObjectReference, graph: SelectionGraph, prop_set: Vec<PropertySpec>) -> Self {
        Self {
            spec: FilterSpecification {
                object_set: vec![ObjectSpec {
                    obj: root,
                    skip: false,
                    select_set: graph,
                }],
                prop_set,
                partial_updates: false,
            },
            options: WaitOptions::bounded(DEFAULT_MAX_WAIT_SECONDS),
        }
    }

    /// Reports `VirtualMachine.summary` for every object reached by `graph`.
    #[must_use]
    pub fn for_virtual_machines(root: ObjectReference, graph: SelectionGraph) -> Self {
        Self::new(root, graph, vec![PropertySpec::virtual_machine_summary()])
    }

    /// Builds the configuration described by a [`WatchConfig`].
    #[must_use]
    pub fn from_config(root: ObjectReference, graph: SelectionGraph, config: &WatchConfig) -> Self {
        Self {
            options: config.wait_options(),
            ..Self::new(root, graph, config.properties.clone())
        }
        .with_partial_updates(config.partial_updates)
    }

    /// Overrides the wait bound. `None` blocks until a change arrives.
    #[must_use]
    pub fn with_max_wait(mut self, seconds: Option<u32>) -> Self {
        self.options.max_wait_seconds = seconds;
        self
    }

    /// Asks the collector to report nested property changes path by path.
    #[must_use]
    pub fn with_partial_updates(mut self, partial: bool) -> Self {
        self.spec.partial_updates = partial;
        self
    }

    /// Sets the page size hint.
    #[must_use]
    pub fn with_max_object_updates(mut self, count: Option<u32>) -> Self {
        self.options.max_object_updates = count;
        self
    }

    /// Returns the filter specification.
    #[must_use]
    pub const fn spec(&self) -> &FilterSpecification {
        &self.spec
    }

    /// Returns the poll options.
    #[must_use]
    pub const fn wait_options(&self) -> WaitOptions {
        self.options
    }

    /// Splits into the specification and options.
    #[must_use]
    pub fn into_parts(self) -> (FilterSpecification, WaitOptions) {
        (self.spec, self.options)
    }
}
