//! Ordered delivery of update batches to a caller-supplied sink.
//!
//! # Event Flow
//!
//! ```text
//! UpdateSet (one poll response)
//!        │
//!        ▼
//! PropertyFilterUpdate groups, in response order
//!        │
//!        ▼
//! UpdateSink::updated(&[ObjectUpdate])   (synchronous, one call per group)
//! ```
//!
//! The dispatcher does not buffer, reorder, or deduplicate. The poll loop
//! issues its next call only after the sink has returned for every group.

use serde::Serialize;
use vw_core::{ObjectUpdate, UpdateSet};

/// Receives update batches from the watcher.
///
/// The sink has no return contract. A sink that can fail must report its
/// errors through its own channel; panicking aborts the watch (after the
/// filter has been torn down).
///
/// # Examples
///
/// ```
/// use vw_core::ObjectUpdate;
/// use vw_watcher::UpdateSink;
///
/// struct CountingSink(usize);
///
/// impl UpdateSink for CountingSink {
///     fn updated(&mut self, updates: &[ObjectUpdate]) {
///         self.0 += updates.len();
///     }
/// }
/// ```
pub trait UpdateSink: Send {
    /// Handles one ordered batch of object updates.
    fn updated(&mut self, updates: &[ObjectUpdate]);
}

impl<S: UpdateSink + ?Sized> UpdateSink for &mut S {
    fn updated(&mut self, updates: &[ObjectUpdate]) {
        (**self).updated(updates);
    }
}

impl<S: UpdateSink + ?Sized> UpdateSink for Box<S> {
    fn updated(&mut self, updates: &[ObjectUpdate]) {
        (**self).updated(updates);
    }
}

/// A sink that keeps every batch it receives.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    batches: Vec<Vec<ObjectUpdate>>,
}

impl CollectingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the batches in delivery order.
    #[must_use]
    pub fn batches(&self) -> &[Vec<ObjectUpdate>] {
        &self.batches
    }

    /// Iterates over every update in delivery order.
    pub fn updates(&self) -> impl Iterator<Item = &ObjectUpdate> {
        self.batches.iter().flatten()
    }

    /// Returns the number of updates received.
    #[must_use]
    pub fn len(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }

    /// Returns `true` if nothing was received.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consumes the sink, returning the batches.
    #[must_use]
    pub fn into_batches(self) -> Vec<Vec<ObjectUpdate>> {
        self.batches
    }
}

impl UpdateSink for CollectingSink {
    fn updated(&mut self, updates: &[ObjectUpdate]) {
        self.batches.push(updates.to_vec());
    }
}

/// Delivery statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    /// Number of sink calls.
    pub batches: u64,
    /// Number of object updates delivered.
    pub updates: u64,
}

/// Hands update sets to a sink, group by group.
#[derive(Debug, Default)]
pub struct UpdateDispatcher {
    stats: DispatchStats,
}

impl UpdateDispatcher {
    /// Creates a dispatcher with zeroed statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers every non-empty filter group of `set` to `sink`, in order.
    ///
    /// Returns the number of updates delivered.
    pub fn dispatch<S: UpdateSink + ?Sized>(&mut self, set: &UpdateSet, sink: &mut S) -> usize {
        let mut delivered = 0;
        for group in &set.filter_set {
            if group.object_set.is_empty() {
                continue;
            }
            for update in &group.object_set {
                tracing::trace!(
                    filter = %group.filter,
                    obj = %update.obj,
                    kind = ?update.kind,
                    changes = update.change_set.len(),
                    "Dispatching object update"
                );
            }
            sink.updated(&group.object_set);
            delivered += group.object_set.len();
            self.stats.batches += 1;
            self.stats.updates += group.object_set.len() as u64;
        }
        delivered
    }

    /// Returns the statistics so far.
    #[must_use]
    pub const fn stats(&self) -> DispatchStats {
        self.stats
    }
}
