//! Watch modes, lifecycle states, and the poll cursor.
//!
//! # Lifecycle
//!
//! ```text
//! Init ─► FilterCreated ─► Polling ◄─► Delivering
//!                             │
//!                             ▼
//!            TimedOut | Cancelled | Error | Done ─► Closed
//! ```

use std::fmt;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use vw_core::{UpdateSet, Version};

use crate::dispatch::DispatchStats;

/// How long the watcher keeps polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchMode {
    /// Stop after one complete snapshot, or when a bounded wait comes back
    /// empty.
    List,
    /// Poll until cancelled or a call fails.
    Watch,
}

/// Lifecycle state of a [`ChangeWatcher`](crate::ChangeWatcher).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchState {
    /// Nothing created yet.
    Init,
    /// The remote filter exists.
    FilterCreated,
    /// A wait call is outstanding.
    Polling,
    /// A response is being handed to the sink.
    Delivering,
    /// A bounded wait came back empty in list mode.
    TimedOut,
    /// Cancellation was requested.
    Cancelled,
    /// A call failed.
    Error,
    /// A complete snapshot was delivered in list mode.
    Done,
    /// Filter destroyed and session released. Terminal.
    Closed,
}

impl WatchState {
    /// Returns `true` for the states that end the poll loop.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::TimedOut | Self::Cancelled | Self::Error | Self::Done | Self::Closed
        )
    }
}

impl fmt::Display for WatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Init => "init",
            Self::FilterCreated => "filter_created",
            Self::Polling => "polling",
            Self::Delivering => "delivering",
            Self::TimedOut => "timed_out",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
            Self::Done => "done",
            Self::Closed => "closed",
        };
        f.write_str(label)
    }
}

/// How a watch ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchOutcome {
    /// List mode observed a complete snapshot.
    Done,
    /// List mode reached the wait bound with nothing new to fetch.
    TimedOut,
    /// The caller cancelled.
    Cancelled,
}

impl WatchOutcome {
    /// The terminal state this outcome corresponds to.
    #[must_use]
    pub const fn state(self) -> WatchState {
        match self {
            Self::Done => WatchState::Done,
            Self::TimedOut => WatchState::TimedOut,
            Self::Cancelled => WatchState::Cancelled,
        }
    }
}

/// Final report of a watch that ended without an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchSummary {
    /// How the watch ended.
    pub outcome: WatchOutcome,
    /// Last version cursor received.
    pub version: Version,
    /// Whether a complete snapshot was observed.
    pub reconciled: bool,
    /// Number of wait calls that returned.
    pub polls: u64,
    /// Delivery statistics.
    pub delivered: DispatchStats,
}

/// Mutable state of one subscription. Written only by the poll loop.
///
/// # Examples
///
/// ```
/// use tokio_util::sync::CancellationToken;
/// use vw_core::{UpdateSet, Version};
/// use vw_watcher::WatchSession;
///
/// let mut session = WatchSession::new(CancellationToken::new());
/// assert!(session.version().is_initial());
///
/// let mut page = UpdateSet::new(Version::new("1"));
/// page.truncated = Some(true);
/// assert!(!session.advance(&page));
/// assert!(!session.is_reconciled());
///
/// assert!(session.advance(&UpdateSet::new(Version::new("2"))));
/// assert!(session.is_reconciled());
/// ```
#[derive(Debug, Clone)]
pub struct WatchSession {
    version: Version,
    generation: u64,
    reconciled: bool,
    polls: u64,
    cancel: CancellationToken,
}

impl WatchSession {
    /// Creates a session positioned at the initial version.
    #[must_use]
    pub const fn new(cancel: CancellationToken) -> Self {
        Self {
            version: Version::initial(),
            generation: 0,
            reconciled: false,
            polls: 0,
            cancel,
        }
    }

    /// The cursor to present on the next wait call.
    #[must_use]
    pub const fn version(&self) -> &Version {
        &self.version
    }

    /// Number of cursors received so far. Orders cursors by arrival.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a complete, non-truncated response has been observed.
    #[must_use]
    pub const fn is_reconciled(&self) -> bool {
        self.reconciled
    }

    /// Number of wait calls that returned.
    #[must_use]
    pub const fn polls(&self) -> u64 {
        self.polls
    }

    /// Whether the caller asked the watch to stop.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Counts a returned wait call.
    pub fn record_poll(&mut self) {
        self.polls += 1;
    }

    /// Moves the cursor to the version of `set`.
    ///
    /// Returns `true` if this response reconciled the session, which happens
    /// at most once: on the first response that is not truncated.
    pub fn advance(&mut self, set: &UpdateSet) -> bool {
        self.version.clone_from(&set.version);
        self.generation += 1;
        if self.reconciled || set.is_truncated() {
            return false;
        }
        self.reconciled = true;
        true
    }
}
