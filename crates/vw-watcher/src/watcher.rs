//! The change watcher: filter lifecycle and the versioned poll loop.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ ChangeWatcher::run                                               │
//! │  ┌───────────────┐   ┌──────────────────────┐   ┌─────────────┐  │
//! │  │ create_filter │ ► │ wait_for_updates_ex  │ ► │ Dispatcher  │ ─┼─► sink
//! │  └───────────────┘   │ (version, bound)     │ ◄ │ (per group) │  │
//! │                      └──────────┬───────────┘   └─────────────┘  │
//! │                    cancel token │ cancel_wait_for_updates         │
//! │  ┌──────────────────────────────▼──────────────────────────────┐ │
//! │  │ Teardown: destroy_filter (once) ► logout                    │ │
//! │  └─────────────────────────────────────────────────────────────┘ │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use vw_core::WatchConfig;
//! use vw_watcher::{ChangeWatcher, CollectingSink, Session, WatchOutcome};
//!
//! # async fn example(session: Arc<dyn Session>) -> Result<(), vw_watcher::WatchError> {
//! let cancel = CancellationToken::new();
//! let mut sink = CollectingSink::new();
//!
//! let watcher = ChangeWatcher::new(session, WatchConfig::default());
//! let summary = watcher.watch(&mut sink, &cancel).await?;
//! assert_eq!(summary.outcome, WatchOutcome::Cancelled);
//! # Ok(())
//! # }
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vw_core::{Credentials, FilterHandle, UpdateSet, Version, WaitOptions, WatchConfig};

use crate::dispatch::{UpdateDispatcher, UpdateSink};
use crate::error::{ProtocolError, WatchError};
use crate::filter::FilterConfiguration;
use crate::protocol::{Connector, Session};
use crate::state::{WatchMode, WatchOutcome, WatchSession, WatchState, WatchSummary};
use crate::traversal::TraversalSpecBuilder;

/// Observes inventory changes through a property collector subscription.
///
/// # Lifecycle
///
/// 1. **Creation**: [`ChangeWatcher::connect`] opens a session, or
///    [`ChangeWatcher::new`] takes ownership of an existing one.
///
/// 2. **Running**: [`run`](Self::run), [`list`](Self::list) or
///    [`watch`](Self::watch) create the filter and poll until the watch
///    ends. The watcher is consumed; a closed watcher cannot be reused.
///
/// 3. **Teardown**: on every exit path the filter is destroyed exactly once
///    and the session is logged out. This includes a panicking sink and the
///    run future being dropped mid-flight.
pub struct ChangeWatcher {
    /// The session, owned exclusively for the subscription.
    session: Arc<dyn Session>,

    /// Poll bounds and reported properties.
    config: WatchConfig,

    /// Publishes lifecycle transitions.
    state_tx: watch::Sender<WatchState>,
}

impl std::fmt::Debug for ChangeWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeWatcher")
            .field("root", &self.session.root_folder())
            .field("config", &self.config)
            .field("state", &*self.state_tx.borrow())
            .finish_non_exhaustive()
    }
}

impl ChangeWatcher {
    /// Opens a session through `connector` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Connection`] if the session cannot be
    /// established. No filter exists at that point.
    pub async fn connect<C: Connector + ?Sized>(
        connector: &C,
        credentials: &Credentials,
        config: WatchConfig,
    ) -> Result<Self, WatchError> {
        debug!(host = %credentials.host, user = %credentials.user, "Connecting");
        let session = connector.connect(credentials).await?;
        info!(host = %credentials.host, root = %session.root_folder(), "Session established");
        Ok(Self::new(session, config))
    }

    /// Wraps an established session. The watcher logs it out when done.
    #[must_use]
    pub fn new(session: Arc<dyn Session>, config: WatchConfig) -> Self {
        let (state_tx, _) = watch::channel(WatchState::Init);
        Self {
            session,
            config,
            state_tx,
        }
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> WatchState {
        *self.state_tx.borrow()
    }

    /// Subscribes to lifecycle transitions.
    ///
    /// The receiver outlives the watcher and ends at [`WatchState::Closed`].
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<WatchState> {
        self.state_tx.subscribe()
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Delivers one complete snapshot, then stops.
    pub async fn list<S: UpdateSink + ?Sized>(self, sink: &mut S) -> Result<WatchSummary, WatchError> {
        self.run(WatchMode::List, sink, &CancellationToken::new()).await
    }

    /// Delivers changes until `cancel` fires or a call fails.
    pub async fn watch<S: UpdateSink + ?Sized>(
        self,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<WatchSummary, WatchError> {
        self.run(WatchMode::Watch, sink, cancel).await
    }

    /// Creates the filter, polls in `mode`, and tears everything down.
    ///
    /// A panic raised by `sink` is resumed after teardown.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidSpec`] or [`WatchError::Protocol`] when
    /// the filter cannot be created, and [`WatchError::Protocol`] when a wait
    /// call fails. Teardown failures are logged, never returned.
    pub async fn run<S: UpdateSink + ?Sized>(
        self,
        mode: WatchMode,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<WatchSummary, WatchError> {
        info!(?mode, root = %self.session.root_folder(), "Change watcher started");

        let mut teardown = Teardown::new(Arc::clone(&self.session));
        let result = AssertUnwindSafe(self.poll(mode, sink, cancel, &mut teardown))
            .catch_unwind()
            .await;

        teardown.close().await;
        self.state_tx.send_replace(WatchState::Closed);

        match result {
            Ok(Ok(summary)) => {
                info!(
                    outcome = ?summary.outcome,
                    version = %summary.version,
                    reconciled = summary.reconciled,
                    polls = summary.polls,
                    updates = summary.delivered.updates,
                    "Change watcher stopped"
                );
                Ok(summary)
            }
            Ok(Err(error)) => {
                warn!(%error, "Change watcher failed");
                Err(error)
            }
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    fn transition(&self, next: WatchState) {
        let previous = self.state_tx.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "Watcher state");
        }
    }

    async fn poll<S: UpdateSink + ?Sized>(
        &self,
        mode: WatchMode,
        sink: &mut S,
        cancel: &CancellationToken,
        teardown: &mut Teardown,
    ) -> Result<WatchSummary, WatchError> {
        let graph = TraversalSpecBuilder::virtual_machines().inspect_err(|_| self.transition(WatchState::Error))?;
        let (spec, options) =
            FilterConfiguration::from_config(self.session.root_folder(), graph, &self.config).into_parts();

        // A filter still being created when this future is dropped is never
        // armed; the logout in teardown releases it on the collector.
        let filter = match self.session.create_filter(&spec).await {
            Ok(filter) => filter,
            Err(error) => {
                self.transition(WatchState::Error);
                return Err(error.into());
            }
        };
        teardown.arm(filter.clone());
        self.transition(WatchState::FilterCreated);
        debug!(%filter, ?options, "Filter created");

        let mut state = WatchSession::new(cancel.clone());
        let mut dispatcher = UpdateDispatcher::new();

        let outcome = loop {
            self.transition(WatchState::Polling);
            let (result, cancel_sent) =
                self.wait_or_cancel(&filter, state.version(), &options, cancel).await;
            state.record_poll();

            if state.is_cancelled() {
                if !cancel_sent {
                    self.cancel_wait(&filter).await;
                }
                break WatchOutcome::Cancelled;
            }

            match result {
                Ok(Some(set)) => {
                    if self.deliver(&set, &mut state, &mut dispatcher, sink) && mode == WatchMode::List {
                        break WatchOutcome::Done;
                    }
                }
                Ok(None) => {
                    if mode == WatchMode::List && options.is_bounded() {
                        break WatchOutcome::TimedOut;
                    }
                    debug!(version = %state.version(), "No changes within wait bound");
                }
                Err(error) => {
                    self.transition(WatchState::Error);
                    return Err(error.into());
                }
            }
        };

        self.transition(outcome.state());
        Ok(WatchSummary {
            outcome,
            version: state.version().clone(),
            reconciled: state.is_reconciled(),
            polls: state.polls(),
            delivered: dispatcher.stats(),
        })
    }

    /// Advances the cursor and hands `set` to the sink.
    ///
    /// Returns `true` if `set` completed the pending update sequence.
    fn deliver<S: UpdateSink + ?Sized>(
        &self,
        set: &UpdateSet,
        state: &mut WatchSession,
        dispatcher: &mut UpdateDispatcher,
        sink: &mut S,
    ) -> bool {
        if state.advance(set) {
            info!(version = %set.version, "Inventory reconciled");
        }
        debug!(
            version = %set.version,
            truncated = set.is_truncated(),
            objects = set.object_count(),
            "Received update set"
        );

        self.transition(WatchState::Delivering);
        dispatcher.dispatch(set, sink);
        !set.is_truncated()
    }

    /// Issues one wait call. If `cancel` fires while it is pending, asks the
    /// collector to interrupt it and lets it return on its own.
    ///
    /// Returns the call result and whether a cancel request was sent.
    async fn wait_or_cancel(
        &self,
        filter: &FilterHandle,
        version: &Version,
        options: &WaitOptions,
        cancel: &CancellationToken,
    ) -> (Result<Option<UpdateSet>, ProtocolError>, bool) {
        let mut call = self.session.wait_for_updates_ex(filter, version, options);
        tokio::select! {
            biased;
            result = &mut call => (result, false),
            () = cancel.cancelled() => {
                debug!(%filter, "Cancellation requested, interrupting pending wait");
                self.cancel_wait(filter).await;
                (call.await, true)
            }
        }
    }

    async fn cancel_wait(&self, filter: &FilterHandle) {
        if let Err(error) = self.session.cancel_wait_for_updates(filter).await {
            debug!(%filter, %error, "Cancel request failed");
        }
    }
}

/// Releases the filter and the session.
///
/// [`close`](Self::close) runs teardown in place. If the guard is dropped
/// without being closed, teardown is spawned on the current runtime. The
/// filter stays armed until its destroy call has returned, so a guard
/// dropped mid-destroy destroys it again in the background.
struct Teardown {
    session: Arc<dyn Session>,
    filter: Option<FilterHandle>,
    closed: bool,
}

impl Teardown {
    const fn new(session: Arc<dyn Session>) -> Self {
        Self {
            session,
            filter: None,
            closed: false,
        }
    }

    fn arm(&mut self, filter: FilterHandle) {
        self.filter = Some(filter);
    }

    async fn close(mut self) {
        if let Some(filter) = &self.filter {
            destroy(self.session.as_ref(), filter).await;
        }
        self.filter = None;
        self.session.logout().await;
        self.closed = true;
    }
}

impl Drop for Teardown {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let session = Arc::clone(&self.session);
        let filter = self.filter.take();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!(filter = ?filter, "Watch dropped mid-flight, releasing in background");
                handle.spawn(release(session, filter));
            }
            Err(_) => {
                warn!(filter = ?filter, "No runtime available to release the filter");
            }
        }
    }
}

async fn release(session: Arc<dyn Session>, filter: Option<FilterHandle>) {
    if let Some(filter) = &filter {
        destroy(session.as_ref(), filter).await;
    }
    session.logout().await;
}

async fn destroy(session: &dyn Session, filter: &FilterHandle) {
    match session.destroy_filter(filter).await {
        Ok(()) => debug!(%filter, "Filter destroyed"),
        Err(error) => warn!(%filter, %error, "Failed to destroy filter"),
    }
}
