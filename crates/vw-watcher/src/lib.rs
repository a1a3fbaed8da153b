//! Inventory change watching through a property collector subscription.
//!
//! This crate subscribes to changes of virtual machine properties below an
//! inventory root. It builds the traversal and filter specification, creates
//! the filter, and polls it with a monotonically advancing version cursor,
//! handing every batch of object updates to a caller-supplied sink.
//!
//! # Overview
//!
//! The vw-watcher crate is designed to:
//!
//! - Reach every virtual machine through nested folders and datacenters
//! - Deliver an initial snapshot followed by incremental changes
//! - Follow truncated responses until the snapshot is complete
//! - Stop on cancellation, on a bounded empty wait (list mode), or on error
//! - Destroy the filter and log the session out on every exit path
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        ChangeWatcher                             │
//! │  ┌──────────────────────┐   ┌──────────────────────────────────┐ │
//! │  │ TraversalSpecBuilder │ ► │ FilterConfiguration              │ │
//! │  │ (selection graph)    │   │ (root, graph, props, wait bound) │ │
//! │  └──────────────────────┘   └────────────────┬─────────────────┘ │
//! │                                              │ create_filter     │
//! │  ┌──────────────────┐  wait_for_updates_ex  ┌▼─────────────────┐ │
//! │  │ WatchSession     │ ◄──────────────────── │ Session          │ │
//! │  │ (version cursor) │                       │ (dyn, async)     │ │
//! │  └────────┬─────────┘                       └──────────────────┘ │
//! │           ▼                                                      │
//! │  ┌──────────────────┐                                            │
//! │  │ UpdateDispatcher │ ─► UpdateSink::updated(&[ObjectUpdate])    │
//! │  └──────────────────┘                                            │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Crate Dependencies
//!
//! ```text
//! vw-cli ──► vw-watcher ──► vw-core
//!        └─► vw-sim ─────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use tokio_util::sync::CancellationToken;
//! use vw_core::{Credentials, WatchConfig};
//! use vw_watcher::{ChangeWatcher, CollectingSink, Connector};
//!
//! # async fn example(connector: &dyn Connector) -> Result<(), vw_watcher::WatchError> {
//! let credentials = Credentials::new("vc01.example.com", "monitor", "secret");
//! let watcher = ChangeWatcher::connect(connector, &credentials, WatchConfig::default()).await?;
//!
//! let mut sink = CollectingSink::new();
//! let summary = watcher.list(&mut sink).await?;
//! println!("{} virtual machines at version {}", sink.len(), summary.version);
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! ```
//! use vw_watcher::WatchError;
//!
//! fn handle_watch_error(err: &WatchError) {
//!     if err.is_setup_failure() {
//!         eprintln!("Could not start watching: {err}");
//!     } else {
//!         eprintln!("Watch aborted: {err}");
//!     }
//! }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod dispatch;
pub mod error;
pub mod filter;
pub mod protocol;
pub mod state;
pub mod traversal;
pub mod watcher;

// Re-export error types
pub use error::{FaultKind, ProtocolError, TraversalError, WatchError};

// Re-export collaborator interfaces
pub use protocol::{Connector, PropertyCollector, Session};

// Re-export specification types
pub use filter::{FilterConfiguration, FilterSpecification, ObjectSpec};
pub use traversal::{NodeId, SelectionGraph, SelectionGraphBuilder, SelectionNode, TraversalSpecBuilder};

// Re-export delivery types
pub use dispatch::{CollectingSink, DispatchStats, UpdateDispatcher, UpdateSink};

// Re-export watcher types
pub use state::{WatchMode, WatchOutcome, WatchSession, WatchState, WatchSummary};
pub use watcher::ChangeWatcher;
