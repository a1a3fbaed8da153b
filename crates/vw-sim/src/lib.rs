//! An in-process property collector for exercising the change watcher.
//!
//! The simulator keeps an inventory of folders, datacenters and virtual
//! machines, evaluates selection graphs against it server-side, and serves
//! the four property collector calls with real versioning: initial
//! snapshots, incremental `Enter` / `Modify` / `Leave` updates, paging with
//! `truncated`, bounded waits and cancellation.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐ connect  ┌────────────┐   calls   ┌─────────────────────┐
//! │ SimConnector │ ───────► │ SimSession │ ────────► │ Simulator (shared)  │
//! └──────────────┘          └────────────┘           │  ├─ Inventory       │
//!                                                    │  ├─ FilterState ×N  │
//!        set_property / add_vm / remove ───────────► │  ├─ FaultPlan       │
//!        (wakes pending waits)                       │  └─ CallCounts      │
//!                                                    └─────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use vw_core::WatchConfig;
//! use vw_sim::{Inventory, Simulator};
//! use vw_watcher::{ChangeWatcher, CollectingSink, WatchOutcome};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let inventory = Inventory::from_json_str(r#"{ "datacenters": [{ "name": "dc1", "vms": [{ "name": "web-01" }] }] }"#)?;
//! let sim = Simulator::new(inventory);
//!
//! let credentials = vw_core::Credentials::new("sim", "monitor", "secret");
//! let watcher = ChangeWatcher::connect(&sim.connector(), &credentials, WatchConfig::default()).await?;
//!
//! let mut sink = CollectingSink::new();
//! let summary = watcher.list(&mut sink).await?;
//! assert_eq!(summary.outcome, WatchOutcome::Done);
//! assert_eq!(sink.len(), 1);
//! assert_eq!(sim.active_filters(), 0);
//! # Ok(())
//! # }
//! ```
//!
//! # Fault Injection
//!
//! ```
//! use vw_sim::{Fault, Inventory, SimCall, Simulator};
//! use vw_watcher::FaultKind;
//!
//! let sim = Simulator::new(Inventory::new());
//! sim.inject(Fault::new(SimCall::CreateFilter, FaultKind::InvalidArgument, "rejected"));
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod document;
pub mod error;
pub mod fault;
pub mod inventory;
pub mod session;
pub mod simulator;

// Re-export error types
pub use error::SimError;

// Re-export inventory types
pub use document::{DatacenterDocument, FolderDocument, InventoryDocument, VmDocument};
pub use inventory::{Inventory, ManagedObject, PropertyValues, ROOT_FOLDER_ID, default_summary};

// Re-export simulator types
pub use fault::{CallCounts, Fault, SimCall};
pub use session::{SimConnector, SimSession};
pub use simulator::Simulator;
