//! Core types, configuration, and errors for vmwatch.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - Managed object references and well-known inventory names
//! - Update sets, object updates, and version cursors as returned by the
//!   property collector
//! - Wait options and property selections
//! - Configuration structures and [`ConfigError`]
//! - Type aliases for `FxHashMap`/`FxHashSet`
//!
//! # Crate Dependencies
//!
//! ```text
//! vw-cli ──► vw-watcher ──► vw-core
//!        └─► vw-sim ─────────►
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hash;
pub mod types;

pub use config::{Config, ConnectionConfig, Credentials, WatchConfig};
pub use error::ConfigError;
pub use hash::{FxHashMap, FxHashSet, fx_hash_map, fx_hash_set};
pub use types::*;
