//! Domain types for vmwatch.
//!
//! # Module Organization
//!
//! - [`reference`] - Managed object references, filter handles, and well-known names
//! - [`update`] - Update sets, object updates, and version cursors
//! - [`options`] - Wait options and property selections
//!
//! All public types are re-exported at this module level and at the crate root:
//!
//! ```
//! use vw_core::{ObjectReference, UpdateSet, Version, WaitOptions};
//! ```

pub mod options;
pub mod reference;
pub mod update;

pub use options::{DEFAULT_MAX_WAIT_SECONDS, PropertySpec, WaitOptions};
pub use reference::{
    CHILD_ENTITY, DATACENTER, FOLDER, FilterHandle, ObjectReference, SUMMARY, VIRTUAL_MACHINE,
    VM_FOLDER,
};
pub use update::{
    ObjectUpdate, ObjectUpdateKind, PropertyChange, PropertyChangeOp, PropertyFilterUpdate,
    UpdateSet, Version,
};
