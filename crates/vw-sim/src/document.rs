//! JSON inventory documents.
//!
//! A document describes the tree below the root folder:
//!
//! ```json
//! {
//!   "datacenters": [
//!     {
//!       "name": "dc1",
//!       "vms": [{ "name": "web-01" }],
//!       "folders": [{ "name": "prod", "vms": [{ "name": "db-01" }] }]
//!     }
//!   ],
//!   "folders": [{ "name": "emea", "datacenters": [{ "name": "dc2" }] }]
//! }
//! ```
//!
//! VMs and folders listed under a datacenter land in its VM folder. A VM
//! without a `summary` gets [`default_summary`].

use camino::Utf8Path;
use serde::Deserialize;
use serde_json::Value;
use vw_core::ObjectReference;

use crate::error::SimError;
use crate::inventory::{Inventory, default_summary};

/// Top-level document: the contents of the root folder.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InventoryDocument {
    /// Datacenters directly below the root folder.
    pub datacenters: Vec<DatacenterDocument>,
    /// Folders directly below the root folder.
    pub folders: Vec<FolderDocument>,
    /// VMs directly below the root folder.
    pub vms: Vec<VmDocument>,
}

/// A folder and its contents.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FolderDocument {
    /// Folder name.
    pub name: String,
    /// Nested datacenters.
    pub datacenters: Vec<DatacenterDocument>,
    /// Nested folders.
    pub folders: Vec<FolderDocument>,
    /// Contained VMs.
    pub vms: Vec<VmDocument>,
}

/// A datacenter and the contents of its VM folder.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatacenterDocument {
    /// Datacenter name.
    pub name: String,
    /// Folders inside the VM folder.
    pub folders: Vec<FolderDocument>,
    /// VMs inside the VM folder.
    pub vms: Vec<VmDocument>,
}

/// A virtual machine.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VmDocument {
    /// VM name.
    pub name: String,
    /// Reported summary. Defaults to a powered-off summary.
    pub summary: Option<Value>,
}

impl InventoryDocument {
    /// Builds the inventory this document describes.
    pub fn build(&self) -> Result<Inventory, SimError> {
        let mut inventory = Inventory::new();
        let root = inventory.root().clone();
        populate(&mut inventory, &root, &self.datacenters, &self.folders, &self.vms)?;
        Ok(inventory)
    }
}

impl Inventory {
    /// Parses a JSON inventory document.
    pub fn from_json_str(json: &str) -> Result<Self, SimError> {
        let document: InventoryDocument = serde_json::from_str(json)?;
        document.build()
    }

    /// Reads and parses a JSON inventory document.
    pub fn from_json_file(path: &Utf8Path) -> Result<Self, SimError> {
        if !path.exists() {
            return Err(SimError::MissingFile(path.to_owned()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}

fn populate(
    inventory: &mut Inventory,
    parent: &ObjectReference,
    datacenters: &[DatacenterDocument],
    folders: &[FolderDocument],
    vms: &[VmDocument],
) -> Result<(), SimError> {
    for datacenter in datacenters {
        let dc = inventory.add_datacenter(parent, &datacenter.name)?;
        let vm_folder = inventory
            .vm_folder(&dc)
            .ok_or_else(|| SimError::UnknownObject(dc.clone()))?;
        populate(inventory, &vm_folder, &[], &datacenter.folders, &datacenter.vms)?;
    }
    for folder in folders {
        let obj = inventory.add_folder(parent, &folder.name)?;
        populate(inventory, &obj, &folder.datacenters, &folder.folders, &folder.vms)?;
    }
    for vm in vms {
        let summary = vm.summary.clone().unwrap_or_else(|| default_summary(&vm.name));
        inventory.add_vm_with_summary(parent, &vm.name, summary)?;
    }
    Ok(())
}
