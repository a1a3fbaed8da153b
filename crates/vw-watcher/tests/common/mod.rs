//! Shared fixtures for the watcher integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use tokio::sync::mpsc;
use vw_core::{Credentials, ObjectReference, ObjectUpdate, WatchConfig};
use vw_sim::{Inventory, Simulator};
use vw_watcher::{ChangeWatcher, Session, UpdateSink};

/// `datacenters` datacenters holding `vms` VMs each, in their VM folders.
pub fn datacenters(datacenters: usize, vms: usize) -> Simulator {
    let mut inventory = Inventory::new();
    let root = inventory.root().clone();
    for d in 0..datacenters {
        let dc = inventory.add_datacenter(&root, &format!("dc{d}")).unwrap();
        let vm_folder = inventory.vm_folder(&dc).unwrap();
        for v in 0..vms {
            inventory.add_vm(&vm_folder, &format!("dc{d}-vm{v}")).unwrap();
        }
    }
    Simulator::new(inventory)
}

pub fn credentials() -> Credentials {
    Credentials::new("sim.local", "monitor", "secret")
}

/// A watcher on a fresh session of `sim`.
pub fn watcher(sim: &Simulator, config: WatchConfig) -> ChangeWatcher {
    let session: Arc<dyn Session> = sim.login(&credentials()).unwrap();
    ChangeWatcher::new(session, config)
}

/// A configuration that blocks until a change arrives.
pub fn unbounded() -> WatchConfig {
    WatchConfig {
        max_wait_seconds: None,
        ..WatchConfig::default()
    }
}

/// Forwards every batch to a channel, so a spawned watch can be observed.
pub struct ChannelSink(pub mpsc::UnboundedSender<Vec<ObjectUpdate>>);

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Vec<ObjectUpdate>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }
}

impl UpdateSink for ChannelSink {
    fn updated(&mut self, updates: &[ObjectUpdate]) {
        let _ = self.0.send(updates.to_vec());
    }
}

pub fn names(sim: &Simulator, updates: &[ObjectUpdate]) -> Vec<String> {
    sim.inspect(|inventory| {
        updates
            .iter()
            .filter_map(|u| inventory.get(&u.obj).map(|o| o.name.clone()))
            .collect()
    })
}

pub fn refs(updates: &[ObjectUpdate]) -> Vec<ObjectReference> {
    updates.iter().map(|u| u.obj.clone()).collect()
}
