//! Watch mode against the simulated collector: incremental delivery and
//! cancellation.

mod common;

use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use vw_core::{ObjectUpdateKind, PropertyChangeOp, WatchConfig};
use vw_sim::Simulator;
use vw_watcher::{CollectingSink, WatchOutcome};

use crate::common::{ChannelSink, datacenters, refs, unbounded, watcher};

/// Scenario:
/// 1. Watch one VM, receive its initial `Enter`
/// 2. Change its summary while the watcher is blocked in a wait
/// 3. Exactly one `Modify` for that VM arrives in a one-element batch
/// 4. Cancel: the pending wait is interrupted, the filter destroyed once
#[tokio::test]
async fn test_property_change_delivered_as_single_update() {
    let sim = datacenters(1, 1);
    let vm = sim.find_vm("dc0-vm0").unwrap();
    let cancel = CancellationToken::new();
    let (mut sink, mut batches) = ChannelSink::new();

    let task = {
        let watcher = watcher(&sim, unbounded());
        let cancel = cancel.clone();
        tokio::spawn(async move { watcher.watch(&mut sink, &cancel).await })
    };

    let initial = batches.recv().await.unwrap();
    assert_eq!(refs(&initial), [vm.clone()]);
    assert_eq!(initial[0].kind, ObjectUpdateKind::Enter);

    sim.until_blocked().await;
    let summary_value = json!({ "runtime": { "powerState": "poweredOn" } });
    sim.set_property(&vm, "summary", summary_value.clone()).unwrap();

    let changed = batches.recv().await.unwrap();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].obj, vm);
    assert_eq!(changed[0].kind, ObjectUpdateKind::Modify);
    let change = changed[0].change("summary").unwrap();
    assert_eq!(change.op, PropertyChangeOp::Assign);
    assert_eq!(change.val.as_ref(), Some(&summary_value));

    sim.until_blocked().await;
    cancel.cancel();
    let summary = task.await.unwrap().unwrap();

    assert_eq!(summary.outcome, WatchOutcome::Cancelled);
    assert_eq!(summary.polls, 3);
    assert_eq!(summary.delivered.updates, 2);
    let counts = sim.counts();
    assert_eq!(counts.cancel_wait, 1);
    assert_eq!(counts.destroy_filter, 1);
    assert_eq!(counts.logout, 1);
    assert_eq!(sim.active_filters(), 0);
}

/// Scenario:
/// 1. Two datacenters with three VMs each, watched
/// 2. The first batch holds all six VMs as `Enter`
/// 3. One VM's summary changes: the next batch holds exactly that VM as a
///    single `Modify` with one property change
/// 4. Cancel: one interrupted wait, one destroyed filter
#[tokio::test]
async fn test_single_change_among_two_datacenters() {
    let sim = datacenters(2, 3);
    let vm = sim.find_vm("dc1-vm2").unwrap();
    let cancel = CancellationToken::new();
    let (mut sink, mut batches) = ChannelSink::new();

    let task = {
        let watcher = watcher(&sim, unbounded());
        let cancel = cancel.clone();
        tokio::spawn(async move { watcher.watch(&mut sink, &cancel).await })
    };

    let initial = batches.recv().await.unwrap();
    assert_eq!(initial.len(), 6);
    assert!(initial.iter().all(|u| u.kind == ObjectUpdateKind::Enter));
    assert!(refs(&initial).contains(&vm));

    sim.until_blocked().await;
    sim.set_property(&vm, "summary", json!({ "runtime": { "powerState": "poweredOn" } }))
        .unwrap();

    let changed = batches.recv().await.unwrap();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].obj, vm);
    assert_eq!(changed[0].kind, ObjectUpdateKind::Modify);
    assert_eq!(changed[0].change_set.len(), 1);

    sim.until_blocked().await;
    cancel.cancel();
    let summary = task.await.unwrap().unwrap();

    assert_eq!(summary.outcome, WatchOutcome::Cancelled);
    assert_eq!(summary.delivered.updates, 7);
    let counts = sim.counts();
    assert_eq!(counts.cancel_wait, 1);
    assert_eq!(counts.destroy_filter, 1);
    assert_eq!(sim.active_filters(), 0);
}

/// With partial updates, a nested change is reported by its full path.
#[tokio::test]
async fn test_partial_updates_report_nested_path() {
    let sim = datacenters(1, 1);
    let vm = sim.find_vm("dc0-vm0").unwrap();
    let cancel = CancellationToken::new();
    let (mut sink, mut batches) = ChannelSink::new();
    let config = WatchConfig {
        partial_updates: true,
        ..unbounded()
    };

    let task = {
        let watcher = watcher(&sim, config);
        let cancel = cancel.clone();
        tokio::spawn(async move { watcher.watch(&mut sink, &cancel).await })
    };
    let initial = batches.recv().await.unwrap();
    assert!(initial[0].change("summary").is_some());

    sim.until_blocked().await;
    let powered_on = json!({ "config": { "name": "dc0-vm0" }, "runtime": { "powerState": "poweredOn" } });
    sim.set_property(&vm, "summary", powered_on).unwrap();

    let changed = batches.recv().await.unwrap();
    let names: Vec<&str> = changed[0].change_set.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["summary.runtime.powerState"]);
    assert_eq!(
        changed[0].change("summary.runtime.powerState").and_then(|c| c.val.as_ref()),
        Some(&json!("poweredOn"))
    );

    sim.until_blocked().await;
    cancel.cancel();
    task.await.unwrap().unwrap();
}

/// Scenario:
/// 1. Watch with no wait bound, nothing changes
/// 2. Cancel while the wait is pending
/// 3. `cancel_wait_for_updates` issued once, outcome `Cancelled`, filter
///    destroyed exactly once
#[tokio::test]
async fn test_cancel_interrupts_pending_wait() {
    let sim = datacenters(1, 2);
    let cancel = CancellationToken::new();
    let mut sink = CollectingSink::new();
    let watcher = watcher(&sim, unbounded());

    let canceller = {
        let sim = sim.clone();
        let cancel = cancel.clone();
        async move {
            sim.until_blocked().await;
            cancel.cancel();
        }
    };
    let (summary, ()) = tokio::join!(watcher.watch(&mut sink, &cancel), canceller);
    let summary = summary.unwrap();

    assert_eq!(summary.outcome, WatchOutcome::Cancelled);
    assert!(summary.reconciled);
    assert_eq!(sink.len(), 2);
    let counts = sim.counts();
    assert_eq!(counts.cancel_wait, 1);
    assert_eq!(counts.destroy_filter, 1);
    assert_eq!(sim.blocked_waits(), 0);
    assert_eq!(sim.active_filters(), 0);
}

/// With a wait bound, an empty response is only a tick in watch mode.
#[tokio::test(start_paused = true)]
async fn test_empty_waits_keep_watching() {
    let sim = datacenters(1, 1);
    let cancel = CancellationToken::new();
    let mut sink = CollectingSink::new();
    let watcher = watcher(&sim, WatchConfig::default());

    let canceller = {
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(Duration::from_secs(12)).await;
            cancel.cancel();
        }
    };
    let (summary, ()) = tokio::join!(watcher.watch(&mut sink, &cancel), canceller);
    let summary = summary.unwrap();

    // Snapshot, two empty 5s waits, and the wait interrupted at 12s.
    assert_eq!(summary.outcome, WatchOutcome::Cancelled);
    assert_eq!(summary.polls, 4);
    assert_eq!(summary.version.as_str(), "1");
    assert_eq!(sink.len(), 1);
}

/// Cursors handed back to the collector are exactly the ones it issued, in
/// order; a stale cursor would be rejected with `InvalidCollectorVersion`.
#[tokio::test]
async fn test_versions_advance_through_changes() {
    let sim = datacenters(1, 1);
    let vm = sim.find_vm("dc0-vm0").unwrap();
    let cancel = CancellationToken::new();
    let (mut sink, mut batches) = ChannelSink::new();

    let task = {
        let watcher = watcher(&sim, unbounded());
        let cancel = cancel.clone();
        tokio::spawn(async move { watcher.watch(&mut sink, &cancel).await })
    };
    batches.recv().await.unwrap();

    for i in 0..3 {
        sim.until_blocked().await;
        sim.set_property(&vm, "summary", json!({ "generation": i })).unwrap();
        let batch = batches.recv().await.unwrap();
        assert_eq!(batch[0].kind, ObjectUpdateKind::Modify);
    }

    sim.until_blocked().await;
    cancel.cancel();
    let summary = task.await.unwrap().unwrap();
    assert_eq!(summary.version.as_str(), "4");
    assert_eq!(summary.delivered.batches, 4);
}

/// Removing a VM is reported as `Leave`, adding one as `Enter`.
#[tokio::test]
async fn test_add_and_remove_reported() {
    let sim = datacenters(1, 1);
    let vm = sim.find_vm("dc0-vm0").unwrap();
    let vm_folder = sim.inspect(|inv| inv.find(vw_core::FOLDER, "vm")).unwrap();
    let cancel = CancellationToken::new();
    let (mut sink, mut batches) = ChannelSink::new();

    let task = {
        let watcher = watcher(&sim, unbounded());
        let cancel = cancel.clone();
        tokio::spawn(async move { watcher.watch(&mut sink, &cancel).await })
    };
    batches.recv().await.unwrap();

    sim.until_blocked().await;
    sim.remove(&vm).unwrap();
    let left = batches.recv().await.unwrap();
    assert_eq!(refs(&left), [vm.clone()]);
    assert_eq!(left[0].kind, ObjectUpdateKind::Leave);

    sim.until_blocked().await;
    let added = sim.add_vm(&vm_folder, "new").unwrap();
    let entered = batches.recv().await.unwrap();
    assert_eq!(refs(&entered), [added]);
    assert_eq!(entered[0].kind, ObjectUpdateKind::Enter);

    sim.until_blocked().await;
    cancel.cancel();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_cancel_before_first_response() {
    let sim = Simulator::new(vw_sim::Inventory::new());
    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut sink = CollectingSink::new();

    let summary = watcher(&sim, unbounded()).watch(&mut sink, &cancel).await.unwrap();

    assert_eq!(summary.outcome, WatchOutcome::Cancelled);
    assert!(sink.is_empty());
    assert_eq!(sim.counts().destroy_filter, 1);
    assert_eq!(sim.active_filters(), 0);
}
