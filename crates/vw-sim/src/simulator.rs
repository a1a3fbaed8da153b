//! The simulated property collector.
//!
//! # Filter Model
//!
//! Every filter remembers what its client has been told: the object set and
//! property values as of the last version it issued. A wait call presenting
//! that version receives the difference to the current inventory, as
//! `Enter`, `Modify` and `Leave` updates, under a fresh version. Presenting
//! the initial version starts over with a full snapshot. Any other version
//! is rejected with `InvalidCollectorVersion`.
//!
//! A `Modify` normally carries each changed property as one `assign` of its
//! whole value. A filter created with partial updates instead reports the
//! nested paths that changed inside object values, such as
//! `summary.runtime.powerState`.
//!
//! Logging a session out destroys every filter it still owns.
//!
//! When there is no difference the call blocks until the inventory changes,
//! the wait bound elapses (`Ok(None)`), or the wait is cancelled
//! (`RequestCanceled`).
//!
//! # Thread Safety
//!
//! [`Simulator`] is a cheap handle around shared state. Mutations made
//! through any handle wake every pending wait.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::Notify;
use tracing::{debug, trace};
use vw_core::{
    Credentials, FilterHandle, FxHashMap, FxHashSet, ObjectReference, ObjectUpdate, ObjectUpdateKind,
    PropertyChange, PropertyFilterUpdate, UpdateSet, VIRTUAL_MACHINE, Version, WaitOptions, fx_hash_map,
};
use vw_watcher::{FaultKind, FilterSpecification, ProtocolError, WatchError};

use crate::error::SimError;
use crate::fault::{CallCounts, Fault, FaultPlan, SimCall};
use crate::inventory::{Inventory, PropertyValues};
use crate::session::{SimConnector, SimSession};

/// Handle to a simulated endpoint.
///
/// # Examples
///
/// ```
/// use vw_sim::{Inventory, Simulator};
///
/// let mut inventory = Inventory::new();
/// let root = inventory.root().clone();
/// let dc = inventory.add_datacenter(&root, "dc1")?;
/// let vm_folder = inventory.vm_folder(&dc).unwrap();
/// inventory.add_vm(&vm_folder, "web-01")?;
///
/// let sim = Simulator::new(inventory);
/// assert!(sim.find_vm("web-01").is_some());
/// assert_eq!(sim.active_filters(), 0);
/// # Ok::<(), vw_sim::SimError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Simulator {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<ServerState>,
    changed: Notify,
    blocked: AtomicUsize,
}

/// Counts a wait call while it is blocked.
struct BlockedWait<'a>(&'a AtomicUsize);

impl<'a> BlockedWait<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for BlockedWait<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
struct ServerState {
    inventory: Inventory,
    filters: FxHashMap<FilterHandle, FilterState>,
    login: Option<(String, String)>,
    faults: FaultPlan,
    counts: CallCounts,
    next_filter: u32,
    next_session: u32,
}

impl ServerState {
    fn enter(&mut self, call: SimCall) -> Result<(), ProtocolError> {
        self.counts.record(call);
        self.faults.trigger(call).map_or(Ok(()), Err)
    }

    fn filter(&mut self, handle: &FilterHandle) -> Result<&mut FilterState, ProtocolError> {
        self.filters
            .get_mut(handle)
            .ok_or_else(|| ProtocolError::new(FaultKind::ManagedObjectNotFound, format!("filter {handle}")))
    }
}

impl Simulator {
    /// Serves `inventory`, accepting any credentials.
    #[must_use]
    pub fn new(inventory: Inventory) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ServerState {
                    inventory,
                    filters: fx_hash_map(),
                    login: None,
                    faults: FaultPlan::default(),
                    counts: CallCounts::default(),
                    next_filter: 1,
                    next_session: 1,
                }),
                changed: Notify::new(),
                blocked: AtomicUsize::new(0),
            }),
        }
    }

    /// Only accepts logins with these credentials from now on.
    pub fn require_login(&self, user: impl Into<String>, password: impl Into<String>) {
        self.shared.state.lock().login = Some((user.into(), password.into()));
    }

    /// Returns a connector opening sessions on this endpoint.
    #[must_use]
    pub fn connector(&self) -> SimConnector {
        SimConnector::new(self.clone())
    }

    /// Logs in, bypassing the connector.
    pub fn login(&self, credentials: &Credentials) -> Result<Arc<SimSession>, WatchError> {
        let mut state = self.shared.state.lock();
        state.counts.record(SimCall::Login);
        if let Some(error) = state.faults.trigger(SimCall::Login) {
            return Err(WatchError::connection(&credentials.host, error.to_string()));
        }
        if let Some((user, password)) = &state.login {
            if *user != credentials.user || *password != credentials.password {
                return Err(WatchError::connection(
                    &credentials.host,
                    "incorrect user name or password",
                ));
            }
        }
        let id = state.next_session;
        state.next_session += 1;
        let root = state.inventory.root().clone();
        debug!(session = id, user = %credentials.user, "Simulated login");
        Ok(Arc::new(SimSession::new(self.clone(), id, root)))
    }

    /// Fails a future call.
    pub fn inject(&self, fault: Fault) {
        self.shared.state.lock().faults.push(fault);
    }

    /// Drops every pending fault.
    pub fn clear_faults(&self) {
        self.shared.state.lock().faults.clear();
    }

    /// Returns the calls served so far.
    #[must_use]
    pub fn counts(&self) -> CallCounts {
        self.shared.state.lock().counts
    }

    /// Number of filters that exist on the endpoint.
    #[must_use]
    pub fn active_filters(&self) -> usize {
        self.shared.state.lock().filters.len()
    }

    /// Number of wait calls currently blocked with nothing to report.
    #[must_use]
    pub fn blocked_waits(&self) -> usize {
        self.shared.blocked.load(Ordering::SeqCst)
    }

    /// Waits until at least one wait call is blocked.
    pub async fn until_blocked(&self) {
        while self.blocked_waits() == 0 {
            tokio::task::yield_now().await;
        }
    }

    /// The root folder.
    #[must_use]
    pub fn root(&self) -> ObjectReference {
        self.shared.state.lock().inventory.root().clone()
    }

    /// Finds a virtual machine by name.
    #[must_use]
    pub fn find_vm(&self, name: &str) -> Option<ObjectReference> {
        self.shared.state.lock().inventory.find(VIRTUAL_MACHINE, name)
    }

    /// Runs `f` against the current inventory.
    pub fn inspect<R>(&self, f: impl FnOnce(&Inventory) -> R) -> R {
        f(&self.shared.state.lock().inventory)
    }

    /// Applies `f` to the inventory and wakes every pending wait.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut Inventory) -> Result<R, SimError>) -> Result<R, SimError> {
        let result = f(&mut self.shared.state.lock().inventory);
        if result.is_ok() {
            self.shared.changed.notify_waiters();
        }
        result
    }

    /// Sets property `path` of `obj`.
    pub fn set_property(&self, obj: &ObjectReference, path: &str, value: Value) -> Result<(), SimError> {
        self.mutate(|inventory| inventory.set_property(obj, path, value))
    }

    /// Creates a virtual machine inside `parent`.
    pub fn add_vm(&self, parent: &ObjectReference, name: &str) -> Result<ObjectReference, SimError> {
        self.mutate(|inventory| inventory.add_vm(parent, name))
    }

    /// Removes `obj` and everything below it.
    pub fn remove(&self, obj: &ObjectReference) -> Result<usize, SimError> {
        self.mutate(|inventory| inventory.remove(obj))
    }

    /// Counts a logout and destroys every filter the session still owns.
    pub(crate) fn record_logout(&self, session: u32) {
        let mut state = self.shared.state.lock();
        state.counts.logout += 1;
        let before = state.filters.len();
        state.filters.retain(|_, filter| {
            if filter.session != session {
                return true;
            }
            filter.cancel.notify_waiters();
            false
        });
        let reaped = before - state.filters.len();
        debug!(session, reaped, "Simulated logout");
    }

    pub(crate) fn create_filter(
        &self,
        session: u32,
        spec: &FilterSpecification,
    ) -> Result<FilterHandle, ProtocolError> {
        let mut state = self.shared.state.lock();
        state.enter(SimCall::CreateFilter)?;

        if spec.object_set.is_empty() {
            return Err(ProtocolError::new(FaultKind::InvalidArgument, "object set is empty"));
        }
        if spec.prop_set.is_empty() || spec.prop_set.iter().any(|p| p.path_set.is_empty()) {
            return Err(ProtocolError::new(FaultKind::InvalidArgument, "property set is empty"));
        }
        if let Some(missing) = spec.object_set.iter().find(|o| !state.inventory.contains(&o.obj)) {
            return Err(ProtocolError::new(
                FaultKind::ManagedObjectNotFound,
                missing.obj.to_string(),
            ));
        }

        let handle = FilterHandle::new(format!("session[{session}]filter-{}", state.next_filter));
        state.next_filter += 1;
        state.filters.insert(handle.clone(), FilterState::new(session, spec.clone()));
        debug!(%handle, "Simulated filter created");
        Ok(handle)
    }

    pub(crate) async fn wait_for_updates(
        &self,
        handle: &FilterHandle,
        version: &Version,
        options: &WaitOptions,
    ) -> Result<Option<UpdateSet>, ProtocolError> {
        let deadline = options
            .max_wait_seconds
            .map(|seconds| tokio::time::Instant::now() + Duration::from_secs(u64::from(seconds)));
        let page = options.max_object_updates.map(|n| usize::try_from(n).unwrap_or(usize::MAX));

        let cancel = {
            let mut state = self.shared.state.lock();
            state.enter(SimCall::WaitForUpdates)?;
            let filter = state.filter(handle)?;
            filter.resume(version)?;
            Arc::clone(&filter.cancel)
        };

        loop {
            let changed = self.shared.changed.notified();
            let cancelled = cancel.notified();
            tokio::pin!(changed, cancelled);
            changed.as_mut().enable();
            cancelled.as_mut().enable();

            {
                let mut state = self.shared.state.lock();
                let ServerState { inventory, filters, .. } = &mut *state;
                let filter = filters.get_mut(handle).ok_or_else(|| {
                    ProtocolError::new(FaultKind::ManagedObjectNotFound, format!("filter {handle}"))
                })?;
                if let Some(set) = filter.poll(inventory, handle, page) {
                    trace!(%handle, version = %set.version, objects = set.object_count(), "Simulated update set");
                    return Ok(Some(set));
                }
            }

            let bound = async {
                match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            };

            let _blocked = BlockedWait::enter(&self.shared.blocked);
            tokio::select! {
                () = changed => {}
                () = cancelled => return Err(ProtocolError::request_canceled()),
                () = bound => return Ok(None),
            }
        }
    }

    pub(crate) fn cancel_wait(&self, handle: &FilterHandle) -> Result<(), ProtocolError> {
        let mut state = self.shared.state.lock();
        state.enter(SimCall::CancelWait)?;
        state.filter(handle)?.cancel.notify_waiters();
        Ok(())
    }

    pub(crate) fn destroy_filter(&self, handle: &FilterHandle) -> Result<(), ProtocolError> {
        let mut state = self.shared.state.lock();
        state.enter(SimCall::DestroyFilter)?;
        let filter = state.filters.remove(handle).ok_or_else(|| {
            ProtocolError::new(FaultKind::ManagedObjectNotFound, format!("filter {handle}"))
        })?;
        filter.cancel.notify_waiters();
        debug!(%handle, "Simulated filter destroyed");
        Ok(())
    }
}

/// Server-side state of one filter.
#[derive(Debug)]
struct FilterState {
    session: u32,
    spec: FilterSpecification,
    known: BTreeMap<ObjectReference, PropertyValues>,
    version: Option<Version>,
    issued: u64,
    cancel: Arc<Notify>,
}

impl FilterState {
    fn new(session: u32, spec: FilterSpecification) -> Self {
        Self {
            session,
            spec,
            known: BTreeMap::new(),
            version: None,
            issued: 0,
            cancel: Arc::new(Notify::new()),
        }
    }

    /// Positions the filter at the client's `version`.
    fn resume(&mut self, version: &Version) -> Result<(), ProtocolError> {
        if version.is_initial() {
            self.known.clear();
            return Ok(());
        }
        if self.version.as_ref() == Some(version) {
            return Ok(());
        }
        Err(ProtocolError::new(
            FaultKind::InvalidCollectorVersion,
            format!("version {version} was not issued by this filter"),
        ))
    }

    /// Returns the next page of differences, or `None` when the client is
    /// up to date.
    fn poll(&mut self, inventory: &Inventory, handle: &FilterHandle, page: Option<usize>) -> Option<UpdateSet> {
        let current: Vec<(ObjectReference, PropertyValues)> = inventory
            .evaluate(&self.spec)
            .into_iter()
            .filter_map(|obj| {
                let props = self.spec.properties_for(&obj.kind)?;
                let values = inventory.properties(&obj, props);
                Some((obj, values))
            })
            .collect();
        let present: FxHashSet<&ObjectReference> = current.iter().map(|(obj, _)| obj).collect();

        let mut pending: Vec<(ObjectUpdate, Option<PropertyValues>)> = Vec::new();
        for (obj, values) in &current {
            match self.known.get(obj) {
                None => {
                    let changes = values
                        .iter()
                        .map(|(path, value)| PropertyChange::assign(path.clone(), value.clone()))
                        .collect();
                    pending.push((
                        ObjectUpdate::new(ObjectUpdateKind::Enter, obj.clone(), changes),
                        Some(values.clone()),
                    ));
                }
                Some(old) if old != values => {
                    pending.push((
                        ObjectUpdate::new(
                            ObjectUpdateKind::Modify,
                            obj.clone(),
                            diff(old, values, self.spec.partial_updates),
                        ),
                        Some(values.clone()),
                    ));
                }
                Some(_) => {}
            }
        }
        for obj in self.known.keys().filter(|obj| !present.contains(obj)) {
            pending.push((ObjectUpdate::new(ObjectUpdateKind::Leave, obj.clone(), Vec::new()), None));
        }

        if pending.is_empty() {
            return None;
        }

        let limit = page.unwrap_or(usize::MAX).max(1);
        let truncated = pending.len() > limit;
        pending.truncate(limit);

        let mut object_set = Vec::with_capacity(pending.len());
        for (update, values) in pending {
            match values {
                Some(values) => {
                    self.known.insert(update.obj.clone(), values);
                }
                None => {
                    self.known.remove(&update.obj);
                }
            }
            object_set.push(update);
        }

        self.issued += 1;
        let version = Version::new(self.issued.to_string());
        self.version = Some(version.clone());

        let mut set = UpdateSet::new(version);
        set.truncated = truncated.then_some(true);
        set.filter_set.push(PropertyFilterUpdate {
            filter: handle.clone(),
            object_set,
        });
        Some(set)
    }
}

/// Changes between two snapshots of an object's reported properties.
///
/// With `partial` set, changed JSON objects are descended into and reported
/// per nested path.
fn diff(old: &PropertyValues, new: &PropertyValues, partial: bool) -> Vec<PropertyChange> {
    let mut changes = Vec::new();
    for (path, value) in new {
        match old.get(path) {
            Some(previous) if previous == value => {}
            Some(previous) if partial => diff_nested(path, previous, value, &mut changes),
            _ => changes.push(PropertyChange::assign(path.clone(), value.clone())),
        }
    }
    changes.extend(
        old.keys()
            .filter(|path| !new.contains_key(*path))
            .map(|path| PropertyChange::remove(path.clone())),
    );
    changes
}

fn diff_nested(path: &str, old: &Value, new: &Value, changes: &mut Vec<PropertyChange>) {
    let (Value::Object(old), Value::Object(new)) = (old, new) else {
        if old != new {
            changes.push(PropertyChange::assign(path, new.clone()));
        }
        return;
    };
    for (key, value) in new {
        let nested = format!("{path}.{key}");
        match old.get(key) {
            Some(previous) => diff_nested(&nested, previous, value, changes),
            None => changes.push(PropertyChange::assign(nested, value.clone())),
        }
    }
    for key in old.keys().filter(|key| !new.contains_key(*key)) {
        changes.push(PropertyChange::remove(format!("{path}.{key}")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vw_core::PropertySpec;
    use vw_watcher::{FilterConfiguration, TraversalSpecBuilder};

    fn simulator(vms: usize) -> Simulator {
        let mut inventory = Inventory::new();
        let root = inventory.root().clone();
        let dc = inventory.add_datacenter(&root, "dc1").unwrap();
        let vm_folder = inventory.vm_folder(&dc).unwrap();
        for i in 0..vms {
            inventory.add_vm(&vm_folder, &format!("vm{i}")).unwrap();
        }
        Simulator::new(inventory)
    }

    fn spec(sim: &Simulator) -> FilterSpecification {
        let graph = TraversalSpecBuilder::virtual_machines().unwrap();
        FilterConfiguration::for_virtual_machines(sim.root(), graph).into_parts().0
    }

    #[tokio::test]
    async fn test_initial_wait_returns_snapshot() {
        let sim = simulator(3);
        let handle = sim.create_filter(1, &spec(&sim)).unwrap();

        let set = sim
            .wait_for_updates(&handle, &Version::initial(), &WaitOptions::bounded(5))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(set.version, Version::new("1"));
        assert!(!set.is_truncated());
        assert_eq!(set.object_count(), 3);
        assert!(set.objects().all(|u| u.kind == ObjectUpdateKind::Enter));
        assert!(set.objects().all(|u| u.change("summary").is_some()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_up_to_date_wait_times_out() {
        let sim = simulator(1);
        let handle = sim.create_filter(1, &spec(&sim)).unwrap();
        let options = WaitOptions::bounded(5);
        let first = sim.wait_for_updates(&handle, &Version::initial(), &options).await.unwrap().unwrap();

        let started = tokio::time::Instant::now();
        let second = sim.wait_for_updates(&handle, &first.version, &options).await.unwrap();
        assert!(second.is_none());
        assert_eq!(started.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_unknown_version_rejected() {
        let sim = simulator(1);
        let handle = sim.create_filter(1, &spec(&sim)).unwrap();

        let err = sim
            .wait_for_updates(&handle, &Version::new("42"), &WaitOptions::bounded(5))
            .await
            .unwrap_err();
        assert_eq!(err.fault, FaultKind::InvalidCollectorVersion);
    }

    #[tokio::test]
    async fn test_paging_truncates() {
        let sim = simulator(5);
        let handle = sim.create_filter(1, &spec(&sim)).unwrap();
        let options = WaitOptions {
            max_wait_seconds: Some(5),
            max_object_updates: Some(2),
        };

        let mut version = Version::initial();
        let mut pages = Vec::new();
        loop {
            let set = sim.wait_for_updates(&handle, &version, &options).await.unwrap().unwrap();
            version = set.version.clone();
            pages.push((set.object_count(), set.is_truncated()));
            if !set.is_truncated() {
                break;
            }
        }
        assert_eq!(pages, [(2, true), (2, true), (1, false)]);
    }

    #[tokio::test]
    async fn test_modify_and_leave() {
        let sim = simulator(2);
        let handle = sim.create_filter(1, &spec(&sim)).unwrap();
        let options = WaitOptions::bounded(5);
        let first = sim.wait_for_updates(&handle, &Version::initial(), &options).await.unwrap().unwrap();

        let vm0 = sim.find_vm("vm0").unwrap();
        let vm1 = sim.find_vm("vm1").unwrap();
        sim.set_property(&vm0, "summary", json!({"runtime": {"powerState": "poweredOn"}})).unwrap();
        sim.remove(&vm1).unwrap();

        let second = sim.wait_for_updates(&handle, &first.version, &options).await.unwrap().unwrap();
        let updates: Vec<(&ObjectReference, ObjectUpdateKind)> = second.objects().map(|u| (&u.obj, u.kind)).collect();
        assert_eq!(updates, [(&vm0, ObjectUpdateKind::Modify), (&vm1, ObjectUpdateKind::Leave)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreported_property_change_is_silent() {
        let sim = simulator(1);
        let handle = sim.create_filter(1, &spec(&sim)).unwrap();
        let options = WaitOptions::bounded(1);
        let first = sim.wait_for_updates(&handle, &Version::initial(), &options).await.unwrap().unwrap();

        let vm0 = sim.find_vm("vm0").unwrap();
        sim.set_property(&vm0, "guest", json!({"ipAddress": "10.0.0.1"})).unwrap();

        let second = sim.wait_for_updates(&handle, &first.version, &options).await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_change_wakes_pending_wait() {
        let sim = simulator(1);
        let handle = sim.create_filter(1, &spec(&sim)).unwrap();
        let options = WaitOptions::unbounded();
        let first = sim.wait_for_updates(&handle, &Version::initial(), &options).await.unwrap().unwrap();

        let waiter = {
            let sim = sim.clone();
            let handle = handle.clone();
            tokio::spawn(async move { sim.wait_for_updates(&handle, &first.version, &options).await })
        };
        tokio::task::yield_now().await;

        let root_vm_folder = sim.inspect(|inv| inv.find(vw_core::FOLDER, "vm")).unwrap();
        let added = sim.add_vm(&root_vm_folder, "late").unwrap();

        let set = waiter.await.unwrap().unwrap().unwrap();
        assert_eq!(set.objects().map(|u| &u.obj).collect::<Vec<_>>(), [&added]);
    }

    #[tokio::test]
    async fn test_cancel_fails_pending_wait() {
        let sim = simulator(1);
        let handle = sim.create_filter(1, &spec(&sim)).unwrap();
        let options = WaitOptions::unbounded();
        let first = sim.wait_for_updates(&handle, &Version::initial(), &options).await.unwrap().unwrap();

        let waiter = {
            let sim = sim.clone();
            let handle = handle.clone();
            tokio::spawn(async move { sim.wait_for_updates(&handle, &first.version, &options).await })
        };
        sim.until_blocked().await;
        sim.cancel_wait(&handle).unwrap();

        let err = waiter.await.unwrap().unwrap_err();
        assert_eq!(err.fault, FaultKind::RequestCanceled);
    }

    #[test]
    fn test_create_filter_validation() {
        let sim = simulator(0);
        let mut bad = spec(&sim);
        bad.prop_set.clear();
        assert_eq!(sim.create_filter(1, &bad).unwrap_err().fault, FaultKind::InvalidArgument);

        let mut bad = spec(&sim);
        bad.prop_set = vec![PropertySpec::new(VIRTUAL_MACHINE, Vec::<String>::new())];
        assert_eq!(sim.create_filter(1, &bad).unwrap_err().fault, FaultKind::InvalidArgument);

        let mut bad = spec(&sim);
        bad.object_set[0].obj = ObjectReference::folder("group-v404");
        assert_eq!(
            sim.create_filter(1, &bad).unwrap_err().fault,
            FaultKind::ManagedObjectNotFound
        );
        assert_eq!(sim.active_filters(), 0);
        assert_eq!(sim.counts().create_filter, 3);
    }

    #[test]
    fn test_destroy_twice_fails() {
        let sim = simulator(0);
        let handle = sim.create_filter(1, &spec(&sim)).unwrap();
        assert!(sim.destroy_filter(&handle).is_ok());
        assert_eq!(
            sim.destroy_filter(&handle).unwrap_err().fault,
            FaultKind::ManagedObjectNotFound
        );
        assert_eq!(sim.active_filters(), 0);
    }

    #[test]
    fn test_login_checks_credentials() {
        let sim = simulator(0);
        sim.require_login("monitor", "secret");

        let err = sim.login(&Credentials::new("vc01", "monitor", "wrong")).unwrap_err();
        assert!(matches!(err, WatchError::Connection { .. }));
        assert!(sim.login(&Credentials::new("vc01", "monitor", "secret")).is_ok());
        assert_eq!(sim.counts().login, 2);
    }

    #[test]
    fn test_diff() {
        let old: PropertyValues = [("a".to_owned(), json!(1)), ("b".to_owned(), json!(2))].into();
        let new: PropertyValues = [("a".to_owned(), json!(1)), ("c".to_owned(), json!(3))].into();
        let changes = diff(&old, &new, false);
        assert_eq!(changes, [PropertyChange::assign("c", json!(3)), PropertyChange::remove("b")]);
    }

    #[test]
    fn test_diff_partial_descends_into_objects() {
        let old: PropertyValues = [(
            "summary".to_owned(),
            json!({"config": {"name": "vm0", "annotation": "db"}, "runtime": {"powerState": "poweredOff"}}),
        )]
        .into();
        let new: PropertyValues = [(
            "summary".to_owned(),
            json!({"config": {"name": "vm0"}, "runtime": {"powerState": "poweredOn", "host": "host-9"}}),
        )]
        .into();

        assert_eq!(diff(&old, &new, false), [PropertyChange::assign("summary", new["summary"].clone())]);
        let mut nested = diff(&old, &new, true);
        nested.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(
            nested,
            [
                PropertyChange::remove("summary.config.annotation"),
                PropertyChange::assign("summary.runtime.host", json!("host-9")),
                PropertyChange::assign("summary.runtime.powerState", json!("poweredOn")),
            ]
        );
    }

    #[tokio::test]
    async fn test_partial_filter_reports_nested_paths() {
        let sim = simulator(1);
        let mut partial = spec(&sim);
        partial.partial_updates = true;
        let whole = sim.create_filter(1, &spec(&sim)).unwrap();
        let nested = sim.create_filter(1, &partial).unwrap();
        let options = WaitOptions::bounded(5);
        let whole_v1 = sim.wait_for_updates(&whole, &Version::initial(), &options).await.unwrap().unwrap();
        let nested_v1 = sim.wait_for_updates(&nested, &Version::initial(), &options).await.unwrap().unwrap();

        let vm0 = sim.find_vm("vm0").unwrap();
        let powered_on = json!({"config": {"name": "vm0"}, "runtime": {"powerState": "poweredOn"}});
        sim.set_property(&vm0, "summary", powered_on.clone()).unwrap();

        let whole_v2 = sim.wait_for_updates(&whole, &whole_v1.version, &options).await.unwrap().unwrap();
        let nested_v2 = sim.wait_for_updates(&nested, &nested_v1.version, &options).await.unwrap().unwrap();

        let whole_changes: Vec<&PropertyChange> = whole_v2.objects().flat_map(|u| &u.change_set).collect();
        assert_eq!(whole_changes, [&PropertyChange::assign("summary", powered_on)]);
        let nested_changes: Vec<&PropertyChange> = nested_v2.objects().flat_map(|u| &u.change_set).collect();
        assert_eq!(
            nested_changes,
            [&PropertyChange::assign("summary.runtime.powerState", json!("poweredOn"))]
        );
    }

    #[test]
    fn test_logout_reaps_session_filters() {
        let sim = simulator(0);
        let first = sim.create_filter(1, &spec(&sim)).unwrap();
        sim.create_filter(1, &spec(&sim)).unwrap();
        sim.create_filter(2, &spec(&sim)).unwrap();
        assert!(sim.destroy_filter(&first).is_ok());

        sim.record_logout(1);
        assert_eq!(sim.active_filters(), 1);
        sim.record_logout(2);
        assert_eq!(sim.active_filters(), 0);
        assert_eq!(sim.counts().logout, 2);
    }
}
