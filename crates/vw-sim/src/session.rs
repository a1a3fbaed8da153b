//! Sessions and connectors backed by a [`Simulator`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use vw_core::{Credentials, FilterHandle, ObjectReference, UpdateSet, Version, WaitOptions};
use vw_watcher::{Connector, FaultKind, FilterSpecification, PropertyCollector, ProtocolError, Session, WatchError};

use crate::simulator::Simulator;

/// Opens [`SimSession`]s.
#[derive(Debug, Clone)]
pub struct SimConnector {
    sim: Simulator,
}

impl SimConnector {
    /// Creates a connector for `sim`.
    #[must_use]
    pub const fn new(sim: Simulator) -> Self {
        Self { sim }
    }

    /// The simulator behind this connector.
    #[must_use]
    pub const fn simulator(&self) -> &Simulator {
        &self.sim
    }
}

#[async_trait]
impl Connector for SimConnector {
    async fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn Session>, WatchError> {
        let session: Arc<dyn Session> = self.sim.login(credentials)?;
        Ok(session)
    }
}

/// An authenticated session on a [`Simulator`].
///
/// Every call after [`logout`](Session::logout) fails with
/// [`FaultKind::NotAuthenticated`].
#[derive(Debug)]
pub struct SimSession {
    sim: Simulator,
    id: u32,
    root: ObjectReference,
    logged_out: AtomicBool,
}

impl SimSession {
    pub(crate) const fn new(sim: Simulator, id: u32, root: ObjectReference) -> Self {
        Self {
            sim,
            id,
            root,
            logged_out: AtomicBool::new(false),
        }
    }

    /// Session number, unique per simulator.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Returns `true` once the session has been logged out.
    #[must_use]
    pub fn is_logged_out(&self) -> bool {
        self.logged_out.load(Ordering::SeqCst)
    }

    fn authenticated(&self) -> Result<(), ProtocolError> {
        if self.is_logged_out() {
            return Err(ProtocolError::new(
                FaultKind::NotAuthenticated,
                format!("session {} has been logged out", self.id),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl PropertyCollector for SimSession {
    async fn create_filter(&self, spec: &FilterSpecification) -> Result<FilterHandle, ProtocolError> {
        self.authenticated()?;
        self.sim.create_filter(self.id, spec)
    }

    async fn wait_for_updates_ex(
        &self,
        filter: &FilterHandle,
        version: &Version,
        options: &WaitOptions,
    ) -> Result<Option<UpdateSet>, ProtocolError> {
        self.authenticated()?;
        self.sim.wait_for_updates(filter, version, options).await
    }

    async fn cancel_wait_for_updates(&self, filter: &FilterHandle) -> Result<(), ProtocolError> {
        self.authenticated()?;
        self.sim.cancel_wait(filter)
    }

    async fn destroy_filter(&self, filter: &FilterHandle) -> Result<(), ProtocolError> {
        self.authenticated()?;
        self.sim.destroy_filter(filter)
    }
}

#[async_trait]
impl Session for SimSession {
    fn root_folder(&self) -> ObjectReference {
        self.root.clone()
    }

    async fn logout(&self) {
        self.sim.record_logout(self.id);
        self.logged_out.store(true, Ordering::SeqCst);
    }
}
