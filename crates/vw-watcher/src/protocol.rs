//! Collaborator interfaces consumed by the watcher.
//!
//! The watcher never talks to a transport directly. It receives a
//! [`Session`] from a [`Connector`] and issues the four property collector
//! calls of [`PropertyCollector`] through it.
//!
//! # Thread Safety
//!
//! All traits are object safe and require [`Send`] + [`Sync`], so a session
//! can be shared as `Arc<dyn Session>` between the poll loop and the task
//! that delivers a cancel request.

use std::sync::Arc;

use async_trait::async_trait;
use vw_core::{Credentials, FilterHandle, ObjectReference, UpdateSet, Version, WaitOptions};

use crate::error::{ProtocolError, WatchError};
use crate::filter::FilterSpecification;

/// The remote property-tracking service.
#[async_trait]
pub trait PropertyCollector: Send + Sync {
    /// Creates a filter on the collector.
    async fn create_filter(&self, spec: &FilterSpecification) -> Result<FilterHandle, ProtocolError>;

    /// Blocks until changes newer than `version` exist or the wait bound in
    /// `options` elapses.
    ///
    /// Returns `Ok(None)` when the bound elapsed without changes.
    async fn wait_for_updates_ex(
        &self,
        filter: &FilterHandle,
        version: &Version,
        options: &WaitOptions,
    ) -> Result<Option<UpdateSet>, ProtocolError>;

    /// Interrupts a pending wait on `filter`. Best effort.
    async fn cancel_wait_for_updates(&self, filter: &FilterHandle) -> Result<(), ProtocolError>;

    /// Destroys `filter`. Best effort.
    async fn destroy_filter(&self, filter: &FilterHandle) -> Result<(), ProtocolError>;
}

/// An authenticated session.
#[async_trait]
pub trait Session: PropertyCollector {
    /// The inventory root folder of this endpoint.
    fn root_folder(&self) -> ObjectReference;

    /// Ends the session. Idempotent and best effort.
    async fn logout(&self);
}

/// Opens sessions.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connects and logs in.
    ///
    /// Failures are reported as [`WatchError::Connection`].
    async fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn Session>, WatchError>;
}

#[async_trait]
impl<C: Connector + ?Sized> Connector for Arc<C> {
    async fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn Session>, WatchError> {
        (**self).connect(credentials).await
    }
}
