//! Fault injection and call accounting.

use serde::Serialize;
use vw_watcher::{FaultKind, ProtocolError};

/// The simulated calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimCall {
    /// `Connector::connect`.
    Login,
    /// `PropertyCollector::create_filter`.
    CreateFilter,
    /// `PropertyCollector::wait_for_updates_ex`.
    WaitForUpdates,
    /// `PropertyCollector::cancel_wait_for_updates`.
    CancelWait,
    /// `PropertyCollector::destroy_filter`.
    DestroyFilter,
}

/// A scripted failure of one call.
///
/// # Examples
///
/// ```
/// use vw_sim::{Fault, SimCall};
/// use vw_watcher::FaultKind;
///
/// // Let two waits succeed, fail the third.
/// let fault = Fault::new(SimCall::WaitForUpdates, FaultKind::Transport, "connection reset").after(2);
/// assert_eq!(fault.skip, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// The call that fails.
    pub call: SimCall,
    /// Matching calls that succeed before this one fires.
    pub skip: u32,
    /// The error returned.
    pub error: ProtocolError,
}

impl Fault {
    /// Fails the next `call` with `kind`.
    #[must_use]
    pub fn new(call: SimCall, kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            call,
            skip: 0,
            error: ProtocolError::new(kind, message),
        }
    }

    /// Lets `skip` matching calls through first.
    #[must_use]
    pub fn after(mut self, skip: u32) -> Self {
        self.skip = skip;
        self
    }
}

/// Pending faults, consumed in injection order.
#[derive(Debug, Default)]
pub(crate) struct FaultPlan {
    faults: Vec<Fault>,
}

impl FaultPlan {
    pub(crate) fn push(&mut self, fault: Fault) {
        self.faults.push(fault);
    }

    /// Returns the error for this `call`, if a fault fires now.
    pub(crate) fn trigger(&mut self, call: SimCall) -> Option<ProtocolError> {
        let index = self.faults.iter().position(|f| f.call == call)?;
        let fault = &mut self.faults[index];
        if fault.skip > 0 {
            fault.skip -= 1;
            return None;
        }
        Some(self.faults.remove(index).error)
    }

    pub(crate) fn clear(&mut self) {
        self.faults.clear();
    }
}

/// How often each call reached the simulator.
///
/// Calls rejected by an injected fault are counted too.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CallCounts {
    /// Connection attempts.
    pub login: u32,
    /// Logouts, repeated ones included.
    pub logout: u32,
    /// Filter creations.
    pub create_filter: u32,
    /// Wait calls.
    pub wait_for_updates: u32,
    /// Cancel requests.
    pub cancel_wait: u32,
    /// Filter destructions.
    pub destroy_filter: u32,
}

impl CallCounts {
    pub(crate) fn record(&mut self, call: SimCall) {
        let counter = match call {
            SimCall::Login => &mut self.login,
            SimCall::CreateFilter => &mut self.create_filter,
            SimCall::WaitForUpdates => &mut self.wait_for_updates,
            SimCall::CancelWait => &mut self.cancel_wait,
            SimCall::DestroyFilter => &mut self.destroy_filter,
        };
        *counter += 1;
    }
}
