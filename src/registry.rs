//! Read-only resolution of service-flow references.
//!
//! Jobs carry [`FlowId`]/[`SsId`] identifiers instead of pointers into the
//! host's flow and station records. The registries stay owned by the host;
//! the scheduler consults them through [`FlowDirectory`] and must tolerate
//! any lookup failing (a flow torn down while jobs referencing it are still
//! pending), treating the referencing job as cancelled.

use rustc_hash::FxHashMap;

use crate::models::{FlowId, SsId};

/// Read-only view over the host-owned service-flow registry.
pub trait FlowDirectory {
    /// Current queued demand on the flow, in minislots.
    ///
    /// This is the fairness tie-break source, re-read every round.
    /// `None` means the flow no longer exists.
    fn backlog(&self, flow: FlowId) -> Option<u32>;

    /// Configured per-period grant size, used to size the successor of a
    /// fully granted periodic job.
    fn provision(&self, flow: FlowId) -> Option<u32>;

    /// Subscriber station currently owning the flow.
    fn station(&self, flow: FlowId) -> Option<SsId>;
}

/// Per-flow record held by [`InMemoryDirectory`].
#[derive(Clone, Debug)]
pub struct ServiceFlowRecord {
    /// Owning subscriber station.
    pub station: SsId,
    /// Queued, not-yet-transmitted demand in minislots.
    pub backlog: u32,
    /// Per-period grant size for periodic re-issue.
    pub provision: u32,
}

/// `FxHashMap`-backed directory for hosts and tests.
#[derive(Clone, Debug, Default)]
pub struct InMemoryDirectory {
    flows: FxHashMap<FlowId, ServiceFlowRecord>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a flow record.
    pub fn insert_flow(&mut self, flow: FlowId, record: ServiceFlowRecord) {
        self.flows.insert(flow, record);
    }

    /// Tear down a flow. Pending jobs referencing it are dropped at the
    /// next snapshot.
    pub fn remove_flow(&mut self, flow: FlowId) -> Option<ServiceFlowRecord> {
        self.flows.remove(&flow)
    }

    /// Update a flow's queued demand. No-op if the flow is unknown.
    pub fn set_backlog(&mut self, flow: FlowId, backlog: u32) {
        if let Some(record) = self.flows.get_mut(&flow) {
            record.backlog = backlog;
        }
    }

    pub fn flow(&self, flow: FlowId) -> Option<&ServiceFlowRecord> {
        self.flows.get(&flow)
    }
}

impl FlowDirectory for InMemoryDirectory {
    fn backlog(&self, flow: FlowId) -> Option<u32> {
        self.flows.get(&flow).map(|r| r.backlog)
    }

    fn provision(&self, flow: FlowId) -> Option<u32> {
        self.flows.get(&flow).map(|r| r.provision)
    }

    fn station(&self, flow: FlowId) -> Option<SsId> {
        self.flows.get(&flow).map(|r| r.station)
    }
}
