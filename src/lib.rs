//! Uplink grant scheduling core for a fixed-frame broadband wireless
//! base station.
//!
//! Subscriber stations raise bandwidth requests ("jobs") on behalf of
//! QoS-classified service flows; once per frame an external trigger calls
//! [`UplinkScheduler::run_round`] with the current time and the frame's
//! minislot budget. The round retires expired jobs, classifies the rest
//! into three priority tiers, orders them by (tier, flow backlog,
//! submission sequence) and allocates the budget greedily in that order,
//! fragmenting a request across rounds only when the budget runs out
//! mid-job. Fully granted periodic jobs are replaced by a staged successor
//! rather than mutated in place.
//!
//! Everything outside the allocation decision is a collaborator: grant
//! records go to the UL-MAP encoding layer, deadline misses to QoS
//! telemetry, and flow/station references resolve through the host-owned
//! registry behind [`FlowDirectory`].

pub mod logging;
mod config;
mod models;
pub mod registry;
pub mod scheduler;
pub mod sorting;

pub use config::{PriorityTier, ReprovisionPolicy, SchedulerConfig, TierTable};
pub use models::{
    DeadlineMiss, FlowId, Grant, InvalidJobError, Job, JobId, JobKind, JobRequest, SchedulingType,
    SsId,
};
pub use registry::{FlowDirectory, InMemoryDirectory, ServiceFlowRecord};
pub use scheduler::{PendingJobSet, RoundOutcome, UplinkScheduler};
pub use sorting::{round_key, sort_round, RoundKey};
