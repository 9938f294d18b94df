//! Core data types for the uplink grant scheduler.

use chrono::TimeDelta;
use thiserror::Error;

/// Stable handle for a submitted job.
///
/// Minted by the pending pool at submission, never reused within a run.
/// Job equality is identity: two jobs with identical fields are distinct
/// requests with distinct ids, which is why [`Job`] itself does not
/// implement `PartialEq`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(pub u64);

/// Service-flow identifier (SFID).
///
/// Non-owning reference, resolved against the host's flow registry through
/// [`crate::registry::FlowDirectory`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FlowId(pub u32);

/// Subscriber-station identifier (basic CID).
///
/// Non-owning; carried through into grants for the UL-MAP encoding layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SsId(pub u16);

/// QoS class of the service flow owning a job.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SchedulingType {
    /// Unsolicited grant service: fixed periodic grants, no polling.
    Ugs,
    /// Real-time polling service.
    Rtps,
    /// Non-real-time polling service.
    Nrtps,
    /// Best effort.
    BestEffort,
}

/// What a job is asking the base station for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum JobKind {
    /// Uplink minislots for payload transmission.
    Data,
    /// A unicast polling opportunity.
    UnicastPoll,
}

/// Errors rejecting a malformed submission.
///
/// Surfaced synchronously from `submit`; the job never enters the pool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidJobError {
    #[error("job requests zero minislots")]
    EmptyRequest,
    #[error(
        "deadline {}ms precedes release time {}ms",
        .deadline.num_milliseconds(),
        .release.num_milliseconds()
    )]
    DeadlineBeforeRelease {
        release: TimeDelta,
        deadline: TimeDelta,
    },
}

/// A bandwidth request as handed over by the traffic/QoS layer.
///
/// Plain descriptor with no invariants of its own; validation happens at
/// submission, where it becomes a pool-owned [`Job`].
#[derive(Clone, Debug)]
pub struct JobRequest {
    /// Instant (offset from the start of the run) after which the job is
    /// eligible for allocation.
    pub release_time: TimeDelta,
    /// Recurrence interval; `None` means aperiodic.
    pub period: Option<TimeDelta>,
    /// Instant by which the request must be satisfied.
    pub deadline: TimeDelta,
    /// Minislots requested.
    pub size: u32,
    /// QoS class of the owning service flow.
    pub scheduling_type: SchedulingType,
    /// Data transmission vs. polling request.
    pub kind: JobKind,
    /// Owning service flow.
    pub flow: FlowId,
    /// Owning subscriber station.
    pub station: SsId,
}

/// An admitted, pool-owned bandwidth request.
///
/// Invariants, established at admission and preserved thereafter:
/// `size > 0` while pending and `deadline >= release_time`. Partial grants
/// shrink `size` through the pool; no external mutation is possible once
/// the job is submitted.
#[derive(Clone, Debug)]
pub struct Job {
    release_time: TimeDelta,
    period: Option<TimeDelta>,
    deadline: TimeDelta,
    size: u32,
    scheduling_type: SchedulingType,
    kind: JobKind,
    flow: FlowId,
    station: SsId,
}

impl Job {
    /// Validate a request and admit it as a job.
    pub(crate) fn admit(req: JobRequest) -> Result<Self, InvalidJobError> {
        if req.size == 0 {
            return Err(InvalidJobError::EmptyRequest);
        }
        if req.deadline < req.release_time {
            return Err(InvalidJobError::DeadlineBeforeRelease {
                release: req.release_time,
                deadline: req.deadline,
            });
        }
        Ok(Self {
            release_time: req.release_time,
            period: req.period,
            deadline: req.deadline,
            size: req.size,
            scheduling_type: req.scheduling_type,
            kind: req.kind,
            flow: req.flow,
            station: req.station,
        })
    }

    /// Instant after which the job is eligible for allocation.
    pub fn release_time(&self) -> TimeDelta {
        self.release_time
    }

    /// Recurrence interval; `None` means aperiodic.
    pub fn period(&self) -> Option<TimeDelta> {
        self.period
    }

    /// Instant by which the request must be satisfied.
    pub fn deadline(&self) -> TimeDelta {
        self.deadline
    }

    /// Minislots still required.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// QoS class of the owning service flow.
    pub fn scheduling_type(&self) -> SchedulingType {
        self.scheduling_type
    }

    /// Data transmission vs. polling request.
    pub fn kind(&self) -> JobKind {
        self.kind
    }

    /// Owning service flow.
    pub fn flow(&self) -> FlowId {
        self.flow
    }

    /// Owning subscriber station.
    pub fn station(&self) -> SsId {
        self.station
    }

    /// Deadline window relative to release, preserved across periodic
    /// re-issue.
    pub fn window(&self) -> TimeDelta {
        self.deadline - self.release_time
    }

    /// Whether the job is eligible for allocation at `now`.
    pub fn released_by(&self, now: TimeDelta) -> bool {
        self.release_time <= now
    }

    /// Whether the deadline has elapsed unfulfilled at `now`.
    pub fn expired_by(&self, now: TimeDelta) -> bool {
        self.deadline < now
    }

    /// Record a partial grant of `granted` minislots.
    ///
    /// Callers must grant strictly less than `size`; a full grant retires
    /// the job instead of shrinking it.
    pub(crate) fn consume(&mut self, granted: u32) {
        debug_assert!(granted > 0 && granted < self.size);
        self.size -= granted;
    }
}

/// One allocation decision, consumed by the UL-MAP encoding layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grant {
    pub job: JobId,
    pub station: SsId,
    pub flow: FlowId,
    pub kind: JobKind,
    /// Minislots allocated to the job in this round.
    pub minislots: u32,
}

/// A job retired unfulfilled by the deadline sweep.
///
/// Emitted exactly once per job; the retired record is moved out so the
/// host's QoS-violation telemetry can inspect it.
#[derive(Clone, Debug)]
pub struct DeadlineMiss {
    pub id: JobId,
    pub job: Job,
}
