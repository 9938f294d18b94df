//! Per-round priority ordering for pending jobs.
//!
//! Each round materializes one [`RoundKey`] per live, released job and
//! sorts on it:
//! - primary: priority tier, high tier first;
//! - secondary (equal tiers): the current backlog of the job's *own*
//!   service flow, larger backlog first, so flows with more outstanding
//!   demand are favored;
//! - tertiary: submission sequence, making the order total and
//!   deterministic across identical runs.
//!
//! Keys are recomputed fresh every round and never persisted: backlog and
//! urgency change between rounds, but within a round the materialized key
//! is fixed, so repeated comparisons of the same pair stay consistent.

use std::cmp::Ordering;

use crate::config::{PriorityTier, TierTable};
use crate::models::{Job, JobId};
use crate::registry::FlowDirectory;

/// Materialized sort key for one job in one round.
///
/// An ephemeral value, valid only for the round that computed it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundKey {
    pub tier: PriorityTier,
    /// Backlog of the job's own flow at snapshot time.
    pub backlog: u32,
    /// Submission sequence, the final tie-break.
    pub seq: JobId,
}

impl Ord for RoundKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tier
            .cmp(&other.tier)
            .then_with(|| other.backlog.cmp(&self.backlog))
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for RoundKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compute the round key for one job.
///
/// The backlog is read from the job's own flow; the two sides of any
/// comparison therefore carry independently resolved backlogs. Returns
/// `None` when the flow no longer resolves, in which case the job is
/// treated as cancelled by the caller.
pub fn round_key(
    id: JobId,
    job: &Job,
    table: &TierTable,
    flows: &dyn FlowDirectory,
) -> Option<RoundKey> {
    let backlog = flows.backlog(job.flow())?;
    Some(RoundKey {
        tier: table.classify(job.scheduling_type(), job.kind()),
        backlog,
        seq: id,
    })
}

/// Sort a round's (job, key) entries into scan order.
pub fn sort_round(entries: &mut [(JobId, RoundKey)]) {
    entries.sort_by(|a, b| a.1.cmp(&b.1));
}
