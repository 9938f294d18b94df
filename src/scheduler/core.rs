//! The per-frame allocation engine.
//!
//! One [`UplinkScheduler::run_round`] call per frame boundary, driven by an
//! external trigger. A round is a single uninterruptible logical unit:
//! inbox merge, deadline sweep, ordering, greedy allocation and periodic
//! re-issue all see one frozen view of demand. No step is retried and
//! there is no rollback; partial grants persist as the job's reduced size.

use chrono::TimeDelta;

use crate::config::{ReprovisionPolicy, SchedulerConfig};
use crate::models::{DeadlineMiss, Grant, InvalidJobError, Job, JobId, JobRequest};
use crate::registry::FlowDirectory;
use crate::{log_round, log_scan, log_trace};

use super::pool::PendingJobSet;

/// Everything one round produced.
///
/// Grants go to the UL-MAP encoding layer; misses go to QoS-violation
/// telemetry. Deadline misses are normal outcomes, never errors, and each
/// job appears in `misses` at most once over its lifetime.
#[derive(Clone, Debug, Default)]
pub struct RoundOutcome {
    pub grants: Vec<Grant>,
    pub misses: Vec<DeadlineMiss>,
    /// Total minislots allocated this round; never exceeds the budget.
    pub minislots_used: u32,
}

/// Base-station-side scheduler for the shared uplink resource.
///
/// Owns the pending pool and orchestrates one allocation round per frame.
pub struct UplinkScheduler {
    pool: PendingJobSet,
    config: SchedulerConfig,
}

impl Default for UplinkScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl UplinkScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            pool: PendingJobSet::new(),
            config,
        }
    }

    /// Submit a bandwidth request on behalf of a service flow.
    ///
    /// Called by the traffic/QoS layer whenever a flow accrues unserved
    /// demand or a periodic grant interval elapses. The job becomes
    /// eligible starting with the next round.
    pub fn submit(&mut self, req: JobRequest) -> Result<JobId, InvalidJobError> {
        self.pool.submit(req)
    }

    /// Cancel a pending job on flow teardown or renegotiation.
    ///
    /// Idempotent; cancelling an unknown or already-served job is a no-op.
    pub fn cancel(&mut self, id: JobId) {
        self.pool.cancel(id)
    }

    /// Read access to the pending pool.
    pub fn pool(&self) -> &PendingJobSet {
        &self.pool
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Run one allocation round for the frame starting at `now`, with
    /// `budget` minislots available.
    pub fn run_round(
        &mut self,
        now: TimeDelta,
        budget: u32,
        flows: &dyn FlowDirectory,
    ) -> RoundOutcome {
        let verbosity = self.config.verbosity;

        // Phase 0: staged submissions become visible.
        let merged = self.pool.merge_inbox();
        log_round!(
            verbosity,
            "Round at {}ms: budget {} minislots, {} live ({} merged)",
            now.num_milliseconds(),
            budget,
            self.pool.live_len(),
            merged
        );

        // Phase 1: deadline sweep, before any allocation.
        let misses = self.pool.sweep_expired(now);
        for miss in &misses {
            log_round!(
                verbosity,
                "  Missed deadline: job {} ({} minislots unserved, deadline {}ms)",
                miss.id.0,
                miss.job.size(),
                miss.job.deadline().num_milliseconds()
            );
        }

        // Phase 2: classify, key and order the surviving pool.
        let order = self.pool.snapshot_for_round(now, &self.config.tiers, flows);
        log_trace!(
            verbosity,
            "  Scan order: {:?}",
            order
                .iter()
                .map(|(id, key)| (id.0, key.tier, key.backlog))
                .collect::<Vec<_>>()
        );

        // Phase 3: greedy scan in key order.
        let mut grants: Vec<Grant> = Vec::new();
        let mut remaining = budget;
        for (id, key) in order {
            if remaining == 0 {
                log_scan!(verbosity, "  Budget exhausted, remaining jobs carried");
                break;
            }

            let job = match self.pool.get(id) {
                Some(job) => job,
                None => continue,
            };
            let size = job.size();
            let flow = job.flow();
            let station = job.station();
            let kind = job.kind();
            log_scan!(
                verbosity,
                "  Considering job {} (tier={:?}, backlog={}, size={})",
                id.0,
                key.tier,
                key.backlog,
                size
            );

            let granted = remaining.min(size);
            if granted == size {
                // Full grant: retire the job, re-issue if periodic.
                if let Some(job) = self.pool.retire(id) {
                    log_round!(
                        verbosity,
                        "  Granted job {}: {} minislots (full)",
                        id.0,
                        granted
                    );
                    if let Some(period) = job.period() {
                        self.reissue(id, &job, period, now, flows);
                    }
                }
            } else {
                // Partial grant: the job stays pending, deadline unchanged.
                if let Some(job) = self.pool.get_mut(id) {
                    job.consume(granted);
                }
                log_round!(
                    verbosity,
                    "  Granted job {}: {} of {} minislots (partial, {} carried)",
                    id.0,
                    granted,
                    size,
                    size - granted
                );
            }

            grants.push(Grant {
                job: id,
                station,
                flow,
                kind,
                minislots: granted,
            });
            remaining -= granted;
        }

        log_trace!(
            verbosity,
            "  Round used {} of {} minislots",
            budget - remaining,
            budget
        );

        RoundOutcome {
            grants,
            misses,
            minislots_used: budget - remaining,
        }
    }

    /// Stage the successor of a fully granted periodic job.
    ///
    /// The successor keeps the predecessor's deadline window
    /// (`deadline - release`); its size comes from the configured
    /// re-provision rule, not from the retired job. A flow that no longer
    /// resolves, or resolves to a zero provision, raises no successor.
    fn reissue(
        &mut self,
        predecessor: JobId,
        job: &Job,
        period: TimeDelta,
        now: TimeDelta,
        flows: &dyn FlowDirectory,
    ) {
        let verbosity = self.config.verbosity;

        let size = match self.config.reprovision {
            ReprovisionPolicy::FlowProvision => flows.provision(job.flow()),
            ReprovisionPolicy::Fixed(minislots) => Some(minislots),
        };
        let size = match size {
            Some(minislots) if minislots > 0 => minislots,
            _ => {
                log_scan!(
                    verbosity,
                    "  No successor for job {}: flow {} has no provision",
                    predecessor.0,
                    job.flow().0
                );
                return;
            }
        };
        let station = match flows.station(job.flow()) {
            Some(station) => station,
            None => {
                log_scan!(
                    verbosity,
                    "  No successor for job {}: flow {} is gone",
                    predecessor.0,
                    job.flow().0
                );
                return;
            }
        };

        let release = now + period;
        let req = JobRequest {
            release_time: release,
            period: Some(period),
            deadline: release + job.window(),
            size,
            scheduling_type: job.scheduling_type(),
            kind: job.kind(),
            flow: job.flow(),
            station,
        };
        match self.pool.submit(req) {
            Ok(id) => log_round!(
                verbosity,
                "  Re-issued job {} as {} (release {}ms, {} minislots)",
                predecessor.0,
                id.0,
                release.num_milliseconds(),
                size
            ),
            Err(err) => log_round!(
                verbosity,
                "  Re-issue for job {} rejected: {}",
                predecessor.0,
                err
            ),
        }
    }
}
