//! The pending job pool and its round-boundary staging barrier.

use chrono::TimeDelta;
use rustc_hash::FxHashMap;

use crate::config::TierTable;
use crate::models::{DeadlineMiss, InvalidJobError, Job, JobId, JobRequest};
use crate::registry::FlowDirectory;
use crate::sorting::{round_key, sort_round, RoundKey};

/// The live collection of not-yet-satisfied jobs.
///
/// Owns every admitted [`Job`] exclusively. Submissions land in a staged
/// inbox and become live only when [`merge_inbox`](Self::merge_inbox) runs
/// at a round boundary; this barrier is what gives each round a frozen,
/// consistent view of demand even though arrivals and cancellations can
/// happen at any time between rounds.
#[derive(Debug, Default)]
pub struct PendingJobSet {
    live: FxHashMap<JobId, Job>,
    inbox: Vec<(JobId, Job)>,
    next_id: u64,
}

impl PendingJobSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and stage a request, returning its stable handle.
    ///
    /// On error the job never enters the set. The staged job becomes
    /// eligible for snapshots only after the next inbox merge.
    pub fn submit(&mut self, req: JobRequest) -> Result<JobId, InvalidJobError> {
        let job = Job::admit(req)?;
        let id = JobId(self.next_id);
        self.next_id += 1;
        self.inbox.push((id, job));
        Ok(id)
    }

    /// Remove a job from the live pool or the inbox.
    ///
    /// Idempotent: unknown or already-removed ids are a silent no-op,
    /// because flow teardown may race with grant processing.
    pub fn cancel(&mut self, id: JobId) {
        if self.live.remove(&id).is_none() {
            self.inbox.retain(|(staged, _)| *staged != id);
        }
    }

    /// Round-boundary barrier: make staged submissions live.
    ///
    /// Returns how many jobs were merged.
    pub fn merge_inbox(&mut self) -> usize {
        let merged = self.inbox.len();
        for (id, job) in self.inbox.drain(..) {
            self.live.insert(id, job);
        }
        merged
    }

    /// Retire every live job whose deadline elapsed before `now`.
    ///
    /// Runs before allocation and is unconditional: a job admissible by
    /// budget is still discarded here. Each retired job is reported exactly
    /// once and can never reappear.
    pub fn sweep_expired(&mut self, now: TimeDelta) -> Vec<DeadlineMiss> {
        let expired: Vec<JobId> = self
            .live
            .iter()
            .filter(|(_, job)| job.expired_by(now))
            .map(|(id, _)| *id)
            .collect();

        let mut misses: Vec<DeadlineMiss> = expired
            .into_iter()
            .filter_map(|id| self.live.remove(&id).map(|job| DeadlineMiss { id, job }))
            .collect();
        misses.sort_by_key(|miss| miss.id);
        misses
    }

    /// Classify, key and order the live pool for the current round.
    ///
    /// Only released jobs (`release_time <= now`) participate; unreleased
    /// jobs stay pending untouched. Jobs whose flow no longer resolves are
    /// dropped from the pool, treated as cancelled. The returned sequence
    /// is materialized for exclusive use by the current round; submissions
    /// staged after this point surface next round.
    pub fn snapshot_for_round(
        &mut self,
        now: TimeDelta,
        table: &TierTable,
        flows: &dyn FlowDirectory,
    ) -> Vec<(JobId, RoundKey)> {
        let mut entries: Vec<(JobId, RoundKey)> = Vec::with_capacity(self.live.len());
        let mut dangling: Vec<JobId> = Vec::new();

        for (id, job) in &self.live {
            if !job.released_by(now) {
                continue;
            }
            match round_key(*id, job, table, flows) {
                Some(key) => entries.push((*id, key)),
                None => dangling.push(*id),
            }
        }

        for id in dangling {
            self.live.remove(&id);
        }

        sort_round(&mut entries);
        entries
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.live.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.live.get_mut(&id)
    }

    /// Remove a fully granted job from the pool.
    pub(crate) fn retire(&mut self, id: JobId) -> Option<Job> {
        self.live.remove(&id)
    }

    /// Live jobs (excluding staged submissions).
    pub fn live_len(&self) -> usize {
        self.live.len()
    }

    /// Submissions staged for the next round.
    pub fn staged_len(&self) -> usize {
        self.inbox.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty() && self.inbox.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FlowId, JobKind, SchedulingType, SsId};
    use crate::registry::{InMemoryDirectory, ServiceFlowRecord};

    fn make_request(flow: FlowId, deadline_ms: i64) -> JobRequest {
        JobRequest {
            release_time: TimeDelta::zero(),
            period: None,
            deadline: TimeDelta::milliseconds(deadline_ms),
            size: 10,
            scheduling_type: SchedulingType::Rtps,
            kind: JobKind::Data,
            flow,
            station: SsId(1),
        }
    }

    fn make_directory() -> InMemoryDirectory {
        let mut directory = InMemoryDirectory::new();
        directory.insert_flow(
            FlowId(1),
            ServiceFlowRecord {
                station: SsId(1),
                backlog: 20,
                provision: 10,
            },
        );
        directory
    }

    #[test]
    fn test_submit_stages_until_merge() {
        let mut pool = PendingJobSet::new();
        let directory = make_directory();
        let id = pool.submit(make_request(FlowId(1), 100)).unwrap();

        assert_eq!(pool.staged_len(), 1);
        assert_eq!(pool.live_len(), 0);
        let snapshot =
            pool.snapshot_for_round(TimeDelta::zero(), &TierTable::default(), &directory);
        assert!(snapshot.is_empty());

        assert_eq!(pool.merge_inbox(), 1);
        assert_eq!(pool.live_len(), 1);
        let snapshot =
            pool.snapshot_for_round(TimeDelta::zero(), &TierTable::default(), &directory);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].0, id);
    }

    #[test]
    fn test_submit_rejects_invalid_without_inserting() {
        let mut pool = PendingJobSet::new();
        let mut req = make_request(FlowId(1), 100);
        req.size = 0;
        assert!(pool.submit(req).is_err());
        assert!(pool.is_empty());
    }

    #[test]
    fn test_ids_are_unique_and_sequential() {
        let mut pool = PendingJobSet::new();
        let a = pool.submit(make_request(FlowId(1), 100)).unwrap();
        let b = pool.submit(make_request(FlowId(1), 100)).unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_cancel_is_idempotent_across_pool_and_inbox() {
        let mut pool = PendingJobSet::new();
        let staged = pool.submit(make_request(FlowId(1), 100)).unwrap();
        let live = pool.submit(make_request(FlowId(1), 100)).unwrap();
        pool.merge_inbox();
        let staged_later = pool.submit(make_request(FlowId(1), 100)).unwrap();

        pool.cancel(live);
        pool.cancel(live); // second call is a no-op
        pool.cancel(staged_later); // removes from inbox
        pool.cancel(JobId(999)); // unknown id is a no-op
        assert_eq!(pool.live_len(), 1);
        assert_eq!(pool.staged_len(), 0);
        assert!(pool.get(staged).is_some());
    }

    #[test]
    fn test_sweep_removes_expired_and_reports_once() {
        let mut pool = PendingJobSet::new();
        let expired = pool.submit(make_request(FlowId(1), 10)).unwrap();
        let alive = pool.submit(make_request(FlowId(1), 100)).unwrap();
        pool.merge_inbox();

        let misses = pool.sweep_expired(TimeDelta::milliseconds(50));
        assert_eq!(misses.len(), 1);
        assert_eq!(misses[0].id, expired);
        assert_eq!(misses[0].job.size(), 10);
        assert!(pool.get(expired).is_none());
        assert!(pool.get(alive).is_some());

        // Already removed: nothing further to report
        assert!(pool.sweep_expired(TimeDelta::milliseconds(60)).is_empty());
    }

    #[test]
    fn test_sweep_keeps_job_at_exact_deadline() {
        let mut pool = PendingJobSet::new();
        let id = pool.submit(make_request(FlowId(1), 50)).unwrap();
        pool.merge_inbox();
        assert!(pool.sweep_expired(TimeDelta::milliseconds(50)).is_empty());
        assert!(pool.get(id).is_some());
    }

    #[test]
    fn test_snapshot_skips_unreleased_jobs() {
        let mut pool = PendingJobSet::new();
        let directory = make_directory();
        let mut req = make_request(FlowId(1), 100);
        req.release_time = TimeDelta::milliseconds(40);
        let id = pool.submit(req).unwrap();
        pool.merge_inbox();

        let early = pool.snapshot_for_round(
            TimeDelta::milliseconds(10),
            &TierTable::default(),
            &directory,
        );
        assert!(early.is_empty());
        assert!(pool.get(id).is_some());

        let later = pool.snapshot_for_round(
            TimeDelta::milliseconds(40),
            &TierTable::default(),
            &directory,
        );
        assert_eq!(later.len(), 1);
    }

    #[test]
    fn test_snapshot_drops_jobs_with_dangling_flow() {
        let mut pool = PendingJobSet::new();
        let mut directory = make_directory();
        let id = pool.submit(make_request(FlowId(1), 100)).unwrap();
        pool.merge_inbox();

        directory.remove_flow(FlowId(1));
        let snapshot =
            pool.snapshot_for_round(TimeDelta::zero(), &TierTable::default(), &directory);
        assert!(snapshot.is_empty());
        // Treated as cancellation: gone from the pool, no miss later
        assert!(pool.get(id).is_none());
        assert!(pool.sweep_expired(TimeDelta::milliseconds(500)).is_empty());
    }

    #[test]
    fn test_snapshot_is_ordered() {
        let mut pool = PendingJobSet::new();
        let mut directory = make_directory();
        directory.insert_flow(
            FlowId(2),
            ServiceFlowRecord {
                station: SsId(2),
                backlog: 90,
                provision: 10,
            },
        );

        let light = pool.submit(make_request(FlowId(1), 100)).unwrap();
        let heavy = pool.submit(make_request(FlowId(2), 100)).unwrap();
        let mut ugs = make_request(FlowId(1), 100);
        ugs.scheduling_type = SchedulingType::Ugs;
        let high = pool.submit(ugs).unwrap();
        pool.merge_inbox();

        let snapshot =
            pool.snapshot_for_round(TimeDelta::zero(), &TierTable::default(), &directory);
        let order: Vec<JobId> = snapshot.iter().map(|(id, _)| *id).collect();
        assert_eq!(order, vec![high, heavy, light]);
    }
}
