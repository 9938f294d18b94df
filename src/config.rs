//! Configuration types for the uplink scheduler.

use crate::models::{JobKind, SchedulingType};

/// Priority tier assigned to a job for one round.
///
/// Tiers order the greedy scan: `High` is served first, `Low` last. The
/// derived `Ord` follows declaration order, so sorting ascending yields
/// scan order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PriorityTier {
    High,
    Intermediate,
    Low,
}

/// The injectable class-to-tier table driving priority classification.
///
/// The visible contract only fixes the three ordered tiers, not the exact
/// mapping, so the table is a configuration value rather than a constant.
/// The default places hard unsolicited-grant obligations (UGS) and unicast
/// polls in the high tier, polled real-time flows in the intermediate tier,
/// and everything else in the low tier.
#[derive(Clone, Debug)]
pub struct TierTable {
    pub ugs: PriorityTier,
    pub rtps: PriorityTier,
    pub nrtps: PriorityTier,
    pub best_effort: PriorityTier,
    /// Tier override applied to unicast poll jobs regardless of class;
    /// `None` classifies polls by their flow's class alone.
    pub unicast_poll: Option<PriorityTier>,
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            ugs: PriorityTier::High,
            rtps: PriorityTier::Intermediate,
            nrtps: PriorityTier::Low,
            best_effort: PriorityTier::Low,
            unicast_poll: Some(PriorityTier::High),
        }
    }
}

impl TierTable {
    /// Classify a job's QoS context into a tier.
    ///
    /// Pure and total: every (class, kind) pair maps to exactly one tier.
    pub fn classify(&self, scheduling_type: SchedulingType, kind: JobKind) -> PriorityTier {
        if kind == JobKind::UnicastPoll {
            if let Some(tier) = self.unicast_poll {
                return tier;
            }
        }
        match scheduling_type {
            SchedulingType::Ugs => self.ugs,
            SchedulingType::Rtps => self.rtps,
            SchedulingType::Nrtps => self.nrtps,
            SchedulingType::BestEffort => self.best_effort,
        }
    }
}

/// How the successor of a fully granted periodic job is sized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReprovisionPolicy {
    /// Use the flow's configured per-period provision, read from the
    /// directory at re-issue time.
    FlowProvision,
    /// Fixed number of minislots for every successor.
    Fixed(u32),
}

impl Default for ReprovisionPolicy {
    fn default() -> Self {
        Self::FlowProvision
    }
}

/// Top-level scheduler configuration.
#[derive(Clone, Debug, Default)]
pub struct SchedulerConfig {
    /// Class-to-tier table for priority classification.
    pub tiers: TierTable,
    /// Successor sizing rule for periodic re-issue.
    pub reprovision: ReprovisionPolicy,
    /// Logging verbosity (0=silent, 1=rounds, 2=scan, 3=trace).
    pub verbosity: u8,
}
