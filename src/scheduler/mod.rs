//! Round-driven uplink allocation: the pending pool and the engine.

mod core;
mod pool;

pub use self::core::{RoundOutcome, UplinkScheduler};
pub use self::pool::PendingJobSet;
