//! Campaign limits.
//!
//! Caps on rounds, executed inputs and wall time. When a limit is hit the
//! campaign stops and reports what the strategy found so far.

use serde::{Deserialize, Serialize};

/// Limits for a single campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignLimits {
    /// Maximum batches requested from the strategy after the initial one.
    pub max_rounds: u64,
    /// Maximum inputs actually executed on the oracle.
    pub max_executions: u64,
    /// Maximum wall-clock seconds before forced stop.
    pub max_wall_secs: u64,
}

impl Default for CampaignLimits {
    fn default() -> Self {
        Self {
            max_rounds: 10_000,
            max_executions: 1_000_000,
            max_wall_secs: 300, // 5 minutes
        }
    }
}

/// Reason a campaign was stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// The strategy returned an empty batch.
    Complete,
    RoundLimitExceeded,
    ExecutionLimitExceeded,
    WallTimeExceeded,
}

/// Checks campaign progress against limits.
pub struct LimitChecker {
    limits: CampaignLimits,
    start_time: std::time::Instant,
}

impl LimitChecker {
    pub fn new(limits: CampaignLimits) -> Self {
        Self {
            limits,
            start_time: std::time::Instant::now(),
        }
    }

    /// Returns None if all ok, or the reason for stopping.
    pub fn check(&self, rounds: u64, executions: u64) -> Option<StopReason> {
        if rounds >= self.limits.max_rounds {
            return Some(StopReason::RoundLimitExceeded);
        }
        if executions >= self.limits.max_executions {
            return Some(StopReason::ExecutionLimitExceeded);
        }
        if self.start_time.elapsed().as_secs() >= self.limits.max_wall_secs {
            return Some(StopReason::WallTimeExceeded);
        }
        None
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    pub fn limits(&self) -> &CampaignLimits {
        &self.limits
    }
}
