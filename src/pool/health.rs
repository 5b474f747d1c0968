//! Dead-node bookkeeping
//!
//! Failure counts and quarantine deadlines for nodes in a pool, plus the
//! capped exponential backoff that decides how long a failed node sits out.

use crate::error::{Error, Result};
use std::time::{Duration, Instant};

/// Default delay after the first failure
pub const DEFAULT_DEAD_NODE_BACKOFF_FACTOR: Duration = Duration::from_secs(1);

/// Default ceiling on the quarantine delay
pub const DEFAULT_MAX_DEAD_NODE_BACKOFF: Duration = Duration::from_secs(30);

// ============================================================================
// Backoff
// ============================================================================

/// Capped exponential backoff: `factor * 2^(failures - 1)`, at most `max`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadNodeBackoff {
    factor: Duration,
    max: Duration,
}

impl Default for DeadNodeBackoff {
    fn default() -> Self {
        Self {
            factor: DEFAULT_DEAD_NODE_BACKOFF_FACTOR,
            max: DEFAULT_MAX_DEAD_NODE_BACKOFF,
        }
    }
}

impl DeadNodeBackoff {
    pub fn new(factor: Duration, max: Duration) -> Result<Self> {
        if factor.is_zero() {
            return Err(Error::configuration(
                "'dead_node_backoff_factor' must be greater than zero",
            ));
        }
        if max < factor {
            return Err(Error::configuration(
                "'max_dead_node_backoff' must be greater than or equal to 'dead_node_backoff_factor'",
            ));
        }
        Ok(Self { factor, max })
    }

    pub fn factor(&self) -> Duration {
        self.factor
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Quarantine delay after `consecutive_failures` failures in a row
    pub fn delay(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return Duration::ZERO;
        }
        let exponent = (consecutive_failures - 1).min(31);
        self.factor
            .checked_mul(1u32 << exponent)
            .map_or(self.max, |delay| delay.min(self.max))
    }
}

// ============================================================================
// Node Health
// ============================================================================

/// Health of one registered node
///
/// A node is dead while it has a resurrection deadline. Coming back through
/// the deadline keeps the failure count, so another failure right away
/// doubles the next quarantine; only an explicit success clears it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeHealth {
    consecutive_failures: u32,
    resurrect_after: Option<Instant>,
}

impl NodeHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn resurrect_after(&self) -> Option<Instant> {
        self.resurrect_after
    }

    /// Record a failure and return the resurrection deadline it earned
    ///
    /// A delay too large to add to `now` is halved until it fits, so huge
    /// ceilings still quarantine a node without overflowing the clock.
    pub fn record_failure(&mut self, now: Instant, backoff: &DeadNodeBackoff) -> Instant {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        let deadline = deadline_after(now, backoff.delay(self.consecutive_failures));
        self.resurrect_after = Some(deadline);
        deadline
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.resurrect_after = None;
    }

    /// Lift the quarantine but remember the failures
    pub fn resurrect(&mut self) {
        self.resurrect_after = None;
    }
}

fn deadline_after(now: Instant, mut delay: Duration) -> Instant {
    loop {
        if let Some(deadline) = now.checked_add(delay) {
            return deadline;
        }
        delay /= 2;
    }
}

// ============================================================================
// Tests
// ============================================================================
