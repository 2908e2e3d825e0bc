//! Reconnection policy for the message channel.
//!
//! Runtime-agnostic: the channel owns the single retry timer and consults
//! this state machine for whether and how long to wait.
//!
//! `Idle -> Retrying -> (Idle on success | Exhausted)`

use std::time::Duration;

use super::shared::{MAX_RECONNECT_ATTEMPTS, RECONNECT_BASE_DELAY};
use crate::ports::transport::NORMAL_CLOSURE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPhase {
    /// No retry in progress.
    Idle,
    /// A retry timer is pending or a retry connect is in flight.
    Retrying,
    /// Attempts ran out; automatic retry is over for this channel.
    Exhausted,
}

/// Linear backoff with a bounded attempt count.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    attempts: u32,
    max_attempts: u32,
    base_delay: Duration,
    phase: ReconnectPhase,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(MAX_RECONNECT_ATTEMPTS, RECONNECT_BASE_DELAY)
    }
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts: 0,
            max_attempts,
            base_delay,
            phase: ReconnectPhase::Idle,
        }
    }

    /// Back to `Idle` with a zero counter. Called when a connection opens.
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.phase = ReconnectPhase::Idle;
    }

    /// Abandon an in-progress retry without touching the counter.
    pub fn cancel(&mut self) {
        if self.phase == ReconnectPhase::Retrying {
            self.phase = ReconnectPhase::Idle;
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn phase(&self) -> ReconnectPhase {
        self.phase
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Delay before attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Whether a closure with `code` should start a retry sequence.
    ///
    /// Normal closures never retry, and a sequence already in progress owns
    /// the only retry timer.
    pub fn should_retry(&self, code: u16) -> bool {
        code != NORMAL_CLOSURE
            && !self.is_exhausted()
            && self.phase != ReconnectPhase::Retrying
    }

    /// Advance to the next attempt.
    ///
    /// Returns the delay to wait *before* performing this attempt, or `None`
    /// once the attempts are used up (the policy is then `Exhausted`).
    pub fn next_delay_and_advance(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            self.phase = ReconnectPhase::Exhausted;
            return None;
        }

        self.attempts += 1;
        self.phase = ReconnectPhase::Retrying;
        Some(self.delay_for(self.attempts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::transport::ABNORMAL_CLOSURE;

    #[test]
    fn test_linear_backoff_delays() {
        let mut policy = ReconnectPolicy::default();
        let delays: Vec<u128> = std::iter::from_fn(|| policy.next_delay_and_advance())
            .map(|d| d.as_millis())
            .collect();

        assert_eq!(delays, vec![1000, 2000, 3000, 4000, 5000]);
        assert_eq!(policy.attempts(), 5);
        assert_eq!(policy.phase(), ReconnectPhase::Exhausted);
    }

    #[test]
    fn test_counter_never_exceeds_max() {
        let mut policy = ReconnectPolicy::default();
        for _ in 0..20 {
            policy.next_delay_and_advance();
            assert!(policy.attempts() <= MAX_RECONNECT_ATTEMPTS);
        }
    }

    #[test]
    fn test_normal_closure_never_retries() {
        let mut policy = ReconnectPolicy::default();
        assert!(!policy.should_retry(NORMAL_CLOSURE));

        policy.next_delay_and_advance();
        policy.cancel();
        assert!(!policy.should_retry(NORMAL_CLOSURE));
    }

    #[test]
    fn test_abnormal_closure_retries_until_exhausted() {
        let mut policy = ReconnectPolicy::default();
        assert!(policy.should_retry(ABNORMAL_CLOSURE));
        assert!(policy.should_retry(4001));

        while policy.next_delay_and_advance().is_some() {}
        assert!(!policy.should_retry(ABNORMAL_CLOSURE));
    }

    #[test]
    fn test_pending_retry_blocks_second_sequence() {
        let mut policy = ReconnectPolicy::default();
        policy.next_delay_and_advance();

        assert_eq!(policy.phase(), ReconnectPhase::Retrying);
        assert!(!policy.should_retry(ABNORMAL_CLOSURE));
    }

    #[test]
    fn test_reset_after_open() {
        let mut policy = ReconnectPolicy::default();
        policy.next_delay_and_advance();
        policy.next_delay_and_advance();

        policy.reset();

        assert_eq!(policy.attempts(), 0);
        assert_eq!(policy.phase(), ReconnectPhase::Idle);
        assert_eq!(policy.next_delay_and_advance(), Some(Duration::from_millis(1000)));
    }

    #[test]
    fn test_normal_closure_never_retries_mid_sequence() {
        let mut policy = ReconnectPolicy::default();
        let _ = policy.next_delay_and_advance();
        policy.cancel();

        assert_eq!(policy.attempts(), 1);
        assert!(!policy.should_retry(NORMAL_CLOSURE));
        assert!(policy.should_retry(ABNORMAL_CLOSURE));
    }
}
