//! Consecutive-failure counter with an escalating lockout window.
//!
//! Once `threshold` consecutive failures are reached, every further failure
//! locks verification for `min(max, base * 2^(failures - threshold))`
//! minutes. The counter itself never decays with time; only a success or an
//! explicit reset clears it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Backoff parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    /// Consecutive failures that trigger the first lockout.
    pub threshold: u32,
    /// Length of the first lockout window.
    pub base_minutes: u64,
    /// Upper bound on any lockout window.
    pub max_minutes: u64,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            threshold: 5,
            base_minutes: 1,
            max_minutes: 60,
        }
    }
}

impl LockoutPolicy {
    /// Lockout window after `failed_attempts` consecutive failures, or `None`
    /// below the threshold.
    pub fn window_for(&self, failed_attempts: u32) -> Option<Duration> {
        if failed_attempts < self.threshold {
            return None;
        }
        let doublings = failed_attempts - self.threshold;
        let minutes = 1u64
            .checked_shl(doublings)
            .and_then(|factor| factor.checked_mul(self.base_minutes))
            .unwrap_or(u64::MAX)
            .min(self.max_minutes);
        Some(
            i64::try_from(minutes)
                .ok()
                .and_then(Duration::try_minutes)
                .unwrap_or(Duration::MAX),
        )
    }
}

/// Persisted failure counter and lockout deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutState {
    pub failed_attempts: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub lockout_until: DateTime<Utc>,
}

impl Default for LockoutState {
    fn default() -> Self {
        Self {
            failed_attempts: 0,
            lockout_until: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

impl LockoutState {
    pub fn record_failure(&mut self, now: DateTime<Utc>, policy: &LockoutPolicy) {
        self.failed_attempts = self.failed_attempts.saturating_add(1);
        if let Some(window) = policy.window_for(self.failed_attempts) {
            self.lockout_until = now
                .checked_add_signed(window)
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
        }
    }

    pub fn record_success(&mut self) {
        self.reset();
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_locked_out(&self, now: DateTime<Utc>) -> bool {
        now < self.lockout_until
    }

    /// Whole seconds until the lockout ends, rounded up so that a locked
    /// vault never reports zero.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> u64 {
        let remaining_ms = (self.lockout_until - now).num_milliseconds();
        if remaining_ms <= 0 {
            0
        } else {
            (remaining_ms as u64).div_ceil(1000)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_below_threshold_never_locks() {
        let policy = LockoutPolicy::default();
        let mut state = LockoutState::default();
        for _ in 0..4 {
            state.record_failure(t0(), &policy);
        }
        assert_eq!(state.failed_attempts, 4);
        assert!(!state.is_locked_out(t0()));
        assert_eq!(state.remaining_seconds(t0()), 0);
    }

    #[test]
    fn test_fifth_failure_locks_for_one_minute() {
        let policy = LockoutPolicy::default();
        let mut state = LockoutState::default();
        for _ in 0..5 {
            state.record_failure(t0(), &policy);
        }
        assert!(state.is_locked_out(t0()));
        assert_eq!(state.remaining_seconds(t0()), 60);
        assert!(!state.is_locked_out(t0() + Duration::seconds(60)));
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let policy = LockoutPolicy::default();
        let expected = [(5, 1), (6, 2), (7, 4), (8, 8), (9, 16), (10, 32), (11, 60), (40, 60)];
        for (failures, minutes) in expected {
            assert_eq!(
                policy.window_for(failures),
                Some(Duration::minutes(minutes)),
                "failure #{}",
                failures
            );
        }
        assert_eq!(policy.window_for(4), None);
        assert_eq!(policy.window_for(u32::MAX), Some(Duration::minutes(60)));
    }

    #[test]
    fn test_successive_failures_extend_window_from_now() {
        let policy = LockoutPolicy::default();
        let mut state = LockoutState::default();
        let mut now = t0();
        for _ in 0..5 {
            state.record_failure(now, &policy);
        }
        for minutes in [2, 4, 8] {
            now = state.lockout_until;
            state.record_failure(now, &policy);
            assert_eq!(state.remaining_seconds(now), minutes * 60);
        }
    }

    #[test]
    fn test_counter_does_not_decay() {
        let policy = LockoutPolicy::default();
        let mut state = LockoutState::default();
        for _ in 0..3 {
            state.record_failure(t0(), &policy);
        }
        let later = t0() + Duration::days(30);
        assert_eq!(state.failed_attempts, 3);
        state.record_failure(later, &policy);
        state.record_failure(later, &policy);
        assert!(state.is_locked_out(later));
    }

    #[test]
    fn test_success_resets() {
        let policy = LockoutPolicy::default();
        let mut state = LockoutState::default();
        for _ in 0..6 {
            state.record_failure(t0(), &policy);
        }
        state.record_success();
        assert_eq!(state, LockoutState::default());
        assert!(!state.is_locked_out(t0()));
    }

    #[test]
    fn test_oversized_window_saturates() {
        let policy = LockoutPolicy {
            threshold: 1,
            base_minutes: u64::MAX,
            max_minutes: u64::MAX,
        };
        let mut state = LockoutState::default();
        state.record_failure(t0(), &policy);
        assert!(state.is_locked_out(t0() + Duration::days(365 * 1000)));
    }

    #[test]
    fn test_remaining_seconds_rounds_up() {
        let state = LockoutState {
            failed_attempts: 5,
            lockout_until: t0() + Duration::milliseconds(1500),
        };
        assert_eq!(state.remaining_seconds(t0()), 2);
    }

    #[test]
    fn test_serialized_as_two_scalars() {
        let state = LockoutState {
            failed_attempts: 5,
            lockout_until: t0(),
        };
        let json = serde_json::to_value(state).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"failed_attempts": 5, "lockout_until": 1_700_000_000_000i64})
        );
    }
}
