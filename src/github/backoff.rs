//! Retry decisions for failed GitHub calls.
//!
//! The policy is a pure function of the failure kind, the attempt number and
//! any server-supplied hint, so the gateway loop stays free of arithmetic and
//! the schedule can be tested without a clock.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Classification of a failed call, as seen by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The primary rate limit is exhausted.
    RateLimited,
    /// A secondary rate limit or abuse-detection response.
    Throttled,
    /// GitHub answered with a 5xx status.
    ServerError,
    /// The request never produced a response, or GitHub reported a gateway
    /// hiccup inside an otherwise successful payload.
    Transient,
    /// Anything else; never retried.
    Fatal,
}

/// Timing hints the server attached to a failed response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerHint {
    /// Instant at which the primary rate limit window resets.
    pub reset_at: Option<DateTime<Utc>>,
    /// Delay requested by a `Retry-After` header.
    pub retry_after: Option<Duration>,
}

impl ServerHint {
    /// A hint carrying no timing information.
    pub const NONE: Self = Self {
        reset_at: None,
        retry_after: None,
    };
}

/// What the gateway should do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Sleep for the given duration, then try again.
    Retry(Duration),
    /// Stop and surface the failure.
    GiveUp,
}

/// Retry schedule for GitHub calls.
///
/// Rate-limit and throttle waits are not capped by `max_attempts`: GitHub
/// tells the caller exactly when quota comes back. Server errors and
/// transport failures are bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Minimum sleep after a primary rate limit response.
    pub rate_limit_floor: Duration,
    /// Slack added after the advertised reset instant.
    pub reset_padding: Duration,
    /// Sleep after a throttle response lacking `Retry-After`.
    pub throttle_default: Duration,
    /// Fixed sleep after a 5xx response.
    pub server_error_wait: Duration,
    /// First transient backoff step; doubles per attempt.
    pub transient_base: Duration,
    /// Upper bound on the exponential part of transient backoff.
    pub transient_cap: Duration,
    /// Linear jitter added per attempt to transient backoff.
    pub jitter_step: Duration,
    /// Attempts allowed for server and transient failures, including the first.
    pub max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            rate_limit_floor: Duration::from_secs(5),
            reset_padding: Duration::from_secs(1),
            throttle_default: Duration::from_secs(10),
            server_error_wait: Duration::from_secs(3),
            transient_base: Duration::from_millis(500),
            transient_cap: Duration::from_secs(10),
            jitter_step: Duration::from_millis(100),
            max_attempts: 6,
        }
    }
}

impl BackoffPolicy {
    /// A policy with the default attempt ceiling and every wait set to zero.
    #[cfg(any(test, feature = "test-support"))]
    #[must_use]
    pub const fn without_waits() -> Self {
        Self {
            rate_limit_floor: Duration::ZERO,
            reset_padding: Duration::ZERO,
            throttle_default: Duration::ZERO,
            server_error_wait: Duration::ZERO,
            transient_base: Duration::ZERO,
            transient_cap: Duration::ZERO,
            jitter_step: Duration::ZERO,
            max_attempts: 6,
        }
    }

    /// Decides whether to retry after `attempt` failed calls.
    ///
    /// `attempt` counts the server and transient failures seen so far,
    /// starting at 1. Rate-limit and throttle responses do not advance it.
    #[must_use]
    pub fn decide(
        &self,
        kind: FailureKind,
        attempt: u32,
        hint: &ServerHint,
        now: DateTime<Utc>,
    ) -> Decision {
        match kind {
            FailureKind::RateLimited => Decision::Retry(self.rate_limit_wait(hint, now)),
            FailureKind::Throttled => {
                Decision::Retry(hint.retry_after.unwrap_or(self.throttle_default))
            }
            FailureKind::ServerError if attempt < self.max_attempts => {
                Decision::Retry(self.server_error_wait)
            }
            FailureKind::Transient if attempt < self.max_attempts => {
                Decision::Retry(self.transient_wait(attempt))
            }
            FailureKind::ServerError | FailureKind::Transient | FailureKind::Fatal => {
                Decision::GiveUp
            }
        }
    }

    /// Returns true when the kind counts towards `max_attempts`.
    #[must_use]
    pub const fn is_capped(kind: FailureKind) -> bool {
        matches!(kind, FailureKind::ServerError | FailureKind::Transient)
    }

    fn rate_limit_wait(&self, hint: &ServerHint, now: DateTime<Utc>) -> Duration {
        let Some(reset_at) = hint.reset_at else {
            return self.rate_limit_floor;
        };
        let until_reset = reset_at
            .signed_duration_since(now)
            .to_std()
            .unwrap_or(Duration::ZERO);
        until_reset
            .saturating_add(self.reset_padding)
            .max(self.rate_limit_floor)
    }

    fn transient_wait(&self, attempt: u32) -> Duration {
        let factor = 1_u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        let exponential = self.transient_base.saturating_mul(factor).min(self.transient_cap);
        exponential.saturating_add(self.jitter_step.saturating_mul(attempt))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{DateTime, TimeDelta, Utc};
    use rstest::{fixture, rstest};

    use super::{BackoffPolicy, Decision, FailureKind, ServerHint};

    #[fixture]
    fn policy() -> BackoffPolicy {
        BackoffPolicy::default()
    }

    #[fixture]
    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).expect("fixed timestamp should be valid")
    }

    #[rstest]
    fn rate_limit_waits_until_reset_plus_padding(policy: BackoffPolicy, now: DateTime<Utc>) {
        let hint = ServerHint {
            reset_at: Some(now + TimeDelta::seconds(30)),
            retry_after: None,
        };

        let decision = policy.decide(FailureKind::RateLimited, 1, &hint, now);

        assert_eq!(decision, Decision::Retry(Duration::from_secs(31)));
    }

    #[rstest]
    #[case::reset_in_past(Some(-120))]
    #[case::reset_imminent(Some(1))]
    #[case::reset_unknown(None)]
    fn rate_limit_wait_never_drops_below_floor(
        policy: BackoffPolicy,
        now: DateTime<Utc>,
        #[case] offset_seconds: Option<i64>,
    ) {
        let hint = ServerHint {
            reset_at: offset_seconds.map(|offset| now + TimeDelta::seconds(offset)),
            retry_after: None,
        };

        let decision = policy.decide(FailureKind::RateLimited, 1, &hint, now);

        assert_eq!(decision, Decision::Retry(Duration::from_secs(5)));
    }

    #[rstest]
    fn rate_limit_is_not_capped_by_attempts(policy: BackoffPolicy, now: DateTime<Utc>) {
        let decision =
            policy.decide(FailureKind::RateLimited, 50, &ServerHint::default(), now);

        assert!(
            matches!(decision, Decision::Retry(_)),
            "expected retry, got {decision:?}"
        );
    }

    #[rstest]
    #[case::retry_after_header(Some(Duration::from_secs(42)), Duration::from_secs(42))]
    #[case::default_wait(None, Duration::from_secs(10))]
    fn throttle_honours_retry_after(
        policy: BackoffPolicy,
        now: DateTime<Utc>,
        #[case] retry_after: Option<Duration>,
        #[case] expected: Duration,
    ) {
        let hint = ServerHint {
            reset_at: None,
            retry_after,
        };

        assert_eq!(
            policy.decide(FailureKind::Throttled, 9, &hint, now),
            Decision::Retry(expected)
        );
    }

    #[rstest]
    fn server_errors_use_a_fixed_wait_until_capped(policy: BackoffPolicy, now: DateTime<Utc>) {
        let hint = ServerHint::default();

        for attempt in 1..6 {
            assert_eq!(
                policy.decide(FailureKind::ServerError, attempt, &hint, now),
                Decision::Retry(Duration::from_secs(3)),
                "attempt {attempt} should retry"
            );
        }
        assert_eq!(
            policy.decide(FailureKind::ServerError, 6, &hint, now),
            Decision::GiveUp
        );
    }

    #[rstest]
    #[case(1, 600)]
    #[case(2, 1_200)]
    #[case(3, 2_300)]
    #[case(4, 4_400)]
    #[case(5, 8_500)]
    fn transient_backoff_doubles_with_linear_jitter(
        policy: BackoffPolicy,
        now: DateTime<Utc>,
        #[case] attempt: u32,
        #[case] expected_millis: u64,
    ) {
        assert_eq!(
            policy.decide(FailureKind::Transient, attempt, &ServerHint::default(), now),
            Decision::Retry(Duration::from_millis(expected_millis))
        );
    }

    #[rstest]
    fn transient_backoff_is_capped(now: DateTime<Utc>) {
        let policy = BackoffPolicy {
            max_attempts: 100,
            ..BackoffPolicy::default()
        };

        assert_eq!(
            policy.decide(FailureKind::Transient, 40, &ServerHint::default(), now),
            Decision::Retry(Duration::from_secs(10) + Duration::from_millis(4_000))
        );
    }

    #[rstest]
    fn fatal_failures_are_never_retried(policy: BackoffPolicy, now: DateTime<Utc>) {
        assert_eq!(
            policy.decide(FailureKind::Fatal, 1, &ServerHint::default(), now),
            Decision::GiveUp
        );
    }

    #[rstest]
    fn without_waits_keeps_the_attempt_ceiling(now: DateTime<Utc>) {
        let policy = BackoffPolicy::without_waits();

        assert_eq!(
            policy.decide(FailureKind::Transient, 1, &ServerHint::default(), now),
            Decision::Retry(Duration::ZERO)
        );
        assert_eq!(
            policy.decide(FailureKind::Transient, 6, &ServerHint::default(), now),
            Decision::GiveUp
        );
    }
}
