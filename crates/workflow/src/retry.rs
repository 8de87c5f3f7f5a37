//! Per-step retry policies.

use std::time::Duration;

use crate::error::ErrorClass;

/// Which failure classes a policy retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOn {
    /// Retry every failure class.
    Any,
    /// Retry only transient infrastructure failures.
    Transient,
    /// Retry only the one named class.
    Class(ErrorClass),
}

/// Retry policy attached to a workflow step.
///
/// `max_attempts` counts retries after the initial invocation, so a policy
/// with `max_attempts = 2` allows at most 3 invocations. `max_attempts = 0`
/// means fail immediately; used where a failure signals a real business-rule
/// violation rather than a transient fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// The failure classes this policy retries.
    pub retry_on: RetryOn,
    /// Retry ceiling (retries after the initial attempt).
    pub max_attempts: u32,
    /// Backoff before the first retry.
    pub interval: Duration,
    /// Backoff multiplier applied per retry.
    pub backoff_rate: u32,
}

impl RetryPolicy {
    /// Creates a policy.
    pub const fn new(
        retry_on: RetryOn,
        max_attempts: u32,
        interval: Duration,
        backoff_rate: u32,
    ) -> Self {
        Self {
            retry_on,
            max_attempts,
            interval,
            backoff_rate,
        }
    }

    /// The coarse default policy: retry any failure, 2 attempts, 1s initial
    /// backoff, rate 2. Used by the payment tasks.
    pub const fn generic() -> Self {
        Self::new(RetryOn::Any, 2, Duration::from_secs(1), 2)
    }

    /// Retries only transient infrastructure failures (2 attempts, 1s, rate
    /// 2). Used by the seat tasks, where a conditional-check failure means
    /// the business rule really failed.
    pub const fn transient() -> Self {
        Self::new(RetryOn::Transient, 2, Duration::from_secs(1), 2)
    }

    /// Retries only the one named class (2 attempts, 1s, rate 2). Used by
    /// the booking and notification tasks.
    pub const fn on_class(class: ErrorClass) -> Self {
        Self::new(RetryOn::Class(class), 2, Duration::from_secs(1), 2)
    }

    /// Never retries.
    pub const fn none() -> Self {
        Self::new(RetryOn::Any, 0, Duration::ZERO, 1)
    }

    /// Returns true if the policy retries the given class at all.
    pub fn matches(&self, class: ErrorClass) -> bool {
        match self.retry_on {
            RetryOn::Any => true,
            RetryOn::Transient => class.is_transient(),
            RetryOn::Class(c) => class == c,
        }
    }

    /// Decides whether another retry is allowed after `failures` failed
    /// attempts of the given class, and returns the backoff to wait first.
    ///
    /// The delay before retry *n* (1-based) is
    /// `interval * backoff_rate^(n-1)`.
    pub fn next_delay(&self, class: ErrorClass, failures: u32) -> Option<Duration> {
        if !self.matches(class) || failures > self.max_attempts {
            return None;
        }
        let factor = self.backoff_rate.saturating_pow(failures.saturating_sub(1));
        Some(self.interval.saturating_mul(factor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_policy_retries_any_class() {
        let policy = RetryPolicy::generic();
        assert!(policy.matches(ErrorClass::PaymentProcessing));
        assert!(policy.matches(ErrorClass::ServiceUnavailable));
        assert!(policy.matches(ErrorClass::Internal));
    }

    #[test]
    fn transient_policy_does_not_retry_conditional_check() {
        let policy = RetryPolicy::transient();
        assert!(policy.matches(ErrorClass::Throttling));
        assert!(policy.matches(ErrorClass::Timeout));
        assert!(!policy.matches(ErrorClass::ConditionalCheckFailed));
        assert_eq!(policy.next_delay(ErrorClass::ConditionalCheckFailed, 1), None);
    }

    #[test]
    fn class_policy_matches_only_its_class() {
        let policy = RetryPolicy::on_class(ErrorClass::BookingReservation);
        assert!(policy.matches(ErrorClass::BookingReservation));
        assert!(!policy.matches(ErrorClass::BookingCancellation));
        assert!(!policy.matches(ErrorClass::ServiceUnavailable));
    }

    #[test]
    fn backoff_doubles_per_retry() {
        let policy = RetryPolicy::generic();
        assert_eq!(
            policy.next_delay(ErrorClass::PaymentProcessing, 1),
            Some(Duration::from_secs(1))
        );
        assert_eq!(
            policy.next_delay(ErrorClass::PaymentProcessing, 2),
            Some(Duration::from_secs(2))
        );
        assert_eq!(policy.next_delay(ErrorClass::PaymentProcessing, 3), None);
    }

    #[test]
    fn zero_attempts_fails_immediately() {
        let policy = RetryPolicy::none();
        assert_eq!(policy.next_delay(ErrorClass::ServiceUnavailable, 1), None);
    }

    #[test]
    fn retry_bound_allows_at_most_three_invocations() {
        // max_attempts=2: after failures 1 and 2 a retry is allowed, after
        // failure 3 it is not.
        let policy = RetryPolicy::transient();
        assert!(policy.next_delay(ErrorClass::ServiceUnavailable, 1).is_some());
        assert!(policy.next_delay(ErrorClass::ServiceUnavailable, 2).is_some());
        assert!(policy.next_delay(ErrorClass::ServiceUnavailable, 3).is_none());
    }
}
