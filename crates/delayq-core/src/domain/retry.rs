//! Retry policy: decides whether a failed record is retried or dropped.

/// Retry budget applied when a record carries no `retry_limit`.
pub const DEFAULT_RETRY_LIMIT: u32 = 5;

/// What to do with a record after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Keep the record; persist `attempt_count`. It stays due immediately.
    Reschedule { attempt_count: u32 },

    /// Budget exhausted; delete the record.
    Drop,
}

/// Retry policy for failed attempts.
///
/// There is no backoff: a rescheduled record keeps its `execute_at` and is
/// picked up again by the next pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Limit used for records without their own `retry_limit`.
    pub default_limit: u32,
}

impl RetryPolicy {
    pub fn new(default_limit: u32) -> Self {
        Self { default_limit }
    }

    /// The limit that applies to a record.
    ///
    /// Resolved here, at decision time, so changing the default affects
    /// records that are already stored.
    pub fn limit_for(&self, retry_limit: Option<u32>) -> u32 {
        retry_limit.unwrap_or(self.default_limit)
    }

    /// Decide the fate of a record after attempt number `attempt` failed.
    ///
    /// # Arguments
    /// * `retry_limit` - the record's own limit, if set.
    /// * `attempt` - the attempt that just failed (1-indexed, i.e.
    ///   `attempt_count + 1`).
    pub fn decide(&self, retry_limit: Option<u32>, attempt: u32) -> RetryDecision {
        if attempt < self.limit_for(retry_limit) {
            RetryDecision::Reschedule {
                attempt_count: attempt,
            }
        } else {
            RetryDecision::Drop
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn default_policy_uses_five_attempts() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.limit_for(None), 5);
        assert_eq!(policy.limit_for(Some(2)), 2);
    }

    #[rstest]
    #[case(Some(3), 1, RetryDecision::Reschedule { attempt_count: 1 })]
    #[case(Some(3), 2, RetryDecision::Reschedule { attempt_count: 2 })]
    #[case(Some(3), 3, RetryDecision::Drop)]
    #[case(Some(1), 1, RetryDecision::Drop)]
    #[case(Some(0), 1, RetryDecision::Drop)]
    #[case(None, 4, RetryDecision::Reschedule { attempt_count: 4 })]
    #[case(None, 5, RetryDecision::Drop)]
    fn decides_by_attempt_against_limit(
        #[case] retry_limit: Option<u32>,
        #[case] attempt: u32,
        #[case] expected: RetryDecision,
    ) {
        assert_eq!(RetryPolicy::default().decide(retry_limit, attempt), expected);
    }

    #[test]
    fn default_is_applied_at_decision_time() {
        let strict = RetryPolicy::new(2);
        let lenient = RetryPolicy::new(10);

        assert_eq!(strict.decide(None, 2), RetryDecision::Drop);
        assert_eq!(
            lenient.decide(None, 2),
            RetryDecision::Reschedule { attempt_count: 2 }
        );
    }
}
