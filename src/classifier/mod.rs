pub mod types;

pub use types::{Action, ErrorCategory, ErrorContext, ErrorPattern};

use std::time::Duration;

use crate::retry::RetryPolicy;

const RECOVERABLE_PATTERNS: &[&str] = &[
    "timeout",
    "timed out",
    "network unreachable",
    "connection reset",
    "connection refused",
    "rate limit",
    "throttle",
    "temporary",
    "busy",
    "try again",
];

const NON_RECOVERABLE_PATTERNS: &[&str] = &[
    "file not found",
    "permission denied",
    "disk full",
    "invalid format",
    "auth failed",
    "authentication failed",
    "corrupted",
    "invalid checksum",
    "file too large",
];

const SYSTEM_PATTERNS: &[&str] = &[
    "out of memory",
    "database unavailable",
    "service unavailable",
    "configuration error",
    "panic",
    "deadlock",
];

/// Classifies an error message into a category, checking non-recoverable
/// patterns first, then system patterns, then recoverable patterns, and
/// finally falling back to the sentinel/default mapping in
/// [`classify_sentinel`].
pub fn classify(message: &str) -> ErrorCategory {
    let lower = message.to_lowercase();

    if NON_RECOVERABLE_PATTERNS.iter().any(|p| lower.contains(p)) {
        return ErrorCategory::NonRecoverable;
    }
    if SYSTEM_PATTERNS.iter().any(|p| lower.contains(p)) {
        return ErrorCategory::System;
    }
    if RECOVERABLE_PATTERNS.iter().any(|p| lower.contains(p)) {
        return ErrorCategory::Recoverable;
    }
    classify_sentinel(&lower)
}

/// Maps known engine sentinel errors (matched by substring on their
/// `Display` text) to a category; anything unrecognized defaults to
/// recoverable, matching the spec's "default recoverable" precedence tier.
fn classify_sentinel(lower: &str) -> ErrorCategory {
    if lower.contains("max concurrent transfers exceeded") {
        return ErrorCategory::Recoverable;
    }
    if lower.contains("transfer not found")
        || lower.contains("invalid state transition")
        || lower.contains("transfer already exists")
        || lower.contains("session not found")
        || lower.contains("transfer cancelled")
    {
        return ErrorCategory::NonRecoverable;
    }
    if lower.contains("invalid configuration") {
        return ErrorCategory::System;
    }
    ErrorCategory::Recoverable
}

/// Recommends an action given an error's category, the current retry count,
/// and the configured retry policy.
pub fn recommend_action(category: ErrorCategory, retry_count: u32, policy: &RetryPolicy) -> Action {
    match category {
        ErrorCategory::Recoverable => {
            if retry_count < policy.max_retries {
                Action::Retry
            } else {
                Action::Fail
            }
        }
        ErrorCategory::NonRecoverable => Action::Fail,
        ErrorCategory::System => {
            if retry_count == 0 {
                Action::Retry
            } else {
                Action::Pause
            }
        }
    }
}

/// `initialDelay * backoffFactor^retryCount`, capped at `maxDelay`.
pub fn retry_delay(policy: &RetryPolicy, retry_count: u32) -> Duration {
    let factor = policy.backoff_factor.powi(retry_count as i32);
    let millis = (policy.initial_delay.as_millis() as f64 * factor) as u64;
    Duration::from_millis(millis).min(policy.max_delay)
}
