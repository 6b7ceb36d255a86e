// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Assertion harness over poll outcomes.
//!
//! Turns a [`PollOutcome`] into a pass/fail result with a diagnostic that is
//! good enough to triage a failed upgrade from the log alone. Two kinds of
//! timeout are kept apart:
//!
//! - [`AssertionError::CollaboratorFailed`] - the last attempt could not even
//!   observe the cluster (`kubectl` missing, API server unreachable, ...).
//! - [`AssertionError::Unsatisfied`] - the cluster was observed, but never in
//!   the expected state.
//!
//! # Example
//!
//! ```rust
//! use rancher_upgrade_check::clock::ManualClock;
//! use rancher_upgrade_check::matcher::contains_substring;
//! use rancher_upgrade_check::poll::{PollSpec, Poller};
//! use std::time::Duration;
//!
//! let poller = Poller::with_clock(ManualClock::new());
//! let spec = PollSpec::new(Duration::from_secs(60), Duration::from_secs(10)).unwrap();
//!
//! let err = poller
//!     .eventually(
//!         "rancher rollout",
//!         &spec,
//!         || Err::<String, _>("kubectl: command not found"),
//!         &contains_substring("successfully rolled out"),
//!     )
//!     .unwrap_err();
//!
//! assert!(err.is_collaborator_failure());
//! ```

use crate::clock::Clock;
use crate::matcher::Matcher;
use crate::poll::{PollOutcome, PollSpec, Poller};
use std::fmt::{Debug, Display};
use std::time::Duration;
use thiserror::Error;

/// A failed expectation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssertionError {
    /// Timed out while the external command itself kept failing
    #[error(
        "{description}: external command still failing after {attempts} attempt(s) in {elapsed:?} \
         (timeout {timeout:?}, interval {interval:?}), last observed {last_value}: {last_error}"
    )]
    CollaboratorFailed {
        /// What was being waited for
        description: String,
        /// Error of the final attempt
        last_error: String,
        /// Value the matcher saw on the final attempt
        last_value: String,
        /// Number of check invocations
        attempts: u32,
        /// Time spent polling
        elapsed: Duration,
        /// Configured timeout
        timeout: Duration,
        /// Configured interval
        interval: Duration,
    },

    /// Timed out while the command succeeded but never returned the expected value
    #[error(
        "{description}: expected {expected}, last observed {last_value} after {attempts} attempt(s) \
         in {elapsed:?} (timeout {timeout:?}, interval {interval:?})"
    )]
    Unsatisfied {
        /// What was being waited for
        description: String,
        /// What the matcher expects
        expected: String,
        /// Final observed value
        last_value: String,
        /// Why the final value was rejected
        mismatch: String,
        /// Number of check invocations
        attempts: u32,
        /// Time spent polling
        elapsed: Duration,
        /// Configured timeout
        timeout: Duration,
        /// Configured interval
        interval: Duration,
    },

    /// A one-shot expectation did not hold
    #[error("{description}: expected {expected}, got {actual}")]
    Mismatch {
        /// What was being checked
        description: String,
        /// What the matcher expects
        expected: String,
        /// The rejected value
        actual: String,
    },
}

impl AssertionError {
    /// Whether the failure is an external command fault rather than a wrong value.
    #[must_use]
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(self, Self::CollaboratorFailed { .. })
    }

    /// Number of attempts made, for timed-out polls.
    #[must_use]
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::CollaboratorFailed { attempts, .. } | Self::Unsatisfied { attempts, .. } => {
                Some(*attempts)
            }
            Self::Mismatch { .. } => None,
        }
    }
}

/// A value that satisfied its matcher, with how long it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified<T> {
    /// The accepted value
    pub value: T,
    /// Number of check invocations
    pub attempts: u32,
    /// Time spent polling
    pub elapsed: Duration,
}

/// Convert a poll outcome into a pass/fail result.
///
/// # Errors
///
/// Returns [`AssertionError::CollaboratorFailed`] if the outcome timed out and
/// its final attempt errored, or [`AssertionError::Unsatisfied`] if it timed
/// out on a value the matcher rejected.
pub fn assert_outcome<T, E, M>(
    description: &str,
    spec: &PollSpec,
    outcome: PollOutcome<T, E>,
    matcher: &M,
) -> Result<Verified<T>, AssertionError>
where
    T: Debug,
    E: Display,
    M: Matcher<T> + ?Sized,
{
    match outcome {
        PollOutcome::Satisfied {
            value,
            attempts,
            elapsed,
        } => Ok(Verified {
            value,
            attempts,
            elapsed,
        }),
        PollOutcome::TimedOut {
            last_value,
            last_error: Some(error),
            attempts,
            elapsed,
        } => Err(AssertionError::CollaboratorFailed {
            description: description.to_string(),
            last_error: error.to_string(),
            last_value: format!("{last_value:?}"),
            attempts,
            elapsed,
            timeout: spec.timeout(),
            interval: spec.interval(),
        }),
        PollOutcome::TimedOut {
            last_value,
            last_error: None,
            attempts,
            elapsed,
        } => Err(AssertionError::Unsatisfied {
            description: description.to_string(),
            expected: matcher.describe(),
            mismatch: matcher.describe_mismatch(&last_value),
            last_value: format!("{last_value:?}"),
            attempts,
            elapsed,
            timeout: spec.timeout(),
            interval: spec.interval(),
        }),
    }
}

impl<C: Clock> Poller<C> {
    /// Poll `check` until `matcher` accepts its value, failing on timeout.
    ///
    /// # Errors
    ///
    /// See [`assert_outcome`].
    pub fn eventually<T, E, F, M>(
        &self,
        description: &str,
        spec: &PollSpec,
        check: F,
        matcher: &M,
    ) -> Result<Verified<T>, AssertionError>
    where
        T: Default + Debug,
        E: Display,
        F: FnMut() -> Result<T, E>,
        M: Matcher<T> + ?Sized,
    {
        let outcome = self.poll_until(description, spec, check, matcher);
        assert_outcome(description, spec, outcome, matcher)
    }
}

/// Check `value` against `matcher` once.
///
/// # Errors
///
/// Returns [`AssertionError::Mismatch`] if the matcher rejects the value.
pub fn expect_that<T, M>(description: &str, value: &T, matcher: &M) -> Result<(), AssertionError>
where
    T: Debug + ?Sized,
    M: Matcher<T> + ?Sized,
{
    if matcher.matches(value) {
        return Ok(());
    }

    Err(AssertionError::Mismatch {
        description: description.to_string(),
        expected: matcher.describe(),
        actual: format!("{value:?}"),
    })
}

#[cfg(test)]
#[path = "assertion_tests.rs"]
mod assertion_tests;
