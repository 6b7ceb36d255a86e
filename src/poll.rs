// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Poll-until-condition engine.
//!
//! Every wait in the upgrade scenario has the same shape: run a check against
//! the cluster, test the observed value with a [`Matcher`], and try again after
//! a fixed interval until the matcher is satisfied or a deadline passes.
//!
//! # Semantics
//!
//! - The first attempt runs immediately; later attempts start `interval` after
//!   the previous attempt returned, so a slow check never overlaps itself.
//! - The deadline is fixed once at `start + timeout` and is never extended.
//! - The check always runs at least once, even if it alone outlasts `timeout`.
//! - No attempt starts at or after the deadline. The sleep before the next
//!   attempt is cut short at the deadline, and the loop then times out, so
//!   with instantaneous checks the total time spent is exactly `timeout`.
//! - A timeout too large to represent as an instant means no deadline.
//! - A check error does not end polling. What the matcher sees for an errored
//!   attempt is governed by [`CheckErrorPolicy`].
//! - Intervals are fixed: no backoff and no jitter.
//!
//! # Example
//!
//! ```rust
//! use rancher_upgrade_check::clock::ManualClock;
//! use rancher_upgrade_check::matcher::{eq, not};
//! use rancher_upgrade_check::poll::{PollSpec, Poller};
//! use std::time::Duration;
//!
//! let poller = Poller::with_clock(ManualClock::new());
//! let spec = PollSpec::new(Duration::from_secs(10), Duration::from_secs(1)).unwrap();
//!
//! let mut versions = vec!["v2", "v1", "v1"];
//! let outcome = poller.poll_until(
//!     "image version",
//!     &spec,
//!     || Ok::<_, String>(versions.pop().unwrap_or("v2").to_string()),
//!     &not(eq("v1".to_string())),
//! );
//!
//! assert!(outcome.is_satisfied());
//! assert_eq!(outcome.attempts(), 3);
//! ```

use crate::clock::{Clock, SystemClock};
use crate::matcher::Matcher;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Rejected poll configuration.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollSpecError {
    /// Timeout of zero
    #[error("poll timeout must be greater than zero")]
    ZeroTimeout,

    /// Interval of zero
    #[error("poll interval must be greater than zero")]
    ZeroInterval,
}

/// What the matcher is evaluated against when a check returns an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckErrorPolicy {
    /// Evaluate the matcher against `T::default()`.
    ///
    /// An errored attempt can satisfy a matcher that accepts the default value
    /// (for example `not(eq("v1"))` accepts the empty string).
    #[default]
    EvaluateDefault,

    /// An errored attempt never satisfies the matcher.
    TreatAsUnsatisfied,
}

/// Timeout and interval for one polling loop.
///
/// Both durations are strictly positive; [`PollSpec::new`] is the only way to
/// build one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSpec {
    timeout: Duration,
    interval: Duration,
    on_check_error: CheckErrorPolicy,
}

impl PollSpec {
    /// Creates a poll specification.
    ///
    /// # Errors
    ///
    /// Returns [`PollSpecError`] if `timeout` or `interval` is zero.
    pub fn new(timeout: Duration, interval: Duration) -> Result<Self, PollSpecError> {
        if timeout.is_zero() {
            return Err(PollSpecError::ZeroTimeout);
        }
        if interval.is_zero() {
            return Err(PollSpecError::ZeroInterval);
        }

        Ok(Self {
            timeout,
            interval,
            on_check_error: CheckErrorPolicy::default(),
        })
    }

    /// Sets how errored attempts are evaluated.
    #[must_use]
    pub fn with_check_error_policy(mut self, policy: CheckErrorPolicy) -> Self {
        self.on_check_error = policy;
        self
    }

    /// Multiplies the timeout by `factor`, leaving the interval alone.
    ///
    /// A factor of zero is treated as one so the result stays valid.
    #[must_use]
    pub fn scaled(mut self, factor: u32) -> Self {
        self.timeout = self.timeout.saturating_mul(factor.max(1));
        self
    }

    /// Overall time budget for the loop.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Pause between the end of one attempt and the start of the next.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// How errored attempts are evaluated.
    #[must_use]
    pub fn check_error_policy(&self) -> CheckErrorPolicy {
        self.on_check_error
    }
}

/// Terminal result of a polling loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T, E> {
    /// An attempt produced a value the matcher accepted.
    Satisfied {
        /// The accepted value
        value: T,
        /// Number of check invocations, including the successful one
        attempts: u32,
        /// Time from the first invocation to the end of the successful one
        elapsed: Duration,
    },

    /// The deadline passed before any attempt was accepted.
    TimedOut {
        /// Value of the final attempt (`T::default()` if it errored)
        last_value: T,
        /// Error of the final attempt, if it errored
        last_error: Option<E>,
        /// Number of check invocations
        attempts: u32,
        /// Time from the first invocation to giving up
        elapsed: Duration,
    },
}

impl<T, E> PollOutcome<T, E> {
    /// Whether the matcher was satisfied.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied { .. })
    }

    /// Number of check invocations.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Satisfied { attempts, .. } | Self::TimedOut { attempts, .. } => *attempts,
        }
    }

    /// Time spent polling.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        match self {
            Self::Satisfied { elapsed, .. } | Self::TimedOut { elapsed, .. } => *elapsed,
        }
    }
}

/// Runs polling loops against a [`Clock`].
#[derive(Debug, Clone, Default)]
pub struct Poller<C = SystemClock> {
    clock: C,
}

impl Poller<SystemClock> {
    /// Poller backed by the wall clock.
    #[must_use]
    pub fn new() -> Self {
        Self { clock: SystemClock }
    }
}

impl<C: Clock> Poller<C> {
    /// Poller backed by `clock`.
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }

    /// The clock this poller measures time with.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Invoke `check` until `matcher` accepts its value or `spec` times out.
    ///
    /// # Arguments
    ///
    /// * `operation` - Human-readable name for logging (e.g., "rancher rollout")
    /// * `spec` - Timeout and interval for this loop
    /// * `check` - One observation of external state
    /// * `matcher` - Predicate the observed value must satisfy
    ///
    /// # Returns
    ///
    /// [`PollOutcome::Satisfied`] with the accepted value, or
    /// [`PollOutcome::TimedOut`] with the last value and error observed.
    pub fn poll_until<T, E, F, M>(
        &self,
        operation: &str,
        spec: &PollSpec,
        mut check: F,
        matcher: &M,
    ) -> PollOutcome<T, E>
    where
        T: Default,
        E: Display,
        F: FnMut() -> Result<T, E>,
        M: Matcher<T> + ?Sized,
    {
        let start = self.clock.now();
        let deadline = start.checked_add(spec.timeout());
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;

            let (value, error) = match check() {
                Ok(value) => (value, None),
                Err(e) => (T::default(), Some(e)),
            };

            let satisfied = match (&error, spec.check_error_policy()) {
                (Some(_), CheckErrorPolicy::TreatAsUnsatisfied) => false,
                _ => matcher.matches(&value),
            };

            let now = self.clock.now();
            let elapsed = now.saturating_duration_since(start);

            if satisfied {
                if attempts > 1 {
                    info!(
                        operation = operation,
                        attempts = attempts,
                        elapsed = ?elapsed,
                        "Condition satisfied after retries"
                    );
                } else {
                    debug!(operation = operation, "Condition satisfied on first attempt");
                }
                return PollOutcome::Satisfied {
                    value,
                    attempts,
                    elapsed,
                };
            }

            match &error {
                Some(e) => debug!(
                    operation = operation,
                    attempt = attempts,
                    error = %e,
                    "Check failed, tolerating until timeout"
                ),
                None => debug!(
                    operation = operation,
                    attempt = attempts,
                    mismatch = %matcher.describe_mismatch(&value),
                    "Condition not yet satisfied"
                ),
            }

            let pause = match deadline {
                Some(deadline) => spec.interval().min(deadline.saturating_duration_since(now)),
                None => spec.interval(),
            };
            if !pause.is_zero() {
                self.clock.sleep(pause);
            }

            let now = self.clock.now();
            if deadline.is_some_and(|deadline| now >= deadline) {
                let elapsed = now.saturating_duration_since(start);
                warn!(
                    operation = operation,
                    attempts = attempts,
                    elapsed = ?elapsed,
                    timeout = ?spec.timeout(),
                    "Timed out waiting for condition"
                );
                return PollOutcome::TimedOut {
                    last_value: value,
                    last_error: error,
                    attempts,
                    elapsed,
                };
            }
        }
    }
}

#[cfg(test)]
#[path = "poll_tests.rs"]
mod poll_tests;
