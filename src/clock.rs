// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Time source used by the poll engine.
//!
//! Production code polls against [`SystemClock`]. Tests use [`ManualClock`],
//! whose sleeps advance virtual time instantly, so timeout behaviour can be
//! checked without waiting on the wall clock.
//!
//! # Example
//!
//! ```rust
//! use rancher_upgrade_check::clock::{Clock, ManualClock};
//! use std::time::Duration;
//!
//! let clock = ManualClock::new();
//! let start = clock.now();
//! clock.sleep(Duration::from_secs(30));
//! assert_eq!(clock.now() - start, Duration::from_secs(30));
//! assert_eq!(clock.sleeps(), 1);
//! ```

use std::cell::Cell;
use std::time::{Duration, Instant};

/// A source of time that can also block the caller.
pub trait Clock {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Block the caller for `duration`.
    fn sleep(&self, duration: Duration);
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}

/// Wall-clock time with blocking sleeps.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Virtual time for tests.
///
/// `sleep` advances the clock by the requested duration and returns at once.
/// A check under test can call [`ManualClock::advance`] to simulate the time a
/// slow external command would take.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<Instant>,
    sleeps: Cell<u32>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Creates a clock frozen at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: Cell::new(Instant::now()),
            sleeps: Cell::new(0),
        }
    }

    /// Moves virtual time forward without counting it as a sleep.
    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }

    /// Number of `sleep` calls so far.
    #[must_use]
    pub fn sleeps(&self) -> u32 {
        self.sleeps.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
        self.sleeps.set(self.sleeps.get() + 1);
    }
}
