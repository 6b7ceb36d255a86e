// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Predicates evaluated against the value each poll attempt observes.
//!
//! A [`Matcher`] is a pure test over a value plus a human-readable description
//! of what it expects. Descriptions end up in the diagnostic of a failed
//! assertion, so they should read naturally after "expected".
//!
//! # Example
//!
//! ```rust
//! use rancher_upgrade_check::matcher::{contains_substring, eq, has_field_count, not, Matcher};
//!
//! assert!(contains_substring("rolled out").matches("deployment \"rancher\" successfully rolled out"));
//! assert!(not(eq("v1".to_string())).matches(&"v2".to_string()));
//! assert!(has_field_count(1).matches("rancher/rancher:v2.9.0"));
//! ```

use std::fmt::Debug;

/// A predicate over values of type `T`.
pub trait Matcher<T: ?Sized> {
    /// Check if the value matches.
    fn matches(&self, value: &T) -> bool;

    /// Describe what this matcher expects.
    fn describe(&self) -> String;

    /// Describe why a value didn't match.
    fn describe_mismatch(&self, value: &T) -> String;
}

impl<T: ?Sized, M: Matcher<T> + ?Sized> Matcher<T> for &M {
    fn matches(&self, value: &T) -> bool {
        (**self).matches(value)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }

    fn describe_mismatch(&self, value: &T) -> String {
        (**self).describe_mismatch(value)
    }
}

// =============================================================================
// Equality
// =============================================================================

/// Matches values equal to `expected`.
pub fn eq<T: PartialEq + Debug>(expected: T) -> EqMatcher<T> {
    EqMatcher { expected }
}

/// Matcher for equality.
#[derive(Debug, Clone)]
pub struct EqMatcher<T> {
    expected: T,
}

impl<T: PartialEq + Debug> Matcher<T> for EqMatcher<T> {
    fn matches(&self, value: &T) -> bool {
        value == &self.expected
    }

    fn describe(&self) -> String {
        format!("equals {:?}", self.expected)
    }

    fn describe_mismatch(&self, value: &T) -> String {
        format!("{:?} does not equal {:?}", value, self.expected)
    }
}

/// Inverts another matcher.
pub fn not<M>(inner: M) -> NotMatcher<M> {
    NotMatcher { inner }
}

/// Matcher for negation.
#[derive(Debug, Clone)]
pub struct NotMatcher<M> {
    inner: M,
}

impl<T: Debug + ?Sized, M: Matcher<T>> Matcher<T> for NotMatcher<M> {
    fn matches(&self, value: &T) -> bool {
        !self.inner.matches(value)
    }

    fn describe(&self) -> String {
        format!("not ({})", self.inner.describe())
    }

    fn describe_mismatch(&self, value: &T) -> String {
        format!("{:?} unexpectedly {}", value, self.inner.describe())
    }
}

// =============================================================================
// Strings
// =============================================================================

/// Matches strings containing `substring`.
pub fn contains_substring(substring: &str) -> ContainsSubstring {
    ContainsSubstring {
        substring: substring.to_string(),
    }
}

/// Matcher for substring containment.
#[derive(Debug, Clone)]
pub struct ContainsSubstring {
    substring: String,
}

impl Matcher<str> for ContainsSubstring {
    fn matches(&self, value: &str) -> bool {
        value.contains(&self.substring)
    }

    fn describe(&self) -> String {
        format!("contains {:?}", self.substring)
    }

    fn describe_mismatch(&self, value: &str) -> String {
        format!("{:?} does not contain {:?}", value, self.substring)
    }
}

impl Matcher<String> for ContainsSubstring {
    fn matches(&self, value: &String) -> bool {
        Matcher::<str>::matches(self, value)
    }

    fn describe(&self) -> String {
        Matcher::<str>::describe(self)
    }

    fn describe_mismatch(&self, value: &String) -> String {
        Matcher::<str>::describe_mismatch(self, value)
    }
}

/// Matches strings made of exactly `count` whitespace-separated fields.
///
/// An empty or all-whitespace string has zero fields.
pub fn has_field_count(count: usize) -> FieldCount {
    FieldCount { count }
}

/// Matcher for the number of whitespace-separated fields in a string.
#[derive(Debug, Clone, Copy)]
pub struct FieldCount {
    count: usize,
}

impl Matcher<str> for FieldCount {
    fn matches(&self, value: &str) -> bool {
        value.split_whitespace().count() == self.count
    }

    fn describe(&self) -> String {
        format!("has exactly {} whitespace-separated field(s)", self.count)
    }

    fn describe_mismatch(&self, value: &str) -> String {
        format!(
            "{:?} has {} field(s), not {}",
            value,
            value.split_whitespace().count(),
            self.count
        )
    }
}

impl Matcher<String> for FieldCount {
    fn matches(&self, value: &String) -> bool {
        Matcher::<str>::matches(self, value)
    }

    fn describe(&self) -> String {
        Matcher::<str>::describe(self)
    }

    fn describe_mismatch(&self, value: &String) -> String {
        Matcher::<str>::describe_mismatch(self, value)
    }
}

// =============================================================================
// Booleans and ad-hoc predicates
// =============================================================================

/// Matches `true`.
pub fn is_true() -> IsTrue {
    IsTrue
}

/// Matcher for boolean truthiness.
#[derive(Debug, Clone, Copy)]
pub struct IsTrue;

impl Matcher<bool> for IsTrue {
    fn matches(&self, value: &bool) -> bool {
        *value
    }

    fn describe(&self) -> String {
        "is true".to_string()
    }

    fn describe_mismatch(&self, _value: &bool) -> String {
        "value is false".to_string()
    }
}

/// Wraps a closure as a matcher, with `description` used in diagnostics.
///
/// ```rust
/// use rancher_upgrade_check::matcher::{satisfies, Matcher};
///
/// let even = satisfies("is even", |n: &u32| n % 2 == 0);
/// assert!(even.matches(&4));
/// assert!(!even.matches(&3));
/// ```
pub fn satisfies<F>(description: &str, predicate: F) -> Satisfies<F> {
    Satisfies {
        description: description.to_string(),
        predicate,
    }
}

/// Matcher backed by a closure.
#[derive(Clone)]
pub struct Satisfies<F> {
    description: String,
    predicate: F,
}

impl<T: Debug + ?Sized, F: Fn(&T) -> bool> Matcher<T> for Satisfies<F> {
    fn matches(&self, value: &T) -> bool {
        (self.predicate)(value)
    }

    fn describe(&self) -> String {
        self.description.clone()
    }

    fn describe_mismatch(&self, value: &T) -> String {
        format!("{:?} does not satisfy: {}", value, self.description)
    }
}

#[cfg(test)]
#[path = "matcher_tests.rs"]
mod matcher_tests;
