// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # rancher-upgrade-check - Rancher Manager upgrade verification
//!
//! Upgrades Rancher Manager on a live Kubernetes cluster and verifies that the
//! upgrade took effect, using `kubectl` and `helm` as the only interface to the
//! cluster.
//!
//! ## Overview
//!
//! Every wait in the upgrade is expressed with two building blocks:
//!
//! - a [`poll::Poller`] that repeats a check at a fixed interval until a
//!   deadline, and
//! - a [`matcher::Matcher`] that decides whether an observed value is the one
//!   being waited for.
//!
//! The [`assertion`] layer turns poll outcomes into pass/fail results with a
//! diagnostic, and [`scenario::UpgradeScenario`] strings the waits together.
//!
//! ## Modules
//!
//! - [`clock`] - Time source used by the poll engine
//! - [`poll`] - Poll-until-condition engine
//! - [`matcher`] - Predicates over observed values
//! - [`assertion`] - Pass/fail results over poll outcomes
//! - [`kubectl`] - `kubectl` and `helm` command runners
//! - [`cluster`] - Cluster observations (images, rollout, pod health)
//! - [`deploy`] - Helm deployment of Rancher Manager
//! - [`config`] - Layered scenario configuration
//! - [`scenario`] - The upgrade scenario itself
//!
//! ## Example
//!
//! ```rust,no_run
//! use rancher_upgrade_check::config::ScenarioConfig;
//! use rancher_upgrade_check::deploy::HelmDeployer;
//! use rancher_upgrade_check::kubectl::CliTool;
//! use rancher_upgrade_check::poll::Poller;
//! use rancher_upgrade_check::scenario::UpgradeScenario;
//!
//! let mut config = ScenarioConfig::default();
//! config.rancher.hostname = "rancher.example.test".to_string();
//! let plan = config.plan()?;
//!
//! let scenario = UpgradeScenario::new(
//!     CliTool::kubectl(),
//!     HelmDeployer::new(CliTool::helm()),
//!     Poller::new(),
//!     plan,
//! );
//! let report = scenario.run()?;
//! println!("{report}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod assertion;
pub mod clock;
pub mod cluster;
pub mod config;
pub mod constants;
pub mod deploy;
pub mod errors;
pub mod kubectl;
pub mod matcher;
pub mod poll;
pub mod scenario;

#[cfg(test)]
mod test_support;
