// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The Rancher Manager upgrade scenario.
//!
//! # Steps
//!
//! 1. Record the Rancher Manager image(s) currently running.
//! 2. Trigger the upgrade through the [`Deployer`]. Its result is logged and
//!    otherwise ignored; the rollout check is the real verdict.
//! 3. Wait for `kubectl rollout status deployment/rancher` to report success.
//! 4. Wait for the Rancher, Fleet agent and webhook pods to be running and ready.
//! 5. Wait for every Rancher pod to run the same single image.
//! 6. Record the image again and require it to differ from step 1.
//!
//! Steps 3 to 5 tolerate transient `kubectl` failures until their timeout.
//! Steps 1 and 6 are one-shot and fail on the first `kubectl` error.

use crate::assertion::{expect_that, AssertionError, Verified};
use crate::clock::{Clock, SystemClock};
use crate::cluster::{
    all_pods_healthy, check_pods, container_images, rollout_status, PodSelector,
};
use crate::constants::{CATTLE_SYSTEM_NAMESPACE, RANCHER_DEPLOYMENT, ROLLOUT_SUCCESS_MARKER};
use crate::deploy::{Deployer, RancherRelease};
use crate::errors::CommandError;
use crate::kubectl::CommandRunner;
use crate::matcher::{contains_substring, eq, has_field_count, not};
use crate::poll::{PollSpec, Poller};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

// Step names, as they appear in logs and reports

/// Reading the Rancher image before the upgrade
pub const STEP_VERSION_BEFORE: &str = "read version before upgrade";
/// Requesting the upgrade through Helm
pub const STEP_DEPLOY: &str = "deploy upgrade";
/// Waiting for the rancher deployment rollout
pub const STEP_ROLLOUT: &str = "rancher rollout";
/// Waiting for every Rancher Manager pod to be healthy
pub const STEP_POD_HEALTH: &str = "rancher manager pods healthy";
/// Waiting for the rancher pods to run a single image
pub const STEP_SINGLE_IMAGE: &str = "single rancher image";
/// Reading the Rancher image after the upgrade
pub const STEP_VERSION_AFTER: &str = "read version after upgrade";
/// Comparing the images read before and after the upgrade
pub const STEP_VERSION_CHANGED: &str = "rancher version changed by upgrade";

/// Everything the scenario needs, resolved and validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioPlan {
    /// Release to upgrade to
    pub release: RancherRelease,
    /// Pods that must be healthy after the upgrade
    pub pod_selectors: Vec<PodSelector>,
    /// Wait for the deployment rollout
    pub rollout: PollSpec,
    /// Wait for the pods to be healthy
    pub pod_health: PollSpec,
    /// Wait for a single image across Rancher pods
    pub image_convergence: PollSpec,
    /// Only verify; the upgrade is triggered elsewhere
    pub skip_deploy: bool,
}

/// Why the scenario failed.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// A one-shot `kubectl` call failed
    #[error("{step}: {source}")]
    Command {
        /// Step that ran the command
        step: &'static str,
        /// Underlying failure
        #[source]
        source: CommandError,
    },

    /// An expectation was not met
    #[error(transparent)]
    Assertion(#[from] AssertionError),
}

/// Timing of one scenario step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    /// Step name
    pub name: String,
    /// Number of observations made
    pub attempts: u32,
    /// Time spent polling, in milliseconds
    pub elapsed_ms: u64,
}

impl StepReport {
    fn new(name: &str, attempts: u32, elapsed: Duration) -> Self {
        Self {
            name: name.to_string(),
            attempts,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }

    fn polled<T>(name: &str, verified: &Verified<T>) -> Self {
        Self::new(name, verified.attempts, verified.elapsed)
    }
}

/// Result of a successful upgrade run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeReport {
    /// Hostname of the upgraded Rancher Manager
    pub hostname: String,
    /// Channel the upgrade came from
    pub channel: String,
    /// Version that was requested
    pub target_version: String,
    /// Image(s) before the upgrade
    pub version_before: String,
    /// Image after the upgrade
    pub version_after: String,
    /// Whether the deployment step was skipped
    pub deploy_skipped: bool,
    /// Error reported by the deployment step, if any
    pub deploy_error: Option<String>,
    /// When the scenario started
    pub started_at: DateTime<Utc>,
    /// When the scenario finished
    pub finished_at: DateTime<Utc>,
    /// Per-step timing
    pub steps: Vec<StepReport>,
}

impl fmt::Display for UpgradeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rancher Manager upgrade verified on {}", self.hostname)?;
        writeln!(f, "  before: {}", self.version_before.trim())?;
        writeln!(f, "  after:  {}", self.version_after.trim())?;
        if self.deploy_skipped {
            writeln!(f, "  deploy: skipped")?;
        } else if let Some(error) = &self.deploy_error {
            writeln!(f, "  deploy: reported error (ignored): {error}")?;
        }
        for step in &self.steps {
            writeln!(
                f,
                "  {:<36} {:>3} attempt(s) {:>8} ms",
                step.name, step.attempts, step.elapsed_ms
            )?;
        }
        Ok(())
    }
}

/// The upgrade scenario, wired to its collaborators.
pub struct UpgradeScenario<K, D, C = SystemClock> {
    kubectl: K,
    deployer: D,
    poller: Poller<C>,
    plan: ScenarioPlan,
}

impl<K, D, C> UpgradeScenario<K, D, C>
where
    K: CommandRunner,
    D: Deployer,
    C: Clock,
{
    /// Creates the scenario.
    pub fn new(kubectl: K, deployer: D, poller: Poller<C>, plan: ScenarioPlan) -> Self {
        Self {
            kubectl,
            deployer,
            poller,
            plan,
        }
    }

    /// Run every step in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Command`] if a one-shot `kubectl` call fails,
    /// or [`ScenarioError::Assertion`] if a wait times out or the version did
    /// not change.
    pub fn run(&self) -> Result<UpgradeReport, ScenarioError> {
        let started_at = Utc::now();
        let rancher = PodSelector::rancher();
        let mut steps = Vec::new();

        let version_before = container_images(&self.kubectl, &rancher).map_err(|source| {
            ScenarioError::Command {
                step: STEP_VERSION_BEFORE,
                source,
            }
        })?;
        info!(version = %version_before.trim(), "Rancher Manager version before upgrade");
        steps.push(StepReport::new(STEP_VERSION_BEFORE, 1, Duration::ZERO));

        let deploy_error = if self.plan.skip_deploy {
            info!("Skipping deployment, verifying an externally triggered upgrade");
            None
        } else {
            self.deploy()
        };

        let rollout = self.poller.eventually(
            STEP_ROLLOUT,
            &self.plan.rollout,
            || rollout_status(&self.kubectl, CATTLE_SYSTEM_NAMESPACE, RANCHER_DEPLOYMENT),
            &contains_substring(ROLLOUT_SUCCESS_MARKER),
        )?;
        info!(attempts = rollout.attempts, "Rancher Manager rolled out");
        steps.push(StepReport::polled(STEP_ROLLOUT, &rollout));

        let pods = self.poller.eventually(
            STEP_POD_HEALTH,
            &self.plan.pod_health,
            || check_pods(&self.kubectl, &self.plan.pod_selectors),
            &all_pods_healthy(),
        )?;
        info!(pods = pods.value.healthy.len(), "Rancher Manager pods are healthy");
        steps.push(StepReport::polled(STEP_POD_HEALTH, &pods));

        let single = self.poller.eventually(
            STEP_SINGLE_IMAGE,
            &self.plan.image_convergence,
            || container_images(&self.kubectl, &rancher),
            &has_field_count(1),
        )?;
        steps.push(StepReport::polled(STEP_SINGLE_IMAGE, &single));

        let version_after = container_images(&self.kubectl, &rancher).map_err(|source| {
            ScenarioError::Command {
                step: STEP_VERSION_AFTER,
                source,
            }
        })?;
        steps.push(StepReport::new(STEP_VERSION_AFTER, 1, Duration::ZERO));

        expect_that(
            STEP_VERSION_CHANGED,
            &version_after,
            &not(eq(version_before.clone())),
        )?;
        info!(
            before = %version_before.trim(),
            after = %version_after.trim(),
            "Rancher Manager upgrade verified"
        );

        Ok(UpgradeReport {
            hostname: self.plan.release.hostname.clone(),
            channel: self.plan.release.channel.clone(),
            target_version: self.plan.release.version.clone(),
            version_before,
            version_after,
            deploy_skipped: self.plan.skip_deploy,
            deploy_error,
            started_at,
            finished_at: Utc::now(),
            steps,
        })
    }

    /// Trigger the upgrade, returning the error text if the deployer reported one.
    fn deploy(&self) -> Option<String> {
        match self.deployer.deploy(&self.plan.release) {
            Ok(()) => {
                info!(step = STEP_DEPLOY, "Upgrade requested");
                None
            }
            Err(e) => {
                let error = format!("{e:#}");
                warn!(
                    step = STEP_DEPLOY,
                    error = %error,
                    "Deployment reported an error, relying on rollout checks"
                );
                Some(error)
            }
        }
    }
}

#[cfg(test)]
#[path = "scenario_tests.rs"]
mod scenario_tests;
