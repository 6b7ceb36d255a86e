// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cluster state observations made through `kubectl`.
//!
//! Each function here is a single observation, meant to be used as the check
//! of a polling loop:
//!
//! - [`container_images`] - images of every container of the selected pods
//! - [`rollout_status`] - `kubectl rollout status` text for a deployment
//! - [`check_pods`] - readiness of the pods behind a list of label selectors
//!
//! A failed `kubectl` call is returned as a [`CommandError`]; an observation
//! of an unhealthy cluster is a successful call with an unhealthy value.

use crate::constants::{
    CATTLE_SYSTEM_NAMESPACE, CONTAINER_IMAGES_JSONPATH, FLEET_AGENT_SELECTOR,
    FLEET_LOCAL_NAMESPACE, RANCHER_SELECTOR, RANCHER_WEBHOOK_SELECTOR,
};
use crate::errors::CommandError;
use crate::kubectl::{args, CommandRunner};
use crate::matcher::Matcher;
use k8s_openapi::api::core::v1::Pod;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Phase of a pod whose containers all terminated successfully
const PHASE_SUCCEEDED: &str = "Succeeded";

/// Phase of a pod bound to a node with at least one container running
const PHASE_RUNNING: &str = "Running";

/// Pod condition type reporting readiness
const CONDITION_READY: &str = "Ready";

/// A namespace plus a label selector, identifying a set of pods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSelector {
    /// Namespace to look in
    pub namespace: String,
    /// Label selector, as passed to `kubectl -l`
    pub label_selector: String,
}

impl PodSelector {
    /// Creates a selector.
    pub fn new(namespace: impl Into<String>, label_selector: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            label_selector: label_selector.into(),
        }
    }

    /// Rancher Manager server pods.
    #[must_use]
    pub fn rancher() -> Self {
        Self::new(CATTLE_SYSTEM_NAMESPACE, RANCHER_SELECTOR)
    }
}

impl fmt::Display for PodSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.namespace, self.label_selector)
    }
}

/// Pods that must be healthy after a Rancher Manager upgrade.
#[must_use]
pub fn rancher_manager_pods() -> Vec<PodSelector> {
    vec![
        PodSelector::new(CATTLE_SYSTEM_NAMESPACE, RANCHER_SELECTOR),
        PodSelector::new(FLEET_LOCAL_NAMESPACE, FLEET_AGENT_SELECTOR),
        PodSelector::new(CATTLE_SYSTEM_NAMESPACE, RANCHER_WEBHOOK_SELECTOR),
    ]
}

/// Images of every container of the selected pods, space separated.
///
/// # Errors
///
/// Returns [`CommandError`] if `kubectl` fails.
pub fn container_images<R>(runner: &R, selector: &PodSelector) -> Result<String, CommandError>
where
    R: CommandRunner + ?Sized,
{
    runner.run(&args(&[
        "get",
        "pod",
        "--namespace",
        &selector.namespace,
        "-l",
        &selector.label_selector,
        "-o",
        CONTAINER_IMAGES_JSONPATH,
    ]))
}

/// Output of `kubectl rollout status` for a deployment.
///
/// # Errors
///
/// Returns [`CommandError`] if `kubectl` fails, which includes the rollout
/// having exceeded its progress deadline.
pub fn rollout_status<R>(
    runner: &R,
    namespace: &str,
    deployment: &str,
) -> Result<String, CommandError>
where
    R: CommandRunner + ?Sized,
{
    runner.run(&args(&[
        "rollout",
        "--namespace",
        namespace,
        "status",
        &format!("deployment/{deployment}"),
    ]))
}

#[derive(Debug, Deserialize)]
struct PodListOutput {
    #[serde(default)]
    items: Vec<Pod>,
}

/// Pods matched by `selector`.
///
/// # Errors
///
/// Returns [`CommandError`] if `kubectl` fails or prints something that is not
/// a pod list.
pub fn list_pods<R>(runner: &R, selector: &PodSelector) -> Result<Vec<Pod>, CommandError>
where
    R: CommandRunner + ?Sized,
{
    let command = args(&[
        "get",
        "pod",
        "--namespace",
        &selector.namespace,
        "-l",
        &selector.label_selector,
        "-o",
        "json",
    ]);
    let output = runner.run(&command)?;

    let list: PodListOutput = serde_json::from_str(&output).map_err(|e| {
        CommandError::decode(format!("kubectl {}", command.join(" ")), e.to_string())
    })?;
    Ok(list.items)
}

/// Why a pod is not healthy, or `None` if it is.
///
/// A pod is healthy when it has completed (`Succeeded`), or when it is
/// `Running` and its `Ready` condition is `True`.
#[must_use]
pub fn pod_problem(pod: &Pod) -> Option<String> {
    let Some(status) = pod.status.as_ref() else {
        return Some("no status reported".to_string());
    };
    let phase = status.phase.as_deref().unwrap_or("Unknown");

    if phase == PHASE_SUCCEEDED {
        return None;
    }
    if phase != PHASE_RUNNING {
        return Some(format!("phase is {phase}"));
    }

    let ready = status
        .conditions
        .as_ref()
        .and_then(|conditions| conditions.iter().find(|c| c.type_ == CONDITION_READY));

    match ready {
        Some(condition) if condition.status == "True" => None,
        Some(condition) => Some(format!(
            "not ready ({})",
            condition.reason.as_deref().unwrap_or("no reason given")
        )),
        None => Some("no Ready condition reported".to_string()),
    }
}

/// Readiness of the pods behind one or more selectors.
///
/// The default value has checked nothing and is therefore not healthy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodHealth {
    /// Number of selectors that were checked
    pub selectors_checked: usize,
    /// Healthy pods, as `namespace/name`
    pub healthy: Vec<String>,
    /// One line per unhealthy pod or empty selector
    pub problems: Vec<String>,
}

impl PodHealth {
    /// Whether something was checked and nothing is wrong.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.selectors_checked > 0 && self.problems.is_empty()
    }
}

/// Observe the readiness of every pod behind `selectors`.
///
/// A selector matching no pods counts as a problem. Stops at the first
/// `kubectl` failure.
///
/// # Errors
///
/// Returns [`CommandError`] if listing any selector fails.
pub fn check_pods<R>(runner: &R, selectors: &[PodSelector]) -> Result<PodHealth, CommandError>
where
    R: CommandRunner + ?Sized,
{
    let mut health = PodHealth::default();

    for selector in selectors {
        let pods = list_pods(runner, selector)?;
        health.selectors_checked += 1;

        if pods.is_empty() {
            health.problems.push(format!("no pods match {selector}"));
            continue;
        }

        for pod in &pods {
            let name = format!(
                "{}/{}",
                selector.namespace,
                pod.metadata.name.as_deref().unwrap_or("<unnamed>")
            );
            match pod_problem(pod) {
                None => health.healthy.push(name),
                Some(problem) => health.problems.push(format!("{name}: {problem}")),
            }
        }
    }

    debug!(
        selectors = health.selectors_checked,
        healthy = health.healthy.len(),
        problems = health.problems.len(),
        "Checked pod health"
    );
    Ok(health)
}

/// Matches a [`PodHealth`] with every selected pod healthy.
#[must_use]
pub fn all_pods_healthy() -> AllPodsHealthy {
    AllPodsHealthy
}

/// Matcher for [`PodHealth::is_healthy`].
#[derive(Debug, Clone, Copy)]
pub struct AllPodsHealthy;

impl Matcher<PodHealth> for AllPodsHealthy {
    fn matches(&self, value: &PodHealth) -> bool {
        value.is_healthy()
    }

    fn describe(&self) -> String {
        "all selected pods running and ready".to_string()
    }

    fn describe_mismatch(&self, value: &PodHealth) -> String {
        if value.selectors_checked == 0 {
            return "no selectors were checked".to_string();
        }
        value.problems.join("; ")
    }
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod cluster_tests;
