// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the upgrade check.
//!
//! This module contains the namespaces, selectors, command fragments and default
//! timings used by the upgrade scenario. Constants are organized by category.

// ============================================================================
// Rancher Manager Workload Constants
// ============================================================================

/// Namespace holding the Rancher Manager deployment and its webhook
pub const CATTLE_SYSTEM_NAMESPACE: &str = "cattle-system";

/// Namespace holding the local Fleet agent
pub const FLEET_LOCAL_NAMESPACE: &str = "cattle-fleet-local-system";

/// Label selector for Rancher Manager server pods
pub const RANCHER_SELECTOR: &str = "app=rancher";

/// Label selector for the Fleet agent pods
pub const FLEET_AGENT_SELECTOR: &str = "app=fleet-agent";

/// Label selector for the Rancher webhook pods
pub const RANCHER_WEBHOOK_SELECTOR: &str = "app=rancher-webhook";

/// Name of the Rancher Manager deployment (and Helm release)
pub const RANCHER_DEPLOYMENT: &str = "rancher";

/// Jsonpath listing every container image of the selected pods, space separated
pub const CONTAINER_IMAGES_JSONPATH: &str =
    "jsonpath={.items[*].status.containerStatuses[*].image}";

/// Substring `kubectl rollout status` prints once a rollout has completed
pub const ROLLOUT_SUCCESS_MARKER: &str = "successfully rolled out";

// ============================================================================
// Helm Chart Constants
// ============================================================================

/// Chart repository base for community channels (`stable`, `latest`, `alpha`)
pub const COMMUNITY_CHART_REPO_BASE: &str = "https://releases.rancher.com/server-charts";

/// Chart repository for the `prime` channel
pub const PRIME_CHART_REPO: &str = "https://charts.rancher.com/server-charts/prime";

/// Proxy used when Rancher Manager is deployed behind a proxy
pub const RANCHER_PROXY_URL: &str = "http://my.proxy:3128";

/// Destinations that bypass the proxy (commas escaped for `helm --set`)
pub const RANCHER_NO_PROXY: &str =
    "127.0.0.0/8\\,10.0.0.0/8\\,cattle-system.svc\\,172.16.0.0/12\\,192.168.0.0/16\\,.svc\\,.cluster.local";

// ============================================================================
// Poll Timing Defaults
// ============================================================================

/// Rollout wait timeout (4 minutes)
pub const ROLLOUT_TIMEOUT_SECS: u64 = 240;

/// Rollout wait interval (30 seconds)
pub const ROLLOUT_INTERVAL_MILLIS: u64 = 30_000;

/// Pod health wait timeout (3 minutes)
pub const POD_HEALTH_TIMEOUT_SECS: u64 = 180;

/// Pod health wait interval (10 seconds)
pub const POD_HEALTH_INTERVAL_MILLIS: u64 = 10_000;

/// Single image version wait timeout (3 minutes)
pub const IMAGE_CONVERGENCE_TIMEOUT_SECS: u64 = 180;

/// Single image version wait interval (10 seconds)
pub const IMAGE_CONVERGENCE_INTERVAL_MILLIS: u64 = 10_000;

/// Default multiplier applied to every poll timeout
pub const DEFAULT_TIMEOUT_SCALE: u32 = 1;

// ============================================================================
// Environment Variables
// ============================================================================

/// Hostname Rancher Manager is served on
pub const ENV_RANCHER_HOSTNAME: &str = "RANCHER_HOSTNAME";

/// Helm channel to upgrade from (`stable`, `latest`, `alpha`, `prime`)
pub const ENV_RANCHER_UPGRADE_CHANNEL: &str = "RANCHER_UPGRADE_CHANNEL";

/// Chart version to upgrade to
pub const ENV_RANCHER_UPGRADE_VERSION: &str = "RANCHER_UPGRADE_VERSION";

/// Head version used when the upgrade version is `devel`
pub const ENV_RANCHER_UPGRADE_HEAD_VERSION: &str = "RANCHER_UPGRADE_HEAD_VERSION";

/// Certificate authority type (`private` or anything else)
pub const ENV_CA_TYPE: &str = "CA_TYPE";

/// Proxy mode (`rancher` or anything else)
pub const ENV_PROXY: &str = "PROXY";

/// Multiplier applied to every poll timeout, for slow environments
pub const ENV_TIMEOUT_SCALE: &str = "TIMEOUT_SCALE";

/// Output format for logs (`json` or `text`)
pub const ENV_LOG_FORMAT: &str = "RUST_LOG_FORMAT";
