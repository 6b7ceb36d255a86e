// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Scenario configuration.
//!
//! Settings come from three layers, later layers winning:
//!
//! 1. Built-in defaults (see [`crate::constants`])
//! 2. An optional YAML file
//! 3. Command-line flags and environment variables, as [`Overrides`]
//!
//! # Example
//!
//! ```yaml
//! rancher:
//!   hostname: rancher.example.test
//!   channel: latest
//!   version: 2.9.1
//! tools:
//!   kubeconfig: /home/ci/.kube/config
//! timing:
//!   timeoutScale: 2
//!   rollout:
//!     timeoutSecs: 600
//!     intervalMillis: 15000
//! ```

use crate::cluster::{rancher_manager_pods, PodSelector};
use crate::constants::{
    DEFAULT_TIMEOUT_SCALE, IMAGE_CONVERGENCE_INTERVAL_MILLIS, IMAGE_CONVERGENCE_TIMEOUT_SECS,
    POD_HEALTH_INTERVAL_MILLIS, POD_HEALTH_TIMEOUT_SECS, ROLLOUT_INTERVAL_MILLIS,
    ROLLOUT_TIMEOUT_SECS,
};
use crate::deploy::{chart_repository, RancherRelease};
use crate::errors::ConfigError;
use crate::poll::{CheckErrorPolicy, PollSpec};
use crate::scenario::ScenarioPlan;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Timeout and interval of one wait, as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSettings {
    /// Overall timeout, in seconds
    pub timeout_secs: u64,
    /// Pause between attempts, in milliseconds
    pub interval_millis: u64,
}

impl PollSettings {
    /// Creates poll settings.
    #[must_use]
    pub const fn new(timeout_secs: u64, interval_millis: u64) -> Self {
        Self {
            timeout_secs,
            interval_millis,
        }
    }

    /// Validated [`PollSpec`] with the timeout multiplied by `scale`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming `field` if either value is zero.
    pub fn to_spec(
        &self,
        field: &str,
        scale: u32,
        policy: CheckErrorPolicy,
    ) -> Result<PollSpec, ConfigError> {
        let spec = PollSpec::new(
            Duration::from_secs(self.timeout_secs),
            Duration::from_millis(self.interval_millis),
        )
        .map_err(|e| ConfigError::Invalid {
            field: field.to_string(),
            reason: e.to_string(),
        })?;

        Ok(spec.scaled(scale).with_check_error_policy(policy))
    }
}

/// Timing of every wait in the scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimingConfig {
    /// Wait for the deployment rollout
    pub rollout: PollSettings,
    /// Wait for pod health
    pub pods: PollSettings,
    /// Wait for a single Rancher image
    pub images: PollSettings,
    /// Multiplier applied to every timeout
    pub timeout_scale: u32,
    /// What matchers see when a check fails
    pub on_check_error: CheckErrorPolicy,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            rollout: PollSettings::new(ROLLOUT_TIMEOUT_SECS, ROLLOUT_INTERVAL_MILLIS),
            pods: PollSettings::new(POD_HEALTH_TIMEOUT_SECS, POD_HEALTH_INTERVAL_MILLIS),
            images: PollSettings::new(
                IMAGE_CONVERGENCE_TIMEOUT_SECS,
                IMAGE_CONVERGENCE_INTERVAL_MILLIS,
            ),
            timeout_scale: DEFAULT_TIMEOUT_SCALE,
            on_check_error: CheckErrorPolicy::default(),
        }
    }
}

/// Command-line tools the scenario drives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolsConfig {
    /// `kubectl` binary
    pub kubectl: PathBuf,
    /// `helm` binary
    pub helm: PathBuf,
    /// Kubeconfig passed to both tools
    pub kubeconfig: Option<PathBuf>,
    /// Kubeconfig context passed to both tools
    pub context: Option<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            kubectl: PathBuf::from("kubectl"),
            helm: PathBuf::from("helm"),
            kubeconfig: None,
            context: None,
        }
    }
}

/// Complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScenarioConfig {
    /// Release to upgrade to
    pub rancher: RancherRelease,
    /// External tools
    pub tools: ToolsConfig,
    /// Wait timings
    pub timing: TimingConfig,
    /// Pods that must be healthy after the upgrade
    pub pods: Vec<PodSelector>,
    /// Only verify an upgrade triggered elsewhere
    pub skip_deploy: bool,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            rancher: RancherRelease::default(),
            tools: ToolsConfig::default(),
            timing: TimingConfig::default(),
            pods: rancher_manager_pods(),
            skip_deploy: false,
        }
    }
}

impl ScenarioConfig {
    /// Parse a configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text does not match the schema.
    pub fn from_yaml(path: &Path, text: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, or
    /// [`ConfigError::Parse`] if it is not valid.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded configuration file");
        Self::from_yaml(path, &text)
    }

    /// Defaults, or the contents of `path` if given.
    ///
    /// # Errors
    ///
    /// See [`ScenarioConfig::from_file`].
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Check every setting, then resolve the plan the scenario runs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if no hostname is set, or
    /// [`ConfigError::Invalid`] for zero timings, a zero timeout scale, an
    /// empty pod list or, unless deployment is skipped, an unknown channel.
    pub fn plan(&self) -> Result<ScenarioPlan, ConfigError> {
        if self.rancher.hostname.trim().is_empty() {
            return Err(ConfigError::Missing("rancher.hostname"));
        }

        let timing = &self.timing;
        if timing.timeout_scale == 0 {
            return Err(ConfigError::Invalid {
                field: "timing.timeoutScale".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        if self.pods.is_empty() {
            return Err(ConfigError::Invalid {
                field: "pods".to_string(),
                reason: "at least one pod selector is required".to_string(),
            });
        }

        if !self.skip_deploy {
            chart_repository(&self.rancher.channel).map_err(|e| ConfigError::Invalid {
                field: "rancher.channel".to_string(),
                reason: e.to_string(),
            })?;
        }

        let scale = timing.timeout_scale;
        let policy = timing.on_check_error;
        Ok(ScenarioPlan {
            release: self.rancher.clone(),
            pod_selectors: self.pods.clone(),
            rollout: timing.rollout.to_spec("timing.rollout", scale, policy)?,
            pod_health: timing.pods.to_spec("timing.pods", scale, policy)?,
            image_convergence: timing.images.to_spec("timing.images", scale, policy)?,
            skip_deploy: self.skip_deploy,
        })
    }

    /// Check every setting without building a plan.
    ///
    /// # Errors
    ///
    /// See [`ScenarioConfig::plan`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.plan().map(|_| ())
    }
}

/// Settings given on the command line or in the environment.
///
/// `None` leaves the configured value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// Hostname Rancher Manager is served on
    pub hostname: Option<String>,
    /// Chart channel (stable, latest, alpha, prime)
    pub channel: Option<String>,
    /// Chart version to upgrade to
    pub version: Option<String>,
    /// Image tag used when upgrading to "devel"
    pub head_version: Option<String>,
    /// Certificate authority type
    pub ca: Option<String>,
    /// Proxy mode
    pub proxy: Option<String>,
    /// kubectl binary
    pub kubectl: Option<PathBuf>,
    /// helm binary
    pub helm: Option<PathBuf>,
    /// Kubeconfig passed to both tools
    pub kubeconfig: Option<PathBuf>,
    /// Kubeconfig context passed to both tools
    pub context: Option<String>,
    /// Factor applied to every wait timeout
    pub timeout_scale: Option<u32>,
    /// Verify only; `false` leaves the configured value alone
    pub skip_deploy: bool,
}

impl Overrides {
    /// Layer these overrides on top of `config`.
    #[must_use]
    pub fn apply(self, mut config: ScenarioConfig) -> ScenarioConfig {
        fn set<T>(target: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *target = value;
            }
        }

        let release = &mut config.rancher;
        set(&mut release.hostname, self.hostname);
        set(&mut release.channel, self.channel);
        set(&mut release.version, self.version);
        set(&mut release.head_version, self.head_version);
        set(&mut release.ca, self.ca);
        set(&mut release.proxy, self.proxy);

        let tools = &mut config.tools;
        set(&mut tools.kubectl, self.kubectl);
        set(&mut tools.helm, self.helm);
        if self.kubeconfig.is_some() {
            tools.kubeconfig = self.kubeconfig;
        }
        if self.context.is_some() {
            tools.context = self.context;
        }

        set(&mut config.timing.timeout_scale, self.timeout_scale);
        config.skip_deploy |= self.skip_deploy;
        config
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
