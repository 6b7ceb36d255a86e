// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Deployment collaborator that triggers the Rancher Manager upgrade.
//!
//! The upgrade scenario does not trust the result of the deployment call: a
//! Helm upgrade can report success while the rollout later fails, and can
//! report failure on a transient hiccup while the rollout succeeds. The
//! scenario therefore logs the result and judges the upgrade only by the
//! rollout and pod checks that follow.

use crate::constants::{
    CATTLE_SYSTEM_NAMESPACE, COMMUNITY_CHART_REPO_BASE, PRIME_CHART_REPO, RANCHER_DEPLOYMENT,
    RANCHER_NO_PROXY, RANCHER_PROXY_URL,
};
use crate::kubectl::{args, CommandRunner};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Target of a Rancher Manager deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RancherRelease {
    /// Hostname Rancher Manager is served on
    pub hostname: String,
    /// Chart channel: `stable`, `latest`, `alpha` or `prime`
    pub channel: String,
    /// Chart version, `latest`, or `devel`
    pub version: String,
    /// Head version used to pick the image tag when `version` is `devel`
    pub head_version: String,
    /// Certificate authority type; `private` enables a private CA
    pub ca: String,
    /// Proxy mode; `rancher` puts Rancher Manager behind a proxy
    pub proxy: String,
}

impl Default for RancherRelease {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            channel: "stable".to_string(),
            version: "latest".to_string(),
            head_version: String::new(),
            ca: "None".to_string(),
            proxy: "None".to_string(),
        }
    }
}

/// Something that can deploy or upgrade Rancher Manager.
pub trait Deployer {
    /// Deploy `release`.
    ///
    /// # Errors
    ///
    /// Returns an error if the deployment could not be requested.
    fn deploy(&self, release: &RancherRelease) -> Result<()>;
}

impl<D: Deployer + ?Sized> Deployer for &D {
    fn deploy(&self, release: &RancherRelease) -> Result<()> {
        (**self).deploy(release)
    }
}

/// Chart repository URL for `channel`.
///
/// # Errors
///
/// Returns an error for unknown channels.
pub fn chart_repository(channel: &str) -> Result<String> {
    match channel {
        "stable" | "latest" | "alpha" => Ok(format!("{COMMUNITY_CHART_REPO_BASE}/{channel}")),
        "prime" => Ok(PRIME_CHART_REPO.to_string()),
        other => bail!("unknown Rancher chart channel '{other}'"),
    }
}

/// Arguments of the `helm upgrade --install` call for `release`.
#[must_use]
pub fn upgrade_args(release: &RancherRelease) -> Vec<String> {
    let repo_name = format!("rancher-{}", release.channel);

    let mut flags = args(&[
        "upgrade",
        "--install",
        RANCHER_DEPLOYMENT,
        &format!("{repo_name}/rancher"),
        "--namespace",
        CATTLE_SYSTEM_NAMESPACE,
        "--create-namespace",
        "--set",
        &format!("hostname={}", release.hostname),
        "--set",
        "replicas=1",
        "--set",
        "global.cattle.psp.enabled=false",
    ]);

    match release.version.as_str() {
        "" | "latest" => {}
        "devel" => flags.extend(args(&[
            "--devel",
            "--set",
            &format!("rancherImageTag=v{}-head", release.head_version),
        ])),
        version if version.contains("-rc") => {
            flags.extend(args(&["--devel", "--version", version]));
        }
        version => flags.extend(args(&["--version", version])),
    }

    if release.ca == "private" {
        flags.extend(args(&[
            "--set",
            "ingress.tls.source=secret",
            "--set",
            "privateCA=true",
        ]));
    }

    if release.proxy == "rancher" {
        flags.extend(args(&[
            "--set",
            &format!("proxy={RANCHER_PROXY_URL}"),
            "--set",
            &format!("noProxy={RANCHER_NO_PROXY}"),
        ]));
    }

    flags
}

/// Deploys Rancher Manager with the `helm` command line.
#[derive(Debug, Clone)]
pub struct HelmDeployer<R> {
    helm: R,
}

impl<R: CommandRunner> HelmDeployer<R> {
    /// Deployer driving `helm`.
    pub fn new(helm: R) -> Self {
        Self { helm }
    }
}

impl<R: CommandRunner> Deployer for HelmDeployer<R> {
    fn deploy(&self, release: &RancherRelease) -> Result<()> {
        let repo_name = format!("rancher-{}", release.channel);
        let repo_url = chart_repository(&release.channel)?;

        info!(
            channel = %release.channel,
            version = %release.version,
            hostname = %release.hostname,
            "Deploying Rancher Manager"
        );

        self.helm
            .run(&args(&["repo", "add", &repo_name, &repo_url]))
            .with_context(|| format!("adding chart repository {repo_url}"))?;
        self.helm
            .run(&args(&["repo", "update"]))
            .context("updating chart repositories")?;
        self.helm
            .run(&upgrade_args(release))
            .context("upgrading the rancher release")?;

        Ok(())
    }
}

#[cfg(test)]
#[path = "deploy_tests.rs"]
mod deploy_tests;
