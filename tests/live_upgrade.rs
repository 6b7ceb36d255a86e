// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Rancher Manager upgrade against a live cluster
//!
//! Needs `kubectl` and `helm` on `PATH`, a reachable cluster running Rancher
//! Manager, and `RANCHER_HOSTNAME` set. The usual `RANCHER_UPGRADE_*`,
//! `CA_TYPE`, `PROXY` and `TIMEOUT_SCALE` variables are honoured.
//!
//! Run with: cargo test --test live_upgrade -- --ignored

use rancher_upgrade_check::config::{Overrides, ScenarioConfig};
use rancher_upgrade_check::constants::{
    ENV_CA_TYPE, ENV_PROXY, ENV_RANCHER_HOSTNAME, ENV_RANCHER_UPGRADE_CHANNEL,
    ENV_RANCHER_UPGRADE_HEAD_VERSION, ENV_RANCHER_UPGRADE_VERSION, ENV_TIMEOUT_SCALE,
};
use rancher_upgrade_check::deploy::HelmDeployer;
use rancher_upgrade_check::kubectl::{args, CliTool, CommandRunner};
use rancher_upgrade_check::poll::Poller;
use rancher_upgrade_check::scenario::UpgradeScenario;
use std::env;

/// Skip unless a cluster is reachable and a hostname is configured
fn cluster_or_skip() -> Option<String> {
    let Ok(hostname) = env::var(ENV_RANCHER_HOSTNAME) else {
        eprintln!("⊘ Skipping live upgrade test: {ENV_RANCHER_HOSTNAME} is not set");
        return None;
    };

    match CliTool::kubectl().run(&args(&["cluster-info"])) {
        Ok(_) => {
            println!("✓ Successfully connected to Kubernetes cluster");
            Some(hostname)
        }
        Err(e) => {
            eprintln!("⊘ Skipping live upgrade test: cluster not reachable: {e}");
            None
        }
    }
}

#[test]
#[ignore = "requires a live cluster running Rancher Manager"]
fn test_rancher_manager_upgrade() {
    let Some(hostname) = cluster_or_skip() else {
        return;
    };

    let config = Overrides {
        hostname: Some(hostname),
        channel: env::var(ENV_RANCHER_UPGRADE_CHANNEL).ok(),
        version: env::var(ENV_RANCHER_UPGRADE_VERSION).ok(),
        head_version: env::var(ENV_RANCHER_UPGRADE_HEAD_VERSION).ok(),
        ca: env::var(ENV_CA_TYPE).ok(),
        proxy: env::var(ENV_PROXY).ok(),
        timeout_scale: env::var(ENV_TIMEOUT_SCALE).ok().and_then(|s| s.parse().ok()),
        ..Overrides::default()
    }
    .apply(ScenarioConfig::default());
    let plan = config.plan().expect("valid configuration");

    let report = UpgradeScenario::new(
        CliTool::kubectl(),
        HelmDeployer::new(CliTool::helm()),
        Poller::new(),
        plan,
    )
    .run()
    .unwrap_or_else(|e| panic!("upgrade check failed: {e}"));

    println!("✓ Rancher Manager upgraded");
    println!("{report}");
}
