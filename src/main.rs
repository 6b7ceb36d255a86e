// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rancher_upgrade_check::{
    config::{Overrides, ScenarioConfig, ToolsConfig},
    constants::{
        ENV_CA_TYPE, ENV_LOG_FORMAT, ENV_PROXY, ENV_RANCHER_HOSTNAME,
        ENV_RANCHER_UPGRADE_CHANNEL, ENV_RANCHER_UPGRADE_HEAD_VERSION,
        ENV_RANCHER_UPGRADE_VERSION, ENV_TIMEOUT_SCALE,
    },
    deploy::HelmDeployer,
    kubectl::CliTool,
    poll::Poller,
    scenario::UpgradeScenario,
};
use std::path::PathBuf;
use tracing::{debug, error, info};

/// How the final report is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Upgrade Rancher Manager and verify that the upgrade took effect.
#[derive(Debug, Parser)]
#[command(name = "rancher-upgrade-check", version, about)]
struct Cli {
    /// YAML configuration file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Hostname Rancher Manager is served on
    #[arg(long, env = ENV_RANCHER_HOSTNAME)]
    hostname: Option<String>,

    /// Chart channel to upgrade from (stable, latest, alpha, prime)
    #[arg(long, env = ENV_RANCHER_UPGRADE_CHANNEL)]
    channel: Option<String>,

    /// Chart version to upgrade to (a version, "latest" or "devel")
    #[arg(long, env = ENV_RANCHER_UPGRADE_VERSION)]
    upgrade_version: Option<String>,

    /// Head version used for the image tag when upgrading to "devel"
    #[arg(long, env = ENV_RANCHER_UPGRADE_HEAD_VERSION)]
    head_version: Option<String>,

    /// Certificate authority type ("private" enables a private CA)
    #[arg(long, env = ENV_CA_TYPE)]
    ca: Option<String>,

    /// Proxy mode ("rancher" deploys Rancher Manager behind a proxy)
    #[arg(long, env = ENV_PROXY)]
    proxy: Option<String>,

    /// kubectl binary
    #[arg(long)]
    kubectl: Option<PathBuf>,

    /// helm binary
    #[arg(long)]
    helm: Option<PathBuf>,

    /// Kubeconfig used by kubectl and helm (otherwise they read `KUBECONFIG`)
    #[arg(long)]
    kubeconfig: Option<PathBuf>,

    /// Kubeconfig context used by kubectl and helm
    #[arg(long)]
    context: Option<String>,

    /// Multiply every wait timeout by this factor
    #[arg(long, env = ENV_TIMEOUT_SCALE)]
    timeout_scale: Option<u32>,

    /// Only verify; assume the upgrade was triggered elsewhere
    #[arg(long)]
    skip_deploy: bool,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            hostname: self.hostname.clone(),
            channel: self.channel.clone(),
            version: self.upgrade_version.clone(),
            head_version: self.head_version.clone(),
            ca: self.ca.clone(),
            proxy: self.proxy.clone(),
            kubectl: self.kubectl.clone(),
            helm: self.helm.clone(),
            kubeconfig: self.kubeconfig.clone(),
            context: self.context.clone(),
            timeout_scale: self.timeout_scale,
            skip_deploy: self.skip_deploy,
        }
    }
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    debug!(?cli, "Parsed command line");

    let config = ScenarioConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let config = cli.overrides().apply(config);
    let plan = config.plan().context("invalid configuration")?;

    let tools = &config.tools;
    let kubectl = pin(CliTool::kubectl().with_binary(tools.kubectl.clone()), tools);
    let helm = pin(CliTool::helm().with_binary(tools.helm.clone()), tools);

    info!(
        hostname = %plan.release.hostname,
        channel = %plan.release.channel,
        version = %plan.release.version,
        skip_deploy = plan.skip_deploy,
        "Starting Rancher Manager upgrade check"
    );

    let scenario = UpgradeScenario::new(kubectl, HelmDeployer::new(helm), Poller::new(), plan);
    let report = match scenario.run() {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Rancher Manager upgrade check failed");
            return Err(e.into());
        }
    };

    match cli.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print!("{report}"),
    }
    Ok(())
}

/// Apply the configured kubeconfig and context to `tool`.
fn pin(mut tool: CliTool, tools: &ToolsConfig) -> CliTool {
    if let Some(kubeconfig) = &tools.kubeconfig {
        tool = tool.with_kubeconfig(kubeconfig.clone());
    }
    if let Some(context) = &tools.context {
        tool = tool.with_context(context.clone());
    }
    tool
}

/// Format: timestamp file:line LEVEL message
///
/// Respects `RUST_LOG` (default `info`) and `RUST_LOG_FORMAT` (`json` or `text`).
/// Logs go to stderr so the report on stdout stays machine readable.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var(ENV_LOG_FORMAT).unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod main_tests;
