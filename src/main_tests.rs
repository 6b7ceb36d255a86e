// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `main.rs` - command line parsing

#[cfg(test)]
mod tests {
    use super::super::{Cli, OutputFormat};
    use clap::{CommandFactory, Parser};
    use std::path::PathBuf;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "rancher-upgrade-check",
            "--hostname",
            "rancher.example.test",
            "--channel",
            "prime",
            "--upgrade-version",
            "2.9.1",
            "--kubectl",
            "/opt/bin/kubectl",
            "--timeout-scale",
            "2",
            "--skip-deploy",
            "--output",
            "json",
        ])
        .unwrap();

        let overrides = cli.overrides();

        assert_eq!(overrides.hostname.as_deref(), Some("rancher.example.test"));
        assert_eq!(overrides.channel.as_deref(), Some("prime"));
        assert_eq!(overrides.version.as_deref(), Some("2.9.1"));
        assert_eq!(overrides.kubectl, Some(PathBuf::from("/opt/bin/kubectl")));
        assert_eq!(overrides.timeout_scale, Some(2));
        assert!(overrides.skip_deploy);
        assert_eq!(cli.output, OutputFormat::Json);
    }

    #[test]
    fn test_kubeconfig_list_in_environment_is_left_to_the_tools() {
        std::env::set_var("KUBECONFIG", "/etc/kube/a.yaml:/etc/kube/b.yaml");

        let cli = Cli::try_parse_from(["rancher-upgrade-check"]).unwrap();

        assert!(cli.kubeconfig.is_none());
        assert!(cli.overrides().kubeconfig.is_none());
    }

    #[test]
    fn test_explicit_kubeconfig_flag_is_used() {
        let cli =
            Cli::try_parse_from(["rancher-upgrade-check", "--kubeconfig", "/etc/kube/a.yaml"])
                .unwrap();

        assert_eq!(cli.kubeconfig, Some(PathBuf::from("/etc/kube/a.yaml")));
    }

    #[test]
    fn test_unknown_output_format_is_rejected() {
        let result = Cli::try_parse_from(["rancher-upgrade-check", "--output", "yaml"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_non_numeric_timeout_scale_is_rejected() {
        let result = Cli::try_parse_from(["rancher-upgrade-check", "--timeout-scale", "twice"]);
        assert!(result.is_err());
    }
}
