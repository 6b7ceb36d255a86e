// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `cluster.rs`

#[cfg(test)]
mod tests {
    use crate::cluster::*;
    use crate::errors::CommandError;
    use crate::matcher::Matcher;
    use crate::test_support::ScriptedRunner;
    use serde_json::json;

    const RANCHER_PODS: &str = "get pod --namespace cattle-system -l app=rancher -o json";
    const FLEET_PODS: &str =
        "get pod --namespace cattle-fleet-local-system -l app=fleet-agent -o json";
    const WEBHOOK_PODS: &str = "get pod --namespace cattle-system -l app=rancher-webhook -o json";

    fn pod(name: &str, phase: &str, ready: Option<&str>) -> serde_json::Value {
        let mut conditions = Vec::new();
        if let Some(status) = ready {
            conditions.push(json!({
                "type": "Ready",
                "status": status,
                "reason": if status == "True" { serde_json::Value::Null } else { json!("ContainersNotReady") }
            }));
        }

        json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": { "name": name, "namespace": "cattle-system" },
            "status": { "phase": phase, "conditions": conditions }
        })
    }

    fn pod_list(pods: Vec<serde_json::Value>) -> String {
        json!({
            "apiVersion": "v1",
            "kind": "List",
            "metadata": { "resourceVersion": "" },
            "items": pods
        })
        .to_string()
    }

    fn healthy_cluster() -> ScriptedRunner {
        ScriptedRunner::new()
            .ok(
                RANCHER_PODS,
                &pod_list(vec![pod("rancher-7d9f6c5b4-x2x8k", "Running", Some("True"))]),
            )
            .ok(
                FLEET_PODS,
                &pod_list(vec![pod("fleet-agent-0", "Running", Some("True"))]),
            )
            .ok(
                WEBHOOK_PODS,
                &pod_list(vec![pod("rancher-webhook-5c7d8-abcde", "Running", Some("True"))]),
            )
    }

    // ========================================================================
    // Command lines
    // ========================================================================

    #[test]
    fn test_container_images_command() {
        let runner = ScriptedRunner::new().ok(
            "get pod --namespace cattle-system -l app=rancher -o jsonpath={.items[*].status.containerStatuses[*].image}",
            "rancher/rancher:v2.8.5",
        );

        let images = container_images(&runner, &PodSelector::rancher()).unwrap();

        assert_eq!(images, "rancher/rancher:v2.8.5");
    }

    #[test]
    fn test_rollout_status_command() {
        let runner = ScriptedRunner::new().ok(
            "rollout --namespace cattle-system status deployment/rancher",
            "deployment \"rancher\" successfully rolled out\n",
        );

        let status = rollout_status(&runner, "cattle-system", "rancher").unwrap();

        assert!(status.contains("successfully rolled out"));
    }

    #[test]
    fn test_default_selectors_cover_rancher_fleet_and_webhook() {
        let selectors = rancher_manager_pods();
        assert_eq!(selectors.len(), 3);
        assert_eq!(selectors[0], PodSelector::rancher());
        assert_eq!(
            selectors[1],
            PodSelector::new("cattle-fleet-local-system", "app=fleet-agent")
        );
        assert_eq!(selectors[2].label_selector, "app=rancher-webhook");
    }

    // ========================================================================
    // Pod classification
    // ========================================================================

    #[test]
    fn test_running_and_ready_pod_is_healthy() {
        let pod = serde_json::from_value(pod("rancher-0", "Running", Some("True"))).unwrap();
        assert_eq!(pod_problem(&pod), None);
    }

    #[test]
    fn test_succeeded_pod_is_healthy() {
        let pod = serde_json::from_value(pod("helm-operation-abc", "Succeeded", None)).unwrap();
        assert_eq!(pod_problem(&pod), None);
    }

    #[test]
    fn test_running_but_not_ready_pod_reports_reason() {
        let pod = serde_json::from_value(pod("rancher-0", "Running", Some("False"))).unwrap();
        assert_eq!(
            pod_problem(&pod).as_deref(),
            Some("not ready (ContainersNotReady)")
        );
    }

    #[test]
    fn test_pending_pod_reports_phase() {
        let pod = serde_json::from_value(pod("rancher-0", "Pending", None)).unwrap();
        assert_eq!(pod_problem(&pod).as_deref(), Some("phase is Pending"));
    }

    #[test]
    fn test_pod_without_status_is_unhealthy() {
        let pod = serde_json::from_value(json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": { "name": "rancher-0" }
        }))
        .unwrap();
        assert_eq!(pod_problem(&pod).as_deref(), Some("no status reported"));
    }

    // ========================================================================
    // check_pods
    // ========================================================================

    #[test]
    fn test_check_pods_all_healthy() {
        let runner = healthy_cluster();

        let health = check_pods(&runner, &rancher_manager_pods()).unwrap();

        assert!(health.is_healthy());
        assert_eq!(health.selectors_checked, 3);
        assert_eq!(
            health.healthy,
            vec![
                "cattle-system/rancher-7d9f6c5b4-x2x8k",
                "cattle-fleet-local-system/fleet-agent-0",
                "cattle-system/rancher-webhook-5c7d8-abcde",
            ]
        );
        assert!(all_pods_healthy().matches(&health));
    }

    #[test]
    fn test_check_pods_reports_not_ready_pod() {
        let runner = healthy_cluster().ok(
            RANCHER_PODS,
            &pod_list(vec![
                pod("rancher-old", "Running", Some("True")),
                pod("rancher-new", "Running", Some("False")),
            ]),
        );
        // First queued response is consumed by the first call.
        let _ = check_pods(&runner, &rancher_manager_pods()).unwrap();

        let health = check_pods(&runner, &rancher_manager_pods()).unwrap();

        assert!(!health.is_healthy());
        assert_eq!(
            health.problems,
            vec!["cattle-system/rancher-new: not ready (ContainersNotReady)"]
        );
        let mismatch = all_pods_healthy().describe_mismatch(&health);
        assert!(mismatch.contains("rancher-new"));
    }

    #[test]
    fn test_check_pods_flags_selector_without_pods() {
        let runner = ScriptedRunner::new().ok(WEBHOOK_PODS, &pod_list(vec![]));

        let health = check_pods(
            &runner,
            &[PodSelector::new("cattle-system", "app=rancher-webhook")],
        )
        .unwrap();

        assert!(!health.is_healthy());
        assert_eq!(
            health.problems,
            vec!["no pods match cattle-system (app=rancher-webhook)"]
        );
    }

    #[test]
    fn test_check_pods_propagates_kubectl_failure() {
        let runner = ScriptedRunner::new()
            .ok(
                RANCHER_PODS,
                &pod_list(vec![pod("rancher-0", "Running", Some("True"))]),
            )
            .fail(FLEET_PODS, "Unable to connect to the server");

        let err = check_pods(&runner, &rancher_manager_pods()).unwrap_err();

        assert!(matches!(err, CommandError::Failed { .. }));
        assert_eq!(runner.count(WEBHOOK_PODS), 0);
    }

    #[test]
    fn test_check_pods_rejects_garbage_output() {
        let runner = ScriptedRunner::new().ok(RANCHER_PODS, "error: not json");

        let err = check_pods(&runner, &[PodSelector::rancher()]).unwrap_err();

        assert!(matches!(err, CommandError::Decode { .. }));
    }

    #[test]
    fn test_default_pod_health_is_unhealthy() {
        let health = PodHealth::default();
        assert!(!health.is_healthy());
        assert!(!all_pods_healthy().matches(&health));
        assert_eq!(
            all_pods_healthy().describe_mismatch(&health),
            "no selectors were checked"
        );
    }
}
