// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common test utilities for integration tests
//!
//! Provides shell-script stand-ins for `kubectl` and `helm` so the real command
//! runners can be exercised without a cluster.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Image reported before the fake upgrade
pub const OLD_IMAGE: &str = "rancher/rancher:v2.8.5";

/// Image reported after the fake upgrade
pub const NEW_IMAGE: &str = "rancher/rancher:v2.9.1";

/// Fake `kubectl` and `helm` binaries in a temporary directory.
///
/// Every invocation appends its arguments to `<tool>.log`.
pub struct FakeTools {
    dir: TempDir,
    pub kubectl: PathBuf,
    pub helm: PathBuf,
}

impl FakeTools {
    /// A cluster whose Rancher image changes after the first image query.
    pub fn upgrading() -> Self {
        Self::new(NEW_IMAGE, 0)
    }

    /// A cluster whose Rancher image never changes.
    pub fn stuck() -> Self {
        Self::new(OLD_IMAGE, 0)
    }

    /// An upgrading cluster whose `helm` always fails.
    pub fn with_failing_helm() -> Self {
        Self::new(NEW_IMAGE, 1)
    }

    fn new(image_after: &str, helm_exit: i32) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let root = dir.path().display().to_string();

        fs::write(dir.path().join("pods.json"), pods_json()).expect("write pods.json");

        let kubectl = write_script(
            dir.path(),
            "kubectl",
            &format!(
                r#"#!/bin/sh
echo "$*" >> "{root}/kubectl.log"
case "$*" in
  *"rollout"*)
    echo 'deployment "rancher" successfully rolled out' ;;
  *"jsonpath"*)
    n=$(cat "{root}/images.count" 2>/dev/null || echo 0)
    n=$((n + 1))
    echo "$n" > "{root}/images.count"
    if [ "$n" -le 1 ]; then printf '{OLD_IMAGE}'; else printf '{image_after}'; fi ;;
  *"-o json")
    cat "{root}/pods.json" ;;
  *)
    echo "error: unknown command \"$*\"" >&2
    exit 1 ;;
esac
"#
            ),
        );

        let helm = write_script(
            dir.path(),
            "helm",
            &format!(
                r#"#!/bin/sh
echo "$*" >> "{root}/helm.log"
if [ {helm_exit} -ne 0 ]; then
  echo "Error: Kubernetes cluster unreachable" >&2
  exit {helm_exit}
fi
echo "ok"
"#
            ),
        );

        Self { dir, kubectl, helm }
    }

    /// Path to a kubeconfig file that the fakes ignore.
    pub fn kubeconfig(&self) -> PathBuf {
        self.dir.path().join("kubeconfig")
    }

    /// Argument lines `tool` was invoked with, in order.
    pub fn calls(&self, tool: &str) -> Vec<String> {
        fs::read_to_string(self.dir.path().join(format!("{tool}.log")))
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).expect("write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod script");
    path
}

fn pods_json() -> String {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "List",
        "items": [{
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": { "name": "rancher-7d9f6c5b4-x2x8k" },
            "status": {
                "phase": "Running",
                "conditions": [{ "type": "Ready", "status": "True" }]
            }
        }]
    })
    .to_string()
}
