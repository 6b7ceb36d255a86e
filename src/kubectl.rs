// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command-line collaborators: `kubectl` and `helm`.
//!
//! All communication with the cluster goes through these binaries. The
//! [`CommandRunner`] trait is the seam the rest of the crate depends on, so
//! scenarios can be exercised against scripted output in tests.
//!
//! # Example
//!
//! ```rust,no_run
//! use rancher_upgrade_check::kubectl::{args, CliTool, CommandRunner};
//!
//! # fn example() -> Result<(), rancher_upgrade_check::errors::CommandError> {
//! let kubectl = CliTool::kubectl().with_context("upgrade-test");
//! let nodes = kubectl.run(&args(&["get", "nodes", "-o", "name"]))?;
//! println!("{nodes}");
//! # Ok(())
//! # }
//! ```

use crate::errors::CommandError;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Runs one external command and returns its standard output.
pub trait CommandRunner {
    /// Run the tool with `args`.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] if the binary cannot be started, exits
    /// unsuccessfully, or prints something that is not UTF-8.
    fn run(&self, args: &[String]) -> Result<String, CommandError>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, args: &[String]) -> Result<String, CommandError> {
        (**self).run(args)
    }
}

/// Owned argument list from string slices.
#[must_use]
pub fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| (*s).to_string()).collect()
}

/// Run `program` with `args` and capture stdout.
///
/// Stdout is returned verbatim on success. On a non-zero exit the trimmed
/// stderr is carried in the error.
///
/// # Errors
///
/// See [`CommandRunner::run`].
pub fn run_command(program: &Path, args: &[String]) -> Result<String, CommandError> {
    let command_line = render_command_line(program, args);
    debug!(command = %command_line, "Running external command");

    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| CommandError::Spawn {
            program: program.display().to_string(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        let status = output
            .status
            .code()
            .map_or_else(|| "no exit code (killed by signal)".to_string(), |code| {
                format!("exit code {code}")
            });
        return Err(CommandError::Failed {
            command: command_line,
            status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    String::from_utf8(output.stdout)
        .map_err(|e| CommandError::decode(command_line, format!("stdout is not UTF-8: {e}")))
}

fn render_command_line(program: &Path, args: &[String]) -> String {
    std::iter::once(program.display().to_string())
        .chain(args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// A Kubernetes command-line tool, optionally pinned to a kubeconfig and context.
///
/// `kubectl` and `helm` take the same global flags except for the context,
/// which `helm` spells `--kube-context`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliTool {
    binary: PathBuf,
    context_flag: &'static str,
    kubeconfig: Option<PathBuf>,
    context: Option<String>,
}

impl CliTool {
    /// `kubectl` from `PATH`, using its default kubeconfig and context.
    #[must_use]
    pub fn kubectl() -> Self {
        Self::new("kubectl", "--context")
    }

    /// `helm` from `PATH`, using its default kubeconfig and context.
    #[must_use]
    pub fn helm() -> Self {
        Self::new("helm", "--kube-context")
    }

    fn new(binary: &str, context_flag: &'static str) -> Self {
        Self {
            binary: PathBuf::from(binary),
            context_flag,
            kubeconfig: None,
            context: None,
        }
    }

    /// Use a specific binary.
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Pass `--kubeconfig` on every invocation.
    #[must_use]
    pub fn with_kubeconfig(mut self, kubeconfig: impl Into<PathBuf>) -> Self {
        self.kubeconfig = Some(kubeconfig.into());
        self
    }

    /// Pass the tool's context flag on every invocation.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Binary that will be executed.
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Global flags placed ahead of the caller's arguments.
    #[must_use]
    pub fn global_args(&self) -> Vec<String> {
        let mut global = Vec::new();
        if let Some(kubeconfig) = &self.kubeconfig {
            global.push("--kubeconfig".to_string());
            global.push(kubeconfig.display().to_string());
        }
        if let Some(context) = &self.context {
            global.push(self.context_flag.to_string());
            global.push(context.clone());
        }
        global
    }
}

impl CommandRunner for CliTool {
    fn run(&self, args: &[String]) -> Result<String, CommandError> {
        let mut full = self.global_args();
        full.extend_from_slice(args);
        run_command(&self.binary, &full)
    }
}

#[cfg(test)]
#[path = "kubectl_tests.rs"]
mod kubectl_tests;
