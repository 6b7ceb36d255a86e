// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for external collaborators and configuration.
//!
//! This module provides specialized error types for:
//! - External command invocations (`kubectl`, `helm`)
//! - Scenario configuration loading and validation
//!
//! Command errors are collaborator faults: they are tolerated while a poll is
//! still running and only surface if they persist until the poll times out.
//! Configuration errors are fatal and are raised before any command runs.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while invoking an external command-line tool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The binary could not be started at all
    ///
    /// Usually the binary is not installed or not on `PATH`.
    #[error("failed to run '{program}': {reason}")]
    Spawn {
        /// Program that was invoked
        program: String,
        /// Operating system error text
        reason: String,
    },

    /// The command ran but exited unsuccessfully
    ///
    /// Typical causes are an unreachable API server, missing RBAC permissions,
    /// or a resource that does not exist yet.
    #[error("'{command}' exited with {status}: {stderr}")]
    Failed {
        /// Full command line, program included
        command: String,
        /// Exit code, or a note that the process was killed by a signal
        status: String,
        /// Trimmed standard error output
        stderr: String,
    },

    /// The command succeeded but its output could not be understood
    #[error("could not decode output of '{command}': {reason}")]
    Decode {
        /// Full command line, program included
        command: String,
        /// What was wrong with the output
        reason: String,
    },
}

impl CommandError {
    /// Create a decode error for `command`.
    #[must_use]
    pub fn decode(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            command: command.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while loading or validating the scenario configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        /// Path of the file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for the expected schema
    #[error("failed to parse configuration file {path}: {source}")]
    Parse {
        /// Path of the file
        path: PathBuf,
        /// Underlying YAML error
        #[source]
        source: serde_yaml::Error,
    },

    /// A required value was not provided by any source
    #[error("missing required setting '{0}'")]
    Missing(&'static str),

    /// A value was provided but is not acceptable
    #[error("invalid setting '{field}': {reason}")]
    Invalid {
        /// Dotted path of the offending setting
        field: String,
        /// Why it was rejected
        reason: String,
    },
}
