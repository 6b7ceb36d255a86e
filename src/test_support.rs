// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared fakes for unit tests.

use crate::errors::CommandError;
use crate::kubectl::CommandRunner;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

/// A [`CommandRunner`] that replays canned responses.
///
/// Responses are keyed by the space-joined argument list. Each call consumes
/// the next queued response; the last one is repeated forever. Unscripted
/// commands fail with exit code 127.
#[derive(Debug, Default)]
pub(crate) struct ScriptedRunner {
    scripts: RefCell<HashMap<String, VecDeque<Result<String, CommandError>>>>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response for `command`.
    pub(crate) fn ok(self, command: &str, stdout: &str) -> Self {
        self.push(command, Ok(stdout.to_string()))
    }

    /// Queue a failed response for `command`.
    pub(crate) fn fail(self, command: &str, stderr: &str) -> Self {
        let error = CommandError::Failed {
            command: format!("kubectl {command}"),
            status: "exit code 1".to_string(),
            stderr: stderr.to_string(),
        };
        self.push(command, Err(error))
    }

    fn push(self, command: &str, response: Result<String, CommandError>) -> Self {
        self.scripts
            .borrow_mut()
            .entry(command.to_string())
            .or_default()
            .push_back(response);
        self
    }

    /// Every command run so far, in order.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// How many times `command` was run.
    pub(crate) fn count(&self, command: &str) -> usize {
        self.calls.borrow().iter().filter(|c| *c == command).count()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, args: &[String]) -> Result<String, CommandError> {
        let key = args.join(" ");
        self.calls.borrow_mut().push(key.clone());

        let mut scripts = self.scripts.borrow_mut();
        match scripts.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().expect("queue is not empty"),
            Some(queue) => queue.front().cloned().expect("script queue is empty"),
            None => Err(CommandError::Failed {
                command: format!("kubectl {key}"),
                status: "exit code 127".to_string(),
                stderr: format!("unscripted command: {key}"),
            }),
        }
    }
}
