//! OLT session lifecycle, command execution and provisioning workflows.
//!
//! This module owns the live telnet connection to one device. It drives the
//! login handshake, tracks which shell mode the session believes it is in,
//! executes commands with mode-aware preambles and settle delays, pages
//! through multi-screen listings, and exposes the scripted provisioning
//! workflows built on top.
//!
//! # Main Components
//!
//! - [`OltSession`] - One live connection with mode and liveness tracking
//! - [`CommandResult`] - Raw and sanitized output of one command
//! - [`WorkflowReport`] - Line-oriented trace of one scripted workflow
//! - [`OltConnectionManager`] - Keyed connection cache for pooled reuse

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use moka::future::Cache;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::config::{self, SessionOptions};
use crate::device::{self, LoginOutcome, ShellMode};
use crate::error::OltError;
use crate::ident::{BoardId, OntId, PortId, SerialNumber, parse_profile_id};
use crate::sanitize;
use crate::transport::TelnetTransport;

/// One live, authenticated (or soon-to-be) connection to a device.
///
/// A session is owned exclusively by whoever holds it. The engine performs
/// no internal locking: callers that share a session across tasks must wrap
/// it in their own mutex, which is exactly what [`OltConnectionManager`]
/// does.
pub struct OltSession {
    transport: TelnetTransport,
    mode: ShellMode,
    authenticated: bool,
    last_used: Instant,
    host: String,
    port: u16,
    username: String,
    /// SHA-256 of the password, kept for pooled-reuse revalidation.
    password_hash: [u8; 32],
    options: SessionOptions,
}

/// Classification of one command's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Output captured, no error marker present.
    Ok,
    /// The device rejected the command or the transport failed mid-command.
    Error,
    /// The device produced no output within the settle window.
    Timeout,
    /// The pagination cap was hit with the banner still showing, so the
    /// captured output may be truncated.
    Ambiguous,
}

/// Output of one executed command. Produced and consumed within one call,
/// never persisted.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Full captured transcript, untouched.
    pub raw: String,
    /// Sanitized, display-ready text.
    pub text: String,
    /// Outcome classification.
    pub classification: Classification,
}

impl CommandResult {
    pub fn is_ok(&self) -> bool {
        self.classification == Classification::Ok
    }

    fn transport_failure(message: String) -> Self {
        Self {
            raw: message,
            text: String::new(),
            classification: Classification::Error,
        }
    }
}

/// Overall outcome of a scripted workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowOutcome {
    /// Every step succeeded and every expectation was met.
    Success,
    /// The device accepted the commands but at least one verification
    /// expectation was not found in the output.
    Partial,
    /// A step was rejected or produced no usable output.
    Failed,
}

/// Line-oriented trace of one workflow run.
///
/// Every workflow returns one of these even on failure, so a caller without
/// device access can see which step diverged.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkflowReport {
    /// Workflow name, e.g. `register-ont`.
    pub operation: String,
    /// Overall outcome.
    pub outcome: WorkflowOutcome,
    /// Human-readable trace of what was attempted and observed.
    pub trace: Vec<String>,
    /// Primary sanitized output of the workflow.
    pub output: String,
}

impl WorkflowReport {
    fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            outcome: WorkflowOutcome::Failed,
            trace: Vec::new(),
            output: String::new(),
        }
    }

    fn step(&mut self, line: impl Into<String>) {
        let line = line.into();
        debug!("{}: {}", self.operation, line);
        self.trace.push(line);
    }

    /// Serializes the report for callers that forward it over the wire.
    pub fn to_json(&self) -> Result<String, OltError> {
        serde_json::to_string(self)
            .map_err(|err| OltError::CommandError(format!("report encode error: {err}")))
    }
}

mod client;
mod manager;
mod workflows;

pub use manager::OltConnectionManager;
