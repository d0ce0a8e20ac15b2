//! Error types for OLT connection, login and command execution.
//!
//! This module defines all errors that can occur while establishing a telnet
//! session to the device, driving the login handshake, and executing shell
//! commands.

use thiserror::Error;

/// Errors that can occur during OLT session and command management.
#[derive(Error, Debug)]
pub enum OltError {
    /// The telnet channel could not be established or broke down.
    ///
    /// Fatal to the session. The caller must discard the session and may
    /// retry with a new one.
    #[error("connection error: {0}")]
    ConnectionError(String),

    /// An I/O error on the underlying TCP stream.
    #[error("transport io error: {0}")]
    Io(#[from] std::io::Error),

    /// A literal pattern did not appear on the stream within its timeout.
    ///
    /// The error carries the pattern that was being waited for.
    #[error("timed out waiting for '{0}'")]
    HandshakeTimeout(String),

    /// The device rejected the supplied username/password pair.
    #[error("username or password invalid")]
    InvalidCredentials,

    /// The device refused the login because of too many failed attempts.
    ///
    /// Surfaced distinctly from [`OltError::InvalidCredentials`]: retrying a
    /// locked account only extends the lockout window.
    #[error("account locked: reenter times have reached the upper limit")]
    Lockout,

    /// The device produced no login response within the settle window.
    #[error("login response timed out")]
    LoginTimeout,

    /// An operation was attempted before a successful login.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The device rejected or errored on a specific command.
    ///
    /// Recoverable. Workflows downgrade these to per-step trace entries and
    /// keep reporting partial results.
    #[error("command failed: {0}")]
    CommandError(String),

    /// Malformed caller input, rejected before any transport I/O.
    #[error("validation error: {0}")]
    ValidationError(String),
}
