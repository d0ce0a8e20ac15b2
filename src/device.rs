//! Shell mode model and output classification tables for the MA5683T.
//!
//! The device exposes no structured status codes, so every outcome is
//! recognized by matching literal text the firmware has been observed to
//! emit. All recognized markers live in ordered tables here: supporting a
//! firmware variant with different wording is a data change in this module,
//! not a new code path through the session engine.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::ident::BoardId;

/// Command that raises the session from user to enable shell.
pub const ENABLE_COMMAND: &str = "enable";

/// Command that enters the global config shell from enable.
pub const CONFIG_COMMAND: &str = "config";

/// Command that backs out one mode level.
pub const EXIT_COMMAND: &str = "quit";

/// Builds the command that scopes the shell to one GPON board.
pub fn interface_command(board: &BoardId) -> String {
    format!("interface gpon {board}")
}

/// The five modes the remote shell can be in.
///
/// Every command that needs a specific mode is preceded by transitions that
/// leave the session there, and every workflow restores [`ShellMode::User`]
/// before returning so pooled reuse starts from a known state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellMode {
    /// No successful login yet.
    Unauthenticated,
    /// Plain user shell, `MA5683T>`.
    User,
    /// Privileged shell, `MA5683T#`.
    Enable,
    /// Global configuration shell, `MA5683T(config)#`.
    Config,
    /// Configuration scoped to one GPON board.
    Interface(BoardId),
}

impl ShellMode {
    /// The exact prompt literal the device shows in this mode.
    ///
    /// [`ShellMode::Unauthenticated`] maps to the username prompt because
    /// that is the only text an unauthenticated peer ever sees.
    pub fn prompt(&self) -> String {
        match self {
            ShellMode::Unauthenticated => config::USERNAME_PROMPT.to_string(),
            ShellMode::User => format!("{}>", config::HOSTNAME),
            ShellMode::Enable => format!("{}#", config::HOSTNAME),
            ShellMode::Config => format!("{}(config)#", config::HOSTNAME),
            ShellMode::Interface(board) => {
                format!("{}(config-if-gpon-{})#", config::HOSTNAME, board)
            }
        }
    }

    /// Nesting depth below the user shell. Bounds the `quit` loop.
    pub fn depth(&self) -> u32 {
        match self {
            ShellMode::Unauthenticated | ShellMode::User => 0,
            ShellMode::Enable => 1,
            ShellMode::Config => 2,
            ShellMode::Interface(_) => 3,
        }
    }

    /// The mode one `quit` backs out into.
    pub fn parent(&self) -> ShellMode {
        match self {
            ShellMode::Unauthenticated => ShellMode::Unauthenticated,
            ShellMode::User => ShellMode::User,
            ShellMode::Enable => ShellMode::User,
            ShellMode::Config => ShellMode::Enable,
            ShellMode::Interface(_) => ShellMode::Config,
        }
    }
}

impl fmt::Display for ShellMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShellMode::Unauthenticated => f.write_str("unauthenticated"),
            ShellMode::User => f.write_str("user"),
            ShellMode::Enable => f.write_str("enable"),
            ShellMode::Config => f.write_str("config"),
            ShellMode::Interface(board) => write!(f, "interface-gpon-{board}"),
        }
    }
}

/// Outcome of the login handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoginOutcome {
    /// Shell prompt observed, session is in the user shell.
    Success,
    /// The device rejected the credentials.
    InvalidCredentials,
    /// The account is locked after repeated failures.
    Lockout,
    /// The device stayed silent through the whole settle window.
    Timeout,
    /// The transcript matched nothing recognized.
    ConnectionError,
}

/// Marker of an explicit lockout response.
const LOCKOUT_MARKER: &str = "Reenter times have reached the upper limit";

/// Markers of an explicit credential rejection, checked in order.
const INVALID_CREDENTIAL_MARKERS: &[&str] = &["Username or password invalid", "Invalid"];

/// Classifies an accumulated login transcript.
///
/// Total over all inputs and mutually exclusive: the rules are ordered and
/// the first hit wins. Lockout outranks the invalid-credential markers, so a
/// transcript carrying both never reads as a plain rejection. A reappearing
/// username prompt without a shell prompt means the device silently looped
/// back to login, which is a rejection in disguise.
pub fn classify_login(transcript: &str) -> LoginOutcome {
    if transcript.contains(LOCKOUT_MARKER) {
        return LoginOutcome::Lockout;
    }
    if INVALID_CREDENTIAL_MARKERS
        .iter()
        .any(|marker| transcript.contains(marker))
    {
        return LoginOutcome::InvalidCredentials;
    }
    let shell_prompt = ShellMode::User.prompt();
    if transcript.contains(&shell_prompt) {
        return LoginOutcome::Success;
    }
    if transcript.contains(config::USERNAME_PROMPT) {
        return LoginOutcome::InvalidCredentials;
    }
    if transcript.trim().is_empty() {
        return LoginOutcome::Timeout;
    }
    LoginOutcome::ConnectionError
}

/// Substrings that mark a command as rejected by the device, checked in
/// order against the sanitized output.
pub const COMMAND_ERROR_MARKERS: &[&str] =
    &["Error", "Unknown command", "Parameter error", "Failed"];

/// Returns the first error marker present in `text`, if any.
pub fn command_error(text: &str) -> Option<&'static str> {
    COMMAND_ERROR_MARKERS
        .iter()
        .find(|marker| text.contains(*marker))
        .copied()
}
