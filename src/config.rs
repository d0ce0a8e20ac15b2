//! Wire literals and timing profiles for the MA5683T remote shell.
//!
//! The device speaks a human-oriented line protocol with no completion
//! markers, so every layer above the transport depends on two kinds of
//! constants: the exact prompt/banner strings the firmware emits, and the
//! empirical delays a human operator would leave between keystrokes. Both
//! live here so that timing is configuration rather than literals scattered
//! through the session code, and so tests can run against a synthetic device
//! with compressed delays.

use std::time::Duration;

/// Hostname fragment of every shell prompt this firmware emits.
pub const HOSTNAME: &str = "MA5683T";

/// Login prompt for the account name.
pub const USERNAME_PROMPT: &str = ">>User name:";

/// Login prompt for the account password.
pub const PASSWORD_PROMPT: &str = ">>User password:";

/// Banner line shown on successful login before the first prompt.
pub const LOGIN_BANNER: &str = "Huawei Integrated Access Software";

/// Marker fragment of the pagination banner shown when output exceeds one
/// screen. The full banner is `---- More ( Press 'Q' to break ) ----` but
/// trailing decoration varies between screens, so detection matches on the
/// stable prefix.
pub const MORE_BANNER: &str = "---- More";

/// Key-press fragment left behind by the pagination banner.
pub const MORE_KEY_FRAGMENT: &str = "Press 'Q' to break";

/// Single keystroke that advances a paginated listing by one screen.
pub const PAGE_ADVANCE: &str = " ";

/// Line terminator for credential lines during the login handshake.
pub const CREDENTIAL_EOL: &str = "\r\n";

/// Line terminator for shell commands after login.
pub const COMMAND_EOL: &str = "\n";

/// Confirmation fragments the device may show after `quit` at the top level.
pub const QUIT_CONFIRM_MARKERS: &[&str] = &["Y/N", "y/n", "yes/no"];

/// Timing profile for one session.
///
/// The device acknowledges nothing, so each field is an empirically chosen
/// stand-in for a completion signal. [`Timing::default`] carries the values
/// observed to work against production firmware; [`Timing::fast`] compresses
/// everything for tests against an in-process stub.
#[derive(Debug, Clone)]
pub struct Timing {
    /// TCP connect deadline.
    pub connect_timeout: Duration,
    /// How long to wait for the username/password prompts.
    pub prompt_wait: Duration,
    /// Pause after transmitting the password.
    pub password_settle: Duration,
    /// Pause before polling for the login transcript.
    pub login_settle: Duration,
    /// Number of login transcript polls.
    pub login_poll_attempts: u32,
    /// Delay between login transcript polls.
    pub login_poll_interval: Duration,
    /// Settle time for short commands.
    pub command_settle: Duration,
    /// Settle time for multi-screen listings.
    pub listing_settle: Duration,
    /// Settle time for provisioning commands.
    pub provision_settle: Duration,
    /// Number of extra output polls when the settle read comes back empty.
    pub read_attempts: u32,
    /// Delay between extra output polls.
    pub read_interval: Duration,
    /// Delay between pagination keystrokes.
    pub page_interval: Duration,
    /// Upper bound on pagination iterations per command.
    pub page_limit: u32,
    /// Best-effort wait for the current prompt before sending a command.
    pub resync_timeout: Duration,
    /// Upper bound on `quit` repetitions when returning to the user shell.
    pub exit_attempts: u32,
    /// Settle time for the health probe.
    pub health_settle: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            prompt_wait: Duration::from_secs(3),
            password_settle: Duration::from_secs(1),
            login_settle: Duration::from_secs(3),
            login_poll_attempts: 5,
            login_poll_interval: Duration::from_millis(500),
            command_settle: Duration::from_secs(1),
            listing_settle: Duration::from_secs(3),
            provision_settle: Duration::from_secs(5),
            read_attempts: 3,
            read_interval: Duration::from_millis(200),
            page_interval: Duration::from_millis(500),
            page_limit: 10,
            resync_timeout: Duration::from_secs(2),
            exit_attempts: 4,
            health_settle: Duration::from_millis(300),
        }
    }
}

impl Timing {
    /// Compressed profile for tests that drive a scripted stub device.
    ///
    /// Attempt counts and caps keep their production values so bounded-loop
    /// behavior is exercised unchanged.
    pub fn fast() -> Self {
        Self {
            connect_timeout: Duration::from_secs(2),
            prompt_wait: Duration::from_millis(500),
            password_settle: Duration::from_millis(20),
            login_settle: Duration::from_millis(40),
            login_poll_attempts: 5,
            login_poll_interval: Duration::from_millis(20),
            command_settle: Duration::from_millis(40),
            listing_settle: Duration::from_millis(60),
            provision_settle: Duration::from_millis(60),
            read_attempts: 3,
            read_interval: Duration::from_millis(20),
            page_interval: Duration::from_millis(20),
            page_limit: 10,
            resync_timeout: Duration::from_millis(100),
            exit_attempts: 4,
            health_settle: Duration::from_millis(30),
        }
    }
}

/// Session behavior options beyond raw timing.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Timing profile for every blocking wait in the session.
    pub timing: Timing,
    /// Treat a missing mode prompt after a transition command as a hard
    /// failure instead of logging a warning and proceeding.
    ///
    /// The firmware's prompt text has been observed to vary, so the default
    /// is optimistic. Callers that prefer failing loudly can opt in.
    pub strict_prompts: bool,
}

impl SessionOptions {
    /// Options for stub-backed tests: fast timing, optimistic prompts.
    pub fn fast() -> Self {
        Self {
            timing: Timing::fast(),
            strict_prompts: false,
        }
    }
}
