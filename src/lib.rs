//! # olterm - Huawei GPON OLT Shell Automation
//!
//! `olterm` is a Rust library for driving the telnet command shell of Huawei
//! MA5683T optical line terminals. The device exposes no machine-readable
//! protocol, only a human-oriented line shell, so the library reproduces the
//! exact keystroke and timing sequence an operator would type and parses the
//! free-text screen output back into structured results.
//!
//! ## Features
//!
//! - **Login Handshake**: Drives the username/password exchange and
//!   classifies every observed textual outcome, lockout included
//! - **Mode Tracking**: Knows which shell mode the session is in and sends
//!   mode-aware preambles before every command
//! - **Pagination Handling**: Detects the `---- More ----` banner and pages
//!   through multi-screen listings automatically
//! - **Output Sanitizing**: Strips echoes, prompts, banners and control
//!   sequences into clean result text
//! - **Provisioning Workflows**: Scripted ONT registration, verification,
//!   autofind discovery and board reports with line-oriented traces
//! - **Connection Pooling**: Injectable keyed cache that revalidates and
//!   reuses live sessions
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use olterm::config::SessionOptions;
//! use olterm::session::OltConnectionManager;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = OltConnectionManager::new();
//!
//!     // Get a pooled session to the device.
//!     let entry = manager
//!         .get("192.168.1.10", 23, "admin", "admin", SessionOptions::default())
//!         .await?;
//!
//!     // One logical caller at a time per session.
//!     let mut session = entry.lock().await;
//!     let report = session
//!         .register_ont("0/0", "5", "1", "45485443BA058ED8", "flat_7", "10", "10")
//!         .await?;
//!
//!     println!("outcome: {:?}", report.outcome);
//!     for line in &report.trace {
//!         println!("  {line}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Main Components
//!
//! - [`session::OltSession`] - One live connection with mode tracking
//! - [`session::OltConnectionManager`] - Keyed session cache for pooled reuse
//! - [`device`] - Prompt literals, mode model and outcome classification
//! - [`error::OltError`] - Error taxonomy for connection, login and commands
//! - [`config`] - Wire literals and timing profiles

pub mod config;
pub mod device;
pub mod error;
pub mod ident;
pub mod sanitize;
pub mod session;
pub mod transport;
