//! Raw telnet byte channel to the device.
//!
//! The remote shell gives no end-of-response marker, so this layer stays
//! deliberately thin: write bytes, read whatever has arrived without
//! blocking, or block until a literal pattern shows up. Everything above it
//! polls on these three primitives.
//!
//! The only protocol awareness here is IAC handling: the device's telnet
//! server opens with option negotiation, and those bytes would otherwise
//! leak into the text stream. Negotiation is refused (`WONT`/`DONT`) and the
//! sequences are filtered out, which is all this firmware needs. This is not
//! a general telnet implementation.

use std::io;
use std::time::Duration;

use log::{debug, trace};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::Instant;

use crate::config;
use crate::error::OltError;

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IacState {
    Data,
    Command,
    Option(u8),
    Subnegotiation,
    SubnegotiationIac,
}

/// Streaming filter that removes IAC sequences from inbound bytes and
/// accumulates refusal replies for DO/WILL offers. Sequences may be split
/// across reads, so the state persists between calls.
#[derive(Debug)]
struct IacFilter {
    state: IacState,
    replies: Vec<u8>,
}

impl IacFilter {
    fn new() -> Self {
        Self {
            state: IacState::Data,
            replies: Vec::new(),
        }
    }

    fn filter(&mut self, raw: &[u8]) -> Vec<u8> {
        let mut data = Vec::with_capacity(raw.len());
        for &byte in raw {
            match self.state {
                IacState::Data => {
                    if byte == IAC {
                        self.state = IacState::Command;
                    } else {
                        data.push(byte);
                    }
                }
                IacState::Command => match byte {
                    IAC => {
                        data.push(IAC);
                        self.state = IacState::Data;
                    }
                    DO | DONT | WILL | WONT => self.state = IacState::Option(byte),
                    SB => self.state = IacState::Subnegotiation,
                    _ => self.state = IacState::Data,
                },
                IacState::Option(cmd) => {
                    match cmd {
                        DO => self.replies.extend_from_slice(&[IAC, WONT, byte]),
                        WILL => self.replies.extend_from_slice(&[IAC, DONT, byte]),
                        _ => {}
                    }
                    self.state = IacState::Data;
                }
                IacState::Subnegotiation => {
                    if byte == IAC {
                        self.state = IacState::SubnegotiationIac;
                    }
                }
                IacState::SubnegotiationIac => {
                    self.state = if byte == SE {
                        IacState::Data
                    } else {
                        IacState::Subnegotiation
                    };
                }
            }
        }
        data
    }

    fn take_replies(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.replies)
    }

    fn has_replies(&self) -> bool {
        !self.replies.is_empty()
    }
}

/// Bidirectional byte channel to one device.
pub struct TelnetTransport {
    stream: TcpStream,
    peer: String,
    iac: IacFilter,
    closed: bool,
}

impl TelnetTransport {
    /// Opens a TCP channel to `host:port` within `timeout`.
    pub async fn open(host: &str, port: u16, timeout: Duration) -> Result<Self, OltError> {
        let peer = format!("{host}:{port}");
        debug!("{peer} opening telnet channel");
        let stream = match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(err)) => {
                return Err(OltError::ConnectionError(format!(
                    "connect to {peer} failed: {err}"
                )));
            }
            Err(_) => {
                return Err(OltError::ConnectionError(format!(
                    "connect to {peer} timed out after {timeout:?}"
                )));
            }
        };
        debug!("{peer} TCP connection established");
        Ok(Self {
            stream,
            peer,
            iac: IacFilter::new(),
            closed: false,
        })
    }

    /// Transmits `text` verbatim. Never waits for a reply.
    pub async fn send(&mut self, text: &str) -> Result<(), OltError> {
        self.flush_negotiation().await?;
        trace!("{} send {:?}", self.peer, text);
        self.stream.write_all(text.as_bytes()).await?;
        Ok(())
    }

    /// Transmits `line` followed by the shell command terminator.
    pub async fn send_line(&mut self, line: &str) -> Result<(), OltError> {
        self.send(line).await?;
        self.send(config::COMMAND_EOL).await
    }

    /// Returns whatever bytes have arrived, without blocking.
    ///
    /// Telnet negotiation is filtered out and the remainder is decoded
    /// lossily, matching the tolerant decoding the shell's mixed banner
    /// output requires. Returns an empty string when nothing is pending.
    pub fn read_available(&mut self) -> Result<String, OltError> {
        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            match self.stream.try_read(&mut buf) {
                Ok(0) => {
                    debug!("{} peer closed the channel", self.peer);
                    self.closed = true;
                    break;
                }
                Ok(n) => raw.extend_from_slice(&buf[..n]),
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) => return Err(err.into()),
            }
        }
        if raw.is_empty() {
            return Ok(String::new());
        }
        let data = self.iac.filter(&raw);
        let text = String::from_utf8_lossy(&data).into_owned();
        trace!("{} recv {:?}", self.peer, text);
        Ok(text)
    }

    /// Blocks until `pattern` appears in the accumulated stream or `timeout`
    /// elapses. Returns everything read while waiting, pattern included.
    pub async fn wait_for_literal(
        &mut self,
        pattern: &str,
        timeout: Duration,
    ) -> Result<String, OltError> {
        let deadline = Instant::now() + timeout;
        let mut acc = String::new();
        loop {
            acc.push_str(&self.read_available()?);
            self.flush_negotiation().await?;
            if acc.contains(pattern) {
                return Ok(acc);
            }
            if self.closed || Instant::now() >= deadline {
                return Err(OltError::HandshakeTimeout(pattern.to_string()));
            }
            match tokio::time::timeout_at(deadline, self.stream.readable()).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => return Err(err.into()),
                Err(_) => return Err(OltError::HandshakeTimeout(pattern.to_string())),
            }
        }
    }

    /// Whether the channel is still usable.
    pub fn is_open(&self) -> bool {
        !self.closed
    }

    /// Closes the channel. Idempotent and best-effort: the polite `quit` and
    /// the shutdown both suppress transport errors.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(err) = self.stream.write_all(b"quit\n").await {
            debug!("{} quit on close failed: {err}", self.peer);
        }
        if let Err(err) = self.stream.shutdown().await {
            debug!("{} shutdown failed: {err}", self.peer);
        }
        debug!("{} telnet channel closed", self.peer);
    }

    async fn flush_negotiation(&mut self) -> Result<(), OltError> {
        if !self.iac.has_replies() {
            return Ok(());
        }
        let replies = self.iac.take_replies();
        trace!("{} refusing {} negotiation bytes", self.peer, replies.len());
        self.stream.write_all(&replies).await?;
        Ok(())
    }
}
