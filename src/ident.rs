//! Validated identifier types for provisioning parameters.
//!
//! Every workflow input is parsed into one of these value types before any
//! transport I/O happens. A malformed identifier is rejected cheaply and
//! deterministically with [`OltError::ValidationError`], so a bad request
//! never reaches the device.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::OltError;

static BOARD_ID: Lazy<Regex> = Lazy::new(|| match Regex::new(r"^(\d+)/(\d+)$") {
    Ok(re) => re,
    Err(err) => panic!("invalid BOARD_ID regex: {err}"),
});

/// Board address in `<slot>/<subslot>` form, e.g. `0/0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardId {
    slot: u32,
    subslot: u32,
}

impl BoardId {
    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn subslot(&self) -> u32 {
        self.subslot
    }
}

impl FromStr for BoardId {
    type Err = OltError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = BOARD_ID
            .captures(s.trim())
            .ok_or_else(|| OltError::ValidationError(format!("invalid board id '{s}'")))?;
        let slot = caps[1]
            .parse::<u32>()
            .map_err(|_| OltError::ValidationError(format!("invalid board slot in '{s}'")))?;
        let subslot = caps[2]
            .parse::<u32>()
            .map_err(|_| OltError::ValidationError(format!("invalid board subslot in '{s}'")))?;
        Ok(Self { slot, subslot })
    }
}

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.slot, self.subslot)
    }
}

/// GPON port number on a board, valid range 1..=16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortId(u8);

impl PortId {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 16;

    pub fn new(value: u8) -> Result<Self, OltError> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(OltError::ValidationError(format!(
                "port id {value} out of range {}..={}",
                Self::MIN,
                Self::MAX
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl FromStr for PortId {
    type Err = OltError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<u8>()
            .map_err(|_| OltError::ValidationError(format!("invalid port id '{s}'")))?;
        Self::new(value)
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ONT number on a port, valid range 1..=128.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OntId(u8);

impl OntId {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 128;

    pub fn new(value: u8) -> Result<Self, OltError> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(OltError::ValidationError(format!(
                "ont id {value} out of range {}..={}",
                Self::MIN,
                Self::MAX
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl FromStr for OntId {
    type Err = OltError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<u8>()
            .map_err(|_| OltError::ValidationError(format!("invalid ont id '{s}'")))?;
        Self::new(value)
    }
}

impl fmt::Display for OntId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ONT serial number as printed on the terminal, minimum 8 characters.
///
/// Treated as opaque beyond the length check, but whitespace and control
/// characters are rejected because the value is spliced into a command line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SerialNumber(String);

impl SerialNumber {
    pub const MIN_LEN: usize = 8;

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SerialNumber {
    type Err = OltError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if value.len() < Self::MIN_LEN {
            return Err(OltError::ValidationError(format!(
                "serial number '{value}' shorter than {} characters",
                Self::MIN_LEN
            )));
        }
        if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(OltError::ValidationError(format!(
                "serial number '{value}' contains whitespace or control characters"
            )));
        }
        Ok(Self(value.to_string()))
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parses an OMCI profile id (line or service profile).
pub fn parse_profile_id(s: &str) -> Result<u32, OltError> {
    s.trim()
        .parse::<u32>()
        .map_err(|_| OltError::ValidationError(format!("invalid profile id '{s}'")))
}
