// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! RF emitter identity.
//!
//! An [`RfIdentification`] names exactly one radio source. Its unique id
//! (`"<TYPE>/<rf_id>"`) is the working-set key and the durable-store primary
//! key, so it must be stable across restarts.
//!
//! # Example
//!
//! ```
//! use emitter_cache::{RfIdentification, EmitterType};
//!
//! let wifi = RfIdentification::new(EmitterType::Wifi, "AA:BB:CC:DD:EE:FF");
//! assert_eq!(wifi.unique_id(), "WIFI/aa:bb:cc:dd:ee:ff");
//!
//! let cell: RfIdentification = "GSM/262/1/4711/12".parse().unwrap();
//! assert_eq!(cell.emitter_type(), EmitterType::Gsm);
//! assert_eq!(cell.rf_id(), "262/1/4711/12");
//! ```

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Radio technology of an emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EmitterType {
    Wifi,
    Bluetooth,
    Gsm,
    Cdma,
    Wcdma,
    Tdscdma,
    Lte,
    Nr,
}

impl EmitterType {
    /// Prefix used in unique ids.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wifi => "WIFI",
            Self::Bluetooth => "BT",
            Self::Gsm => "GSM",
            Self::Cdma => "CDMA",
            Self::Wcdma => "WCDMA",
            Self::Tdscdma => "TDSCDMA",
            Self::Lte => "LTE",
            Self::Nr => "NR",
        }
    }

    /// Whether the address is a MAC-style hardware address.
    #[must_use]
    pub fn is_hardware_address(&self) -> bool {
        matches!(self, Self::Wifi | Self::Bluetooth)
    }
}

impl fmt::Display for EmitterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityParseError {
    #[error("missing '/' separator in emitter id '{0}'")]
    MissingSeparator(String),
    #[error("unknown emitter type '{0}'")]
    UnknownType(String),
    #[error("empty address in emitter id '{0}'")]
    EmptyAddress(String),
}

impl FromStr for EmitterType {
    type Err = IdentityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "WIFI" | "WLAN" => Ok(Self::Wifi),
            "BT" | "BLUETOOTH" => Ok(Self::Bluetooth),
            "GSM" => Ok(Self::Gsm),
            "CDMA" => Ok(Self::Cdma),
            "WCDMA" => Ok(Self::Wcdma),
            "TDSCDMA" => Ok(Self::Tdscdma),
            "LTE" => Ok(Self::Lte),
            "NR" => Ok(Self::Nr),
            _ => Err(IdentityParseError::UnknownType(s.to_string())),
        }
    }
}

/// Immutable identity of a single RF emitter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RfIdentification {
    emitter_type: EmitterType,
    rf_id: String,
}

impl RfIdentification {
    /// Create an identity. Hardware addresses are lower-cased so that the
    /// unique id does not depend on how the radio stack formats them.
    pub fn new(emitter_type: EmitterType, rf_id: impl Into<String>) -> Self {
        let rf_id = rf_id.into();
        let rf_id = if emitter_type.is_hardware_address() {
            rf_id.to_ascii_lowercase()
        } else {
            rf_id
        };
        Self { emitter_type, rf_id }
    }

    /// Cell identity from its numeric components (e.g. MCC, MNC, LAC, CID).
    pub fn cell(emitter_type: EmitterType, parts: &[u64]) -> Self {
        let rf_id = parts
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join("/");
        Self::new(emitter_type, rf_id)
    }

    #[must_use]
    pub fn emitter_type(&self) -> EmitterType {
        self.emitter_type
    }

    #[must_use]
    pub fn rf_id(&self) -> &str {
        &self.rf_id
    }

    /// Canonical key: `"<TYPE>/<rf_id>"`.
    #[must_use]
    pub fn unique_id(&self) -> String {
        format!("{}/{}", self.emitter_type.as_str(), self.rf_id)
    }
}

impl fmt::Display for RfIdentification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.emitter_type.as_str(), self.rf_id)
    }
}

impl FromStr for RfIdentification {
    type Err = IdentityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, rf_id) = s
            .split_once('/')
            .ok_or_else(|| IdentityParseError::MissingSeparator(s.to_string()))?;
        if rf_id.is_empty() {
            return Err(IdentityParseError::EmptyAddress(s.to_string()));
        }
        Ok(Self::new(kind.parse()?, rf_id))
    }
}
