//! Discovered wireless peripherals

use serde::{Deserialize, Serialize};
use std::fmt;

/// A peripheral seen during a scan
///
/// Created from an advertisement; dropped when it does not match the
/// expected device or once a connection to it has been established.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeripheralIdentity {
    /// Advertised local name, absent in malformed or anonymous advertisements
    pub name: Option<String>,
    /// Received signal strength in dBm
    pub rssi: Option<i16>,
    /// Platform address
    /// • Linux: Bluetooth MAC (`AA:BB:CC:DD:EE:FF`)
    /// • macOS / Windows: platform UUID string
    pub address: String,
}

impl PeripheralIdentity {
    pub fn new(name: Option<String>, rssi: Option<i16>, address: impl Into<String>) -> Self {
        PeripheralIdentity { name, rssi, address: address.into() }
    }

    /// Whether the advertised name contains `pattern`, ignoring case
    pub fn name_contains(&self, pattern: &str) -> bool {
        match &self.name {
            Some(name) => name.to_lowercase().contains(&pattern.to_lowercase()),
            None => false,
        }
    }
}

impl fmt::Display for PeripheralIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name.as_deref().unwrap_or("<unnamed>"), self.address)?;
        if let Some(rssi) = self.rssi {
            write!(f, " {}dBm", rssi)?;
        }
        Ok(())
    }
}
