//! Messages between the state machine and a radio backend
//!
//! Backends turn radio callbacks into [`LinkEvent`]s and carry out
//! [`LinkCommand`]s. Neither side touches the other's state directly.

use neurotrack_core::PeripheralIdentity;
use uuid::Uuid;

/// Something the radio reported
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// A powered-on adapter is usable
    AdapterAvailable,
    /// No adapter, or it was powered off
    AdapterUnavailable,
    /// An advertisement was seen
    Discovered(PeripheralIdentity),
    Connected,
    ConnectFailed { reason: String },
    /// Services present on the connected peripheral
    ServicesDiscovered(Vec<Uuid>),
    ServiceDiscoveryFailed { reason: String },
    /// Characteristics found on the sensor service; may arrive in pieces
    CharacteristicsDiscovered(Vec<Uuid>),
    CharacteristicDiscoveryFailed { reason: String },
    /// Notifications were enabled on a characteristic
    Subscribed(Uuid),
    SubscribeFailed { characteristic: Uuid, reason: String },
    /// A characteristic value arrived
    Notification { characteristic: Uuid, value: Vec<u8> },
    /// The peripheral link went away; `address` names the peripheral when the backend knows it
    Disconnected { address: Option<String>, reason: Option<String> },
}

/// Something the radio should do
#[derive(Debug, Clone, PartialEq)]
pub enum LinkCommand {
    StartScan,
    StopScan,
    Connect(PeripheralIdentity),
    DiscoverServices,
    DiscoverCharacteristics { service: Uuid },
    Subscribe { characteristic: Uuid },
    /// Drop the current peripheral, if any
    Disconnect,
}
