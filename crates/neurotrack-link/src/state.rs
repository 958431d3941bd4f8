//! Connection lifecycle states

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why the link dropped back to `Disconnected`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisconnectReason {
    /// The connection attempt failed or timed out
    ConnectFailed,
    /// Service discovery failed
    NoService,
    /// Characteristic discovery failed
    NoCharacteristics,
    /// Enabling notifications failed
    SubscribeFailed,
    /// An established link went away
    LinkLost,
    /// No powered-on adapter
    AdapterUnavailable,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DisconnectReason::ConnectFailed => "connect failed",
            DisconnectReason::NoService => "service discovery failed",
            DisconnectReason::NoCharacteristics => "characteristic discovery failed",
            DisconnectReason::SubscribeFailed => "subscribe failed",
            DisconnectReason::LinkLost => "link lost",
            DisconnectReason::AdapterUnavailable => "adapter unavailable",
        };
        write!(f, "{}", text)
    }
}

/// Where the link currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LinkState {
    #[default]
    Idle,
    Scanning,
    Connecting,
    ResolvingServices,
    ResolvingCharacteristics,
    Subscribing,
    Streaming,
    Disconnected(DisconnectReason),
}

impl LinkState {
    /// Notifications are flowing from both characteristics
    pub fn is_streaming(&self) -> bool {
        matches!(self, LinkState::Streaming)
    }

    /// A peripheral connection is held or being established
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            LinkState::Connecting
                | LinkState::ResolvingServices
                | LinkState::ResolvingCharacteristics
                | LinkState::Subscribing
                | LinkState::Streaming
        )
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Idle => write!(f, "Idle"),
            LinkState::Scanning => write!(f, "Scanning"),
            LinkState::Connecting => write!(f, "Connecting"),
            LinkState::ResolvingServices => write!(f, "ResolvingServices"),
            LinkState::ResolvingCharacteristics => write!(f, "ResolvingCharacteristics"),
            LinkState::Subscribing => write!(f, "Subscribing"),
            LinkState::Streaming => write!(f, "Streaming"),
            LinkState::Disconnected(reason) => write!(f, "Disconnected ({})", reason),
        }
    }
}
