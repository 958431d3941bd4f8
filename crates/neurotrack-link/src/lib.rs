//! NeuroTrack-Link: wireless link to the ESP32 sensor board
//!
//! A pure connection state machine, the radio backend seam with a btleplug
//! implementation, payload dispatch into the band-power pipeline, and the
//! async service that ties them together and publishes telemetry.

pub mod backend;
pub mod ble;
pub mod config;
pub mod dispatcher;
pub mod event;
pub mod machine;
pub mod protocol;
pub mod service;
pub mod state;
pub mod telemetry;

pub use backend::{ChannelRadio, RadioBackend, RadioProbe};
pub use ble::BtleplugRadio;
pub use config::LinkConfig;
pub use dispatcher::{decode_scalar, DispatchOutcome, TelemetryDispatcher};
pub use event::{LinkCommand, LinkEvent};
pub use machine::{ChannelPayload, LinkStateMachine, Step};
pub use protocol::{DEFAULT_DEVICE_NAME, EEG_CHAR_UUID, HEART_RATE_CHAR_UUID, SENSOR_SERVICE_UUID};
pub use service::{start_link_service, LinkControl, LinkHandle, LinkService};
pub use state::{DisconnectReason, LinkState};
pub use telemetry::{TelemetryHandle, TelemetryPublisher, TelemetrySnapshot};
