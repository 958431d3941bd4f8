//! GATT layout of the ESP32 sensor board
//!
//! One custom service with two notify characteristics. Every notification
//! carries a single scalar as UTF-8 text, e.g. `b"72"` or `b"-13.25"`.

use uuid::Uuid;

/// Sensor service UUID
pub const SENSOR_SERVICE_UUID: Uuid = Uuid::from_u128(0x12345678_1234_1234_1234_123456789abc);

/// Heart-rate characteristic UUID (notify)
pub const HEART_RATE_CHAR_UUID: Uuid = Uuid::from_u128(0xabcd1234_ab12_cd34_ef56_abcdef123456);

/// Raw EEG sample characteristic UUID (notify)
pub const EEG_CHAR_UUID: Uuid = Uuid::from_u128(0xabcd5678_ab12_cd34_ef56_abcdef123456);

/// Substring the advertised name must contain, compared case-insensitively
pub const DEFAULT_DEVICE_NAME: &str = "esp32";
