//! Link configuration

use crate::protocol::{DEFAULT_DEVICE_NAME, EEG_CHAR_UUID, HEART_RATE_CHAR_UUID, SENSOR_SERVICE_UUID};
use neurotrack_core::{Channel, TrackerError, TrackerResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which peripheral to look for and how to talk to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Case-insensitive substring of the advertised name
    pub device_name_substring: String,
    /// Service holding both characteristics
    pub service_uuid: Uuid,
    /// Heart-rate characteristic
    pub heart_rate_uuid: Uuid,
    /// EEG characteristic
    pub eeg_uuid: Uuid,
    /// Give up on a connection attempt after this long
    pub connect_timeout_ms: u64,
    /// Give up on service discovery after this long
    pub discovery_timeout_ms: u64,
    /// How often to look for an adapter while none is usable
    pub adapter_poll_interval_ms: u64,
    /// Capacity of the radio event queue
    pub event_buffer: usize,
}

impl LinkConfig {
    /// Channel a characteristic feeds, if it is one of the two targets
    pub fn channel_for(&self, characteristic: &Uuid) -> Option<Channel> {
        if *characteristic == self.heart_rate_uuid {
            Some(Channel::HeartRate)
        } else if *characteristic == self.eeg_uuid {
            Some(Channel::Eeg)
        } else {
            None
        }
    }

    /// Both target characteristics, heart rate first
    pub fn characteristics(&self) -> [Uuid; 2] {
        [self.heart_rate_uuid, self.eeg_uuid]
    }

    /// Validate configuration
    pub fn validate(&self) -> TrackerResult<()> {
        if self.device_name_substring.trim().is_empty() {
            return Err(TrackerError::config("device name substring cannot be empty"));
        }
        if self.heart_rate_uuid == self.eeg_uuid {
            return Err(TrackerError::config("heart-rate and EEG characteristics must differ"));
        }
        if self.event_buffer == 0 {
            return Err(TrackerError::config("event buffer must be greater than 0"));
        }
        if self.connect_timeout_ms == 0 || self.discovery_timeout_ms == 0 {
            return Err(TrackerError::config("timeouts must be greater than 0"));
        }
        Ok(())
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            device_name_substring: DEFAULT_DEVICE_NAME.to_string(),
            service_uuid: SENSOR_SERVICE_UUID,
            heart_rate_uuid: HEART_RATE_CHAR_UUID,
            eeg_uuid: EEG_CHAR_UUID,
            connect_timeout_ms: 10_000,
            discovery_timeout_ms: 15_000,
            adapter_poll_interval_ms: 2_000,
            event_buffer: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LinkConfig::default();
        assert_eq!(config.device_name_substring, "esp32");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_channel_lookup() {
        let config = LinkConfig::default();
        assert_eq!(config.channel_for(&HEART_RATE_CHAR_UUID), Some(Channel::HeartRate));
        assert_eq!(config.channel_for(&EEG_CHAR_UUID), Some(Channel::Eeg));
        assert_eq!(config.channel_for(&SENSOR_SERVICE_UUID), None);
    }

    #[test]
    fn test_config_validation() {
        let config = LinkConfig {
            device_name_substring: "  ".to_string(),
            ..LinkConfig::default()
        };
        assert!(config.validate().is_err());

        let config = LinkConfig {
            eeg_uuid: HEART_RATE_CHAR_UUID,
            ..LinkConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_with_custom_name() {
        let config: LinkConfig = serde_json::from_str(r#"{ "device_name_substring": "Sensor" }"#).unwrap();
        assert_eq!(config.device_name_substring, "Sensor");
        assert_eq!(config.service_uuid, SENSOR_SERVICE_UUID);
    }
}
