//! Raw telemetry samples and the channels they arrive on

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch, saturating to zero on a clock before 1970.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Source channel of a telemetry value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Heart rate in beats per minute
    HeartRate,
    /// Single raw EEG sample
    Eeg,
}

impl Channel {
    /// Short lowercase label used in log fields
    pub fn label(&self) -> &'static str {
        match self {
            Channel::HeartRate => "heart_rate",
            Channel::Eeg => "eeg",
        }
    }
}

/// A single decoded scalar reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Channel the value arrived on
    pub channel: Channel,
    /// Decoded value
    pub value: f32,
    /// Arrival time, milliseconds since Unix epoch
    pub timestamp: u64,
}

impl RawSample {
    /// Create a sample stamped with the current wall clock
    pub fn new(channel: Channel, value: f32) -> Self {
        Self::at(channel, value, now_millis())
    }

    /// Create a sample with an explicit arrival time
    pub fn at(channel: Channel, value: f32, timestamp: u64) -> Self {
        RawSample { channel, value, timestamp }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_creation() {
        let before = now_millis();
        let sample = RawSample::new(Channel::Eeg, 12.5);
        assert_eq!(sample.channel, Channel::Eeg);
        assert_eq!(sample.value, 12.5);
        assert!(sample.timestamp >= before);
    }

    #[test]
    fn test_channel_labels() {
        assert_eq!(Channel::HeartRate.label(), "heart_rate");
        assert_eq!(Channel::Eeg.label(), "eeg");
    }
}
