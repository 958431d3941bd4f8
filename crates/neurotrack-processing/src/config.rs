//! Configuration management for EEG band-power processing

use neurotrack_core::{TrackerError, TrackerResult};
use serde::{Deserialize, Serialize};

/// Parameters of the filter stage, sample buffer and spectral analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// EEG sampling rate in Hz
    pub sampling_rate: f32,
    /// Powerline interference frequency removed by the notch filter (Hz)
    pub notch_frequency: f32,
    /// Notch quality factor
    pub notch_q: f32,
    /// High-pass cutoff frequency (Hz)
    pub highpass_cutoff: f32,
    /// Samples per analysis window
    pub window_size: usize,
    /// Transform size the window is zero-padded to, power of two
    pub fft_size: usize,
}

impl ProcessingConfig {
    /// 60 Hz mains, the sensor firmware's default
    pub fn north_america() -> Self {
        ProcessingConfig {
            sampling_rate: 250.0,
            notch_frequency: 60.0,
            notch_q: 30.0,
            highpass_cutoff: 1.0,
            window_size: 64,
            fft_size: 256,
        }
    }

    /// 50 Hz mains
    pub fn europe() -> Self {
        ProcessingConfig {
            notch_frequency: 50.0,
            ..Self::north_america()
        }
    }

    /// Nyquist frequency for the configured sampling rate
    pub fn nyquist(&self) -> f32 {
        self.sampling_rate / 2.0
    }

    /// Frequency spacing between FFT bins
    pub fn bin_resolution(&self) -> f32 {
        self.sampling_rate / self.fft_size as f32
    }

    /// Validate configuration
    pub fn validate(&self) -> TrackerResult<()> {
        if !(self.sampling_rate.is_finite() && self.sampling_rate > 0.0) {
            return Err(TrackerError::InvalidSamplingRate { rate: self.sampling_rate });
        }

        let nyquist = self.nyquist();
        for (parameter, frequency) in [
            ("notch frequency", self.notch_frequency),
            ("high-pass cutoff", self.highpass_cutoff),
        ] {
            if !(frequency > 0.0 && frequency < nyquist) {
                return Err(TrackerError::InvalidFrequency { parameter, frequency, nyquist });
            }
        }

        if !(self.notch_q > 0.0) {
            return Err(TrackerError::config("notch Q must be positive"));
        }

        if self.window_size == 0 {
            return Err(TrackerError::config("window size must be greater than 0"));
        }

        if !self.fft_size.is_power_of_two() || self.fft_size < 2 {
            return Err(TrackerError::config(format!(
                "FFT size {} is not a power of two",
                self.fft_size
            )));
        }

        if self.window_size > self.fft_size {
            return Err(TrackerError::WindowTooLong {
                window: self.window_size,
                fft_size: self.fft_size,
            });
        }

        Ok(())
    }

    /// Export configuration to JSON
    pub fn to_json(&self) -> TrackerResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Import configuration from JSON; omitted fields take their defaults
    pub fn from_json(json: &str) -> TrackerResult<Self> {
        let config: ProcessingConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self::north_america()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProcessingConfig::default();
        assert_eq!(config.sampling_rate, 250.0);
        assert_eq!(config.notch_frequency, 60.0);
        assert_eq!(config.window_size, 64);
        assert_eq!(config.fft_size, 256);
        assert!(config.validate().is_ok());
        assert!((config.bin_resolution() - 0.9765625).abs() < 1e-6);
    }

    #[test]
    fn test_europe_preset() {
        let config = ProcessingConfig::europe();
        assert_eq!(config.notch_frequency, 50.0);
        assert_eq!(config.sampling_rate, 250.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ProcessingConfig::default();
        config.fft_size = 200;
        assert!(config.validate().is_err());

        let mut config = ProcessingConfig::default();
        config.window_size = 512;
        assert!(matches!(config.validate(), Err(TrackerError::WindowTooLong { .. })));

        let mut config = ProcessingConfig::default();
        config.notch_frequency = 130.0;
        assert!(matches!(config.validate(), Err(TrackerError::InvalidFrequency { .. })));

        let mut config = ProcessingConfig::default();
        config.sampling_rate = 0.0;
        assert!(matches!(config.validate(), Err(TrackerError::InvalidSamplingRate { .. })));
    }

    #[test]
    fn test_json_serialization() {
        let config = ProcessingConfig::europe();
        let json = config.to_json().unwrap();
        let restored = ProcessingConfig::from_json(&json).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ProcessingConfig::from_json(r#"{ "notch_frequency": 50.0 }"#).unwrap();
        assert_eq!(config.notch_frequency, 50.0);
        assert_eq!(config.window_size, 64);

        assert!(ProcessingConfig::from_json(r#"{ "fft_size": 100 }"#).is_err());
    }
}
