//! Simulated ESP32 sensor signals: raw EEG and heart rate

use crate::signal_patterns::EegPattern;
use neurotrack_core::{TrackerError, TrackerResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Noise configuration for realistic EEG simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Gaussian noise standard deviation in microvolts (0.0 = no noise)
    pub gaussian_std: f32,
    /// Slow baseline drift amplitude
    pub baseline_drift: f32,
    /// Baseline drift frequency in Hz
    pub drift_frequency: f32,
    /// Power line interference amplitude
    pub powerline_amplitude: f32,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            gaussian_std: 0.2,
            baseline_drift: 5.0,
            drift_frequency: 0.1,
            powerline_amplitude: 3.0,
        }
    }
}

impl NoiseConfig {
    /// No noise at all
    pub fn clean() -> Self {
        Self {
            gaussian_std: 0.0,
            baseline_drift: 0.0,
            drift_frequency: 0.1,
            powerline_amplitude: 0.0,
        }
    }
}

/// Configuration for the simulated sensor board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Advertised name of the sensor
    pub device_name: String,
    /// Other devices advertising nearby
    pub decoy_names: Vec<String>,
    /// Also advertise a device without a name
    pub advertise_nameless: bool,
    /// Re-advertise this often while scanning
    pub advertise_interval_ms: u64,
    /// EEG sampling rate in Hz
    pub sampling_rate: f32,
    /// Rhythm content of the EEG signal
    pub pattern: EegPattern,
    pub noise: NoiseConfig,
    /// Power line frequency (50/60 Hz), `None` for none
    pub powerline_frequency: Option<f32>,
    /// Resting heart rate in beats per minute
    pub heart_rate_bpm: f32,
    /// Beat-to-beat standard deviation
    pub heart_rate_variability: f32,
    /// Heart-rate notification period
    pub heart_rate_interval_ms: u64,
    /// Drop the link this long after each connection
    pub drop_link_every_secs: Option<f32>,
    /// Chance that a notification carries `"N/A"` instead of a number
    pub malformed_probability: f32,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            device_name: "ESP32_Sensor".to_string(),
            decoy_names: vec!["Fitbit Charge 5".to_string(), "JBL Flip 6".to_string()],
            advertise_nameless: true,
            advertise_interval_ms: 500,
            sampling_rate: 250.0,
            pattern: EegPattern::Relaxed,
            noise: NoiseConfig::default(),
            powerline_frequency: Some(60.0),
            heart_rate_bpm: 72.0,
            heart_rate_variability: 2.0,
            heart_rate_interval_ms: 1000,
            drop_link_every_secs: None,
            malformed_probability: 0.0,
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Validate configuration
    pub fn validate(&self) -> TrackerResult<()> {
        if !(self.sampling_rate.is_finite() && self.sampling_rate > 0.0) {
            return Err(TrackerError::InvalidSamplingRate {
                rate: self.sampling_rate,
            });
        }
        if self.device_name.is_empty() {
            return Err(TrackerError::config("device name cannot be empty"));
        }
        if !(0.0..=1.0).contains(&self.malformed_probability) {
            return Err(TrackerError::config("malformed probability must be within 0..=1"));
        }
        if self.heart_rate_interval_ms == 0 || self.advertise_interval_ms == 0 {
            return Err(TrackerError::config("notification intervals must be greater than 0"));
        }
        if !(self.noise.gaussian_std >= 0.0 && self.heart_rate_variability >= 0.0) {
            return Err(TrackerError::config("standard deviations cannot be negative"));
        }
        if let Some(secs) = self.drop_link_every_secs {
            if !(secs.is_finite() && secs > 0.0) {
                return Err(TrackerError::config("link drop period must be positive"));
            }
        }
        Ok(())
    }
}

/// EEG and heart-rate signal generator
pub struct EegSimulator {
    config: SimulationConfig,
    rng: StdRng,
    eeg_noise: Normal<f32>,
    beat_noise: Normal<f32>,
    samples_generated: u64,
}

impl EegSimulator {
    /// Create new simulator with configuration
    pub fn new(config: SimulationConfig) -> TrackerResult<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let eeg_noise = Normal::new(0.0, config.noise.gaussian_std)
            .map_err(|e| TrackerError::config(format!("EEG noise distribution: {}", e)))?;
        let beat_noise = Normal::new(0.0, config.heart_rate_variability)
            .map_err(|e| TrackerError::config(format!("heart-rate distribution: {}", e)))?;

        Ok(EegSimulator {
            config,
            rng,
            eeg_noise,
            beat_noise,
            samples_generated: 0,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Seconds of EEG generated so far
    pub fn elapsed(&self) -> f32 {
        self.samples_generated as f32 / self.config.sampling_rate
    }

    /// Next raw EEG sample
    pub fn next_eeg(&mut self) -> f32 {
        let time = self.elapsed();
        self.samples_generated += 1;

        let mut value = self.config.pattern.value_at(time);
        value += self.eeg_noise.sample(&mut self.rng);

        let noise = &self.config.noise;
        value += noise.baseline_drift * (2.0 * PI * noise.drift_frequency * time).sin();
        if let Some(frequency) = self.config.powerline_frequency {
            value += noise.powerline_amplitude * (2.0 * PI * frequency * time).sin();
        }
        value
    }

    /// Next heart-rate reading in beats per minute
    pub fn next_heart_rate(&mut self) -> f32 {
        (self.config.heart_rate_bpm + self.beat_noise.sample(&mut self.rng)).max(30.0)
    }

    /// Next EEG notification payload as the board formats it
    pub fn eeg_payload(&mut self) -> Vec<u8> {
        let value = self.next_eeg();
        if self.malformed() {
            return b"N/A".to_vec();
        }
        format!("{:.3}", value).into_bytes()
    }

    /// Next heart-rate notification payload
    pub fn heart_rate_payload(&mut self) -> Vec<u8> {
        let bpm = self.next_heart_rate();
        if self.malformed() {
            return b"N/A".to_vec();
        }
        format!("{:.0}", bpm).into_bytes()
    }

    fn malformed(&mut self) -> bool {
        self.config.malformed_probability > 0.0 && self.rng.gen::<f32>() < self.config.malformed_probability
    }
}
