//! Pre-defined EEG rhythm patterns for realistic simulation

use neurotrack_core::Band;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// One sinusoidal rhythm component
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rhythm {
    /// Frequency in Hz
    pub frequency: f32,
    /// Peak amplitude in microvolts
    pub amplitude: f32,
}

impl Rhythm {
    pub fn new(frequency: f32, amplitude: f32) -> Self {
        Rhythm { frequency, amplitude }
    }

    pub fn value_at(&self, time: f32) -> f32 {
        self.amplitude * (2.0 * PI * self.frequency * time).sin()
    }
}

/// Mental-state patterns, each dominated by one EEG band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EegPattern {
    /// Eyes closed, awake: strong alpha
    Relaxed,
    /// Active concentration: beta
    Focused,
    /// Light sleep onset: theta
    Drowsy,
    /// Slow-wave sleep: delta
    DeepSleep,
    /// Arbitrary mix of rhythms
    Custom(Vec<Rhythm>),
}

impl EegPattern {
    /// Rhythm components of this pattern
    pub fn rhythms(&self) -> Vec<Rhythm> {
        match self {
            EegPattern::Relaxed => vec![Rhythm::new(10.0, 20.0), Rhythm::new(6.0, 2.0)],
            EegPattern::Focused => vec![Rhythm::new(20.0, 12.0), Rhythm::new(10.0, 2.0)],
            EegPattern::Drowsy => vec![Rhythm::new(6.0, 25.0), Rhythm::new(2.0, 4.0)],
            EegPattern::DeepSleep => vec![Rhythm::new(2.0, 60.0)],
            EegPattern::Custom(rhythms) => rhythms.clone(),
        }
    }

    /// Noise-free value at `time` seconds
    pub fn value_at(&self, time: f32) -> f32 {
        self.rhythms().iter().map(|r| r.value_at(time)).sum()
    }

    /// Band of the strongest rhythm
    pub fn dominant_band(&self) -> Option<Band> {
        self.rhythms()
            .iter()
            .max_by(|a, b| a.amplitude.total_cmp(&b.amplitude))
            .and_then(|r| Band::for_frequency(r.frequency))
    }

    /// Get pattern description
    pub fn description(&self) -> &'static str {
        match self {
            EegPattern::Relaxed => "Relaxed, eyes closed",
            EegPattern::Focused => "Focused attention",
            EegPattern::Drowsy => "Drowsy",
            EegPattern::DeepSleep => "Deep sleep",
            EegPattern::Custom(_) => "Custom rhythms",
        }
    }

    /// Named presets
    pub fn presets() -> Vec<(&'static str, EegPattern)> {
        vec![
            ("relaxed", EegPattern::Relaxed),
            ("focused", EegPattern::Focused),
            ("drowsy", EegPattern::Drowsy),
            ("deep-sleep", EegPattern::DeepSleep),
        ]
    }
}

impl Default for EegPattern {
    fn default() -> Self {
        EegPattern::Relaxed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_dominant_bands() {
        assert_eq!(EegPattern::Relaxed.dominant_band(), Some(Band::Alpha));
        assert_eq!(EegPattern::Focused.dominant_band(), Some(Band::Beta));
        assert_eq!(EegPattern::Drowsy.dominant_band(), Some(Band::Theta));
        assert_eq!(EegPattern::DeepSleep.dominant_band(), Some(Band::Delta));
        assert_eq!(EegPattern::Custom(Vec::new()).dominant_band(), None);
    }

    #[test]
    fn test_value_is_sum_of_rhythms() {
        let pattern = EegPattern::Custom(vec![Rhythm::new(1.0, 2.0), Rhythm::new(2.0, 1.0)]);
        // sin(pi/2) * 2 + sin(pi) * 1
        assert!((pattern.value_at(0.25) - 2.0).abs() < 1e-5);
        assert_eq!(pattern.value_at(0.0), 0.0);
    }

    #[test]
    fn test_pattern_json() {
        let json = serde_json::to_string(&EegPattern::Custom(vec![Rhythm::new(10.0, 5.0)])).unwrap();
        let back: EegPattern = serde_json::from_str(&json).unwrap();
        assert_eq!(back.rhythms(), vec![Rhythm::new(10.0, 5.0)]);
        assert_eq!(serde_json::from_str::<EegPattern>("\"Relaxed\"").unwrap(), EegPattern::Relaxed);
    }
}
