//! Digital filters for EEG preprocessing
//!
//! Both filters keep their history across calls, so a stream cut into
//! consecutive windows is filtered exactly as if it were one long block.

use crate::config::ProcessingConfig;
use crate::processor::SignalFilter;
use neurotrack_core::{TrackerError, TrackerResult};
use std::f32::consts::PI;

fn check_frequency(parameter: &'static str, frequency: f32, sampling_rate: f32) -> TrackerResult<()> {
    if !(sampling_rate.is_finite() && sampling_rate > 0.0) {
        return Err(TrackerError::InvalidSamplingRate { rate: sampling_rate });
    }
    let nyquist = sampling_rate / 2.0;
    if !(frequency > 0.0 && frequency < nyquist) {
        return Err(TrackerError::InvalidFrequency { parameter, frequency, nyquist });
    }
    Ok(())
}

/// Single biquad section (2nd order), coefficients already divided by a0
#[derive(Debug, Clone, PartialEq)]
struct BiquadSection {
    // y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]
    b0: f32, b1: f32, b2: f32,
    a1: f32, a2: f32,
    x1: f32, x2: f32, // Input history
    y1: f32, y2: f32, // Output history
}

impl BiquadSection {
    fn process_sample(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1 - self.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

/// Notch filter for powerline interference removal
#[derive(Debug, Clone)]
pub struct NotchFilter {
    notch_freq: f32,
    q_factor: f32,
    sampling_rate: f32,
    biquad: BiquadSection,
}

impl NotchFilter {
    /// Create new notch filter centred on `notch_freq`
    pub fn new(notch_freq: f32, q_factor: f32, sampling_rate: f32) -> TrackerResult<Self> {
        check_frequency("notch frequency", notch_freq, sampling_rate)?;
        if !(q_factor > 0.0) {
            return Err(TrackerError::config("notch Q must be positive"));
        }

        let omega = 2.0 * PI * notch_freq / sampling_rate;
        let alpha = omega.sin() / (2.0 * q_factor);
        let cos_omega = omega.cos();

        let a0 = 1.0 + alpha;
        let biquad = BiquadSection {
            b0: 1.0 / a0,
            b1: -2.0 * cos_omega / a0,
            b2: 1.0 / a0,
            a1: -2.0 * cos_omega / a0,
            a2: (1.0 - alpha) / a0,
            x1: 0.0, x2: 0.0,
            y1: 0.0, y2: 0.0,
        };

        Ok(NotchFilter {
            notch_freq,
            q_factor,
            sampling_rate,
            biquad,
        })
    }

    pub fn notch_frequency(&self) -> f32 {
        self.notch_freq
    }

    pub fn q_factor(&self) -> f32 {
        self.q_factor
    }

    pub fn sampling_rate(&self) -> f32 {
        self.sampling_rate
    }
}

impl SignalFilter for NotchFilter {
    fn process_sample(&mut self, input: f32) -> f32 {
        self.biquad.process_sample(input)
    }

    fn reset(&mut self) {
        self.biquad.reset();
    }

    fn name(&self) -> &str {
        "Notch Filter"
    }
}

/// First-order high-pass for motion artifact and drift removal
#[derive(Debug, Clone)]
pub struct HighPassFilter {
    cutoff_freq: f32,
    alpha: f32,
    // (x[n-1], y[n-1]); None until the first sample, which passes through
    previous: Option<(f32, f32)>,
}

impl HighPassFilter {
    /// Create new high-pass filter
    pub fn new(cutoff_freq: f32, sampling_rate: f32) -> TrackerResult<Self> {
        check_frequency("high-pass cutoff", cutoff_freq, sampling_rate)?;

        let rc = 1.0 / (2.0 * PI * cutoff_freq);
        let dt = 1.0 / sampling_rate;

        Ok(HighPassFilter {
            cutoff_freq,
            alpha: dt / (rc + dt),
            previous: None,
        })
    }

    pub fn cutoff_frequency(&self) -> f32 {
        self.cutoff_freq
    }

    /// Smoothing coefficient `dt / (RC + dt)`
    pub fn alpha(&self) -> f32 {
        self.alpha
    }
}

impl SignalFilter for HighPassFilter {
    fn process_sample(&mut self, input: f32) -> f32 {
        let output = match self.previous {
            None => input,
            Some((prev_input, prev_output)) => self.alpha * (prev_output + input - prev_input),
        };
        self.previous = Some((input, output));
        output
    }

    fn reset(&mut self) {
        self.previous = None;
    }

    fn name(&self) -> &str {
        "High-pass Filter"
    }
}

/// Notch followed by high-pass, applied to each completed window
#[derive(Debug, Clone)]
pub struct FilterStage {
    notch: NotchFilter,
    highpass: HighPassFilter,
}

impl FilterStage {
    pub fn new(notch: NotchFilter, highpass: HighPassFilter) -> Self {
        FilterStage { notch, highpass }
    }

    /// Build the stage described by `config`
    pub fn from_config(config: &ProcessingConfig) -> TrackerResult<Self> {
        let notch = NotchFilter::new(config.notch_frequency, config.notch_q, config.sampling_rate)?;
        let highpass = HighPassFilter::new(config.highpass_cutoff, config.sampling_rate)?;
        Ok(Self::new(notch, highpass))
    }

    pub fn notch(&self) -> &NotchFilter {
        &self.notch
    }

    pub fn highpass(&self) -> &HighPassFilter {
        &self.highpass
    }
}

impl SignalFilter for FilterStage {
    fn process_sample(&mut self, input: f32) -> f32 {
        let notched = self.notch.process_sample(input);
        self.highpass.process_sample(notched)
    }

    fn reset(&mut self) {
        self.notch.reset();
        self.highpass.reset();
    }

    fn name(&self) -> &str {
        "Filter Stage"
    }
}
