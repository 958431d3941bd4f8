//! Spectral analysis: zero-padded FFT magnitudes aggregated into EEG bands

use crate::config::ProcessingConfig;
use neurotrack_core::{Band, BandPowers, TrackerError, TrackerResult};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Sum bin magnitudes into bands by bin centre frequency
///
/// Bin `k` sits at `k * bin_resolution` Hz. Bins outside every band
/// (DC, anything under 0.5 Hz, 100 Hz and up) are dropped.
pub fn aggregate_bands(magnitudes: &[f32], bin_resolution: f32) -> BandPowers {
    let mut powers = BandPowers::new();
    for (k, &magnitude) in magnitudes.iter().enumerate() {
        if let Some(band) = Band::for_frequency(k as f32 * bin_resolution) {
            powers.accumulate(band, magnitude);
        }
    }
    powers
}

/// Fixed-size FFT band-power analyzer
///
/// Holds only the planned transform and a scratch buffer that is fully
/// overwritten on every call; no signal history is carried between windows.
pub struct SpectralAnalyzer {
    fft_size: usize,
    sampling_rate: f32,
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
}

impl SpectralAnalyzer {
    /// Plan a forward FFT of `fft_size` points (power of two)
    pub fn new(fft_size: usize, sampling_rate: f32) -> TrackerResult<Self> {
        if !fft_size.is_power_of_two() || fft_size < 2 {
            return Err(TrackerError::config(format!("FFT size {} is not a power of two", fft_size)));
        }
        if !(sampling_rate.is_finite() && sampling_rate > 0.0) {
            return Err(TrackerError::InvalidSamplingRate { rate: sampling_rate });
        }

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);

        Ok(SpectralAnalyzer {
            fft_size,
            sampling_rate,
            fft,
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
        })
    }

    pub fn from_config(config: &ProcessingConfig) -> TrackerResult<Self> {
        Self::new(config.fft_size, config.sampling_rate)
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Frequency spacing between bins
    pub fn bin_resolution(&self) -> f32 {
        self.sampling_rate / self.fft_size as f32
    }

    /// Normalised magnitude `|X[k]| * 2 / N` of the first N/2 bins
    ///
    /// `window` is zero-padded to the transform size; longer windows are rejected.
    pub fn magnitudes(&mut self, window: &[f32]) -> TrackerResult<Vec<f32>> {
        if window.len() > self.fft_size {
            return Err(TrackerError::WindowTooLong {
                window: window.len(),
                fft_size: self.fft_size,
            });
        }

        for (slot, &x) in self.buffer.iter_mut().zip(window.iter()) {
            *slot = Complex::new(x, 0.0);
        }
        for slot in self.buffer[window.len()..].iter_mut() {
            *slot = Complex::new(0.0, 0.0);
        }

        self.fft.process(&mut self.buffer);

        // Real input: bins above N/2 mirror the lower half
        let scale = 2.0 / self.fft_size as f32;
        Ok(self.buffer[..self.fft_size / 2]
            .iter()
            .map(|c| c.norm() * scale)
            .collect())
    }

    /// Band powers of one filtered window
    pub fn analyze(&mut self, window: &[f32]) -> TrackerResult<BandPowers> {
        let magnitudes = self.magnitudes(window)?;
        Ok(aggregate_bands(&magnitudes, self.bin_resolution()))
    }
}
