//! NeuroTrack-Processing: EEG band-power pipeline
//!
//! Notch and high-pass filtering, fixed-size sample windows, and FFT-based
//! Delta/Theta/Alpha/Beta/Gamma band powers.

pub mod buffer;
pub mod config;
pub mod filters;
pub mod pipeline;
pub mod processor;
pub mod spectral;

pub use buffer::{SampleBuffer, Window};
pub use config::ProcessingConfig;
pub use filters::{FilterStage, HighPassFilter, NotchFilter};
pub use pipeline::BandPowerPipeline;
pub use processor::{ProcessingMetrics, ProcessingTimer, SignalFilter};
pub use spectral::{aggregate_bands, SpectralAnalyzer};
