//! Per-window band-power pipeline: filter stage, then spectral analysis

use crate::config::ProcessingConfig;
use crate::filters::FilterStage;
use crate::processor::{ProcessingMetrics, SignalFilter};
use crate::spectral::SpectralAnalyzer;
use neurotrack_core::{BandPowers, TrackerResult};

/// Turns completed EEG windows into band powers
///
/// Filter history carries over from one window to the next; the analyzer
/// itself is stateless.
pub struct BandPowerPipeline {
    config: ProcessingConfig,
    filters: FilterStage,
    analyzer: SpectralAnalyzer,
    last_metrics: Option<ProcessingMetrics>,
    windows_processed: u64,
}

impl BandPowerPipeline {
    /// Build a pipeline from a validated configuration
    pub fn new(config: ProcessingConfig) -> TrackerResult<Self> {
        config.validate()?;
        let filters = FilterStage::from_config(&config)?;
        let analyzer = SpectralAnalyzer::from_config(&config)?;

        Ok(BandPowerPipeline {
            config,
            filters,
            analyzer,
            last_metrics: None,
            windows_processed: 0,
        })
    }

    /// Filter one window and compute its band powers
    pub fn process_window(&mut self, window: &[f32]) -> TrackerResult<BandPowers> {
        let timer = ProcessingMetrics::start_timing(window.len());

        let filtered = self.filters.process(window);
        let powers = match self.analyzer.analyze(&filtered) {
            Ok(powers) => powers,
            Err(e) => {
                self.last_metrics = Some(timer.finish_with_error(&e.to_string()));
                return Err(e);
            }
        };

        let metrics = timer.finish();
        self.windows_processed += 1;
        tracing::debug!(
            window = self.windows_processed,
            samples = window.len(),
            latency_us = metrics.processing_time_us,
            dominant = ?powers.dominant(),
            "window processed"
        );
        self.last_metrics = Some(metrics);

        Ok(powers)
    }

    /// Clear filter history
    pub fn reset(&mut self) {
        self.filters.reset();
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    /// Timing of the most recent window
    pub fn last_metrics(&self) -> Option<&ProcessingMetrics> {
        self.last_metrics.as_ref()
    }

    pub fn windows_processed(&self) -> u64 {
        self.windows_processed
    }
}
