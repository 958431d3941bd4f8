//! Core filter trait and processing metrics

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Stateful sample-by-sample filter
///
/// Implementations keep their own history; consecutive calls to
/// [`SignalFilter::process`] continue where the previous call stopped.
pub trait SignalFilter: Send {
    /// Filter a single sample
    fn process_sample(&mut self, input: f32) -> f32;

    /// Filter a block left to right, returning a block of the same length
    fn process(&mut self, input: &[f32]) -> Vec<f32> {
        input.iter().map(|&x| self.process_sample(x)).collect()
    }

    /// Restore the initial (empty) history
    fn reset(&mut self);

    /// Get filter name/identifier
    fn name(&self) -> &str;
}

/// Performance metrics for one processed window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingMetrics {
    /// Actual processing time in microseconds
    pub processing_time_us: u64,
    /// Samples in the processed window
    pub samples: usize,
    /// Success/failure status
    pub success: bool,
    /// Error message if processing failed
    pub error_message: Option<String>,
}

impl ProcessingMetrics {
    /// Start timing a processing operation
    pub fn start_timing(samples: usize) -> ProcessingTimer {
        ProcessingTimer {
            start_time: Instant::now(),
            samples,
        }
    }
}

/// Helper for timing processing operations
pub struct ProcessingTimer {
    start_time: Instant,
    samples: usize,
}

impl ProcessingTimer {
    /// Finish timing and return metrics
    pub fn finish(self) -> ProcessingMetrics {
        ProcessingMetrics {
            processing_time_us: self.start_time.elapsed().as_micros() as u64,
            samples: self.samples,
            success: true,
            error_message: None,
        }
    }

    /// Finish with error
    pub fn finish_with_error(self, error: &str) -> ProcessingMetrics {
        ProcessingMetrics {
            success: false,
            error_message: Some(error.to_string()),
            ..self.finish()
        }
    }
}
