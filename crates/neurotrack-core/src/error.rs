//! Error handling for NeuroTrack
//!
//! One error type shared by the processing, link and simulation crates.
//! Radio backends and the monitor binary wrap foreign errors with `anyhow`
//! at their edges and convert into this type where they cross into the core.

use core::fmt;

/// Result type alias for NeuroTrack operations
pub type TrackerResult<T> = Result<T, TrackerError>;

/// Error type for all NeuroTrack operations
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum TrackerError {
    /// Invalid configuration value
    InvalidConfig {
        /// Description of the configuration error
        reason: String,
    },

    /// Sampling rate outside the supported range
    InvalidSamplingRate {
        /// Provided sampling rate
        rate: f32,
    },

    /// Filter or band frequency that cannot be realised at the sampling rate
    InvalidFrequency {
        /// Which frequency parameter is wrong
        parameter: &'static str,
        /// Provided frequency in Hz
        frequency: f32,
        /// Nyquist frequency in Hz
        nyquist: f32,
    },

    /// Analysis window longer than the transform size
    WindowTooLong {
        /// Window length in samples
        window: usize,
        /// Transform size in samples
        fft_size: usize,
    },

    /// Notification payload could not be decoded into a scalar
    Decode {
        /// Description of the decode failure
        reason: String,
    },

    /// Wireless link operation failed
    Link {
        /// Link-level error description
        reason: String,
    },

    /// No usable wireless adapter
    AdapterUnavailable,

    /// File or stream I/O failed
    Io {
        /// I/O error description
        reason: String,
    },

    /// Serialization/deserialization error
    Serialization {
        /// Serialization error description
        reason: String,
    },
}

impl TrackerError {
    /// Shorthand for configuration errors
    pub fn config(reason: impl Into<String>) -> Self {
        TrackerError::InvalidConfig { reason: reason.into() }
    }

    /// Shorthand for link errors
    pub fn link(reason: impl Into<String>) -> Self {
        TrackerError::Link { reason: reason.into() }
    }
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerError::InvalidConfig { reason } => {
                write!(f, "Invalid configuration: {}", reason)
            }
            TrackerError::InvalidSamplingRate { rate } => {
                write!(f, "Invalid sampling rate: {}Hz", rate)
            }
            TrackerError::InvalidFrequency { parameter, frequency, nyquist } => {
                write!(f, "Invalid {}: {}Hz, must be in (0, {}Hz)",
                       parameter, frequency, nyquist)
            }
            TrackerError::WindowTooLong { window, fft_size } => {
                write!(f, "Window of {} samples exceeds transform size {}",
                       window, fft_size)
            }
            TrackerError::Decode { reason } => {
                write!(f, "Decode error: {}", reason)
            }
            TrackerError::Link { reason } => {
                write!(f, "Link error: {}", reason)
            }
            TrackerError::AdapterUnavailable => {
                write!(f, "Wireless adapter unavailable")
            }
            TrackerError::Io { reason } => {
                write!(f, "I/O error: {}", reason)
            }
            TrackerError::Serialization { reason } => {
                write!(f, "Serialization error: {}", reason)
            }
        }
    }
}

impl std::error::Error for TrackerError {}

impl From<std::io::Error> for TrackerError {
    fn from(err: std::io::Error) -> Self {
        TrackerError::Io { reason: err.to_string() }
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        TrackerError::Serialization { reason: err.to_string() }
    }
}
