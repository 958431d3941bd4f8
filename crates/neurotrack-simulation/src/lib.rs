//! NeuroTrack-Simulation: a simulated ESP32 sensor board
//!
//! Generates EEG and heart-rate signals and serves them through the radio
//! backend interface, so the whole link can run without hardware.

pub mod eeg_simulator;
pub mod signal_patterns;
pub mod simulated_radio;

pub use eeg_simulator::{EegSimulator, NoiseConfig, SimulationConfig};
pub use signal_patterns::{EegPattern, Rhythm};
pub use simulated_radio::{SimulatedRadio, SIMULATED_ADDRESS};
