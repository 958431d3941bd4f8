//! NeuroTrack-Core: Foundation types for biometric telemetry
//!
//! Samples, EEG bands, peripheral identities, annotations and the shared
//! error type used by every other crate in the workspace.

pub mod annotation;
pub mod bands;
pub mod error;
pub mod peripheral;
pub mod sample;

pub use annotation::{AnnotationEntry, AnnotationSink, InMemoryAnnotationLog, JsonLinesAnnotationLog};
pub use bands::{Band, BandPowers};
pub use error::{TrackerError, TrackerResult};
pub use peripheral::PeripheralIdentity;
pub use sample::{now_millis, Channel, RawSample};
