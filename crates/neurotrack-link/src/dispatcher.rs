//! Notification payload decoding and routing
//!
//! Heart-rate readings go straight to telemetry. EEG samples are published
//! raw, accumulated into windows, and every completed window runs through
//! the band-power pipeline before its result is published.

use crate::telemetry::TelemetryPublisher;
use neurotrack_core::{now_millis, BandPowers, Channel, RawSample, TrackerError, TrackerResult};
use neurotrack_processing::{BandPowerPipeline, ProcessingConfig, SampleBuffer};
use tracing::{debug, warn};

/// Decode a UTF-8 decimal payload such as `b"72"` or `b" -13.25\n"`
pub fn decode_scalar(payload: &[u8]) -> TrackerResult<f32> {
    let text = std::str::from_utf8(payload).map_err(|e| TrackerError::Decode {
        reason: format!("payload is not UTF-8: {}", e),
    })?;
    let trimmed = text.trim();

    let value: f32 = trimmed.parse().map_err(|_| TrackerError::Decode {
        reason: format!("'{}' is not a number", trimmed),
    })?;
    if !value.is_finite() {
        return Err(TrackerError::Decode {
            reason: format!("'{}' is not finite", trimmed),
        });
    }
    Ok(value)
}

/// What happened to one payload
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Undecodable; nothing changed
    Dropped,
    HeartRate(RawSample),
    /// `window` holds band powers when this sample completed a window
    Eeg { sample: RawSample, window: Option<BandPowers> },
}

/// Owns the EEG buffer, the pipeline and the telemetry writer
pub struct TelemetryDispatcher {
    buffer: SampleBuffer,
    pipeline: BandPowerPipeline,
    publisher: TelemetryPublisher,
}

impl TelemetryDispatcher {
    pub fn new(config: ProcessingConfig, publisher: TelemetryPublisher) -> TrackerResult<Self> {
        let buffer = SampleBuffer::new(config.window_size);
        let pipeline = BandPowerPipeline::new(config)?;

        Ok(TelemetryDispatcher {
            buffer,
            pipeline,
            publisher,
        })
    }

    pub fn publisher(&self) -> &TelemetryPublisher {
        &self.publisher
    }

    /// EEG samples waiting for the current window
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Decode, publish and, for EEG, feed the window pipeline
    ///
    /// The payload is stamped as arriving now.
    pub fn on_notification(&mut self, channel: Channel, payload: &[u8]) -> DispatchOutcome {
        self.on_notification_at(channel, payload, now_millis())
    }

    /// [`on_notification`](Self::on_notification) with an explicit arrival time in ms since the epoch
    pub fn on_notification_at(&mut self, channel: Channel, payload: &[u8], received_at: u64) -> DispatchOutcome {
        let value = match decode_scalar(payload) {
            Ok(value) => value,
            Err(e) => {
                warn!(channel = channel.label(), error = %e, "dropping payload");
                self.publisher.record_dropped_payload();
                return DispatchOutcome::Dropped;
            }
        };

        let sample = RawSample::at(channel, value, received_at);
        self.publisher.publish_sample(sample);

        match channel {
            Channel::HeartRate => DispatchOutcome::HeartRate(sample),
            Channel::Eeg => {
                let window = self.buffer.push(value).and_then(|window| {
                    match self.pipeline.process_window(&window.samples) {
                        Ok(powers) => {
                            debug!(sequence = window.sequence, %powers, "band powers");
                            self.publisher.publish_band_powers(powers);
                            Some(powers)
                        }
                        Err(e) => {
                            warn!(sequence = window.sequence, error = %e, "window discarded");
                            None
                        }
                    }
                });
                DispatchOutcome::Eeg { sample, window }
            }
        }
    }

    /// Forget buffered samples and filter history
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.pipeline.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurotrack_core::Band;
    use std::f32::consts::PI;

    fn dispatcher() -> TelemetryDispatcher {
        TelemetryDispatcher::new(ProcessingConfig::default(), TelemetryPublisher::new()).unwrap()
    }

    #[test]
    fn test_decode_scalar() {
        assert_eq!(decode_scalar(b"72").unwrap(), 72.0);
        assert_eq!(decode_scalar(b" -13.25\n").unwrap(), -13.25);
        assert!(decode_scalar(b"N/A").is_err());
        assert!(decode_scalar(b"").is_err());
        assert!(decode_scalar(b"inf").is_err());
        assert!(decode_scalar(b"NaN").is_err());
        assert!(decode_scalar(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_heart_rate_published_directly() {
        let mut dispatcher = dispatcher();
        let handle = dispatcher.publisher().handle();

        assert_eq!(
            dispatcher.on_notification_at(Channel::HeartRate, b"72", 1_700_000_000_000),
            DispatchOutcome::HeartRate(RawSample::at(Channel::HeartRate, 72.0, 1_700_000_000_000))
        );
        assert_eq!(handle.heart_rate(), Some(72.0));
        assert_eq!(handle.latest(Channel::HeartRate).unwrap().timestamp, 1_700_000_000_000);
        assert_eq!(dispatcher.buffered(), 0);
    }

    #[test]
    fn test_samples_are_stamped_on_arrival() {
        let mut dispatcher = dispatcher();
        let handle = dispatcher.publisher().handle();

        let before = now_millis();
        let outcome = dispatcher.on_notification(Channel::Eeg, b"-4.5");
        let after = now_millis();

        let sample = match outcome {
            DispatchOutcome::Eeg { sample, window: None } => sample,
            other => panic!("expected a buffered EEG sample, got {:?}", other),
        };
        assert_eq!(sample.channel, Channel::Eeg);
        assert_eq!(sample.value, -4.5);
        assert!(sample.timestamp >= before && sample.timestamp <= after);
        assert_eq!(handle.latest(Channel::Eeg), Some(sample));
        assert_eq!(handle.latest(Channel::HeartRate), None);
    }

    #[test]
    fn test_malformed_eeg_changes_nothing() {
        let mut dispatcher = dispatcher();
        let handle = dispatcher.publisher().handle();
        for _ in 0..10 {
            dispatcher.on_notification(Channel::Eeg, b"1.0");
        }

        assert_eq!(dispatcher.on_notification(Channel::Eeg, b"N/A"), DispatchOutcome::Dropped);
        assert_eq!(dispatcher.buffered(), 10);
        assert_eq!(handle.band_powers(), BandPowers::default());
        assert_eq!(handle.eeg(), Some(1.0));
        assert_eq!(handle.snapshot().dropped_payloads, 1);
    }

    #[test]
    fn test_sixty_fourth_sample_completes_window() {
        let mut dispatcher = dispatcher();
        let handle = dispatcher.publisher().handle();

        for i in 0..63 {
            let value = (2.0 * PI * 10.0 * i as f32 / 250.0).sin();
            let outcome = dispatcher.on_notification(Channel::Eeg, format!("{:.5}", value).as_bytes());
            assert!(matches!(outcome, DispatchOutcome::Eeg { window: None, .. }));
        }

        let value = (2.0 * PI * 10.0 * 63.0 / 250.0).sin();
        let outcome = dispatcher.on_notification(Channel::Eeg, format!("{:.5}", value).as_bytes());
        let powers = match outcome {
            DispatchOutcome::Eeg { window: Some(powers), .. } => powers,
            other => panic!("expected a completed window, got {:?}", other),
        };

        assert_eq!(powers.dominant(), Some(Band::Alpha));
        assert_eq!(handle.band_powers(), powers);
        assert_eq!(handle.snapshot().windows_completed, 1);
        assert_eq!(dispatcher.buffered(), 0);
    }

    #[test]
    fn test_reset_discards_partial_window() {
        let mut dispatcher = dispatcher();
        dispatcher.on_notification(Channel::Eeg, b"2.0");
        dispatcher.reset();
        assert_eq!(dispatcher.buffered(), 0);
    }
}
