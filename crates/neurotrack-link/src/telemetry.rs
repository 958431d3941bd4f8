//! Consumer-visible telemetry
//!
//! One writer ([`TelemetryPublisher`]) owned by the link service, any number
//! of readers ([`TelemetryHandle`]). The latest values live in a `watch`
//! cell so readers always see a consistent snapshot; link state changes are
//! additionally broadcast so no transition is missed.

use crate::state::LinkState;
use neurotrack_core::{AnnotationEntry, AnnotationSink, BandPowers, Channel, RawSample, TrackerResult};
use serde::Serialize;
use tokio::sync::{broadcast, watch};

const STATE_HISTORY: usize = 64;

/// Latest telemetry values
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    pub link_state: LinkState,
    /// Latest heart rate in beats per minute; `None` until the first reading
    pub heart_rate: Option<RawSample>,
    /// Most recent raw EEG sample
    pub eeg: Option<RawSample>,
    /// Band powers of the last completed window, zero until one completes
    pub band_powers: BandPowers,
    pub windows_completed: u64,
    /// Payloads that failed to decode
    pub dropped_payloads: u64,
    pub reconnect_attempts: u64,
}

/// Single writer side of the telemetry cell
pub struct TelemetryPublisher {
    snapshot: watch::Sender<TelemetrySnapshot>,
    states: broadcast::Sender<LinkState>,
    handle: TelemetryHandle,
}

impl TelemetryPublisher {
    pub fn new() -> Self {
        let (snapshot, receiver) = watch::channel(TelemetrySnapshot::default());
        let (states, _) = broadcast::channel(STATE_HISTORY);
        let handle = TelemetryHandle {
            snapshot: receiver,
            states: states.clone(),
        };

        TelemetryPublisher {
            snapshot,
            states,
            handle,
        }
    }

    /// New reader of this cell
    pub fn handle(&self) -> TelemetryHandle {
        self.handle.clone()
    }

    pub fn publish_link_state(&self, state: LinkState) {
        self.snapshot.send_modify(|s| s.link_state = state);
        // No subscribers is fine
        let _ = self.states.send(state);
    }

    /// Replace the latest reading of the sample's channel
    pub fn publish_sample(&self, sample: RawSample) {
        self.snapshot.send_modify(|s| match sample.channel {
            Channel::HeartRate => s.heart_rate = Some(sample),
            Channel::Eeg => s.eeg = Some(sample),
        });
    }

    /// Publish a completed window's band powers
    pub fn publish_band_powers(&self, powers: BandPowers) {
        self.snapshot.send_modify(|s| {
            s.band_powers = powers;
            s.windows_completed += 1;
        });
    }

    pub fn record_dropped_payload(&self) {
        self.snapshot.send_modify(|s| s.dropped_payloads += 1);
    }

    pub fn publish_reconnect_attempts(&self, attempts: u64) {
        self.snapshot.send_if_modified(|s| {
            let changed = s.reconnect_attempts != attempts;
            s.reconnect_attempts = attempts;
            changed
        });
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.snapshot.borrow().clone()
    }
}

impl Default for TelemetryPublisher {
    fn default() -> Self {
        Self::new()
    }
}

/// Read side of the telemetry cell, cheap to clone
#[derive(Clone)]
pub struct TelemetryHandle {
    snapshot: watch::Receiver<TelemetrySnapshot>,
    states: broadcast::Sender<LinkState>,
}

impl TelemetryHandle {
    /// Copy of the current values
    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn link_state(&self) -> LinkState {
        self.snapshot.borrow().link_state
    }

    pub fn heart_rate(&self) -> Option<f32> {
        self.latest(Channel::HeartRate).map(|s| s.value)
    }

    pub fn eeg(&self) -> Option<f32> {
        self.latest(Channel::Eeg).map(|s| s.value)
    }

    /// Latest reading of one channel, with its arrival time
    pub fn latest(&self, channel: Channel) -> Option<RawSample> {
        let snapshot = self.snapshot.borrow();
        match channel {
            Channel::HeartRate => snapshot.heart_rate,
            Channel::Eeg => snapshot.eeg,
        }
    }

    pub fn band_powers(&self) -> BandPowers {
        self.snapshot.borrow().band_powers
    }

    /// Receiver woken on every change
    pub fn watch(&self) -> watch::Receiver<TelemetrySnapshot> {
        self.snapshot.clone()
    }

    /// Every link state entered from now on, in order
    pub fn subscribe_link_states(&self) -> broadcast::Receiver<LinkState> {
        self.states.subscribe()
    }

    /// Record a note together with the current band powers
    pub fn annotate(&self, sink: &dyn AnnotationSink, description: impl Into<String>) -> TrackerResult<AnnotationEntry> {
        let entry = AnnotationEntry::new(self.band_powers(), description);
        sink.append(entry.clone())?;
        tracing::info!(id = %entry.id, description = %entry.description, "annotation recorded");
        Ok(entry)
    }
}
