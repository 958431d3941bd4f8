//! Link service: drives the state machine from radio events and control requests

use crate::backend::RadioBackend;
use crate::config::LinkConfig;
use crate::dispatcher::TelemetryDispatcher;
use crate::event::{LinkCommand, LinkEvent};
use crate::machine::{LinkStateMachine, Step};
use crate::telemetry::{TelemetryHandle, TelemetryPublisher};
use neurotrack_core::{TrackerError, TrackerResult};
use neurotrack_processing::ProcessingConfig;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Commands for controlling the link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkControl {
    Start,
    Stop,
    /// Stop and end the service task
    Shutdown,
}

/// Owns the state machine and the dispatcher; the only place either is mutated
pub struct LinkService {
    machine: LinkStateMachine,
    dispatcher: TelemetryDispatcher,

    // Communication channels
    events: mpsc::Receiver<LinkEvent>,
    control: mpsc::Receiver<LinkControl>,
    radio: mpsc::UnboundedSender<LinkCommand>,
}

impl LinkService {
    pub fn new(
        link: LinkConfig,
        processing: ProcessingConfig,
        events: mpsc::Receiver<LinkEvent>,
        control: mpsc::Receiver<LinkControl>,
        radio: mpsc::UnboundedSender<LinkCommand>,
    ) -> TrackerResult<Self> {
        link.validate()?;
        let dispatcher = TelemetryDispatcher::new(processing, TelemetryPublisher::new())?;

        Ok(LinkService {
            machine: LinkStateMachine::new(link),
            dispatcher,
            events,
            control,
            radio,
        })
    }

    /// Reader for everything this service publishes
    pub fn telemetry(&self) -> TelemetryHandle {
        self.dispatcher.publisher().handle()
    }

    /// Main service loop
    ///
    /// Control requests take priority over queued radio events, so a stop
    /// is applied before anything the radio reported after it was issued.
    pub async fn run(&mut self) -> TrackerResult<()> {
        info!("link service started");

        loop {
            tokio::select! {
                biased;

                control = self.control.recv() => match control {
                    Some(LinkControl::Start) => {
                        let step = self.machine.start();
                        self.apply(step);
                    }
                    Some(LinkControl::Stop) => {
                        let step = self.machine.stop();
                        self.apply(step);
                        self.dispatcher.reset();
                    }
                    Some(LinkControl::Shutdown) | None => {
                        let step = self.machine.stop();
                        self.apply(step);
                        break;
                    }
                },

                event = self.events.recv() => match event {
                    Some(event) => {
                        let step = self.machine.handle(event);
                        self.apply(step);
                    }
                    None => {
                        warn!("radio backend stopped");
                        return Err(TrackerError::link("radio backend stopped"));
                    }
                },
            }
        }

        info!("link service stopped");
        Ok(())
    }

    fn apply(&mut self, step: Step) {
        let publisher = self.dispatcher.publisher();
        for state in &step.transitions {
            publisher.publish_link_state(*state);
        }
        publisher.publish_reconnect_attempts(self.machine.reconnect_attempts());

        for command in step.commands {
            debug!(?command, "radio command");
            if self.radio.send(command).is_err() {
                warn!("radio backend is gone, command dropped");
            }
        }

        if let Some(notification) = step.notification {
            self.dispatcher.on_notification(notification.channel, &notification.payload);
        }
    }
}

/// Control side of a running link service
pub struct LinkHandle {
    control: mpsc::Sender<LinkControl>,
    service: JoinHandle<TrackerResult<()>>,
    radio: JoinHandle<()>,
}

impl LinkHandle {
    /// Begin scanning for the sensor
    pub async fn start(&self) -> TrackerResult<()> {
        self.send(LinkControl::Start).await
    }

    /// Drop the link and stay idle
    pub async fn stop(&self) -> TrackerResult<()> {
        self.send(LinkControl::Stop).await
    }

    /// Stop, end the service and wait for the radio backend to finish
    pub async fn shutdown(self) -> TrackerResult<()> {
        // Service may already be gone; join reports why
        let _ = self.control.send(LinkControl::Shutdown).await;
        self.join().await
    }

    /// Wait for the service and the radio backend to finish
    pub async fn join(self) -> TrackerResult<()> {
        let LinkHandle { control, service, radio } = self;
        let result = service
            .await
            .map_err(|e| TrackerError::link(format!("link service task failed: {}", e)))?;
        drop(control);

        if let Err(e) = radio.await {
            warn!(error = %e, "radio backend task failed");
        }
        result
    }

    async fn send(&self, control: LinkControl) -> TrackerResult<()> {
        self.control
            .send(control)
            .await
            .map_err(|_| TrackerError::link("link service is not running"))
    }
}

/// Helper function to start the link service and its radio backend in the background
pub fn start_link_service<B: RadioBackend>(
    link: LinkConfig,
    processing: ProcessingConfig,
    backend: B,
) -> TrackerResult<(LinkHandle, TelemetryHandle)> {
    let (event_tx, event_rx) = mpsc::channel(link.event_buffer.max(1));
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (control_tx, control_rx) = mpsc::channel(16);

    let mut service = LinkService::new(link, processing, event_rx, control_rx, command_tx)?;
    let telemetry = service.telemetry();

    info!(backend = backend.name(), "starting radio backend");
    let radio = backend.spawn(command_rx, event_tx);

    let service = tokio::spawn(async move {
        let result = service.run().await;
        if let Err(e) = &result {
            warn!(error = %e, "link service ended with error");
        }
        result
    });

    Ok((
        LinkHandle {
            control: control_tx,
            service,
            radio,
        },
        telemetry,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ChannelRadio, RadioProbe};
    use crate::protocol::{EEG_CHAR_UUID, HEART_RATE_CHAR_UUID, SENSOR_SERVICE_UUID};
    use crate::state::{DisconnectReason, LinkState};
    use neurotrack_core::{Band, PeripheralIdentity};
    use std::f32::consts::PI;
    use std::time::Duration;
    use tokio::sync::broadcast;
    use tokio::time::timeout;

    async fn next_state(states: &mut broadcast::Receiver<LinkState>) -> LinkState {
        timeout(Duration::from_secs(2), states.recv()).await.unwrap().unwrap()
    }

    fn start_scripted() -> (LinkHandle, TelemetryHandle, RadioProbe) {
        let (radio, probe) = ChannelRadio::new();
        let (handle, telemetry) =
            start_link_service(LinkConfig::default(), ProcessingConfig::default(), radio).unwrap();
        (handle, telemetry, probe)
    }

    async fn drive_to_streaming(probe: &RadioProbe) {
        let sensor = PeripheralIdentity::new(Some("MyESP32Sensor".to_string()), Some(-55), "sensor-1");
        probe.inject(LinkEvent::Discovered(sensor)).await;
        probe.inject(LinkEvent::Connected).await;
        probe.inject(LinkEvent::ServicesDiscovered(vec![SENSOR_SERVICE_UUID])).await;
        probe
            .inject(LinkEvent::CharacteristicsDiscovered(vec![HEART_RATE_CHAR_UUID, EEG_CHAR_UUID]))
            .await;
        probe.inject(LinkEvent::Subscribed(HEART_RATE_CHAR_UUID)).await;
        probe.inject(LinkEvent::Subscribed(EEG_CHAR_UUID)).await;
    }

    #[tokio::test]
    async fn test_scripted_link_reaches_streaming_and_recovers() {
        let (handle, telemetry, mut probe) = start_scripted();
        let mut states = telemetry.subscribe_link_states();

        handle.start().await.unwrap();
        assert_eq!(next_state(&mut states).await, LinkState::Scanning);
        assert_eq!(probe.next_command().await, Some(LinkCommand::StartScan));

        drive_to_streaming(&probe).await;
        for expected in [
            LinkState::Connecting,
            LinkState::ResolvingServices,
            LinkState::ResolvingCharacteristics,
            LinkState::Subscribing,
            LinkState::Streaming,
        ] {
            assert_eq!(next_state(&mut states).await, expected);
        }

        probe.inject(LinkEvent::Disconnected { address: None, reason: None }).await;
        assert_eq!(
            next_state(&mut states).await,
            LinkState::Disconnected(DisconnectReason::LinkLost)
        );
        assert_eq!(next_state(&mut states).await, LinkState::Scanning);

        let mut watcher = telemetry.watch();
        timeout(Duration::from_secs(2), watcher.wait_for(|s| s.reconnect_attempts == 1))
            .await
            .unwrap()
            .unwrap();

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_notifications_reach_telemetry() {
        let (handle, telemetry, probe) = start_scripted();
        let mut states = telemetry.subscribe_link_states();
        handle.start().await.unwrap();
        drive_to_streaming(&probe).await;
        while next_state(&mut states).await != LinkState::Streaming {}

        probe
            .inject(LinkEvent::Notification {
                characteristic: HEART_RATE_CHAR_UUID,
                value: b"72".to_vec(),
            })
            .await;
        probe
            .inject(LinkEvent::Notification {
                characteristic: EEG_CHAR_UUID,
                value: b"N/A".to_vec(),
            })
            .await;
        for i in 0..64 {
            let value = (2.0 * PI * 10.0 * i as f32 / 250.0).sin();
            probe
                .inject(LinkEvent::Notification {
                    characteristic: EEG_CHAR_UUID,
                    value: format!("{:.4}", value).into_bytes(),
                })
                .await;
        }

        let mut watcher = telemetry.watch();
        let snapshot = timeout(Duration::from_secs(2), watcher.wait_for(|s| s.windows_completed == 1))
            .await
            .unwrap()
            .unwrap()
            .clone();

        assert_eq!(snapshot.heart_rate.map(|s| s.value), Some(72.0));
        assert!(snapshot.heart_rate.unwrap().timestamp > 0);
        assert_eq!(snapshot.dropped_payloads, 1);
        assert_eq!(snapshot.band_powers.dominant(), Some(Band::Alpha));

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_suppresses_late_events() {
        let (handle, telemetry, mut probe) = start_scripted();
        let mut states = telemetry.subscribe_link_states();
        handle.start().await.unwrap();

        let sensor = PeripheralIdentity::new(Some("esp32".to_string()), None, "sensor-2");
        probe.inject(LinkEvent::Discovered(sensor)).await;
        assert_eq!(next_state(&mut states).await, LinkState::Scanning);
        assert_eq!(next_state(&mut states).await, LinkState::Connecting);

        handle.stop().await.unwrap();
        assert_eq!(next_state(&mut states).await, LinkState::Idle);

        probe.inject(LinkEvent::Connected).await;
        probe.inject(LinkEvent::Disconnected { address: None, reason: None }).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(telemetry.link_state(), LinkState::Idle);
        let commands = probe.drain_commands();
        assert!(!commands.contains(&LinkCommand::DiscoverServices));
        assert_eq!(commands.last(), Some(&LinkCommand::Disconnect));
        assert_eq!(telemetry.snapshot().reconnect_attempts, 0);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_closes_backend() {
        let (handle, _telemetry, mut probe) = start_scripted();
        handle.start().await.unwrap();
        handle.shutdown().await.unwrap();

        let mut remaining = Vec::new();
        while let Some(command) = timeout(Duration::from_secs(2), probe.next_command()).await.unwrap() {
            remaining.push(command);
        }
        assert_eq!(
            remaining,
            vec![LinkCommand::StartScan, LinkCommand::StopScan, LinkCommand::Disconnect]
        );
    }

    #[tokio::test]
    async fn test_invalid_link_config_is_rejected() {
        let (radio, _probe) = ChannelRadio::new();
        let config = LinkConfig {
            event_buffer: 0,
            ..LinkConfig::default()
        };
        assert!(start_link_service(config, ProcessingConfig::default(), radio).is_err());
    }
}
