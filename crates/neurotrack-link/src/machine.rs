//! Connection lifecycle state machine
//!
//! Pure and synchronous: every input returns a [`Step`] listing the state
//! transitions taken, the radio commands to issue and at most one payload
//! to hand to the dispatcher. The service loop owns the only instance, so
//! events and control requests are applied one at a time in arrival order.

use crate::config::LinkConfig;
use crate::event::{LinkCommand, LinkEvent};
use crate::state::{DisconnectReason, LinkState};
use neurotrack_core::{Channel, PeripheralIdentity};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// A notification payload routed to its channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelPayload {
    pub channel: Channel,
    pub payload: Vec<u8>,
}

/// Outcome of applying one input to the machine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Step {
    /// States entered, in order
    pub transitions: Vec<LinkState>,
    /// Commands for the radio, in order
    pub commands: Vec<LinkCommand>,
    pub notification: Option<ChannelPayload>,
}

impl Step {
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty() && self.commands.is_empty() && self.notification.is_none()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct CharacteristicProgress {
    found: bool,
    subscribed: bool,
}

/// Scan, connect, discover, subscribe, stream, and recover
pub struct LinkStateMachine {
    config: LinkConfig,
    state: LinkState,
    running: bool,
    adapter_available: bool,
    peripheral: Option<PeripheralIdentity>,
    heart_rate: CharacteristicProgress,
    eeg: CharacteristicProgress,
    reconnect_attempts: u64,
}

impl LinkStateMachine {
    pub fn new(config: LinkConfig) -> Self {
        LinkStateMachine {
            config,
            state: LinkState::Idle,
            running: false,
            adapter_available: true,
            peripheral: None,
            heart_rate: CharacteristicProgress::default(),
            eeg: CharacteristicProgress::default(),
            reconnect_attempts: 0,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Peripheral currently connected or being connected
    pub fn peripheral(&self) -> Option<&PeripheralIdentity> {
        self.peripheral.as_ref()
    }

    /// Number of times the link fell back to scanning after a failure
    pub fn reconnect_attempts(&self) -> u64 {
        self.reconnect_attempts
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Begin scanning; no effect unless idle
    pub fn start(&mut self) -> Step {
        let mut step = Step::default();
        if self.running {
            debug!(state = %self.state, "start requested while already running");
            return step;
        }

        self.running = true;
        if self.adapter_available {
            self.enter(&mut step, LinkState::Scanning);
            step.commands.push(LinkCommand::StartScan);
        } else {
            self.enter(&mut step, LinkState::Disconnected(DisconnectReason::AdapterUnavailable));
        }
        step
    }

    /// Stop scanning, drop any peripheral and return to idle
    ///
    /// Events arriving afterwards are ignored until the next `start`.
    pub fn stop(&mut self) -> Step {
        let mut step = Step::default();
        if !self.running {
            return step;
        }

        self.running = false;
        self.clear_session();
        step.commands.push(LinkCommand::StopScan);
        step.commands.push(LinkCommand::Disconnect);
        self.enter(&mut step, LinkState::Idle);
        step
    }

    /// Apply one radio event
    pub fn handle(&mut self, event: LinkEvent) -> Step {
        let mut step = Step::default();
        match event {
            LinkEvent::AdapterAvailable => self.on_adapter_available(&mut step),
            LinkEvent::AdapterUnavailable => self.on_adapter_unavailable(&mut step),
            other if !self.running => {
                trace!(event = ?other, "link idle, event ignored");
            }
            other => self.on_link_event(other, &mut step),
        }
        step
    }

    fn on_link_event(&mut self, event: LinkEvent, step: &mut Step) {
        match (self.state, event) {
            (LinkState::Scanning, LinkEvent::Discovered(identity)) => self.on_discovered(identity, step),

            (LinkState::Connecting, LinkEvent::Connected) => {
                self.enter(step, LinkState::ResolvingServices);
                step.commands.push(LinkCommand::DiscoverServices);
            }
            (LinkState::Connecting, LinkEvent::ConnectFailed { reason }) => {
                warn!(%reason, "connection attempt failed");
                self.recover(step, DisconnectReason::ConnectFailed);
            }

            (LinkState::ResolvingServices, LinkEvent::ServicesDiscovered(services)) => {
                if services.contains(&self.config.service_uuid) {
                    self.enter(step, LinkState::ResolvingCharacteristics);
                    step.commands.push(LinkCommand::DiscoverCharacteristics {
                        service: self.config.service_uuid,
                    });
                } else {
                    warn!(offered = services.len(), "sensor service not offered yet");
                }
            }
            (LinkState::ResolvingServices, LinkEvent::ServiceDiscoveryFailed { reason }) => {
                warn!(%reason, "service discovery failed");
                self.recover(step, DisconnectReason::NoService);
            }

            (LinkState::ResolvingCharacteristics, LinkEvent::CharacteristicsDiscovered(found)) => {
                self.on_characteristics(&found, step);
            }
            (LinkState::ResolvingCharacteristics, LinkEvent::CharacteristicDiscoveryFailed { reason }) => {
                warn!(%reason, "characteristic discovery failed");
                self.recover(step, DisconnectReason::NoCharacteristics);
            }

            (
                LinkState::ResolvingCharacteristics | LinkState::Subscribing,
                LinkEvent::Subscribed(characteristic),
            ) => {
                if let Some(progress) = self.progress_mut(&characteristic) {
                    if progress.found {
                        progress.subscribed = true;
                        debug!(%characteristic, "notifications enabled");
                    }
                }
                self.advance(step);
            }
            (
                LinkState::ResolvingCharacteristics | LinkState::Subscribing,
                LinkEvent::SubscribeFailed { characteristic, reason },
            ) => {
                if self.config.channel_for(&characteristic).is_some() {
                    warn!(%characteristic, %reason, "enabling notifications failed");
                    self.recover(step, DisconnectReason::SubscribeFailed);
                }
            }

            (_, LinkEvent::Notification { characteristic, value }) => {
                self.on_notification(characteristic, value, step);
            }

            // A failed attempt is reported as ConnectFailed; a drop now belongs to an earlier link
            (LinkState::Connecting, LinkEvent::Disconnected { address, .. }) => {
                debug!(address = address.as_deref().unwrap_or("unknown"), "stale disconnect while connecting");
            }
            (_, LinkEvent::Disconnected { address, reason }) => {
                if !self.is_current_peripheral(address.as_deref()) {
                    debug!(address = address.as_deref().unwrap_or("unknown"), "disconnect of another peripheral");
                    return;
                }
                info!(reason = reason.as_deref().unwrap_or("none"), "peripheral disconnected");
                self.recover(step, DisconnectReason::LinkLost);
            }

            (state, event) => {
                trace!(%state, ?event, "event not expected in this state");
            }
        }
    }

    fn on_discovered(&mut self, identity: PeripheralIdentity, step: &mut Step) {
        if identity.name.is_none() {
            trace!(address = %identity.address, "advertisement without a name");
            return;
        }
        if !identity.name_contains(&self.config.device_name_substring) {
            trace!(peripheral = %identity, "not a sensor");
            return;
        }

        info!(peripheral = %identity, "sensor found");
        self.peripheral = Some(identity.clone());
        step.commands.push(LinkCommand::StopScan);
        step.commands.push(LinkCommand::Connect(identity));
        self.enter(step, LinkState::Connecting);
    }

    fn on_characteristics(&mut self, found: &[Uuid], step: &mut Step) {
        for characteristic in found {
            if let Some(progress) = self.progress_mut(characteristic) {
                if !progress.found {
                    progress.found = true;
                    step.commands.push(LinkCommand::Subscribe {
                        characteristic: *characteristic,
                    });
                }
            }
        }
        self.advance(step);
    }

    fn on_notification(&mut self, characteristic: Uuid, payload: Vec<u8>, step: &mut Step) {
        let subscribed = match self.config.channel_for(&characteristic) {
            Some(Channel::HeartRate) => self.heart_rate.subscribed,
            Some(Channel::Eeg) => self.eeg.subscribed,
            None => false,
        };
        if !subscribed || !self.state.is_connected() {
            trace!(%characteristic, state = %self.state, "notification dropped");
            return;
        }

        if let Some(channel) = self.config.channel_for(&characteristic) {
            step.notification = Some(ChannelPayload { channel, payload });
        }
    }

    fn on_adapter_available(&mut self, step: &mut Step) {
        self.adapter_available = true;
        if self.running && matches!(self.state, LinkState::Disconnected(_)) {
            info!("adapter available, resuming scan");
            self.reconnect_attempts += 1;
            self.enter(step, LinkState::Scanning);
            step.commands.push(LinkCommand::StartScan);
        }
    }

    fn on_adapter_unavailable(&mut self, step: &mut Step) {
        self.adapter_available = false;
        let waiting = LinkState::Disconnected(DisconnectReason::AdapterUnavailable);
        if self.running && self.state != waiting {
            warn!("adapter unavailable");
            self.clear_session();
            self.enter(step, waiting);
            step.commands.push(LinkCommand::Disconnect);
        }
    }

    /// Move through subscribing into streaming as acknowledgements accumulate
    fn advance(&mut self, step: &mut Step) {
        if self.state == LinkState::ResolvingCharacteristics && self.heart_rate.found && self.eeg.found {
            self.enter(step, LinkState::Subscribing);
        }
        if self.state == LinkState::Subscribing && self.heart_rate.subscribed && self.eeg.subscribed {
            self.enter(step, LinkState::Streaming);
        }
    }

    /// Drop to `Disconnected(reason)`, then rescan if the adapter allows it
    fn recover(&mut self, step: &mut Step, reason: DisconnectReason) {
        self.clear_session();
        self.enter(step, LinkState::Disconnected(reason));
        step.commands.push(LinkCommand::Disconnect);

        if self.adapter_available {
            self.reconnect_attempts += 1;
            self.enter(step, LinkState::Scanning);
            step.commands.push(LinkCommand::StartScan);
        } else {
            info!("waiting for adapter before rescanning");
        }
    }

    /// Untagged disconnects are taken to concern the current link
    fn is_current_peripheral(&self, address: Option<&str>) -> bool {
        match address {
            None => true,
            Some(address) => self.peripheral.as_ref().is_some_and(|p| p.address == address),
        }
    }

        fn clear_session(&mut self) {
        self.peripheral = None;
        self.heart_rate = CharacteristicProgress::default();
        self.eeg = CharacteristicProgress::default();
    }

    fn progress_mut(&mut self, characteristic: &Uuid) -> Option<&mut CharacteristicProgress> {
        match self.config.channel_for(characteristic)? {
            Channel::HeartRate => Some(&mut self.heart_rate),
            Channel::Eeg => Some(&mut self.eeg),
        }
    }

    fn enter(&mut self, step: &mut Step, next: LinkState) {
        info!(from = %self.state, to = %next, "link state");
        self.state = next;
        step.transitions.push(next);
    }
}
