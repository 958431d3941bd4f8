//! Bluetooth LE backend on top of btleplug
//!
//! Carries out link commands one at a time against the first system
//! adapter. Advertisements and link drops come from the adapter's
//! `CentralEvent` stream; notifications from the peripheral's notification
//! stream. Both are forwarded by their own tasks.

use crate::backend::RadioBackend;
use crate::config::LinkConfig;
use crate::event::{LinkCommand, LinkEvent};
use anyhow::{anyhow, Result};
use btleplug::api::{Central, CentralEvent, CentralState, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::StreamExt;
use neurotrack_core::{PeripheralIdentity, TrackerError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Real radio backend
#[derive(Debug, Clone)]
pub struct BtleplugRadio {
    connect_timeout: Duration,
    discovery_timeout: Duration,
    adapter_poll_interval: Duration,
}

impl BtleplugRadio {
    pub fn new(config: &LinkConfig) -> Self {
        BtleplugRadio {
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            discovery_timeout: Duration::from_millis(config.discovery_timeout_ms),
            adapter_poll_interval: Duration::from_millis(config.adapter_poll_interval_ms.max(100)),
        }
    }
}

impl RadioBackend for BtleplugRadio {
    fn spawn(self, mut commands: mpsc::UnboundedReceiver<LinkCommand>, events: mpsc::Sender<LinkEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut driver = BleDriver::new(self, events);
            while let Some(command) = commands.recv().await {
                debug!(?command, "executing");
                if let Err(e) = driver.execute(command.clone()).await {
                    warn!(error = %e, ?command, "radio command failed");
                    if let Some(event) = failure_event(&command, &e) {
                        driver.emit(event).await;
                    }
                }
            }
            driver.teardown().await;
            info!("btleplug backend stopped");
        })
    }

    fn name(&self) -> &'static str {
        "btleplug"
    }
}

struct BleDriver {
    settings: BtleplugRadio,
    events: mpsc::Sender<LinkEvent>,
    adapter: Option<Adapter>,
    peripheral: Option<Peripheral>,
    connected: watch::Sender<Option<PeripheralId>>,
    central_task: Option<JoinHandle<()>>,
    adapter_task: Option<JoinHandle<()>>,
    notify_task: Option<JoinHandle<()>>,
}

impl BleDriver {
    fn new(settings: BtleplugRadio, events: mpsc::Sender<LinkEvent>) -> Self {
        let (connected, _) = watch::channel(None);
        BleDriver {
            settings,
            events,
            adapter: None,
            peripheral: None,
            connected,
            central_task: None,
            adapter_task: None,
            notify_task: None,
        }
    }

    async fn execute(&mut self, command: LinkCommand) -> Result<()> {
        match command {
            LinkCommand::StartScan => self.start_scan().await,
            LinkCommand::StopScan => {
                if let Some(adapter) = &self.adapter {
                    adapter.stop_scan().await?;
                }
                Ok(())
            }
            LinkCommand::Connect(identity) => self.connect(identity).await,
            LinkCommand::DiscoverServices => self.discover_services().await,
            LinkCommand::DiscoverCharacteristics { service } => self.discover_characteristics(service).await,
            LinkCommand::Subscribe { characteristic } => self.subscribe(characteristic).await,
            LinkCommand::Disconnect => {
                self.disconnect().await;
                Ok(())
            }
        }
    }

    async fn start_scan(&mut self) -> Result<()> {
        let adapter = match self.usable_adapter().await {
            Ok(Some(adapter)) => adapter,
            Ok(None) => {
                self.report_unavailable().await;
                return Ok(());
            }
            Err(e) => {
                warn!(error = %e, "adapter lookup failed");
                self.report_unavailable().await;
                return Ok(());
            }
        };

        if let Err(e) = adapter.start_scan(ScanFilter::default()).await {
            warn!(error = %e, "scan could not be started");
            self.report_unavailable().await;
            return Ok(());
        }
        if self.adapter_task.is_none() {
            self.watch_adapter(true);
        }
        info!("scanning for peripherals");
        Ok(())
    }

    async fn connect(&mut self, identity: PeripheralIdentity) -> Result<()> {
        let adapter = self.adapter.clone().ok_or(TrackerError::AdapterUnavailable)?;

        let mut target = None;
        for peripheral in adapter.peripherals().await? {
            if peripheral.id().to_string() == identity.address {
                target = Some(peripheral);
                break;
            }
        }
        let Some(peripheral) = target else {
            self.emit(LinkEvent::ConnectFailed {
                reason: format!("{} is no longer known to the adapter", identity),
            })
            .await;
            return Ok(());
        };

        info!(peripheral = %identity, "connecting");
        let event = match timeout(self.settings.connect_timeout, peripheral.connect()).await {
            Ok(Ok(())) => {
                self.connected.send_replace(Some(peripheral.id()));
                LinkEvent::Connected
            }
            Ok(Err(e)) => LinkEvent::ConnectFailed { reason: e.to_string() },
            Err(_) => LinkEvent::ConnectFailed {
                reason: format!("timed out after {:?}", self.settings.connect_timeout),
            },
        };
        self.peripheral = Some(peripheral);
        self.emit(event).await;
        Ok(())
    }

    async fn discover_services(&mut self) -> Result<()> {
        let peripheral = self.peripheral.clone().ok_or_else(|| anyhow!("no peripheral"))?;

        let event = match timeout(self.settings.discovery_timeout, peripheral.discover_services()).await {
            Ok(Ok(())) => {
                let services: Vec<Uuid> = peripheral.services().iter().map(|s| s.uuid).collect();
                debug!(count = services.len(), "services discovered");
                LinkEvent::ServicesDiscovered(services)
            }
            Ok(Err(e)) => LinkEvent::ServiceDiscoveryFailed { reason: e.to_string() },
            Err(_) => LinkEvent::ServiceDiscoveryFailed {
                reason: format!("timed out after {:?}", self.settings.discovery_timeout),
            },
        };
        self.emit(event).await;
        Ok(())
    }

    async fn discover_characteristics(&mut self, service: Uuid) -> Result<()> {
        let peripheral = self.peripheral.clone().ok_or_else(|| anyhow!("no peripheral"))?;

        let event = match peripheral.services().into_iter().find(|s| s.uuid == service) {
            Some(found) => LinkEvent::CharacteristicsDiscovered(found.characteristics.iter().map(|c| c.uuid).collect()),
            None => LinkEvent::CharacteristicDiscoveryFailed {
                reason: format!("service {} disappeared", service),
            },
        };
        self.emit(event).await;
        Ok(())
    }

    async fn subscribe(&mut self, characteristic: Uuid) -> Result<()> {
        let peripheral = self.peripheral.clone().ok_or_else(|| anyhow!("no peripheral"))?;

        let Some(target) = peripheral.characteristics().into_iter().find(|c| c.uuid == characteristic) else {
            self.emit(LinkEvent::SubscribeFailed {
                characteristic,
                reason: "characteristic not found".to_string(),
            })
            .await;
            return Ok(());
        };

        // Listen before enabling notifications so the first value is not missed
        if self.notify_task.is_none() {
            let stream = peripheral.notifications().await?;
            self.notify_task = Some(tokio::spawn(forward_notifications(stream, self.events.clone())));
        }

        let event = match peripheral.subscribe(&target).await {
            Ok(()) => LinkEvent::Subscribed(characteristic),
            Err(e) => LinkEvent::SubscribeFailed {
                characteristic,
                reason: e.to_string(),
            },
        };
        self.emit(event).await;
        Ok(())
    }

    async fn disconnect(&mut self) {
        // Forget the id first so our own disconnect is not reported as a drop
        self.connected.send_replace(None);
        if let Some(task) = self.notify_task.take() {
            task.abort();
        }
        if let Some(peripheral) = self.peripheral.take() {
            if let Err(e) = peripheral.disconnect().await {
                debug!(error = %e, "disconnect");
            }
        }
    }

    async fn teardown(&mut self) {
        self.disconnect().await;
        if let Some(adapter) = &self.adapter {
            let _ = adapter.stop_scan().await;
        }
        for task in [self.central_task.take(), self.adapter_task.take()].into_iter().flatten() {
            task.abort();
        }
    }

    /// First adapter, if it exists and is not powered off
    async fn usable_adapter(&mut self) -> Result<Option<Adapter>> {
        if self.adapter.is_none() {
            let manager = Manager::new().await?;
            if let Some(adapter) = manager.adapters().await?.into_iter().next() {
                self.central_task = Some(tokio::spawn(forward_central_events(
                    adapter.clone(),
                    self.events.clone(),
                    self.connected.subscribe(),
                )));
                self.adapter = Some(adapter);
            }
        }

        let Some(adapter) = self.adapter.clone() else {
            return Ok(None);
        };
        Ok(adapter_powered(&adapter).await.then_some(adapter))
    }

    async fn report_unavailable(&mut self) {
        self.emit(LinkEvent::AdapterUnavailable).await;
        self.watch_adapter(false);
    }

    /// (Re)start polling the adapter, reporting when usability changes
    fn watch_adapter(&mut self, usable: bool) {
        if let Some(task) = self.adapter_task.take() {
            task.abort();
        }
        self.adapter_task = Some(tokio::spawn(monitor_adapter(
            self.events.clone(),
            self.settings.adapter_poll_interval,
            usable,
        )));
    }

    async fn emit(&self, event: LinkEvent) {
        if self.events.send(event).await.is_err() {
            debug!("link service gone, event dropped");
        }
    }
}

/// Event telling the state machine that `command` did not complete
///
/// Without it the machine would wait for a reply that never comes.
fn failure_event(command: &LinkCommand, error: &anyhow::Error) -> Option<LinkEvent> {
    let reason = error.to_string();
    match command {
        LinkCommand::Connect(_) => Some(LinkEvent::ConnectFailed { reason }),
        LinkCommand::DiscoverServices => Some(LinkEvent::ServiceDiscoveryFailed { reason }),
        LinkCommand::DiscoverCharacteristics { .. } => Some(LinkEvent::CharacteristicDiscoveryFailed { reason }),
        LinkCommand::Subscribe { characteristic } => Some(LinkEvent::SubscribeFailed {
            characteristic: *characteristic,
            reason,
        }),
        LinkCommand::StartScan | LinkCommand::StopScan | LinkCommand::Disconnect => None,
    }
}

async fn adapter_powered(adapter: &Adapter) -> bool {
    !matches!(adapter.adapter_state().await, Ok(CentralState::PoweredOff))
}

async fn first_adapter() -> Result<Option<Adapter>> {
    let manager = Manager::new().await?;
    Ok(manager.adapters().await?.into_iter().next())
}

async fn monitor_adapter(events: mpsc::Sender<LinkEvent>, period: Duration, mut usable: bool) {
    let mut adapter: Option<Adapter> = None;
    let mut ticker = interval_at(Instant::now() + period, period);

    loop {
        ticker.tick().await;
        if adapter.is_none() {
            adapter = first_adapter().await.ok().flatten();
        }
        let now = match &adapter {
            Some(adapter) => adapter_powered(adapter).await,
            None => false,
        };
        if now == usable {
            continue;
        }

        usable = now;
        let event = if usable {
            LinkEvent::AdapterAvailable
        } else {
            LinkEvent::AdapterUnavailable
        };
        info!(?event, "adapter state changed");
        if events.send(event).await.is_err() {
            break;
        }
    }
}

async fn forward_central_events(
    adapter: Adapter,
    events: mpsc::Sender<LinkEvent>,
    connected: watch::Receiver<Option<PeripheralId>>,
) {
    let mut stream = match adapter.events().await {
        Ok(stream) => stream,
        Err(e) => {
            warn!(error = %e, "could not subscribe to adapter events");
            return;
        }
    };

    while let Some(event) = stream.next().await {
        let forwarded = match event {
            CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
                identify(&adapter, &id).await.map(LinkEvent::Discovered)
            }
            CentralEvent::DeviceDisconnected(id) => {
                let ours = connected.borrow().as_ref() == Some(&id);
                ours.then(|| LinkEvent::Disconnected {
                    address: Some(id.to_string()),
                    reason: Some("peripheral dropped the link".to_string()),
                })
            }
            _ => None,
        };

        if let Some(event) = forwarded {
            if events.send(event).await.is_err() {
                break;
            }
        }
    }
    debug!("adapter event stream ended");
}

async fn identify(adapter: &Adapter, id: &PeripheralId) -> Option<PeripheralIdentity> {
    let peripheral = adapter.peripheral(id).await.ok()?;
    let properties = peripheral.properties().await.ok()??;
    Some(PeripheralIdentity::new(properties.local_name, properties.rssi, id.to_string()))
}

async fn forward_notifications<S>(mut stream: S, events: mpsc::Sender<LinkEvent>)
where
    S: futures::Stream<Item = btleplug::api::ValueNotification> + Unpin,
{
    while let Some(notification) = stream.next().await {
        let event = LinkEvent::Notification {
            characteristic: notification.uuid,
            value: notification.value,
        };
        if events.send(event).await.is_err() {
            break;
        }
    }
    debug!("notification stream ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::EEG_CHAR_UUID;

    #[test]
    fn test_failed_link_commands_report_failure_events() {
        let lookup = anyhow!("D-Bus call failed");

        let sensor = PeripheralIdentity::new(Some("ESP32".to_string()), None, "AA:BB:CC:DD:EE:FF");
        assert_eq!(
            failure_event(&LinkCommand::Connect(sensor), &lookup),
            Some(LinkEvent::ConnectFailed {
                reason: "D-Bus call failed".to_string()
            })
        );
        assert!(matches!(
            failure_event(&LinkCommand::DiscoverServices, &lookup),
            Some(LinkEvent::ServiceDiscoveryFailed { .. })
        ));
        assert!(matches!(
            failure_event(&LinkCommand::DiscoverCharacteristics { service: Uuid::nil() }, &lookup),
            Some(LinkEvent::CharacteristicDiscoveryFailed { .. })
        ));
        assert_eq!(
            failure_event(
                &LinkCommand::Subscribe {
                    characteristic: EEG_CHAR_UUID
                },
                &lookup
            ),
            Some(LinkEvent::SubscribeFailed {
                characteristic: EEG_CHAR_UUID,
                reason: "D-Bus call failed".to_string()
            })
        );
    }

    #[test]
    fn test_scan_and_teardown_failures_are_only_logged() {
        let error = anyhow!("adapter busy");
        assert_eq!(failure_event(&LinkCommand::StartScan, &error), None);
        assert_eq!(failure_event(&LinkCommand::StopScan, &error), None);
        assert_eq!(failure_event(&LinkCommand::Disconnect, &error), None);
    }

    #[test]
    fn test_connect_without_adapter_fails_the_attempt() {
        let error = anyhow::Error::from(TrackerError::AdapterUnavailable);
        let sensor = PeripheralIdentity::new(Some("ESP32".to_string()), None, "AA:BB:CC:DD:EE:FF");
        match failure_event(&LinkCommand::Connect(sensor), &error) {
            Some(LinkEvent::ConnectFailed { reason }) => assert_eq!(reason, "Wireless adapter unavailable"),
            other => panic!("expected ConnectFailed, got {:?}", other),
        }
    }
}
