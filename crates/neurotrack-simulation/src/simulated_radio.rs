//! A fake sensor board behind the radio backend interface
//!
//! Answers link commands the way the real board does and, while subscribed,
//! streams heart-rate and EEG notifications in real time.

use crate::eeg_simulator::{EegSimulator, SimulationConfig};
use neurotrack_core::{PeripheralIdentity, TrackerResult};
use neurotrack_link::{LinkCommand, LinkEvent, RadioBackend, EEG_CHAR_UUID, HEART_RATE_CHAR_UUID, SENSOR_SERVICE_UUID};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep_until, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

/// Address the simulated sensor advertises under
pub const SIMULATED_ADDRESS: &str = "sim:esp32:0001";

/// Generic Access service, present on every board
const GENERIC_ACCESS_UUID: Uuid = Uuid::from_u128(0x00001800_0000_1000_8000_00805f9b34fb);

/// Radio backend backed by [`EegSimulator`]
pub struct SimulatedRadio {
    simulator: EegSimulator,
}

impl SimulatedRadio {
    pub fn new(config: SimulationConfig) -> TrackerResult<Self> {
        Ok(SimulatedRadio {
            simulator: EegSimulator::new(config)?,
        })
    }

    /// Everything advertising while a scan runs, sensor last
    pub fn advertisements(config: &SimulationConfig) -> Vec<PeripheralIdentity> {
        let mut seen: Vec<PeripheralIdentity> = config
            .decoy_names
            .iter()
            .enumerate()
            .map(|(i, name)| PeripheralIdentity::new(Some(name.clone()), Some(-70 - i as i16), format!("sim:decoy:{}", i)))
            .collect();
        if config.advertise_nameless {
            seen.push(PeripheralIdentity::new(None, Some(-80), "sim:anonymous"));
        }
        seen.push(PeripheralIdentity::new(
            Some(config.device_name.clone()),
            Some(-55),
            SIMULATED_ADDRESS,
        ));
        seen
    }
}

#[derive(Debug, Default)]
struct BoardState {
    scanning: bool,
    connected: bool,
    heart_rate_subscribed: bool,
    eeg_subscribed: bool,
    drop_at: Option<Instant>,
}

impl BoardState {
    fn disconnect(&mut self) {
        self.connected = false;
        self.heart_rate_subscribed = false;
        self.eeg_subscribed = false;
        self.drop_at = None;
    }
}

impl RadioBackend for SimulatedRadio {
    fn spawn(self, mut commands: mpsc::UnboundedReceiver<LinkCommand>, events: mpsc::Sender<LinkEvent>) -> JoinHandle<()> {
        let mut simulator = self.simulator;

        tokio::spawn(async move {
            let config = simulator.config().clone();
            let advertisements = SimulatedRadio::advertisements(&config);
            let drop_period = config.drop_link_every_secs.map(Duration::from_secs_f32);

            let mut advertise_timer = interval(Duration::from_millis(config.advertise_interval_ms));
            advertise_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut eeg_timer = interval(Duration::from_secs_f32(1.0 / config.sampling_rate));
            eeg_timer.set_missed_tick_behavior(MissedTickBehavior::Burst);
            let mut heart_rate_timer = interval(Duration::from_millis(config.heart_rate_interval_ms));
            heart_rate_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let mut board = BoardState::default();
            info!(device = %config.device_name, rate = config.sampling_rate, "simulated sensor ready");

            loop {
                let event = tokio::select! {
                    command = commands.recv() => match command {
                        Some(command) => respond(command, &mut board, drop_period),
                        None => break,
                    },

                    _ = advertise_timer.tick(), if board.scanning => {
                        let mut delivered = true;
                        for identity in &advertisements {
                            delivered &= events.send(LinkEvent::Discovered(identity.clone())).await.is_ok();
                        }
                        if !delivered {
                            break;
                        }
                        None
                    }

                    _ = eeg_timer.tick(), if board.eeg_subscribed => Some(LinkEvent::Notification {
                        characteristic: EEG_CHAR_UUID,
                        value: simulator.eeg_payload(),
                    }),

                    _ = heart_rate_timer.tick(), if board.heart_rate_subscribed => Some(LinkEvent::Notification {
                        characteristic: HEART_RATE_CHAR_UUID,
                        value: simulator.heart_rate_payload(),
                    }),

                    _ = sleep_until(board.drop_at.unwrap_or_else(Instant::now)), if board.drop_at.is_some() => {
                        info!("simulated link drop");
                        board.disconnect();
                        Some(LinkEvent::Disconnected {
                            address: Some(SIMULATED_ADDRESS.to_string()),
                            reason: Some("simulated link drop".to_string()),
                        })
                    }
                };

                // Streams start fresh on every subscription
                if let Some(LinkEvent::Subscribed(characteristic)) = &event {
                    if *characteristic == EEG_CHAR_UUID {
                        eeg_timer.reset();
                    } else {
                        heart_rate_timer.reset();
                    }
                }

                if let Some(event) = event {
                    if events.send(event).await.is_err() {
                        break;
                    }
                }
            }
            debug!("simulated sensor stopped");
        })
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

/// Reply the board gives to one command, if any
fn respond(command: LinkCommand, board: &mut BoardState, drop_period: Option<Duration>) -> Option<LinkEvent> {
    match command {
        LinkCommand::StartScan => {
            board.scanning = true;
            None
        }
        LinkCommand::StopScan => {
            board.scanning = false;
            None
        }
        LinkCommand::Connect(identity) => {
            if identity.address != SIMULATED_ADDRESS {
                return Some(LinkEvent::ConnectFailed {
                    reason: format!("{} does not accept connections", identity),
                });
            }
            board.connected = true;
            board.drop_at = drop_period.map(|period| Instant::now() + period);
            Some(LinkEvent::Connected)
        }
        LinkCommand::DiscoverServices => Some(if board.connected {
            LinkEvent::ServicesDiscovered(vec![GENERIC_ACCESS_UUID, SENSOR_SERVICE_UUID])
        } else {
            LinkEvent::ServiceDiscoveryFailed {
                reason: "not connected".to_string(),
            }
        }),
        LinkCommand::DiscoverCharacteristics { service } => Some(if board.connected && service == SENSOR_SERVICE_UUID {
            LinkEvent::CharacteristicsDiscovered(vec![HEART_RATE_CHAR_UUID, EEG_CHAR_UUID])
        } else {
            LinkEvent::CharacteristicDiscoveryFailed {
                reason: format!("no characteristics for {}", service),
            }
        }),
        LinkCommand::Subscribe { characteristic } => {
            let slot = if characteristic == HEART_RATE_CHAR_UUID {
                &mut board.heart_rate_subscribed
            } else if characteristic == EEG_CHAR_UUID {
                &mut board.eeg_subscribed
            } else {
                return Some(LinkEvent::SubscribeFailed {
                    characteristic,
                    reason: "unknown characteristic".to_string(),
                });
            };
            if !board.connected {
                return Some(LinkEvent::SubscribeFailed {
                    characteristic,
                    reason: "not connected".to_string(),
                });
            }
            *slot = true;
            Some(LinkEvent::Subscribed(characteristic))
        }
        LinkCommand::Disconnect => {
            board.disconnect();
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eeg_simulator::NoiseConfig;
    use neurotrack_link::{start_link_service, LinkConfig, LinkState};
    use neurotrack_processing::ProcessingConfig;

    fn identity(name: &str) -> PeripheralIdentity {
        PeripheralIdentity::new(Some(name.to_string()), None, SIMULATED_ADDRESS)
    }

    #[test]
    fn test_advertisements_include_decoys_and_sensor() {
        let ads = SimulatedRadio::advertisements(&SimulationConfig::default());
        assert_eq!(ads.len(), 4);
        assert!(ads.iter().any(|a| a.name.is_none()));
        assert_eq!(ads.last().unwrap().address, SIMULATED_ADDRESS);
        assert_eq!(ads.iter().filter(|a| a.name_contains("esp32")).count(), 1);
    }

    #[test]
    fn test_board_replies() {
        let mut board = BoardState::default();
        assert!(matches!(
            respond(LinkCommand::DiscoverServices, &mut board, None),
            Some(LinkEvent::ServiceDiscoveryFailed { .. })
        ));

        let foreign = PeripheralIdentity::new(Some("ESP32".to_string()), None, "elsewhere");
        assert!(matches!(
            respond(LinkCommand::Connect(foreign), &mut board, None),
            Some(LinkEvent::ConnectFailed { .. })
        ));

        assert_eq!(
            respond(LinkCommand::Connect(identity("ESP32_Sensor")), &mut board, None),
            Some(LinkEvent::Connected)
        );
        assert_eq!(
            respond(
                LinkCommand::Subscribe {
                    characteristic: EEG_CHAR_UUID
                },
                &mut board,
                None
            ),
            Some(LinkEvent::Subscribed(EEG_CHAR_UUID))
        );
        assert!(board.eeg_subscribed);

        assert_eq!(respond(LinkCommand::Disconnect, &mut board, None), None);
        assert!(!board.connected && !board.eeg_subscribed);
    }

    #[tokio::test]
    async fn test_link_streams_band_powers_from_simulated_sensor() {
        let simulation = SimulationConfig {
            seed: Some(11),
            ..SimulationConfig::default()
        };
        let radio = SimulatedRadio::new(simulation).unwrap();
        let (handle, telemetry) =
            start_link_service(LinkConfig::default(), ProcessingConfig::default(), radio).unwrap();

        handle.start().await.unwrap();

        let mut watcher = telemetry.watch();
        let snapshot = tokio::time::timeout(
            Duration::from_secs(10),
            watcher.wait_for(|s| s.link_state == LinkState::Streaming && s.windows_completed >= 2),
        )
        .await
        .unwrap()
        .unwrap()
        .clone();

        assert!(snapshot.band_powers.total() > 0.0);
        assert!(snapshot.eeg.is_some());
        assert_eq!(snapshot.reconnect_attempts, 0);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_periodic_link_drop_triggers_reconnect() {
        let simulation = SimulationConfig {
            seed: Some(3),
            drop_link_every_secs: Some(0.3),
            noise: NoiseConfig::clean(),
            ..SimulationConfig::default()
        };
        let radio = SimulatedRadio::new(simulation).unwrap();
        let (handle, telemetry) =
            start_link_service(LinkConfig::default(), ProcessingConfig::default(), radio).unwrap();
        handle.start().await.unwrap();

        let mut watcher = telemetry.watch();
        tokio::time::timeout(
            Duration::from_secs(10),
            watcher.wait_for(|s| s.reconnect_attempts >= 1 && s.link_state == LinkState::Streaming),
        )
        .await
        .unwrap()
        .unwrap();

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_payloads_are_counted() {
        let simulation = SimulationConfig {
            seed: Some(5),
            malformed_probability: 0.5,
            ..SimulationConfig::default()
        };
        let radio = SimulatedRadio::new(simulation).unwrap();
        let (handle, telemetry) =
            start_link_service(LinkConfig::default(), ProcessingConfig::default(), radio).unwrap();
        handle.start().await.unwrap();

        let mut watcher = telemetry.watch();
        tokio::time::timeout(Duration::from_secs(10), watcher.wait_for(|s| s.dropped_payloads >= 5))
            .await
            .unwrap()
            .unwrap();

        handle.shutdown().await.unwrap();
    }
}
