//! Radio backend seam
//!
//! The link service never talks to a radio stack directly. A backend is
//! spawned once with the receiving end of the command channel and a sender
//! for events, and must finish when the command channel closes.

use crate::event::{LinkCommand, LinkEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Something that can carry out link commands and report radio events
pub trait RadioBackend: Send + 'static {
    /// Start the backend task
    fn spawn(self, commands: mpsc::UnboundedReceiver<LinkCommand>, events: mpsc::Sender<LinkEvent>) -> JoinHandle<()>;

    /// Name used in logs
    fn name(&self) -> &'static str;
}

/// Backend driven by hand through a [`RadioProbe`]
///
/// Commands issued by the service come out of the probe; events pushed into
/// the probe reach the service. Useful for exercising the link service
/// without a radio.
pub struct ChannelRadio {
    inject: mpsc::Receiver<LinkEvent>,
    issued: mpsc::UnboundedSender<LinkCommand>,
}

/// Test-side ends of a [`ChannelRadio`]
pub struct RadioProbe {
    events: mpsc::Sender<LinkEvent>,
    commands: mpsc::UnboundedReceiver<LinkCommand>,
}

impl ChannelRadio {
    pub fn new() -> (ChannelRadio, RadioProbe) {
        let (events, inject) = mpsc::channel(64);
        let (issued, commands) = mpsc::unbounded_channel();
        (ChannelRadio { inject, issued }, RadioProbe { events, commands })
    }
}

impl RadioBackend for ChannelRadio {
    fn spawn(self, mut commands: mpsc::UnboundedReceiver<LinkCommand>, events: mpsc::Sender<LinkEvent>) -> JoinHandle<()> {
        let ChannelRadio { mut inject, issued } = self;

        tokio::spawn(async move {
            let mut injecting = true;
            loop {
                tokio::select! {
                    command = commands.recv() => match command {
                        Some(command) => {
                            // Probe may have been dropped
                            let _ = issued.send(command);
                        }
                        None => break,
                    },
                    event = inject.recv(), if injecting => match event {
                        Some(event) => {
                            if events.send(event).await.is_err() {
                                break;
                            }
                        }
                        None => injecting = false,
                    },
                }
            }
        })
    }

    fn name(&self) -> &'static str {
        "channel"
    }
}

impl RadioProbe {
    /// Deliver an event to the service
    pub async fn inject(&self, event: LinkEvent) -> bool {
        self.events.send(event).await.is_ok()
    }

    /// Next command the service issued, `None` once the backend is gone
    pub async fn next_command(&mut self) -> Option<LinkCommand> {
        self.commands.recv().await
    }

    /// Commands already issued, without waiting
    pub fn drain_commands(&mut self) -> Vec<LinkCommand> {
        let mut drained = Vec::new();
        while let Ok(command) = self.commands.try_recv() {
            drained.push(command);
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_radio_forwards_both_ways() {
        let (radio, mut probe) = ChannelRadio::new();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, mut event_rx) = mpsc::channel(8);
        let task = radio.spawn(command_rx, event_tx);

        command_tx.send(LinkCommand::StartScan).unwrap();
        assert_eq!(probe.next_command().await, Some(LinkCommand::StartScan));

        assert!(probe.inject(LinkEvent::Connected).await);
        assert_eq!(event_rx.recv().await, Some(LinkEvent::Connected));

        drop(command_tx);
        task.await.unwrap();
        assert_eq!(probe.next_command().await, None);
    }
}
