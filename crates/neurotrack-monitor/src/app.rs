//! Monitor application: wires the link service, annotations and the console

use crate::cli::ConsoleCommand;
use crate::config::MonitorConfig;
use crate::report::{band_bars, status_line};
use anyhow::Result;
use neurotrack_core::{AnnotationSink, InMemoryAnnotationLog, JsonLinesAnnotationLog};
use neurotrack_link::{start_link_service, BtleplugRadio, LinkHandle, TelemetryHandle};
use neurotrack_simulation::SimulatedRadio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{info, warn};

/// Running monitor
pub struct MonitorApp {
    config: MonitorConfig,
    link: LinkHandle,
    telemetry: TelemetryHandle,
    annotations: Arc<dyn AnnotationSink>,
}

impl MonitorApp {
    /// Start the link service against the simulated or the real radio
    pub fn start(config: MonitorConfig, simulate: bool) -> Result<Self> {
        let annotations: Arc<dyn AnnotationSink> = match &config.annotation_log {
            Some(path) => {
                info!(path = %path.display(), "writing annotations");
                Arc::new(JsonLinesAnnotationLog::open(path)?)
            }
            None => Arc::new(InMemoryAnnotationLog::new()),
        };
        Self::with_annotations(config, simulate, annotations)
    }

    pub fn with_annotations(config: MonitorConfig, simulate: bool, annotations: Arc<dyn AnnotationSink>) -> Result<Self> {
        let (link, telemetry) = if simulate {
            let radio = SimulatedRadio::new(config.simulation.clone())?;
            start_link_service(config.link.clone(), config.processing.clone(), radio)?
        } else {
            let radio = BtleplugRadio::new(&config.link);
            start_link_service(config.link.clone(), config.processing.clone(), radio)?
        };

        Ok(MonitorApp {
            config,
            link,
            telemetry,
            annotations,
        })
    }

    pub fn telemetry(&self) -> &TelemetryHandle {
        &self.telemetry
    }

    /// Scan, stream and serve console commands until quit, end of input or Ctrl-C
    pub async fn run(self) -> Result<()> {
        self.link.start().await?;

        let mut states = self.telemetry.subscribe_link_states();
        let mut console = BufReader::new(tokio::io::stdin()).lines();
        let mut console_open = true;

        let reporting = self.config.report_interval_ms > 0;
        let mut report = interval(Duration::from_millis(self.config.report_interval_ms.max(100)));

        let interrupted = tokio::signal::ctrl_c();
        tokio::pin!(interrupted);

        loop {
            tokio::select! {
                _ = &mut interrupted => {
                    info!("interrupted");
                    break;
                }

                state = states.recv() => match state {
                    Ok(state) => println!("link: {}", state),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "link state updates lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },

                line = console.next_line(), if console_open => match line {
                    Ok(Some(line)) => {
                        if let Some(command) = ConsoleCommand::parse(&line) {
                            if !self.execute(command).await? {
                                break;
                            }
                        }
                    }
                    Ok(None) => {
                        info!("console input closed");
                        console_open = false;
                    }
                    Err(e) => {
                        warn!(error = %e, "console read failed");
                        console_open = false;
                    }
                },

                _ = report.tick(), if reporting => {
                    println!("{}", status_line(&self.telemetry.snapshot()));
                }
            }
        }

        self.link.shutdown().await?;
        info!("monitor stopped");
        Ok(())
    }

    /// Carry out one console command; `false` means quit
    pub async fn execute(&self, command: ConsoleCommand) -> Result<bool> {
        match command {
            ConsoleCommand::Start => self.link.start().await?,
            ConsoleCommand::Stop => self.link.stop().await?,
            ConsoleCommand::Status => {
                println!("{}", status_line(&self.telemetry.snapshot()));
                for bar in band_bars(&self.telemetry.band_powers()) {
                    println!("  {}", bar);
                }
            }
            ConsoleCommand::Quit => return Ok(false),
            ConsoleCommand::Annotate(description) => {
                // A failed write is reported but never stops the monitor
                match self.telemetry.annotate(self.annotations.as_ref(), description) {
                    Ok(entry) => println!("noted \"{}\" ({})", entry.description, entry.band_powers),
                    Err(e) => warn!(error = %e, "annotation not saved"),
                }
            }
        }
        Ok(true)
    }

    /// Stop the link service without running the console loop
    pub async fn shutdown(self) -> Result<()> {
        self.link.shutdown().await?;
        Ok(())
    }
}
