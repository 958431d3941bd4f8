//! NeuroTrack Monitor - headless heart-rate and EEG band-power monitor

mod app;
mod cli;
mod config;
mod report;

use app::MonitorApp;
use clap::Parser;
use cli::Cli;
use config::MonitorConfig;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs on stderr, telemetry reports on stdout
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = MonitorConfig::resolve(&cli)?;

    info!(
        simulate = cli.simulate,
        mains_hz = config.processing.notch_frequency,
        window = config.processing.window_size,
        "starting NeuroTrack monitor"
    );
    println!("Commands: start | stop | status | quit | anything else is saved as an annotation");

    let app = MonitorApp::start(config, cli.simulate)?;
    app.run().await
}
