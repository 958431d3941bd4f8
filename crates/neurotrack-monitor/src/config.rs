//! Monitor configuration file

use anyhow::{bail, Context, Result};
use neurotrack_link::LinkConfig;
use neurotrack_processing::ProcessingConfig;
use neurotrack_simulation::SimulationConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::Cli;

/// Everything the monitor can be configured with; every section is optional
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub link: LinkConfig,
    pub processing: ProcessingConfig,
    pub simulation: SimulationConfig,
    /// JSON-lines file for annotations; kept in memory when unset
    pub annotation_log: Option<PathBuf>,
    /// Print a telemetry line this often, 0 to disable
    pub report_interval_ms: u64,
}

impl MonitorConfig {
    /// Read a JSON configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: MonitorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Config file (or defaults) with command line overrides applied
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        if let Some(path) = &cli.annotations {
            config.annotation_log = Some(path.clone());
        }
        if let Some(mains) = cli.mains {
            config.processing.notch_frequency = mains;
            config.simulation.powerline_frequency = Some(mains);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.link.validate()?;
        self.processing.validate()?;
        self.simulation.validate()?;
        if self.report_interval_ms > 0 && self.report_interval_ms < 100 {
            bail!("report interval must be 0 or at least 100 ms");
        }
        Ok(())
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            link: LinkConfig::default(),
            processing: ProcessingConfig::default(),
            simulation: SimulationConfig::default(),
            annotation_log: None,
            report_interval_ms: 1000,
        }
    }
}
