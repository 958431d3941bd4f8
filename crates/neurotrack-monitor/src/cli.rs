//! Command line and console commands

use clap::Parser;
use std::path::PathBuf;

/// Live heart-rate and EEG band-power monitor for the ESP32 sensor board
#[derive(Debug, Parser)]
#[command(name = "neurotrack-monitor", version, about)]
pub struct Cli {
    /// Use the built-in simulated sensor instead of the Bluetooth adapter
    #[arg(long)]
    pub simulate: bool,

    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Append annotations to this JSON-lines file (overrides the config)
    #[arg(long, value_name = "FILE")]
    pub annotations: Option<PathBuf>,

    /// Mains frequency to notch out, 50 or 60 Hz (overrides the config)
    #[arg(long, value_name = "HZ")]
    pub mains: Option<f32>,
}

/// A line typed on the console while the monitor runs
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Start,
    Stop,
    Status,
    Quit,
    /// Record a note against the current band powers
    Annotate(String),
}

impl ConsoleCommand {
    /// Parse one console line; blank lines are ignored
    ///
    /// Anything that is not a keyword becomes an annotation, so
    /// `eyes closed` and `note eyes closed` record the same note.
    pub fn parse(line: &str) -> Option<ConsoleCommand> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let command = match line.to_ascii_lowercase().as_str() {
            "start" => ConsoleCommand::Start,
            "stop" => ConsoleCommand::Stop,
            "status" => ConsoleCommand::Status,
            "quit" | "exit" => ConsoleCommand::Quit,
            _ => {
                let note = match line.split_once(char::is_whitespace) {
                    Some((keyword, rest)) if keyword.eq_ignore_ascii_case("note") => rest.trim(),
                    _ => line,
                };
                ConsoleCommand::Annotate(note.to_string())
            }
        };
        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keywords() {
        assert_eq!(ConsoleCommand::parse("start"), Some(ConsoleCommand::Start));
        assert_eq!(ConsoleCommand::parse(" STOP \n"), Some(ConsoleCommand::Stop));
        assert_eq!(ConsoleCommand::parse("exit"), Some(ConsoleCommand::Quit));
        assert_eq!(ConsoleCommand::parse("   "), None);
    }

    #[test]
    fn test_parse_annotations() {
        assert_eq!(
            ConsoleCommand::parse("eyes closed"),
            Some(ConsoleCommand::Annotate("eyes closed".to_string()))
        );
        assert_eq!(
            ConsoleCommand::parse("note  started meditation"),
            Some(ConsoleCommand::Annotate("started meditation".to_string()))
        );
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from(["neurotrack-monitor", "--simulate", "--config", "monitor.json"]).unwrap();
        assert!(cli.simulate);
        assert_eq!(cli.config, Some(PathBuf::from("monitor.json")));
        assert!(cli.annotations.is_none());

        let cli = Cli::try_parse_from(["neurotrack-monitor"]).unwrap();
        assert!(!cli.simulate);
    }
}
