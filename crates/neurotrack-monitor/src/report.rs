//! Console rendering of telemetry

use neurotrack_core::BandPowers;
use neurotrack_link::TelemetrySnapshot;
use std::fmt::Write;

const BAR_WIDTH: usize = 30;

/// One-line summary printed on every report tick
pub fn status_line(snapshot: &TelemetrySnapshot) -> String {
    let mut line = format!("[{}]", snapshot.link_state);

    match snapshot.heart_rate {
        Some(sample) => {
            let _ = write!(line, " HR {:.0} bpm", sample.value);
        }
        None => line.push_str(" HR --"),
    }
    match snapshot.eeg {
        Some(sample) => {
            let _ = write!(line, " | EEG {:>9.3}", sample.value);
        }
        None => line.push_str(" | EEG --"),
    }

    let relative = snapshot.band_powers.relative();
    for (band, share) in relative.iter() {
        let _ = write!(line, " | {} {:>3.0}%", band, share * 100.0);
    }
    let _ = write!(
        line,
        " | windows {} dropped {} reconnects {}",
        snapshot.windows_completed, snapshot.dropped_payloads, snapshot.reconnect_attempts
    );
    line
}

/// Horizontal bar per band, scaled to the band's share of the total
pub fn band_bars(powers: &BandPowers) -> Vec<String> {
    powers
        .relative()
        .iter()
        .map(|(band, share)| {
            let filled = ((share * BAR_WIDTH as f32).round() as usize).min(BAR_WIDTH);
            format!(
                "{:<6} {}{} {:>5.1}%  ({:.4})",
                band.to_string(),
                "#".repeat(filled),
                ".".repeat(BAR_WIDTH - filled),
                share * 100.0,
                powers.get(band)
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurotrack_core::{Channel, RawSample};
    use neurotrack_link::LinkState;

    #[test]
    fn test_status_line_before_data() {
        let line = status_line(&TelemetrySnapshot::default());
        assert!(line.starts_with("[Idle] HR --"));
        assert!(line.contains("Alpha   0%"));
    }

    #[test]
    fn test_status_line_with_data() {
        let snapshot = TelemetrySnapshot {
            link_state: LinkState::Streaming,
            heart_rate: Some(RawSample::at(Channel::HeartRate, 71.6, 1_000)),
            eeg: Some(RawSample::at(Channel::Eeg, -4.25, 1_004)),
            band_powers: BandPowers::from_array([1.0, 1.0, 6.0, 1.0, 1.0]),
            windows_completed: 3,
            ..TelemetrySnapshot::default()
        };
        let line = status_line(&snapshot);
        assert!(line.contains("[Streaming] HR 72 bpm"));
        assert!(line.contains("Alpha  60%"));
        assert!(line.contains("windows 3"));
    }

    #[test]
    fn test_band_bars() {
        let bars = band_bars(&BandPowers::from_array([0.0, 0.0, 1.0, 0.0, 0.0]));
        assert_eq!(bars.len(), 5);
        assert!(bars[2].starts_with("Alpha  ##############################"));
        assert!(bars[0].contains("....."));
    }
}
