//! EEG frequency bands and per-window band powers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classic EEG rhythm bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Band {
    Delta,
    Theta,
    Alpha,
    Beta,
    Gamma,
}

impl Band {
    /// All bands in ascending frequency order
    pub const ALL: [Band; 5] = [Band::Delta, Band::Theta, Band::Alpha, Band::Beta, Band::Gamma];

    /// Half-open frequency range `[low, high)` in Hz
    pub const fn range(&self) -> (f32, f32) {
        match self {
            Band::Delta => (0.5, 4.0),
            Band::Theta => (4.0, 8.0),
            Band::Alpha => (8.0, 12.0),
            Band::Beta => (12.0, 30.0),
            Band::Gamma => (30.0, 100.0),
        }
    }

    /// Band containing `frequency`, or `None` below 0.5 Hz and from 100 Hz up
    pub fn for_frequency(frequency: f32) -> Option<Band> {
        Band::ALL.iter().copied().find(|band| {
            let (low, high) = band.range();
            frequency >= low && frequency < high
        })
    }

    /// Display name
    pub const fn name(&self) -> &'static str {
        match self {
            Band::Delta => "Delta",
            Band::Theta => "Theta",
            Band::Alpha => "Alpha",
            Band::Beta => "Beta",
            Band::Gamma => "Gamma",
        }
    }

    const fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Spectral magnitude summed per band for one analysis window
///
/// All five bands are always present; the default is all zero, which is
/// what consumers see before the first window completes. Serialized as an
/// object keyed by band name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "NamedBandPowers", into = "NamedBandPowers")]
pub struct BandPowers {
    powers: [f32; 5],
}

/// Wire form of [`BandPowers`]
#[derive(Serialize, Deserialize)]
struct NamedBandPowers {
    #[serde(rename = "Delta")]
    delta: f32,
    #[serde(rename = "Theta")]
    theta: f32,
    #[serde(rename = "Alpha")]
    alpha: f32,
    #[serde(rename = "Beta")]
    beta: f32,
    #[serde(rename = "Gamma")]
    gamma: f32,
}

impl From<NamedBandPowers> for BandPowers {
    fn from(named: NamedBandPowers) -> Self {
        BandPowers::from_array([named.delta, named.theta, named.alpha, named.beta, named.gamma])
    }
}

impl From<BandPowers> for NamedBandPowers {
    fn from(powers: BandPowers) -> Self {
        let [delta, theta, alpha, beta, gamma] = powers.powers;
        NamedBandPowers {
            delta,
            theta,
            alpha,
            beta,
            gamma,
        }
    }
}

impl BandPowers {
    /// All-zero band powers
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from values in `Band::ALL` order
    pub fn from_array(powers: [f32; 5]) -> Self {
        BandPowers { powers }
    }

    /// Power of one band
    pub fn get(&self, band: Band) -> f32 {
        self.powers[band.index()]
    }

    /// Add `value` to one band's running sum
    pub fn accumulate(&mut self, band: Band, value: f32) {
        self.powers[band.index()] += value;
    }

    /// Iterate `(band, power)` pairs in ascending frequency order
    pub fn iter(&self) -> impl Iterator<Item = (Band, f32)> + '_ {
        Band::ALL.iter().map(move |&band| (band, self.get(band)))
    }

    /// Sum over all bands
    pub fn total(&self) -> f32 {
        self.powers.iter().sum()
    }

    /// Band with the largest power, `None` when every band is zero
    pub fn dominant(&self) -> Option<Band> {
        self.iter()
            .filter(|(_, power)| *power > 0.0)
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(band, _)| band)
    }

    /// Each band as a fraction of the total; all zero when the total is zero
    pub fn relative(&self) -> BandPowers {
        let total = self.total();
        if total <= 0.0 {
            return BandPowers::default();
        }
        let mut powers = self.powers;
        for p in &mut powers {
            *p /= total;
        }
        BandPowers { powers }
    }
}

impl fmt::Display for BandPowers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (band, power) in self.iter() {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{}={:.4}", band, power)?;
            first = false;
        }
        Ok(())
    }
}
