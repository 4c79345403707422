//! Canonical EEG rhythm bands.
//!
//! | rhythm | range (Hz) |
//! |--------|-----------:|
//! | delta  | 0.5 – 4    |
//! | theta  | 4 – 8      |
//! | alpha  | 8 – 13     |
//! | beta   | 13 – 30    |
//! | gamma  | 30 – 100   |
//!
//! Iteration order is always the table order above; ties in "largest band"
//! selections resolve to the earlier entry.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EegError;

/// One of the five canonical rhythms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rhythm {
    Delta,
    Theta,
    Alpha,
    Beta,
    Gamma,
}

impl Rhythm {
    /// All rhythms in canonical order.
    pub const ALL: [Rhythm; 5] = [
        Rhythm::Delta,
        Rhythm::Theta,
        Rhythm::Alpha,
        Rhythm::Beta,
        Rhythm::Gamma,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Rhythm::Delta => "delta",
            Rhythm::Theta => "theta",
            Rhythm::Alpha => "alpha",
            Rhythm::Beta => "beta",
            Rhythm::Gamma => "gamma",
        }
    }

    /// The canonical frequency interval of this rhythm.
    pub fn band(self) -> FrequencyBand {
        match self {
            Rhythm::Delta => FrequencyBand::new(0.5, 4.0),
            Rhythm::Theta => FrequencyBand::new(4.0, 8.0),
            Rhythm::Alpha => FrequencyBand::new(8.0, 13.0),
            Rhythm::Beta => FrequencyBand::new(13.0, 30.0),
            Rhythm::Gamma => FrequencyBand::new(30.0, 100.0),
        }
    }
}

impl fmt::Display for Rhythm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Rhythm {
    type Err = EegError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "delta" => Ok(Rhythm::Delta),
            "theta" => Ok(Rhythm::Theta),
            "alpha" => Ok(Rhythm::Alpha),
            "beta" => Ok(Rhythm::Beta),
            "gamma" => Ok(Rhythm::Gamma),
            _ => Err(EegError::UnknownRhythm(s.to_string())),
        }
    }
}

/// Closed frequency interval `[low_hz, high_hz]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    pub low_hz: f64,
    pub high_hz: f64,
}

impl FrequencyBand {
    pub const fn new(low_hz: f64, high_hz: f64) -> Self {
        Self { low_hz, high_hz }
    }

    /// Inclusive on both edges.
    pub fn contains(&self, freq_hz: f64) -> bool {
        freq_hz >= self.low_hz && freq_hz <= self.high_hz
    }

    pub fn width(&self) -> f64 {
        self.high_hz - self.low_hz
    }
}

/// The canonical `(rhythm, band)` table in iteration order.
pub fn canonical_bands() -> [(Rhythm, FrequencyBand); 5] {
    Rhythm::ALL.map(|r| (r, r.band()))
}

/// First rhythm (canonical order) whose closed band contains `freq_hz`.
///
/// Shared edges (4, 8, 13, 30 Hz) go to the lower band, which keeps the
/// bands disjoint when summing spectral bins.
pub fn rhythm_for_frequency(freq_hz: f64) -> Option<Rhythm> {
    Rhythm::ALL.into_iter().find(|r| r.band().contains(freq_hz))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_order_and_edges() {
        let names: Vec<_> = canonical_bands().iter().map(|(r, _)| r.name()).collect();
        assert_eq!(names, ["delta", "theta", "alpha", "beta", "gamma"]);
        assert_eq!(Rhythm::Gamma.band(), FrequencyBand::new(30.0, 100.0));
    }

    #[test]
    fn shared_edges_go_to_lower_band() {
        assert_eq!(rhythm_for_frequency(4.0), Some(Rhythm::Delta));
        assert_eq!(rhythm_for_frequency(8.0), Some(Rhythm::Theta));
        assert_eq!(rhythm_for_frequency(10.0), Some(Rhythm::Alpha));
        assert_eq!(rhythm_for_frequency(0.25), None);
        assert_eq!(rhythm_for_frequency(120.0), None);
    }

    #[test]
    fn parse_names() {
        assert_eq!("Alpha".parse::<Rhythm>().unwrap(), Rhythm::Alpha);
        assert!("mu".parse::<Rhythm>().is_err());
    }
}
