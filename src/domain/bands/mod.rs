//! Bands domain - rolling Bollinger Bands and proximity to their edges

mod calculator;

pub use calculator::BollingerBands;

use serde::{Deserialize, Serialize};

use crate::domain::alert::AlertSide;

/// Upper band, basis (rolling mean) and lower band, index-aligned with the input closes.
/// Entries before `period - 1` are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bands {
    pub upper: Vec<Option<f64>>,
    pub basis: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

impl Bands {
    pub fn len(&self) -> usize {
        self.basis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.basis.is_empty()
    }

    /// `(upper, basis, lower)` at the last index, if that index is warm
    pub fn latest(&self) -> Option<(f64, f64, f64)> {
        let upper = (*self.upper.last()?)?;
        let basis = (*self.basis.last()?)?;
        let lower = (*self.lower.last()?)?;
        Some((upper, basis, lower))
    }

    /// Number of indices with a defined value
    pub fn defined_count(&self) -> usize {
        self.basis.iter().filter(|v| v.is_some()).count()
    }
}

/// Where the current price sits relative to the band edges.
///
/// Distances are rounded to 3 decimals and the echoed bands to 2; the `near_*`
/// flags are decided on the unrounded distances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProximityReport {
    pub current_price: f64,
    pub upper_band: f64,
    pub lower_band: f64,
    pub distance_upper_pct: f64,
    pub distance_lower_pct: f64,
    pub near_upper: bool,
    pub near_lower: bool,
}

impl ProximityReport {
    pub fn band(&self, side: AlertSide) -> f64 {
        match side {
            AlertSide::Upper => self.upper_band,
            AlertSide::Lower => self.lower_band,
        }
    }

    pub fn distance_pct(&self, side: AlertSide) -> f64 {
        match side {
            AlertSide::Upper => self.distance_upper_pct,
            AlertSide::Lower => self.distance_lower_pct,
        }
    }

    pub fn is_near(&self, side: AlertSide) -> bool {
        match side {
            AlertSide::Upper => self.near_upper,
            AlertSide::Lower => self.near_lower,
        }
    }
}
