//! Rolling mean / sample standard deviation bands

use super::{Bands, ProximityReport};
use crate::domain::alert::AlertSide;
use crate::shared::errors::DomainError;
use crate::shared::utils::{percentage_distance, round_to};

const DISTANCE_DECIMALS: u32 = 3;
const BAND_DECIMALS: u32 = 2;

/// Bollinger Bands over a fixed trailing window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    period: usize,
    multiplier: f64,
}

impl BollingerBands {
    pub fn new(period: usize, multiplier: f64) -> Result<Self, DomainError> {
        if period < 2 {
            return Err(DomainError::InvalidPeriod(period));
        }
        if !(multiplier.is_finite() && multiplier > 0.0) {
            return Err(DomainError::InvalidMultiplier(multiplier));
        }
        Ok(Self { period, multiplier })
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Compute the three band series. Input shorter than `period` yields all `None`.
    ///
    /// Width uses the sample standard deviation (divide by `period - 1`).
    pub fn calculate(&self, closes: &[f64]) -> Bands {
        let len = closes.len();
        let mut bands = Bands {
            upper: vec![None; len],
            basis: vec![None; len],
            lower: vec![None; len],
        };

        if len < self.period {
            return bands;
        }

        for end in (self.period - 1)..len {
            let window = &closes[end + 1 - self.period..=end];
            let (mean, std_dev) = mean_and_sample_std(window);
            let width = self.multiplier * std_dev;

            bands.basis[end] = Some(mean);
            bands.upper[end] = Some(mean + width);
            bands.lower[end] = Some(mean - width);
        }

        bands
    }

    /// Distance of `current_price` to each band edge and whether it is within `threshold_pct`
    pub fn distance_and_proximity(
        current_price: f64,
        upper_band: f64,
        lower_band: f64,
        threshold_pct: f64,
    ) -> Result<ProximityReport, DomainError> {
        ensure_finite("current price", current_price)?;
        ensure_finite("upper band", upper_band)?;
        ensure_finite("lower band", lower_band)?;
        if upper_band == 0.0 {
            return Err(DomainError::ZeroBand(AlertSide::Upper));
        }
        if lower_band == 0.0 {
            return Err(DomainError::ZeroBand(AlertSide::Lower));
        }

        let distance_upper = percentage_distance(current_price, upper_band);
        let distance_lower = percentage_distance(current_price, lower_band);

        Ok(ProximityReport {
            current_price,
            upper_band: round_to(upper_band, BAND_DECIMALS),
            lower_band: round_to(lower_band, BAND_DECIMALS),
            distance_upper_pct: round_to(distance_upper, DISTANCE_DECIMALS),
            distance_lower_pct: round_to(distance_lower, DISTANCE_DECIMALS),
            near_upper: distance_upper <= threshold_pct,
            near_lower: distance_lower <= threshold_pct,
        })
    }
}

/// Computed against the first value of the window so a flat window is exact
fn mean_and_sample_std(window: &[f64]) -> (f64, f64) {
    let n = window.len() as f64;
    let base = window[0];
    let offset_mean = window.iter().map(|&x| x - base).sum::<f64>() / n;
    let variance = window
        .iter()
        .map(|&x| (x - base - offset_mean).powi(2))
        .sum::<f64>()
        / (n - 1.0);
    (base + offset_mean, variance.sqrt())
}

fn ensure_finite(field: &'static str, value: f64) -> Result<(), DomainError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(DomainError::NonFinite { field, value })
    }
}
