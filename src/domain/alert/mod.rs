//! Alert domain - alert records, cooldown gating and history

mod gate;

pub use gate::{AlertGate, AlertGateConfig};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::bands::ProximityReport;

/// Which band edge an alert is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSide {
    Upper,
    Lower,
}

impl AlertSide {
    /// Evaluation order within a tick
    pub const ALL: [AlertSide; 2] = [AlertSide::Upper, AlertSide::Lower];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSide::Upper => "upper",
            AlertSide::Lower => "lower",
        }
    }
}

impl fmt::Display for AlertSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An accepted alert. Only `AlertGate` creates these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub side: AlertSide,
    pub message: String,
    pub price: f64,
    pub band_value: f64,
    pub distance_pct: f64,
    #[serde(rename = "details")]
    pub source_report: ProximityReport,
}

impl Alert {
    pub(crate) fn from_report(
        side: AlertSide,
        report: &ProximityReport,
        symbol: &str,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let headline = match side {
            AlertSide::Upper => "UPPER BAND ALERT",
            AlertSide::Lower => "LOWER BAND ALERT",
        };
        Self {
            timestamp,
            side,
            message: format!("⚠️ {} {}", headline, symbol),
            price: report.current_price,
            band_value: report.band(side),
            distance_pct: report.distance_pct(side),
            source_report: report.clone(),
        }
    }
}
