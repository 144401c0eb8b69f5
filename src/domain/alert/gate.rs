//! Cooldown gate in front of the notification channels

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info};

use super::{Alert, AlertSide};
use crate::domain::bands::ProximityReport;
use crate::shared::errors::PersistenceError;

pub const DEFAULT_COOLDOWN_SECS: u64 = 300;

// chrono::Duration panics past i64::MAX milliseconds
const MAX_COOLDOWN_SECS: u64 = i64::MAX as u64 / 1000;

#[derive(Debug, Clone)]
pub struct AlertGateConfig {
    pub symbol: String,
    pub cooldown_secs: u64,
}

impl Default for AlertGateConfig {
    fn default() -> Self {
        Self {
            symbol: String::new(),
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
        }
    }
}

/// Turns proximity reports into alerts, at most one per side per cooldown window.
///
/// Cooldown timestamps live only as long as the gate; the history can be
/// persisted and restored.
#[derive(Debug)]
pub struct AlertGate {
    symbol: String,
    cooldown: Duration,
    last_alert: HashMap<AlertSide, DateTime<Utc>>,
    history: Vec<Alert>,
}

impl AlertGate {
    pub fn new(config: AlertGateConfig) -> Self {
        Self {
            symbol: config.symbol,
            cooldown: Duration::seconds(config.cooldown_secs.min(MAX_COOLDOWN_SECS) as i64),
            last_alert: HashMap::new(),
            history: Vec::new(),
        }
    }

    /// Gate a report observed at `now`. Returns 0, 1 or 2 alerts, upper first.
    pub fn evaluate(&mut self, report: &ProximityReport, now: DateTime<Utc>) -> Vec<Alert> {
        let mut alerts = Vec::new();

        for side in AlertSide::ALL {
            if !report.is_near(side) {
                continue;
            }
            if !self.cooldown_elapsed(side, now) {
                debug!("{} band near but still cooling down", side);
                continue;
            }

            self.last_alert.insert(side, now);
            let alert = Alert::from_report(side, report, &self.symbol, now);
            self.history.push(alert.clone());
            alerts.push(alert);
        }

        alerts
    }

    fn cooldown_elapsed(&self, side: AlertSide, now: DateTime<Utc>) -> bool {
        match self.last_alert.get(&side) {
            None => true,
            Some(last) => now.signed_duration_since(*last) >= self.cooldown,
        }
    }

    pub fn last_alert_at(&self, side: AlertSide) -> Option<DateTime<Utc>> {
        self.last_alert.get(&side).copied()
    }

    /// Most recent `limit` alerts, oldest first
    pub fn history(&self, limit: usize) -> &[Alert] {
        let start = self.history.len().saturating_sub(limit);
        &self.history[start..]
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Snapshot of the full history as a JSON document
    pub fn persist(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string_pretty(&self.history)?)
    }

    /// Replace the history with a snapshot. Cooldowns are left untouched.
    pub fn restore(&mut self, snapshot: &str) -> Result<(), PersistenceError> {
        self.history = serde_json::from_str(snapshot)?;
        Ok(())
    }

    /// Overwrite `path` with the full history
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), PersistenceError> {
        fs::write(path.as_ref(), self.persist()?)?;
        info!("💾 Saved {} alerts to {}", self.history.len(), path.as_ref().display());
        Ok(())
    }

    /// Restore from `path`; a missing file means an empty history
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), PersistenceError> {
        match fs::read_to_string(path.as_ref()) {
            Ok(snapshot) => self.restore(&snapshot),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.history.clear();
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn gate() -> AlertGate {
        AlertGate::new(AlertGateConfig {
            symbol: "BTCUSDT".to_string(),
            cooldown_secs: 300,
        })
    }

    fn report(near_upper: bool, near_lower: bool) -> ProximityReport {
        ProximityReport {
            current_price: 100.4,
            upper_band: 100.5,
            lower_band: 99.6,
            distance_upper_pct: 0.1,
            distance_lower_pct: 0.803,
            near_upper,
            near_lower,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_no_alert_when_not_near() {
        let mut gate = gate();
        assert!(gate.evaluate(&report(false, false), t0()).is_empty());
        assert!(gate.is_empty());
        assert!(gate.last_alert_at(AlertSide::Upper).is_none());
    }

    #[test]
    fn test_alert_fields() {
        let mut gate = gate();
        let alerts = gate.evaluate(&report(true, false), t0());
        assert_eq!(alerts.len(), 1);

        let alert = &alerts[0];
        assert_eq!(alert.side, AlertSide::Upper);
        assert_eq!(alert.timestamp, t0());
        assert_eq!(alert.price, 100.4);
        assert_eq!(alert.band_value, 100.5);
        assert_eq!(alert.distance_pct, 0.1);
        assert_eq!(alert.source_report, report(true, false));
        assert!(alert.message.contains("UPPER"));
        assert!(alert.message.contains("BTCUSDT"));
        assert_eq!(gate.history(10), &alerts[..]);
        assert_eq!(gate.last_alert_at(AlertSide::Upper), Some(t0()));
    }

    #[test]
    fn test_cooldown_suppresses_within_window() {
        let mut gate = gate();
        assert_eq!(gate.evaluate(&report(true, false), t0()).len(), 1);
        assert!(gate
            .evaluate(&report(true, false), t0() + Duration::seconds(299))
            .is_empty());
        assert_eq!(gate.len(), 1);
        // the suppressed tick does not move the timer
        assert_eq!(gate.last_alert_at(AlertSide::Upper), Some(t0()));
    }

    #[test]
    fn test_cooldown_elapsed_fires_again() {
        let mut gate = gate();
        assert_eq!(gate.evaluate(&report(true, false), t0()).len(), 1);
        let later = t0() + Duration::seconds(300);
        assert_eq!(gate.evaluate(&report(true, false), later).len(), 1);
        assert_eq!(gate.len(), 2);
        assert_eq!(gate.last_alert_at(AlertSide::Upper), Some(later));
    }

    #[test]
    fn test_many_ticks_one_alert_per_window() {
        let mut gate = gate();
        let fired: usize = (0..60)
            .map(|i| {
                gate.evaluate(&report(true, false), t0() + Duration::seconds(i * 10))
                    .len()
            })
            .sum();
        // t = 0, 300 within 0..590
        assert_eq!(fired, 2);
    }

    #[test]
    fn test_sides_are_tracked_independently() {
        let mut gate = gate();
        assert_eq!(gate.evaluate(&report(true, false), t0()).len(), 1);

        let alerts = gate.evaluate(&report(true, true), t0() + Duration::seconds(10));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].side, AlertSide::Lower);
    }

    #[test]
    fn test_both_sides_in_one_tick() {
        let mut gate = gate();
        let alerts = gate.evaluate(&report(true, true), t0());
        let sides: Vec<AlertSide> = alerts.iter().map(|a| a.side).collect();
        assert_eq!(sides, vec![AlertSide::Upper, AlertSide::Lower]);
        assert_eq!(alerts[1].band_value, 99.6);
        assert_eq!(alerts[1].distance_pct, 0.803);
    }

    #[test]
    fn test_zero_cooldown_fires_every_time() {
        let mut gate = AlertGate::new(AlertGateConfig {
            symbol: "X".into(),
            cooldown_secs: 0,
        });
        assert_eq!(gate.evaluate(&report(true, false), t0()).len(), 1);
        assert_eq!(gate.evaluate(&report(true, false), t0()).len(), 1);
    }

    #[test]
    fn test_history_limit_keeps_latest_in_order() {
        let mut gate = gate();
        for i in 0..5 {
            gate.evaluate(&report(true, false), t0() + Duration::seconds(i * 300));
        }
        let recent = gate.history(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].timestamp, t0() + Duration::seconds(900));
        assert_eq!(recent[1].timestamp, t0() + Duration::seconds(1200));
        assert_eq!(gate.history(100).len(), 5);
        assert!(gate.history(0).is_empty());
    }

    #[test]
    fn test_persist_restore_empty() {
        let gate = gate();
        let snapshot = gate.persist().unwrap();

        let mut restored = AlertGate::new(AlertGateConfig::default());
        restored.restore(&snapshot).unwrap();
        assert!(restored.is_empty());
    }

    #[test]
    fn test_persist_restore_round_trip() {
        let mut gate = gate();
        gate.evaluate(&report(true, true), t0());
        gate.evaluate(&report(true, false), t0() + Duration::seconds(301));
        let snapshot = gate.persist().unwrap();

        let mut restored = AlertGate::new(AlertGateConfig::default());
        restored.restore(&snapshot).unwrap();
        assert_eq!(restored.history(usize::MAX), gate.history(usize::MAX));
        // cooldown timers are not part of the snapshot
        assert!(restored.last_alert_at(AlertSide::Upper).is_none());
    }

    #[test]
    fn test_snapshot_format() {
        let mut gate = gate();
        gate.evaluate(&report(true, false), t0());
        let value: serde_json::Value = serde_json::from_str(&gate.persist().unwrap()).unwrap();

        let record = &value[0];
        assert_eq!(record["type"], "upper");
        assert_eq!(record["timestamp"], "2024-01-01T12:00:00Z");
        assert_eq!(record["band_value"], 100.5);
        assert_eq!(record["details"]["near_upper"], true);
        assert_eq!(record["details"]["distance_lower_pct"], 0.803);
    }

    #[test]
    fn test_restore_rejects_garbage() {
        let mut gate = gate();
        assert!(matches!(
            gate.restore("not json"),
            Err(PersistenceError::Serialize(_))
        ));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alert_history.json");

        let mut gate = gate();
        gate.evaluate(&report(false, true), t0());
        gate.save(&path).unwrap();

        let mut loaded = AlertGate::new(AlertGateConfig::default());
        loaded.load(&path).unwrap();
        assert_eq!(loaded.history(10), gate.history(10));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut gate = gate();
        gate.evaluate(&report(true, false), t0());

        gate.load(dir.path().join("missing.json")).unwrap();
        assert!(gate.is_empty());
    }
}
