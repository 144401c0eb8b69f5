//! Fetch → compute → gate → dispatch loop for one instrument

use chrono::{DateTime, Utc};
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::domain::alert::{Alert, AlertGate};
use crate::domain::bands::{BollingerBands, ProximityReport};
use crate::domain::notification::{NotificationChannel, NotificationFanout};
use crate::domain::price::PriceSource;
use crate::shared::errors::{DomainError, FetchError, MonitorError};

/// Where the loop is within a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Fetching,
    Computing,
    Gating,
    Dispatching,
    Sleeping,
    Shutdown,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MonitorState::Fetching => "fetching",
            MonitorState::Computing => "computing",
            MonitorState::Gating => "gating",
            MonitorState::Dispatching => "dispatching",
            MonitorState::Sleeping => "sleeping",
            MonitorState::Shutdown => "shutdown",
        };
        f.write_str(name)
    }
}

/// Monitor configuration
#[derive(Debug, Clone)]
pub struct BandMonitorConfig {
    pub symbol: String,
    pub interval: String,
    pub check_interval: Duration,
    pub period: usize,
    pub multiplier: f64,
    pub proximity_percent: f64,
    /// Extra closes requested on top of `period` so the window is always warm
    pub history_margin: usize,
    /// Where the alert history is written on shutdown
    pub history_file: Option<PathBuf>,
}

impl Default for BandMonitorConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            interval: "1h".to_string(),
            check_interval: Duration::from_secs(60),
            period: 20,
            multiplier: 2.0,
            proximity_percent: 0.1,
            history_margin: 50,
            history_file: None,
        }
    }
}

/// Monitoring statistics
#[derive(Debug, Clone)]
pub struct MonitorStats {
    pub start_time: Instant,
    pub ticks: u64,
    pub failed_ticks: u64,
    pub alerts_raised: u64,
    pub dispatch_failures: u64,
}

impl MonitorStats {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            ticks: 0,
            failed_ticks: 0,
            alerts_raised: 0,
            dispatch_failures: 0,
        }
    }

    pub fn get_uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Default for MonitorStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one successful tick
#[derive(Debug, Clone)]
pub struct TickReport {
    pub report: ProximityReport,
    pub basis: f64,
    pub alerts: Vec<Alert>,
    pub dispatch_failures: usize,
}

/// What the loop reports when it exits
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSummary {
    pub ticks: u64,
    pub failed_ticks: u64,
    pub alerts_this_run: u64,
    /// Whole history, including alerts restored at startup
    pub alerts_total: usize,
    pub history_saved: bool,
}

/// Polls one instrument and alerts when price nears a band edge.
///
/// Ticks never overlap, so the gate's cooldown state is only touched from here.
pub struct BandMonitor<P, C> {
    config: BandMonitorConfig,
    source: P,
    bands: BollingerBands,
    gate: AlertGate,
    fanout: NotificationFanout<C>,
    stats: MonitorStats,
    state: MonitorState,
}

impl<P, C> BandMonitor<P, C>
where
    P: PriceSource,
    C: NotificationChannel,
{
    pub fn new(
        config: BandMonitorConfig,
        source: P,
        gate: AlertGate,
        fanout: NotificationFanout<C>,
    ) -> Result<Self, DomainError> {
        let bands = BollingerBands::new(config.period, config.multiplier)?;
        Ok(Self {
            config,
            source,
            bands,
            gate,
            fanout,
            stats: MonitorStats::new(),
            state: MonitorState::Sleeping,
        })
    }

    pub fn gate(&self) -> &AlertGate {
        &self.gate
    }

    pub fn stats(&self) -> &MonitorStats {
        &self.stats
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    fn fetch_failed(&self, source: FetchError) -> MonitorError {
        MonitorError::Fetch {
            stage: self.state,
            symbol: self.config.symbol.clone(),
            source,
        }
    }

    fn insufficient(&self, available: usize) -> MonitorError {
        MonitorError::InsufficientData {
            stage: self.state,
            symbol: self.config.symbol.clone(),
            required: self.bands.period(),
            available,
        }
    }

    /// Run one full fetch → compute → gate → dispatch cycle observed at `now`.
    ///
    /// Any error before gating leaves the gate untouched.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Result<TickReport, MonitorError> {
        self.stats.ticks += 1;

        self.state = MonitorState::Fetching;
        let count = self.bands.period() + self.config.history_margin;
        let closes = self
            .source
            .fetch_closes(&self.config.symbol, &self.config.interval, count)
            .await
            .map_err(|e| self.fetch_failed(e))?;
        let current_price = self
            .source
            .fetch_current_price(&self.config.symbol)
            .await
            .map_err(|e| self.fetch_failed(e))?;

        self.state = MonitorState::Computing;
        if closes.len() < self.bands.period() {
            return Err(self.insufficient(closes.len()));
        }
        let bands = self.bands.calculate(&closes);
        let (upper, basis, lower) = bands.latest().ok_or_else(|| self.insufficient(closes.len()))?;
        let report = BollingerBands::distance_and_proximity(
            current_price,
            upper,
            lower,
            self.config.proximity_percent,
        )
        .map_err(|source| MonitorError::Domain {
            stage: self.state,
            symbol: self.config.symbol.clone(),
            source,
        })?;

        info!(
            "[{}] Price: {} | Upper: {} ({}%) | Lower: {} ({}%)",
            self.config.symbol,
            report.current_price,
            report.upper_band,
            report.distance_upper_pct,
            report.lower_band,
            report.distance_lower_pct
        );

        self.state = MonitorState::Gating;
        let alerts = self.gate.evaluate(&report, now);
        self.stats.alerts_raised += alerts.len() as u64;

        self.state = MonitorState::Dispatching;
        let mut dispatch_failures = 0;
        for alert in &alerts {
            info!("🚨 {} (price {}, band {})", alert.message, alert.price, alert.band_value);
            dispatch_failures += self.fanout.dispatch(alert).await.len();
        }
        self.stats.dispatch_failures += dispatch_failures as u64;

        Ok(TickReport {
            report,
            basis,
            alerts,
            dispatch_failures,
        })
    }

    /// Tick every `check_interval` until `shutdown` resolves, then persist the history.
    ///
    /// Shutdown is noticed while sleeping; a tick already in progress completes first.
    pub async fn run<S>(&mut self, shutdown: S) -> MonitorSummary
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(
            "🚀 Monitoring {} on {} every {:?} (period {}, x{}, proximity {}%)",
            self.config.symbol,
            self.source.name(),
            self.config.check_interval,
            self.bands.period(),
            self.bands.multiplier(),
            self.config.proximity_percent
        );

        loop {
            if let Err(e) = self.tick(Utc::now()).await {
                self.stats.failed_ticks += 1;
                if e.is_noteworthy() {
                    error!("❌ {}", e);
                } else {
                    warn!("⚠️ {}", e);
                }
            }

            self.state = MonitorState::Sleeping;
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("🛑 Shutdown requested");
                    break;
                }
                _ = tokio::time::sleep(self.config.check_interval) => {}
            }
        }

        self.shutdown()
    }

    fn shutdown(&mut self) -> MonitorSummary {
        self.state = MonitorState::Shutdown;

        let history_saved = match &self.config.history_file {
            Some(path) => match self.gate.save(path) {
                Ok(()) => true,
                Err(e) => {
                    warn!("⚠️ Failed to save alert history to {}: {}", path.display(), e);
                    false
                }
            },
            None => {
                debug!("No history file configured, history not saved");
                false
            }
        };

        self.print_monitor_stats();

        MonitorSummary {
            ticks: self.stats.ticks,
            failed_ticks: self.stats.failed_ticks,
            alerts_this_run: self.stats.alerts_raised,
            alerts_total: self.gate.len(),
            history_saved,
        }
    }

    fn print_monitor_stats(&self) {
        let stats = &self.stats;
        info!("📊 Monitoring statistics:");
        info!("   Uptime: {:.1} min", stats.get_uptime().as_secs_f64() / 60.0);
        info!("   Ticks: {} ({} failed)", stats.ticks, stats.failed_ticks);
        info!("   Alerts this run: {}", stats.alerts_raised);
        if stats.dispatch_failures > 0 {
            info!("   Failed deliveries: {}", stats.dispatch_failures);
        }
        info!("   Total alerts in history: {}", self.gate.len());
    }
}
