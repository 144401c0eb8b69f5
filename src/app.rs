// src/app.rs
use anyhow::{Context, Result};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use crate::application::{BandMonitor, BandMonitorConfig};
use crate::domain::alert::{AlertGate, AlertGateConfig};
use crate::infrastructure::{build_fanout, http_client, MarketDataClient};
use crate::shared::config::Config;
use crate::shared::errors::ConfigError;

/// Values given on the command line; each one wins over the config file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub symbol: Option<String>,
    pub interval: Option<String>,
    pub check_interval_secs: Option<u64>,
    pub data_source: Option<String>,
    pub history_file: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppCfg {
    pub config: Config,
    pub monitor: BandMonitorConfig,
    pub cooldown_secs: u64,
}

impl AppCfg {
    /// Priority: CLI args > config file (env already applied) > defaults
    pub fn from_config(mut cfg: Config, overrides: CliOverrides) -> Result<Self, ConfigError> {
        if let Some(symbol) = overrides.symbol {
            cfg.trading.symbol = symbol;
        }
        if let Some(interval) = overrides.interval {
            cfg.trading.interval = interval;
        }
        if let Some(secs) = overrides.check_interval_secs {
            cfg.trading.check_interval_secs = secs;
        }
        if let Some(source) = overrides.data_source {
            cfg.trading.data_source = source;
        }
        if let Some(history_file) = overrides.history_file {
            cfg.alerts.history_file = history_file;
        }
        cfg.validate()?;

        let history_file = match cfg.alerts.history_file.trim() {
            "" => None,
            path => Some(PathBuf::from(path)),
        };

        let monitor = BandMonitorConfig {
            symbol: cfg.trading.symbol.clone(),
            interval: cfg.trading.interval.clone(),
            check_interval: Duration::from_secs(cfg.trading.check_interval_secs),
            period: cfg.bollinger_bands.period,
            multiplier: cfg.bollinger_bands.multiplier,
            proximity_percent: cfg.bollinger_bands.proximity_percent,
            history_margin: cfg.bollinger_bands.history_margin,
            history_file,
        };

        Ok(Self {
            cooldown_secs: cfg.alerts.cooldown_secs,
            config: cfg,
            monitor,
        })
    }
}

pub async fn run(app_cfg: AppCfg) -> Result<()> {
    let cfg = &app_cfg.config;
    info!("🚀 Starting Bollinger Band monitor");
    info!("   Symbol: {} ({})", cfg.trading.symbol, cfg.trading.interval);
    info!("   Data source: {}", cfg.trading.data_source);
    info!(
        "   Bands: period {}, multiplier {}, proximity {}%",
        cfg.bollinger_bands.period, cfg.bollinger_bands.multiplier, cfg.bollinger_bands.proximity_percent
    );
    info!(
        "   Alerts: {} via {:?}, cooldown {}s",
        if cfg.alerts.enabled { "enabled" } else { "disabled" },
        cfg.alerts.methods,
        app_cfg.cooldown_secs
    );

    let http = http_client(Duration::from_secs(cfg.http.timeout_secs))
        .context("Failed to build HTTP client")?;
    let source = MarketDataClient::from_config(cfg, http.clone())?;
    let fanout = build_fanout(cfg, &http);

    let mut gate = AlertGate::new(AlertGateConfig {
        symbol: cfg.trading.symbol.clone(),
        cooldown_secs: app_cfg.cooldown_secs,
    });
    if let Some(path) = &app_cfg.monitor.history_file {
        match gate.load(path) {
            Ok(()) => info!("✅ Restored {} alerts from {}", gate.len(), path.display()),
            Err(e) => warn!("⚠️ Could not restore alert history from {}: {}", path.display(), e),
        }
    }

    // handlers go in before the first tick
    let shutdown = shutdown_signal();
    let mut monitor = BandMonitor::new(app_cfg.monitor.clone(), source, gate, fanout)?;
    let summary = monitor.run(shutdown).await;

    info!(
        "✅ Monitor stopped: {} ticks, {} alerts this run, {} in history",
        summary.ticks, summary.alerts_this_run, summary.alerts_total
    );
    Ok(())
}

/// Install the signal handlers right away and resolve once a shutdown signal arrives.
///
/// If the handlers cannot be installed the returned future never resolves.
fn shutdown_signal() -> impl Future<Output = ()> {
    let (tx, rx) = oneshot::channel::<()>();
    spawn_signal_listener(tx);
    async move {
        if rx.await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(unix)]
fn spawn_signal_listener(tx: oneshot::Sender<()>) {
    use tokio::signal::unix::{signal, SignalKind};

    let handlers = signal(SignalKind::interrupt())
        .and_then(|sigint| Ok((sigint, signal(SignalKind::terminate())?)));
    let (mut sigint, mut sigterm) = match handlers {
        Ok(handlers) => handlers,
        Err(e) => {
            error!("❌ Failed to install signal handlers: {}", e);
            return;
        }
    };

    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => info!("🛑 Shutdown signal received (SIGINT/Ctrl+C)"),
            _ = sigterm.recv() => info!("🛑 Shutdown signal received (SIGTERM)"),
        }
        let _ = tx.send(());
    });
}

#[cfg(not(unix))]
fn spawn_signal_listener(tx: oneshot::Sender<()>) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("🛑 Shutdown signal received (Ctrl+C)");
                let _ = tx.send(());
            }
            Err(e) => error!("❌ Failed to listen for Ctrl+C: {}", e),
        }
    });
}
