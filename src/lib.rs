//! Bandwatch - Bollinger Band proximity monitor
//! Polls a market data vendor, computes bands and raises rate-limited alerts

pub mod app;
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;

// Re-export main types for convenience
pub use application::{BandMonitor, BandMonitorConfig, MonitorState};
pub use domain::alert::{Alert, AlertGate, AlertSide};
pub use domain::bands::{BollingerBands, ProximityReport};
pub use domain::notification::{NotificationChannel, NotificationFanout};
pub use domain::price::PriceSource;
