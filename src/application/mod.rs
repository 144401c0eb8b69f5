//! Application layer - the monitoring loop

pub mod band_monitor;

pub use band_monitor::{
    BandMonitor, BandMonitorConfig, MonitorState, MonitorStats, MonitorSummary, TickReport,
};
