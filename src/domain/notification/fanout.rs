//! Deliver one alert to every registered channel

use futures::future::join_all;
use tracing::{debug, warn};

use super::NotificationChannel;
use crate::domain::alert::Alert;
use crate::shared::errors::DispatchError;

/// Registered channels, all attempted on every dispatch
pub struct NotificationFanout<C> {
    channels: Vec<C>,
}

impl<C: NotificationChannel> NotificationFanout<C> {
    pub fn new() -> Self {
        Self { channels: Vec::new() }
    }

    pub fn register(&mut self, channel: C) {
        debug!("Registered notification channel {}", channel.name());
        self.channels.push(channel);
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Send to all channels concurrently and collect the failures.
    /// A failing or slow channel never prevents the others from being attempted.
    pub async fn dispatch(&self, alert: &Alert) -> Vec<DispatchError> {
        let results = join_all(self.channels.iter().map(|channel| async move {
            channel
                .send(alert)
                .await
                .map_err(|source| DispatchError {
                    channel: channel.name().to_string(),
                    source,
                })
        }))
        .await;

        let failures: Vec<DispatchError> = results.into_iter().filter_map(Result::err).collect();
        for failure in &failures {
            warn!("⚠️ {} alert not delivered: {}", alert.side, failure);
        }
        failures
    }
}

impl<C: NotificationChannel> Default for NotificationFanout<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::alert::{AlertGate, AlertGateConfig};
    use crate::domain::bands::ProximityReport;
    use crate::shared::errors::NotifyError;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct FakeChannel {
        name: String,
        fail: bool,
        delay: Duration,
        delivered: Arc<AtomicUsize>,
    }

    impl FakeChannel {
        fn new(name: &str, fail: bool, delivered: &Arc<AtomicUsize>) -> Self {
            Self {
                name: name.to_string(),
                fail,
                delay: Duration::ZERO,
                delivered: Arc::clone(delivered),
            }
        }
    }

    #[async_trait]
    impl NotificationChannel for FakeChannel {
        fn name(&self) -> &str {
            &self.name
        }

        async fn send(&self, _alert: &Alert) -> Result<(), NotifyError> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(NotifyError::Rejected {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            self.delivered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn alert() -> Alert {
        let mut gate = AlertGate::new(AlertGateConfig::default());
        let report = ProximityReport {
            current_price: 100.0,
            upper_band: 100.05,
            lower_band: 95.0,
            distance_upper_pct: 0.05,
            distance_lower_pct: 5.263,
            near_upper: true,
            near_lower: false,
        };
        gate.evaluate(&report, Utc::now()).remove(0)
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let delivered = Arc::new(AtomicUsize::new(0));
        let mut fanout = NotificationFanout::new();
        fanout.register(FakeChannel::new("console", false, &delivered));
        fanout.register(FakeChannel::new("telegram", true, &delivered));
        fanout.register(FakeChannel::new("email", false, &delivered));

        let failures = fanout.dispatch(&alert()).await;
        assert_eq!(delivered.load(Ordering::SeqCst), 2);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].channel, "telegram");
        assert!(matches!(failures[0].source, NotifyError::Rejected { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_all_failures_collected() {
        let delivered = Arc::new(AtomicUsize::new(0));
        let mut fanout = NotificationFanout::new();
        fanout.register(FakeChannel::new("a", true, &delivered));
        fanout.register(FakeChannel::new("b", true, &delivered));

        let failures = fanout.dispatch(&alert()).await;
        let names: Vec<&str> = failures.iter().map(|f| f.channel.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(delivered.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_channels_is_noop() {
        let fanout: NotificationFanout<FakeChannel> = NotificationFanout::new();
        assert!(fanout.is_empty());
        assert!(fanout.dispatch(&alert()).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_channels_run_concurrently() {
        let delivered = Arc::new(AtomicUsize::new(0));
        let mut fanout = NotificationFanout::new();
        for name in ["slow-a", "slow-b", "slow-c"] {
            let mut channel = FakeChannel::new(name, false, &delivered);
            channel.delay = Duration::from_secs(5);
            fanout.register(channel);
        }
        assert_eq!(fanout.channel_names(), vec!["slow-a", "slow-b", "slow-c"]);

        let started = tokio::time::Instant::now();
        let failures = fanout.dispatch(&alert()).await;
        assert!(failures.is_empty());
        assert_eq!(delivered.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
