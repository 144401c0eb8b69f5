//! Notification channels: console, Telegram, email

pub mod console;
pub mod email;
pub mod telegram;

pub use console::ConsoleNotifier;
pub use email::EmailNotifier;
pub use telegram::TelegramNotifier;

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{info, warn};

use crate::domain::alert::Alert;
use crate::domain::notification::{NotificationChannel, NotificationFanout};
use crate::shared::config::Config;
use crate::shared::errors::NotifyError;

/// The channel kinds a deployment can enable
pub enum Notifier {
    Console(ConsoleNotifier),
    Telegram(TelegramNotifier),
    Email(EmailNotifier),
}

#[async_trait]
impl NotificationChannel for Notifier {
    fn name(&self) -> &str {
        match self {
            Notifier::Console(n) => n.name(),
            Notifier::Telegram(n) => n.name(),
            Notifier::Email(n) => n.name(),
        }
    }

    async fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        match self {
            Notifier::Console(n) => n.send(alert).await,
            Notifier::Telegram(n) => n.send(alert).await,
            Notifier::Email(n) => n.send(alert).await,
        }
    }
}

/// Register every enabled method that has what it needs.
/// Methods missing credentials are skipped with a warning.
pub fn build_fanout(cfg: &Config, http_client: &Client) -> NotificationFanout<Notifier> {
    let mut fanout = NotificationFanout::new();

    if !cfg.alerts.enabled {
        info!("Alerts disabled, no notification channels registered");
        return fanout;
    }

    let timeout = Duration::from_secs(cfg.http.timeout_secs);
    for method in &cfg.alerts.methods {
        match method.to_lowercase().as_str() {
            "console" => fanout.register(Notifier::Console(ConsoleNotifier::new())),
            "telegram" => {
                let tg = &cfg.telegram;
                if tg.bot_token.is_empty() || tg.chat_id.is_empty() {
                    warn!("⚠️ Telegram enabled but bot_token/chat_id missing, skipping");
                    continue;
                }
                fanout.register(Notifier::Telegram(TelegramNotifier::new(
                    http_client.clone(),
                    &tg.bot_token,
                    &tg.chat_id,
                )));
            }
            "email" => {
                let email = &cfg.email;
                let complete = [
                    &email.smtp_server,
                    &email.sender_email,
                    &email.sender_password,
                    &email.receiver_email,
                ]
                .iter()
                .all(|field| !field.is_empty());
                if !complete {
                    warn!("⚠️ Email enabled but SMTP settings incomplete, skipping");
                    continue;
                }
                match EmailNotifier::new(email, timeout) {
                    Ok(notifier) => fanout.register(Notifier::Email(notifier)),
                    Err(e) => warn!("⚠️ Email channel not created: {}", e),
                }
            }
            other => warn!("Unknown notification method {:?}, skipping", other),
        }
    }

    info!("Notification channels: {:?}", fanout.channel_names());
    fanout
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::alert::{AlertGate, AlertGateConfig};
    use crate::domain::bands::ProximityReport;
    use chrono::{TimeZone, Utc};

    pub(crate) fn sample_alert() -> Alert {
        alert_for("BTCUSDT")
    }

    fn alert_for(symbol: &str) -> Alert {
        let mut gate = AlertGate::new(AlertGateConfig {
            symbol: symbol.to_string(),
            cooldown_secs: 300,
        });
        let report = ProximityReport {
            current_price: 43500.0,
            upper_band: 43520.12,
            lower_band: 42100.5,
            distance_upper_pct: 0.046,
            distance_lower_pct: 3.325,
            near_upper: true,
            near_lower: false,
        };
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 30, 5).unwrap();
        gate.evaluate(&report, at).remove(0)
    }

    fn config(extra: &str) -> Config {
        Config::from_toml_str(&format!("[trading]\nsymbol = \"BTCUSDT\"\n{}", extra)).unwrap()
    }

    #[test]
    fn test_console_format() {
        let text = console::format_console(&sample_alert());
        assert!(text.contains("UPPER BAND ALERT BTCUSDT"));
        assert!(text.contains("Current price: 43500"));
        assert!(text.contains("upper band: 43520.12"));
        assert!(text.contains("Distance: 0.046%"));
    }

    #[test]
    fn test_telegram_format() {
        let text = telegram::format_telegram(&sample_alert());
        assert!(text.starts_with("⚠️ UPPER BAND ALERT BTCUSDT"));
        assert!(text.contains("📏 Distance: 0.046%"));
        assert!(text.ends_with("🕐 12:30:05"));
    }

    #[test]
    fn test_telegram_escapes_markup() {
        let text = telegram::format_telegram(&alert_for("AT&T<1>"));
        assert!(text.starts_with("⚠️ UPPER BAND ALERT AT&amp;T&lt;1&gt;"));
        assert!(!text.contains('<'));
        assert_eq!(telegram::escape_html("a & b > c"), "a &amp; b &gt; c");
    }

    /// Text of an error and everything underneath it
    fn error_chain(err: &dyn std::error::Error) -> String {
        let mut text = err.to_string();
        let mut source = err.source();
        while let Some(inner) = source {
            text.push_str(" | ");
            text.push_str(&inner.to_string());
            source = inner.source();
        }
        text
    }

    #[tokio::test]
    async fn test_telegram_failure_hides_bot_token() {
        // nothing listens on port 1
        let notifier = TelegramNotifier::with_api_base(
            Client::new(),
            "http://127.0.0.1:1",
            "123456:SECRET-TOKEN",
            "42",
        );
        let mut fanout = NotificationFanout::new();
        fanout.register(Notifier::Telegram(notifier));

        let failures = fanout.dispatch(&sample_alert()).await;
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0].source, NotifyError::Http(_)));
        let logged = error_chain(&failures[0]);
        assert!(logged.starts_with("channel telegram failed: HTTP request failed"));
        assert!(!logged.contains("SECRET-TOKEN"), "token leaked: {}", logged);
    }

    #[test]
    fn test_email_subject_and_body() {
        let alert = sample_alert();
        assert_eq!(email::format_subject(&alert), "Trading Alert - UPPER band");
        let body = email::format_body(&alert);
        assert!(body.contains("upper band: 43520.12"));
        assert!(body.contains("2024-01-01T12:30:05+00:00"));
    }

    #[test]
    fn test_default_methods_register_console() {
        let fanout = build_fanout(&config(""), &Client::new());
        assert_eq!(fanout.channel_names(), vec!["console"]);
    }

    #[test]
    fn test_disabled_alerts_register_nothing() {
        let fanout = build_fanout(
            &config("[alerts]\nenabled = false\nmethods = [\"console\"]\n"),
            &Client::new(),
        );
        assert!(fanout.is_empty());
    }

    #[test]
    fn test_unconfigured_channels_are_skipped() {
        let fanout = build_fanout(
            &config("[alerts]\nmethods = [\"console\", \"telegram\", \"email\"]\n"),
            &Client::new(),
        );
        assert_eq!(fanout.channel_names(), vec!["console"]);
    }

    #[test]
    fn test_telegram_registered_with_credentials() {
        let fanout = build_fanout(
            &config("[alerts]\nmethods = [\"telegram\"]\n[telegram]\nbot_token = \"123:abc\"\nchat_id = \"42\"\n"),
            &Client::new(),
        );
        assert_eq!(fanout.channel_names(), vec!["telegram"]);
    }
}
