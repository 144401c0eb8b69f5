use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

use crate::domain::alert::Alert;
use crate::domain::notification::NotificationChannel;
use crate::shared::config::EmailCfg;
use crate::shared::errors::NotifyError;

/// Submits alerts over authenticated STARTTLS SMTP
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailNotifier {
    pub fn new(cfg: &EmailCfg, timeout: Duration) -> Result<Self, NotifyError> {
        let from = parse_mailbox(&cfg.sender_email)?;
        let to = parse_mailbox(&cfg.receiver_email)?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.smtp_server)
            .map_err(|e| NotifyError::Mail(e.to_string()))?
            .port(cfg.smtp_port)
            .credentials(Credentials::new(
                cfg.sender_email.clone(),
                cfg.sender_password.clone(),
            ))
            .timeout(Some(timeout))
            .build();
        Ok(Self { transport, from, to })
    }

    fn build_message(&self, alert: &Alert) -> Result<Message, NotifyError> {
        build_message(self.from.clone(), self.to.clone(), alert)
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| NotifyError::InvalidAddress(format!("{}: {}", address, e)))
}

pub(crate) fn format_subject(alert: &Alert) -> String {
    format!("Trading Alert - {} band", alert.side.as_str().to_uppercase())
}

pub(crate) fn format_body(alert: &Alert) -> String {
    format!(
        "Trading alert - Bollinger Bands\n\n{}\n\nCurrent price: {}\n{} band: {}\nDistance: {}%\n\nTime: {}\n",
        alert.message,
        alert.price,
        alert.side,
        alert.band_value,
        alert.distance_pct,
        alert.timestamp.to_rfc3339(),
    )
}

fn build_message(from: Mailbox, to: Mailbox, alert: &Alert) -> Result<Message, NotifyError> {
    Message::builder()
        .from(from)
        .to(to)
        .subject(format_subject(alert))
        .header(ContentType::TEXT_PLAIN)
        .body(format_body(alert))
        .map_err(|e| NotifyError::Mail(e.to_string()))
}

#[async_trait]
impl NotificationChannel for EmailNotifier {
    fn name(&self) -> &str {
        "email"
    }

    async fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        let message = self.build_message(alert)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Mail(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::notifiers::tests::sample_alert;

    #[test]
    fn test_invalid_address_rejected() {
        assert!(matches!(
            parse_mailbox("not-an-address"),
            Err(NotifyError::InvalidAddress(_))
        ));
        assert!(parse_mailbox("alerts@example.com").is_ok());
    }

    #[test]
    fn test_message_contents() {
        let alert = sample_alert();
        let message = build_message(
            parse_mailbox("bot@example.com").unwrap(),
            parse_mailbox("me@example.com").unwrap(),
            &alert,
        )
        .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Trading Alert - UPPER band"));
        assert!(raw.contains("To: me@example.com"));
    }
}
