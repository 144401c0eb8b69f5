use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::domain::alert::Alert;
use crate::domain::notification::NotificationChannel;
use crate::shared::errors::NotifyError;

const API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: String,
    parse_mode: &'static str,
}

/// Sends alerts through the Telegram Bot API
pub struct TelegramNotifier {
    http_client: Client,
    api_url: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(http_client: Client, bot_token: &str, chat_id: &str) -> Self {
        Self::with_api_base(http_client, API_BASE, bot_token, chat_id)
    }

    pub fn with_api_base(http_client: Client, api_base: &str, bot_token: &str, chat_id: &str) -> Self {
        Self {
            http_client,
            api_url: format!("{}/bot{}/sendMessage", api_base.trim_end_matches('/'), bot_token),
            chat_id: chat_id.to_string(),
        }
    }
}

/// Escape the characters the Bot API treats as markup in HTML parse mode
pub(crate) fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub(crate) fn format_telegram(alert: &Alert) -> String {
    format!(
        "{}\n\n📊 Price: {}\n📈 {} band: {}\n📏 Distance: {}%\n🕐 {}",
        escape_html(&alert.message),
        alert.price,
        alert.side,
        alert.band_value,
        alert.distance_pct,
        alert.timestamp.format("%H:%M:%S"),
    )
}

#[async_trait]
impl NotificationChannel for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text: format_telegram(alert),
            parse_mode: "HTML",
        };
        let response = self.http_client.post(&self.api_url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
