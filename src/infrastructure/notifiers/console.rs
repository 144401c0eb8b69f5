use async_trait::async_trait;
use std::io::Write;

use crate::domain::alert::Alert;
use crate::domain::notification::NotificationChannel;
use crate::shared::errors::NotifyError;

const RULE: &str = "============================================================";

/// Prints alerts to stdout
#[derive(Debug, Default, Clone)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self
    }
}

pub(crate) fn format_console(alert: &Alert) -> String {
    format!(
        "\n{rule}\n{}\nTimestamp: {}\nCurrent price: {}\n{} band: {}\nDistance: {}%\n{rule}\n",
        alert.message,
        alert.timestamp.to_rfc3339(),
        alert.price,
        alert.side,
        alert.band_value,
        alert.distance_pct,
        rule = RULE,
    )
}

fn write_stdout(text: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()
}

#[async_trait]
impl NotificationChannel for ConsoleNotifier {
    fn name(&self) -> &str {
        "console"
    }

    async fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        write_stdout(&format_console(alert))?;
        Ok(())
    }
}
