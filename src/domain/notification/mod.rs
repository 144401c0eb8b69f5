//! Notification domain - delivery capability and fan-out

mod fanout;

pub use fanout::NotificationFanout;

use async_trait::async_trait;

use crate::domain::alert::Alert;
use crate::shared::errors::NotifyError;

/// A place alerts get delivered to. Implementations own their timeouts and
/// must not touch monitor state.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, alert: &Alert) -> Result<(), NotifyError>;
}
