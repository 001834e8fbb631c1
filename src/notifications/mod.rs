//! Best-effort trade notifications
//!
//! Delivery failures are logged and never reach the controller.

pub mod types;

#[cfg(feature = "telegram")]
pub mod telegram;

pub use types::{Notification, NotificationType};

use crate::config::NotificationsConfig;
use crate::logger::{self, LogTag};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn notify(&self, notification: &Notification) -> Result<(), String>;
}

/// Writes notifications to the log
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn notify(&self, notification: &Notification) -> Result<(), String> {
        logger::info(LogTag::Notifications, &notification.message());
        Ok(())
    }
}

/// Drops everything (notifications disabled)
pub struct NullNotifier;

#[async_trait]
impl NotificationSink for NullNotifier {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn notify(&self, _notification: &Notification) -> Result<(), String> {
        Ok(())
    }
}

/// Send and swallow any failure
pub async fn send_best_effort(sink: &dyn NotificationSink, notification: Notification) {
    if let Err(e) = sink.notify(&notification).await {
        logger::warning(
            LogTag::Notifications,
            &format!("Notification via {} failed: {}", sink.name(), e),
        );
    }
}

/// Pick the sink for the configured backend
pub fn build_sink(config: &NotificationsConfig) -> Arc<dyn NotificationSink> {
    if !config.enabled {
        return Arc::new(NullNotifier);
    }

    if config.telegram_enabled {
        #[cfg(feature = "telegram")]
        match telegram::TelegramNotifier::new(&config.telegram_bot_token, config.telegram_chat_id) {
            Ok(notifier) => return Arc::new(notifier),
            Err(e) => logger::warning(
                LogTag::Notifications,
                &format!("Telegram disabled: {}", e),
            ),
        }

        #[cfg(not(feature = "telegram"))]
        logger::warning(
            LogTag::Notifications,
            "Telegram requested but the binary was built without the 'telegram' feature",
        );
    }

    Arc::new(LogNotifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSink;

    #[async_trait]
    impl NotificationSink for FailingSink {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn notify(&self, _notification: &Notification) -> Result<(), String> {
            Err("network down".to_string())
        }
    }

    #[tokio::test]
    async fn test_failures_are_swallowed() {
        send_best_effort(&FailingSink, Notification::run_summary("all", "nothing".to_string())).await;
    }

    #[test]
    fn test_disabled_config_uses_null_sink() {
        let mut config = NotificationsConfig::default();
        config.enabled = false;
        assert_eq!(build_sink(&config).name(), "none");
        config.enabled = true;
        assert_eq!(build_sink(&config).name(), "log");
    }
}
