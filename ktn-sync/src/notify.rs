//! Task result notifications
//!
//! Failures are always delivered. Successes are delivered only inside the
//! weekly check window (Monday 09:00-10:00 local time) so the chat shows the
//! scheduled jobs are alive without repeating every run; outside the window
//! they are only logged. A delivery failure is logged and never replaces the
//! task result.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, TimeZone, Timelike, Weekday};
use ktn_common::config::AppConfig;
use ktn_common::{Error, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

const TELEGRAM_BASE_URL: &str = "https://api.telegram.org";

pub const WEEKLY_CHECK_WEEKDAY: Weekday = Weekday::Mon;
pub const WEEKLY_CHECK_HOUR_FROM: u32 = 9;
pub const WEEKLY_CHECK_HOUR_TO: u32 = 10;
pub const WEEKLY_CHECK_PREFIX: &str = "Weekly check!";

/// Message sink
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<()>;
}

/// Telegram Bot API sender
pub struct TelegramNotifier {
    http_client: reqwest::Client,
    token: String,
    chat_id: i64,
    base_url: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>, chat_id: i64) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            token: token.into(),
            chat_id,
            base_url: TELEGRAM_BASE_URL.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.token);
        let response = self
            .http_client
            .post(&url)
            .json(&SendMessage {
                chat_id: self.chat_id,
                text: message,
            })
            .send()
            .await
            .map_err(|e| Error::RemoteFetch(format!("Failed to send message: {}", e)))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(Error::RemoteFetch(format!(
                "Bad response status when sending the message: {}",
                status
            )));
        }
        Ok(())
    }
}

/// Sink used when no bot is configured
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        tracing::info!(notification = %message, "Notification (no bot configured)");
        Ok(())
    }
}

/// Telegram notifier when token and chat id are configured, log-only otherwise
pub fn notifier_from_config(config: &AppConfig) -> Result<Arc<dyn Notifier>> {
    match (&config.telegram_token, config.telegram_chat_id) {
        (Some(token), Some(chat_id)) => Ok(Arc::new(TelegramNotifier::new(token.clone(), chat_id)?)),
        _ => {
            tracing::debug!("Telegram not configured, notifications are logged only");
            Ok(Arc::new(LogNotifier))
        }
    }
}

/// Whether `now` is inside the weekly check window
pub fn in_weekly_check_window<Tz: TimeZone>(now: &DateTime<Tz>) -> bool {
    now.weekday() == WEEKLY_CHECK_WEEKDAY
        && now.hour() >= WEEKLY_CHECK_HOUR_FROM
        && now.hour() < WEEKLY_CHECK_HOUR_TO
}

/// Report a successful task.
///
/// Returns true when the message was handed to the notifier.
pub async fn report_success<Tz: TimeZone>(
    notifier: &dyn Notifier,
    message: &str,
    now: &DateTime<Tz>,
) -> bool {
    tracing::info!("{}", message);

    if !in_weekly_check_window(now) {
        return false;
    }

    let message = format!("{}\n{}", WEEKLY_CHECK_PREFIX, message);
    if let Err(e) = notifier.send(&message).await {
        tracing::warn!(error = %e, "Failed to deliver notification");
    }
    true
}

/// Report a failed task; always delivered
pub async fn report_failure(notifier: &dyn Notifier, message: &str, error: &anyhow::Error) {
    tracing::error!("{}: {:#}", message, error);

    if let Err(e) = notifier.send(message).await {
        tracing::warn!(error = %e, "Failed to deliver notification");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        messages: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, message: &str) -> Result<()> {
            self.messages.lock().await.push(message.to_string());
            Ok(())
        }
    }

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn send(&self, _message: &str) -> Result<()> {
            Err(Error::RemoteFetch("offline".to_string()))
        }
    }

    fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<FixedOffset> {
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        let naive = NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(hour, 30, 0)
            .unwrap();
        offset.from_local_datetime(&naive).unwrap()
    }

    #[test]
    fn test_weekly_window() {
        // 2024-01-15 is a Monday
        assert!(in_weekly_check_window(&at(2024, 1, 15, 9)));
        assert!(!in_weekly_check_window(&at(2024, 1, 15, 10)));
        assert!(!in_weekly_check_window(&at(2024, 1, 15, 8)));
        assert!(!in_weekly_check_window(&at(2024, 1, 16, 9)));
    }

    #[tokio::test]
    async fn test_success_only_sent_in_window() {
        let notifier = RecordingNotifier::default();

        assert!(!report_success(&notifier, "Stored", &at(2024, 1, 16, 9)).await);
        assert!(notifier.messages.lock().await.is_empty());

        assert!(report_success(&notifier, "Stored", &at(2024, 1, 15, 9)).await);
        assert_eq!(
            notifier.messages.lock().await.as_slice(),
            &["Weekly check!\nStored".to_string()]
        );
    }

    #[tokio::test]
    async fn test_failure_always_sent() {
        let notifier = RecordingNotifier::default();
        let error = anyhow::anyhow!("boom");

        report_failure(&notifier, "Failed to store", &error).await;
        assert_eq!(
            notifier.messages.lock().await.as_slice(),
            &["Failed to store".to_string()]
        );
    }

    #[tokio::test]
    async fn test_delivery_failure_is_swallowed() {
        let error = anyhow::anyhow!("boom");
        report_failure(&FailingNotifier, "Failed", &error).await;
        assert!(report_success(&FailingNotifier, "Ok", &at(2024, 1, 15, 9)).await);
    }
}
