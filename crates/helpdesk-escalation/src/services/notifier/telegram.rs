//! Telegram bot delivery for SLA notifications.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::{NotificationSink, NotifyError, SlaEscalationNotification, SlaWarningNotification};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Sends SLA notifications to a Telegram chat through the bot API.
///
/// When the bot token or chat id is missing the sink is disabled: sends
/// become logged no-ops rather than errors, so a deployment without
/// Telegram still escalates tickets and notifies admins in-app.
pub struct TelegramSink {
    client: reqwest::Client,
    api_base: String,
    bot_token: Option<String>,
    chat_id: Option<String>,
}

impl TelegramSink {
    pub fn new(bot_token: Option<String>, chat_id: Option<String>) -> Result<Self, NotifyError> {
        Self::with_api_base(TELEGRAM_API_BASE.to_string(), bot_token, chat_id)
    }

    /// Builds a sink pointing at a custom API base url. Used by tests to
    /// target a local mock server.
    pub fn with_api_base(
        api_base: String,
        bot_token: Option<String>,
        chat_id: Option<String>,
    ) -> Result<Self, NotifyError> {
        if bot_token.is_none() || chat_id.is_none() {
            tracing::warn!(
                "TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID not set, telegram notifications disabled"
            );
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| NotifyError::Configuration(e.to_string()))?;
        Ok(Self {
            client,
            api_base,
            bot_token,
            chat_id,
        })
    }

    /// Reads `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID` from the
    /// environment. Both may be absent.
    pub fn from_env() -> Result<Self, NotifyError> {
        Self::new(
            std::env::var("TELEGRAM_BOT_TOKEN").ok(),
            std::env::var("TELEGRAM_CHAT_ID").ok(),
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }

    async fn send_message(&self, text: String) -> Result<(), NotifyError> {
        let (Some(token), Some(chat_id)) = (&self.bot_token, &self.chat_id) else {
            tracing::warn!("telegram sink disabled, dropping notification");
            return Ok(());
        };

        let url = format!("{}/bot{}/sendMessage", self.api_base, token);
        let response = self
            .client
            .post(&url)
            .json(&json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "Markdown",
                "disable_web_page_preview": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Delivery(format!(
                "telegram API returned {status}: {body}"
            )));
        }
        Ok(())
    }
}

fn warning_text(note: &SlaWarningNotification) -> String {
    format!(
        "\u{26a0} *SLA warning*\n\
         Ticket: `{}`\n\
         Subject: {}\n\
         Priority: {}\n\
         No response after {} minutes (budget {} minutes).",
        note.ticket_number,
        note.subject,
        note.priority,
        note.elapsed_minutes,
        note.budget_minutes,
    )
}

fn escalation_text(note: &SlaEscalationNotification) -> String {
    format!(
        "\u{1f6a8} *SLA escalation*\n\
         Ticket: `{}`\n\
         Subject: {}\n\
         Priority: {}\n\
         Still unanswered after {} minutes (threshold {} minutes). Admins have been notified.",
        note.ticket_number,
        note.subject,
        note.priority,
        note.elapsed_minutes,
        note.threshold_minutes,
    )
}

#[async_trait]
impl NotificationSink for TelegramSink {
    async fn send_warning(&self, note: &SlaWarningNotification) -> Result<(), NotifyError> {
        self.send_message(warning_text(note)).await
    }

    async fn send_escalation(&self, note: &SlaEscalationNotification) -> Result<(), NotifyError> {
        self.send_message(escalation_text(note)).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use helpdesk_sla::TicketPriority;
    use uuid::Uuid;

    use super::*;

    fn warning_note() -> SlaWarningNotification {
        SlaWarningNotification {
            ticket_id: Uuid::new_v4(),
            ticket_number: "TKT-2026-000042".to_string(),
            subject: "mail gateway rejecting everything".to_string(),
            priority: TicketPriority::Urgent,
            clock_started_at: Utc::now(),
            elapsed_minutes: 6,
            budget_minutes: 5,
        }
    }

    fn escalation_note() -> SlaEscalationNotification {
        SlaEscalationNotification {
            ticket_id: Uuid::new_v4(),
            ticket_number: "TKT-2026-000042".to_string(),
            subject: "mail gateway rejecting everything".to_string(),
            priority: TicketPriority::Urgent,
            clock_started_at: Utc::now(),
            elapsed_minutes: 8,
            threshold_minutes: 7,
        }
    }

    #[test]
    fn test_warning_message_body() {
        let text = warning_text(&warning_note());
        assert!(text.starts_with("\u{26a0} *SLA warning*"));
        assert!(text.contains("`TKT-2026-000042`"));
        assert!(text.contains("mail gateway rejecting everything"));
        assert!(text.contains("Priority: urgent"));
        assert!(text.contains("after 6 minutes (budget 5 minutes)"));
    }

    #[test]
    fn test_escalation_message_body() {
        let text = escalation_text(&escalation_note());
        assert!(text.starts_with("\u{1f6a8} *SLA escalation*"));
        assert!(text.contains("`TKT-2026-000042`"));
        assert!(text.contains("after 8 minutes (threshold 7 minutes)"));
        assert!(text.contains("Admins have been notified"));
    }

    #[tokio::test]
    async fn test_unconfigured_sink_sends_are_noops() {
        // No token or chat id: sends succeed without hitting the API. The
        // unreachable base url would fail loudly if a request went out.
        let sink =
            TelegramSink::with_api_base("http://127.0.0.1:1".to_string(), None, None).unwrap();
        assert!(!sink.is_enabled());

        sink.send_warning(&warning_note()).await.unwrap();
        sink.send_escalation(&escalation_note()).await.unwrap();
    }

    #[tokio::test]
    async fn test_partially_configured_sink_is_disabled() {
        let sink = TelegramSink::with_api_base(
            "http://127.0.0.1:1".to_string(),
            Some("123:abc".to_string()),
            None,
        )
        .unwrap();
        assert!(!sink.is_enabled());
        sink.send_warning(&warning_note()).await.unwrap();
    }
}
