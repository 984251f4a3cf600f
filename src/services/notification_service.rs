use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::json;
use tracing::{error, info, warn};

use super::google_auth::{GoogleAuthError, GoogleTokenSource};
use crate::config::Environment;

const GMAIL_SEND_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me/messages/send";

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("email transport is not configured")]
    NotConfigured,

    #[error(transparent)]
    Auth(#[from] GoogleAuthError),

    #[error("email request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mail API returned {status}: {body}")]
    Api { status: u16, body: String },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

#[derive(Debug, Clone, Default)]
pub struct UnconfiguredTransport;

#[async_trait]
impl EmailTransport for UnconfiguredTransport {
    async fn send(&self, _message: &EmailMessage) -> Result<(), EmailError> {
        Err(EmailError::NotConfigured)
    }
}

/// Gmail API transport. Messages go out as base64url-encoded RFC 822 text.
pub struct GmailTransport {
    client: Client,
    tokens: Arc<GoogleTokenSource>,
}

impl GmailTransport {
    pub fn new(client: Client, tokens: Arc<GoogleTokenSource>) -> Self {
        Self { client, tokens }
    }
}

/// Header value with control characters dropped, so CR/LF can never start a
/// new header line.
fn encode_header(value: &str) -> String {
    let value: String = value.chars().filter(|c| !c.is_control()).collect();
    if value.is_ascii() {
        value
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(value))
    }
}

pub(crate) fn raw_message(message: &EmailMessage) -> String {
    let text = [
        format!("To: {}", encode_header(&message.to)),
        "Content-Type: text/html; charset=utf-8".to_string(),
        "MIME-Version: 1.0".to_string(),
        format!("Subject: {}", encode_header(&message.subject)),
        String::new(),
        message.html.clone(),
    ]
    .join("\r\n");
    URL_SAFE_NO_PAD.encode(text)
}

#[async_trait]
impl EmailTransport for GmailTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let token = self.tokens.access_token().await?;
        let response = self
            .client
            .post(GMAIL_SEND_URL)
            .bearer_auth(token)
            .json(&json!({ "raw": raw_message(message) }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Best-effort email dispatch.
///
/// Outside production nothing is handed to the transport unless real sending
/// was explicitly enabled; the message is logged and reported as sent.
#[derive(Clone)]
pub struct NotificationService {
    transport: Arc<dyn EmailTransport>,
    deliver: bool,
}

impl NotificationService {
    pub fn new(
        transport: Arc<dyn EmailTransport>,
        environment: Environment,
        send_real_emails: bool,
    ) -> Self {
        let deliver = environment == Environment::Production || send_real_emails;
        if !deliver {
            info!("Email delivery disabled outside production (SEND_REAL_EMAILS not set)");
        }
        Self { transport, deliver }
    }

    pub async fn send(&self, recipient: &str, subject: &str, html: &str) -> bool {
        if recipient.trim().is_empty() || subject.trim().is_empty() || html.trim().is_empty() {
            warn!(recipient, subject, "refusing to send incomplete email");
            return false;
        }

        if !self.deliver {
            info!(
                to = recipient,
                subject, "email would be sent in production; skipping delivery"
            );
            return true;
        }

        let message = EmailMessage {
            to: recipient.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        };
        match self.transport.send(&message).await {
            Ok(()) => {
                info!(to = recipient, "notification email sent");
                true
            }
            Err(e) => {
                error!(to = recipient, error = %e, "failed to send notification email");
                false
            }
        }
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Subject and HTML body of the interview invitation.
pub fn interview_invitation(
    candidate_name: &str,
    position_title: &str,
    scheduled_for: DateTime<Utc>,
    duration_minutes: i32,
    meeting_url: &str,
) -> (String, String) {
    let name = if candidate_name.trim().is_empty() {
        "Candidate".to_string()
    } else {
        escape_html(candidate_name)
    };
    let title = escape_html(position_title);
    let url = escape_html(meeting_url);
    let when = scheduled_for.format("%A, %B %-d, %Y at %H:%M UTC");

    let subject = format!("Interview Scheduled for {}", position_title);
    let html = format!(
        "<h1>Interview Scheduled</h1>\n\
         <p>Dear {name},</p>\n\
         <p>Your interview for the <strong>{title}</strong> position has been scheduled for:</p>\n\
         <p><strong>Date and Time:</strong> {when}</p>\n\
         <p><strong>Duration:</strong> {duration_minutes} minutes</p>\n\
         <p><strong>Meeting Link:</strong> <a href=\"{url}\">{url}</a></p>\n\
         <p>Please ensure you are available at the scheduled time. If you need to reschedule, please contact us as soon as possible.</p>\n\
         <p>Best regards,<br/>HR Team</p>\n"
    );
    (subject, html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mockall::predicate::always;

    #[tokio::test]
    async fn development_mode_skips_transport() {
        let mut transport = MockEmailTransport::new();
        transport.expect_send().never();
        let service =
            NotificationService::new(Arc::new(transport), Environment::Development, false);
        assert!(service.send("a@example.com", "Hi", "<p>x</p>").await);
    }

    #[tokio::test]
    async fn transport_failure_reports_false() {
        let mut transport = MockEmailTransport::new();
        transport
            .expect_send()
            .with(always())
            .times(1)
            .returning(|_| Err(EmailError::NotConfigured));
        let service =
            NotificationService::new(Arc::new(transport), Environment::Production, false);
        assert!(!service.send("a@example.com", "Hi", "<p>x</p>").await);
    }

    #[tokio::test]
    async fn override_delivers_outside_production() {
        let mut transport = MockEmailTransport::new();
        transport
            .expect_send()
            .withf(|m| m.to == "a@example.com" && m.subject == "Hi")
            .times(1)
            .returning(|_| Ok(()));
        let service =
            NotificationService::new(Arc::new(transport), Environment::Development, true);
        assert!(service.send("a@example.com", "Hi", "<p>x</p>").await);
    }

    #[tokio::test]
    async fn incomplete_messages_are_rejected() {
        let service = NotificationService::new(
            Arc::new(UnconfiguredTransport),
            Environment::Development,
            false,
        );
        assert!(!service.send("", "Hi", "<p>x</p>").await);
        assert!(!service.send("a@example.com", " ", "<p>x</p>").await);
        assert!(!service.send("a@example.com", "Hi", "").await);
    }

    #[test]
    fn invitation_escapes_candidate_name() {
        let at = Utc.with_ymd_and_hms(2026, 5, 4, 9, 30, 0).unwrap();
        let (subject, html) = interview_invitation(
            "<Ana>",
            "Data Engineer",
            at,
            45,
            "https://meet.google.com/abc",
        );
        assert_eq!(subject, "Interview Scheduled for Data Engineer");
        assert!(html.contains("Dear &lt;Ana&gt;,"));
        assert!(html.contains("45 minutes"));
        assert!(html.contains("Monday, May 4, 2026 at 09:30 UTC"));
        assert!(html.contains("href=\"https://meet.google.com/abc\""));
    }

    #[test]
    fn raw_message_is_url_safe_base64() {
        let raw = raw_message(&EmailMessage {
            to: "a@example.com".to_string(),
            subject: "Interview Scheduled for Dev".to_string(),
            html: "<p>??>></p>".to_string(),
        });
        assert!(!raw.contains('+') && !raw.contains('/') && !raw.contains('='));
        let decoded = String::from_utf8(URL_SAFE_NO_PAD.decode(raw).unwrap()).unwrap();
        assert!(decoded.starts_with("To: a@example.com\r\n"));
        assert!(decoded.contains("\r\n\r\n<p>??>></p>"));
    }

    #[test]
    fn line_breaks_cannot_add_headers() {
        let at = Utc.with_ymd_and_hms(2026, 5, 4, 9, 30, 0).unwrap();
        let (subject, html) = interview_invitation(
            "Ana",
            "Dev\r\nBcc: someone@example.net",
            at,
            30,
            "https://meet.google.com/abc",
        );
        let raw = raw_message(&EmailMessage {
            to: "a@example.com\r\nCc: other@example.net".to_string(),
            subject,
            html,
        });
        let decoded = String::from_utf8(URL_SAFE_NO_PAD.decode(raw).unwrap()).unwrap();
        let headers: Vec<&str> = decoded
            .split("\r\n\r\n")
            .next()
            .unwrap()
            .split("\r\n")
            .collect();
        assert_eq!(headers.len(), 4);
        assert_eq!(headers[0], "To: a@example.comCc: other@example.net");
        assert_eq!(
            headers[3],
            "Subject: Interview Scheduled for DevBcc: someone@example.net"
        );
        assert!(!headers.iter().any(|h| h.starts_with("Bcc:") || h.starts_with("Cc:")));
    }
}
