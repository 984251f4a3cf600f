use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use url::Url;

use super::google_auth::{GoogleAuthError, GoogleTokenSource};
use crate::utils::token::generate_access_token;

const CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3/";

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEventRequest {
    pub title: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub duration_minutes: i32,
    pub attendees: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub meeting_url: String,
    pub event_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("calendar integration is not configured")]
    NotConfigured,

    #[error(transparent)]
    Auth(#[from] GoogleAuthError),

    #[error("calendar request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("calendar API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("event end time is out of range")]
    TimeOutOfRange,

    #[error("created event carries no conference link")]
    MissingConferenceLink,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Creates one event with a video-conference link for all attendees.
    async fn create_event(
        &self,
        request: &CalendarEventRequest,
    ) -> Result<CalendarEvent, CalendarError>;
}

/// Stand-in used when no Google credentials are configured.
#[derive(Debug, Clone, Default)]
pub struct DisabledCalendar;

#[async_trait]
impl CalendarProvider for DisabledCalendar {
    async fn create_event(
        &self,
        _request: &CalendarEventRequest,
    ) -> Result<CalendarEvent, CalendarError> {
        Err(CalendarError::NotConfigured)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertedEvent {
    id: Option<String>,
    hangout_link: Option<String>,
}

pub struct GoogleCalendarClient {
    client: Client,
    tokens: Arc<GoogleTokenSource>,
    calendar_id: String,
}

impl GoogleCalendarClient {
    pub fn new(client: Client, tokens: Arc<GoogleTokenSource>, calendar_id: String) -> Self {
        info!("Google Calendar integration enabled for calendar '{}'", calendar_id);
        Self {
            client,
            tokens,
            calendar_id,
        }
    }

    fn events_url(&self) -> Result<Url, CalendarError> {
        let mut url = Url::parse(CALENDAR_API).map_err(|e| CalendarError::Api {
            status: 0,
            body: e.to_string(),
        })?;
        url.path_segments_mut()
            .map_err(|_| CalendarError::Api {
                status: 0,
                body: "calendar base URL cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(["calendars", self.calendar_id.as_str(), "events"]);
        url.query_pairs_mut().append_pair("conferenceDataVersion", "1");
        Ok(url)
    }
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Event body with a Meet conference request and the interview reminders
/// (email one day ahead, popup 30 minutes ahead).
pub(crate) fn event_body(
    request: &CalendarEventRequest,
    request_id: &str,
) -> Result<Value, CalendarError> {
    let end = request
        .start
        .checked_add_signed(Duration::minutes(i64::from(request.duration_minutes)))
        .ok_or(CalendarError::TimeOutOfRange)?;
    let attendees: Vec<Value> = request
        .attendees
        .iter()
        .map(|email| json!({ "email": email, "responseStatus": "needsAction" }))
        .collect();

    Ok(json!({
        "summary": request.title,
        "description": request.description,
        "start": { "dateTime": rfc3339(request.start), "timeZone": "UTC" },
        "end": { "dateTime": rfc3339(end), "timeZone": "UTC" },
        "attendees": attendees,
        "conferenceData": {
            "createRequest": {
                "requestId": request_id,
                "conferenceSolutionKey": { "type": "hangoutsMeet" }
            }
        },
        "reminders": {
            "useDefault": false,
            "overrides": [
                { "method": "email", "minutes": 24 * 60 },
                { "method": "popup", "minutes": 30 }
            ]
        }
    }))
}

#[async_trait]
impl CalendarProvider for GoogleCalendarClient {
    async fn create_event(
        &self,
        request: &CalendarEventRequest,
    ) -> Result<CalendarEvent, CalendarError> {
        let token = self.tokens.access_token().await?;
        let body = event_body(request, &generate_access_token(16))?;

        let response = self
            .client
            .post(self.events_url()?)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "calendar event insert failed");
            return Err(CalendarError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let event: InsertedEvent = response.json().await?;
        match (event.hangout_link, event.id) {
            (Some(meeting_url), Some(event_id)) if !meeting_url.is_empty() => {
                info!(event_id = %event_id, "calendar event created");
                Ok(CalendarEvent {
                    meeting_url,
                    event_id,
                })
            }
            _ => Err(CalendarError::MissingConferenceLink),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn event_body_spans_duration_and_requests_meet_link() {
        let request = CalendarEventRequest {
            title: "Interview for Backend Engineer".to_string(),
            description: "Interview for 2 candidate(s)".to_string(),
            start: Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap(),
            duration_minutes: 45,
            attendees: vec!["a@example.com".to_string(), "b@example.com".to_string()],
        };
        let body = event_body(&request, "req-1").unwrap();

        assert_eq!(body["start"]["dateTime"], "2026-03-02T10:00:00.000Z");
        assert_eq!(body["end"]["dateTime"], "2026-03-02T10:45:00.000Z");
        assert_eq!(body["attendees"].as_array().unwrap().len(), 2);
        assert_eq!(
            body["conferenceData"]["createRequest"]["conferenceSolutionKey"]["type"],
            "hangoutsMeet"
        );
        assert_eq!(body["reminders"]["overrides"][0]["minutes"], 1440);
    }

    #[test]
    fn event_end_past_the_calendar_range_is_an_error() {
        let request = CalendarEventRequest {
            title: "Interview".to_string(),
            description: String::new(),
            start: DateTime::<Utc>::MAX_UTC - Duration::minutes(10),
            duration_minutes: 60,
            attendees: Vec::new(),
        };
        assert!(matches!(
            event_body(&request, "req-2"),
            Err(CalendarError::TimeOutOfRange)
        ));
    }

    #[tokio::test]
    async fn disabled_calendar_reports_not_configured() {
        let request = CalendarEventRequest {
            title: String::new(),
            description: String::new(),
            start: Utc::now(),
            duration_minutes: 30,
            attendees: vec![],
        };
        let result = DisabledCalendar.create_event(&request).await;
        assert!(matches!(result, Err(CalendarError::NotConfigured)));
    }
}
