use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::database::InterviewFilter;
use crate::models::InterviewStatus;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ScheduleInterviewsPayload {
    #[serde(default)]
    pub application_ids: Vec<Uuid>,
    pub scheduled_for: DateTime<Utc>,
    pub duration_minutes: Option<i32>,
    #[validate(length(max = 2048))]
    pub meeting_url: Option<String>,
    #[serde(default = "default_true")]
    pub use_google_calendar: bool,
    #[serde(default = "default_true")]
    pub send_notification: bool,
    #[validate(length(max = 200))]
    pub scheduled_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateInterviewPayload {
    pub status: Option<InterviewStatus>,
    #[validate(length(max = 10000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InterviewListQuery {
    pub status: Option<InterviewStatus>,
    pub candidate_id: Option<Uuid>,
    pub position_id: Option<Uuid>,
    /// Calendar day (UTC) the interview falls on.
    pub date: Option<NaiveDate>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl InterviewListQuery {
    pub fn into_filter(self) -> InterviewFilter {
        let mut scheduled_from = self.from;
        let mut scheduled_before = self.to;
        if let Some(day) = self.date {
            let start = day.and_time(chrono::NaiveTime::MIN).and_utc();
            let end = start
                .checked_add_signed(Duration::days(1))
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            scheduled_from = Some(scheduled_from.map_or(start, |f| f.max(start)));
            scheduled_before = Some(scheduled_before.map_or(end, |b| b.min(end)));
        }
        InterviewFilter {
            status: self.status,
            candidate_id: self.candidate_id,
            application_ids: None,
            position_id: self.position_id,
            scheduled_from,
            scheduled_before,
        }
    }
}
