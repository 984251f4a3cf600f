use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interview {
    pub id: Uuid,
    pub application_id: Uuid,
    pub candidate_id: Uuid,
    pub scheduled_for: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: InterviewStatus,
    pub meeting_url: Option<String>,
    pub calendar_event_id: Option<String>,
    pub notes: String,
    pub scheduled_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterviewStatus {
    Scheduled,
    Completed,
    Cancelled,
    #[serde(rename = "No Show")]
    NoShow,
    Rescheduled,
    Rejected,
}

impl InterviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewStatus::Scheduled => "Scheduled",
            InterviewStatus::Completed => "Completed",
            InterviewStatus::Cancelled => "Cancelled",
            InterviewStatus::NoShow => "No Show",
            InterviewStatus::Rescheduled => "Rescheduled",
            InterviewStatus::Rejected => "Rejected",
        }
    }
}
