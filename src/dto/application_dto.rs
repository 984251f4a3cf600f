use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::AcademicRecord;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitApplicationPayload {
    pub position_id: Uuid,
    #[validate(length(min = 1))]
    pub resume_url: String,
    pub cover_letter: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub experience: Option<String>,
    #[serde(default)]
    pub tenth: AcademicRecord,
    #[serde(default)]
    pub twelfth: AcademicRecord,
}

/// One row of the recruiter pipeline view.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineEntry {
    pub id: Uuid,
    pub application_id: Uuid,
    pub name: String,
    pub position: String,
    pub position_id: Option<Uuid>,
    pub email: String,
    pub phone: String,
    pub status: String,
    pub match_score: i32,
    pub interview_date: Option<DateTime<Utc>>,
    pub meeting_url: Option<String>,
}
