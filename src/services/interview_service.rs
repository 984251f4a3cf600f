use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use super::calendar_service::{CalendarEventRequest, CalendarProvider};
use super::notification_service::{interview_invitation, NotificationService};
use crate::database::{InterviewFilter, RecruitmentStore, StoreError, StoreWrite};
use crate::error::{Error, Result};
use crate::models::{
    Application, ApplicationStatus, Candidate, Interview, InterviewStatus, Position,
};
use crate::utils::{time::now, token::generate_access_token};

pub const UNKNOWN_POSITION: &str = "Unknown Position";

/// Latest year an interview may end in; later timestamps do not fit the
/// database column type.
const MAX_YEAR: i32 = 9999;

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("No applications selected")]
    EmptySelection,

    #[error("Interview duration must be positive, got {0} minutes")]
    InvalidDuration(i32),

    #[error("Interview time {0} is out of range")]
    TimeOutOfRange(DateTime<Utc>),

    #[error("Invalid meeting URL: {0}")]
    InvalidMeetingUrl(String),

    #[error("Scheduler identity is required")]
    MissingScheduler,

    #[error("No valid applications found with the provided IDs")]
    NoMatchingApplications,

    #[error("{invalid} application(s) cannot be scheduled because they are already scheduled or rejected")]
    Ineligible {
        invalid: usize,
        application_ids: Vec<Uuid>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct ScheduleRequest {
    pub application_ids: Vec<Uuid>,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub meeting_url: Option<String>,
    pub use_external_calendar: bool,
    pub send_notifications: bool,
    pub scheduled_by: String,
}

/// Where the interview takes place and how that link was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MeetingLocation {
    Supplied { url: String },
    CalendarLinked { url: String, event_id: String },
    Synthesized { url: String },
}

impl MeetingLocation {
    pub fn url(&self) -> &str {
        match self {
            MeetingLocation::Supplied { url }
            | MeetingLocation::CalendarLinked { url, .. }
            | MeetingLocation::Synthesized { url } => url.as_str(),
        }
    }

    pub fn event_id(&self) -> Option<&str> {
        match self {
            MeetingLocation::CalendarLinked { event_id, .. } => Some(event_id.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub attempted: usize,
    pub sent: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleOutcome {
    pub interviews: Vec<Interview>,
    pub location: MeetingLocation,
    pub notifications: DeliveryReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterviewDetails {
    #[serde(flatten)]
    pub interview: Interview,
    pub application: Application,
    pub candidate: Option<Candidate>,
}

fn validate(request: &ScheduleRequest) -> std::result::Result<Option<String>, ScheduleError> {
    if request.application_ids.is_empty() {
        return Err(ScheduleError::EmptySelection);
    }
    if request.duration_minutes <= 0 {
        return Err(ScheduleError::InvalidDuration(request.duration_minutes));
    }
    let ends_at = request
        .start_time
        .checked_add_signed(Duration::minutes(i64::from(request.duration_minutes)));
    if !ends_at.is_some_and(|end| end.year() <= MAX_YEAR) {
        return Err(ScheduleError::TimeOutOfRange(request.start_time));
    }
    if request.scheduled_by.trim().is_empty() {
        return Err(ScheduleError::MissingScheduler);
    }
    match request.meeting_url.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => {
            let parsed =
                Url::parse(raw).map_err(|e| ScheduleError::InvalidMeetingUrl(e.to_string()))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ScheduleError::InvalidMeetingUrl(format!(
                    "unsupported scheme '{}'",
                    parsed.scheme()
                )));
            }
            Ok(Some(raw.to_string()))
        }
    }
}

fn dedup_preserving_order(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[derive(Clone)]
pub struct InterviewService {
    store: Arc<dyn RecruitmentStore>,
    calendar: Arc<dyn CalendarProvider>,
    notifications: NotificationService,
    meeting_url_base: String,
}

impl InterviewService {
    pub fn new(
        store: Arc<dyn RecruitmentStore>,
        calendar: Arc<dyn CalendarProvider>,
        notifications: NotificationService,
        meeting_url_base: String,
    ) -> Self {
        Self {
            store,
            calendar,
            notifications,
            meeting_url_base,
        }
    }

    fn synthesize_url(&self) -> String {
        format!(
            "{}/mock-{}",
            self.meeting_url_base.trim_end_matches('/'),
            generate_access_token(9).to_lowercase()
        )
    }

    async fn resolve_location(
        &self,
        request: &ScheduleRequest,
        supplied: Option<String>,
        titles: &[String],
        attendees: Vec<String>,
    ) -> MeetingLocation {
        if let Some(url) = supplied {
            return MeetingLocation::Supplied { url };
        }
        if !request.use_external_calendar {
            let url = self.synthesize_url();
            info!(url = %url, "external calendar disabled, using generated meeting URL");
            return MeetingLocation::Synthesized { url };
        }

        let joined = titles.join(", ");
        let event = CalendarEventRequest {
            title: format!("Interview for {}", joined),
            description: format!(
                "Interview for {} candidate(s) for the position(s): {}",
                attendees.len(),
                joined
            ),
            start: request.start_time,
            duration_minutes: request.duration_minutes,
            attendees,
        };
        match self.calendar.create_event(&event).await {
            Ok(created) => MeetingLocation::CalendarLinked {
                url: created.meeting_url,
                event_id: created.event_id,
            },
            Err(e) => {
                let url = self.synthesize_url();
                warn!(error = %e, url = %url, "calendar event creation failed, using fallback meeting URL");
                MeetingLocation::Synthesized { url }
            }
        }
    }

    /// Creates one interview per application and moves each application to
    /// INTERVIEW_SCHEDULED in a single batch.
    ///
    /// The batch is all-or-nothing: a single ineligible application rejects
    /// the whole request. Calendar failures fall back to a generated link and
    /// notification failures are only counted.
    pub async fn schedule(
        &self,
        request: ScheduleRequest,
    ) -> std::result::Result<ScheduleOutcome, ScheduleError> {
        let supplied_url = validate(&request)?;
        let ids = dedup_preserving_order(&request.application_ids);
        info!(requested = ids.len(), "scheduling interviews");

        let applications = self.store.applications_by_ids(&ids).await?;
        if applications.is_empty() {
            return Err(ScheduleError::NoMatchingApplications);
        }
        info!(found = applications.len(), "resolved applications for scheduling");

        let ineligible: Vec<Uuid> = applications
            .iter()
            .filter(|a| !a.status.is_schedulable())
            .map(|a| a.id)
            .collect();
        if !ineligible.is_empty() {
            return Err(ScheduleError::Ineligible {
                invalid: ineligible.len(),
                application_ids: ineligible,
            });
        }

        let candidate_ids: Vec<Uuid> = applications.iter().map(|a| a.candidate_id).collect();
        let candidates: HashMap<Uuid, Candidate> = self
            .store
            .candidates_by_ids(&candidate_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();
        let position_ids: Vec<Uuid> = applications.iter().filter_map(|a| a.position_id).collect();
        let positions: HashMap<Uuid, Position> = self
            .store
            .positions_by_ids(&position_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let title_of = |application: &Application| -> String {
            application
                .position_id
                .and_then(|id| positions.get(&id))
                .map(|p| p.title.clone())
                .or_else(|| application.position_title.clone())
                .unwrap_or_else(|| UNKNOWN_POSITION.to_string())
        };
        let email_of = |application: &Application| -> String {
            candidates
                .get(&application.candidate_id)
                .map(|c| c.email.clone())
                .unwrap_or_else(|| application.snapshot.email().to_string())
        };

        let mut titles: Vec<String> = Vec::new();
        for application in &applications {
            let title = title_of(application);
            if !titles.contains(&title) {
                titles.push(title);
            }
        }
        let attendees: Vec<String> = applications.iter().map(&email_of).collect();

        let location = self
            .resolve_location(&request, supplied_url, &titles, attendees)
            .await;

        let at = now();
        let mut writes = Vec::with_capacity(applications.len() * 2);
        for application in &applications {
            writes.push(StoreWrite::InsertInterview(Interview {
                id: Uuid::new_v4(),
                application_id: application.id,
                candidate_id: application.candidate_id,
                scheduled_for: request.start_time,
                duration_minutes: request.duration_minutes,
                status: InterviewStatus::Scheduled,
                meeting_url: Some(location.url().to_string()),
                calendar_event_id: location.event_id().map(str::to_string),
                notes: String::new(),
                scheduled_by: request.scheduled_by.trim().to_string(),
                created_at: at,
                updated_at: at,
            }));
            writes.push(StoreWrite::UpdateApplicationStatus {
                id: application.id,
                status: ApplicationStatus::InterviewScheduled,
                allowed_from: ApplicationStatus::InterviewScheduled
                    .allowed_predecessors()
                    .to_vec(),
                at,
            });
        }

        let interviews: Vec<Interview> = self
            .store
            .apply_batch(writes)
            .await?
            .into_iter()
            .filter_map(|outcome| outcome.into_interview())
            .collect();
        info!(count = interviews.len(), "interviews scheduled");

        let mut report = DeliveryReport::default();
        if request.send_notifications {
            for application in &applications {
                let recipient = email_of(application);
                let name = candidates
                    .get(&application.candidate_id)
                    .map(|c| c.name.as_str())
                    .unwrap_or_else(|| application.snapshot.name());
                let (subject, html) = interview_invitation(
                    name,
                    &title_of(application),
                    request.start_time,
                    request.duration_minutes,
                    location.url(),
                );
                report.attempted += 1;
                if self.notifications.send(&recipient, &subject, &html).await {
                    report.sent += 1;
                } else {
                    report.failed += 1;
                }
            }
            if report.failed > 0 {
                warn!(failed = report.failed, "some interview notifications were not delivered");
            }
        }

        Ok(ScheduleOutcome {
            interviews,
            location,
            notifications: report,
        })
    }

    pub async fn get_interview(&self, id: Uuid) -> Result<InterviewDetails> {
        let interview = self
            .store
            .interview(id)
            .await?
            .ok_or_else(|| Error::NotFound("Interview not found".to_string()))?;
        let application = self
            .store
            .application(interview.application_id)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".to_string()))?;
        let candidate = self.store.candidate(interview.candidate_id).await?;
        Ok(InterviewDetails {
            interview,
            application,
            candidate,
        })
    }

    pub async fn list_interviews(&self, filter: &InterviewFilter) -> Result<Vec<Interview>> {
        Ok(self.store.list_interviews(filter).await?)
    }

    pub async fn update_interview(
        &self,
        id: Uuid,
        status: Option<InterviewStatus>,
        notes: Option<String>,
    ) -> Result<Interview> {
        if status.is_none() && notes.is_none() {
            return Err(Error::BadRequest("No updates provided".to_string()));
        }
        let updated = self
            .store
            .apply_batch(vec![StoreWrite::UpdateInterview {
                id,
                status,
                notes,
                at: now(),
            }])
            .await?
            .pop()
            .and_then(|outcome| outcome.into_interview())
            .ok_or_else(|| Error::Internal("interview update returned no row".to_string()))?;
        info!(interview_id = %id, status = updated.status.as_str(), "interview updated");
        Ok(updated)
    }
}
