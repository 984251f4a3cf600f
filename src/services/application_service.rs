use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::interview_service::UNKNOWN_POSITION;
use super::skill_matcher::{evaluate_applications, match_skills, ApplicationEvaluation};
use crate::database::{ApplicationFilter, InterviewFilter, RecruitmentStore, StoreError, StoreWrite};
use crate::dto::application_dto::{PipelineEntry, SubmitApplicationPayload};
use crate::dto::position_dto::CreatePositionPayload;
use crate::models::{
    candidate::normalize_email, Application, ApplicationStatus, CandidateSnapshot,
    CandidateUpsert, Interview, InterviewStatus, Position, PositionStatus, SkillSet,
};
use crate::utils::time::now;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{0}")]
    Invalid(String),

    #[error("Position {0} not found")]
    PositionNotFound(Uuid),

    #[error("Application {0} not found")]
    ApplicationNotFound(Uuid),

    #[error("Cannot move application from {} to {}", .from.as_str(), .to.as_str())]
    IllegalTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

type PipelineResult<T> = std::result::Result<T, PipelineError>;

fn required(value: &str, field: &str) -> PipelineResult<()> {
    if value.trim().is_empty() {
        return Err(PipelineError::Invalid(format!("{} is required", field)));
    }
    Ok(())
}

/// Submission, status transitions and listings of applications.
#[derive(Clone)]
pub struct ApplicationService {
    store: Arc<dyn RecruitmentStore>,
}

impl ApplicationService {
    pub fn new(store: Arc<dyn RecruitmentStore>) -> Self {
        Self { store }
    }

    pub async fn create_position(&self, payload: CreatePositionPayload) -> PipelineResult<Position> {
        required(&payload.title, "title")?;
        if payload.title.chars().any(char::is_control) {
            return Err(PipelineError::Invalid(
                "title must not contain control characters".to_string(),
            ));
        }
        let at = now();
        let position = Position {
            id: Uuid::new_v4(),
            title: payload.title.trim().to_string(),
            department: payload.department,
            description: payload.description,
            requirements: payload.requirements,
            status: payload.status.unwrap_or(PositionStatus::Open),
            created_at: at,
            updated_at: at,
        };
        let created = self
            .store
            .apply_batch(vec![StoreWrite::InsertPosition(position)])
            .await?
            .pop()
            .and_then(|o| o.into_position())
            .ok_or_else(|| StoreError::NotFound("created position".to_string()))?;
        info!(position_id = %created.id, title = %created.title, "position created");
        Ok(created)
    }

    pub async fn position(&self, id: Uuid) -> PipelineResult<Position> {
        self.store
            .position(id)
            .await?
            .ok_or(PipelineError::PositionNotFound(id))
    }

    /// Upserts the candidate by email and records a PENDING application with
    /// a snapshot of the submitted candidate fields. Both writes share one
    /// batch.
    pub async fn submit_application(
        &self,
        payload: SubmitApplicationPayload,
    ) -> PipelineResult<Application> {
        required(&payload.resume_url, "resume_url")?;
        required(&payload.name, "name")?;
        required(&payload.email, "email")?;

        let position = self.position(payload.position_id).await?;
        let email = normalize_email(&payload.email);
        let candidate_id = match self.store.candidate_by_email(&email).await? {
            Some(existing) => existing.id,
            None => Uuid::new_v4(),
        };

        let skills = SkillSet::new(payload.skills);
        let name = payload.name.trim().to_string();
        let match_score = match_skills(&skills, &position.requirements).score;
        let snapshot = CandidateSnapshot::restore(
            name.clone(),
            email.clone(),
            payload.phone.clone(),
            skills.clone(),
            payload.experience.clone(),
            payload.tenth.clone(),
            payload.twelfth.clone(),
        );

        let at = now();
        let application = Application {
            id: Uuid::new_v4(),
            candidate_id,
            position_id: Some(position.id),
            position_title: Some(position.title.clone()),
            snapshot,
            resume_url: Some(payload.resume_url.clone()),
            cover_letter: payload.cover_letter,
            status: ApplicationStatus::Pending,
            match_score: Some(match_score),
            created_at: at,
            updated_at: at,
        };
        let upsert = CandidateUpsert {
            id: candidate_id,
            name,
            email,
            phone: payload.phone,
            resume_url: Some(payload.resume_url),
            skills,
            experience: payload.experience,
            tenth: payload.tenth,
            twelfth: payload.twelfth,
        };

        let created = self
            .store
            .apply_batch(vec![
                StoreWrite::UpsertCandidate(upsert),
                StoreWrite::InsertApplication(application),
            ])
            .await?
            .pop()
            .and_then(|o| o.into_application())
            .ok_or_else(|| StoreError::NotFound("created application".to_string()))?;

        info!(
            application_id = %created.id,
            candidate_id = %created.candidate_id,
            position_id = %position.id,
            match_score,
            "application submitted"
        );
        Ok(created)
    }

    async fn transition(
        &self,
        application_id: Uuid,
        to: ApplicationStatus,
    ) -> PipelineResult<Application> {
        let current = self
            .store
            .application(application_id)
            .await?
            .ok_or(PipelineError::ApplicationNotFound(application_id))?;
        if !current.status.can_transition_to(to) {
            return Err(PipelineError::IllegalTransition {
                from: current.status,
                to,
            });
        }

        let updated = self
            .store
            .apply_batch(vec![StoreWrite::UpdateApplicationStatus {
                id: application_id,
                status: to,
                allowed_from: to.allowed_predecessors().to_vec(),
                at: now(),
            }])
            .await?
            .pop()
            .and_then(|o| o.into_application())
            .ok_or(PipelineError::ApplicationNotFound(application_id))?;
        info!(
            application_id = %application_id,
            from = current.status.as_str(),
            to = to.as_str(),
            "application status changed"
        );
        Ok(updated)
    }

    pub async fn shortlist(&self, application_id: Uuid) -> PipelineResult<Application> {
        self.transition(application_id, ApplicationStatus::Shortlisted)
            .await
    }

    pub async fn reject(&self, application_id: Uuid) -> PipelineResult<Application> {
        self.transition(application_id, ApplicationStatus::Rejected)
            .await
    }

    async fn earliest_scheduled(
        &self,
        application_ids: Vec<Uuid>,
    ) -> PipelineResult<HashMap<Uuid, Interview>> {
        let interviews = self
            .store
            .list_interviews(&InterviewFilter {
                status: Some(InterviewStatus::Scheduled),
                application_ids: Some(application_ids),
                ..Default::default()
            })
            .await?;
        // listed in scheduled order, so the first hit per application is the earliest
        let mut earliest: HashMap<Uuid, Interview> = HashMap::new();
        for interview in interviews {
            earliest.entry(interview.application_id).or_insert(interview);
        }
        Ok(earliest)
    }

    /// Every application in the pipeline with its next scheduled interview.
    pub async fn pipeline(&self) -> PipelineResult<Vec<PipelineEntry>> {
        let applications = self
            .store
            .list_applications(&ApplicationFilter {
                statuses: Some(ApplicationStatus::ALL.to_vec()),
                ..Default::default()
            })
            .await?;

        let mut position_ids: Vec<Uuid> =
            applications.iter().filter_map(|a| a.position_id).collect();
        position_ids.sort();
        position_ids.dedup();
        let titles: HashMap<Uuid, String> = self
            .store
            .positions_by_ids(&position_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p.title))
            .collect();
        let interviews = self
            .earliest_scheduled(applications.iter().map(|a| a.id).collect())
            .await?;

        Ok(applications
            .into_iter()
            .map(|application| {
                let interview = interviews.get(&application.id);
                let snapshot = &application.snapshot;
                PipelineEntry {
                    id: application.candidate_id,
                    application_id: application.id,
                    name: snapshot.name().to_string(),
                    position: application
                        .position_id
                        .and_then(|id| titles.get(&id).cloned())
                        .unwrap_or_else(|| UNKNOWN_POSITION.to_string()),
                    position_id: application.position_id,
                    email: snapshot.email().to_string(),
                    phone: snapshot.phone().unwrap_or_default().to_string(),
                    status: application.status.label().to_string(),
                    match_score: application.match_score.unwrap_or(0),
                    interview_date: interview.map(|i| i.scheduled_for),
                    meeting_url: interview.and_then(|i| i.meeting_url.clone()),
                }
            })
            .collect())
    }

    /// Applications for one position, scored against its current
    /// requirements, best match first.
    pub async fn candidates_for_position(
        &self,
        position_id: Uuid,
    ) -> PipelineResult<Vec<ApplicationEvaluation>> {
        let position = self.position(position_id).await?;
        let applications = self
            .store
            .list_applications(&ApplicationFilter {
                position_id: Some(position_id),
                ..Default::default()
            })
            .await?;
        Ok(evaluate_applications(&applications, &position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::models::AcademicRecord;

    async fn setup() -> (ApplicationService, Position) {
        let service = ApplicationService::new(Arc::new(MemoryStore::new()));
        let position = service
            .create_position(CreatePositionPayload {
                title: "Backend Engineer".to_string(),
                department: Some("Engineering".to_string()),
                description: None,
                requirements: "Need React, Node.js, and SQL experience".to_string(),
                status: None,
            })
            .await
            .unwrap();
        (service, position)
    }

    fn submission(position_id: Uuid, email: &str, skills: &[&str]) -> SubmitApplicationPayload {
        SubmitApplicationPayload {
            position_id,
            resume_url: "https://files.example.com/cv.pdf".to_string(),
            cover_letter: None,
            name: "Mei".to_string(),
            email: email.to_string(),
            phone: None,
            skills: skills.iter().map(|s| s.to_string()).collect(),
            experience: None,
            tenth: AcademicRecord::default(),
            twelfth: AcademicRecord::default(),
        }
    }

    #[tokio::test]
    async fn titles_with_line_breaks_are_rejected() {
        let service = ApplicationService::new(Arc::new(MemoryStore::new()));
        let err = service
            .create_position(CreatePositionPayload {
                title: "Dev\r\nBcc: someone@example.net".to_string(),
                department: None,
                description: None,
                requirements: String::new(),
                status: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Invalid(_)));
    }

    #[tokio::test]
    async fn submission_snapshots_score_and_reuses_candidate() {
        let (service, position) = setup().await;
        let first = service
            .submit_application(submission(position.id, "Mei@Example.com ", &["react", "sql"]))
            .await
            .unwrap();
        assert_eq!(first.status, ApplicationStatus::Pending);
        assert_eq!(first.match_score, Some(67));
        assert_eq!(first.snapshot.email(), "mei@example.com");
        assert_eq!(first.position_title.as_deref(), Some("Backend Engineer"));

        let second = service
            .submit_application(submission(position.id, "mei@example.com", &["go"]))
            .await
            .unwrap();
        assert_eq!(first.candidate_id, second.candidate_id);
        // the earlier snapshot does not follow the candidate update
        assert_eq!(first.snapshot.skills().as_slice(), &["react", "sql"]);
        assert_eq!(second.match_score, Some(0));
    }

    #[tokio::test]
    async fn unknown_position_is_rejected() {
        let (service, _) = setup().await;
        let err = service
            .submit_application(submission(Uuid::new_v4(), "x@example.com", &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::PositionNotFound(_)));
    }

    #[tokio::test]
    async fn transitions_follow_lifecycle() {
        let (service, position) = setup().await;
        let application = service
            .submit_application(submission(position.id, "t@example.com", &["react"]))
            .await
            .unwrap();

        let shortlisted = service.shortlist(application.id).await.unwrap();
        assert_eq!(shortlisted.status, ApplicationStatus::Shortlisted);

        let err = service.shortlist(application.id).await.unwrap_err();
        assert!(matches!(err, PipelineError::IllegalTransition { .. }));

        let rejected = service.reject(application.id).await.unwrap();
        assert_eq!(rejected.status, ApplicationStatus::Rejected);
        assert!(matches!(
            service.reject(application.id).await.unwrap_err(),
            PipelineError::IllegalTransition { .. }
        ));
        assert!(matches!(
            service.reject(Uuid::new_v4()).await.unwrap_err(),
            PipelineError::ApplicationNotFound(_)
        ));
    }

    #[tokio::test]
    async fn pipeline_labels_and_position_evaluation() {
        let (service, position) = setup().await;
        let weak = service
            .submit_application(submission(position.id, "w@example.com", &["react"]))
            .await
            .unwrap();
        let strong = service
            .submit_application(submission(position.id, "s@example.com", &["react", "node", "sql"]))
            .await
            .unwrap();

        let entries = service.pipeline().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.status == "Pending Review"));
        assert!(entries.iter().all(|e| e.position == "Backend Engineer"));
        assert!(entries.iter().all(|e| e.interview_date.is_none()));

        let ranked = service.candidates_for_position(position.id).await.unwrap();
        assert_eq!(ranked[0].application_id, strong.id);
        assert_eq!(ranked[0].match_score, 100);
        assert_eq!(ranked[1].application_id, weak.id);
        assert_eq!(ranked[1].missing_skills, vec!["node", "sql"]);
    }
}
