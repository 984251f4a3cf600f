use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    Application, ApplicationStatus, Candidate, CandidateUpsert, Interview, InterviewStatus,
    Position, PositionStatus,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("write conflict: {0}")]
    Conflict(String),

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db) = err {
            let code = db.code().map(|c| c.into_owned());
            let message = db.message().to_string();
            match code.as_deref() {
                // serialization_failure, unique_violation
                Some("40001") | Some("23505") => return StoreError::Conflict(message),
                // foreign_key_violation, check_violation
                Some("23503") | Some("23514") => return StoreError::Constraint(message),
                _ => {}
            }
        }
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("row".to_string()),
            other => StoreError::Database(other),
        }
    }
}

/// One mutation inside a transactional batch.
#[derive(Debug, Clone)]
pub enum StoreWrite {
    /// Insert, or update the existing row sharing the same email.
    UpsertCandidate(CandidateUpsert),
    InsertPosition(Position),
    InsertApplication(Application),
    /// Status change that only applies while the row is in one of
    /// `allowed_from` (empty means unconditional). A miss is a conflict.
    UpdateApplicationStatus {
        id: Uuid,
        status: ApplicationStatus,
        allowed_from: Vec<ApplicationStatus>,
        at: DateTime<Utc>,
    },
    InsertInterview(Interview),
    UpdateInterview {
        id: Uuid,
        status: Option<InterviewStatus>,
        notes: Option<String>,
        at: DateTime<Utc>,
    },
}

/// Row produced by a write, in the same order as the submitted batch.
#[derive(Debug, Clone)]
pub enum WriteOutcome {
    Candidate(Candidate),
    Position(Position),
    Application(Application),
    Interview(Interview),
}

impl WriteOutcome {
    pub fn into_candidate(self) -> Option<Candidate> {
        match self {
            WriteOutcome::Candidate(c) => Some(c),
            _ => None,
        }
    }

    pub fn into_position(self) -> Option<Position> {
        match self {
            WriteOutcome::Position(p) => Some(p),
            _ => None,
        }
    }

    pub fn into_application(self) -> Option<Application> {
        match self {
            WriteOutcome::Application(a) => Some(a),
            _ => None,
        }
    }

    pub fn into_interview(self) -> Option<Interview> {
        match self {
            WriteOutcome::Interview(i) => Some(i),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    pub candidate_ids: Option<Vec<Uuid>>,
    pub position_id: Option<Uuid>,
    pub statuses: Option<Vec<ApplicationStatus>>,
}

#[derive(Debug, Clone, Default)]
pub struct InterviewFilter {
    pub status: Option<InterviewStatus>,
    pub candidate_id: Option<Uuid>,
    pub application_ids: Option<Vec<Uuid>>,
    pub position_id: Option<Uuid>,
    pub scheduled_from: Option<DateTime<Utc>>,
    pub scheduled_before: Option<DateTime<Utc>>,
}

impl InterviewFilter {
    pub fn matches(&self, interview: &Interview, position_id: Option<Uuid>) -> bool {
        if let Some(status) = self.status {
            if interview.status != status {
                return false;
            }
        }
        if let Some(candidate_id) = self.candidate_id {
            if interview.candidate_id != candidate_id {
                return false;
            }
        }
        if let Some(ref ids) = self.application_ids {
            if !ids.contains(&interview.application_id) {
                return false;
            }
        }
        if let Some(wanted) = self.position_id {
            if position_id != Some(wanted) {
                return false;
            }
        }
        if let Some(from) = self.scheduled_from {
            if interview.scheduled_for < from {
                return false;
            }
        }
        if let Some(before) = self.scheduled_before {
            if interview.scheduled_for >= before {
                return false;
            }
        }
        true
    }
}

/// Storage port consumed by the ranking, pipeline and scheduling services.
///
/// Listing order: candidates newest first, positions and applications oldest
/// first, interviews by scheduled time.
#[async_trait]
pub trait RecruitmentStore: Send + Sync {
    async fn candidates_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Candidate>, StoreError>;
    async fn candidate_by_email(&self, email: &str) -> Result<Option<Candidate>, StoreError>;
    async fn list_candidates(&self) -> Result<Vec<Candidate>, StoreError>;

    async fn positions_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Position>, StoreError>;
    async fn list_positions(
        &self,
        status: Option<PositionStatus>,
    ) -> Result<Vec<Position>, StoreError>;

    async fn applications_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Application>, StoreError>;
    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, StoreError>;

    async fn interviews_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Interview>, StoreError>;
    async fn list_interviews(&self, filter: &InterviewFilter)
        -> Result<Vec<Interview>, StoreError>;

    /// Applies every write or none of them.
    async fn apply_batch(&self, writes: Vec<StoreWrite>) -> Result<Vec<WriteOutcome>, StoreError>;

    async fn candidate(&self, id: Uuid) -> Result<Option<Candidate>, StoreError> {
        Ok(self.candidates_by_ids(&[id]).await?.into_iter().next())
    }

    async fn position(&self, id: Uuid) -> Result<Option<Position>, StoreError> {
        Ok(self.positions_by_ids(&[id]).await?.into_iter().next())
    }

    async fn application(&self, id: Uuid) -> Result<Option<Application>, StoreError> {
        Ok(self.applications_by_ids(&[id]).await?.into_iter().next())
    }

    async fn interview(&self, id: Uuid) -> Result<Option<Interview>, StoreError> {
        Ok(self.interviews_by_ids(&[id]).await?.into_iter().next())
    }
}
