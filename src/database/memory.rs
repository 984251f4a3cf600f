use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use super::store::{
    ApplicationFilter, InterviewFilter, RecruitmentStore, StoreError, StoreWrite, WriteOutcome,
};
use crate::models::{
    candidate::normalize_email, Application, Candidate, Interview, Position, PositionStatus,
};

/// In-process store with the same batch semantics as the Postgres adapter.
///
/// Used when no database is configured and by the test suites.
#[derive(Default, Clone)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

#[derive(Default, Clone)]
struct Tables {
    candidates: Vec<Candidate>,
    positions: Vec<Position>,
    applications: Vec<Application>,
    interviews: Vec<Interview>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batches are staged on a copy and swapped in whole, so the tables are
    /// consistent even when a previous holder panicked.
    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> Tables {
        self.lock().clone()
    }
}

impl Tables {
    fn apply(&mut self, write: StoreWrite) -> Result<WriteOutcome, StoreError> {
        match write {
            StoreWrite::UpsertCandidate(upsert) => {
                let email = normalize_email(&upsert.email);
                let now = chrono::Utc::now();
                if let Some(existing) = self
                    .candidates
                    .iter_mut()
                    .find(|c| normalize_email(&c.email) == email)
                {
                    existing.name = upsert.name;
                    existing.phone = upsert.phone;
                    existing.resume_url = upsert.resume_url;
                    existing.skills = upsert.skills;
                    existing.experience = upsert.experience;
                    existing.tenth = upsert.tenth;
                    existing.twelfth = upsert.twelfth;
                    existing.updated_at = now;
                    return Ok(WriteOutcome::Candidate(existing.clone()));
                }
                if self.candidates.iter().any(|c| c.id == upsert.id) {
                    return Err(StoreError::Conflict(format!("candidate {}", upsert.id)));
                }
                let candidate = Candidate {
                    id: upsert.id,
                    name: upsert.name,
                    email,
                    phone: upsert.phone,
                    resume_url: upsert.resume_url,
                    skills: upsert.skills,
                    experience: upsert.experience,
                    tenth: upsert.tenth,
                    twelfth: upsert.twelfth,
                    created_at: now,
                    updated_at: now,
                };
                self.candidates.push(candidate.clone());
                Ok(WriteOutcome::Candidate(candidate))
            }
            StoreWrite::InsertPosition(position) => {
                if self.positions.iter().any(|p| p.id == position.id) {
                    return Err(StoreError::Conflict(format!("position {}", position.id)));
                }
                self.positions.push(position.clone());
                Ok(WriteOutcome::Position(position))
            }
            StoreWrite::InsertApplication(application) => {
                if self.applications.iter().any(|a| a.id == application.id) {
                    return Err(StoreError::Conflict(format!(
                        "application {}",
                        application.id
                    )));
                }
                if !self.candidates.iter().any(|c| c.id == application.candidate_id) {
                    return Err(StoreError::Constraint(format!(
                        "application references missing candidate {}",
                        application.candidate_id
                    )));
                }
                if let Some(position_id) = application.position_id {
                    if !self.positions.iter().any(|p| p.id == position_id) {
                        return Err(StoreError::Constraint(format!(
                            "application references missing position {}",
                            position_id
                        )));
                    }
                }
                self.applications.push(application.clone());
                Ok(WriteOutcome::Application(application))
            }
            StoreWrite::UpdateApplicationStatus {
                id,
                status,
                allowed_from,
                at,
            } => {
                let application = self
                    .applications
                    .iter_mut()
                    .find(|a| a.id == id)
                    .ok_or_else(|| StoreError::NotFound(format!("application {}", id)))?;
                if !allowed_from.is_empty() && !allowed_from.contains(&application.status) {
                    return Err(StoreError::Conflict(format!(
                        "application {} is {}",
                        id,
                        application.status.as_str()
                    )));
                }
                application.status = status;
                application.updated_at = at;
                Ok(WriteOutcome::Application(application.clone()))
            }
            StoreWrite::InsertInterview(interview) => {
                if self.interviews.iter().any(|i| i.id == interview.id) {
                    return Err(StoreError::Conflict(format!("interview {}", interview.id)));
                }
                if !self
                    .applications
                    .iter()
                    .any(|a| a.id == interview.application_id)
                {
                    return Err(StoreError::Constraint(format!(
                        "interview references missing application {}",
                        interview.application_id
                    )));
                }
                if !self.candidates.iter().any(|c| c.id == interview.candidate_id) {
                    return Err(StoreError::Constraint(format!(
                        "interview references missing candidate {}",
                        interview.candidate_id
                    )));
                }
                self.interviews.push(interview.clone());
                Ok(WriteOutcome::Interview(interview))
            }
            StoreWrite::UpdateInterview {
                id,
                status,
                notes,
                at,
            } => {
                let interview = self
                    .interviews
                    .iter_mut()
                    .find(|i| i.id == id)
                    .ok_or_else(|| StoreError::NotFound(format!("interview {}", id)))?;
                if let Some(status) = status {
                    interview.status = status;
                }
                if let Some(notes) = notes {
                    interview.notes = notes;
                }
                interview.updated_at = at;
                Ok(WriteOutcome::Interview(interview.clone()))
            }
        }
    }

    fn position_of(&self, application_id: Uuid) -> Option<Uuid> {
        self.applications
            .iter()
            .find(|a| a.id == application_id)
            .and_then(|a| a.position_id)
    }
}

#[async_trait]
impl RecruitmentStore for MemoryStore {
    async fn candidates_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Candidate>, StoreError> {
        let tables = self.snapshot();
        Ok(tables
            .candidates
            .into_iter()
            .filter(|c| ids.contains(&c.id))
            .collect())
    }

    async fn candidate_by_email(&self, email: &str) -> Result<Option<Candidate>, StoreError> {
        let email = normalize_email(email);
        let tables = self.snapshot();
        Ok(tables
            .candidates
            .into_iter()
            .find(|c| normalize_email(&c.email) == email))
    }

    async fn list_candidates(&self) -> Result<Vec<Candidate>, StoreError> {
        let mut candidates = self.snapshot().candidates;
        candidates.reverse();
        Ok(candidates)
    }

    async fn positions_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Position>, StoreError> {
        Ok(self
            .snapshot()
            .positions
            .into_iter()
            .filter(|p| ids.contains(&p.id))
            .collect())
    }

    async fn list_positions(
        &self,
        status: Option<PositionStatus>,
    ) -> Result<Vec<Position>, StoreError> {
        Ok(self
            .snapshot()
            .positions
            .into_iter()
            .filter(|p| status.map_or(true, |s| p.status == s))
            .collect())
    }

    async fn applications_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Application>, StoreError> {
        Ok(self
            .snapshot()
            .applications
            .into_iter()
            .filter(|a| ids.contains(&a.id))
            .collect())
    }

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, StoreError> {
        Ok(self
            .snapshot()
            .applications
            .into_iter()
            .filter(|a| {
                filter
                    .candidate_ids
                    .as_ref()
                    .map_or(true, |ids| ids.contains(&a.candidate_id))
            })
            .filter(|a| filter.position_id.map_or(true, |p| a.position_id == Some(p)))
            .filter(|a| {
                filter
                    .statuses
                    .as_ref()
                    .map_or(true, |s| s.contains(&a.status))
            })
            .collect())
    }

    async fn interviews_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Interview>, StoreError> {
        Ok(self
            .snapshot()
            .interviews
            .into_iter()
            .filter(|i| ids.contains(&i.id))
            .collect())
    }

    async fn list_interviews(
        &self,
        filter: &InterviewFilter,
    ) -> Result<Vec<Interview>, StoreError> {
        let tables = self.snapshot();
        let mut interviews: Vec<Interview> = tables
            .interviews
            .iter()
            .filter(|i| filter.matches(i, tables.position_of(i.application_id)))
            .cloned()
            .collect();
        interviews.sort_by_key(|i| i.scheduled_for);
        Ok(interviews)
    }

    async fn apply_batch(&self, writes: Vec<StoreWrite>) -> Result<Vec<WriteOutcome>, StoreError> {
        let mut guard = self.lock();
        let mut staged = guard.clone();
        let mut outcomes = Vec::with_capacity(writes.len());
        for write in writes {
            outcomes.push(staged.apply(write)?);
        }
        *guard = staged;
        Ok(outcomes)
    }
}
