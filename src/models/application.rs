use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::candidate::{AcademicRecord, Candidate, SkillSet};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub position_id: Option<Uuid>,
    pub position_title: Option<String>,
    pub snapshot: CandidateSnapshot,
    pub resume_url: Option<String>,
    pub cover_letter: Option<String>,
    pub status: ApplicationStatus,
    pub match_score: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Pending,
    Shortlisted,
    InterviewScheduled,
    Rejected,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 4] = [
        ApplicationStatus::Pending,
        ApplicationStatus::Shortlisted,
        ApplicationStatus::InterviewScheduled,
        ApplicationStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "PENDING",
            ApplicationStatus::Shortlisted => "SHORTLISTED",
            ApplicationStatus::InterviewScheduled => "INTERVIEW_SCHEDULED",
            ApplicationStatus::Rejected => "REJECTED",
        }
    }

    /// Human readable label used by pipeline listings.
    pub fn label(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "Pending Review",
            ApplicationStatus::Shortlisted => "Shortlisted",
            ApplicationStatus::InterviewScheduled => "Interview Scheduled",
            ApplicationStatus::Rejected => "Rejected",
        }
    }

    /// Whether a new interview may be created for an application in this state.
    pub fn is_schedulable(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::Pending | ApplicationStatus::Shortlisted
        )
    }

    /// States from which a transition into `self` is allowed.
    pub fn allowed_predecessors(&self) -> &'static [ApplicationStatus] {
        match self {
            ApplicationStatus::Pending => &[],
            ApplicationStatus::Shortlisted => &[ApplicationStatus::Pending],
            ApplicationStatus::InterviewScheduled => {
                &[ApplicationStatus::Pending, ApplicationStatus::Shortlisted]
            }
            ApplicationStatus::Rejected => &[
                ApplicationStatus::Pending,
                ApplicationStatus::Shortlisted,
                ApplicationStatus::InterviewScheduled,
            ],
        }
    }

    pub fn can_transition_to(&self, next: ApplicationStatus) -> bool {
        next.allowed_predecessors().contains(self)
    }
}

/// Candidate data frozen at submission time.
///
/// Fields are private: a snapshot is built once from the candidate record and
/// never follows later edits to that record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSnapshot {
    name: String,
    email: String,
    phone: Option<String>,
    skills: SkillSet,
    experience: Option<String>,
    tenth: AcademicRecord,
    twelfth: AcademicRecord,
}

impl CandidateSnapshot {
    pub fn of(candidate: &Candidate) -> Self {
        Self {
            name: candidate.name.clone(),
            email: candidate.email.clone(),
            phone: candidate.phone.clone(),
            skills: candidate.skills.clone(),
            experience: candidate.experience.clone(),
            tenth: candidate.tenth.clone(),
            twelfth: candidate.twelfth.clone(),
        }
    }

    /// Rebuilds a snapshot from persisted columns.
    pub fn restore(
        name: String,
        email: String,
        phone: Option<String>,
        skills: SkillSet,
        experience: Option<String>,
        tenth: AcademicRecord,
        twelfth: AcademicRecord,
    ) -> Self {
        Self {
            name,
            email,
            phone,
            skills,
            experience,
            tenth,
            twelfth,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn skills(&self) -> &SkillSet {
        &self.skills
    }

    pub fn experience(&self) -> Option<&str> {
        self.experience.as_deref()
    }

    pub fn tenth(&self) -> &AcademicRecord {
        &self.tenth
    }

    pub fn twelfth(&self) -> &AcademicRecord {
        &self.twelfth
    }
}
