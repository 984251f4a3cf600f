use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub resume_url: Option<String>,
    pub skills: SkillSet,
    pub experience: Option<String>,
    pub tenth: AcademicRecord,
    pub twelfth: AcademicRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// School-leaving record as entered by the applicant. Every field is free text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcademicRecord {
    pub school: Option<String>,
    pub year: Option<String>,
    pub percentage: Option<String>,
}

/// Flat skill list, unique under case-insensitive comparison.
///
/// The first spelling seen for a skill is the one kept for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct SkillSet(Vec<String>);

impl SkillSet {
    pub fn new<I, S>(skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut kept: Vec<String> = Vec::new();
        for skill in skills {
            let skill = skill.into();
            let trimmed = skill.trim();
            if trimmed.is_empty() {
                continue;
            }
            let lowered = trimmed.to_lowercase();
            if kept.iter().any(|k| k.to_lowercase() == lowered) {
                continue;
            }
            kept.push(trimmed.to_string());
        }
        Self(kept)
    }

    pub fn contains(&self, skill: &str) -> bool {
        let needle = skill.trim().to_lowercase();
        self.0.iter().any(|s| s.to_lowercase() == needle)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for SkillSet {
    fn from(value: Vec<String>) -> Self {
        SkillSet::new(value)
    }
}

impl From<SkillSet> for Vec<String> {
    fn from(value: SkillSet) -> Self {
        value.0
    }
}

/// Candidate fields as written by an application submission.
#[derive(Debug, Clone)]
pub struct CandidateUpsert {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub resume_url: Option<String>,
    pub skills: SkillSet,
    pub experience: Option<String>,
    pub tenth: AcademicRecord,
    pub twelfth: AcademicRecord,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
