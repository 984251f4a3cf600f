use serde::Serialize;
use uuid::Uuid;

use super::skill_extractor::extract_skills;
use crate::models::{Application, ApplicationStatus, Position, SkillSet};

/// Dice bigram similarity above which two skill spellings are treated as equal.
const SIMILARITY_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub score: i32,
    pub matched: Vec<String>,
    pub missing: Vec<String>,
}

impl MatchResult {
    fn empty() -> Self {
        Self {
            score: 0,
            matched: Vec::new(),
            missing: Vec::new(),
        }
    }
}

fn skill_matches(candidate_skill: &str, required: &str) -> bool {
    let candidate_skill = candidate_skill.to_lowercase();
    candidate_skill == required || strsim::sorensen_dice(&candidate_skill, required) > SIMILARITY_THRESHOLD
}

/// Requirement coverage: share of the skills extracted from
/// `requirements` that the candidate holds.
pub fn match_skills(candidate_skills: &SkillSet, requirements: &str) -> MatchResult {
    let required = extract_skills(requirements);
    if required.is_empty() {
        return MatchResult::empty();
    }

    let (matched, missing): (Vec<&str>, Vec<&str>) = required
        .iter()
        .partition(|req| candidate_skills.iter().any(|s| skill_matches(s, req)));

    let score = (100.0 * matched.len() as f64 / required.len() as f64).round() as i32;
    MatchResult {
        score,
        matched: matched.into_iter().map(str::to_string).collect(),
        missing: missing.into_iter().map(str::to_string).collect(),
    }
}

/// Candidate coverage: share of the candidate's skills that appear in (or
/// contain) one of the requirement phrases. Used by the ranking views.
pub fn candidate_coverage(candidate_skills: &SkillSet, requirements: &str) -> f64 {
    if candidate_skills.is_empty() {
        return 0.0;
    }
    let lowered = requirements.to_lowercase();
    let phrases: Vec<&str> = lowered
        .split(|c| c == ',' || c == '.' || c == '\n')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if phrases.is_empty() {
        return 0.0;
    }

    let count = candidate_skills
        .iter()
        .map(str::to_lowercase)
        .filter(|skill| {
            phrases
                .iter()
                .any(|phrase| phrase.contains(skill.as_str()) || skill.contains(phrase))
        })
        .count();

    (100.0 * count as f64 / candidate_skills.len() as f64).min(100.0)
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationEvaluation {
    pub application_id: Uuid,
    pub candidate_id: Uuid,
    pub candidate_name: String,
    pub email: String,
    pub phone: String,
    pub position: String,
    pub match_score: i32,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub status: ApplicationStatus,
}

/// Scores each application's snapshot skills against `position`, best first.
/// Equal scores keep their input order.
pub fn evaluate_applications(
    applications: &[Application],
    position: &Position,
) -> Vec<ApplicationEvaluation> {
    let mut evaluations: Vec<ApplicationEvaluation> = applications
        .iter()
        .map(|application| {
            let snapshot = &application.snapshot;
            let result = match_skills(snapshot.skills(), &position.requirements);
            ApplicationEvaluation {
                application_id: application.id,
                candidate_id: application.candidate_id,
                candidate_name: snapshot.name().to_string(),
                email: snapshot.email().to_string(),
                phone: snapshot.phone().unwrap_or_default().to_string(),
                position: position.title.clone(),
                match_score: result.score,
                matched_skills: result.matched,
                missing_skills: result.missing,
                status: application.status,
            }
        })
        .collect();
    evaluations.sort_by(|a, b| b.match_score.cmp(&a.match_score));
    evaluations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skills(list: &[&str]) -> SkillSet {
        SkillSet::new(list.iter().copied())
    }

    #[test]
    fn worked_example_scores_two_of_three() {
        let result = match_skills(
            &skills(&["react", "sql"]),
            "Need React, Node.js, and SQL experience",
        );
        assert_eq!(result.matched, vec!["react", "sql"]);
        assert_eq!(result.missing, vec!["node"]);
        assert_eq!(result.score, 67);
    }

    #[test]
    fn no_recognized_requirements_scores_zero() {
        let result = match_skills(&skills(&["react"]), "Must be friendly and punctual");
        assert_eq!(result, MatchResult::empty());
        assert_eq!(match_skills(&skills(&["react"]), ""), MatchResult::empty());
    }

    #[test]
    fn near_spellings_count_as_matches() {
        // "postgresql" vs "postgressql": one extra letter
        let result = match_skills(&skills(&["PostgresSQL"]), "PostgreSQL required");
        assert!(result.matched.contains(&"postgresql".to_string()));
    }

    #[test]
    fn score_grows_with_matched_count() {
        let requirements = "React, Docker, Kubernetes, Python";
        let mut last = -1;
        for held in [
            vec![],
            vec!["react"],
            vec!["react", "docker"],
            vec!["react", "docker", "kubernetes"],
            vec!["react", "docker", "kubernetes", "python"],
        ] {
            let score = match_skills(&skills(&held), requirements).score;
            assert!((0..=100).contains(&score));
            assert!(score >= last);
            last = score;
        }
        assert_eq!(last, 100);
    }

    #[test]
    fn coverage_divides_by_candidate_skill_count() {
        let score = candidate_coverage(
            &skills(&["React", "SQL", "Cooking", "Chess"]),
            "React developer. Strong SQL\nTeam player",
        );
        assert!((score - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn coverage_counts_phrase_inside_skill() {
        let score = candidate_coverage(&skills(&["react native"]), "react");
        assert!((score - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn coverage_is_zero_without_inputs() {
        assert_eq!(candidate_coverage(&SkillSet::default(), "React"), 0.0);
        assert_eq!(candidate_coverage(&skills(&["React"]), " , . \n"), 0.0);
    }
}
