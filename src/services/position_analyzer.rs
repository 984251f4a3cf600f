use serde::Serialize;

use super::skill_extractor::extract_skills;
use crate::models::Position;

const SENIOR_MARKERS: &[&str] = &[
    "senior",
    "lead",
    "principal",
    "5+ years",
    "7+ years",
    "10+ years",
];
const ENTRY_MARKERS: &[&str] = &["junior", "entry", "graduate", "0-2 years", "1-2 years"];
const EDUCATION_MARKERS: &[&str] = &[
    "degree", "bachelor", "bs", "ba", "master", "phd", "diploma",
];
const REMOTE_MARKERS: &[&str] = &[
    "remote",
    "work from home",
    "telecommute",
    "virtual",
    "wfh",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExperienceLevel {
    Entry,
    Mid,
    Senior,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionAnalysis {
    pub skills: Vec<&'static str>,
    pub experience_level: ExperienceLevel,
    pub education_required: bool,
    pub remote_option: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionComparison {
    pub similarity_score: i32,
    pub common_skills: Vec<&'static str>,
}

fn mentions_any(text: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| text.contains(m))
}

/// Keyword scan over description and requirements. Markers are plain
/// substrings, so "bs" also fires on words like "jobs".
pub fn analyze_position(position: &Position) -> PositionAnalysis {
    let text = format!(
        "{} {}",
        position.description.as_deref().unwrap_or_default(),
        position.requirements
    )
    .to_lowercase();

    let experience_level = if mentions_any(&text, SENIOR_MARKERS) {
        ExperienceLevel::Senior
    } else if mentions_any(&text, ENTRY_MARKERS) {
        ExperienceLevel::Entry
    } else {
        ExperienceLevel::Mid
    };

    PositionAnalysis {
        skills: extract_skills(&text),
        experience_level,
        education_required: mentions_any(&text, EDUCATION_MARKERS),
        remote_option: mentions_any(&text, REMOTE_MARKERS),
    }
}

pub fn compare_positions(a: &Position, b: &Position) -> PositionComparison {
    let first = analyze_position(a);
    let second = analyze_position(b);

    let common_skills: Vec<&'static str> = first
        .skills
        .iter()
        .copied()
        .filter(|s| second.skills.contains(s))
        .collect();
    let denominator = first.skills.len().max(second.skills.len()).max(1) as f64;
    let skill_ratio = common_skills.len() as f64 / denominator;
    let level_bonus = if first.experience_level == second.experience_level {
        1.0
    } else {
        0.0
    };

    PositionComparison {
        similarity_score: ((skill_ratio * 0.7 + level_bonus * 0.3) * 100.0).round() as i32,
        common_skills,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PositionStatus;
    use chrono::Utc;
    use uuid::Uuid;

    fn position(description: &str, requirements: &str) -> Position {
        Position {
            id: Uuid::new_v4(),
            title: "Engineer".to_string(),
            department: None,
            description: Some(description.to_string()),
            requirements: requirements.to_string(),
            status: PositionStatus::Open,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn senior_markers_take_precedence() {
        let analysis = analyze_position(&position(
            "Senior engineer mentoring junior staff",
            "Rust, Docker",
        ));
        assert_eq!(analysis.experience_level, ExperienceLevel::Senior);
        assert_eq!(analysis.skills, vec!["rust", "docker"]);
    }

    #[test]
    fn defaults_to_mid_level() {
        let analysis = analyze_position(&position("Engineer", "Python"));
        assert_eq!(analysis.experience_level, ExperienceLevel::Mid);
        assert!(!analysis.remote_option);
    }

    #[test]
    fn detects_remote_and_education() {
        let analysis = analyze_position(&position(
            "Fully remote role",
            "Bachelor degree in computer science",
        ));
        assert!(analysis.remote_option);
        assert!(analysis.education_required);
    }

    #[test]
    fn comparison_weights_skills_and_level() {
        let a = position("Graduate role", "React, Node, SQL");
        let b = position("Junior role", "React, SQL, Docker, Python");
        let comparison = compare_positions(&a, &b);
        assert_eq!(comparison.common_skills, vec!["react", "sql"]);
        // 2/4 * 0.7 + 0.3
        assert_eq!(comparison.similarity_score, 65);
    }
}
