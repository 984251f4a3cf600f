use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use uuid::Uuid;

use super::skill_matcher::candidate_coverage;
use crate::database::{ApplicationFilter, InterviewFilter, RecruitmentStore};
use crate::error::{Error, Result};
use crate::models::{
    AcademicRecord, Application, ApplicationStatus, Candidate, InterviewStatus, Position,
    PositionStatus,
};

const SKILL_WEIGHT: f64 = 0.7;
const TENTH_WEIGHT: f64 = 0.1;
const TWELFTH_WEIGHT: f64 = 0.2;

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d+\.?\d*)").expect("valid percentage pattern"))
}

/// First integer or decimal number in free-text percentage input
/// ("85%", "CGPA 8.2", "approx. 91.5 percent").
pub fn parse_percentage(raw: Option<&str>) -> Option<f64> {
    let raw = raw?;
    number_pattern()
        .captures(raw)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn ranking_score(skill_match: f64, tenth: Option<f64>, twelfth: Option<f64>) -> f64 {
    let score = skill_match * SKILL_WEIGHT
        + tenth.unwrap_or(0.0) * TENTH_WEIGHT
        + twelfth.unwrap_or(0.0) * TWELFTH_WEIGHT;
    round2(score)
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationSummary {
    pub id: Uuid,
    pub status: ApplicationStatus,
    pub match_score: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedCandidate {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub resume_url: Option<String>,
    pub skills: Vec<String>,
    pub experience: Option<String>,
    pub tenth_percentage: Option<String>,
    pub twelfth_percentage: Option<String>,
    pub position_id: Option<Uuid>,
    pub position_title: Option<String>,
    pub skill_match_score: f64,
    pub ranking_score: f64,
    pub applications: Vec<ApplicationSummary>,
}

/// Ranking input: a candidate with the positions their applications link
/// to, in application order.
#[derive(Debug, Clone)]
pub struct CandidateRecord {
    pub candidate: Candidate,
    pub applications: Vec<Application>,
    pub applied_positions: Vec<Position>,
}

struct BestPosition<'a> {
    position: Option<&'a Position>,
    score: f64,
}

fn best_position<'a>(
    candidate: &Candidate,
    applied: &'a [Position],
    open_positions: &'a [Position],
) -> BestPosition<'a> {
    let mut best = BestPosition {
        position: None,
        score: 0.0,
    };
    for position in applied {
        let score = candidate_coverage(&candidate.skills, &position.requirements);
        if score > best.score {
            best = BestPosition {
                position: Some(position),
                score,
            };
        }
    }
    if best.score == 0.0 {
        for position in open_positions {
            let score = candidate_coverage(&candidate.skills, &position.requirements);
            if score > best.score {
                best = BestPosition {
                    position: Some(position),
                    score,
                };
            }
        }
    }
    best
}

fn score_record(record: &CandidateRecord, open_positions: &[Position]) -> RankedCandidate {
    let candidate = &record.candidate;
    let best = best_position(candidate, &record.applied_positions, open_positions);
    let tenth = parse_percentage(candidate.tenth.percentage.as_deref());
    let twelfth = parse_percentage(candidate.twelfth.percentage.as_deref());

    RankedCandidate {
        id: candidate.id,
        name: candidate.name.clone(),
        email: candidate.email.clone(),
        phone: candidate.phone.clone(),
        resume_url: candidate.resume_url.clone(),
        skills: candidate.skills.as_slice().to_vec(),
        experience: candidate.experience.clone(),
        tenth_percentage: candidate.tenth.percentage.clone(),
        twelfth_percentage: candidate.twelfth.percentage.clone(),
        position_id: best.position.map(|p| p.id),
        position_title: best.position.map(|p| p.title.clone()),
        skill_match_score: best.score,
        ranking_score: ranking_score(best.score, tenth, twelfth),
        applications: record
            .applications
            .iter()
            .map(|a| ApplicationSummary {
                id: a.id,
                status: a.status,
                match_score: a.match_score,
            })
            .collect(),
    }
}

fn sort_key(ranked: &RankedCandidate) -> [f64; 4] {
    [
        ranked.ranking_score,
        ranked.skill_match_score,
        parse_percentage(ranked.twelfth_percentage.as_deref()).unwrap_or(0.0),
        parse_percentage(ranked.tenth_percentage.as_deref()).unwrap_or(0.0),
    ]
}

/// Scores every candidate and orders them best first.
///
/// Ties on (ranking score, skill match, twelfth, tenth) keep input order.
/// Never fails; the output has one entry per input record.
pub fn rank(records: &[CandidateRecord], open_positions: &[Position]) -> Vec<RankedCandidate> {
    let mut keyed: Vec<([f64; 4], RankedCandidate)> = records
        .iter()
        .map(|record| {
            let ranked = score_record(record, open_positions);
            (sort_key(&ranked), ranked)
        })
        .collect();
    keyed.sort_by(|(a, _), (b, _)| {
        b.iter()
            .zip(a.iter())
            .map(|(x, y)| x.total_cmp(y))
            .find(|o| o.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    keyed.into_iter().map(|(_, ranked)| ranked).collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct InterviewSummary {
    pub id: Uuid,
    pub scheduled_for: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: InterviewStatus,
    pub meeting_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationHistory {
    pub id: Uuid,
    pub status: ApplicationStatus,
    pub match_score: Option<i32>,
    pub position_id: Option<Uuid>,
    pub position_title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub interviews: Vec<InterviewSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateRankingDetail {
    #[serde(flatten)]
    pub ranking: RankedCandidate,
    pub tenth: AcademicRecord,
    pub twelfth: AcademicRecord,
    pub position_requirements: Option<String>,
    /// Newest application first.
    pub history: Vec<ApplicationHistory>,
}

#[derive(Clone)]
pub struct RankingService {
    store: Arc<dyn RecruitmentStore>,
}

impl RankingService {
    pub fn new(store: Arc<dyn RecruitmentStore>) -> Self {
        Self { store }
    }

    async fn records_for(&self, candidates: Vec<Candidate>) -> Result<Vec<CandidateRecord>> {
        let ids: Vec<Uuid> = candidates.iter().map(|c| c.id).collect();
        let applications = self
            .store
            .list_applications(&ApplicationFilter {
                candidate_ids: Some(ids),
                ..Default::default()
            })
            .await?;

        let mut position_ids: Vec<Uuid> =
            applications.iter().filter_map(|a| a.position_id).collect();
        position_ids.sort();
        position_ids.dedup();
        let positions: HashMap<Uuid, Position> = self
            .store
            .positions_by_ids(&position_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut by_candidate: HashMap<Uuid, Vec<Application>> = HashMap::new();
        for application in applications {
            by_candidate
                .entry(application.candidate_id)
                .or_default()
                .push(application);
        }

        Ok(candidates
            .into_iter()
            .map(|candidate| {
                let applications = by_candidate.remove(&candidate.id).unwrap_or_default();
                let applied_positions = applications
                    .iter()
                    .filter_map(|a| a.position_id.and_then(|id| positions.get(&id)))
                    .cloned()
                    .collect();
                CandidateRecord {
                    candidate,
                    applications,
                    applied_positions,
                }
            })
            .collect())
    }

    pub async fn rank_all(&self) -> Result<Vec<RankedCandidate>> {
        let candidates = self.store.list_candidates().await?;
        let records = self.records_for(candidates).await?;
        let open_positions = self.store.list_positions(Some(PositionStatus::Open)).await?;
        let ranked = rank(&records, &open_positions);
        tracing::debug!(candidates = ranked.len(), "ranked candidates");
        Ok(ranked)
    }

    pub async fn rank_candidate(&self, candidate_id: Uuid) -> Result<CandidateRankingDetail> {
        let candidate = self
            .store
            .candidate(candidate_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Candidate {} not found", candidate_id)))?;
        let tenth = candidate.tenth.clone();
        let twelfth = candidate.twelfth.clone();

        let record = self
            .records_for(vec![candidate])
            .await?
            .pop()
            .ok_or_else(|| Error::Internal("candidate record missing".to_string()))?;
        let open_positions = self.store.list_positions(Some(PositionStatus::Open)).await?;
        let ranking = score_record(&record, &open_positions);

        let position_requirements = ranking.position_id.and_then(|id| {
            record
                .applied_positions
                .iter()
                .chain(open_positions.iter())
                .find(|p| p.id == id)
                .map(|p| p.requirements.clone())
        });

        let application_ids: Vec<Uuid> = record.applications.iter().map(|a| a.id).collect();
        let interviews = if application_ids.is_empty() {
            Vec::new()
        } else {
            self.store
                .list_interviews(&InterviewFilter {
                    application_ids: Some(application_ids),
                    ..Default::default()
                })
                .await?
        };

        let mut history: Vec<ApplicationHistory> = record
            .applications
            .iter()
            .map(|application| ApplicationHistory {
                id: application.id,
                status: application.status,
                match_score: application.match_score,
                position_id: application.position_id,
                position_title: application.position_title.clone(),
                created_at: application.created_at,
                interviews: interviews
                    .iter()
                    .filter(|i| i.application_id == application.id)
                    .map(|i| InterviewSummary {
                        id: i.id,
                        scheduled_for: i.scheduled_for,
                        duration_minutes: i.duration_minutes,
                        status: i.status,
                        meeting_url: i.meeting_url.clone(),
                    })
                    .collect(),
            })
            .collect();
        history.reverse();

        Ok(CandidateRankingDetail {
            ranking,
            tenth,
            twelfth,
            position_requirements,
            history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SkillSet;

    fn candidate(name: &str, skills: &[&str], tenth: Option<&str>, twelfth: Option<&str>) -> Candidate {
        let now = Utc::now();
        Candidate {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            phone: None,
            resume_url: None,
            skills: SkillSet::new(skills.iter().copied()),
            experience: None,
            tenth: AcademicRecord {
                percentage: tenth.map(str::to_string),
                ..Default::default()
            },
            twelfth: AcademicRecord {
                percentage: twelfth.map(str::to_string),
                ..Default::default()
            },
            created_at: now,
            updated_at: now,
        }
    }

    fn position(title: &str, requirements: &str) -> Position {
        let now = Utc::now();
        Position {
            id: Uuid::new_v4(),
            title: title.to_string(),
            department: None,
            description: None,
            requirements: requirements.to_string(),
            status: PositionStatus::Open,
            created_at: now,
            updated_at: now,
        }
    }

    fn record(candidate: Candidate, applied: Vec<Position>) -> CandidateRecord {
        CandidateRecord {
            candidate,
            applications: Vec::new(),
            applied_positions: applied,
        }
    }

    #[test]
    fn percentage_parsing_takes_first_number() {
        assert_eq!(parse_percentage(Some("85%")), Some(85.0));
        assert_eq!(parse_percentage(Some("CGPA 8.25 / 10")), Some(8.25));
        assert_eq!(parse_percentage(Some("approx 91.")), Some(91.0));
        assert_eq!(parse_percentage(Some("n/a")), None);
        assert_eq!(parse_percentage(None), None);
    }

    #[test]
    fn worked_ranking_example() {
        let score = ranking_score(60.0, Some(90.0), Some(85.0));
        assert!((score - 68.0).abs() < 1e-9);
    }

    #[test]
    fn scores_round_to_two_decimals() {
        let score = ranking_score(100.0 / 3.0, None, None);
        assert!((score - 23.33).abs() < 1e-9);
    }

    #[test]
    fn applied_positions_win_over_open_positions() {
        let applied = position("Frontend", "React");
        let open = vec![position("Data", "SQL, Python, React")];
        let ranked = rank(
            &[record(candidate("Ada", &["React", "Python"], None, None), vec![applied.clone()])],
            &open,
        );
        assert_eq!(ranked[0].position_id, Some(applied.id));
        assert!((ranked[0].skill_match_score - 50.0).abs() < 1e-9);
    }

    #[test]
    fn open_positions_are_scanned_when_applications_score_zero() {
        let applied = position("Chef", "Cooking");
        let first = position("Backend", "Rust");
        let second = position("Systems", "Rust");
        let open = vec![first.clone(), second];
        let ranked = rank(
            &[record(candidate("Linus", &["Rust"], None, None), vec![applied])],
            &open,
        );
        // first maximum wins
        assert_eq!(ranked[0].position_id, Some(first.id));
    }

    #[test]
    fn ties_break_on_twelfth_then_tenth_then_input_order() {
        let records = vec![
            record(candidate("A", &[], Some("50"), Some("50")), vec![]),
            record(candidate("B", &[], Some("60"), Some("45")), vec![]),
            record(candidate("C", &[], Some("50"), Some("50")), vec![]),
            record(candidate("D", &[], None, None), vec![]),
        ];
        // A: 5 + 10 = 15, B: 6 + 9 = 15, C: 15, D: 0
        let ranked = rank(&records, &[]);
        let names: Vec<&str> = ranked.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C", "B", "D"]);
    }

    #[test]
    fn ranking_is_total_and_idempotent() {
        let open = vec![position("Web", "React, Node, SQL")];
        let records = vec![
            record(candidate("A", &["React"], Some("70%"), Some("80%")), vec![]),
            record(candidate("B", &["SQL", "Go"], Some("95"), None), vec![]),
            record(candidate("C", &[], None, Some("garbage")), vec![]),
        ];
        let first = rank(&records, &open);
        let second = rank(&records, &open);
        assert_eq!(first.len(), records.len());
        let ids = |r: &[RankedCandidate]| r.iter().map(|c| (c.id, c.ranking_score)).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
        for pair in first.windows(2) {
            assert!(sort_key(&pair[0]) >= sort_key(&pair[1]));
        }
    }
}
