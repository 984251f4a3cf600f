use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction};
use uuid::Uuid;

use super::store::{
    ApplicationFilter, InterviewFilter, RecruitmentStore, StoreError, StoreWrite, WriteOutcome,
};
use crate::models::{
    candidate::normalize_email, AcademicRecord, Application, ApplicationStatus, Candidate,
    CandidateSnapshot, Interview, InterviewStatus, Position, PositionStatus, SkillSet,
};

const CANDIDATE_COLUMNS: &str = "id, name, email, phone, resume_url, skills, experience, \
    tenth_school, tenth_year, tenth_percentage, twelfth_school, twelfth_year, twelfth_percentage, \
    created_at, updated_at";

const POSITION_COLUMNS: &str =
    "id, title, department, description, requirements, status, created_at, updated_at";

const APPLICATION_COLUMNS: &str = "id, candidate_id, position_id, position_title, name, email, \
    phone, skills, experience, tenth_school, tenth_year, tenth_percentage, twelfth_school, \
    twelfth_year, twelfth_percentage, resume_url, cover_letter, status, match_score, \
    created_at, updated_at";

const INTERVIEW_COLUMNS: &str = "i.id, i.application_id, i.candidate_id, i.scheduled_for, \
    i.duration_minutes, i.status, i.meeting_url, i.calendar_event_id, i.notes, i.scheduled_by, \
    i.created_at, i.updated_at";

/// PostgreSQL adapter. Batches run in a SERIALIZABLE transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Rows written before statuses became enums carry mixed-case and spaced
// variants ("Open", "open", "Interview Scheduled"); they are folded here.
// The SQL expressions below fold the same way, so a row that decodes to a
// status also matches that status in filters and guards.

const POSITION_STATUS_SQL: &str = "upper(trim(status))";
const APPLICATION_STATUS_SQL: &str = "upper(replace(trim(status), ' ', '_'))";
const INTERVIEW_STATUS_SQL: &str = "lower(regexp_replace(i.status, '[^A-Za-z0-9]', '', 'g'))";

fn decode_error(message: String) -> sqlx::Error {
    sqlx::Error::Decode(message.into())
}

fn position_status(raw: &str) -> Result<PositionStatus, sqlx::Error> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "OPEN" => Ok(PositionStatus::Open),
        "CLOSED" => Ok(PositionStatus::Closed),
        other => Err(decode_error(format!("unknown position status '{}'", other))),
    }
}

fn application_status(raw: &str) -> Result<ApplicationStatus, sqlx::Error> {
    let folded = raw.trim().to_ascii_uppercase().replace(' ', "_");
    match folded.as_str() {
        "PENDING" => Ok(ApplicationStatus::Pending),
        "SHORTLISTED" => Ok(ApplicationStatus::Shortlisted),
        "INTERVIEW_SCHEDULED" => Ok(ApplicationStatus::InterviewScheduled),
        "REJECTED" => Ok(ApplicationStatus::Rejected),
        other => Err(decode_error(format!("unknown application status '{}'", other))),
    }
}

fn fold_interview_status(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn interview_status(raw: &str) -> Result<InterviewStatus, sqlx::Error> {
    match fold_interview_status(raw).as_str() {
        "scheduled" => Ok(InterviewStatus::Scheduled),
        "completed" => Ok(InterviewStatus::Completed),
        "cancelled" => Ok(InterviewStatus::Cancelled),
        "noshow" => Ok(InterviewStatus::NoShow),
        "rescheduled" => Ok(InterviewStatus::Rescheduled),
        "rejected" => Ok(InterviewStatus::Rejected),
        _ => Err(decode_error(format!("unknown interview status '{}'", raw))),
    }
}

fn academic(row: &PgRow, prefix: &str) -> Result<AcademicRecord, sqlx::Error> {
    Ok(AcademicRecord {
        school: row.try_get(format!("{}_school", prefix).as_str())?,
        year: row.try_get(format!("{}_year", prefix).as_str())?,
        percentage: row.try_get(format!("{}_percentage", prefix).as_str())?,
    })
}

fn candidate_from_row(row: &PgRow) -> Result<Candidate, sqlx::Error> {
    let skills: Vec<String> = row.try_get("skills")?;
    Ok(Candidate {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        resume_url: row.try_get("resume_url")?,
        skills: SkillSet::new(skills),
        experience: row.try_get("experience")?,
        tenth: academic(row, "tenth")?,
        twelfth: academic(row, "twelfth")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn position_from_row(row: &PgRow) -> Result<Position, sqlx::Error> {
    let status: String = row.try_get("status")?;
    Ok(Position {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        department: row.try_get("department")?,
        description: row.try_get("description")?,
        requirements: row
            .try_get::<Option<String>, _>("requirements")?
            .unwrap_or_default(),
        status: position_status(&status)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn application_from_row(row: &PgRow) -> Result<Application, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let skills: Vec<String> = row.try_get("skills")?;
    let snapshot = CandidateSnapshot::restore(
        row.try_get("name")?,
        row.try_get("email")?,
        row.try_get("phone")?,
        SkillSet::new(skills),
        row.try_get("experience")?,
        academic(row, "tenth")?,
        academic(row, "twelfth")?,
    );
    Ok(Application {
        id: row.try_get("id")?,
        candidate_id: row.try_get("candidate_id")?,
        position_id: row.try_get("position_id")?,
        position_title: row.try_get("position_title")?,
        snapshot,
        resume_url: row.try_get("resume_url")?,
        cover_letter: row.try_get("cover_letter")?,
        status: application_status(&status)?,
        match_score: row.try_get("match_score")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn interview_from_row(row: &PgRow) -> Result<Interview, sqlx::Error> {
    let status: String = row.try_get("status")?;
    Ok(Interview {
        id: row.try_get("id")?,
        application_id: row.try_get("application_id")?,
        candidate_id: row.try_get("candidate_id")?,
        scheduled_for: row.try_get("scheduled_for")?,
        duration_minutes: row.try_get("duration_minutes")?,
        status: interview_status(&status)?,
        meeting_url: row.try_get("meeting_url")?,
        calendar_event_id: row.try_get("calendar_event_id")?,
        notes: row
            .try_get::<Option<String>, _>("notes")?
            .unwrap_or_default(),
        scheduled_by: row.try_get("scheduled_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn collect<T>(
    rows: Vec<PgRow>,
    map: fn(&PgRow) -> Result<T, sqlx::Error>,
) -> Result<Vec<T>, StoreError> {
    rows.iter()
        .map(|r| map(r).map_err(StoreError::from))
        .collect()
}

fn status_strings(statuses: &[ApplicationStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

async fn apply_write(
    tx: &mut Transaction<'_, Postgres>,
    write: StoreWrite,
) -> Result<WriteOutcome, StoreError> {
    match write {
        StoreWrite::UpsertCandidate(upsert) => {
            let sql = format!(
                r#"
                INSERT INTO candidates (
                    id, name, email, phone, resume_url, skills, experience,
                    tenth_school, tenth_year, tenth_percentage,
                    twelfth_school, twelfth_year, twelfth_percentage
                ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)
                ON CONFLICT (email) DO UPDATE SET
                    name = EXCLUDED.name,
                    phone = EXCLUDED.phone,
                    resume_url = EXCLUDED.resume_url,
                    skills = EXCLUDED.skills,
                    experience = EXCLUDED.experience,
                    tenth_school = EXCLUDED.tenth_school,
                    tenth_year = EXCLUDED.tenth_year,
                    tenth_percentage = EXCLUDED.tenth_percentage,
                    twelfth_school = EXCLUDED.twelfth_school,
                    twelfth_year = EXCLUDED.twelfth_year,
                    twelfth_percentage = EXCLUDED.twelfth_percentage,
                    updated_at = NOW()
                RETURNING {}
                "#,
                CANDIDATE_COLUMNS
            );
            let row = sqlx::query(&sql)
                .bind(upsert.id)
                .bind(&upsert.name)
                .bind(normalize_email(&upsert.email))
                .bind(&upsert.phone)
                .bind(&upsert.resume_url)
                .bind(upsert.skills.as_slice())
                .bind(&upsert.experience)
                .bind(&upsert.tenth.school)
                .bind(&upsert.tenth.year)
                .bind(&upsert.tenth.percentage)
                .bind(&upsert.twelfth.school)
                .bind(&upsert.twelfth.year)
                .bind(&upsert.twelfth.percentage)
                .fetch_one(&mut **tx)
                .await?;
            Ok(WriteOutcome::Candidate(candidate_from_row(&row)?))
        }
        StoreWrite::InsertPosition(position) => {
            let sql = format!(
                r#"
                INSERT INTO positions (id, title, department, description, requirements, status, created_at, updated_at)
                VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
                RETURNING {}
                "#,
                POSITION_COLUMNS
            );
            let row = sqlx::query(&sql)
                .bind(position.id)
                .bind(&position.title)
                .bind(&position.department)
                .bind(&position.description)
                .bind(&position.requirements)
                .bind(position.status.as_str())
                .bind(position.created_at)
                .bind(position.updated_at)
                .fetch_one(&mut **tx)
                .await?;
            Ok(WriteOutcome::Position(position_from_row(&row)?))
        }
        StoreWrite::InsertApplication(application) => {
            let sql = format!(
                r#"
                INSERT INTO applications (
                    id, candidate_id, position_id, position_title, name, email, phone, skills,
                    experience, tenth_school, tenth_year, tenth_percentage, twelfth_school,
                    twelfth_year, twelfth_percentage, resume_url, cover_letter, status,
                    match_score, created_at, updated_at
                ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20,$21)
                RETURNING {}
                "#,
                APPLICATION_COLUMNS
            );
            let snapshot = &application.snapshot;
            let row = sqlx::query(&sql)
                .bind(application.id)
                .bind(application.candidate_id)
                .bind(application.position_id)
                .bind(&application.position_title)
                .bind(snapshot.name())
                .bind(snapshot.email())
                .bind(snapshot.phone())
                .bind(snapshot.skills().as_slice())
                .bind(snapshot.experience())
                .bind(&snapshot.tenth().school)
                .bind(&snapshot.tenth().year)
                .bind(&snapshot.tenth().percentage)
                .bind(&snapshot.twelfth().school)
                .bind(&snapshot.twelfth().year)
                .bind(&snapshot.twelfth().percentage)
                .bind(&application.resume_url)
                .bind(&application.cover_letter)
                .bind(application.status.as_str())
                .bind(application.match_score)
                .bind(application.created_at)
                .bind(application.updated_at)
                .fetch_one(&mut **tx)
                .await?;
            Ok(WriteOutcome::Application(application_from_row(&row)?))
        }
        StoreWrite::UpdateApplicationStatus {
            id,
            status,
            allowed_from,
            at,
        } => {
            let sql = format!(
                r#"
                UPDATE applications
                SET status = $1, updated_at = $2
                WHERE id = $3
                  AND (cardinality($4::text[]) = 0
                       OR {} = ANY($4))
                RETURNING {}
                "#,
                APPLICATION_STATUS_SQL, APPLICATION_COLUMNS
            );
            let row = sqlx::query(&sql)
                .bind(status.as_str())
                .bind(at)
                .bind(id)
                .bind(status_strings(&allowed_from))
                .fetch_optional(&mut **tx)
                .await?;
            match row {
                Some(row) => Ok(WriteOutcome::Application(application_from_row(&row)?)),
                None => {
                    let current: Option<String> =
                        sqlx::query_scalar("SELECT status FROM applications WHERE id = $1")
                            .bind(id)
                            .fetch_optional(&mut **tx)
                            .await?;
                    match current {
                        Some(current) => Err(StoreError::Conflict(format!(
                            "application {} is {}",
                            id, current
                        ))),
                        None => Err(StoreError::NotFound(format!("application {}", id))),
                    }
                }
            }
        }
        StoreWrite::InsertInterview(interview) => {
            let sql = format!(
                r#"
                INSERT INTO interviews AS i (
                    id, application_id, candidate_id, scheduled_for, duration_minutes, status,
                    meeting_url, calendar_event_id, notes, scheduled_by, created_at, updated_at
                ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
                RETURNING {}
                "#,
                INTERVIEW_COLUMNS
            );
            let row = sqlx::query(&sql)
                .bind(interview.id)
                .bind(interview.application_id)
                .bind(interview.candidate_id)
                .bind(interview.scheduled_for)
                .bind(interview.duration_minutes)
                .bind(interview.status.as_str())
                .bind(&interview.meeting_url)
                .bind(&interview.calendar_event_id)
                .bind(&interview.notes)
                .bind(&interview.scheduled_by)
                .bind(interview.created_at)
                .bind(interview.updated_at)
                .fetch_one(&mut **tx)
                .await?;
            Ok(WriteOutcome::Interview(interview_from_row(&row)?))
        }
        StoreWrite::UpdateInterview {
            id,
            status,
            notes,
            at,
        } => {
            let sql = format!(
                r#"
                UPDATE interviews i
                SET status = COALESCE($1, i.status),
                    notes = COALESCE($2, i.notes),
                    updated_at = $3
                WHERE i.id = $4
                RETURNING {}
                "#,
                INTERVIEW_COLUMNS
            );
            let row = sqlx::query(&sql)
                .bind(status.map(|s| s.as_str()))
                .bind(notes)
                .bind(at)
                .bind(id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or_else(|| StoreError::NotFound(format!("interview {}", id)))?;
            Ok(WriteOutcome::Interview(interview_from_row(&row)?))
        }
    }
}

#[async_trait]
impl RecruitmentStore for PgStore {
    async fn candidates_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Candidate>, StoreError> {
        let sql = format!(
            "SELECT {} FROM candidates WHERE id = ANY($1)",
            CANDIDATE_COLUMNS
        );
        let rows = sqlx::query(&sql).bind(ids).fetch_all(&self.pool).await?;
        collect(rows, candidate_from_row)
    }

    async fn candidate_by_email(&self, email: &str) -> Result<Option<Candidate>, StoreError> {
        let sql = format!("SELECT {} FROM candidates WHERE email = $1", CANDIDATE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(candidate_from_row).transpose()?)
    }

    async fn list_candidates(&self) -> Result<Vec<Candidate>, StoreError> {
        let sql = format!(
            "SELECT {} FROM candidates ORDER BY created_at DESC, id",
            CANDIDATE_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        collect(rows, candidate_from_row)
    }

    async fn positions_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Position>, StoreError> {
        let sql = format!(
            "SELECT {} FROM positions WHERE id = ANY($1)",
            POSITION_COLUMNS
        );
        let rows = sqlx::query(&sql).bind(ids).fetch_all(&self.pool).await?;
        collect(rows, position_from_row)
    }

    async fn list_positions(
        &self,
        status: Option<PositionStatus>,
    ) -> Result<Vec<Position>, StoreError> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM positions", POSITION_COLUMNS));
        if let Some(status) = status {
            query
                .push(format!(" WHERE {} = ", POSITION_STATUS_SQL))
                .push_bind(status.as_str());
        }
        query.push(" ORDER BY created_at, id");
        let rows = query.build().fetch_all(&self.pool).await?;
        collect(rows, position_from_row)
    }

    async fn applications_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Application>, StoreError> {
        let sql = format!(
            "SELECT {} FROM applications WHERE id = ANY($1) ORDER BY created_at, id",
            APPLICATION_COLUMNS
        );
        let rows = sqlx::query(&sql).bind(ids).fetch_all(&self.pool).await?;
        collect(rows, application_from_row)
    }

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, StoreError> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM applications WHERE TRUE",
            APPLICATION_COLUMNS
        ));
        if let Some(ref ids) = filter.candidate_ids {
            query.push(" AND candidate_id = ANY(").push_bind(ids.clone()).push(")");
        }
        if let Some(position_id) = filter.position_id {
            query.push(" AND position_id = ").push_bind(position_id);
        }
        if let Some(ref statuses) = filter.statuses {
            query
                .push(format!(" AND {} = ANY(", APPLICATION_STATUS_SQL))
                .push_bind(status_strings(statuses))
                .push(")");
        }
        query.push(" ORDER BY created_at, id");
        let rows = query.build().fetch_all(&self.pool).await?;
        collect(rows, application_from_row)
    }

    async fn interviews_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Interview>, StoreError> {
        let sql = format!(
            "SELECT {} FROM interviews i WHERE i.id = ANY($1)",
            INTERVIEW_COLUMNS
        );
        let rows = sqlx::query(&sql).bind(ids).fetch_all(&self.pool).await?;
        collect(rows, interview_from_row)
    }

    async fn list_interviews(
        &self,
        filter: &InterviewFilter,
    ) -> Result<Vec<Interview>, StoreError> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM interviews i JOIN applications a ON a.id = i.application_id WHERE TRUE",
            INTERVIEW_COLUMNS
        ));
        if let Some(status) = filter.status {
            query
                .push(format!(" AND {} = ", INTERVIEW_STATUS_SQL))
                .push_bind(fold_interview_status(status.as_str()));
        }
        if let Some(candidate_id) = filter.candidate_id {
            query.push(" AND i.candidate_id = ").push_bind(candidate_id);
        }
        if let Some(ref ids) = filter.application_ids {
            query
                .push(" AND i.application_id = ANY(")
                .push_bind(ids.clone())
                .push(")");
        }
        if let Some(position_id) = filter.position_id {
            query.push(" AND a.position_id = ").push_bind(position_id);
        }
        if let Some(from) = filter.scheduled_from {
            query.push(" AND i.scheduled_for >= ").push_bind(from);
        }
        if let Some(before) = filter.scheduled_before {
            query.push(" AND i.scheduled_for < ").push_bind(before);
        }
        query.push(" ORDER BY i.scheduled_for, i.id");
        let rows = query.build().fetch_all(&self.pool).await?;
        collect(rows, interview_from_row)
    }

    async fn apply_batch(&self, writes: Vec<StoreWrite>) -> Result<Vec<WriteOutcome>, StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;

        let mut outcomes = Vec::with_capacity(writes.len());
        for write in writes {
            // Dropping `tx` on error rolls the whole batch back.
            outcomes.push(apply_write(&mut tx, write).await?);
        }

        tx.commit().await?;
        Ok(outcomes)
    }
}
