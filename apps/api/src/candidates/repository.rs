use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use thiserror::Error;
use tracing::debug;

use crate::candidates::models::{CandidatePatch, NewCandidate, NewEducation, NewWorkExperience};
use crate::models::candidate::{
    Candidate, CandidateAggregate, CandidateRow, Education, ResumeRef, WorkExperience,
};

/// SQLSTATE for `unique_violation`.
const PG_UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("email {0} is already registered")]
    DuplicateEmail(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// One page of candidates plus the size of the whole collection.
#[derive(Debug, Clone)]
pub struct CandidatePage {
    pub candidates: Vec<CandidateAggregate>,
    pub total: i64,
}

/// Persistence for the candidate aggregate.
///
/// Implementations must enforce email uniqueness themselves (reporting
/// [`RepositoryError::DuplicateEmail`]) and apply each mutating call
/// atomically. Operations addressed by id return `Ok(None)` when the
/// candidate does not exist.
#[async_trait]
pub trait CandidateRepository: Send + Sync {
    async fn insert(&self, candidate: NewCandidate) -> Result<CandidateAggregate, RepositoryError>;

    /// Newest first.
    async fn page(&self, offset: i64, limit: i64) -> Result<CandidatePage, RepositoryError>;

    async fn find(&self, id: i32) -> Result<Option<CandidateAggregate>, RepositoryError>;

    async fn update(
        &self,
        id: i32,
        patch: CandidatePatch,
    ) -> Result<Option<CandidateAggregate>, RepositoryError>;

    /// Deletes the candidate and its children, returning the state it had
    /// just before deletion.
    async fn delete(&self, id: i32) -> Result<Option<CandidateAggregate>, RepositoryError>;

    async fn set_resume(
        &self,
        id: i32,
        resume: ResumeRef,
    ) -> Result<Option<CandidateAggregate>, RepositoryError>;
}

// ────────────────────────────────────────────────────────────────────────────
// PostgreSQL implementation
// ────────────────────────────────────────────────────────────────────────────

pub struct PgCandidateRepository {
    pool: PgPool,
}

impl PgCandidateRepository {
    pub fn new(pool: PgPool) -> Self {
        PgCandidateRepository { pool }
    }
}

/// Maps a unique-index violation on `email` to `DuplicateEmail`.
fn classify(err: sqlx::Error, email: &str) -> RepositoryError {
    let is_unique_violation = err
        .as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == PG_UNIQUE_VIOLATION);
    if is_unique_violation {
        RepositoryError::DuplicateEmail(email.to_string())
    } else {
        RepositoryError::Database(err)
    }
}

async fn insert_education(
    conn: &mut PgConnection,
    candidate_id: i32,
    entries: &[NewEducation],
) -> Result<Vec<Education>, sqlx::Error> {
    let mut rows = Vec::with_capacity(entries.len());
    for entry in entries {
        let row = sqlx::query_as::<_, Education>(
            r#"
            INSERT INTO education
                (candidate_id, institution, degree, field_of_study, start_date, end_date, is_current)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(candidate_id)
        .bind(&entry.institution)
        .bind(&entry.degree)
        .bind(&entry.field_of_study)
        .bind(entry.start_date)
        .bind(entry.end_date)
        .bind(entry.is_current)
        .fetch_one(&mut *conn)
        .await?;
        rows.push(row);
    }
    Ok(rows)
}

async fn insert_work_experience(
    conn: &mut PgConnection,
    candidate_id: i32,
    entries: &[NewWorkExperience],
) -> Result<Vec<WorkExperience>, sqlx::Error> {
    let mut rows = Vec::with_capacity(entries.len());
    for entry in entries {
        let row = sqlx::query_as::<_, WorkExperience>(
            r#"
            INSERT INTO work_experience
                (candidate_id, company, position, description, start_date, end_date, is_current)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(candidate_id)
        .bind(&entry.company)
        .bind(&entry.position)
        .bind(&entry.description)
        .bind(entry.start_date)
        .bind(entry.end_date)
        .bind(entry.is_current)
        .fetch_one(&mut *conn)
        .await?;
        rows.push(row);
    }
    Ok(rows)
}

async fn load_education(
    conn: &mut PgConnection,
    candidate_id: i32,
) -> Result<Vec<Education>, sqlx::Error> {
    sqlx::query_as::<_, Education>("SELECT * FROM education WHERE candidate_id = $1 ORDER BY id")
        .bind(candidate_id)
        .fetch_all(conn)
        .await
}

async fn load_work_experience(
    conn: &mut PgConnection,
    candidate_id: i32,
) -> Result<Vec<WorkExperience>, sqlx::Error> {
    sqlx::query_as::<_, WorkExperience>(
        "SELECT * FROM work_experience WHERE candidate_id = $1 ORDER BY id",
    )
    .bind(candidate_id)
    .fetch_all(conn)
    .await
}

async fn load_aggregate(
    conn: &mut PgConnection,
    row: CandidateRow,
) -> Result<CandidateAggregate, sqlx::Error> {
    let education = load_education(&mut *conn, row.id).await?;
    let work_experience = load_work_experience(&mut *conn, row.id).await?;
    Ok(CandidateAggregate {
        candidate: Candidate::from(row),
        education,
        work_experience,
    })
}

async fn lock_candidate(
    conn: &mut PgConnection,
    id: i32,
) -> Result<Option<CandidateRow>, sqlx::Error> {
    sqlx::query_as::<_, CandidateRow>("SELECT * FROM candidates WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await
}

#[async_trait]
impl CandidateRepository for PgCandidateRepository {
    async fn insert(&self, candidate: NewCandidate) -> Result<CandidateAggregate, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, CandidateRow>(
            r#"
            INSERT INTO candidates (first_name, last_name, email, phone, address)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&candidate.first_name)
        .bind(&candidate.last_name)
        .bind(&candidate.email)
        .bind(&candidate.phone)
        .bind(&candidate.address)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify(e, &candidate.email))?;

        let education = insert_education(&mut tx, row.id, &candidate.education).await?;
        let work_experience =
            insert_work_experience(&mut tx, row.id, &candidate.work_experience).await?;

        tx.commit().await?;

        Ok(CandidateAggregate {
            candidate: Candidate::from(row),
            education,
            work_experience,
        })
    }

    async fn page(&self, offset: i64, limit: i64) -> Result<CandidatePage, RepositoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM candidates")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, CandidateRow>(
            "SELECT * FROM candidates ORDER BY created_at DESC, id DESC OFFSET $1 LIMIT $2",
        )
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<i32> = rows.iter().map(|row| row.id).collect();

        let mut education: HashMap<i32, Vec<Education>> = HashMap::new();
        let education_rows = sqlx::query_as::<_, Education>(
            "SELECT * FROM education WHERE candidate_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;
        for row in education_rows {
            education.entry(row.candidate_id).or_default().push(row);
        }

        let mut work: HashMap<i32, Vec<WorkExperience>> = HashMap::new();
        let work_rows = sqlx::query_as::<_, WorkExperience>(
            "SELECT * FROM work_experience WHERE candidate_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;
        for row in work_rows {
            work.entry(row.candidate_id).or_default().push(row);
        }

        let candidates = rows
            .into_iter()
            .map(|row| {
                let id = row.id;
                CandidateAggregate {
                    candidate: Candidate::from(row),
                    education: education.remove(&id).unwrap_or_default(),
                    work_experience: work.remove(&id).unwrap_or_default(),
                }
            })
            .collect();

        Ok(CandidatePage { candidates, total })
    }

    async fn find(&self, id: i32) -> Result<Option<CandidateAggregate>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let row = sqlx::query_as::<_, CandidateRow>("SELECT * FROM candidates WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        match row {
            Some(row) => Ok(Some(load_aggregate(&mut conn, row).await?)),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        id: i32,
        patch: CandidatePatch,
    ) -> Result<Option<CandidateAggregate>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let Some(existing) = lock_candidate(&mut tx, id).await? else {
            return Ok(None);
        };

        let CandidatePatch {
            first_name,
            last_name,
            email,
            phone,
            address,
            education,
            work_experience,
        } = patch;
        let email = email.unwrap_or(existing.email);

        let row = sqlx::query_as::<_, CandidateRow>(
            r#"
            UPDATE candidates
            SET first_name = $2, last_name = $3, email = $4, phone = $5, address = $6,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(first_name.unwrap_or(existing.first_name))
        .bind(last_name.unwrap_or(existing.last_name))
        .bind(&email)
        .bind(phone.unwrap_or(existing.phone))
        .bind(address.unwrap_or(existing.address))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify(e, &email))?;

        let education = match education {
            Some(entries) => {
                sqlx::query("DELETE FROM education WHERE candidate_id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                insert_education(&mut tx, id, &entries).await?
            }
            None => load_education(&mut tx, id).await?,
        };

        let work_experience = match work_experience {
            Some(entries) => {
                sqlx::query("DELETE FROM work_experience WHERE candidate_id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                insert_work_experience(&mut tx, id, &entries).await?
            }
            None => load_work_experience(&mut tx, id).await?,
        };

        tx.commit().await?;
        debug!("Committed update for candidate {id}");

        Ok(Some(CandidateAggregate {
            candidate: Candidate::from(row),
            education,
            work_experience,
        }))
    }

    async fn delete(&self, id: i32) -> Result<Option<CandidateAggregate>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let Some(row) = lock_candidate(&mut tx, id).await? else {
            return Ok(None);
        };
        let snapshot = load_aggregate(&mut tx, row).await?;

        // education and work_experience rows go with it via ON DELETE CASCADE
        sqlx::query("DELETE FROM candidates WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(snapshot))
    }

    async fn set_resume(
        &self,
        id: i32,
        resume: ResumeRef,
    ) -> Result<Option<CandidateAggregate>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let row = sqlx::query_as::<_, CandidateRow>(
            r#"
            UPDATE candidates
            SET cv_file_name = $2, cv_file_path = $3, cv_mime_type = $4, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&resume.file_name)
        .bind(&resume.file_path)
        .bind(&resume.mime_type)
        .fetch_optional(&mut *conn)
        .await?;
        match row {
            Some(row) => Ok(Some(load_aggregate(&mut conn, row).await?)),
            None => Ok(None),
        }
    }
}
