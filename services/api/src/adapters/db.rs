//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, PgPool};
use study_aid_core::domain::{
    Ingest, Mode, NewQuestion, NewQuizResponse, Profile, Question, QuestionKind, QuestionPack,
    QuestionType, Quiz, QuizCompletion, QuizResponse, Summary, User, UserCredentials, WeakSpot,
    WeakSpots,
};
use study_aid_core::ports::{DatabaseService, PortError, PortResult};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(what: &str, id: impl std::fmt::Display) -> impl FnOnce(sqlx::Error) -> PortError {
    let label = format!("{} {} not found", what, id);
    move |e| match e {
        sqlx::Error::RowNotFound => PortError::NotFound(label),
        _ => unexpected(e),
    }
}

/// Maps unique-constraint violations to `Conflict`.
fn write_error(e: sqlx::Error) -> PortError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            PortError::Conflict(db_err.message().to_string())
        }
        _ => unexpected(e),
    }
}

fn parse_column<T: std::str::FromStr>(column: &str, raw: &str) -> PortResult<T> {
    raw.parse::<T>()
        .map_err(|_| PortError::Unexpected(format!("invalid {} value '{}' in database", column, raw)))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct ProfileRecord {
    user_id: Uuid,
    email: String,
    total_quizzes_taken: i32,
    total_score_sum: i64,
    average_score: Option<i16>,
}
impl ProfileRecord {
    fn to_domain(self) -> Profile {
        Profile {
            user_id: self.user_id,
            email: self.email,
            total_quizzes_taken: self.total_quizzes_taken.max(0) as u32,
            total_score_sum: self.total_score_sum.max(0) as u64,
            average_score: self.average_score.map(|s| s.clamp(0, 100) as u8),
        }
    }
}

#[derive(FromRow)]
struct IngestRecord {
    id: Uuid,
    user_id: Uuid,
    content: String,
    domain: String,
    source_type: String,
    created_at: DateTime<Utc>,
}
impl IngestRecord {
    fn to_domain(self) -> Ingest {
        Ingest {
            id: self.id,
            user_id: self.user_id,
            content: self.content,
            domain: self.domain,
            source_type: self.source_type,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct SummaryRecord {
    id: Uuid,
    ingest_id: Uuid,
    user_id: Uuid,
    mode: String,
    summary_text: String,
    highlights: Json<Vec<String>>,
    created_at: DateTime<Utc>,
}
impl SummaryRecord {
    fn to_domain(self) -> PortResult<Summary> {
        Ok(Summary {
            id: self.id,
            ingest_id: self.ingest_id,
            user_id: self.user_id,
            mode: parse_column::<Mode>("mode", &self.mode)?,
            summary_text: self.summary_text,
            highlights: self.highlights.0,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct PackRecord {
    id: Uuid,
    ingest_id: Uuid,
    user_id: Uuid,
    mode: String,
    created_at: DateTime<Utc>,
}
impl PackRecord {
    fn to_domain(self) -> PortResult<QuestionPack> {
        Ok(QuestionPack {
            id: self.id,
            ingest_id: self.ingest_id,
            user_id: self.user_id,
            mode: parse_column::<Mode>("mode", &self.mode)?,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct QuestionRecord {
    id: Uuid,
    pack_id: Uuid,
    position: i16,
    question_type: String,
    prompt: String,
    options: Option<Json<Vec<String>>>,
    answer: String,
    rationale: String,
    supporting_span: String,
    supporting_span_verified: bool,
    difficulty: String,
    created_at: DateTime<Utc>,
}
impl QuestionRecord {
    fn to_domain(self) -> PortResult<Question> {
        let question_type = parse_column::<QuestionType>("question_type", &self.question_type)?;
        let kind = match (question_type, self.options) {
            (QuestionType::Mcq, Some(Json(options))) => QuestionKind::Mcq { options },
            (QuestionType::Mcq, None) => {
                return Err(PortError::Unexpected(format!(
                    "mcq question {} has no options",
                    self.id
                )))
            }
            (QuestionType::Short, _) => QuestionKind::Short,
            (QuestionType::Analytical, _) => QuestionKind::Analytical,
        };
        Ok(Question {
            id: self.id,
            pack_id: self.pack_id,
            position: self.position.max(0) as usize,
            kind,
            prompt: self.prompt,
            answer: self.answer,
            rationale: self.rationale,
            supporting_span: self.supporting_span,
            supporting_span_verified: self.supporting_span_verified,
            difficulty: parse_column("difficulty", &self.difficulty)?,
            created_at: self.created_at,
        })
    }
}

/// The JSON shape of one entry in `quizzes.weak_spots`.
#[derive(Serialize, Deserialize)]
struct WeakSpotRecord {
    question_id: Uuid,
    question_type: String,
    supporting_span: String,
}

fn weak_spots_to_json(weak_spots: &WeakSpots) -> Json<Vec<WeakSpotRecord>> {
    Json(
        weak_spots
            .missed
            .iter()
            .map(|spot| WeakSpotRecord {
                question_id: spot.question_id,
                question_type: spot.question_type.as_str().to_string(),
                supporting_span: spot.supporting_span.clone(),
            })
            .collect(),
    )
}

#[derive(FromRow)]
struct QuizRecord {
    id: Uuid,
    pack_id: Uuid,
    user_id: Uuid,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    total_score: Option<i16>,
    weak_spots: Option<Json<Vec<WeakSpotRecord>>>,
}
impl QuizRecord {
    fn to_domain(self) -> PortResult<Quiz> {
        let weak_spots = match self.weak_spots {
            Some(Json(records)) => {
                let missed = records
                    .into_iter()
                    .map(|r| {
                        Ok(WeakSpot {
                            question_id: r.question_id,
                            question_type: parse_column("weak_spots.question_type", &r.question_type)?,
                            supporting_span: r.supporting_span,
                        })
                    })
                    .collect::<PortResult<Vec<_>>>()?;
                Some(WeakSpots { missed })
            }
            None => None,
        };
        Ok(Quiz {
            id: self.id,
            pack_id: self.pack_id,
            user_id: self.user_id,
            started_at: self.started_at,
            finished_at: self.finished_at,
            total_score: self.total_score.map(|s| s.clamp(0, 100) as u8),
            weak_spots,
        })
    }
}

#[derive(FromRow)]
struct ResponseRecord {
    id: Uuid,
    quiz_id: Uuid,
    question_id: Uuid,
    user_answer: String,
    is_correct: bool,
    time_taken: i32,
    created_at: DateTime<Utc>,
}
impl ResponseRecord {
    fn to_domain(self) -> QuizResponse {
        QuizResponse {
            id: self.id,
            quiz_id: self.quiz_id,
            question_id: self.question_id,
            user_answer: self.user_answer,
            is_correct: self.is_correct,
            time_taken_secs: self.time_taken.max(0) as u32,
            created_at: self.created_at,
        }
    }
}

const SUMMARY_COLUMNS: &str = "id, ingest_id, user_id, mode, summary_text, highlights, created_at";
const QUESTION_COLUMNS: &str = "id, pack_id, position, question_type, prompt, options, answer, \
     rationale, supporting_span, supporting_span_verified, difficulty, created_at";
const QUIZ_COLUMNS: &str =
    "id, pack_id, user_id, started_at, finished_at, total_score, weak_spots";

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "INSERT INTO users (user_id, email, hashed_password) VALUES ($1, $2, $3) \
             RETURNING user_id, email, hashed_password",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)?;

        Ok(User {
            user_id: record.user_id,
            email: record.email,
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected("User", email))?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let user_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        user_id.ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn get_profile(&self, user_id: Uuid) -> PortResult<Profile> {
        let record = sqlx::query_as::<_, ProfileRecord>(
            "SELECT user_id, email, total_quizzes_taken, total_score_sum, average_score FROM users \
             WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected("Profile", user_id))?;
        Ok(record.to_domain())
    }

    async fn create_ingest(
        &self,
        user_id: Uuid,
        content: &str,
        domain: &str,
        source_type: &str,
    ) -> PortResult<Ingest> {
        let record = sqlx::query_as::<_, IngestRecord>(
            "INSERT INTO ingests (id, user_id, content, domain, source_type) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, user_id, content, domain, source_type, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(content)
        .bind(domain)
        .bind(source_type)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_ingest(&self, ingest_id: Uuid) -> PortResult<Ingest> {
        let record = sqlx::query_as::<_, IngestRecord>(
            "SELECT id, user_id, content, domain, source_type, created_at FROM ingests WHERE id = $1",
        )
        .bind(ingest_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected("Ingest", ingest_id))?;
        Ok(record.to_domain())
    }

    async fn get_summary(&self, ingest_id: Uuid, mode: Mode) -> PortResult<Option<Summary>> {
        let record = sqlx::query_as::<_, SummaryRecord>(&format!(
            "SELECT {} FROM summaries WHERE ingest_id = $1 AND mode = $2",
            SUMMARY_COLUMNS
        ))
        .bind(ingest_id)
        .bind(mode.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        record.map(SummaryRecord::to_domain).transpose()
    }

    async fn get_summary_by_id(&self, summary_id: Uuid) -> PortResult<Summary> {
        sqlx::query_as::<_, SummaryRecord>(&format!(
            "SELECT {} FROM summaries WHERE id = $1",
            SUMMARY_COLUMNS
        ))
        .bind(summary_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected("Summary", summary_id))?
        .to_domain()
    }

    async fn save_summary(
        &self,
        user_id: Uuid,
        ingest_id: Uuid,
        mode: Mode,
        summary_text: &str,
        highlights: &[String],
    ) -> PortResult<Summary> {
        let inserted = sqlx::query_as::<_, SummaryRecord>(&format!(
            "INSERT INTO summaries (id, ingest_id, user_id, mode, summary_text, highlights) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (ingest_id, mode) DO NOTHING \
             RETURNING {}",
            SUMMARY_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(ingest_id)
        .bind(user_id)
        .bind(mode.as_str())
        .bind(summary_text)
        .bind(Json(highlights))
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        match inserted {
            Some(record) => record.to_domain(),
            // A concurrent request stored this (ingest, mode) first.
            None => self.get_summary(ingest_id, mode).await?.ok_or_else(|| {
                PortError::Unexpected(format!("summary for ingest {} vanished", ingest_id))
            }),
        }
    }

    async fn create_question_pack(
        &self,
        user_id: Uuid,
        ingest_id: Uuid,
        mode: Mode,
        questions: Vec<NewQuestion>,
    ) -> PortResult<QuestionPack> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let pack = sqlx::query_as::<_, PackRecord>(
            "INSERT INTO question_packs (id, ingest_id, user_id, mode) VALUES ($1, $2, $3, $4) \
             RETURNING id, ingest_id, user_id, mode, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(ingest_id)
        .bind(user_id)
        .bind(mode.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        for q in questions {
            let options = q.kind.options().map(|o| Json(o.to_vec()));
            sqlx::query(
                "INSERT INTO questions (id, pack_id, position, question_type, prompt, options, \
                 answer, rationale, supporting_span, supporting_span_verified, difficulty) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            )
            .bind(Uuid::new_v4())
            .bind(pack.id)
            .bind(q.position as i16)
            .bind(q.kind.question_type().as_str())
            .bind(&q.prompt)
            .bind(options)
            .bind(&q.answer)
            .bind(&q.rationale)
            .bind(&q.supporting_span)
            .bind(q.supporting_span_verified)
            .bind(q.difficulty.as_str())
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }

        tx.commit().await.map_err(unexpected)?;
        pack.to_domain()
    }

    async fn get_question_pack(&self, pack_id: Uuid) -> PortResult<QuestionPack> {
        sqlx::query_as::<_, PackRecord>(
            "SELECT id, ingest_id, user_id, mode, created_at FROM question_packs WHERE id = $1",
        )
        .bind(pack_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected("Question pack", pack_id))?
        .to_domain()
    }

    async fn get_questions_for_pack(&self, pack_id: Uuid) -> PortResult<Vec<Question>> {
        let records = sqlx::query_as::<_, QuestionRecord>(&format!(
            "SELECT {} FROM questions WHERE pack_id = $1 ORDER BY position ASC",
            QUESTION_COLUMNS
        ))
        .bind(pack_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(QuestionRecord::to_domain).collect()
    }

    async fn create_quiz(&self, user_id: Uuid, pack_id: Uuid) -> PortResult<Quiz> {
        sqlx::query_as::<_, QuizRecord>(&format!(
            "INSERT INTO quizzes (id, pack_id, user_id) VALUES ($1, $2, $3) RETURNING {}",
            QUIZ_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(pack_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?
        .to_domain()
    }

    async fn get_quiz(&self, quiz_id: Uuid) -> PortResult<Quiz> {
        sqlx::query_as::<_, QuizRecord>(&format!(
            "SELECT {} FROM quizzes WHERE id = $1",
            QUIZ_COLUMNS
        ))
        .bind(quiz_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected("Quiz", quiz_id))?
        .to_domain()
    }

    async fn save_quiz_response(&self, response: NewQuizResponse) -> PortResult<QuizResponse> {
        let record = sqlx::query_as::<_, ResponseRecord>(
            "INSERT INTO quiz_responses (id, quiz_id, question_id, user_answer, is_correct, time_taken) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, quiz_id, question_id, user_answer, is_correct, time_taken, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(response.quiz_id)
        .bind(response.question_id)
        .bind(&response.user_answer)
        .bind(response.is_correct)
        .bind(response.time_taken_secs as i32)
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)?;
        Ok(record.to_domain())
    }

    async fn get_responses_for_quiz(&self, quiz_id: Uuid) -> PortResult<Vec<QuizResponse>> {
        let records = sqlx::query_as::<_, ResponseRecord>(
            "SELECT r.id, r.quiz_id, r.question_id, r.user_answer, r.is_correct, r.time_taken, r.created_at \
             FROM quiz_responses r JOIN questions q ON q.id = r.question_id \
             WHERE r.quiz_id = $1 ORDER BY q.position ASC",
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn finish_quiz(&self, completion: QuizCompletion) -> PortResult<Quiz> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let finished = sqlx::query_as::<_, QuizRecord>(&format!(
            "UPDATE quizzes SET finished_at = $2, total_score = $3, weak_spots = $4 \
             WHERE id = $1 AND finished_at IS NULL RETURNING {}",
            QUIZ_COLUMNS
        ))
        .bind(completion.quiz_id)
        .bind(completion.finished_at)
        .bind(completion.total_score as i16)
        .bind(weak_spots_to_json(&completion.weak_spots))
        .fetch_optional(&mut *tx)
        .await
        .map_err(unexpected)?;

        let Some(finished) = finished else {
            tx.rollback().await.map_err(unexpected)?;
            // Distinguish an unknown quiz from one that was already finished.
            self.get_quiz(completion.quiz_id).await?;
            return Err(PortError::Conflict(format!(
                "quiz {} is already finished",
                completion.quiz_id
            )));
        };

        let profile = sqlx::query_as::<_, ProfileRecord>(
            "SELECT user_id, email, total_quizzes_taken, total_score_sum, average_score FROM users \
             WHERE user_id = $1 FOR UPDATE",
        )
        .bind(completion.user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(not_found_or_unexpected("Profile", completion.user_id))?
        .to_domain()
        .with_quiz_score(completion.total_score);

        sqlx::query(
            "UPDATE users SET total_quizzes_taken = $2, total_score_sum = $3, average_score = $4 \
             WHERE user_id = $1",
        )
        .bind(profile.user_id)
        .bind(profile.total_quizzes_taken as i32)
        .bind(profile.total_score_sum as i64)
        .bind(profile.average_score.map(|s| s as i16))
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        finished.to_domain()
    }
}
