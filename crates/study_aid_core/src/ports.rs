//! crates/study_aid_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use crate::domain::{
    GeneratedQuestion, GeneratedSummary, Ingest, Mode, NewQuestion, NewQuizResponse, Profile,
    Question, QuestionPack, Quiz, QuizCompletion, QuizResponse, Summary, User, UserCredentials,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A write collided with a uniqueness or state constraint.
    #[error("Conflict: {0}")]
    Conflict(String),
    /// The external generation API could not be reached or refused the request.
    #[error("Upstream service error: {0}")]
    Upstream(String),
    /// The external generation API answered with something that cannot be parsed.
    #[error("Malformed upstream payload: {0}")]
    Malformed(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Users, Auth and Profiles ---
    async fn create_user_with_email(&self, email: &str, hashed_password: &str)
        -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    async fn get_profile(&self, user_id: Uuid) -> PortResult<Profile>;

    // --- Ingests ---
    async fn create_ingest(
        &self,
        user_id: Uuid,
        content: &str,
        domain: &str,
        source_type: &str,
    ) -> PortResult<Ingest>;

    async fn get_ingest(&self, ingest_id: Uuid) -> PortResult<Ingest>;

    // --- Summaries ---
    /// Looks up the summary of an ingest for exactly this mode.
    async fn get_summary(&self, ingest_id: Uuid, mode: Mode) -> PortResult<Option<Summary>>;

    async fn get_summary_by_id(&self, summary_id: Uuid) -> PortResult<Summary>;

    /// Inserts a summary. If one already exists for (ingest, mode) the existing row wins.
    async fn save_summary(
        &self,
        user_id: Uuid,
        ingest_id: Uuid,
        mode: Mode,
        summary_text: &str,
        highlights: &[String],
    ) -> PortResult<Summary>;

    // --- Question Packs ---
    /// Inserts a pack and all of its questions as one unit.
    async fn create_question_pack(
        &self,
        user_id: Uuid,
        ingest_id: Uuid,
        mode: Mode,
        questions: Vec<NewQuestion>,
    ) -> PortResult<QuestionPack>;

    async fn get_question_pack(&self, pack_id: Uuid) -> PortResult<QuestionPack>;

    /// Returns a pack's questions in creation order.
    async fn get_questions_for_pack(&self, pack_id: Uuid) -> PortResult<Vec<Question>>;

    // --- Quizzes ---
    async fn create_quiz(&self, user_id: Uuid, pack_id: Uuid) -> PortResult<Quiz>;

    async fn get_quiz(&self, quiz_id: Uuid) -> PortResult<Quiz>;

    /// Records one response. Fails with `PortError::Conflict` if the question was
    /// already answered in this quiz.
    async fn save_quiz_response(&self, response: NewQuizResponse) -> PortResult<QuizResponse>;

    async fn get_responses_for_quiz(&self, quiz_id: Uuid) -> PortResult<Vec<QuizResponse>>;

    /// Marks the quiz finished and folds the score into the owner's profile.
    /// Fails with `PortError::Conflict` if the quiz was already finished.
    async fn finish_quiz(&self, completion: QuizCompletion) -> PortResult<Quiz>;
}

#[async_trait]
pub trait DomainClassificationService: Send + Sync {
    /// Returns a short academic domain label for a text excerpt.
    async fn classify_domain(&self, excerpt: &str) -> PortResult<String>;
}

#[async_trait]
pub trait SummaryGenerationService: Send + Sync {
    /// Summarizes a text at the depth the mode calls for.
    async fn summarize(&self, text: &str, mode: Mode) -> PortResult<GeneratedSummary>;

    /// Restates an existing summary in simple terms.
    async fn explain_simply(&self, summary_text: &str) -> PortResult<String>;
}

#[async_trait]
pub trait QuestionGenerationService: Send + Sync {
    /// Requests a set of quiz questions for a text.
    async fn generate_questions(&self, text: &str, mode: Mode) -> PortResult<Vec<GeneratedQuestion>>;
}
