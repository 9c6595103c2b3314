//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::{ErrorBody, HttpError};
use crate::web::{auth, extract::AppJson, state::AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_aid_core::{
    domain::{Mode, Question, WeakSpot},
    ingest::ingest_text,
    questions::{generate_question_pack, load_pack},
    quiz::QuizSession,
    results::{load_results, QuestionResult},
    summary::{explain_summary_simply, get_or_create_summary},
};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        ingest_handler,
        summarize_handler,
        eli5_handler,
        generate_questions_handler,
        get_pack_handler,
        start_quiz_handler,
        results_handler,
        profile_handler,
    ),
    components(
        schemas(
            auth::CredentialsRequest, auth::AuthResponse, ErrorBody,
            IngestRequest, IngestResponse, SummarizeRequest, SummarizeResponse,
            Eli5Request, Eli5Response, GenerateQuestionsRequest, GenerateQuestionsResponse,
            PackResponse, QuestionDto, StartQuizResponse, ResultsResponse,
            QuestionResultDto, WeakSpotDto, ProfileResponse
        )
    ),
    tags(
        (name = "Study Aid API", description = "Ingest study text, summarize it, generate questions and take timed quizzes.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct IngestRequest {
    pub content: String,
    /// `topper` or `pass`.
    pub mode: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub ingest_id: Uuid,
    pub domain: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeRequest {
    pub ingest_id: Uuid,
    pub mode: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeResponse {
    pub summary_id: Uuid,
    pub summary: String,
    pub highlights: Vec<String>,
    pub mode: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Eli5Request {
    pub summary_id: Uuid,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Eli5Response {
    pub eli5_text: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQuestionsRequest {
    pub ingest_id: Uuid,
    pub mode: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQuestionsResponse {
    pub pack_id: Uuid,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDto {
    pub id: Uuid,
    pub position: usize,
    pub question_type: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub answer: String,
    pub rationale: String,
    pub supporting_span: String,
    pub supporting_span_verified: bool,
    pub difficulty: String,
}

impl From<&Question> for QuestionDto {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            position: q.position,
            question_type: q.kind.question_type().as_str().to_string(),
            prompt: q.prompt.clone(),
            options: q.kind.options().map(|o| o.to_vec()),
            answer: q.answer.clone(),
            rationale: q.rationale.clone(),
            supporting_span: q.supporting_span.clone(),
            supporting_span_verified: q.supporting_span_verified,
            difficulty: q.difficulty.as_str().to_string(),
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackResponse {
    pub pack_id: Uuid,
    pub ingest_id: Uuid,
    pub mode: String,
    pub questions: Vec<QuestionDto>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartQuizResponse {
    pub quiz_id: Uuid,
    pub question_count: usize,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResultDto {
    pub position: usize,
    pub question_id: Uuid,
    pub question_type: String,
    pub prompt: String,
    pub correct_answer: String,
    pub user_answer: String,
    pub is_correct: bool,
    pub time_taken_secs: u32,
}

impl From<QuestionResult> for QuestionResultDto {
    fn from(r: QuestionResult) -> Self {
        Self {
            position: r.position,
            question_id: r.question_id,
            question_type: r.question_type.as_str().to_string(),
            prompt: r.prompt,
            correct_answer: r.correct_answer,
            user_answer: r.user_answer,
            is_correct: r.is_correct,
            time_taken_secs: r.time_taken_secs,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeakSpotDto {
    pub question_id: Uuid,
    pub question_type: String,
    pub supporting_span: String,
}

impl From<WeakSpot> for WeakSpotDto {
    fn from(w: WeakSpot) -> Self {
        Self {
            question_id: w.question_id,
            question_type: w.question_type.as_str().to_string(),
            supporting_span: w.supporting_span,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResultsResponse {
    pub quiz_id: Uuid,
    pub total_score: u8,
    pub correct_count: usize,
    pub question_count: usize,
    pub average_time_secs: u32,
    pub breakdown: Vec<QuestionResultDto>,
    pub weak_spots: Vec<WeakSpotDto>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub user_id: Uuid,
    pub email: String,
    pub total_quizzes_taken: u32,
    pub average_score: Option<u8>,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Store a block of study text and detect its academic domain.
#[utoipa::path(
    post,
    path = "/ingest",
    request_body = IngestRequest,
    responses(
        (status = 201, description = "Text stored", body = IngestResponse),
        (status = 400, description = "Empty content or unknown mode", body = ErrorBody),
        (status = 401, description = "Not signed in"),
        (status = 502, description = "Domain classification failed", body = ErrorBody)
    )
)]
pub async fn ingest_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    AppJson(req): AppJson<IngestRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let mode: Mode = req.mode.parse()?;
    let ingest = ingest_text(
        app_state.db.as_ref(),
        app_state.classifier.as_ref(),
        user_id,
        &req.content,
        mode,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            ingest_id: ingest.id,
            domain: ingest.domain,
        }),
    ))
}

/// Return the summary of an ingest for a mode, generating it on first request.
#[utoipa::path(
    post,
    path = "/summarize",
    request_body = SummarizeRequest,
    responses(
        (status = 200, description = "Summary for the ingest and mode", body = SummarizeResponse),
        (status = 400, description = "Unknown mode", body = ErrorBody),
        (status = 403, description = "Ingest belongs to another user", body = ErrorBody),
        (status = 404, description = "Ingest not found", body = ErrorBody),
        (status = 502, description = "Summary generation failed", body = ErrorBody)
    )
)]
pub async fn summarize_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    AppJson(req): AppJson<SummarizeRequest>,
) -> Result<Json<SummarizeResponse>, HttpError> {
    let mode: Mode = req.mode.parse()?;
    let summary = get_or_create_summary(
        app_state.db.as_ref(),
        app_state.summarizer.as_ref(),
        user_id,
        req.ingest_id,
        mode,
    )
    .await?;

    Ok(Json(SummarizeResponse {
        summary_id: summary.id,
        summary: summary.summary_text,
        highlights: summary.highlights,
        mode: summary.mode.to_string(),
    }))
}

/// Restate a stored summary in simple terms. Not stored.
#[utoipa::path(
    post,
    path = "/eli5",
    request_body = Eli5Request,
    responses(
        (status = 200, description = "Simplified explanation", body = Eli5Response),
        (status = 403, description = "Summary belongs to another user", body = ErrorBody),
        (status = 404, description = "Summary not found", body = ErrorBody),
        (status = 502, description = "Generation failed", body = ErrorBody)
    )
)]
pub async fn eli5_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    AppJson(req): AppJson<Eli5Request>,
) -> Result<Json<Eli5Response>, HttpError> {
    let eli5_text = explain_summary_simply(
        app_state.db.as_ref(),
        app_state.summarizer.as_ref(),
        user_id,
        req.summary_id,
    )
    .await?;
    Ok(Json(Eli5Response { eli5_text }))
}

/// Generate and store a pack of five questions for an ingest.
#[utoipa::path(
    post,
    path = "/generate-questions",
    request_body = GenerateQuestionsRequest,
    responses(
        (status = 201, description = "Pack stored", body = GenerateQuestionsResponse),
        (status = 400, description = "Unknown mode", body = ErrorBody),
        (status = 403, description = "Ingest belongs to another user", body = ErrorBody),
        (status = 404, description = "Ingest not found", body = ErrorBody),
        (status = 502, description = "Generation failed or returned an invalid set", body = ErrorBody)
    )
)]
pub async fn generate_questions_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    AppJson(req): AppJson<GenerateQuestionsRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let mode: Mode = req.mode.parse()?;
    let pack = generate_question_pack(
        app_state.db.as_ref(),
        app_state.question_generator.as_ref(),
        user_id,
        req.ingest_id,
        mode,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(GenerateQuestionsResponse { pack_id: pack.id }),
    ))
}

/// Review a pack's questions in order, with answers and rationales.
#[utoipa::path(
    get,
    path = "/packs/{pack_id}",
    params(("pack_id" = Uuid, Path, description = "The question pack to review.")),
    responses(
        (status = 200, description = "Pack with ordered questions", body = PackResponse),
        (status = 403, description = "Pack belongs to another user", body = ErrorBody),
        (status = 404, description = "Pack not found", body = ErrorBody)
    )
)]
pub async fn get_pack_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(pack_id): Path<Uuid>,
) -> Result<Json<PackResponse>, HttpError> {
    let (pack, questions) = load_pack(app_state.db.as_ref(), user_id, pack_id).await?;
    Ok(Json(PackResponse {
        pack_id: pack.id,
        ingest_id: pack.ingest_id,
        mode: pack.mode.to_string(),
        questions: questions.iter().map(QuestionDto::from).collect(),
    }))
}

/// Start a quiz over a pack. The quiz is then driven over `/quizzes/ws`.
#[utoipa::path(
    post,
    path = "/packs/{pack_id}/quizzes",
    params(("pack_id" = Uuid, Path, description = "The question pack to be quizzed on.")),
    responses(
        (status = 201, description = "Quiz started", body = StartQuizResponse),
        (status = 403, description = "Pack belongs to another user", body = ErrorBody),
        (status = 404, description = "Pack not found", body = ErrorBody),
        (status = 422, description = "Pack has no questions", body = ErrorBody)
    )
)]
pub async fn start_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(pack_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let session = QuizSession::start(app_state.db.as_ref(), user_id, pack_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(StartQuizResponse {
            quiz_id: session.quiz_id(),
            question_count: session.question_count(),
        }),
    ))
}

/// Score, per-question breakdown and weak spots of a completed quiz.
#[utoipa::path(
    get,
    path = "/quizzes/{quiz_id}/results",
    params(("quiz_id" = Uuid, Path, description = "A completed quiz.")),
    responses(
        (status = 200, description = "Quiz results", body = ResultsResponse),
        (status = 403, description = "Quiz belongs to another user", body = ErrorBody),
        (status = 404, description = "Quiz not found", body = ErrorBody),
        (status = 422, description = "Quiz is still in progress", body = ErrorBody)
    )
)]
pub async fn results_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(quiz_id): Path<Uuid>,
) -> Result<Json<ResultsResponse>, HttpError> {
    let results = load_results(app_state.db.as_ref(), user_id, quiz_id).await?;
    Ok(Json(ResultsResponse {
        quiz_id: results.quiz_id,
        total_score: results.total_score,
        correct_count: results.correct_count,
        question_count: results.question_count,
        average_time_secs: results.average_time_secs,
        breakdown: results.breakdown.into_iter().map(Into::into).collect(),
        weak_spots: results.weak_spots.missed.into_iter().map(Into::into).collect(),
    }))
}

/// Quiz statistics of the signed-in user.
#[utoipa::path(
    get,
    path = "/profile",
    responses(
        (status = 200, description = "Profile statistics", body = ProfileResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn profile_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<ProfileResponse>, HttpError> {
    let profile = app_state.db.get_profile(user_id).await?;
    Ok(Json(ProfileResponse {
        user_id: profile.user_id,
        email: profile.email,
        total_quizzes_taken: profile.total_quizzes_taken,
        average_score: profile.average_score,
    }))
}
