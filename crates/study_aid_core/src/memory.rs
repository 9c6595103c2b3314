//! crates/study_aid_core/src/memory.rs
//!
//! An in-process implementation of the `DatabaseService` port. It enforces the
//! same uniqueness rules as the relational schema, so it can stand in for the
//! real store in tests and local runs.

use crate::domain::{
    Ingest, Mode, NewQuestion, NewQuizResponse, Profile, Question, QuestionPack, Quiz,
    QuizCompletion, QuizResponse, Summary, User, UserCredentials,
};
use crate::ports::{DatabaseService, PortError, PortResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserCredentials>,
    profiles: HashMap<Uuid, Profile>,
    auth_sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    ingests: HashMap<Uuid, Ingest>,
    summaries: Vec<Summary>,
    packs: HashMap<Uuid, QuestionPack>,
    questions: Vec<Question>,
    quizzes: HashMap<Uuid, Quiz>,
    responses: Vec<QuizResponse>,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    fail_response_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `save_quiz_response` fail until switched off again.
    pub fn fail_response_writes(&self, fail: bool) {
        self.fail_response_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of quiz rows currently stored.
    pub fn quiz_count(&self) -> usize {
        self.lock().map(|t| t.quizzes.len()).unwrap_or(0)
    }

    /// Number of question pack rows currently stored.
    pub fn pack_count(&self) -> usize {
        self.lock().map(|t| t.packs.len()).unwrap_or(0)
    }

    /// Number of ingest rows currently stored.
    pub fn ingest_count(&self) -> usize {
        self.lock().map(|t| t.ingests.len()).unwrap_or(0)
    }

    fn lock(&self) -> PortResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|e| PortError::Unexpected(format!("store lock poisoned: {}", e)))
    }
}

#[async_trait]
impl DatabaseService for InMemoryStore {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let mut tables = self.lock()?;
        if tables.users.values().any(|u| u.email == email) {
            return Err(PortError::Conflict(format!("email {} already registered", email)));
        }
        let user_id = Uuid::new_v4();
        tables.users.insert(
            user_id,
            UserCredentials {
                user_id,
                email: email.to_string(),
                hashed_password: hashed_password.to_string(),
            },
        );
        tables.profiles.insert(
            user_id,
            Profile {
                user_id,
                email: email.to_string(),
                total_quizzes_taken: 0,
                total_score_sum: 0,
                average_score: None,
            },
        );
        Ok(User {
            user_id,
            email: email.to_string(),
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.lock()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.lock()?
            .auth_sessions
            .insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        match self.lock()?.auth_sessions.get(session_id) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.lock()?.auth_sessions.remove(session_id);
        Ok(())
    }

    async fn get_profile(&self, user_id: Uuid) -> PortResult<Profile> {
        self.lock()?
            .profiles
            .get(&user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Profile {} not found", user_id)))
    }

    async fn create_ingest(
        &self,
        user_id: Uuid,
        content: &str,
        domain: &str,
        source_type: &str,
    ) -> PortResult<Ingest> {
        let ingest = Ingest {
            id: Uuid::new_v4(),
            user_id,
            content: content.to_string(),
            domain: domain.to_string(),
            source_type: source_type.to_string(),
            created_at: Utc::now(),
        };
        self.lock()?.ingests.insert(ingest.id, ingest.clone());
        Ok(ingest)
    }

    async fn get_ingest(&self, ingest_id: Uuid) -> PortResult<Ingest> {
        self.lock()?
            .ingests
            .get(&ingest_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Ingest {} not found", ingest_id)))
    }

    async fn get_summary(&self, ingest_id: Uuid, mode: Mode) -> PortResult<Option<Summary>> {
        Ok(self
            .lock()?
            .summaries
            .iter()
            .find(|s| s.ingest_id == ingest_id && s.mode == mode)
            .cloned())
    }

    async fn get_summary_by_id(&self, summary_id: Uuid) -> PortResult<Summary> {
        self.lock()?
            .summaries
            .iter()
            .find(|s| s.id == summary_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Summary {} not found", summary_id)))
    }

    async fn save_summary(
        &self,
        user_id: Uuid,
        ingest_id: Uuid,
        mode: Mode,
        summary_text: &str,
        highlights: &[String],
    ) -> PortResult<Summary> {
        let mut tables = self.lock()?;
        if let Some(existing) = tables
            .summaries
            .iter()
            .find(|s| s.ingest_id == ingest_id && s.mode == mode)
        {
            return Ok(existing.clone());
        }
        let summary = Summary {
            id: Uuid::new_v4(),
            ingest_id,
            user_id,
            mode,
            summary_text: summary_text.to_string(),
            highlights: highlights.to_vec(),
            created_at: Utc::now(),
        };
        tables.summaries.push(summary.clone());
        Ok(summary)
    }

    async fn create_question_pack(
        &self,
        user_id: Uuid,
        ingest_id: Uuid,
        mode: Mode,
        questions: Vec<NewQuestion>,
    ) -> PortResult<QuestionPack> {
        let mut tables = self.lock()?;
        if !tables.ingests.contains_key(&ingest_id) {
            return Err(PortError::NotFound(format!("Ingest {} not found", ingest_id)));
        }
        let now = Utc::now();
        let pack = QuestionPack {
            id: Uuid::new_v4(),
            ingest_id,
            user_id,
            mode,
            created_at: now,
        };
        tables.packs.insert(pack.id, pack.clone());
        for q in questions {
            tables.questions.push(Question {
                id: Uuid::new_v4(),
                pack_id: pack.id,
                position: q.position,
                kind: q.kind,
                prompt: q.prompt,
                answer: q.answer,
                rationale: q.rationale,
                supporting_span: q.supporting_span,
                supporting_span_verified: q.supporting_span_verified,
                difficulty: q.difficulty,
                created_at: now,
            });
        }
        Ok(pack)
    }

    async fn get_question_pack(&self, pack_id: Uuid) -> PortResult<QuestionPack> {
        self.lock()?
            .packs
            .get(&pack_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Question pack {} not found", pack_id)))
    }

    async fn get_questions_for_pack(&self, pack_id: Uuid) -> PortResult<Vec<Question>> {
        let mut questions: Vec<Question> = self
            .lock()?
            .questions
            .iter()
            .filter(|q| q.pack_id == pack_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| q.position);
        Ok(questions)
    }

    async fn create_quiz(&self, user_id: Uuid, pack_id: Uuid) -> PortResult<Quiz> {
        let mut tables = self.lock()?;
        if !tables.packs.contains_key(&pack_id) {
            return Err(PortError::NotFound(format!("Question pack {} not found", pack_id)));
        }
        let quiz = Quiz {
            id: Uuid::new_v4(),
            pack_id,
            user_id,
            started_at: Utc::now(),
            finished_at: None,
            total_score: None,
            weak_spots: None,
        };
        tables.quizzes.insert(quiz.id, quiz.clone());
        Ok(quiz)
    }

    async fn get_quiz(&self, quiz_id: Uuid) -> PortResult<Quiz> {
        self.lock()?
            .quizzes
            .get(&quiz_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Quiz {} not found", quiz_id)))
    }

    async fn save_quiz_response(&self, response: NewQuizResponse) -> PortResult<QuizResponse> {
        if self.fail_response_writes.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("response write failed".to_string()));
        }
        let mut tables = self.lock()?;
        if tables
            .responses
            .iter()
            .any(|r| r.quiz_id == response.quiz_id && r.question_id == response.question_id)
        {
            return Err(PortError::Conflict(format!(
                "question {} already answered in quiz {}",
                response.question_id, response.quiz_id
            )));
        }
        let stored = QuizResponse {
            id: Uuid::new_v4(),
            quiz_id: response.quiz_id,
            question_id: response.question_id,
            user_answer: response.user_answer,
            is_correct: response.is_correct,
            time_taken_secs: response.time_taken_secs,
            created_at: Utc::now(),
        };
        tables.responses.push(stored.clone());
        Ok(stored)
    }

    async fn get_responses_for_quiz(&self, quiz_id: Uuid) -> PortResult<Vec<QuizResponse>> {
        Ok(self
            .lock()?
            .responses
            .iter()
            .filter(|r| r.quiz_id == quiz_id)
            .cloned()
            .collect())
    }

    async fn finish_quiz(&self, completion: QuizCompletion) -> PortResult<Quiz> {
        let mut tables = self.lock()?;
        let quiz = tables
            .quizzes
            .get_mut(&completion.quiz_id)
            .ok_or_else(|| PortError::NotFound(format!("Quiz {} not found", completion.quiz_id)))?;
        if quiz.finished_at.is_some() {
            return Err(PortError::Conflict(format!(
                "quiz {} is already finished",
                completion.quiz_id
            )));
        }
        quiz.finished_at = Some(completion.finished_at);
        quiz.total_score = Some(completion.total_score);
        quiz.weak_spots = Some(completion.weak_spots);
        let finished = quiz.clone();

        if let Some(profile) = tables.profiles.get_mut(&completion.user_id) {
            *profile = profile.with_quiz_score(completion.total_score);
        }
        Ok(finished)
    }
}
