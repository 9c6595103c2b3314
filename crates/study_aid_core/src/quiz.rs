//! crates/study_aid_core/src/quiz.rs
//!
//! The quiz session lifecycle: one timed attempt at a pack's questions, in
//! order, producing a percentage score.
//!
//! A session does not exist before `start` (or `resume`) returns; afterwards it
//! is either `InProgress` at some question index or `Complete`. Every store
//! write is awaited before the session moves on, so a failed write leaves the
//! session on the same question.

use crate::domain::{
    NewQuizResponse, Question, Quiz, QuizCompletion, QuizResponse, WeakSpot, WeakSpots,
};
use crate::error::{StudyError, StudyResult};
use crate::ports::{DatabaseService, PortError};
use chrono::Utc;
use std::collections::HashSet;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Seconds allowed for each question.
pub const QUESTION_TIME_BUDGET_SECS: u32 = 60;

/// Recorded in place of an answer when the user submitted nothing.
pub const NO_ANSWER: &str = "No answer";

/// Case-insensitive, whitespace-trimmed exact comparison.
pub fn answers_match(submitted: &str, expected: &str) -> bool {
    submitted.trim().to_lowercase() == expected.trim().to_lowercase()
}

/// `round(100 * correct / total)` as an integer percentage, rounding halves up.
pub fn score_percentage(correct: usize, total: usize) -> StudyResult<u8> {
    if total == 0 {
        return Err(StudyError::InvariantViolation(
            "cannot score a quiz with zero questions".to_string(),
        ));
    }
    if correct > total {
        return Err(StudyError::InvariantViolation(format!(
            "{} correct answers out of {} questions",
            correct, total
        )));
    }
    Ok(((200 * correct + total) / (2 * total)) as u8)
}

/// Builds the weak spots of a quiz from its questions and responses.
pub fn weak_spots_for(questions: &[Question], responses: &[QuizResponse]) -> WeakSpots {
    let missed = questions
        .iter()
        .filter(|q| {
            responses
                .iter()
                .find(|r| r.question_id == q.id)
                .is_some_and(|r| !r.is_correct)
        })
        .map(|q| WeakSpot {
            question_id: q.id,
            question_type: q.kind.question_type(),
            supporting_span: q.supporting_span.clone(),
        })
        .collect();
    WeakSpots { missed }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    InProgress { index: usize },
    Complete { total_score: u8 },
}

/// What a submission did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The response was recorded and the next question is current.
    Advanced { next_index: usize },
    /// The last response was recorded and the quiz is scored.
    Completed { total_score: u8 },
    /// The submission targeted a question that is no longer current.
    Ignored,
}

pub struct QuizSession {
    quiz: Quiz,
    questions: Vec<Question>,
    phase: QuizPhase,
}

impl QuizSession {
    /// Creates a quiz row for the pack and positions the session on its first question.
    #[instrument(skip(db))]
    pub async fn start(
        db: &dyn DatabaseService,
        user_id: Uuid,
        pack_id: Uuid,
    ) -> StudyResult<Self> {
        let pack = db.get_question_pack(pack_id).await?;
        if pack.user_id != user_id {
            return Err(StudyError::Unauthorized);
        }
        let questions = db.get_questions_for_pack(pack_id).await?;
        if questions.is_empty() {
            return Err(StudyError::InvariantViolation(format!(
                "question pack {} has no questions",
                pack_id
            )));
        }

        let quiz = db.create_quiz(user_id, pack_id).await?;
        info!(quiz_id = %quiz.id, questions = questions.len(), "Quiz started.");
        Ok(Self {
            quiz,
            questions,
            phase: QuizPhase::InProgress { index: 0 },
        })
    }

    /// Rebuilds a session from stored rows so a reconnecting client lands on
    /// the same question.
    #[instrument(skip(db))]
    pub async fn resume(
        db: &dyn DatabaseService,
        user_id: Uuid,
        quiz_id: Uuid,
    ) -> StudyResult<Self> {
        let quiz = db.get_quiz(quiz_id).await?;
        if quiz.user_id != user_id {
            return Err(StudyError::Unauthorized);
        }
        let questions = db.get_questions_for_pack(quiz.pack_id).await?;
        if questions.is_empty() {
            return Err(StudyError::InvariantViolation(format!(
                "question pack {} has no questions",
                quiz.pack_id
            )));
        }

        if let Some(total_score) = quiz.total_score.filter(|_| quiz.is_complete()) {
            return Ok(Self {
                quiz,
                questions,
                phase: QuizPhase::Complete { total_score },
            });
        }

        let responses = db.get_responses_for_quiz(quiz_id).await?;
        let answered: HashSet<Uuid> = responses.iter().map(|r| r.question_id).collect();
        let index = questions
            .iter()
            .position(|q| !answered.contains(&q.id))
            .unwrap_or(questions.len());

        let mut session = Self {
            quiz,
            questions,
            phase: QuizPhase::InProgress { index },
        };
        if index == session.questions.len() {
            // Every answer is stored but the score never was.
            session.complete(db).await?;
        }
        Ok(session)
    }

    pub fn quiz_id(&self) -> Uuid {
        self.quiz.id
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn current_index(&self) -> Option<usize> {
        match self.phase {
            QuizPhase::InProgress { index } => Some(index),
            QuizPhase::Complete { .. } => None,
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current_index().and_then(|i| self.questions.get(i))
    }

    /// Records the answer to the current question and moves the session on.
    ///
    /// The stored answer is the submission with surrounding whitespace
    /// trimmed; a blank submission is stored as [`NO_ANSWER`].
    ///
    /// `question_index` names the question the caller is answering; anything
    /// other than the current question is ignored, which absorbs double
    /// submissions racing the countdown.
    pub async fn submit_answer(
        &mut self,
        db: &dyn DatabaseService,
        question_index: usize,
        answer: &str,
        time_remaining_secs: u32,
    ) -> StudyResult<SubmitOutcome> {
        let index = match self.phase {
            QuizPhase::InProgress { index } if index == question_index => index,
            _ => {
                warn!(
                    quiz_id = %self.quiz.id,
                    question_index,
                    phase = ?self.phase,
                    "Ignoring submission for a question that is not current."
                );
                return Ok(SubmitOutcome::Ignored);
            }
        };
        let question = &self.questions[index];

        let trimmed = answer.trim();
        let (user_answer, is_correct) = if trimmed.is_empty() {
            (NO_ANSWER.to_string(), false)
        } else {
            (trimmed.to_string(), answers_match(trimmed, &question.answer))
        };
        let time_taken_secs =
            QUESTION_TIME_BUDGET_SECS - time_remaining_secs.min(QUESTION_TIME_BUDGET_SECS);

        let response = NewQuizResponse {
            quiz_id: self.quiz.id,
            question_id: question.id,
            user_answer,
            is_correct,
            time_taken_secs,
        };
        match db.save_quiz_response(response).await {
            Ok(_) => {}
            Err(PortError::Conflict(msg)) => {
                warn!(quiz_id = %self.quiz.id, index, "Response already recorded: {}", msg);
            }
            Err(e) => return Err(e.into()),
        }

        if index + 1 < self.questions.len() {
            self.phase = QuizPhase::InProgress { index: index + 1 };
            Ok(SubmitOutcome::Advanced {
                next_index: index + 1,
            })
        } else {
            let total_score = self.complete(db).await?;
            Ok(SubmitOutcome::Completed { total_score })
        }
    }

    /// The countdown for `question_index` ran out: records "No answer" with
    /// the whole budget as time taken.
    pub async fn expire(
        &mut self,
        db: &dyn DatabaseService,
        question_index: usize,
    ) -> StudyResult<SubmitOutcome> {
        self.submit_answer(db, question_index, "", 0).await
    }

    async fn complete(&mut self, db: &dyn DatabaseService) -> StudyResult<u8> {
        let responses = db.get_responses_for_quiz(self.quiz.id).await?;
        let answered: Vec<&QuizResponse> = self
            .questions
            .iter()
            .filter_map(|q| responses.iter().find(|r| r.question_id == q.id))
            .collect();
        if answered.len() != self.questions.len() {
            return Err(StudyError::InvariantViolation(format!(
                "quiz {} has {} responses for {} questions",
                self.quiz.id,
                answered.len(),
                self.questions.len()
            )));
        }

        let correct = answered.iter().filter(|r| r.is_correct).count();
        let total_score = score_percentage(correct, self.questions.len())?;
        let completion = QuizCompletion {
            quiz_id: self.quiz.id,
            user_id: self.quiz.user_id,
            finished_at: Utc::now(),
            total_score,
            weak_spots: weak_spots_for(&self.questions, &responses),
        };

        let quiz = match db.finish_quiz(completion).await {
            Ok(quiz) => quiz,
            Err(PortError::Conflict(_)) => db.get_quiz(self.quiz.id).await?,
            Err(e) => return Err(e.into()),
        };
        let total_score = quiz.total_score.unwrap_or(total_score);
        info!(quiz_id = %quiz.id, total_score, correct, "Quiz complete.");

        self.quiz = quiz;
        self.phase = QuizPhase::Complete { total_score };
        Ok(total_score)
    }
}
