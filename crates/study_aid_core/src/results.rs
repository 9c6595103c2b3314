//! crates/study_aid_core/src/results.rs
//!
//! Read-only aggregation over a completed quiz's responses.

use crate::domain::{Question, QuestionType, Quiz, QuizResponse, WeakSpots};
use crate::error::{StudyError, StudyResult};
use crate::ports::DatabaseService;
use crate::quiz::{score_percentage, weak_spots_for};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionResult {
    pub position: usize,
    pub question_id: Uuid,
    pub question_type: QuestionType,
    pub prompt: String,
    pub correct_answer: String,
    pub user_answer: String,
    pub is_correct: bool,
    pub time_taken_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizResults {
    pub quiz_id: Uuid,
    pub total_score: u8,
    pub correct_count: usize,
    pub question_count: usize,
    pub average_time_secs: u32,
    pub breakdown: Vec<QuestionResult>,
    pub weak_spots: WeakSpots,
}

/// Computes the results of a completed quiz. Pure, so repeated calls over the
/// same rows give the same answer.
pub fn aggregate_results(
    quiz: &Quiz,
    questions: &[Question],
    responses: &[QuizResponse],
) -> StudyResult<QuizResults> {
    if !quiz.is_complete() {
        return Err(StudyError::InvariantViolation(format!(
            "quiz {} is still in progress",
            quiz.id
        )));
    }
    if questions.is_empty() {
        return Err(StudyError::InvariantViolation(format!(
            "quiz {} has no questions",
            quiz.id
        )));
    }

    let mut breakdown = Vec::with_capacity(questions.len());
    for question in questions {
        let response = responses
            .iter()
            .find(|r| r.question_id == question.id)
            .ok_or_else(|| {
                StudyError::InvariantViolation(format!(
                    "quiz {} has no response for question {}",
                    quiz.id, question.id
                ))
            })?;
        breakdown.push(QuestionResult {
            position: question.position,
            question_id: question.id,
            question_type: question.kind.question_type(),
            prompt: question.prompt.clone(),
            correct_answer: question.answer.clone(),
            user_answer: response.user_answer.clone(),
            is_correct: response.is_correct,
            time_taken_secs: response.time_taken_secs,
        });
    }

    let n = breakdown.len() as u64;
    let correct_count = breakdown.iter().filter(|r| r.is_correct).count();
    let total_time: u64 = breakdown.iter().map(|r| r.time_taken_secs as u64).sum();
    let average_time_secs = ((2 * total_time + n) / (2 * n)) as u32;
    let total_score = match quiz.total_score {
        Some(score) => score,
        None => score_percentage(correct_count, breakdown.len())?,
    };

    Ok(QuizResults {
        quiz_id: quiz.id,
        total_score,
        correct_count,
        question_count: breakdown.len(),
        average_time_secs,
        breakdown,
        weak_spots: weak_spots_for(questions, responses),
    })
}

/// Loads a quiz with its questions and responses and aggregates them.
pub async fn load_results(
    db: &dyn DatabaseService,
    user_id: Uuid,
    quiz_id: Uuid,
) -> StudyResult<QuizResults> {
    let quiz = db.get_quiz(quiz_id).await?;
    if quiz.user_id != user_id {
        return Err(StudyError::Unauthorized);
    }
    let questions = db.get_questions_for_pack(quiz.pack_id).await?;
    let responses = db.get_responses_for_quiz(quiz_id).await?;
    aggregate_results(&quiz, &questions, &responses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::quiz::QuizSession;
    use crate::test_support::{seed_pack, seed_user};

    async fn finished_quiz(db: &InMemoryStore) -> (Uuid, Uuid) {
        let user_id = seed_user(db).await;
        let pack = seed_pack(db, user_id).await;
        let mut session = QuizSession::start(db, user_id, pack.id).await.unwrap();
        let answers: Vec<String> = session.questions().iter().map(|q| q.answer.clone()).collect();
        session.submit_answer(db, 0, &answers[0], 50).await.unwrap(); // 10s, right
        session.expire(db, 1).await.unwrap(); // 60s, wrong
        session.submit_answer(db, 2, &answers[2], 45).await.unwrap(); // 15s, right
        session.submit_answer(db, 3, "nope", 58).await.unwrap(); // 2s, wrong
        session.submit_answer(db, 4, &answers[4], 59).await.unwrap(); // 1s, right
        (user_id, session.quiz_id())
    }

    #[tokio::test]
    async fn results_list_questions_in_order_with_average_time() {
        let db = InMemoryStore::new();
        let (user_id, quiz_id) = finished_quiz(&db).await;

        let results = load_results(&db, user_id, quiz_id).await.unwrap();
        assert_eq!(results.total_score, 60);
        assert_eq!(results.correct_count, 3);
        assert_eq!(results.question_count, 5);
        // (10 + 60 + 15 + 2 + 1) / 5 = 17.6
        assert_eq!(results.average_time_secs, 18);
        let correctness: Vec<bool> = results.breakdown.iter().map(|r| r.is_correct).collect();
        assert_eq!(correctness, vec![true, false, true, false, true]);
        assert_eq!(results.breakdown[1].user_answer, "No answer");
        assert_eq!(results.breakdown[1].time_taken_secs, 60);
        assert_eq!(results.weak_spots.missed.len(), 2);
    }

    #[tokio::test]
    async fn aggregation_is_idempotent() {
        let db = InMemoryStore::new();
        let (user_id, quiz_id) = finished_quiz(&db).await;

        let first = load_results(&db, user_id, quiz_id).await.unwrap();
        let second = load_results(&db, user_id, quiz_id).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn in_progress_quiz_has_no_results() {
        let db = InMemoryStore::new();
        let user_id = seed_user(&db).await;
        let pack = seed_pack(&db, user_id).await;
        let session = QuizSession::start(&db, user_id, pack.id).await.unwrap();

        let result = load_results(&db, user_id, session.quiz_id()).await;
        assert!(matches!(result, Err(StudyError::InvariantViolation(_))));
    }

    #[tokio::test]
    async fn results_are_private_to_the_quiz_taker() {
        let db = InMemoryStore::new();
        let (_, quiz_id) = finished_quiz(&db).await;

        let result = load_results(&db, Uuid::new_v4(), quiz_id).await;
        assert!(matches!(result, Err(StudyError::Unauthorized)));
    }
}
