//! crates/study_aid_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use crate::error::StudyError;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Learning Mode and Difficulty
//=========================================================================================

/// The learning intensity selected by the user.
///
/// `Topper` is deep study with hard questions, `Pass` is quick revision with
/// medium questions. The mode is passed explicitly to every pipeline call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Topper,
    Pass,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Topper => "topper",
            Mode::Pass => "pass",
        }
    }

    /// The difficulty every generated question carries for this mode.
    pub fn difficulty(&self) -> Difficulty {
        match self {
            Mode::Topper => Difficulty::Hard,
            Mode::Pass => Difficulty::Medium,
        }
    }
}

impl FromStr for Mode {
    type Err = StudyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "topper" => Ok(Mode::Topper),
            "pass" => Ok(Mode::Pass),
            other => Err(StudyError::Validation(format!(
                "unrecognized mode '{}', expected 'topper' or 'pass'",
                other
            ))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = StudyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(StudyError::Validation(format!("unrecognized difficulty '{}'", other))),
        }
    }
}

//=========================================================================================
// Users
//=========================================================================================

/// Represents a user - used throughout app.
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

/// Aggregate quiz statistics kept per user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub user_id: Uuid,
    pub email: String,
    pub total_quizzes_taken: u32,
    /// Sum of every finished quiz score; the average is derived from it.
    pub total_score_sum: u64,
    pub average_score: Option<u8>,
}

impl Profile {
    /// Counts one more finished quiz and recomputes the average from the
    /// exact score sum, rounding half up.
    pub fn with_quiz_score(&self, score: u8) -> Profile {
        let total = self.total_score_sum + score as u64;
        let count = self.total_quizzes_taken as u64 + 1;
        Profile {
            user_id: self.user_id,
            email: self.email.clone(),
            total_quizzes_taken: self.total_quizzes_taken + 1,
            total_score_sum: total,
            average_score: Some(((2 * total + count) / (2 * count)) as u8),
        }
    }
}

//=========================================================================================
// Ingests and Summaries
//=========================================================================================

/// A stored unit of user-submitted study text plus its detected domain.
#[derive(Debug, Clone)]
pub struct Ingest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub domain: String,
    pub source_type: String,
    pub created_at: DateTime<Utc>,
}

/// A mode-scoped summary of an ingest.
#[derive(Debug, Clone)]
pub struct Summary {
    pub id: Uuid,
    pub ingest_id: Uuid,
    pub user_id: Uuid,
    pub mode: Mode,
    pub summary_text: String,
    pub highlights: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// The summary content returned by the generation service, before it is stored.
#[derive(Debug, Clone)]
pub struct GeneratedSummary {
    pub summary_text: String,
    pub highlights: Vec<String>,
}

//=========================================================================================
// Question Packs and Questions
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionType {
    Mcq,
    Short,
    Analytical,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Mcq => "mcq",
            QuestionType::Short => "short",
            QuestionType::Analytical => "analytical",
        }
    }
}

impl FromStr for QuestionType {
    type Err = StudyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mcq" => Ok(QuestionType::Mcq),
            "short" => Ok(QuestionType::Short),
            "analytical" => Ok(QuestionType::Analytical),
            other => Err(StudyError::Validation(format!("unrecognized question type '{}'", other))),
        }
    }
}

/// The shape of a question. Only multiple-choice questions carry options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionKind {
    Mcq { options: Vec<String> },
    Short,
    Analytical,
}

impl QuestionKind {
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionKind::Mcq { .. } => QuestionType::Mcq,
            QuestionKind::Short => QuestionType::Short,
            QuestionKind::Analytical => QuestionType::Analytical,
        }
    }

    pub fn options(&self) -> Option<&[String]> {
        match self {
            QuestionKind::Mcq { options } => Some(options),
            _ => None,
        }
    }
}

/// An immutable set of questions generated for one ingest and one mode.
#[derive(Debug, Clone)]
pub struct QuestionPack {
    pub id: Uuid,
    pub ingest_id: Uuid,
    pub user_id: Uuid,
    pub mode: Mode,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Question {
    pub id: Uuid,
    pub pack_id: Uuid,
    /// Zero-based creation order inside the pack.
    pub position: usize,
    pub kind: QuestionKind,
    pub prompt: String,
    pub answer: String,
    pub rationale: String,
    pub supporting_span: String,
    /// Whether `supporting_span` was found verbatim in the ingest text.
    pub supporting_span_verified: bool,
    pub difficulty: Difficulty,
    pub created_at: DateTime<Utc>,
}

/// A validated question waiting to be persisted with its pack.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub position: usize,
    pub kind: QuestionKind,
    pub prompt: String,
    pub answer: String,
    pub rationale: String,
    pub supporting_span: String,
    pub supporting_span_verified: bool,
    pub difficulty: Difficulty,
}

/// A question as returned by the generation service, not yet validated.
#[derive(Debug, Clone, Default)]
pub struct GeneratedQuestion {
    pub question_type: String,
    pub prompt: String,
    pub options: Option<Vec<String>>,
    pub answer: String,
    pub rationale: String,
    pub supporting_span: String,
}

//=========================================================================================
// Quizzes and Responses
//=========================================================================================

/// One missed question of a completed quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeakSpot {
    pub question_id: Uuid,
    pub question_type: QuestionType,
    pub supporting_span: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeakSpots {
    pub missed: Vec<WeakSpot>,
}

impl WeakSpots {
    pub fn missed_of_type(&self, question_type: QuestionType) -> usize {
        self.missed
            .iter()
            .filter(|spot| spot.question_type == question_type)
            .count()
    }
}

/// One timed attempt at a pack's questions.
#[derive(Debug, Clone)]
pub struct Quiz {
    pub id: Uuid,
    pub pack_id: Uuid,
    pub user_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub total_score: Option<u8>,
    pub weak_spots: Option<WeakSpots>,
}

impl Quiz {
    pub fn is_complete(&self) -> bool {
        self.finished_at.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct QuizResponse {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub question_id: Uuid,
    pub user_answer: String,
    pub is_correct: bool,
    pub time_taken_secs: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewQuizResponse {
    pub quiz_id: Uuid,
    pub question_id: Uuid,
    pub user_answer: String,
    pub is_correct: bool,
    pub time_taken_secs: u32,
}

/// The values written to a quiz row when it completes.
#[derive(Debug, Clone)]
pub struct QuizCompletion {
    pub quiz_id: Uuid,
    pub user_id: Uuid,
    pub finished_at: DateTime<Utc>,
    pub total_score: u8,
    pub weak_spots: WeakSpots,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_case_insensitively_and_rejects_unknown() {
        assert_eq!("Topper".parse::<Mode>().unwrap(), Mode::Topper);
        assert_eq!(" pass ".parse::<Mode>().unwrap(), Mode::Pass);
        assert!(matches!(
            "cram".parse::<Mode>(),
            Err(StudyError::Validation(_))
        ));
    }

    #[test]
    fn mode_derives_difficulty() {
        assert_eq!(Mode::Topper.difficulty(), Difficulty::Hard);
        assert_eq!(Mode::Pass.difficulty(), Difficulty::Medium);
    }

    #[test]
    fn profile_running_average() {
        let profile = Profile {
            user_id: Uuid::new_v4(),
            email: "a@b.c".to_string(),
            total_quizzes_taken: 0,
            total_score_sum: 0,
            average_score: None,
        };
        let first = profile.with_quiz_score(60);
        assert_eq!(first.total_quizzes_taken, 1);
        assert_eq!(first.average_score, Some(60));

        let second = first.with_quiz_score(81);
        assert_eq!(second.total_quizzes_taken, 2);
        // (60 + 81) / 2 = 70.5 rounds up
        assert_eq!(second.average_score, Some(71));
    }

    #[test]
    fn profile_average_does_not_drift_across_quizzes() {
        let profile = Profile {
            user_id: Uuid::new_v4(),
            email: "a@b.c".to_string(),
            total_quizzes_taken: 0,
            total_score_sum: 0,
            average_score: None,
        };
        let after = [33, 34, 33]
            .into_iter()
            .fold(profile, |p, score| p.with_quiz_score(score));
        assert_eq!(after.total_quizzes_taken, 3);
        assert_eq!(after.total_score_sum, 100);
        // 100 / 3 = 33.3
        assert_eq!(after.average_score, Some(33));
    }
}
