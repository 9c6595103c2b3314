pub mod domain;
pub mod error;
pub mod ingest;
pub mod memory;
pub mod ports;
pub mod questions;
pub mod quiz;
pub mod results;
pub mod summary;

#[cfg(test)]
mod test_support;

pub use domain::{
    Difficulty, GeneratedQuestion, GeneratedSummary, Ingest, Mode, NewQuestion, NewQuizResponse,
    Profile, Question, QuestionKind, QuestionPack, QuestionType, Quiz, QuizCompletion,
    QuizResponse, Summary, User, UserCredentials, WeakSpot, WeakSpots,
};
pub use error::{StudyError, StudyResult};
pub use memory::InMemoryStore;
pub use ports::{
    DatabaseService, DomainClassificationService, PortError, PortResult,
    QuestionGenerationService, SummaryGenerationService,
};
pub use quiz::{QuizPhase, QuizSession, SubmitOutcome, NO_ANSWER, QUESTION_TIME_BUDGET_SECS};
pub use results::{QuestionResult, QuizResults};
