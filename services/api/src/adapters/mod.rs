pub mod chat;
pub mod classify_llm;
pub mod db;
pub mod questions_llm;
pub mod summary_llm;

pub use classify_llm::OpenAiClassifierAdapter;
pub use db::DbAdapter;
pub use questions_llm::OpenAiQuestionAdapter;
pub use summary_llm::OpenAiSummaryAdapter;
