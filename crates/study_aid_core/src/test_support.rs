//! Fixtures shared by the unit tests of this crate.

use crate::domain::{
    Difficulty, GeneratedQuestion, GeneratedSummary, Mode, NewQuestion, QuestionKind, QuestionPack,
};
use crate::memory::InMemoryStore;
use crate::ports::{
    DatabaseService, DomainClassificationService, PortError, PortResult,
    QuestionGenerationService, SummaryGenerationService,
};
use async_trait::async_trait;
use std::sync::Mutex;
use uuid::Uuid;

pub const SOURCE_TEXT: &str = "The mitochondria is the powerhouse of the cell. \
It produces ATP through cellular respiration. Ribosomes synthesize proteins.";

pub async fn seed_user(db: &InMemoryStore) -> Uuid {
    let email = format!("{}@example.com", Uuid::new_v4());
    db.create_user_with_email(&email, "hash").await.unwrap().user_id
}

/// Two MCQs, two short answers and one analytical question, in that order.
pub async fn seed_pack(db: &InMemoryStore, user_id: Uuid) -> QuestionPack {
    let ingest = db
        .create_ingest(user_id, SOURCE_TEXT, "Biology", "text")
        .await
        .unwrap();
    let questions = valid_generated_questions()
        .into_iter()
        .enumerate()
        .map(|(position, g)| NewQuestion {
            position,
            kind: match g.options {
                Some(options) => QuestionKind::Mcq { options },
                None if g.question_type == "short" => QuestionKind::Short,
                None => QuestionKind::Analytical,
            },
            prompt: g.prompt,
            answer: g.answer,
            rationale: g.rationale,
            supporting_span: g.supporting_span,
            supporting_span_verified: true,
            difficulty: Difficulty::Medium,
        })
        .collect();
    db.create_question_pack(user_id, ingest.id, Mode::Pass, questions)
        .await
        .unwrap()
}

pub fn valid_generated_questions() -> Vec<GeneratedQuestion> {
    let mcq = |prompt: &str, answer: &str, options: [&str; 3]| GeneratedQuestion {
        question_type: "mcq".to_string(),
        prompt: prompt.to_string(),
        options: Some(options.iter().map(|o| o.to_string()).collect()),
        answer: answer.to_string(),
        rationale: "Stated in the text.".to_string(),
        supporting_span: "The mitochondria is the powerhouse of the cell.".to_string(),
    };
    let open = |kind: &str, prompt: &str, answer: &str, span: &str| GeneratedQuestion {
        question_type: kind.to_string(),
        prompt: prompt.to_string(),
        options: None,
        answer: answer.to_string(),
        rationale: "Stated in the text.".to_string(),
        supporting_span: span.to_string(),
    };
    vec![
        mcq(
            "Which organelle is the powerhouse of the cell?",
            "Mitochondria",
            ["Mitochondria", "Ribosome", "Nucleus"],
        ),
        mcq(
            "What do ribosomes synthesize?",
            "Proteins",
            ["Lipids", "Proteins", "ATP"],
        ),
        open(
            "short",
            "What molecule does cellular respiration produce?",
            "ATP",
            "It produces ATP through cellular respiration.",
        ),
        open(
            "short",
            "Which organelle synthesizes proteins?",
            "Ribosomes",
            "Ribosomes synthesize proteins.",
        ),
        open(
            "analytical",
            "Why is the mitochondria called the powerhouse?",
            "Because it produces ATP",
            "It produces ATP through cellular respiration.",
        ),
    ]
}

/// A generation service double that replays canned results and counts calls.
#[derive(Default)]
pub struct FakeGenerator {
    pub domain: Option<String>,
    pub questions: Option<Vec<GeneratedQuestion>>,
    pub fail: bool,
    pub calls: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, call: String) -> PortResult<()> {
        self.calls.lock().unwrap().push(call);
        if self.fail {
            Err(PortError::Upstream("status 503".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DomainClassificationService for FakeGenerator {
    async fn classify_domain(&self, excerpt: &str) -> PortResult<String> {
        self.record(format!("classify:{}", excerpt.chars().count()))?;
        Ok(self.domain.clone().unwrap_or_else(|| "Biology".to_string()))
    }
}

#[async_trait]
impl SummaryGenerationService for FakeGenerator {
    async fn summarize(&self, _text: &str, mode: Mode) -> PortResult<GeneratedSummary> {
        self.record(format!("summarize:{}", mode))?;
        Ok(GeneratedSummary {
            summary_text: format!("{} summary", mode),
            highlights: vec!["ATP".to_string(), "Ribosomes".to_string()],
        })
    }

    async fn explain_simply(&self, summary_text: &str) -> PortResult<String> {
        self.record("eli5".to_string())?;
        Ok(format!("Simply put: {}", summary_text))
    }
}

#[async_trait]
impl QuestionGenerationService for FakeGenerator {
    async fn generate_questions(
        &self,
        _text: &str,
        mode: Mode,
    ) -> PortResult<Vec<GeneratedQuestion>> {
        self.record(format!("questions:{}", mode))?;
        Ok(self
            .questions
            .clone()
            .unwrap_or_else(valid_generated_questions))
    }
}
