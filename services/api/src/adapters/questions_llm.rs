//! services/api/src/adapters/questions_llm.rs
//!
//! This module contains the adapter for the question-generating LLM.
//! It implements the `QuestionGenerationService` port from the `core` crate.
//!
//! The model is asked for a JSON object with a `questions` array. Shape and
//! grounding checks happen in the core; this adapter only parses.

use super::chat::{complete, strip_code_fence, ChatRequest};
use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use serde::Deserialize;
use study_aid_core::{
    domain::{GeneratedQuestion, Mode},
    ports::{PortError, PortResult, QuestionGenerationService},
    questions::{MCQ_OPTION_COUNT, PACK_SIZE},
};
use tracing::warn;

fn system_prompt(mode: Mode) -> String {
    format!(
        "Generate EXACTLY {} questions from the provided text:\n\
         - 2 MCQs (multiple choice with {} options each, one correct)\n\
         - 2 Short Answer questions\n\
         - 1 Analytical question\n\n\
         Each question MUST include:\n\
         - type (mcq/short/analytical)\n\
         - prompt (the question)\n\
         - options (array of {} strings for MCQ only)\n\
         - answer (correct answer; for MCQ it must equal one of the options)\n\
         - rationale (explanation why)\n\
         - supportingSpan (exact verbatim quote from source text)\n\
         - difficulty (\"{}\")\n\n\
         Return ONLY valid JSON with a \"questions\" array, MCQs first, then short, then analytical. \
         NO repetition. Each supportingSpan MUST exist verbatim in the source text.",
        PACK_SIZE,
        MCQ_OPTION_COUNT,
        MCQ_OPTION_COUNT,
        mode.difficulty().as_str()
    )
}

#[derive(Deserialize)]
struct QuestionsPayload {
    questions: Vec<QuestionPayload>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionPayload {
    #[serde(rename = "type")]
    question_type: String,
    prompt: String,
    #[serde(default)]
    options: Option<Vec<String>>,
    answer: String,
    #[serde(default)]
    rationale: String,
    #[serde(alias = "supporting_span")]
    supporting_span: String,
    /// Echoed by the model; the stored difficulty always follows the mode.
    #[serde(default)]
    difficulty: Option<String>,
}

/// Parses the model's reply into unvalidated questions.
fn parse_questions(raw: &str, mode: Mode) -> PortResult<Vec<GeneratedQuestion>> {
    let payload: QuestionsPayload = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| PortError::Malformed(format!("questions payload: {}", e)))?;

    let expected = mode.difficulty().as_str();
    Ok(payload
        .questions
        .into_iter()
        .map(|q| {
            if let Some(echoed) = q.difficulty.as_deref() {
                if !echoed.eq_ignore_ascii_case(expected) {
                    warn!(echoed, expected, "Model echoed a different difficulty; ignoring it");
                }
            }
            GeneratedQuestion {
                question_type: q.question_type,
                prompt: q.prompt,
                options: q.options,
                answer: q.answer,
                rationale: q.rationale,
                supporting_span: q.supporting_span,
            }
        })
        .collect())
}

/// An adapter that implements `QuestionGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiQuestionAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiQuestionAdapter {
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl QuestionGenerationService for OpenAiQuestionAdapter {
    async fn generate_questions(&self, text: &str, mode: Mode) -> PortResult<Vec<GeneratedQuestion>> {
        let raw = complete(
            &self.client,
            ChatRequest {
                model: &self.model,
                system: &system_prompt(mode),
                user: text.to_string(),
                max_tokens: 2000,
                temperature: 0.4,
                json_output: true,
            },
        )
        .await?;
        parse_questions(&raw, mode)
    }
}
