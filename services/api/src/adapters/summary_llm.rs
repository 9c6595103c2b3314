//! services/api/src/adapters/summary_llm.rs
//!
//! This module contains the adapter for the summarizing LLM.
//! It implements the `SummaryGenerationService` port from the `core` crate.

use super::chat::{complete, strip_code_fence, ChatRequest};
use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use serde::Deserialize;
use study_aid_core::{
    domain::{GeneratedSummary, Mode},
    ports::{PortError, PortResult, SummaryGenerationService},
};

const TOPPER_PROMPT: &str = "You are a study assistant for a student preparing to top their exam. \
Write a detailed, well-structured summary of the text that covers every key concept, definition \
and relationship. Also pick out the most important exact phrases from the text as highlights. \
Respond with ONLY a JSON object of the form {\"summary\": string, \"highlights\": [string]}.";

const PASS_PROMPT: &str = "You are a study assistant for a student revising quickly to pass an exam. \
Write a concise summary of the text that keeps only the essentials. Also pick out a few of the most \
important exact phrases from the text as highlights. \
Respond with ONLY a JSON object of the form {\"summary\": string, \"highlights\": [string]}.";

const ELI5_PROMPT: &str = "You explain study material to a beginner. Rewrite the summary you are \
given in simple words and short sentences, with an everyday analogy where it helps. \
Respond with the explanation only.";

#[derive(Deserialize)]
struct SummaryPayload {
    summary: String,
    #[serde(default)]
    highlights: Vec<String>,
}

/// Parses the JSON object the model returns for a summary request.
fn parse_summary(raw: &str) -> PortResult<GeneratedSummary> {
    let payload: SummaryPayload = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| PortError::Malformed(format!("summary payload: {}", e)))?;
    Ok(GeneratedSummary {
        summary_text: payload.summary,
        highlights: payload.highlights,
    })
}

/// An adapter that implements `SummaryGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiSummaryAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiSummaryAdapter {
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl SummaryGenerationService for OpenAiSummaryAdapter {
    async fn summarize(&self, text: &str, mode: Mode) -> PortResult<GeneratedSummary> {
        let (system, max_tokens) = match mode {
            Mode::Topper => (TOPPER_PROMPT, 1500),
            Mode::Pass => (PASS_PROMPT, 600),
        };
        let raw = complete(
            &self.client,
            ChatRequest {
                model: &self.model,
                system,
                user: text.to_string(),
                max_tokens,
                temperature: 0.3,
                json_output: true,
            },
        )
        .await?;
        parse_summary(&raw)
    }

    async fn explain_simply(&self, summary_text: &str) -> PortResult<String> {
        let explanation = complete(
            &self.client,
            ChatRequest {
                model: &self.model,
                system: ELI5_PROMPT,
                user: summary_text.to_string(),
                max_tokens: 800,
                temperature: 0.5,
                json_output: false,
            },
        )
        .await?;
        Ok(explanation.trim().to_string())
    }
}
