//! services/api/src/adapters/classify_llm.rs
//!
//! This module contains the adapter for the domain-classifying LLM.
//! It implements the `DomainClassificationService` port from the `core` crate.

use super::chat::{complete, ChatRequest};
use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use study_aid_core::ports::{DomainClassificationService, PortResult};

const CLASSIFIER_PROMPT: &str = "You are a domain classifier. Analyze the text and respond with \
ONLY ONE WORD: the academic domain (Medicine, Engineering, History, Mathematics, Biology, \
Chemistry, Physics, Computer Science, Literature, or General).";

/// An adapter that implements `DomainClassificationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiClassifierAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiClassifierAdapter {
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl DomainClassificationService for OpenAiClassifierAdapter {
    async fn classify_domain(&self, excerpt: &str) -> PortResult<String> {
        let label = complete(
            &self.client,
            ChatRequest {
                model: &self.model,
                system: CLASSIFIER_PROMPT,
                user: format!("Classify this text:\n\n{}", excerpt),
                max_tokens: 10,
                temperature: 0.0,
                json_output: false,
            },
        )
        .await?;
        Ok(label.trim().to_string())
    }
}
