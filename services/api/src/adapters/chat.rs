//! services/api/src/adapters/chat.rs
//!
//! A thin wrapper over the OpenAI chat completion call shared by the
//! generation adapters.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use study_aid_core::ports::{PortError, PortResult};
use tracing::debug;

/// Builds the client shared by every generation adapter.
pub fn build_client(api_key: Option<&str>, api_base: Option<&str>) -> Client<OpenAIConfig> {
    let mut config = OpenAIConfig::new();
    if let Some(key) = api_key {
        config = config.with_api_key(key);
    }
    if let Some(base) = api_base {
        config = config.with_api_base(base);
    }
    Client::with_config(config)
}

/// Parameters of a single system + user chat exchange.
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub system: &'a str,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Ask the model for a JSON object instead of free text.
    pub json_output: bool,
}

/// Sends one chat request and returns the text of the first choice.
///
/// Transport and API failures become `PortError::Upstream`; an empty reply is
/// `PortError::Malformed`.
pub async fn complete(client: &Client<OpenAIConfig>, req: ChatRequest<'_>) -> PortResult<String> {
    let messages: Vec<ChatCompletionRequestMessage> = vec![
        ChatCompletionRequestSystemMessageArgs::default()
            .content(req.system)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .into(),
        ChatCompletionRequestUserMessageArgs::default()
            .content(req.user)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .into(),
    ];

    let mut builder = CreateChatCompletionRequestArgs::default();
    builder
        .model(req.model)
        .messages(messages)
        .n(1)
        .max_tokens(req.max_tokens)
        .temperature(req.temperature);
    if req.json_output {
        builder.response_format(ResponseFormat::JsonObject);
    }
    let request = builder
        .build()
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

    let response = client
        .chat()
        .create(request)
        .await
        .map_err(|e: OpenAIError| PortError::Upstream(e.to_string()))?;

    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| PortError::Malformed("LLM returned no text content".to_string()))?;

    debug!(model = req.model, chars = content.len(), "Chat completion received");
    Ok(content)
}

/// Strips a surrounding Markdown code fence, which models sometimes add
/// around JSON even when asked not to.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening fence line.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fenced_json() {
        let raw = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fence(raw), "{\"a\": 1}");
    }

    #[test]
    fn leaves_plain_text_alone() {
        assert_eq!(strip_code_fence("  {\"a\": 1} "), "{\"a\": 1}");
    }
}
