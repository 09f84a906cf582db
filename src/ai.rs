use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Freeform-prompt completion capability. May fail with quota, timeout or
/// auth errors; callers decide how much of that to absorb.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<String>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

const COMPLETIONS_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
// Lets the router pick the best available model.
const DEFAULT_MODEL: &str = "openrouter/auto";

pub struct OpenRouterClient {
    client: Client,
    api_key: Option<String>,
    model: String,
}

impl OpenRouterClient {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

#[async_trait]
impl Completion for OpenRouterClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            bail!("OPENROUTER_API_KEY is not configured");
        };

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system_prompt },
                ChatMessage { role: "user", content: user_prompt },
            ],
            max_tokens,
            temperature,
        };

        let response = self
            .client
            .post(COMPLETIONS_URL)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .context("completion request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("completion provider returned {status}: {body}");
        }

        let data: ChatResponse = response.json().await.context("invalid completion payload")?;
        let content = data
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            bail!("completion provider returned empty content");
        }
        Ok(content)
    }
}

// --- Free-form Assistant Chat ---

const CHAT_SYSTEM_PROMPT: &str = "You are a helpful investing assistant. \
    Ground your answers in market data, price trends and news.";

const CHAT_FALLBACK: &str =
    "I cannot answer right now. Try again later or ask a different question.";

/// Single-turn chat with the assistant. Provider failures collapse to a
/// fixed fallback string so the caller always has something to show.
pub async fn chat(completion: &dyn Completion, message: &str) -> String {
    match completion.complete(CHAT_SYSTEM_PROMPT, message, 300, 0.7).await {
        Ok(reply) if !reply.trim().is_empty() => reply,
        Ok(_) => CHAT_FALLBACK.to_string(),
        Err(err) => {
            tracing::warn!("chat completion failed: {err:#}");
            CHAT_FALLBACK.to_string()
        }
    }
}
