use anyhow::{anyhow, bail, Result};
use async_openai::{
    types::{ChatCompletionRequestMessageArgs, CreateChatCompletionRequestArgs, Role},
    Client as OpenAIClient,
};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::{sync::Arc, time::Duration};
use tracing::debug;

const HF_INFERENCE_URL: &str = "https://api-inference.huggingface.co";

/// A text-in, text-out language model.
#[async_trait]
pub trait Llm: Send + Sync + std::fmt::Debug {
    async fn call(&self, prompt: &str) -> Result<String>;
}

/// Text generation through a model hosted on the HuggingFace Hub.
pub struct HuggingFaceHub {
    client: Client,
    repo_id: String,
    token: String,
    base_url: String,
    pub model_kwargs: Map<String, Value>,
}

impl HuggingFaceHub {
    #[must_use]
    pub fn new(token: String, repo_id: String) -> Self {
        Self {
            token,
            repo_id,
            client: Client::new(),
            base_url: HF_INFERENCE_URL.to_string(),
            model_kwargs: default_model_kwargs(),
        }
    }

    #[must_use]
    pub fn with_model_kwargs(mut self, model_kwargs: Map<String, Value>) -> Self {
        self.model_kwargs = model_kwargs;
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn repo_id(&self) -> &str {
        &self.repo_id
    }
}

impl std::fmt::Debug for HuggingFaceHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuggingFaceHub")
            .field("repo_id", &self.repo_id)
            .field("model_kwargs", &self.model_kwargs)
            .finish_non_exhaustive()
    }
}

/// Sampling parameters tuned for long, low-temperature answers.
#[must_use]
pub fn default_model_kwargs() -> Map<String, Value> {
    let Value::Object(kwargs) = json!({
        "min_length": 1024,
        "max_new_tokens": 5632,
        "do_sample": true,
        "temperature": 0.1,
        "top_k": 50,
        "top_p": 0.95,
        "eos_token_id": 49155,
    }) else {
        unreachable!()
    };

    kwargs
}

#[async_trait]
impl Llm for HuggingFaceHub {
    async fn call(&self, prompt: &str) -> Result<String> {
        debug!("Prompting {} with {} characters", self.repo_id, prompt.len());

        let response = self
            .client
            .post(format!("{}/models/{}", self.base_url, self.repo_id))
            .bearer_auth(&self.token)
            .json(&json!({
                "inputs": prompt,
                "parameters": self.model_kwargs,
            }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if let Ok(value) = serde_json::from_str::<Value>(&body) {
            // Model errors come back as `{"error": ..}` with a non-2xx status.
            if status.is_success() || value.get("error").is_some() {
                return parse_generation(prompt, &value);
            }
        }

        bail!("Inference API returned {status}: {}", truncate(&body, 200))
    }
}

fn truncate(text: &str, max: usize) -> &str {
    text.char_indices()
        .nth(max)
        .map_or(text, |(end, _)| &text[..end])
}

/// Pulls the generated text out of a text-generation response, dropping the
/// echoed prompt.
fn parse_generation(prompt: &str, response: &Value) -> Result<String> {
    if let Some(error) = response.get("error") {
        bail!("Error raised by inference API: {error}");
    }

    let generated = response
        .get(0)
        .and_then(|r| r.get("generated_text"))
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("Could not find generated text"))?;

    Ok(generated
        .strip_prefix(prompt)
        .unwrap_or(generated)
        .to_string())
}

/// Chat completions from OpenAI.
pub struct ChatOpenAI {
    client: Arc<OpenAIClient>,
    model: String,
    temperature: f32,
}

impl ChatOpenAI {
    #[must_use]
    pub fn new(api_key: &str, model: String) -> Self {
        let backoff = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::from_secs(60)))
            .build();

        Self {
            model,
            temperature: 0.7,
            client: Arc::new(
                OpenAIClient::new()
                    .with_api_key(api_key)
                    .with_backoff(backoff),
            ),
        }
    }
}

impl std::fmt::Debug for ChatOpenAI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatOpenAI")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Llm for ChatOpenAI {
    async fn call(&self, prompt: &str) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(self.temperature)
            .messages([ChatCompletionRequestMessageArgs::default()
                .role(Role::User)
                .content(prompt)
                .build()?])
            .build()?;

        let response = self.client.chat().create(request).await?;

        Ok(response
            .choices
            .first()
            .ok_or_else(|| anyhow!("Could not find completion"))?
            .message
            .content
            .clone())
    }
}
