use anyhow::{anyhow, bail, Result};
use async_openai::{types::CreateEmbeddingRequestArgs, Client as OpenAIClient};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use reqwest::Client;
use std::{sync::Arc, time::Duration};
use tracing::debug;

pub const DEFAULT_HF_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-ada-002";

const HF_INFERENCE_URL: &str = "https://api-inference.huggingface.co";
const BATCH_SIZE: usize = 32;

/// Turns text into vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds each text, preserving order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_documents(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| anyhow!("Could not find embedding"))
    }
}

/// Sentence embeddings from the HuggingFace Inference API.
pub struct HuggingFaceEmbeddings {
    client: Client,
    model: String,
    token: String,
    base_url: String,
}

impl HuggingFaceEmbeddings {
    #[must_use]
    pub fn new(token: String, model: String) -> Self {
        Self {
            token,
            model,
            client: Client::new(),
            base_url: HF_INFERENCE_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let inputs = batch
            .iter()
            .map(|text| text.replace('\n', " "))
            .collect::<Vec<_>>();

        let response: serde_json::Value = self
            .client
            .post(format!(
                "{}/pipeline/feature-extraction/{}",
                self.base_url, self.model
            ))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({
                "inputs": inputs,
                "options": { "wait_for_model": true },
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_feature_extraction(response)
    }
}

#[async_trait]
impl Embedder for HuggingFaceEmbeddings {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(BATCH_SIZE) {
            let embedded = self.embed_batch(batch).await?;
            if embedded.len() != batch.len() {
                bail!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    embedded.len()
                );
            }

            vectors.extend(embedded);
        }

        debug!("Embedded {} texts with {}", vectors.len(), self.model);

        Ok(vectors)
    }
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum FeatureOutput {
    Pooled(Vec<f32>),
    Tokens(Vec<Vec<f32>>),
}

/// Parses a feature-extraction response. Models without a pooling layer return
/// one vector per token, which get mean-pooled.
fn parse_feature_extraction(response: serde_json::Value) -> Result<Vec<Vec<f32>>> {
    if let Some(error) = response.get("error") {
        bail!("HuggingFace API error: {error}");
    }

    let outputs: Vec<FeatureOutput> = serde_json::from_value(response)?;

    outputs
        .into_iter()
        .map(|output| match output {
            FeatureOutput::Pooled(vector) => Ok(vector),
            FeatureOutput::Tokens(tokens) => mean_pool(&tokens),
        })
        .collect()
}

fn mean_pool(tokens: &[Vec<f32>]) -> Result<Vec<f32>> {
    let dim = tokens
        .first()
        .ok_or_else(|| anyhow!("Empty token embeddings"))?
        .len();

    let mut pooled = vec![0.0; dim];
    for token in tokens {
        if token.len() != dim {
            bail!("Token embeddings have mismatched dimensions");
        }

        for (sum, value) in pooled.iter_mut().zip(token) {
            *sum += value;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let count = tokens.len() as f32;
    Ok(pooled.into_iter().map(|sum| sum / count).collect())
}

/// Embeddings from the OpenAI API.
pub struct OpenAIEmbeddings {
    client: Arc<OpenAIClient>,
    model: String,
}

impl OpenAIEmbeddings {
    #[must_use]
    pub fn new(api_key: &str, model: String) -> Self {
        let backoff = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::from_secs(60)))
            .build();

        Self {
            model,
            client: Arc::new(
                OpenAIClient::new()
                    .with_api_key(api_key)
                    .with_backoff(backoff),
            ),
        }
    }
}

#[async_trait]
impl Embedder for OpenAIEmbeddings {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(BATCH_SIZE) {
            let request = CreateEmbeddingRequestArgs::default()
                .model(&self.model)
                .input(batch.to_vec())
                .build()?;

            let mut response = self.client.embeddings().create(request).await?;
            if response.data.len() != batch.len() {
                bail!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    response.data.len()
                );
            }

            response.data.sort_by_key(|e| e.index);
            vectors.extend(response.data.into_iter().map(|e| e.embedding));
        }

        Ok(vectors)
    }
}
