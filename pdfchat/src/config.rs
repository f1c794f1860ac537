use anyhow::{anyhow, bail, Context, Result};
use std::{collections::HashMap, env, str::FromStr, sync::Arc};

use crate::{
    embeddings::{
        Embedder, HuggingFaceEmbeddings, OpenAIEmbeddings, DEFAULT_HF_MODEL, DEFAULT_OPENAI_MODEL,
    },
    llm::{ChatOpenAI, HuggingFaceHub, Llm},
    splitter::CharacterTextSplitter,
    store::DEFAULT_TOP_K,
};

const DEFAULT_REPO_ID: &str = "HuggingFaceH4/starchat-beta";
const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    HuggingFace,
    OpenAI,
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            "openai" => Ok(Self::OpenAI),
            other => bail!("Unknown provider \"{other}\", expected huggingface or openai"),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub llm: Provider,
    pub embeddings: Provider,
    pub huggingface_token: Option<String>,
    pub openai_api_key: Option<String>,
    pub repo_id: String,
    pub chat_model: String,
    pub embedding_model: Option<String>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is malformed or a selected backend lacks credentials.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(&env::vars().collect())
    }

    /// # Errors
    ///
    /// See [`Config::from_env`].
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| vars.get(key).filter(|v| !v.is_empty()).cloned();

        let config = Self {
            llm: get("PDFCHAT_LLM").map_or(Ok(Provider::HuggingFace), |v| v.parse())?,
            embeddings: get("PDFCHAT_EMBEDDINGS").map_or(Ok(Provider::HuggingFace), |v| v.parse())?,
            huggingface_token: get("HUGGINGFACEHUB_API_TOKEN"),
            openai_api_key: get("OPENAI_API_KEY"),
            repo_id: get("repo_id").unwrap_or_else(|| DEFAULT_REPO_ID.to_string()),
            chat_model: get("PDFCHAT_CHAT_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            embedding_model: get("PDFCHAT_EMBEDDING_MODEL"),
            chunk_size: parse_number(get("PDFCHAT_CHUNK_SIZE"), "PDFCHAT_CHUNK_SIZE", 1000)?,
            chunk_overlap: parse_number(get("PDFCHAT_CHUNK_OVERLAP"), "PDFCHAT_CHUNK_OVERLAP", 200)?,
            top_k: parse_number(get("PDFCHAT_TOP_K"), "PDFCHAT_TOP_K", DEFAULT_TOP_K)?,
        };

        for provider in [config.llm, config.embeddings] {
            config.credential(provider)?;
        }
        config.splitter()?;

        Ok(config)
    }

    fn credential(&self, provider: Provider) -> Result<&str> {
        match provider {
            Provider::HuggingFace => self
                .huggingface_token
                .as_deref()
                .ok_or_else(|| anyhow!("$HUGGINGFACEHUB_API_TOKEN not set")),
            Provider::OpenAI => self
                .openai_api_key
                .as_deref()
                .ok_or_else(|| anyhow!("$OPENAI_API_KEY not set")),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the chunk overlap exceeds the chunk size.
    pub fn splitter(&self) -> Result<CharacterTextSplitter> {
        CharacterTextSplitter::new("\n", self.chunk_size, self.chunk_overlap)
    }

    /// # Errors
    ///
    /// Returns an error if the embedding backend lacks credentials.
    pub fn embedder(&self) -> Result<Arc<dyn Embedder>> {
        let key = self.credential(self.embeddings)?.to_string();

        Ok(match self.embeddings {
            Provider::HuggingFace => Arc::new(HuggingFaceEmbeddings::new(
                key,
                self.embedding_model
                    .clone()
                    .unwrap_or_else(|| DEFAULT_HF_MODEL.to_string()),
            )),
            Provider::OpenAI => Arc::new(OpenAIEmbeddings::new(
                &key,
                self.embedding_model
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            )),
        })
    }

    /// # Errors
    ///
    /// Returns an error if the language model backend lacks credentials.
    pub fn llm(&self) -> Result<Arc<dyn Llm>> {
        let key = self.credential(self.llm)?.to_string();

        Ok(match self.llm {
            Provider::HuggingFace => Arc::new(HuggingFaceHub::new(key, self.repo_id.clone())),
            Provider::OpenAI => Arc::new(ChatOpenAI::new(&key, self.chat_model.clone())),
        })
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("llm", &self.llm)
            .field("embeddings", &self.embeddings)
            .field("repo_id", &self.repo_id)
            .field("chunk_size", &self.chunk_size)
            .field("chunk_overlap", &self.chunk_overlap)
            .field("top_k", &self.top_k)
            .finish_non_exhaustive()
    }
}

fn parse_number(value: Option<String>, name: &str, default: usize) -> Result<usize> {
    value.map_or(Ok(default), |v| {
        v.parse()
            .with_context(|| format!("${name} must be a number, got \"{v}\""))
    })
}
