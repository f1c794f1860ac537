#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod chain;
pub mod config;
pub mod embeddings;
pub mod llm;
pub mod memory;
pub mod pdf;
pub mod splitter;
pub mod store;
pub mod templates;

#[cfg(test)]
mod test_server;

pub use chain::{ChainResponse, ConversationalRetrievalChain};
pub use config::Config;
pub use embeddings::Embedder;
pub use llm::Llm;
pub use memory::{ConversationBufferMemory, Message};
pub use pdf::PdfFile;
pub use splitter::CharacterTextSplitter;
pub use store::VectorStore;

use anyhow::{bail, Result};
use std::sync::Arc;
use tracing::info;

/// The backends a document conversation is built from.
#[derive(Clone)]
pub struct Pipeline {
    splitter: CharacterTextSplitter,
    embedder: Arc<dyn Embedder>,
    llm: Arc<dyn Llm>,
    top_k: usize,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        splitter: CharacterTextSplitter,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn Llm>,
        top_k: usize,
    ) -> Self {
        Self {
            splitter,
            embedder,
            llm,
            top_k,
        }
    }

    /// # Errors
    ///
    /// Returns an error if a backend cannot be built from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            config.splitter()?,
            config.embedder()?,
            config.llm()?,
            config.top_k,
        ))
    }

    /// Extracts, splits and embeds the given PDFs into a fresh index.
    ///
    /// # Errors
    ///
    /// Returns an error if a PDF cannot be read, none of them has text, or
    /// embedding fails.
    pub async fn build_vector_store(&self, files: Vec<PdfFile>) -> Result<VectorStore> {
        let file_count = files.len();
        let raw_text = pdf::extract_pdfs_in_background(files).await?;
        let chunks = self.splitter.split_text(&raw_text);
        if chunks.is_empty() {
            bail!("No text could be extracted from the uploaded documents");
        }

        info!(
            "Split {} characters from {file_count} files into {} chunks",
            raw_text.chars().count(),
            chunks.len()
        );

        VectorStore::from_texts(chunks, self.embedder.as_ref()).await
    }

    /// Wires a chain with an empty memory on top of `store`.
    #[must_use]
    pub fn conversation_chain(&self, store: Arc<VectorStore>) -> ConversationalRetrievalChain {
        let retriever = store.as_retriever(self.embedder.clone(), self.top_k);

        ConversationalRetrievalChain::from_llm(
            self.llm.clone(),
            retriever,
            ConversationBufferMemory::new(),
        )
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("splitter", &self.splitter)
            .field("llm", &self.llm)
            .field("top_k", &self.top_k)
            .finish_non_exhaustive()
    }
}

/// Extracts, splits and embeds the given PDFs with the backends in `config`.
///
/// # Errors
///
/// Returns an error if a backend cannot be built, a PDF cannot be read, none of
/// them has text, or embedding fails.
pub async fn build_vector_store(config: &Config, files: Vec<PdfFile>) -> Result<VectorStore> {
    Pipeline::from_config(config)?.build_vector_store(files).await
}

/// # Errors
///
/// Returns an error if a backend cannot be built from `config`.
pub fn get_conversation_chain(
    config: &Config,
    store: Arc<VectorStore>,
) -> Result<ConversationalRetrievalChain> {
    Ok(Pipeline::from_config(config)?.conversation_chain(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{embeddings::tests::LetterEmbedder, llm::tests::ScriptedLlm, pdf::tests::sample_pdf};

    fn pipeline(llm: Arc<ScriptedLlm>) -> Pipeline {
        Pipeline::new(
            CharacterTextSplitter::new("\n", 1000, 200).unwrap(),
            Arc::new(LetterEmbedder),
            llm,
            2,
        )
    }

    #[tokio::test]
    async fn answers_questions_about_uploaded_pdfs() {
        let llm = Arc::new(ScriptedLlm::new(&["It is about kittens.", "Who wrote it?", "Ann."]));
        let pipeline = pipeline(llm.clone());

        let files = vec![
            PdfFile::new("a.pdf".into(), sample_pdf(Some("Kittens"))),
            PdfFile::new("b.pdf".into(), sample_pdf(None)),
        ];
        let store = pipeline.build_vector_store(files).await.unwrap();
        assert!(!store.is_empty());

        let mut chain = pipeline.conversation_chain(Arc::new(store));
        let first = chain.call("What is it about?").await.unwrap();
        let second = chain.call("And the author?").await.unwrap();

        assert_eq!(first.answer, "It is about kittens.");
        assert_eq!(second.answer, "Ann.");
        assert_eq!(second.chat_history.len(), 4);

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("Kittens"));
        assert!(prompts[1].contains("Follow Up Input: And the author?"));
    }

    #[tokio::test]
    async fn refuses_documents_without_text() {
        let pipeline = pipeline(Arc::new(ScriptedLlm::default()));
        let files = vec![PdfFile::new("blank.pdf".into(), sample_pdf(None))];

        let err = pipeline.build_vector_store(files).await.unwrap_err();

        assert!(err.to_string().contains("No text could be extracted"));
    }
}
