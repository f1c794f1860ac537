use anyhow::Result;
use indoc::formatdoc;
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    llm::Llm,
    memory::{ConversationBufferMemory, Message, Role},
    store::{Retriever, ScoredDocument},
};

#[must_use]
pub fn condense_question_prompt(chat_history: &str, question: &str) -> String {
    formatdoc!(
        "Given the following conversation and a follow up question, rephrase the follow up question to be a standalone question, in its original language.

        Chat History:
        {chat_history}
        Follow Up Input: {question}
        Standalone question:"
    )
}

#[must_use]
pub fn qa_prompt(documents: &[ScoredDocument], question: &str) -> String {
    let context = documents
        .iter()
        .map(|d| d.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    formatdoc!(
        "Use the following pieces of context to answer the question at the end. If you don't know the answer, just say that you don't know, don't try to make up an answer.

        {context}

        Question: {question}
        Helpful Answer:"
    )
}

/// Renders past turns as `Human:`/`Assistant:` pairs.
fn format_chat_history(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| match m.role {
            Role::Human => format!("\nHuman: {}", m.content),
            Role::Ai => format!("\nAssistant: {}", m.content),
        })
        .collect()
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ChainResponse {
    pub question: String,
    pub answer: String,
    pub chat_history: Vec<Message>,
    pub source_documents: Vec<ScoredDocument>,
}

/// Answers questions against a retriever while remembering the conversation.
#[derive(Debug)]
pub struct ConversationalRetrievalChain {
    llm: Arc<dyn Llm>,
    retriever: Retriever,
    memory: ConversationBufferMemory,
}

impl ConversationalRetrievalChain {
    #[must_use]
    pub fn from_llm(
        llm: Arc<dyn Llm>,
        retriever: Retriever,
        memory: ConversationBufferMemory,
    ) -> Self {
        let chain = Self {
            llm,
            retriever,
            memory,
        };
        info!("Built conversation chain: {chain:?}");

        chain
    }

    #[must_use]
    pub fn memory(&self) -> &ConversationBufferMemory {
        &self.memory
    }

    /// Answers `question`, using earlier turns to resolve follow ups.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval or the language model fails. The memory
    /// is only updated on success.
    pub async fn call(&mut self, question: &str) -> Result<ChainResponse> {
        let standalone = if self.memory.is_empty() {
            question.to_string()
        } else {
            let history = format_chat_history(self.memory.messages());
            let condensed = self
                .llm
                .call(&condense_question_prompt(&history, question))
                .await?;

            condensed.trim().to_string()
        };
        debug!("Standalone question: {standalone}");

        let documents = self.retriever.get_relevant_documents(&standalone).await?;
        debug!("Retrieved {} documents", documents.len());

        let answer = self.llm.call(&qa_prompt(&documents, &standalone)).await?;
        let answer = answer.trim();

        self.memory.save_context(question, answer);

        Ok(ChainResponse {
            question: question.to_string(),
            answer: answer.to_string(),
            chat_history: self.memory.messages().to_vec(),
            source_documents: documents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{embeddings::tests::LetterEmbedder, llm::tests::ScriptedLlm, store::VectorStore};

    async fn retriever() -> Retriever {
        let texts = vec![
            "rust ownership rules".to_string(),
            "zzz".to_string(),
            "borrow checker".to_string(),
        ];
        let store = VectorStore::from_texts(texts, &LetterEmbedder).await.unwrap();

        Arc::new(store).as_retriever(Arc::new(LetterEmbedder), 2)
    }

    #[tokio::test]
    async fn first_question_skips_condensing() {
        let llm = Arc::new(ScriptedLlm::new(&["  Ownership is about moves.  "]));
        let mut chain = ConversationalRetrievalChain::from_llm(
            llm.clone(),
            retriever().await,
            ConversationBufferMemory::new(),
        );

        let response = chain.call("what are ownership rules?").await.unwrap();

        assert_eq!(response.answer, "Ownership is about moves.");
        assert_eq!(
            response.chat_history,
            vec![
                Message::human("what are ownership rules?"),
                Message::ai("Ownership is about moves.")
            ]
        );

        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].starts_with("Use the following pieces of context"));
        assert!(prompts[0].contains("Question: what are ownership rules?\nHelpful Answer:"));
        assert_eq!(response.source_documents.len(), 2);
    }

    #[tokio::test]
    async fn follow_up_is_condensed_with_history() {
        let llm = Arc::new(ScriptedLlm::new(&[
            "Ownership is about moves.",
            "What does the borrow checker do?",
            "It checks borrows.",
        ]));
        let mut chain = ConversationalRetrievalChain::from_llm(
            llm.clone(),
            retriever().await,
            ConversationBufferMemory::new(),
        );

        chain.call("what are ownership rules?").await.unwrap();
        let response = chain.call("and the checker?").await.unwrap();

        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[1].contains(
            "Chat History:\n\nHuman: what are ownership rules?\nAssistant: Ownership is about moves.\nFollow Up Input: and the checker?"
        ));
        assert!(prompts[2].contains("Question: What does the borrow checker do?"));
        assert_eq!(response.source_documents[0].text, "borrow checker");

        // History keeps the question as asked, not the condensed one.
        assert_eq!(response.chat_history[2], Message::human("and the checker?"));
        assert_eq!(response.chat_history.len(), 4);
    }

    #[tokio::test]
    async fn failed_call_leaves_memory_untouched() {
        let llm = Arc::new(ScriptedLlm::new(&[]));
        let mut chain = ConversationalRetrievalChain::from_llm(
            llm,
            retriever().await,
            ConversationBufferMemory::new(),
        );

        assert!(chain.call("anything?").await.is_err());
        assert!(chain.memory().is_empty());
    }

    #[test]
    fn qa_prompt_stuffs_documents() {
        let documents = vec![
            ScoredDocument {
                text: "one".into(),
                score: 0.0,
            },
            ScoredDocument {
                text: "two".into(),
                score: 1.0,
            },
        ];

        assert!(qa_prompt(&documents, "q").contains("\n\none\n\ntwo\n\nQuestion: q"));
    }
}
