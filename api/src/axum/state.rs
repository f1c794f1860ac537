use pdfchat::{ConversationalRetrievalChain, Pipeline};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::axum::session::SESSION_TTL;

pub type SharedChain = Arc<Mutex<ConversationalRetrievalChain>>;

#[derive(Debug)]
struct Entry {
    chain: SharedChain,
    last_used: Instant,
}

impl Entry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.last_used.elapsed() >= ttl
    }
}

#[derive(Debug)]
pub struct State {
    pub pipeline: Pipeline,
    ttl: Duration,
    conversations: RwLock<HashMap<Uuid, Entry>>,
}

#[allow(clippy::module_name_repetitions)]
pub type AppState = Arc<State>;

/// Conversations idle for longer than the session cookie lives are dropped.
pub fn create(pipeline: Pipeline) -> AppState {
    with_ttl(pipeline, SESSION_TTL)
}

pub fn with_ttl(pipeline: Pipeline, ttl: Duration) -> AppState {
    Arc::new(State {
        pipeline,
        ttl,
        conversations: RwLock::default(),
    })
}

impl State {
    /// The conversation stored at `id`, marking it as used.
    pub async fn conversation(&self, id: &Uuid) -> Option<SharedChain> {
        let mut conversations = self.conversations.write().await;

        if conversations.get(id)?.is_expired(self.ttl) {
            conversations.remove(id);
            return None;
        }

        let entry = conversations.get_mut(id)?;
        entry.last_used = Instant::now();

        Some(entry.chain.clone())
    }

    /// Stores a new conversation, replacing the one at `previous` if any.
    pub async fn start_conversation(
        &self,
        chain: ConversationalRetrievalChain,
        previous: Option<Uuid>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let mut conversations = self.conversations.write().await;

        if let Some(previous) = previous {
            conversations.remove(&previous);
        }

        let before = conversations.len();
        conversations.retain(|_, entry| !entry.is_expired(self.ttl));
        if conversations.len() < before {
            debug!("Evicted {} idle conversations", before - conversations.len());
        }

        conversations.insert(
            id,
            Entry {
                chain: Arc::new(Mutex::new(chain)),
                last_used: Instant::now(),
            },
        );

        id
    }

    pub async fn conversation_count(&self) -> usize {
        self.conversations.read().await.len()
    }
}
