use anyhow::{bail, Context, Result};
use std::{fs, path::Path, sync::Arc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::embeddings::Embedder;

pub const DEFAULT_TOP_K: usize = 4;

#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct Entry {
    pub id: Uuid,
    pub text: String,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ScoredDocument {
    pub text: String,
    /// Squared L2 distance to the query, lower is closer.
    pub score: f32,
}

/// Flat in-memory vector index searched exhaustively by L2 distance.
#[derive(Debug, Default, serde::Deserialize, serde::Serialize)]
pub struct VectorStore {
    entries: Vec<Entry>,
}

impl VectorStore {
    /// Embeds every text and indexes it.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding fails or the vectors disagree in dimension.
    pub async fn from_texts(texts: Vec<String>, embedder: &dyn Embedder) -> Result<Self> {
        let vectors = embedder.embed_documents(&texts).await?;
        if vectors.len() != texts.len() {
            bail!(
                "Embedder returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            );
        }

        let mut store = Self::default();
        for (text, vector) in texts.into_iter().zip(vectors) {
            store.add(text, vector)?;
        }

        info!("Indexed {} chunks", store.len());

        Ok(store)
    }

    /// # Errors
    ///
    /// Returns an error if the vector's dimension differs from the index's.
    pub fn add(&mut self, text: String, vector: Vec<f32>) -> Result<Uuid> {
        if let Some(dim) = self.dimension() {
            if vector.len() != dim {
                bail!(
                    "Vector has dimension {}, index expects {dim}",
                    vector.len()
                );
            }
        }

        let id = Uuid::new_v4();
        self.entries.push(Entry { id, text, vector });

        Ok(id)
    }

    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        self.entries.first().map(|e| e.vector.len())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `k` closest entries to `query`, closest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query's dimension differs from the index's.
    pub fn similarity_search_with_score(
        &self,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredDocument>> {
        if let Some(dim) = self.dimension() {
            if query.len() != dim {
                bail!("Query has dimension {}, index expects {dim}", query.len());
            }
        }

        let mut scored = self
            .entries
            .iter()
            .map(|entry| ScoredDocument {
                text: entry.text.clone(),
                score: squared_l2(query, &entry.vector),
            })
            .collect::<Vec<_>>();

        // Stable sort keeps insertion order on ties.
        scored.sort_by(|a, b| a.score.total_cmp(&b.score));
        scored.truncate(k);

        Ok(scored)
    }

    /// # Errors
    ///
    /// Returns an error if the query cannot be embedded.
    pub async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        embedder: &dyn Embedder,
    ) -> Result<Vec<ScoredDocument>> {
        let vector = embedder.embed_query(query).await?;

        self.similarity_search_with_score(&vector, k)
    }

    #[must_use]
    pub fn as_retriever(self: Arc<Self>, embedder: Arc<dyn Embedder>, k: usize) -> Retriever {
        Retriever {
            store: self,
            embedder,
            k,
        }
    }

    /// # Errors
    ///
    /// Returns an error if the index cannot be serialized or written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, serde_json::to_string(self)?)
            .with_context(|| format!("Failed to write index to {}", path.display()))?;

        debug!("Saved {} entries to {}", self.len(), path.display());

        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the file is missing, is not a saved index, or mixes
    /// vector dimensions.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read index from {}", path.display()))?;

        let store: Self = serde_json::from_str(&content)
            .with_context(|| format!("{} is not a valid index", path.display()))?;

        if let Some(dim) = store.dimension() {
            if let Some(entry) = store.entries.iter().find(|e| e.vector.len() != dim) {
                bail!(
                    "{} is not a valid index: entry {} has dimension {}, expected {dim}",
                    path.display(),
                    entry.id,
                    entry.vector.len()
                );
            }
        }

        Ok(store)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Fetches the documents most relevant to a query.
#[derive(Clone)]
pub struct Retriever {
    store: Arc<VectorStore>,
    embedder: Arc<dyn Embedder>,
    k: usize,
}

impl Retriever {
    #[must_use]
    pub const fn k(&self) -> usize {
        self.k
    }

    /// # Errors
    ///
    /// Returns an error if the query cannot be embedded.
    pub async fn get_relevant_documents(&self, query: &str) -> Result<Vec<ScoredDocument>> {
        self.store
            .similarity_search(query, self.k, self.embedder.as_ref())
            .await
    }
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("documents", &self.store.len())
            .field("k", &self.k)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::tests::LetterEmbedder;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn finds_closest_text_first() {
        let store = VectorStore::from_texts(texts(&["aaaa", "bbbb", "aaab"]), &LetterEmbedder)
            .await
            .unwrap();

        let results = store.similarity_search("aaaa", 2, &LetterEmbedder).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].text, "aaaa");
        assert_eq!(results[0].score, 0.0);
        assert_eq!(results[1].text, "aaab");
    }

    #[test]
    fn ties_keep_insertion_order() {
        let mut store = VectorStore::default();
        store.add("first".into(), vec![1.0, 0.0]).unwrap();
        store.add("second".into(), vec![0.0, 1.0]).unwrap();

        let results = store.similarity_search_with_score(&[0.0, 0.0], 10).unwrap();

        assert_eq!(results[0].text, "first");
        assert_eq!(results[1].text, "second");
    }

    #[test]
    fn rejects_mismatched_dimensions() {
        let mut store = VectorStore::default();
        store.add("a".into(), vec![1.0, 0.0]).unwrap();

        assert!(store.add("b".into(), vec![1.0]).is_err());
        assert!(store.similarity_search_with_score(&[1.0], 1).is_err());
    }

    #[test]
    fn scores_are_squared_distances() {
        let mut store = VectorStore::default();
        store.add("far".into(), vec![3.0, 4.0]).unwrap();

        let results = store.similarity_search_with_score(&[0.0, 0.0], 1).unwrap();

        assert_eq!(results[0].score, 25.0);
    }

    #[test]
    fn load_rejects_mixed_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        fs::write(
            &path,
            serde_json::json!({
                "entries": [
                    { "id": Uuid::new_v4(), "text": "a", "vector": [1.0, 0.0] },
                    { "id": Uuid::new_v4(), "text": "b", "vector": [1.0] },
                ]
            })
            .to_string(),
        )
        .unwrap();

        let err = VectorStore::load(&path).unwrap_err();
        assert!(err.to_string().contains("has dimension 1, expected 2"));
    }

    #[test]
    fn empty_store_returns_nothing() {
        let results = VectorStore::default()
            .similarity_search_with_score(&[1.0, 2.0], 4)
            .unwrap();

        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn retriever_uses_configured_k() {
        let store = VectorStore::from_texts(texts(&["a", "b", "c", "d", "e"]), &LetterEmbedder)
            .await
            .unwrap();

        let retriever = Arc::new(store).as_retriever(Arc::new(LetterEmbedder), 3);
        let documents = retriever.get_relevant_documents("c").await.unwrap();

        assert_eq!(documents.len(), 3);
        assert_eq!(documents[0].text, "c");
    }

    #[tokio::test]
    async fn survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let store = VectorStore::from_texts(texts(&["hello", "world"]), &LetterEmbedder)
            .await
            .unwrap();
        store.save(&path).unwrap();

        let loaded = VectorStore::load(&path).unwrap();
        let results = loaded.similarity_search("world", 1, &LetterEmbedder).await.unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(results[0].text, "world");
    }
}
