//! In-memory evidence store.
//!
//! Reference implementation of [`EvidenceStore`] used by tests and by
//! embedders of the core that keep their corpus in process. Enforces the
//! store-side invariants: fixed embedding dimensionality and chunk
//! immutability (re-ingest adds chunks under a new document id rather than
//! mutating existing ones).

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use citeline_core::{Chunk, Error, EvidenceStore, QueryFilters, Result};

#[derive(Default)]
struct StoreInner {
    chunks: Vec<Arc<Chunk>>,
    /// workspace id → document ids in that workspace
    workspaces: HashMap<Uuid, HashSet<Uuid>>,
}

/// Thread-safe in-memory chunk store with a fixed embedding dimension.
pub struct InMemoryEvidenceStore {
    inner: RwLock<StoreInner>,
    dimension: usize,
}

impl InMemoryEvidenceStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            dimension,
        }
    }

    /// Insert a chunk, optionally registering its document in a workspace.
    ///
    /// Rejects embeddings whose dimension differs from the store's fixed
    /// dimensionality. Chunks without embeddings are accepted (they remain
    /// lexically retrievable).
    pub fn insert_chunk(&self, chunk: Chunk, workspace_id: Option<Uuid>) -> Result<()> {
        if let Some(embedding) = &chunk.embedding {
            if embedding.len() != self.dimension {
                return Err(Error::Store(format!(
                    "embedding dimension {} does not match store dimension {}",
                    embedding.len(),
                    self.dimension
                )));
            }
        }
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if let Some(ws) = workspace_id {
            inner.workspaces.entry(ws).or_default().insert(chunk.document_id);
        }
        inner.chunks.push(Arc::new(chunk));
        Ok(())
    }

    /// Insert a batch of chunks for one document.
    pub fn insert_document(&self, chunks: Vec<Chunk>, workspace_id: Option<Uuid>) -> Result<()> {
        for chunk in chunks {
            self.insert_chunk(chunk, workspace_id)?;
        }
        Ok(())
    }

    /// Total chunks stored.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EvidenceStore for InMemoryEvidenceStore {
    async fn fetch_chunks(&self, filters: &QueryFilters) -> Result<Vec<Arc<Chunk>>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let workspace_docs = filters
            .workspace_id
            .map(|ws| inner.workspaces.get(&ws).cloned().unwrap_or_default());

        let hits = inner
            .chunks
            .iter()
            .filter(|chunk| {
                if let Some(ids) = &filters.document_ids {
                    if !ids.contains(&chunk.document_id) {
                        return false;
                    }
                }
                if let Some(docs) = &workspace_docs {
                    if !docs.contains(&chunk.document_id) {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();
        Ok(hits)
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use citeline_core::Section;

    fn chunk(document_id: Uuid, embedding: Option<Vec<f32>>) -> Chunk {
        Chunk {
            id: Uuid::new_v4(),
            document_id,
            section: Section::Results,
            page_start: 1,
            page_end: 2,
            text: "text".to_string(),
            embedding,
            table: None,
        }
    }

    #[tokio::test]
    async fn insert_and_fetch_unscoped() {
        let store = InMemoryEvidenceStore::new(4);
        store.insert_chunk(chunk(Uuid::new_v4(), None), None).unwrap();
        let hits = store.fetch_chunks(&QueryFilters::default()).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn wrong_dimension_rejected() {
        let store = InMemoryEvidenceStore::new(4);
        let result = store.insert_chunk(chunk(Uuid::new_v4(), Some(vec![1.0, 2.0])), None);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn missing_embedding_accepted() {
        let store = InMemoryEvidenceStore::new(4);
        store.insert_chunk(chunk(Uuid::new_v4(), None), None).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn document_filter_scopes_results() {
        let store = InMemoryEvidenceStore::new(4);
        let doc_a = Uuid::new_v4();
        let doc_b = Uuid::new_v4();
        store.insert_chunk(chunk(doc_a, None), None).unwrap();
        store.insert_chunk(chunk(doc_b, None), None).unwrap();

        let filters = QueryFilters {
            document_ids: Some(vec![doc_a]),
            workspace_id: None,
        };
        let hits = store.fetch_chunks(&filters).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document_id, doc_a);
    }

    #[tokio::test]
    async fn workspace_filter_scopes_results() {
        let store = InMemoryEvidenceStore::new(4);
        let ws = Uuid::new_v4();
        let in_ws = Uuid::new_v4();
        let out_ws = Uuid::new_v4();
        store.insert_chunk(chunk(in_ws, None), Some(ws)).unwrap();
        store.insert_chunk(chunk(out_ws, None), None).unwrap();

        let filters = QueryFilters {
            document_ids: None,
            workspace_id: Some(ws),
        };
        let hits = store.fetch_chunks(&filters).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document_id, in_ws);
    }

    #[tokio::test]
    async fn unknown_workspace_returns_empty() {
        let store = InMemoryEvidenceStore::new(4);
        store.insert_chunk(chunk(Uuid::new_v4(), None), None).unwrap();
        let filters = QueryFilters {
            document_ids: None,
            workspace_id: Some(Uuid::new_v4()),
        };
        let hits = store.fetch_chunks(&filters).await.unwrap();
        assert!(hits.is_empty());
    }
}
