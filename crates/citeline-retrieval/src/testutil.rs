//! Shared test fixtures for the retrieval crate.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use citeline_core::{Chunk, EvidenceStore, QueryFilters, Result, Section, TableSchema};

/// Fixed-content evidence store for unit tests.
pub struct StaticStore {
    chunks: Vec<Arc<Chunk>>,
    dimension: usize,
}

impl StaticStore {
    pub fn new(chunks: Vec<Chunk>, dimension: usize) -> Self {
        Self {
            chunks: chunks.into_iter().map(Arc::new).collect(),
            dimension,
        }
    }
}

#[async_trait]
impl EvidenceStore for StaticStore {
    async fn fetch_chunks(&self, filters: &QueryFilters) -> Result<Vec<Arc<Chunk>>> {
        let hits = self
            .chunks
            .iter()
            .filter(|c| match &filters.document_ids {
                Some(ids) => ids.contains(&c.document_id),
                None => true,
            })
            .cloned()
            .collect();
        Ok(hits)
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }
}

/// Text chunk with a fresh id and no embedding.
pub fn chunk(text: &str, section: Section) -> Chunk {
    Chunk {
        id: Uuid::new_v4(),
        document_id: Uuid::new_v4(),
        section,
        page_start: 1,
        page_end: 1,
        text: text.to_string(),
        embedding: None,
        table: None,
    }
}

/// Text chunk carrying an embedding.
pub fn embedded_chunk(text: &str, section: Section, embedding: Vec<f32>) -> Chunk {
    let mut c = chunk(text, section);
    c.embedding = Some(embedding);
    c
}

/// Table chunk carrying a schema.
pub fn table_chunk(text: &str, schema: TableSchema) -> Chunk {
    let mut c = chunk(text, Section::Results);
    c.table = Some(schema);
    c
}
