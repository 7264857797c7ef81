use crate::error::{EmbeddingError, IngestError, StoreError};
use crate::models::{ChunkRecord, NewDocument};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait Embedder {
    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

#[async_trait]
pub trait DocumentStore {
    async fn create_document(&self, document: NewDocument) -> Result<String, StoreError>;

    async fn create_chunk(&self, chunk: ChunkRecord) -> Result<(), StoreError>;

    async fn mark_processed(&self, document_id: &str) -> Result<(), StoreError>;
}

pub trait PdfTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, IngestError>;
}

#[async_trait]
impl<T> Embedder for Arc<T>
where
    T: Embedder + Send + Sync + ?Sized,
{
    fn dimensions(&self) -> usize {
        self.as_ref().dimensions()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.as_ref().embed(text).await
    }
}

#[async_trait]
impl<T> DocumentStore for Arc<T>
where
    T: DocumentStore + Send + Sync + ?Sized,
{
    async fn create_document(&self, document: NewDocument) -> Result<String, StoreError> {
        self.as_ref().create_document(document).await
    }

    async fn create_chunk(&self, chunk: ChunkRecord) -> Result<(), StoreError> {
        self.as_ref().create_chunk(chunk).await
    }

    async fn mark_processed(&self, document_id: &str) -> Result<(), StoreError> {
        self.as_ref().mark_processed(document_id).await
    }
}
