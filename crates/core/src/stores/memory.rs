use crate::error::StoreError;
use crate::models::{ChunkRecord, DocumentRecord, NewDocument};
use crate::traits::DocumentStore;
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreSnapshot {
    pub documents: Vec<DocumentRecord>,
    pub chunks: Vec<ChunkRecord>,
}

#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<BTreeMap<String, DocumentRecord>>,
    chunks: RwLock<Vec<ChunkRecord>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(&self, document_id: &str) -> Option<DocumentRecord> {
        self.documents
            .read()
            .ok()
            .and_then(|documents| documents.get(document_id).cloned())
    }

    pub fn chunks_for(&self, document_id: &str) -> Vec<ChunkRecord> {
        self.chunks
            .read()
            .map(|chunks| {
                chunks
                    .iter()
                    .filter(|chunk| chunk.document_id == document_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> Result<StoreSnapshot, StoreError> {
        let documents = self.documents.read().map_err(poisoned)?;
        let chunks = self.chunks.read().map_err(poisoned)?;

        let mut documents = documents.values().cloned().collect::<Vec<_>>();
        documents.sort_by(|left, right| left.created_at.cmp(&right.created_at));

        Ok(StoreSnapshot {
            documents,
            chunks: chunks.clone(),
        })
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("in-memory store lock poisoned".to_string())
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn create_document(&self, document: NewDocument) -> Result<String, StoreError> {
        let document_id = Uuid::new_v4().to_string();
        let record = DocumentRecord {
            document_id: document_id.clone(),
            container_id: document.container_id,
            filename: document.filename,
            content_preview: document.content_preview,
            checksum: document.checksum,
            is_processed: false,
            created_at: Utc::now(),
        };

        self.documents
            .write()
            .map_err(poisoned)?
            .insert(document_id.clone(), record);
        Ok(document_id)
    }

    async fn create_chunk(&self, chunk: ChunkRecord) -> Result<(), StoreError> {
        if !self.documents.read().map_err(poisoned)?.contains_key(&chunk.document_id) {
            return Err(StoreError::UnknownDocument(chunk.document_id));
        }

        self.chunks.write().map_err(poisoned)?.push(chunk);
        Ok(())
    }

    async fn mark_processed(&self, document_id: &str) -> Result<(), StoreError> {
        let mut documents = self.documents.write().map_err(poisoned)?;
        let record = documents
            .get_mut(document_id)
            .ok_or_else(|| StoreError::UnknownDocument(document_id.to_string()))?;
        record.is_processed = true;
        Ok(())
    }
}
