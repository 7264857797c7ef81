use crate::chunking::{chunk_text, ChunkingConfig};
use crate::error::IngestError;
use crate::models::{ChunkRecord, NewDocument, ProcessedFile};
use crate::traits::{DocumentStore, Embedder};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

pub struct ChunkPersister<'a, E: ?Sized, S: ?Sized> {
    pub embedder: &'a E,
    pub store: &'a S,
    pub chunking: ChunkingConfig,
    pub preview_max_chars: usize,
}

impl<'a, E, S> ChunkPersister<'a, E, S>
where
    E: Embedder + Send + Sync + ?Sized,
    S: DocumentStore + Send + Sync + ?Sized,
{
    pub async fn persist(
        &self,
        container_id: &str,
        filename: &str,
        text: &str,
    ) -> Result<ProcessedFile, IngestError> {
        let chunks = chunk_text(text, self.chunking)?;

        let document_id = self
            .store
            .create_document(NewDocument {
                container_id: container_id.to_string(),
                filename: filename.to_string(),
                content_preview: text.chars().take(self.preview_max_chars).collect(),
                checksum: digest_text(text),
            })
            .await?;

        let mut chunks_created = 0usize;
        for (index, content) in chunks.into_iter().enumerate() {
            let embedding = match self.embedder.embed(&content).await {
                Ok(embedding) => embedding,
                Err(error) => {
                    warn!(%filename, %document_id, chunk_index = index, error = %error, "embedding failed, skipping chunk");
                    continue;
                }
            };

            let record = ChunkRecord {
                document_id: document_id.clone(),
                content,
                chunk_index: index as u64,
                embedding,
            };

            match self.store.create_chunk(record).await {
                Ok(()) => chunks_created += 1,
                Err(error) => {
                    warn!(%filename, %document_id, chunk_index = index, error = %error, "chunk write failed, skipping chunk");
                }
            }
        }

        self.store.mark_processed(&document_id).await?;
        info!(%filename, %document_id, chunks_created, "document processed");

        Ok(ProcessedFile {
            document_id,
            filename: filename.to_string(),
            chunks_created,
        })
    }
}

fn digest_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::CharacterNgramEmbedder;
    use crate::error::EmbeddingError;
    use crate::stores::InMemoryDocumentStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailNthEmbedder {
        fail_on: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for FailNthEmbedder {
        fn dimensions(&self) -> usize {
            4
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == self.fail_on {
                Err(EmbeddingError::Request("upstream timed out".to_string()))
            } else {
                Ok(vec![0.25; 4])
            }
        }
    }

    struct AlwaysFailEmbedder;

    #[async_trait]
    impl Embedder for AlwaysFailEmbedder {
        fn dimensions(&self) -> usize {
            4
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::EmptyVector)
        }
    }

    fn persister<'a, E: Embedder + Send + Sync>(
        embedder: &'a E,
        store: &'a InMemoryDocumentStore,
    ) -> ChunkPersister<'a, E, InMemoryDocumentStore> {
        ChunkPersister {
            embedder,
            store,
            chunking: ChunkingConfig::default(),
            preview_max_chars: 10_000,
        }
    }

    fn long_text() -> String {
        "The contractor shall supply and install all materials. ".repeat(150)
    }

    #[tokio::test]
    async fn every_chunk_is_persisted_on_success() -> Result<(), IngestError> {
        let store = InMemoryDocumentStore::new();
        let embedder = CharacterNgramEmbedder::default();
        let text = long_text();
        let expected = chunk_text(&text, ChunkingConfig::default())?.len();

        let processed = persister(&embedder, &store)
            .persist("project-1", "scope.txt", &text)
            .await?;

        assert_eq!(processed.filename, "scope.txt");
        assert_eq!(processed.chunks_created, expected);
        let indices = store
            .chunks_for(&processed.document_id)
            .iter()
            .map(|chunk| chunk.chunk_index)
            .collect::<Vec<_>>();
        assert_eq!(indices, (0..expected as u64).collect::<Vec<_>>());
        Ok(())
    }

    #[tokio::test]
    async fn one_failed_embedding_leaves_a_gap() -> Result<(), IngestError> {
        let store = InMemoryDocumentStore::new();
        let embedder = FailNthEmbedder {
            fail_on: 1,
            calls: AtomicUsize::new(0),
        };
        let text = long_text();
        let total = chunk_text(&text, ChunkingConfig::default())?.len();
        assert!(total >= 3);

        let processed = persister(&embedder, &store)
            .persist("project-1", "scope.txt", &text)
            .await?;

        assert_eq!(processed.chunks_created, total - 1);
        let record = store.document(&processed.document_id);
        assert!(record.is_some_and(|doc| doc.is_processed));
        let indices = store
            .chunks_for(&processed.document_id)
            .iter()
            .map(|chunk| chunk.chunk_index)
            .collect::<Vec<_>>();
        assert!(!indices.contains(&1));
        assert!(indices.windows(2).all(|pair| pair[0] < pair[1]));
        Ok(())
    }

    #[tokio::test]
    async fn document_is_processed_even_when_no_chunk_succeeds() -> Result<(), IngestError> {
        let store = InMemoryDocumentStore::new();
        let processed = persister(&AlwaysFailEmbedder, &store)
            .persist("project-1", "scope.txt", &long_text())
            .await?;

        assert_eq!(processed.chunks_created, 0);
        assert!(store
            .document(&processed.document_id)
            .is_some_and(|doc| doc.is_processed));
        Ok(())
    }

    #[tokio::test]
    async fn preview_is_truncated() -> Result<(), IngestError> {
        let store = InMemoryDocumentStore::new();
        let embedder = CharacterNgramEmbedder::default();
        let text = "é".repeat(12_000);

        let processed = persister(&embedder, &store)
            .persist("project-1", "accents.txt", &text)
            .await?;

        let record = store.document(&processed.document_id);
        assert_eq!(
            record.map(|doc| doc.content_preview.chars().count()),
            Some(10_000)
        );
        Ok(())
    }
}
