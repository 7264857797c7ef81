pub mod archive;
pub mod budget;
pub mod chunking;
pub mod dispatch;
pub mod email;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod models;
pub mod persist;
pub mod sanitizer;
pub mod scratch;
pub mod stores;
pub mod traits;

#[cfg(test)]
mod test_support;

pub use archive::{inspect as inspect_archive, unpack, EntryVerdict, ExtractedFile, UnpackedArchive};
pub use budget::ExpansionMeter;
pub use chunking::{chunk_spans, chunk_text, normalize_whitespace, ChunkingConfig, TextSpan};
pub use dispatch::{IngestScope, IngestionPipeline};
pub use email::{MsgScanner, RecoveredAttachment};
pub use embeddings::{
    CharacterNgramEmbedder, EmbeddingEndpointConfig, HttpEmbedder, DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{EmbeddingError, IngestError, StoreError};
pub use extractor::{decode_text_bounded, extract_pdf_text_or_fallback, LopdfExtractor};
pub use ingest::{discover_files, load_input};
pub use models::{
    ArchiveEntry, ChunkRecord, DocumentRecord, ExpansionBudget, FileKind, IngestionOptions,
    IngestionReport, NewDocument, ProcessedFile, RawInput, RejectedEntry, SkippedFile,
};
pub use persist::ChunkPersister;
pub use sanitizer::{check_entry_path, is_safe_entry_path, UnsafePath};
pub use scratch::ScratchTracker;
pub use stores::{InMemoryDocumentStore, StoreSnapshot};
pub use traits::{DocumentStore, Embedder, PdfTextExtractor};
