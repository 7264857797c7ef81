use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct RawInput {
    pub bytes: Vec<u8>,
    pub claimed_filename: String,
    pub container_id: String,
}

#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub raw_path: String,
    pub bytes: Vec<u8>,
    pub is_directory: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedFile {
    pub document_id: String,
    pub filename: String,
    pub chunks_created: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    Archive,
    Email,
    Pdf,
    PlainText,
}

impl FileKind {
    pub fn from_filename(filename: &str) -> Self {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("zip") => FileKind::Archive,
            Some("msg") => FileKind::Email,
            Some("pdf") => FileKind::Pdf,
            _ => FileKind::PlainText,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub container_id: String,
    pub filename: String,
    pub content_preview: String,
    pub checksum: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub document_id: String,
    pub container_id: String,
    pub filename: String,
    pub content_preview: String,
    pub checksum: String,
    pub is_processed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub document_id: String,
    pub content: String,
    pub chunk_index: u64,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, Copy)]
pub struct ExpansionBudget {
    pub max_depth: usize,
    pub max_extracted_files: usize,
    pub max_extracted_bytes: u64,
    pub max_entry_bytes: u64,
}

impl Default for ExpansionBudget {
    fn default() -> Self {
        Self {
            max_depth: 8,
            max_extracted_files: 10_000,
            max_extracted_bytes: 1024 * 1024 * 1024,
            max_entry_bytes: 256 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub chunk_max_chars: usize,
    pub chunk_overlap_chars: usize,
    pub min_chunk_chars: usize,
    pub preview_max_chars: usize,
    pub text_max_bytes: usize,
    pub pdf_fallback_bytes: usize,
    pub email_min_run_bytes: usize,
    pub email_body_max_chars: usize,
    pub scratch_root: Option<PathBuf>,
    pub budget: ExpansionBudget,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunk_max_chars: 2_000,
            chunk_overlap_chars: 200,
            min_chunk_chars: 50,
            preview_max_chars: 10_000,
            text_max_bytes: 1024 * 1024,
            pdf_fallback_bytes: 10_240,
            email_min_run_bytes: 50,
            email_body_max_chars: 50_000,
            scratch_root: None,
            budget: ExpansionBudget::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedEntry {
    pub archive: String,
    pub entry_path: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub filename: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestionReport {
    pub files: Vec<ProcessedFile>,
    pub rejected_entries: Vec<RejectedEntry>,
    pub skipped_files: Vec<SkippedFile>,
}

impl IngestionReport {
    pub fn chunks_created(&self) -> usize {
        self.files.iter().map(|file| file.chunks_created).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::FileKind;

    #[test]
    fn file_kind_is_case_insensitive() {
        assert_eq!(FileKind::from_filename("Bundle.ZIP"), FileKind::Archive);
        assert_eq!(FileKind::from_filename("mail.Msg"), FileKind::Email);
        assert_eq!(FileKind::from_filename("scope.PDF"), FileKind::Pdf);
    }

    #[test]
    fn unknown_extensions_fall_back_to_plain_text() {
        assert_eq!(FileKind::from_filename("notes.txt"), FileKind::PlainText);
        assert_eq!(FileKind::from_filename("proposal.docx"), FileKind::PlainText);
        assert_eq!(FileKind::from_filename("README"), FileKind::PlainText);
        assert_eq!(FileKind::from_filename("archive.zip.bak"), FileKind::PlainText);
    }
}
