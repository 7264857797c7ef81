use crate::error::IngestError;
use regex::bytes::Regex;

// Byte scan over the container, not a compound-file parse.
const PDF_ATTACHMENT_PATTERN: &str = r"(?s-u)%PDF-.*?%%EOF";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredAttachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct MsgScanner {
    printable_run: Regex,
    pdf_attachment: Regex,
    max_body_chars: usize,
}

impl MsgScanner {
    pub fn new(min_run_bytes: usize, max_body_chars: usize) -> Result<Self, IngestError> {
        let printable_run = Regex::new(&format!(
            r"(?-u)[\x20-\x7E\t\r\n]{{{},}}",
            min_run_bytes.max(1)
        ))?;
        let pdf_attachment = Regex::new(PDF_ATTACHMENT_PATTERN)?;

        Ok(Self {
            printable_run,
            pdf_attachment,
            max_body_chars,
        })
    }

    pub fn extract_body(&self, bytes: &[u8]) -> Option<String> {
        let runs = self
            .printable_run
            .find_iter(bytes)
            .map(|found| String::from_utf8_lossy(found.as_bytes()).trim().to_string())
            .filter(|run| !run.is_empty())
            .collect::<Vec<_>>();

        if runs.is_empty() {
            return None;
        }

        let body = runs.join("\n");
        Some(body.chars().take(self.max_body_chars).collect())
    }

    pub fn recover_pdf_attachments(&self, bytes: &[u8]) -> Vec<RecoveredAttachment> {
        self.pdf_attachment
            .find_iter(bytes)
            .enumerate()
            .map(|(index, found)| RecoveredAttachment {
                filename: format!("attachment_{}.pdf", index + 1),
                bytes: found.as_bytes().to_vec(),
            })
            .collect()
    }
}
