use crate::archive;
use crate::budget::ExpansionMeter;
use crate::chunking::ChunkingConfig;
use crate::email::MsgScanner;
use crate::error::IngestError;
use crate::extractor::{decode_text_bounded, extract_pdf_text_or_fallback, LopdfExtractor};
use crate::models::{
    FileKind, IngestionOptions, IngestionReport, ProcessedFile, RawInput, SkippedFile,
};
use crate::persist::ChunkPersister;
use crate::scratch::ScratchTracker;
use crate::traits::{DocumentStore, Embedder, PdfTextExtractor};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info, warn};

type DispatchFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

#[derive(Debug)]
pub struct IngestScope {
    pub tracker: ScratchTracker,
    pub meter: ExpansionMeter,
    pub report: IngestionReport,
}

impl IngestScope {
    pub fn new(options: &IngestionOptions) -> Self {
        Self {
            tracker: ScratchTracker::new(options.scratch_root.clone()),
            meter: ExpansionMeter::new(options.budget),
            report: IngestionReport::default(),
        }
    }

    fn skip(&mut self, filename: &str, error: &IngestError) {
        warn!(%filename, error = %error, "file skipped");
        self.report.skipped_files.push(SkippedFile {
            filename: filename.to_string(),
            reason: error.to_string(),
        });
    }
}

pub struct IngestionPipeline<E, S, P = LopdfExtractor> {
    embedder: E,
    store: S,
    pdf: Arc<P>,
    scanner: MsgScanner,
    options: IngestionOptions,
}

impl<E, S> IngestionPipeline<E, S, LopdfExtractor>
where
    E: Embedder + Send + Sync,
    S: DocumentStore + Send + Sync,
{
    pub fn new(embedder: E, store: S, options: IngestionOptions) -> Result<Self, IngestError> {
        Self::with_pdf_extractor(embedder, store, LopdfExtractor, options)
    }
}

impl<E, S, P> IngestionPipeline<E, S, P>
where
    E: Embedder + Send + Sync,
    S: DocumentStore + Send + Sync,
    P: PdfTextExtractor + Send + Sync + 'static,
{
    pub fn with_pdf_extractor(
        embedder: E,
        store: S,
        pdf: P,
        options: IngestionOptions,
    ) -> Result<Self, IngestError> {
        ChunkingConfig::from(&options).validate()?;
        let scanner = MsgScanner::new(options.email_min_run_bytes, options.email_body_max_chars)?;

        Ok(Self {
            embedder,
            store,
            pdf: Arc::new(pdf),
            scanner,
            options,
        })
    }

    pub async fn process(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        container_id: &str,
    ) -> Vec<ProcessedFile> {
        self.process_with_report(bytes, filename, container_id)
            .await
            .files
    }

    pub async fn process_input(&self, input: RawInput) -> IngestionReport {
        self.process_with_report(input.bytes, &input.claimed_filename, &input.container_id)
            .await
    }

    pub async fn process_with_report(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        container_id: &str,
    ) -> IngestionReport {
        let mut scope = IngestScope::new(&self.options);
        self.dispatch(&mut scope, bytes, filename.to_string(), container_id, 0)
            .await;

        let swept = scope.tracker.sweep();
        let report = std::mem::take(&mut scope.report);
        info!(
            %filename,
            %container_id,
            files = report.files.len(),
            rejected = report.rejected_entries.len(),
            skipped = report.skipped_files.len(),
            scratch_dirs = swept,
            "ingestion finished"
        );
        report
    }

    fn dispatch<'a>(
        &'a self,
        scope: &'a mut IngestScope,
        bytes: Vec<u8>,
        filename: String,
        container_id: &'a str,
        depth: usize,
    ) -> DispatchFuture<'a> {
        Box::pin(async move {
            let kind = FileKind::from_filename(&filename);
            debug!(%filename, ?kind, depth, size = bytes.len(), "dispatching file");

            match kind {
                FileKind::Archive => {
                    self.dispatch_archive(scope, &bytes, &filename, container_id, depth)
                        .await
                }
                FileKind::Email => {
                    self.dispatch_email(scope, &bytes, &filename, container_id, depth)
                        .await
                }
                FileKind::Pdf => {
                    let text = self.extract_pdf(&filename, bytes).await;
                    self.persist_leaf(scope, &filename, container_id, &text).await;
                }
                FileKind::PlainText => {
                    let text = decode_text_bounded(&bytes, self.options.text_max_bytes);
                    self.persist_leaf(scope, &filename, container_id, &text).await;
                }
            }
        })
    }

    async fn dispatch_archive(
        &self,
        scope: &mut IngestScope,
        bytes: &[u8],
        filename: &str,
        container_id: &str,
        depth: usize,
    ) {
        if let Err(error) = scope.meter.check_depth(depth + 1) {
            scope.skip(filename, &error);
            return;
        }

        let unpacked = match archive::unpack(bytes, filename, &mut scope.tracker, &mut scope.meter) {
            Ok(unpacked) => unpacked,
            Err(error) => {
                scope.skip(filename, &error);
                return;
            }
        };

        scope.report.rejected_entries.extend(unpacked.rejected);
        scope.report.skipped_files.extend(unpacked.refused);

        for extracted in unpacked.files {
            let child = match tokio::fs::read(&extracted.path).await {
                Ok(child) => child,
                Err(error) => {
                    scope.skip(&extracted.original_name, &IngestError::Io(error));
                    continue;
                }
            };

            self.dispatch(scope, child, extracted.original_name, container_id, depth + 1)
                .await;
        }
    }

    async fn dispatch_email(
        &self,
        scope: &mut IngestScope,
        bytes: &[u8],
        filename: &str,
        container_id: &str,
        depth: usize,
    ) {
        let body = self.scanner.extract_body(bytes).unwrap_or_else(|| {
            debug!(%filename, "no printable runs in message, decoding as plain text");
            decode_text_bounded(bytes, self.options.text_max_bytes)
        });
        self.persist_leaf(scope, filename, container_id, &body).await;

        for attachment in self.scanner.recover_pdf_attachments(bytes) {
            if let Err(error) = scope.meter.check_depth(depth + 1) {
                scope.skip(&attachment.filename, &error);
                break;
            }
            debug!(%filename, attachment = %attachment.filename, "recovered attachment");
            self.dispatch(
                scope,
                attachment.bytes,
                attachment.filename,
                container_id,
                depth + 1,
            )
            .await;
        }
    }

    async fn extract_pdf(&self, filename: &str, bytes: Vec<u8>) -> String {
        let fallback_bytes = self.options.pdf_fallback_bytes;
        let head = decode_text_bounded(&bytes, fallback_bytes);
        let pdf = Arc::clone(&self.pdf);

        let extracted = tokio::task::spawn_blocking(move || {
            panic::catch_unwind(AssertUnwindSafe(|| {
                extract_pdf_text_or_fallback(pdf.as_ref(), &bytes, fallback_bytes)
            }))
        })
        .await;

        match extracted {
            Ok(Ok(text)) => text,
            Ok(Err(_)) => {
                warn!(%filename, "pdf extractor panicked, decoding leading bytes");
                head
            }
            Err(error) => {
                warn!(%filename, error = %error, "pdf extraction task failed, decoding leading bytes");
                head
            }
        }
    }

    async fn persist_leaf(
        &self,
        scope: &mut IngestScope,
        filename: &str,
        container_id: &str,
        text: &str,
    ) {
        let persister = ChunkPersister {
            embedder: &self.embedder,
            store: &self.store,
            chunking: ChunkingConfig::from(&self.options),
            preview_max_chars: self.options.preview_max_chars,
        };

        match persister.persist(container_id, filename, text).await {
            Ok(processed) => scope.report.files.push(processed),
            Err(error) => scope.skip(filename, &error),
        }
    }
}
