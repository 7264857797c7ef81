use async_trait::async_trait;
use bid_ingest_core::{
    discover_files, inspect_archive, load_input, CharacterNgramEmbedder, Embedder,
    EmbeddingEndpointConfig, EmbeddingError, ExpansionBudget, HttpEmbedder, InMemoryDocumentStore,
    IngestionOptions, IngestionPipeline, DEFAULT_EMBEDDING_DIMENSIONS,
};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "bid-ingest", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Embedding endpoint. The local character n-gram embedder is used when unset.
    #[arg(long, env = "EMBEDDING_ENDPOINT")]
    embedding_endpoint: Option<String>,

    /// Bearer token for the embedding endpoint.
    #[arg(long, env = "EMBEDDING_API_KEY", hide_env_values = true)]
    embedding_api_key: Option<String>,

    /// Model name forwarded to the embedding endpoint.
    #[arg(long, env = "EMBEDDING_MODEL")]
    embedding_model: Option<String>,

    /// Expected embedding dimensions.
    #[arg(long, default_value_t = DEFAULT_EMBEDDING_DIMENSIONS)]
    embedding_dimensions: usize,

    /// Directory for unpacking scratch space. Defaults to the system temp dir.
    #[arg(long)]
    scratch_dir: Option<PathBuf>,

    /// Maximum archive nesting depth.
    #[arg(long, default_value = "8")]
    max_depth: usize,

    /// Maximum number of files extracted per upload.
    #[arg(long, default_value = "10000")]
    max_files: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a file, or every file below a directory, into one container.
    Ingest {
        /// Upload file or folder.
        path: PathBuf,
        /// Container (project) the documents belong to.
        #[arg(long)]
        container: String,
        /// Write the resulting documents and chunks as JSON.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List the entries of a ZIP archive with the path-check verdict.
    Inspect {
        /// ZIP archive to inspect.
        path: PathBuf,
    },
}

enum CliEmbedder {
    Local(CharacterNgramEmbedder),
    Remote(HttpEmbedder),
}

#[async_trait]
impl Embedder for CliEmbedder {
    fn dimensions(&self) -> usize {
        match self {
            CliEmbedder::Local(embedder) => embedder.dimensions(),
            CliEmbedder::Remote(embedder) => embedder.dimensions(),
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        match self {
            CliEmbedder::Local(embedder) => embedder.embed(text).await,
            CliEmbedder::Remote(embedder) => embedder.embed(text).await,
        }
    }
}

impl Cli {
    fn embedder(&self) -> anyhow::Result<CliEmbedder> {
        let Some(endpoint) = &self.embedding_endpoint else {
            return Ok(CliEmbedder::Local(CharacterNgramEmbedder {
                dimensions: self.embedding_dimensions,
            }));
        };

        let mut config = EmbeddingEndpointConfig::new(endpoint)?;
        config.api_key = self.embedding_api_key.clone();
        config.model = self.embedding_model.clone();
        config.dimensions = self.embedding_dimensions;
        Ok(CliEmbedder::Remote(HttpEmbedder::new(config)))
    }

    fn options(&self) -> IngestionOptions {
        IngestionOptions {
            scratch_root: self.scratch_dir.clone(),
            budget: ExpansionBudget {
                max_depth: self.max_depth,
                max_extracted_files: self.max_files,
                ..ExpansionBudget::default()
            },
            ..IngestionOptions::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "bid-ingest boot"
    );

    match &cli.command {
        Command::Ingest {
            path,
            container,
            output,
        } => {
            let store = Arc::new(InMemoryDocumentStore::new());
            let pipeline = IngestionPipeline::new(cli.embedder()?, store.clone(), cli.options())?;

            let files = discover_files(path);
            if files.is_empty() {
                anyhow::bail!("no files found at {}", path.display());
            }

            let mut total_chunks = 0usize;
            for file in files {
                let input = match load_input(&file, container) {
                    Ok(input) => input,
                    Err(error) => {
                        warn!(path = %file.display(), error = %error, "unreadable upload");
                        continue;
                    }
                };

                let report = pipeline.process_input(input).await;
                total_chunks += report.chunks_created();

                for processed in &report.files {
                    println!(
                        "{} document_id={} chunks={}",
                        processed.filename, processed.document_id, processed.chunks_created
                    );
                }
                for rejected in &report.rejected_entries {
                    println!(
                        "  rejected entry={} archive={} reason={}",
                        rejected.entry_path, rejected.archive, rejected.reason
                    );
                }
                for skipped in &report.skipped_files {
                    println!("  skipped {} reason={}", skipped.filename, skipped.reason);
                }
            }

            let snapshot = store.snapshot()?;
            println!(
                "{} documents, {} chunks ingested into {} at {}",
                snapshot.documents.len(),
                total_chunks,
                container,
                Utc::now().to_rfc3339()
            );

            if let Some(output) = output {
                tokio::fs::write(output, serde_json::to_vec_pretty(&snapshot)?).await?;
                info!(path = %output.display(), "wrote store snapshot");
            }
        }
        Command::Inspect { path } => {
            let bytes = tokio::fs::read(path).await?;
            for verdict in inspect_archive(&bytes)? {
                let status = match (&verdict.rejection, verdict.is_directory) {
                    (_, true) => "dir".to_string(),
                    (None, false) => "ok".to_string(),
                    (Some(reason), false) => format!("REJECT ({reason})"),
                };
                println!("{status:<32} {:>10} {}", verdict.size, verdict.name);
            }
        }
    }

    Ok(())
}
