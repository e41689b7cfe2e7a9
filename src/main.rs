use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;

use ledgerlens_core::batch::{BatchContext, BatchCoordinator, BatchReport, BatchStatus};
use ledgerlens_core::config::Config;
use ledgerlens_core::document::UploadedFile;
use ledgerlens_core::error::PipelineError;
use ledgerlens_core::pipeline::{ExtractionPipeline, ExtractionRequest};
use ledgerlens_core::prompt::Template;
use ledgerlens_core::store::{InMemoryExpenseStore, InMemoryReceiptStorage};
use ledgerlens_core::vault::EnvVaultProvider;
use ledgerlens_vision::Document;

/// Read receipts and odometer photos with vision AI backends
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract receipt fields from one image or PDF
    Scan {
        file: PathBuf,

        /// openai, gemini, claude or openrouter (default from config)
        #[arg(short, long, default_value = "")]
        backend: String,

        /// general, travel or odometer (default from config)
        #[arg(short, long)]
        template: Option<String>,
    },

    /// Read the total distance from an odometer photo
    Odometer {
        file: PathBuf,

        #[arg(short, long, default_value = "")]
        backend: String,
    },

    /// Process several receipts into expense records
    Batch {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(short, long, default_value = "")]
        backend: String,

        #[arg(short, long)]
        template: Option<String>,

        /// Trip name attached to every expense
        #[arg(long)]
        trip: Option<String>,

        /// Comment attached to every expense
        #[arg(long)]
        comments: Option<String>,
    },

    /// Show each backend's capabilities and credential status
    Backends,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_subscriber();
    let cli = Cli::parse();

    let config_path = resolve_config_path(cli.config.as_deref());
    let mut config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    config
        .resolve_secrets(&EnvVaultProvider)
        .await
        .context("failed to resolve backend credentials")?;
    config.validate().context("invalid configuration")?;

    let pipeline = ExtractionPipeline::from_config(&config);
    tracing::info!(
        config = %config_path.display(),
        default_backend = %config.extraction.default_backend,
        credentialed = config.configured_backends().len(),
        "ledgerlens ready"
    );

    match cli.command {
        Command::Scan {
            file,
            backend,
            template,
        } => scan(&pipeline, &file, &backend, template.as_deref()).await,
        Command::Odometer { file, backend } => odometer(&pipeline, &file, &backend).await,
        Command::Batch {
            files,
            backend,
            template,
            trip,
            comments,
        } => {
            let ctx = BatchContext {
                template: template_or_default(&pipeline, template.as_deref()),
                requested_backend: backend,
                trip_name: trip,
                comments,
            };
            batch(&pipeline, &files, &ctx).await
        }
        Command::Backends => backends(&pipeline, &config),
    }
}

fn init_subscriber() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config_path(cli_path: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_path {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var("LEDGERLENS_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

fn template_or_default(pipeline: &ExtractionPipeline, name: Option<&str>) -> Template {
    name.map_or_else(|| pipeline.default_template(), Template::from_name)
}

fn load_document(path: &Path) -> anyhow::Result<Document> {
    let file = UploadedFile::from_path(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    file.to_document().ok_or_else(|| {
        PipelineError::UnsupportedFile {
            filename: file.original_filename.clone(),
        }
        .into()
    })
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{out}");
    Ok(())
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn scan(
    pipeline: &ExtractionPipeline,
    path: &Path,
    backend: &str,
    template: Option<&str>,
) -> anyhow::Result<ExitCode> {
    let document = load_document(path)?;
    let request = ExtractionRequest::new(document, template_or_default(pipeline, template))
        .with_backend(backend);
    let result = pipeline.extract(&request).await;
    print_json(&result)?;
    Ok(exit_code(result.success))
}

async fn odometer(
    pipeline: &ExtractionPipeline,
    path: &Path,
    backend: &str,
) -> anyhow::Result<ExitCode> {
    let document = load_document(path)?;
    let result = pipeline.read_odometer(&document, backend).await;
    print_json(&result)?;
    Ok(exit_code(result.success))
}

async fn run_batch(
    pipeline: &ExtractionPipeline,
    paths: &[PathBuf],
    ctx: &BatchContext,
) -> BatchReport {
    let storage = InMemoryReceiptStorage::new();
    let expenses = InMemoryExpenseStore::new();
    BatchCoordinator::new(pipeline, &storage, &expenses)
        .process_paths(paths, ctx)
        .await
}

async fn batch(
    pipeline: &ExtractionPipeline,
    paths: &[PathBuf],
    ctx: &BatchContext,
) -> anyhow::Result<ExitCode> {
    let report = run_batch(pipeline, paths, ctx).await;
    print_json(&report)?;
    Ok(exit_code(
        report
            .results
            .iter()
            .all(|r| r.status == BatchStatus::Success),
    ))
}

fn backends(pipeline: &ExtractionPipeline, config: &Config) -> anyhow::Result<ExitCode> {
    let rows: Vec<_> = pipeline
        .capabilities()
        .iter()
        .map(|cap| {
            let settings = config.provider(cap.backend);
            json!({
                "backend": cap.backend,
                "model": settings.model,
                "baseUrl": settings.base_url,
                "supportsImage": cap.supports_image,
                "supportsPdf": cap.supports_pdf,
                "hasCredential": cap.has_credential,
                "credentialVar": cap.backend.api_key_var(),
                "default": cap.backend == config.extraction.default_backend,
            })
        })
        .collect();
    print_json(&rows)?;
    Ok(ExitCode::SUCCESS)
}
