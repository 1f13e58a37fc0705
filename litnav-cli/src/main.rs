use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use litnav_rag::{
    AskRequest, Chunker, GrobidConfig, GrobidExtractor, LitNavPipeline, OpenAIConfig,
    OpenAIEmbeddingProvider, OpenAIGenerator, RagConfig, RecursiveChunker, parse_tei,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const PREVIEW_CHARS: usize = 72;

/// Ask questions about research papers and get citation-tagged answers.
#[derive(Parser, Debug)]
#[command(name = "litnav", author, version, about, long_about = None)]
struct Cli {
    /// JSON file holding a serialized pipeline configuration
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Split a plain-text file into chunks and print them
    Chunk {
        file: PathBuf,
        /// Maximum characters per chunk (defaults to the configured value)
        #[arg(long)]
        chunk_size: Option<usize>,
        /// Characters carried between chunks (defaults to the configured value)
        #[arg(long)]
        overlap: Option<usize>,
    },
    /// Upload a PDF and answer one question about it
    Ask {
        pdf: PathBuf,
        #[arg(short, long)]
        question: String,
        /// Chunks handed to the model
        #[arg(short, long)]
        k: Option<usize>,
        /// Candidate pool size for MMR
        #[arg(long)]
        fetch_k: Option<usize>,
        #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
        openai_api_key: String,
        #[arg(long, env = "LITNAV_GROBID_URL", default_value = "http://localhost:8070")]
        grobid_url: String,
        #[arg(long, env = "LITNAV_EMBEDDING_MODEL", default_value = "text-embedding-3-large")]
        embedding_model: String,
        #[arg(long, default_value_t = 3072)]
        embedding_dimensions: usize,
        #[arg(long, env = "LITNAV_CHAT_MODEL", default_value = "gpt-4")]
        chat_model: String,
    },
    /// Parse a TEI XML file and print the extracted text and sections
    Tei { file: PathBuf },
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

fn load_config(path: Option<&Path>) -> Result<RagConfig> {
    let Some(path) = path else {
        return Ok(RagConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: RagConfig = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
    format!("{cut}…")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Chunk { file, chunk_size, overlap } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let chunker = RecursiveChunker::new(
                chunk_size.unwrap_or(config.chunk_size),
                overlap.unwrap_or(config.chunk_overlap),
            )?;

            let chunks = chunker.split("local", &text);
            for chunk in &chunks {
                println!("{:>4}  {:>5}  {}", chunk.index, chunk.char_count, preview(&chunk.text));
            }
            info!(chunk_count = chunks.len(), "chunked {}", file.display());
        }
        Commands::Tei { file } => {
            let xml = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let extracted = parse_tei(&xml)?;

            println!("{}", extracted.text);
            println!();
            for section in &extracted.sections {
                println!("{:>6}..{:<6} {}", section.start, section.end, section.name);
            }
            let chunks = RecursiveChunker::from_config(&config)?.chunk("local", &extracted);
            info!(
                sections = extracted.sections.len(),
                pages = extracted.pages.len(),
                chunk_count = chunks.len(),
                "parsed {}",
                file.display()
            );
        }
        Commands::Ask {
            pdf,
            question,
            k,
            fetch_k,
            openai_api_key,
            grobid_url,
            embedding_model,
            embedding_dimensions,
            chat_model,
        } => {
            let bytes =
                std::fs::read(&pdf).with_context(|| format!("failed to read {}", pdf.display()))?;
            let openai = OpenAIConfig::new(openai_api_key)
                .with_embedding_model(embedding_model, embedding_dimensions)
                .with_chat_model(chat_model);

            let pipeline = LitNavPipeline::builder()
                .extractor(Arc::new(GrobidExtractor::new(GrobidConfig::new(grobid_url))?))
                .embedding_provider(Arc::new(OpenAIEmbeddingProvider::new(openai.clone())?))
                .generator(Arc::new(OpenAIGenerator::new(openai)?))
                .config(config)
                .build()?;

            let filename = pdf.file_name().and_then(|name| name.to_str());
            let receipt = pipeline
                .upload_document(filename, &bytes)
                .await
                .with_context(|| format!("failed to upload {}", pdf.display()))?;

            if let Some(title) = &receipt.title {
                info!(chunk_count = receipt.chunk_count, "uploaded \"{title}\"");
            }

            let request = AskRequest { document_id: receipt.document_id, question, k, fetch_k };
            let response = pipeline.ask(&request).await?;
            println!("{}", response.answer);
        }
    }

    Ok(())
}
