use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::info;

use folio::config::PipelineConfig;
use folio::pipeline::Pipeline;
use folio::reader::{DocumentReader, ReaderConfig};
use folio::sentence_detector::TokenizerChoice;

#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(about = "Split a book into pages, words and sentences with exact character offsets")]
#[command(version)]
struct Args {
    /// Plain text or lightly marked-up document to process
    input: PathBuf,

    /// TOML pipeline configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Target page length in characters
    #[arg(long)]
    target_length: Option<usize>,

    /// Allowed page length deviation, as a fraction of the target
    #[arg(long)]
    tolerance: Option<f64>,

    /// Sentence tokenizer backend
    #[arg(long, value_enum)]
    tokenizer: Option<TokenizerChoice>,

    /// Skip language detection and use this language code
    #[arg(long)]
    language: Option<String>,

    /// Max pages processed concurrently (0 = one per CPU)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Use memory-mapped I/O instead of async buffered
    #[arg(long)]
    use_mmap: bool,

    /// Suppress console progress bars
    #[arg(long)]
    no_progress: bool,

    /// Write JSON output here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short)]
    verbose: bool,
}

impl Args {
    /// Config file (or defaults) with command line overrides applied
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_toml_file(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(target_length) = self.target_length {
            config.paging.target_length = target_length;
        }
        if let Some(tolerance) = self.tolerance {
            config.paging.tolerance = tolerance;
        }
        if let Some(tokenizer) = self.tokenizer {
            config.sentences.tokenizer = tokenizer;
        }
        if let Some(language) = &self.language {
            config.language_override = Some(language.clone());
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        config.paging.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // WHY: structured JSON logging on stderr keeps stdout free for the document output
    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(if args.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO })
        .with_writer(std::io::stderr)
        .json()
        .init();

    info!("Starting folio");
    info!(?args, "Parsed CLI arguments");

    // WHY: validate input early to fail fast with clear error
    if !args.input.is_file() {
        anyhow::bail!("Input is not a file: {}", args.input.display());
    }

    let config = args.pipeline_config()?;
    let reader = DocumentReader::new(ReaderConfig {
        use_mmap: args.use_mmap,
        ..Default::default()
    });
    let (text, read_stats) = reader.read(&args.input).await?;

    let progress = if args.no_progress {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} pages ({eta}) {msg}")
                .context("Invalid progress template")?
                .progress_chars("#>-"),
        );
        pb
    };

    let pipeline = Pipeline::new(config)?;
    let processed = pipeline
        .process_with_progress(&text, |done, total| {
            progress.set_length(total as u64);
            progress.set_position(done as u64);
        })
        .await?;
    progress.finish_with_message(format!("language: {}", processed.language));

    let json = serde_json::to_string_pretty(&processed).context("Failed to serialize output")?;
    match &args.output {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("Failed to write output to {}", path.display()))?;
            info!("Wrote output to {}", path.display());
        }
        None => println!("{json}"),
    }

    info!(
        "Finished {}: {} chars, {} pages, {} words, {} sentences",
        read_stats.file_path,
        read_stats.chars_read,
        processed.pages.len(),
        processed.word_count(),
        processed.sentence_count()
    );
    Ok(())
}
