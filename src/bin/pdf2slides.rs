//! CLI binary for edgequake-pdf2slides.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `IngestConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2slides::{
    generate, ingest, inspect, IngestConfig, Ingestion, PageSelection, PipelineProgressCallback,
    ProgressCallback, ResultStore,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per finished slide. Slides finish out
/// of order, so start times are tracked per ordinal.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} slides  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Enriching");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, ordinal: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut times| times.remove(&ordinal))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_items: usize) {
        self.activate_bar(total_items);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Enriching {total_items} slides…"))
        ));
    }

    fn on_item_start(&self, ordinal: usize, _total_items: usize) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(ordinal, Instant::now());
        }
        self.bar.set_message(format!("slide {}", ordinal + 1));
    }

    fn on_stage_complete(&self, ordinal: usize, stage: &str) {
        self.bar.set_message(format!("slide {}: {stage}", ordinal + 1));
    }

    fn on_item_complete(&self, ordinal: usize, total_items: usize) {
        let secs = self.elapsed_secs(ordinal);
        self.bar.println(format!(
            "  {} Slide {:>3}/{:<3}  {}",
            green("✓"),
            ordinal + 1,
            total_items,
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_item_error(&self, ordinal: usize, total_items: usize, error: String) {
        let secs = self.elapsed_secs(ordinal);

        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error
        };
        self.bar.println(format!(
            "  {} Slide {:>3}/{:<3}  {}  {}",
            red("✗"),
            ordinal + 1,
            total_items,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total_items: usize, success_count: usize) {
        let failed = total_items.saturating_sub(success_count);
        self.bar.finish_and_clear();
        if failed == 0 {
            eprintln!(
                "{} {} slides enriched successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} slides enriched  ({} failed)",
                if failed == total_items { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total_items,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Structure and chunk a PDF (no API key needed)
  pdf2slides paper.pdf

  # Hybrid chunking, JSON output to a file
  pdf2slides --strategy hybrid --chunk-size 1200 --json paper.pdf -o paper.json

  # Specific pages, tables appended to page text
  pdf2slides --pages 3-15 --append-tables report.pdf

  # Enrich every slide with an LLM
  pdf2slides --enrich --model gpt-4.1-mini --provider openai paper.pdf -o slides.json

  # Let the LLM plan the slide list first
  pdf2slides --enrich --content-analysis paper.pdf -o slides.json

  # Inspect PDF metadata only
  pdf2slides --inspect-only paper.pdf

CHUNK STRATEGIES:
  recursive  paragraph, line, sentence, word boundaries (default)
  markdown   headings, rules, lists and fences first
  token      windows of word/punctuation tokens
  hybrid     structural segments, oversized ones split recursively

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to the pdfium shared library
  RUST_LOG                Override the log filter
"#;

/// Structure, chunk and enrich PDF documents into slides.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2slides",
    version,
    about = "Structure, chunk and enrich PDF documents into slide specifications",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Write JSON output to this file instead of stdout.
    #[arg(short, long, env = "PDF2SLIDES_OUTPUT")]
    output: Option<PathBuf>,

    /// Chunking strategy: recursive, markdown, token, hybrid.
    #[arg(long, env = "PDF2SLIDES_STRATEGY", default_value = "recursive")]
    strategy: String,

    /// Maximum chunk size (characters, or tokens for the token strategy).
    #[arg(long, env = "PDF2SLIDES_CHUNK_SIZE", default_value_t = 1000)]
    chunk_size: usize,

    /// Overlap between consecutive chunks. Must be smaller than the size.
    #[arg(long, env = "PDF2SLIDES_CHUNK_OVERLAP", default_value_t = 200)]
    chunk_overlap: usize,

    /// Pages scanned for font profiles.
    #[arg(long, env = "PDF2SLIDES_FONT_SAMPLE_PAGES", default_value_t = 5)]
    font_sample_pages: usize,

    /// Maximum concurrent page batches and slide tasks. 0 means unbounded.
    #[arg(short, long, env = "PDF2SLIDES_CONCURRENCY", default_value_t = 5)]
    concurrency: usize,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDF2SLIDES_PAGES", default_value = "all")]
    pages: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2SLIDES_PASSWORD")]
    password: Option<String>,

    /// Extract embedded images (re-encoded as PNG).
    #[arg(long, env = "PDF2SLIDES_EXTRACT_IMAGES")]
    extract_images: bool,

    /// Write extracted images to this directory (implies --extract-images).
    #[arg(long, env = "PDF2SLIDES_IMAGES_DIR")]
    images_dir: Option<PathBuf>,

    /// Skip table detection.
    #[arg(long, env = "PDF2SLIDES_NO_TABLES")]
    no_tables: bool,

    /// Append detected tables to page text before chunking.
    #[arg(long, env = "PDF2SLIDES_APPEND_TABLES")]
    append_tables: bool,

    /// Run the slide enrichment stages (needs an LLM provider).
    #[arg(long, env = "PDF2SLIDES_ENRICH")]
    enrich: bool,

    /// Ask the LLM to plan the slide list instead of one slide per chunk.
    #[arg(long, env = "PDF2SLIDES_CONTENT_ANALYSIS", requires = "enrich")]
    content_analysis: bool,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1-mini).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Max LLM output tokens per call.
    #[arg(long, env = "PDF2SLIDES_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDF2SLIDES_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Retries per LLM call.
    #[arg(long, env = "PDF2SLIDES_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Output JSON instead of a text summary.
    #[arg(long, env = "PDF2SLIDES_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2SLIDES_NO_PROGRESS")]
    no_progress: bool,

    /// Print PDF metadata only.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2SLIDES_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2SLIDES_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2SLIDES_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "PDF2SLIDES_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = cli.enrich && !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input).await.context("Failed to inspect PDF")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input);
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            if let Some(ref k) = meta.keywords {
                println!("Keywords:     {}", k);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(());
    }

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn PipelineProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Ingest only ──────────────────────────────────────────────────────
    if !cli.enrich {
        let ingestion = ingest(&cli.input, &config)
            .await
            .context("Ingestion failed")?;
        save_images(&cli, &ingestion).await?;
        if cli.json || cli.output.is_some() {
            let json =
                serde_json::to_string_pretty(&ingestion).context("Failed to serialise output")?;
            emit(&cli, &json).await?;
        } else if !cli.quiet {
            print_summary(&ingestion);
        }
        return Ok(());
    }

    // ── Ingest + enrich ──────────────────────────────────────────────────
    let store = ResultStore::new();
    let (ingestion, output) = generate(&cli.input, &config, &store, cli.content_analysis)
        .await
        .context("Slide generation failed")?;
    save_images(&cli, &ingestion).await?;

    let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
    emit(&cli, &json).await?;

    if !cli.quiet && !show_progress {
        eprintln!(
            "Enriched {}/{} slides from {} chunks in {}ms",
            output.succeeded,
            output.slides.len(),
            ingestion.stats.total_chunks,
            output.total_duration_ms
        );
    }
    Ok(())
}

/// Write to `--output` if given, else stdout.
async fn emit(cli: &Cli, text: &str) -> Result<()> {
    match cli.output {
        Some(ref path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            tokio::fs::write(path, text)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if !cli.quiet {
                eprintln!("{}  →  {}", green("✔"), bold(&path.display().to_string()));
            }
        }
        None => println!("{text}"),
    }
    Ok(())
}

/// Write every extracted image to `--images-dir`, if given.
async fn save_images(cli: &Cli, ingestion: &Ingestion) -> Result<()> {
    let Some(ref dir) = cli.images_dir else {
        return Ok(());
    };
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let mut written = 0usize;
    for image in ingestion.pages.iter().flat_map(|p| p.images.iter()) {
        let path = dir.join(image.file_name());
        tokio::fs::write(&path, &image.byte_data)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written += 1;
    }
    if !cli.quiet {
        eprintln!("{} {} images  →  {}", green("✔"), written, bold(&dir.display().to_string()));
    }
    Ok(())
}

fn print_summary(ingestion: &Ingestion) {
    let stats = &ingestion.stats;
    println!(
        "{} {}",
        cyan("◆"),
        bold(&ingestion.metadata.source_name())
    );
    println!(
        "  pages {}/{}  ({} empty)   chunks {}   est. slides {}   {}",
        stats.processed_pages,
        stats.total_pages,
        stats.empty_pages,
        stats.total_chunks,
        stats.estimated_slides,
        dim(&format!("{}ms", stats.total_duration_ms)),
    );
    if let Some(size) = ingestion.structure.body_font_size {
        println!(
            "  body font {:.1}pt   heading-like profiles {}",
            size, ingestion.structure.heading_profiles
        );
    }

    let info = &ingestion.chunking_info;
    let types: Vec<String> = info
        .content_types
        .iter()
        .map(|(t, n)| format!("{t}={n}"))
        .collect();
    println!(
        "  strategy {} (size {}, overlap {})   {}",
        info.strategy,
        info.size,
        info.overlap,
        types.join(" ")
    );

    if !ingestion.structure.sections.is_empty() {
        println!("\n{}", bold("Sections"));
        for section in ingestion.structure.sections.iter().take(20) {
            let page = section
                .page
                .map(|p| format!("p.{p}"))
                .unwrap_or_default();
            println!(
                "  {:<60} {:>6}  {}",
                section.title,
                page,
                dim(&format!("{:.2}", section.confidence()))
            );
        }
    }

    println!("\n{}", bold("Slides"));
    for slide in ingestion.slides() {
        println!("{}", slide.outline());
    }
}

/// Map CLI args to `IngestConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<IngestConfig> {
    let pages = parse_pages(&cli.pages)?;

    let mut builder = IngestConfig::builder()
        .chunk_strategy_name(&cli.strategy)
        .chunk_size(cli.chunk_size)
        .chunk_overlap(cli.chunk_overlap)
        .font_sample_pages(cli.font_sample_pages)
        .pages(pages)
        .extract_images(cli.extract_images || cli.images_dir.is_some())
        .detect_tables(!cli.no_tables)
        .append_tables(cli.append_tables)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .max_retries(cli.max_retries)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout);

    builder = if cli.concurrency == 0 {
        builder.unbounded()
    } else {
        builder.max_concurrency(cli.concurrency)
    };
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();
    if s == "all" {
        return Ok(PageSelection::All);
    }

    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start.trim().parse().context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;
        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!("Invalid page range '{}-{}': start must be <= end", start, end);
        }
        return Ok(PageSelection::Range(start, end));
    }

    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;
        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }
        return Ok(PageSelection::Set(pages));
    }

    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }
    Ok(PageSelection::Single(page))
}
