//! Block Translator CLI - translate the text blocks of a PDF in place.

use anyhow::{Context, Result};
use blocktrans_core::{
    AppConfig, Backend, Lang, LayoutMode, PageRange, PdfDocument, PdfTranslator, TextColor,
    TranslateJob, TranslationReport, output_filename,
};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Clone, ValueEnum)]
enum ColorOption {
    Black,
    DarkRed,
    Blue,
}

impl From<ColorOption> for TextColor {
    fn from(opt: ColorOption) -> Self {
        match opt {
            ColorOption::Black => Self::black(),
            ColorOption::DarkRed => Self::dark_red(),
            ColorOption::Blue => Self::blue(),
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum BackendOption {
    Google,
    Openai,
}

impl From<BackendOption> for Backend {
    fn from(opt: BackendOption) -> Self {
        match opt {
            BackendOption::Google => Self::Google,
            BackendOption::Openai => Self::OpenAi,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "pdf-block-translate")]
#[command(author, version, about = "Translate the text blocks of a PDF and overlay the result", long_about = None)]
struct Args {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Output PDF file (default: <name>_translated_<HHMMSS>.pdf next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Source language code ("auto" to detect)
    #[arg(short = 's', long)]
    source: Option<String>,

    /// Target language code
    #[arg(short = 't', long)]
    target: Option<String>,

    /// Pages to translate, 1-based: "3", "2-5" or "4-" (default: all)
    #[arg(long)]
    pages: Option<String>,

    /// Translation backend
    #[arg(long, value_enum, env = "BLOCKTRANS_BACKEND")]
    backend: Option<BackendOption>,

    /// API base URL of the backend
    #[arg(long, env = "BLOCKTRANS_API_BASE")]
    api_base: Option<String>,

    /// API key (OpenAI-compatible backend)
    #[arg(long, env = "BLOCKTRANS_API_KEY")]
    api_key: Option<String>,

    /// Model name (OpenAI-compatible backend)
    #[arg(long, env = "BLOCKTRANS_MODEL")]
    model: Option<String>,

    /// Seconds before a translation request is abandoned
    #[arg(long)]
    timeout: Option<u64>,

    /// Attempts per block
    #[arg(long)]
    retries: Option<u32>,

    /// Translation text color
    #[arg(long, value_enum)]
    color: Option<ColorOption>,

    /// Starting font size in points
    #[arg(long)]
    font_size: Option<f32>,

    /// Keep the font size fixed instead of shrinking text to fit
    #[arg(long)]
    fixed: bool,

    /// Do not put the overlay in a toggleable layer
    #[arg(long)]
    no_layer: bool,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Disable the translation memo
    #[arg(long)]
    no_cache: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// Apply command line overrides on top of file configuration.
    fn apply(&self, config: &mut AppConfig) {
        if let Some(ref source) = self.source {
            config.source_lang = Lang::new(source);
        }
        if let Some(ref target) = self.target {
            config.target_lang = Lang::new(target);
        }
        if let Some(ref backend) = self.backend {
            config.translator.backend = backend.clone().into();
        }
        if let Some(ref api_base) = self.api_base {
            config.translator.api_base = Some(api_base.clone());
        }
        if let Some(ref api_key) = self.api_key {
            config.translator.api_key = Some(api_key.clone());
        }
        if let Some(ref model) = self.model {
            config.translator.model.clone_from(model);
        }
        if let Some(timeout) = self.timeout {
            config.translator.timeout_secs = timeout;
        }
        if let Some(retries) = self.retries {
            config.translator.retry_count = retries;
        }
        if let Some(ref color) = self.color {
            config.text_color = color.clone().into();
        }
        if let Some(font_size) = self.font_size {
            config.overlay.font_size = font_size;
            config.overlay.min_font_size = config.overlay.min_font_size.min(font_size);
        }
        if self.fixed {
            config.overlay.layout = LayoutMode::Fixed;
        }
        if self.no_layer {
            config.overlay.layer = false;
        }
        if self.no_cache {
            config.cache.memory_enabled = false;
        }
    }
}

/// Default output path: generated file name in the input's directory.
fn default_output_path(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("document.pdf");
    input.with_file_name(output_filename(name))
}

#[allow(clippy::print_stdout)]
fn print_summary(report: &TranslationReport, output: &Path) {
    println!("Translated PDF saved to: {}", output.display());
    println!(
        "  {} translated, {} untranslated, {} empty, {} not rendered ({} blocks on {} pages)",
        report.translated,
        report.passthrough,
        report.skipped_empty,
        report.render_failed,
        report.blocks_total,
        report.pages_processed,
    );
    if report.lossy > 0 {
        println!("  {} blocks contain characters the overlay font cannot show", report.lossy);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging
    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    // Load or create config
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };
    args.apply(&mut config);

    // Load input PDF
    info!("Loading PDF: {}", args.input.display());
    let doc = PdfDocument::from_file(&args.input)
        .with_context(|| format!("Failed to load PDF: {}", args.input.display()))?;
    info!("Document has {} pages", doc.page_count());

    let range = match args.pages {
        Some(ref spec) => PageRange::parse(spec, doc.page_count())
            .with_context(|| format!("Invalid page selection '{spec}'"))?,
        None => PageRange::all(doc.page_count()).context("Document has no pages")?,
    };

    let translator = PdfTranslator::new(config.clone())
        .context("Failed to initialize translator")?;

    // Ctrl-C stops the run before the next block
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current block");
            flag.store(true, Ordering::Relaxed);
        }
    });

    // Setup progress bar
    let pb = ProgressBar::new(0);
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} blocks {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let bar = pb.clone();
    let job = TranslateJob::new(&config)
        .with_range(range)
        .with_cancel(cancel)
        .with_progress(move |progress| {
            bar.set_length(progress.total as u64);
            bar.set_position(progress.completed as u64);
            bar.set_message(format!("(page {})", progress.page + 1));
        });

    let result = translator.translate_document(&doc, &job).await;
    pb.finish_and_clear();
    let translated = result.context("Translation failed")?;

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input));

    std::fs::write(&output_path, &translated.bytes)
        .with_context(|| format!("Failed to write output: {}", output_path.display()))?;

    print_summary(&translated.report, &output_path);

    Ok(())
}
