//! CLI binary for doc2json.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use doc2json::{
    write_json, BatchEntry, BatchProgressCallback, DocumentType, ExtractionConfig,
    ExtractionResult, Extractor, ModelBackend, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One bar over the documents of a batch, one log line per document.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} documents  \
                 ⏱ {elapsed_precise}  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.reset_eta();
    }

    fn on_document_start(&self, _index: usize, _total: usize, filename: &str) {
        self.bar.set_message(filename.to_string());
    }

    fn on_document_complete(&self, completed: usize, total: usize, entry: &BatchEntry) {
        let line = match entry.result.failure() {
            None => format!(
                "  {} {:>3}/{:<3}  {}",
                green("✓"),
                completed,
                total,
                entry.filename
            ),
            Some(failure) => format!(
                "  {} {:>3}/{:<3}  {}  {}",
                red("✗"),
                completed,
                total,
                entry.filename,
                red(&failure.error),
            ),
        };
        self.bar.println(line);
        self.bar.set_position(completed as u64);
    }

    fn on_batch_complete(&self, total: usize, succeeded: usize) {
        self.bar.finish_and_clear();
        let failed = total.saturating_sub(succeeded);
        if failed == 0 {
            eprintln!(
                "{} {} documents extracted",
                green("✔"),
                bold(&succeeded.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} documents extracted  ({} failed)",
                red("✘"),
                bold(&succeeded.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Invoice to stdout
  doc2json invoice.pdf

  # Resume, written to a file
  doc2json -t resume cv.pdf -o cv.json

  # Batch: JSON array of {filename, data} / {filename, error}
  doc2json -t invoice jan.pdf feb.pdf mar.pdf -o invoices.json

  # OCR only, no model call
  doc2json --ocr-only scan.pdf > scan.txt

  # Reuse OCR text from a previous run
  doc2json --from-text scan.txt

  # A hosted provider instead of Ollama
  doc2json --provider openai --model gpt-4.1-nano invoice.pdf

ENVIRONMENT VARIABLES:
  OLLAMA_HOST         Ollama base URL (default http://localhost:11434)
  DOC2JSON_MODEL      Model ID (default llama3)
  TESSERACT_CMD       Tesseract executable (default: tesseract on PATH)
  PDFIUM_LIB_PATH     Directory or file of libpdfium
  OPENAI_API_KEY …    API keys for --provider
"#;

/// Extract structured JSON from invoices and resumes.
#[derive(Parser, Debug)]
#[command(
    name = "doc2json",
    version,
    about = "Extract structured JSON (invoice, resume) from PDFs with OCR and a local LLM",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF paths or HTTP/HTTPS URLs (text files with --from-text).
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Document type selecting the output schema.
    #[arg(short = 't', long, env = "DOC2JSON_DOC_TYPE", value_enum, default_value = "invoice")]
    doc_type: DocTypeArg,

    /// Write JSON to this file instead of stdout.
    #[arg(short, long, env = "DOC2JSON_OUTPUT")]
    output: Option<PathBuf>,

    /// Emit the batch array even for a single input.
    #[arg(long)]
    batch: bool,

    /// Print the OCR text and stop; no model call.
    #[arg(long, conflicts_with = "from_text")]
    ocr_only: bool,

    /// Inputs are OCR text files from an earlier --ocr-only run.
    #[arg(long)]
    from_text: bool,

    /// Model ID.
    #[arg(long, env = "DOC2JSON_MODEL", default_value = doc2json::config::DEFAULT_MODEL)]
    model: String,

    /// Ollama base URL.
    #[arg(long, env = "OLLAMA_HOST", default_value = doc2json::config::DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Hosted provider (openai, anthropic, gemini, …) instead of Ollama.
    #[arg(long, env = "DOC2JSON_PROVIDER")]
    provider: Option<String>,

    /// Rendering DPI (72–600).
    #[arg(long, env = "DOC2JSON_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Tesseract language(s), e.g. eng or eng+deu.
    #[arg(long, env = "DOC2JSON_LANG", default_value = "eng")]
    lang: String,

    /// Tesseract page segmentation mode.
    #[arg(long, env = "DOC2JSON_PSM", value_parser = clap::value_parser!(u8).range(0..=13))]
    psm: Option<u8>,

    /// Tesseract executable.
    #[arg(long, env = "TESSERACT_CMD", default_value = "tesseract")]
    tesseract: PathBuf,

    /// Directory or file of the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "DOC2JSON_PASSWORD")]
    password: Option<String>,

    /// Model call timeout in seconds.
    #[arg(long, env = "DOC2JSON_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "DOC2JSON_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Sampling temperature (0.0–2.0). Default: the server's.
    #[arg(long, env = "DOC2JSON_TEMPERATURE")]
    temperature: Option<f32>,

    /// Accept model output wrapped in a ```json fence.
    #[arg(long, env = "DOC2JSON_STRIP_FENCES")]
    strip_fences: bool,

    /// Single-line JSON instead of pretty-printed.
    #[arg(long)]
    compact: bool,

    /// Disable progress bar.
    #[arg(long, env = "DOC2JSON_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOC2JSON_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOC2JSON_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum DocTypeArg {
    Invoice,
    Resume,
}

impl From<DocTypeArg> for DocumentType {
    fn from(v: DocTypeArg) -> Self {
        match v {
            DocTypeArg::Invoice => DocumentType::Invoice,
            DocTypeArg::Resume => DocumentType::Resume,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The bar replaces INFO-level library logs for multi-document runs.
    let batch_mode = cli.batch || cli.inputs.len() > 1;
    let show_progress = batch_mode && !cli.quiet && !cli.no_progress && !cli.ocr_only;
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

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;
    let extractor = Extractor::new(config).context("Failed to set up extractor")?;
    let doc_type: DocumentType = cli.doc_type.into();

    // ── OCR-only mode ────────────────────────────────────────────────────
    if cli.ocr_only {
        return run_ocr_only(&cli, &extractor).await;
    }

    // ── Single document ──────────────────────────────────────────────────
    if !batch_mode {
        let input = &cli.inputs[0];
        let result = if cli.from_text {
            extractor.extract_text_file(input, doc_type).await
        } else {
            extractor.extract_input(input, doc_type).await
        };

        emit(&cli, &result.to_output_json()).await?;
        if let ExtractionResult::Failure(failure) = result {
            anyhow::bail!("{input}: {failure}");
        }
        return Ok(());
    }

    // ── Batch ────────────────────────────────────────────────────────────
    let batch = if cli.from_text {
        extractor.extract_text_files(&cli.inputs, doc_type).await
    } else {
        extractor.extract_inputs(&cli.inputs, doc_type).await
    };

    let value = serde_json::to_value(&batch).context("Failed to serialise batch")?;
    emit(&cli, &value).await?;

    if !cli.quiet && !show_progress {
        eprintln!(
            "Extracted {}/{} documents",
            batch.succeeded(),
            batch.len()
        );
    }
    if batch.succeeded() == 0 {
        anyhow::bail!("All {} documents failed", batch.len());
    }
    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .dpi(cli.dpi)
        .tesseract_cmd(&cli.tesseract)
        .ocr_language(&cli.lang)
        .endpoint(&cli.endpoint)
        .model(&cli.model)
        .request_timeout_secs(cli.timeout)
        .download_timeout_secs(cli.download_timeout)
        .strip_code_fences(cli.strip_fences);

    if let Some(psm) = cli.psm {
        builder = builder.page_segmentation_mode(psm);
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(lib);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.backend(ModelBackend::Provider(provider.clone()));
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn run_ocr_only(cli: &Cli, extractor: &Extractor) -> Result<()> {
    let mut out = String::new();
    let mut failed = 0;
    for (input, rendered) in extractor.ocr_inputs(&cli.inputs).await {
        match rendered {
            Ok(raw) => {
                if cli.inputs.len() > 1 {
                    out.push_str(&format!("=== {} ===\n", input));
                }
                out.push_str(&raw.render());
            }
            Err(e) => {
                failed += 1;
                eprintln!("{} {}  {}", red("✗"), input, red(&e.to_string()));
            }
        }
    }
    if failed == cli.inputs.len() {
        anyhow::bail!("OCR failed for all {} inputs", failed);
    }

    match cli.output {
        Some(ref path) => {
            tokio::fs::write(path, &out)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if !cli.quiet {
                eprintln!("{}  →  {}", green("✔"), bold(&path.display().to_string()));
            }
        }
        None => {
            io::stdout()
                .lock()
                .write_all(out.as_bytes())
                .context("Failed to write to stdout")?;
        }
    }
    Ok(())
}

/// Print to stdout, or write the downloadable file when `-o` is given.
async fn emit(cli: &Cli, value: &serde_json::Value) -> Result<()> {
    match cli.output {
        Some(ref path) => {
            write_json(path, value, !cli.compact)
                .await
                .context("Failed to write output")?;
            if !cli.quiet {
                eprintln!("{}  →  {}", green("✔"), bold(&path.display().to_string()));
            }
        }
        None => {
            let json = if cli.compact {
                serde_json::to_string(value)
            } else {
                serde_json::to_string_pretty(value)
            }
            .context("Failed to serialise output")?;
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{json}").context("Failed to write to stdout")?;
            if !cli.quiet && cli.verbose {
                eprintln!("{}", dim(&format!("{} bytes", json.len())));
            }
        }
    }
    Ok(())
}
