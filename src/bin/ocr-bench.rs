//! CLI binary for ocr-bench.
//!
//! A thin shim over the library crate that maps CLI flags to `BenchConfig`
//! and prints the per-strategy report to stdout.

use anyhow::{Context, Result};
use clap::Parser;
use ocr_bench::config::{DEFAULT_PATTERN, SUPPORTED_DEPTHS};
use ocr_bench::{
    run_benchmark, Background, BenchConfig, BenchProgressCallback, ProgressCallback,
    RasterOptions, Sample, Stage, Strategy, StrategyReport, SubprocessMethod,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// ── Running commentary on stdout ─────────────────────────────────────────────

/// Prints the section header, one line per document and stage, and the
/// summary block as soon as each strategy finishes.
struct StdoutProgress;

impl StdoutProgress {
    fn emit(&self, text: std::fmt::Arguments<'_>) {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        // A closed stdout should not abort a benchmark that is half done.
        let _ = handle.write_fmt(text);
        let _ = handle.flush();
    }
}

impl BenchProgressCallback for StdoutProgress {
    fn on_strategy_start(&self, label: &str, _documents: usize) {
        self.emit(format_args!("\n\nAttempting method: {}\n", label));
    }

    fn on_document_start(&self, path: &Path, _index: usize, _total: usize) {
        self.emit(format_args!("  Doing: {}\n", path.display()));
    }

    fn on_temp_dir(&self, dir: &Path) {
        self.emit(format_args!("    Using temp dir: {}\n", dir.display()));
    }

    fn on_stage_start(&self, stage: Stage) {
        match stage {
            Stage::Image => self.emit(format_args!("    Doing image conversion.\n")),
            Stage::Ocr => self.emit(format_args!("    Doing tesseract command.\n")),
        }
    }

    fn on_stage_complete(&self, _stage: Stage, _sample: &Sample) {}

    fn on_strategy_complete(&self, report: &StrategyReport) {
        self.emit(format_args!("{}", report));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Single-page library strategy over ./test_assets/*.pdf (default)
  ocr-bench

  # Every strategy, every subprocess preset
  ocr-bench --strategy all 'scans/*.pdf'

  # Only the grayscale convert preset
  ocr-bench --strategy subprocess --method grayscale

  # Library strategies at 300 DPI, 8-bit colour
  ocr-bench --strategy single-page --strategy container --dpi 300 --depth 8 --color

  # Machine-readable results
  ocr-bench --strategy all --json > results.json

SUBPROCESS PRESETS:
  current     convert -depth 4 -density 300 -background white +matte
  grayscale   current + -colorspace Gray
  smaller     convert -depth 4 -density 200 -background white +matte

REQUIREMENTS:
  tesseract   all strategies (with the --lang data installed)
  convert     subprocess strategy (ImageMagick + Ghostscript)
  libpdfium   single-page and container strategies

ENVIRONMENT VARIABLES:
  RUST_LOG          tracing filter (overrides -v / -q)
  PDFIUM_LIB_PATH   directory or file of the pdfium shared library
"#;

/// Benchmark PDF → image → Tesseract OCR strategies.
#[derive(Parser, Debug)]
#[command(
    name = "ocr-bench",
    version,
    about = "Benchmark PDF rasterisation + Tesseract OCR strategies",
    long_about = "Times three ways of feeding scanned PDF pages to Tesseract: ImageMagick \
`convert` writing PNG files, in-process rendering with one PNG blob per page, and in-process \
rendering with one multi-page TIFF per document. Reports mean and total CPU and wall time for \
the image and OCR stages.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Glob pattern selecting the input PDFs.
    #[arg(env = "OCR_BENCH_PATTERN", default_value = DEFAULT_PATTERN)]
    pattern: String,

    /// Strategy to run (repeatable).
    #[arg(short, long, env = "OCR_BENCH_STRATEGY", value_enum, value_delimiter = ',',
          default_value = "single-page")]
    strategy: Vec<StrategyArg>,

    /// Subprocess preset to run (repeatable). Default: all presets.
    #[arg(short, long, env = "OCR_BENCH_METHOD", value_enum, value_delimiter = ',')]
    method: Vec<MethodArg>,

    /// Rendering DPI for the library strategies.
    #[arg(long, env = "OCR_BENCH_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(36..=1200))]
    dpi: u32,

    /// Bit depth for the library strategies (1, 2, 4 or 8).
    #[arg(long, env = "OCR_BENCH_DEPTH", default_value_t = 4, value_parser = parse_depth)]
    depth: u8,

    /// Background colour pages are flattened onto: white, black, gray, #rrggbb.
    #[arg(long, env = "OCR_BENCH_BACKGROUND", default_value = "white")]
    background: String,

    /// Keep colour in the library strategies instead of converting to grayscale.
    #[arg(long, env = "OCR_BENCH_COLOR")]
    color: bool,

    /// Keep the alpha channel instead of flattening it onto the background.
    #[arg(long, env = "OCR_BENCH_KEEP_ALPHA")]
    keep_alpha: bool,

    /// Tesseract language code(s), e.g. eng or deu+eng.
    #[arg(short, long, env = "OCR_BENCH_LANG", default_value = "eng")]
    lang: String,

    /// ImageMagick convert executable.
    #[arg(long, env = "OCR_BENCH_CONVERT_BIN", default_value = "convert")]
    convert_bin: PathBuf,

    /// Tesseract executable.
    #[arg(long, env = "OCR_BENCH_TESSERACT_BIN", default_value = "tesseract")]
    tesseract_bin: PathBuf,

    /// Directory or file of the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Print the results as JSON instead of the text report.
    #[arg(long, env = "OCR_BENCH_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "OCR_BENCH_VERBOSE")]
    verbose: bool,

    /// Suppress the running commentary; print only the reports.
    #[arg(short, long, env = "OCR_BENCH_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum StrategyArg {
    Subprocess,
    SinglePage,
    Container,
    All,
}

impl StrategyArg {
    fn expand(self) -> Vec<Strategy> {
        match self {
            StrategyArg::Subprocess => vec![Strategy::Subprocess],
            StrategyArg::SinglePage => vec![Strategy::SinglePage],
            StrategyArg::Container => vec![Strategy::Container],
            StrategyArg::All => Strategy::ALL.to_vec(),
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum MethodArg {
    Current,
    Grayscale,
    Smaller,
}

impl From<MethodArg> for SubprocessMethod {
    fn from(v: MethodArg) -> Self {
        match v {
            MethodArg::Current => SubprocessMethod::Current,
            MethodArg::Grayscale => SubprocessMethod::Grayscale,
            MethodArg::Smaller => SubprocessMethod::Smaller,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Logs go to stderr so stdout carries only the report.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || cli.json {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.json;
    let progress: Option<ProgressCallback> = if show_progress {
        Some(Arc::new(StdoutProgress) as Arc<dyn BenchProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let output = run_benchmark(&config).await.context("Benchmark failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise results")?;
        println!("{json}");
    } else if !show_progress {
        // The progress callback already printed each block as it finished.
        for report in &output.reports {
            print!("\n\nAttempting method: {}\n{}", report.label, report);
        }
    }

    Ok(())
}

fn parse_depth(s: &str) -> Result<u8, String> {
    let depth: u8 = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    if SUPPORTED_DEPTHS.contains(&depth) {
        Ok(depth)
    } else {
        Err(format!("depth must be one of {:?}", SUPPORTED_DEPTHS))
    }
}

/// Map CLI args to `BenchConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<BenchConfig> {
    let background = Background::parse(&cli.background).context("Invalid --background")?;

    let library_raster = RasterOptions {
        depth: cli.depth,
        density: cli.dpi,
        background,
        remove_alpha: !cli.keep_alpha,
        grayscale: !cli.color,
    };

    let strategies: Vec<Strategy> = cli.strategy.iter().flat_map(|s| s.expand()).collect();

    let mut builder = BenchConfig::builder()
        .pattern(cli.pattern.clone())
        .strategies(strategies)
        .library_raster(library_raster)
        .language(cli.lang.clone())
        .convert_program(cli.convert_bin.clone())
        .tesseract_program(cli.tesseract_bin.clone());

    if !cli.method.is_empty() {
        builder = builder.methods(cli.method.iter().map(|&m| SubprocessMethod::from(m)));
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library(lib.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
