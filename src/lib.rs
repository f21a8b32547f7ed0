//! # ocr-bench
//!
//! Micro-benchmark for getting scanned PDFs through Tesseract OCR, comparing
//! three ways of producing the images tesseract reads.
//!
//! ## Strategies
//!
//! ```text
//! subprocess   convert (ImageMagick) ──▶ PNG files ──▶ tesseract <png> …      per file
//! single-page  pdfium ──▶ normalise ──▶ PNG blob  ──▶ tesseract stdin stdout  per page
//! container    pdfium ──▶ normalise ──▶ one multi-page TIFF ──▶ tesseract     per document
//! ```
//!
//! Each strategy times two stages, image conversion and OCR, recording both
//! process CPU time and wall time, and reports the mean and total of each plus
//! a grand total. Recognised text is discarded: only the cost is measured.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ocr_bench::{run_benchmark, BenchConfig, Strategy};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BenchConfig::builder()
//!         .pattern("./test_assets/*.pdf")
//!         .strategies(Strategy::ALL)
//!         .build()?;
//!     let output = run_benchmark(&config).await?;
//!     for report in &output.reports {
//!         println!("Attempting method: {}\n{}", report.label, report);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ocr-bench` binary (clap + anyhow + tracing-subscriber) |
//!
//! ## External requirements
//!
//! * `tesseract` with the requested language data (all strategies)
//! * ImageMagick `convert` plus Ghostscript (subprocess strategy)
//! * a pdfium shared library (single-page and container strategies)

// ── Modules ──────────────────────────────────────────────────────────────

pub mod bench;
pub mod clock;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod stats;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use bench::{
    run_benchmark, run_benchmark_sync, run_benchmark_with, run_container, run_single_page,
    run_subprocess_method,
};
pub use clock::{Sample, Stopwatch};
pub use config::{Background, BenchConfig, BenchConfigBuilder, RasterOptions, Strategy, SubprocessMethod};
pub use error::BenchError;
pub use pipeline::magick::ConvertCommand;
pub use pipeline::ocr::{OcrEngine, TesseractCli};
pub use pipeline::render::{PdfiumRasterizer, Rasterizer};
pub use progress::{BenchProgressCallback, ProgressCallback};
pub use stats::{BenchOutput, Stage, StageSamples, StageSummary, StrategyReport};
