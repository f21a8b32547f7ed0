//! Benchmark runner: drive each strategy over every input and collect samples.
//!
//! Everything here is strictly sequential. A document is finished before the
//! next one starts, and within a document the image stage finishes before
//! the OCR stage starts. The async signatures only exist so external commands
//! and pdfium can be awaited the same way the rest of the stack does it.

use crate::clock::Stopwatch;
use crate::config::{BenchConfig, RasterOptions, Strategy, SubprocessMethod};
use crate::error::BenchError;
use crate::pipeline::magick::{ConvertCommand, ScratchDir};
use crate::pipeline::ocr::{OcrEngine, TesseractCli};
use crate::pipeline::render::{PdfiumRasterizer, Rasterizer};
use crate::pipeline::{encode, input, normalize};
use crate::progress::{BenchProgressCallback, NoopProgressCallback};
use crate::stats::{BenchOutput, Stage, StageSamples, StrategyReport};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Run every configured strategy with the real tools.
///
/// Tools are located before any input is touched: a missing `tesseract`,
/// `convert` or pdfium library fails the run immediately.
///
/// # Errors
/// Any rasterisation, encoding or OCR failure aborts the whole run.
pub async fn run_benchmark(config: &BenchConfig) -> Result<BenchOutput, BenchError> {
    let ocr = TesseractCli::locate(&config.tesseract_program, &config.language)?;

    let convert = if config.needs_convert() {
        Some(ConvertCommand::locate(&config.convert_program)?)
    } else {
        None
    };

    let rasterizer = PdfiumRasterizer::new(config.pdfium_library.clone());
    if config.needs_pdfium() {
        rasterizer.probe()?;
    }

    run_benchmark_with(config, &rasterizer, &ocr, convert.as_ref()).await
}

/// Blocking variant of [`run_benchmark`] on a current-thread runtime.
pub fn run_benchmark_sync(config: &BenchConfig) -> Result<BenchOutput, BenchError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| BenchError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run_benchmark(config))
}

/// Run every configured strategy with caller-supplied engines.
///
/// `convert` is only required when [`Strategy::Subprocess`] is selected.
pub async fn run_benchmark_with<R, O>(
    config: &BenchConfig,
    rasterizer: &R,
    ocr: &O,
    convert: Option<&ConvertCommand>,
) -> Result<BenchOutput, BenchError>
where
    R: Rasterizer,
    O: OcrEngine,
{
    let started = Instant::now();
    // `library_raster` is a pub field, so it may have changed since `build()`.
    config.library_raster.validate()?;
    let documents = input::resolve_inputs(&config.pattern)?;
    let progress: Arc<dyn BenchProgressCallback> = config
        .progress_callback
        .clone()
        .unwrap_or_else(|| Arc::new(NoopProgressCallback));

    let mut reports = Vec::new();
    for strategy in &config.strategies {
        match strategy {
            Strategy::Subprocess => {
                let convert = convert.ok_or_else(|| {
                    BenchError::InvalidConfig(
                        "The subprocess strategy needs a convert command".into(),
                    )
                })?;
                for &method in &config.methods {
                    let report =
                        run_subprocess_method(&documents, method, convert, ocr, progress.as_ref())
                            .await?;
                    reports.push(report);
                }
            }
            Strategy::SinglePage => {
                let report = run_single_page(
                    &documents,
                    &config.library_raster,
                    rasterizer,
                    ocr,
                    progress.as_ref(),
                )
                .await?;
                reports.push(report);
            }
            Strategy::Container => {
                let report = run_container(
                    &documents,
                    &config.library_raster,
                    rasterizer,
                    ocr,
                    progress.as_ref(),
                )
                .await?;
                reports.push(report);
            }
        }
    }

    let elapsed = started.elapsed();
    info!("Benchmark complete: {} runs in {:?}", reports.len(), elapsed);
    Ok(BenchOutput { reports, elapsed })
}

/// `convert` to PNG files on disk, then one `tesseract` per file.
///
/// One sample per document for each stage. The document's scratch directory
/// is removed before the next document starts, on success and on failure.
pub async fn run_subprocess_method<O: OcrEngine>(
    documents: &[PathBuf],
    method: SubprocessMethod,
    convert: &ConvertCommand,
    ocr: &O,
    progress: &dyn BenchProgressCallback,
) -> Result<StrategyReport, BenchError> {
    let label = method.name();
    let opts = method.raster_options();
    info!("Attempting method: {}", label);
    progress.on_strategy_start(label, documents.len());

    let mut image_samples = StageSamples::new(Stage::Image);
    let mut ocr_samples = StageSamples::new(Stage::Ocr);
    let mut pages = 0;

    for (idx, path) in documents.iter().enumerate() {
        progress.on_document_start(path, idx, documents.len());
        info!("Doing: {}", path.display());

        let scratch = ScratchDir::new()?;
        progress.on_temp_dir(scratch.path());

        timed(Stage::Image, &mut image_samples, progress, async {
            convert.rasterize(&opts, path, &scratch).await
        })
        .await?;

        let recognised = timed(Stage::Ocr, &mut ocr_samples, progress, async {
            let images = scratch.page_images()?;
            for png in &images {
                let text = ocr.recognize_file(png).await?;
                debug!("{}: {} chars recognised", png.display(), text.len());
            }
            Ok::<_, BenchError>(images.len())
        })
        .await?;

        if recognised == 0 {
            warn!("convert produced no pages for {}", path.display());
        }
        pages += recognised;
    }

    finish(label, documents.len(), pages, &image_samples, &ocr_samples, progress)
}

/// pdfium in memory, one PNG blob per page piped to tesseract.
///
/// One sample per page for each stage. Document loading and page rendering
/// happen before the image stage is timed.
pub async fn run_single_page<R: Rasterizer, O: OcrEngine>(
    documents: &[PathBuf],
    opts: &RasterOptions,
    rasterizer: &R,
    ocr: &O,
    progress: &dyn BenchProgressCallback,
) -> Result<StrategyReport, BenchError> {
    let label = Strategy::SinglePage.label();
    info!("Attempting method: {}", label);
    progress.on_strategy_start(label, documents.len());

    let mut image_samples = StageSamples::new(Stage::Image);
    let mut ocr_samples = StageSamples::new(Stage::Ocr);
    let mut pages = 0;

    for (idx, path) in documents.iter().enumerate() {
        progress.on_document_start(path, idx, documents.len());
        info!("Doing: {}", path.display());

        let rendered = load_pages(rasterizer, path, opts.density).await?;

        for (page_idx, page) in rendered.iter().enumerate() {
            let blob = timed(Stage::Image, &mut image_samples, progress, async {
                encode::encode_png(&normalize::normalize_page(page, opts))
            })
            .await?;

            let text = timed(Stage::Ocr, &mut ocr_samples, progress, async {
                ocr.recognize_blob(&blob).await
            })
            .await?;
            debug!("Page {}: {} chars recognised", page_idx + 1, text.len());
            pages += 1;
        }
    }

    finish(label, documents.len(), pages, &image_samples, &ocr_samples, progress)
}

/// pdfium in memory, every page packed into one multi-page TIFF, one
/// tesseract call per document.
///
/// One sample per document for each stage.
pub async fn run_container<R: Rasterizer, O: OcrEngine>(
    documents: &[PathBuf],
    opts: &RasterOptions,
    rasterizer: &R,
    ocr: &O,
    progress: &dyn BenchProgressCallback,
) -> Result<StrategyReport, BenchError> {
    let label = Strategy::Container.label();
    info!("Attempting method: {}", label);
    progress.on_strategy_start(label, documents.len());

    let mut image_samples = StageSamples::new(Stage::Image);
    let mut ocr_samples = StageSamples::new(Stage::Ocr);
    let mut pages = 0;

    for (idx, path) in documents.iter().enumerate() {
        progress.on_document_start(path, idx, documents.len());
        info!("Doing: {}", path.display());

        let rendered = load_pages(rasterizer, path, opts.density).await?;

        let blob = timed(Stage::Image, &mut image_samples, progress, async {
            let normalized: Vec<_> = rendered
                .iter()
                .map(|page| normalize::normalize_page(page, opts))
                .collect();
            encode::encode_tiff_container(&normalized)
        })
        .await?;

        let text = timed(Stage::Ocr, &mut ocr_samples, progress, async {
            ocr.recognize_blob(&blob).await
        })
        .await?;
        debug!("{}: {} chars recognised", path.display(), text.len());
        pages += rendered.len();
    }

    finish(label, documents.len(), pages, &image_samples, &ocr_samples, progress)
}

async fn load_pages<R: Rasterizer>(
    rasterizer: &R,
    path: &Path,
    dpi: u32,
) -> Result<Vec<image::DynamicImage>, BenchError> {
    let load_start = Instant::now();
    let rendered = rasterizer.rasterize(path, dpi).await?;
    debug!(
        "Loaded {} pages of {} in {:?} (untimed)",
        rendered.len(),
        path.display(),
        load_start.elapsed()
    );
    Ok(rendered)
}

/// Time `work` as one sample of `stage`.
async fn timed<T, F>(
    stage: Stage,
    samples: &mut StageSamples,
    progress: &dyn BenchProgressCallback,
    work: F,
) -> Result<T, BenchError>
where
    F: Future<Output = Result<T, BenchError>>,
{
    progress.on_stage_start(stage);
    let stopwatch = Stopwatch::start();
    let value = work.await?;
    let sample = stopwatch.stop();
    debug!(
        "{} stage: cpu {:?}, wall {:?}, children {:?}",
        stage, sample.cpu, sample.wall, sample.child_cpu
    );
    samples.push(sample);
    progress.on_stage_complete(stage, &sample);
    Ok(value)
}

fn finish(
    label: &str,
    documents: usize,
    pages: usize,
    image: &StageSamples,
    ocr: &StageSamples,
    progress: &dyn BenchProgressCallback,
) -> Result<StrategyReport, BenchError> {
    let report = StrategyReport::from_samples(label, documents, pages, image, ocr)?;
    progress.on_strategy_complete(&report);
    Ok(report)
}
