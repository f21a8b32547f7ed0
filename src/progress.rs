//! Progress-callback trait for per-document benchmark events.
//!
//! Inject an [`Arc<dyn BenchProgressCallback>`] via
//! [`crate::config::BenchConfigBuilder::progress_callback`] to follow a run as
//! it happens. The library itself only logs through `tracing`; anything meant
//! for a human on stdout goes through this trait so that the `--json` CLI
//! mode and library callers stay quiet.
//!
//! # Example
//!
//! ```rust
//! use ocr_bench::{BenchConfig, BenchProgressCallback, Sample, Stage};
//! use std::sync::Arc;
//!
//! struct OcrTicker;
//!
//! impl BenchProgressCallback for OcrTicker {
//!     fn on_stage_complete(&self, stage: Stage, sample: &Sample) {
//!         if stage == Stage::Ocr {
//!             eprintln!("ocr took {:?}", sample.wall);
//!         }
//!     }
//! }
//!
//! let config = BenchConfig::builder()
//!     .progress_callback(Arc::new(OcrTicker))
//!     .build()
//!     .unwrap();
//! ```

use crate::clock::Sample;
use crate::stats::{Stage, StrategyReport};
use std::path::Path;
use std::sync::Arc;

/// Called by the runner as it works through strategies, documents and stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Calls arrive sequentially from the runner's task.
pub trait BenchProgressCallback: Send + Sync {
    /// A strategy (or subprocess preset) is about to run over all inputs.
    fn on_strategy_start(&self, label: &str, documents: usize) {
        let _ = (label, documents);
    }

    /// Processing of one input document begins.
    ///
    /// # Arguments
    /// * `index`: 0-based position among the matched inputs
    fn on_document_start(&self, path: &Path, index: usize, total: usize) {
        let _ = (path, index, total);
    }

    /// A scratch directory was created for the current document
    /// (subprocess strategy only). It is gone by the next document start.
    fn on_temp_dir(&self, dir: &Path) {
        let _ = dir;
    }

    /// A timed stage is about to start.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// A timed stage finished and produced `sample`.
    fn on_stage_complete(&self, stage: Stage, sample: &Sample) {
        let _ = (stage, sample);
    }

    /// A strategy finished; `report` is what will be returned for it.
    fn on_strategy_complete(&self, report: &StrategyReport) {
        let _ = report;
    }
}

/// Convenience alias for the callback type stored in [`crate::config::BenchConfig`].
pub type ProgressCallback = Arc<dyn BenchProgressCallback>;

/// No-op implementation used when no callback is configured.
pub struct NoopProgressCallback;

impl BenchProgressCallback for NoopProgressCallback {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StageLog {
        stages: Mutex<Vec<Stage>>,
    }

    impl BenchProgressCallback for StageLog {
        fn on_stage_start(&self, stage: Stage) {
            self.stages.lock().unwrap().push(stage);
        }
    }

    #[test]
    fn defaults_are_noops() {
        let cb = NoopProgressCallback;
        cb.on_strategy_start("current", 3);
        cb.on_document_start(Path::new("a.pdf"), 0, 3);
        cb.on_temp_dir(Path::new("/tmp/tess_x"));
        cb.on_stage_start(Stage::Image);
        cb.on_stage_complete(Stage::Image, &Sample::default());
    }

    #[test]
    fn overriding_one_method_is_enough() {
        let log = Arc::new(StageLog::default());
        let cb: ProgressCallback = log.clone();
        cb.on_stage_start(Stage::Image);
        cb.on_stage_start(Stage::Ocr);
        cb.on_document_start(Path::new("ignored.pdf"), 0, 1);
        assert_eq!(*log.stages.lock().unwrap(), vec![Stage::Image, Stage::Ocr]);
    }
}
