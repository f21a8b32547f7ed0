//! Sample accumulation and the per-strategy report.

use crate::clock::{duration_secs, Sample};
use crate::error::BenchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The two timed stages of every strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// PDF → normalised image (file or blob).
    Image,
    /// Image → text.
    Ocr,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Image => "image",
            Stage::Ocr => "ocr",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered samples for one stage of one strategy run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSamples {
    stage: Stage,
    samples: Vec<Sample>,
}

impl StageSamples {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            samples: Vec::new(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Component-wise sum. Zero for an empty list.
    pub fn total(&self) -> Sample {
        self.samples.iter().fold(Sample::default(), |acc, s| Sample {
            cpu: acc.cpu + s.cpu,
            wall: acc.wall + s.wall,
            child_cpu: acc.child_cpu + s.child_cpu,
        })
    }

    /// Component-wise mean, or `None` when no samples were recorded.
    pub fn mean(&self) -> Option<Sample> {
        let n = u32::try_from(self.samples.len()).ok().filter(|&n| n > 0)?;
        let total = self.total();
        Some(Sample {
            cpu: total.cpu / n,
            wall: total.wall / n,
            child_cpu: total.child_cpu / n,
        })
    }

    /// Reduce to a summary. Fails on an empty list rather than dividing by zero.
    pub fn summarize(&self) -> Result<StageSummary, BenchError> {
        let mean = self.mean().ok_or(BenchError::EmptySamples {
            stage: self.stage.name(),
        })?;
        Ok(StageSummary {
            stage: self.stage,
            count: self.samples.len(),
            mean,
            total: self.total(),
        })
    }
}

/// Mean and sum of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSummary {
    pub stage: Stage,
    pub count: usize,
    pub mean: Sample,
    pub total: Sample,
}

/// Result of running one strategy (or one subprocess preset) over every input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyReport {
    /// Method label shown in the section header (`current`, `single-page`, …).
    pub label: String,
    pub documents: usize,
    /// Pages OCR'd across all documents.
    pub pages: usize,
    pub image: StageSummary,
    pub ocr: StageSummary,
    /// Sum of both stage totals.
    pub grand_total: Sample,
}

impl StrategyReport {
    pub fn from_samples(
        label: impl Into<String>,
        documents: usize,
        pages: usize,
        image: &StageSamples,
        ocr: &StageSamples,
    ) -> Result<Self, BenchError> {
        let image = image.summarize()?;
        let ocr = ocr.summarize()?;
        let grand_total = Sample {
            cpu: image.total.cpu + ocr.total.cpu,
            wall: image.total.wall + ocr.total.wall,
            child_cpu: image.total.child_cpu + ocr.total.child_cpu,
        };
        Ok(Self {
            label: label.into(),
            documents,
            pages,
            image,
            ocr,
            grand_total,
        })
    }
}

impl fmt::Display for StrategyReport {
    /// The aggregate block printed after each method.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pair = |s: &Sample| format!("{}, {}", secs(s.cpu), secs(s.wall));
        writeln!(f, "  CPU, Wall")?;
        writeln!(f, "  Average image conversion was {}", pair(&self.image.mean))?;
        writeln!(f, "   Average tess conversion was {}", pair(&self.ocr.mean))?;
        writeln!(f, "    Total image conversion was {}", pair(&self.image.total))?;
        writeln!(f, "     Total tess conversion was {}", pair(&self.ocr.total))?;
        writeln!(f, "                     Total was {}", pair(&self.grand_total))
    }
}

fn secs(d: Duration) -> String {
    format!("{:.6}", d.as_secs_f64())
}

/// Everything a benchmark run produced, in run order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchOutput {
    pub reports: Vec<StrategyReport>,
    /// Wall time of the whole run, including untimed document loading.
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}
