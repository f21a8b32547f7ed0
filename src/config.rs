//! Configuration types for a benchmark run.
//!
//! All run behaviour is controlled through [`BenchConfig`], built via its
//! [`BenchConfigBuilder`]. The raster knobs live in [`RasterOptions`] so the
//! same struct drives both the `convert` argument vector (subprocess
//! strategy) and the in-process normaliser (library strategies).

use crate::error::BenchError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Glob used when no pattern is given.
pub const DEFAULT_PATTERN: &str = "./test_assets/*.pdf";

/// Bit depths accepted by both ImageMagick and the PNG encoder for grayscale.
pub const SUPPORTED_DEPTHS: [u8; 4] = [1, 2, 4, 8];

/// Configuration for a benchmark run.
///
/// # Example
/// ```rust
/// use ocr_bench::{BenchConfig, Strategy};
///
/// let config = BenchConfig::builder()
///     .pattern("./scans/*.pdf")
///     .strategy(Strategy::Container)
///     .language("deu")
///     .build()
///     .unwrap();
/// assert_eq!(config.strategies, vec![Strategy::Container]);
/// ```
#[derive(Clone)]
pub struct BenchConfig {
    /// Glob selecting the input PDFs. Matches are processed in sorted order.
    pub pattern: String,

    /// Strategies to run, in order. Default: `[SinglePage]`.
    pub strategies: Vec<Strategy>,

    /// Presets run by [`Strategy::Subprocess`], in order. Default: all three.
    pub methods: Vec<SubprocessMethod>,

    /// Raster parameters for the two library strategies.
    pub library_raster: RasterOptions,

    /// Tesseract language code. Default: `eng`.
    pub language: String,

    /// ImageMagick `convert` executable. Default: `convert`.
    pub convert_program: PathBuf,

    /// Tesseract executable. Default: `tesseract`.
    pub tesseract_program: PathBuf,

    /// Directory (or file) holding the pdfium shared library.
    /// If None, the system library search path is used.
    pub pdfium_library: Option<PathBuf>,

    /// Receives per-document and per-stage events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.to_string(),
            strategies: vec![Strategy::SinglePage],
            methods: SubprocessMethod::ALL.to_vec(),
            library_raster: RasterOptions::library_default(),
            language: "eng".to_string(),
            convert_program: PathBuf::from("convert"),
            tesseract_program: PathBuf::from("tesseract"),
            pdfium_library: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for BenchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BenchConfig")
            .field("pattern", &self.pattern)
            .field("strategies", &self.strategies)
            .field("methods", &self.methods)
            .field("library_raster", &self.library_raster)
            .field("language", &self.language)
            .field("convert_program", &self.convert_program)
            .field("tesseract_program", &self.tesseract_program)
            .field("pdfium_library", &self.pdfium_library)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn BenchProgressCallback>"),
            )
            .finish()
    }
}

impl BenchConfig {
    /// Create a new builder for `BenchConfig`.
    pub fn builder() -> BenchConfigBuilder {
        BenchConfigBuilder {
            config: Self::default(),
            strategies_set: false,
        }
    }

    /// True if any selected strategy shells out to `convert`.
    pub fn needs_convert(&self) -> bool {
        self.strategies.contains(&Strategy::Subprocess)
    }

    /// True if any selected strategy rasterises through pdfium.
    pub fn needs_pdfium(&self) -> bool {
        self.strategies
            .iter()
            .any(|s| matches!(s, Strategy::SinglePage | Strategy::Container))
    }
}

/// Builder for [`BenchConfig`].
#[derive(Debug)]
pub struct BenchConfigBuilder {
    config: BenchConfig,
    // The first explicit `strategy()` call replaces the default list.
    strategies_set: bool,
}

impl BenchConfigBuilder {
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.pattern = pattern.into();
        self
    }

    /// Append a strategy. Duplicates are ignored.
    pub fn strategy(mut self, strategy: Strategy) -> Self {
        if !self.strategies_set {
            self.config.strategies.clear();
            self.strategies_set = true;
        }
        if !self.config.strategies.contains(&strategy) {
            self.config.strategies.push(strategy);
        }
        self
    }

    pub fn strategies(mut self, strategies: impl IntoIterator<Item = Strategy>) -> Self {
        for s in strategies {
            self = self.strategy(s);
        }
        self
    }

    pub fn methods(mut self, methods: impl IntoIterator<Item = SubprocessMethod>) -> Self {
        let mut list: Vec<SubprocessMethod> = Vec::new();
        for m in methods {
            if !list.contains(&m) {
                list.push(m);
            }
        }
        self.config.methods = list;
        self
    }

    pub fn library_raster(mut self, options: RasterOptions) -> Self {
        self.config.library_raster = options;
        self
    }

    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.config.language = lang.into();
        self
    }

    pub fn convert_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.convert_program = program.into();
        self
    }

    pub fn tesseract_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.tesseract_program = program.into();
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BenchConfig, BenchError> {
        let c = &self.config;
        if c.pattern.trim().is_empty() {
            return Err(BenchError::InvalidConfig(
                "Input pattern must not be empty".into(),
            ));
        }
        if c.strategies.is_empty() {
            return Err(BenchError::InvalidConfig(
                "At least one strategy must be selected".into(),
            ));
        }
        if c.needs_convert() && c.methods.is_empty() {
            return Err(BenchError::InvalidConfig(
                "The subprocess strategy needs at least one method preset".into(),
            ));
        }
        if c.language.trim().is_empty() {
            return Err(BenchError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        c.library_raster.validate()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How pages get from PDF to tesseract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// `convert` writes PNG files to disk; `tesseract` reads each file.
    Subprocess,
    /// pdfium renders in memory; one PNG blob piped to `tesseract` per page.
    SinglePage,
    /// pdfium renders in memory; all pages packed into one multi-page TIFF
    /// piped to `tesseract` once per document.
    Container,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Subprocess, Strategy::SinglePage, Strategy::Container];

    pub fn label(&self) -> &'static str {
        match self {
            Strategy::Subprocess => "subprocess",
            Strategy::SinglePage => "single-page",
            Strategy::Container => "container",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Named `convert` presets for the subprocess strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubprocessMethod {
    /// 4-bit, 300 DPI, white background, alpha removed.
    Current,
    /// `Current` plus `-colorspace Gray`.
    Grayscale,
    /// `Current` at 200 DPI.
    Smaller,
}

impl SubprocessMethod {
    pub const ALL: [SubprocessMethod; 3] = [
        SubprocessMethod::Current,
        SubprocessMethod::Grayscale,
        SubprocessMethod::Smaller,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SubprocessMethod::Current => "current",
            SubprocessMethod::Grayscale => "grayscale",
            SubprocessMethod::Smaller => "smaller",
        }
    }

    pub fn raster_options(&self) -> RasterOptions {
        let base = RasterOptions {
            depth: 4,
            density: 300,
            background: Background::White,
            remove_alpha: true,
            grayscale: false,
        };
        match self {
            SubprocessMethod::Current => base,
            SubprocessMethod::Grayscale => RasterOptions {
                grayscale: true,
                ..base
            },
            SubprocessMethod::Smaller => RasterOptions {
                density: 200,
                ..base
            },
        }
    }
}

impl fmt::Display for SubprocessMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Raster options ───────────────────────────────────────────────────────

/// Rasterisation and normalisation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterOptions {
    /// Bits per channel after quantisation: 1, 2, 4 or 8.
    pub depth: u8,
    /// Rendering resolution in DPI.
    pub density: u32,
    /// Colour the page is flattened onto.
    pub background: Background,
    /// Flatten the alpha channel onto `background`.
    pub remove_alpha: bool,
    /// Convert to single-channel luma.
    pub grayscale: bool,
}

impl RasterOptions {
    /// Defaults for the in-process strategies: 4-bit grayscale at 150 DPI.
    pub fn library_default() -> Self {
        Self {
            depth: 4,
            density: 150,
            background: Background::White,
            remove_alpha: true,
            grayscale: true,
        }
    }

    pub fn validate(&self) -> Result<(), BenchError> {
        if !SUPPORTED_DEPTHS.contains(&self.depth) {
            return Err(BenchError::InvalidConfig(format!(
                "Bit depth must be one of {:?}, got {}",
                SUPPORTED_DEPTHS, self.depth
            )));
        }
        if !(36..=1200).contains(&self.density) {
            return Err(BenchError::InvalidConfig(format!(
                "DPI must be 36–1200, got {}",
                self.density
            )));
        }
        Ok(())
    }
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self::library_default()
    }
}

/// Background fill colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Background {
    White,
    Black,
    Gray,
    Rgb(u8, u8, u8),
}

impl Background {
    pub fn rgb(&self) -> [u8; 3] {
        match *self {
            Background::White => [255, 255, 255],
            Background::Black => [0, 0, 0],
            // ImageMagick's "gray" is 50.2 %.
            Background::Gray => [128, 128, 128],
            Background::Rgb(r, g, b) => [r, g, b],
        }
    }

    /// Colour argument for `convert -background`.
    pub fn to_magick_arg(&self) -> String {
        match *self {
            Background::White => "white".to_string(),
            Background::Black => "black".to_string(),
            Background::Gray => "gray".to_string(),
            Background::Rgb(r, g, b) => format!("#{:02x}{:02x}{:02x}", r, g, b),
        }
    }

    /// Parse `white`, `black`, `gray`/`grey`, `#rgb` or `#rrggbb`.
    pub fn parse(s: &str) -> Result<Self, BenchError> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "white" => return Ok(Background::White),
            "black" => return Ok(Background::Black),
            "gray" | "grey" => return Ok(Background::Gray),
            _ => {}
        }

        let invalid = || BenchError::InvalidConfig(format!("Unrecognised background colour '{}'", s));
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |h: &str| u8::from_str_radix(h, 16).map_err(|_| invalid());

        match hex.len() {
            3 => {
                // #abc expands to #aabbcc
                let r = channel(&hex[0..1].repeat(2))?;
                let g = channel(&hex[1..2].repeat(2))?;
                let b = channel(&hex[2..3].repeat(2))?;
                Ok(Background::Rgb(r, g, b))
            }
            6 => Ok(Background::Rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Background {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_magick_arg())
    }
}
