//! Pipeline stages shared by the three strategies.
//!
//! ```text
//!                 ┌─ magick ──▶ PNG files ──────────────▶ ocr (file)   subprocess
//! input ──▶ PDFs ─┤
//!                 └─ render ──▶ normalize ──▶ encode ──▶ ocr (blob)   single-page / container
//! ```
//!
//! 1. [`input`]     : expand the glob and reject anything that is not a PDF
//! 2. [`magick`]    : `convert` into a per-document scratch directory
//! 3. [`render`]    : pdfium rasterisation (blocking thread)
//! 4. [`normalize`] : background flattening, grayscale, bit depth
//! 5. [`encode`]    : PNG per page or one multi-page TIFF
//! 6. [`ocr`]       : tesseract, from a file or from stdin

pub mod encode;
pub mod input;
pub mod magick;
pub mod normalize;
pub mod ocr;
pub mod render;
pub mod tool;
