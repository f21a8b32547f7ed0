//! In-process page normalisation: background flattening, grayscale, bit depth.
//!
//! This is the library-strategy equivalent of the `convert` flags
//! `-background <c> +matte -colorspace Gray -depth <n>`. The output keeps
//! 8 bits per stored sample; [`NormalizedPage::depth`] records how many of
//! those bits carry information so the encoder can pack them.

use crate::config::RasterOptions;
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};

/// Pixel data after normalisation.
#[derive(Debug, Clone, PartialEq)]
pub enum PagePixels {
    Gray(GrayImage),
    Rgb(RgbImage),
    /// Only produced when alpha removal is disabled.
    Rgba(RgbaImage),
}

/// A page ready for encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPage {
    pub pixels: PagePixels,
    /// Meaningful bits per channel (1, 2, 4 or 8). Sample values are already
    /// quantised to `2^depth` evenly spaced levels across 0..=255.
    pub depth: u8,
    pub dpi: u32,
}

impl NormalizedPage {
    pub fn width(&self) -> u32 {
        match &self.pixels {
            PagePixels::Gray(i) => i.width(),
            PagePixels::Rgb(i) => i.width(),
            PagePixels::Rgba(i) => i.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match &self.pixels {
            PagePixels::Gray(i) => i.height(),
            PagePixels::Rgb(i) => i.height(),
            PagePixels::Rgba(i) => i.height(),
        }
    }
}

/// Apply `opts` to a rendered page.
pub fn normalize_page(image: &DynamicImage, opts: &RasterOptions) -> NormalizedPage {
    let bg = opts.background.rgb();

    let pixels = if opts.remove_alpha {
        let flat = flatten(image, bg);
        if opts.grayscale {
            PagePixels::Gray(DynamicImage::ImageRgb8(flat).into_luma8())
        } else {
            PagePixels::Rgb(flat)
        }
    } else if opts.grayscale {
        // Plain luma conversion discards alpha without compositing.
        PagePixels::Gray(image.to_luma8())
    } else {
        PagePixels::Rgba(image.to_rgba8())
    };

    let mut page = NormalizedPage {
        pixels,
        depth: opts.depth,
        dpi: opts.density,
    };
    quantize(&mut page);
    page
}

/// Composite every pixel over `bg` and drop alpha.
fn flatten(image: &DynamicImage, bg: [u8; 3]) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (src, dst) in rgba.pixels().zip(out.pixels_mut()) {
        let a = src[3] as u32;
        for c in 0..3 {
            let v = (src[c] as u32 * a + bg[c] as u32 * (255 - a) + 127) / 255;
            dst[c] = v as u8;
        }
    }
    out
}

fn quantize(page: &mut NormalizedPage) {
    if page.depth >= 8 {
        return;
    }
    let depth = page.depth;
    match &mut page.pixels {
        PagePixels::Gray(i) => i.iter_mut().for_each(|v| *v = quantize_sample(*v, depth)),
        PagePixels::Rgb(i) => i.iter_mut().for_each(|v| *v = quantize_sample(*v, depth)),
        PagePixels::Rgba(i) => {
            for px in i.pixels_mut() {
                for c in 0..3 {
                    px[c] = quantize_sample(px[c], depth);
                }
            }
        }
    }
}

/// Index (0..2^depth) of the level nearest to `v`.
pub fn level_of(v: u8, depth: u8) -> u8 {
    let max = (1u32 << depth) - 1;
    ((v as u32 * max + 127) / 255) as u8
}

/// Round `v` to the nearest of `2^depth` evenly spaced levels in 0..=255.
pub fn quantize_sample(v: u8, depth: u8) -> u8 {
    if depth >= 8 {
        return v;
    }
    let max = (1u32 << depth) - 1;
    (level_of(v, depth) as u32 * 255 / max) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Background;
    use image::{Luma, Rgb, Rgba};

    fn opts(depth: u8, grayscale: bool, remove_alpha: bool) -> RasterOptions {
        RasterOptions {
            depth,
            density: 150,
            background: Background::White,
            remove_alpha,
            grayscale,
        }
    }

    #[test]
    fn transparent_page_becomes_background() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 2, Rgba([0, 0, 0, 0])));
        let page = normalize_page(&img, &opts(8, false, true));
        match page.pixels {
            PagePixels::Rgb(i) => assert!(i.pixels().all(|p| *p == Rgb([255, 255, 255]))),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn half_alpha_blends_towards_background() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128])));
        let page = normalize_page(&img, &opts(8, false, true));
        let PagePixels::Rgb(i) = page.pixels else {
            panic!("expected rgb")
        };
        // 255 * 127 / 255 ≈ 127
        assert_eq!(i.get_pixel(0, 0)[0], 127);
    }

    #[test]
    fn grayscale_on_black_background() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 0])));
        let o = RasterOptions {
            background: Background::Black,
            ..opts(8, true, true)
        };
        let page = normalize_page(&img, &o);
        let PagePixels::Gray(i) = page.pixels else {
            panic!("expected gray")
        };
        assert!(i.pixels().all(|p| *p == Luma([0])));
    }

    #[test]
    fn keeping_alpha_keeps_rgba() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([10, 20, 30, 40])));
        let page = normalize_page(&img, &opts(8, false, false));
        assert!(matches!(page.pixels, PagePixels::Rgba(_)));
    }

    #[test]
    fn quantize_4_bit_levels() {
        // 16 levels: 0, 17, 34, … 255
        assert_eq!(quantize_sample(0, 4), 0);
        assert_eq!(quantize_sample(255, 4), 255);
        assert_eq!(quantize_sample(17, 4), 17);
        assert_eq!(quantize_sample(20, 4), 17);
        assert_eq!(quantize_sample(26, 4), 34);
        assert_eq!(level_of(255, 4), 15);
        assert_eq!(level_of(128, 1), 1);
        assert_eq!(level_of(127, 1), 0);
    }

    #[test]
    fn depth_8_is_identity() {
        for v in [0u8, 1, 99, 200, 255] {
            assert_eq!(quantize_sample(v, 8), v);
        }
    }

    #[test]
    fn normalized_pixels_are_on_levels() {
        let mut rgb = RgbImage::new(16, 1);
        for (x, px) in rgb.pixels_mut().enumerate() {
            *px = Rgb([(x * 16) as u8, 0, 0]);
        }
        let page = normalize_page(&DynamicImage::ImageRgb8(rgb), &opts(2, true, true));
        let PagePixels::Gray(i) = &page.pixels else {
            panic!("expected gray")
        };
        assert!(i.iter().all(|v| [0u8, 85, 170, 255].contains(v)));
        assert_eq!((page.width(), page.height(), page.depth), (16, 1, 2));
    }
}
