//! Image encoding: normalised pages → PNG blob or multi-page TIFF blob.
//!
//! PNG goes through the `png` crate directly because `image` only writes 8-
//! and 16-bit samples, and the point of `-depth 4` is a smaller grayscale
//! file. Colour pages cannot be stored below 8 bits in PNG, so they keep 8-bit
//! samples holding the quantised values.
//!
//! Both encoders record the DPI. Without it tesseract assumes 70 DPI and
//! picks the wrong text-size heuristics.

use crate::error::BenchError;
use crate::pipeline::normalize::{level_of, NormalizedPage, PagePixels};
use image::GrayImage;
use std::borrow::Cow;
use std::io::Cursor;
use tiff::encoder::{colortype, Rational, TiffEncoder};
use tiff::tags::ResolutionUnit;
use tracing::debug;

/// Encode one page as PNG.
pub fn encode_png(page: &NormalizedPage) -> Result<Vec<u8>, BenchError> {
    let (width, height) = (page.width(), page.height());
    let mut buf = Vec::new();

    {
        let mut encoder = png::Encoder::new(&mut buf, width, height);
        let data: Cow<'_, [u8]> = match &page.pixels {
            PagePixels::Gray(img) => {
                encoder.set_color(png::ColorType::Grayscale);
                encoder.set_depth(png_bit_depth(page.depth));
                if page.depth < 8 {
                    Cow::Owned(pack_gray(img, page.depth))
                } else {
                    Cow::Borrowed(img.as_raw())
                }
            }
            PagePixels::Rgb(img) => {
                encoder.set_color(png::ColorType::Rgb);
                encoder.set_depth(png::BitDepth::Eight);
                Cow::Borrowed(img.as_raw())
            }
            PagePixels::Rgba(img) => {
                encoder.set_color(png::ColorType::Rgba);
                encoder.set_depth(png::BitDepth::Eight);
                Cow::Borrowed(img.as_raw())
            }
        };

        let ppm = dots_per_meter(page.dpi);
        encoder.set_pixel_dims(Some(png::PixelDimensions {
            xppu: ppm,
            yppu: ppm,
            unit: png::Unit::Meter,
        }));

        let mut writer = encoder.write_header().map_err(png_err)?;
        writer.write_image_data(&data).map_err(png_err)?;
        writer.finish().map_err(png_err)?;
    }

    debug!("Encoded {}x{} page → {} bytes PNG", width, height, buf.len());
    Ok(buf)
}

/// Encode every page into one multi-page TIFF, one IFD per page.
pub fn encode_tiff_container(pages: &[NormalizedPage]) -> Result<Vec<u8>, BenchError> {
    if pages.is_empty() {
        return Err(BenchError::EncodeFailed {
            format: "TIFF",
            detail: "document has no pages".into(),
        });
    }

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut cursor).map_err(tiff_err)?;
        for page in pages {
            let resolution = Rational {
                n: page.dpi,
                d: 1,
            };
            match &page.pixels {
                PagePixels::Gray(img) => {
                    let mut frame = encoder
                        .new_image::<colortype::Gray8>(img.width(), img.height())
                        .map_err(tiff_err)?;
                    frame.resolution(ResolutionUnit::Inch, resolution);
                    frame.write_data(img.as_raw()).map_err(tiff_err)?;
                }
                PagePixels::Rgb(img) => {
                    let mut frame = encoder
                        .new_image::<colortype::RGB8>(img.width(), img.height())
                        .map_err(tiff_err)?;
                    frame.resolution(ResolutionUnit::Inch, resolution);
                    frame.write_data(img.as_raw()).map_err(tiff_err)?;
                }
                PagePixels::Rgba(img) => {
                    let mut frame = encoder
                        .new_image::<colortype::RGBA8>(img.width(), img.height())
                        .map_err(tiff_err)?;
                    frame.resolution(ResolutionUnit::Inch, resolution);
                    frame.write_data(img.as_raw()).map_err(tiff_err)?;
                }
            }
        }
    }

    let buf = cursor.into_inner();
    debug!("Encoded {} pages → {} bytes TIFF", pages.len(), buf.len());
    Ok(buf)
}

fn png_bit_depth(depth: u8) -> png::BitDepth {
    match depth {
        1 => png::BitDepth::One,
        2 => png::BitDepth::Two,
        4 => png::BitDepth::Four,
        _ => png::BitDepth::Eight,
    }
}

/// Pack quantised 8-bit gray samples into `depth`-bit samples, MSB first,
/// each row padded to a whole byte.
fn pack_gray(img: &GrayImage, depth: u8) -> Vec<u8> {
    let (width, height) = img.dimensions();
    let bits = depth as usize;
    let row_bytes = (width as usize * bits).div_ceil(8);
    let mut out = vec![0u8; row_bytes * height as usize];

    for (y, row) in img.rows().enumerate() {
        let dst = &mut out[y * row_bytes..(y + 1) * row_bytes];
        for (x, px) in row.enumerate() {
            let bit = x * bits;
            let shift = 8 - bits - (bit % 8);
            dst[bit / 8] |= level_of(px[0], depth) << shift;
        }
    }
    out
}

fn dots_per_meter(dpi: u32) -> u32 {
    // 1 inch = 0.0254 m
    ((dpi as u64 * 10_000 + 127) / 254) as u32
}

fn png_err(e: png::EncodingError) -> BenchError {
    BenchError::EncodeFailed {
        format: "PNG",
        detail: e.to_string(),
    }
}

fn tiff_err(e: tiff::TiffError) -> BenchError {
    BenchError::EncodeFailed {
        format: "TIFF",
        detail: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, RgbImage};

    fn gray_page(w: u32, h: u32, value: u8, depth: u8) -> NormalizedPage {
        NormalizedPage {
            pixels: PagePixels::Gray(GrayImage::from_pixel(w, h, Luma([value]))),
            depth,
            dpi: 150,
        }
    }

    fn png_info(bytes: &[u8]) -> (u32, u32, png::BitDepth, png::ColorType) {
        let decoder = png::Decoder::new(Cursor::new(bytes));
        let reader = decoder.read_info().expect("valid png");
        let info = reader.info();
        (info.width, info.height, info.bit_depth, info.color_type)
    }

    #[test]
    fn gray_4_bit_png_header() {
        let bytes = encode_png(&gray_page(10, 3, 255, 4)).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
        let (w, h, depth, color) = png_info(&bytes);
        assert_eq!((w, h), (10, 3));
        assert_eq!(depth, png::BitDepth::Four);
        assert_eq!(color, png::ColorType::Grayscale);
    }

    #[test]
    fn gray_png_decodes_to_same_extremes() {
        for value in [0u8, 255] {
            let bytes = encode_png(&gray_page(7, 2, value, 4)).unwrap();
            let decoded = image::load_from_memory(&bytes).unwrap().to_luma8();
            assert_eq!(decoded.dimensions(), (7, 2));
            assert!(decoded.pixels().all(|p| p[0] == value));
        }
    }

    #[test]
    fn rgb_png_stays_8_bit() {
        let page = NormalizedPage {
            pixels: PagePixels::Rgb(RgbImage::new(4, 4)),
            depth: 4,
            dpi: 300,
        };
        let (_, _, depth, color) = png_info(&encode_png(&page).unwrap());
        assert_eq!(depth, png::BitDepth::Eight);
        assert_eq!(color, png::ColorType::Rgb);
    }

    #[test]
    fn pack_gray_is_msb_first_and_row_padded() {
        // 3 pixels at 4 bits → 2 bytes per row, last nibble padding.
        let mut img = GrayImage::new(3, 1);
        img.put_pixel(0, 0, Luma([255]));
        img.put_pixel(1, 0, Luma([0]));
        img.put_pixel(2, 0, Luma([17]));
        assert_eq!(pack_gray(&img, 4), vec![0xF0, 0x10]);

        let one_bit = GrayImage::from_pixel(9, 2, Luma([255]));
        let packed = pack_gray(&one_bit, 1);
        assert_eq!(packed, vec![0xFF, 0x80, 0xFF, 0x80]);
    }

    #[test]
    fn dpi_to_pixels_per_meter() {
        assert_eq!(dots_per_meter(150), 5906);
        assert_eq!(dots_per_meter(300), 11811);
    }

    #[test]
    fn tiff_container_has_one_frame_per_page() {
        let pages: Vec<_> = (0..3).map(|_| gray_page(8, 8, 255, 4)).collect();
        let bytes = encode_tiff_container(&pages).unwrap();

        let mut decoder = tiff::decoder::Decoder::new(Cursor::new(&bytes)).unwrap();
        assert_eq!(decoder.dimensions().unwrap(), (8, 8));
        let mut frames = 1;
        while decoder.more_images() {
            decoder.next_image().unwrap();
            frames += 1;
        }
        assert_eq!(frames, 3);
    }

    #[test]
    fn empty_container_is_an_error() {
        let err = encode_tiff_container(&[]).unwrap_err();
        assert!(matches!(err, BenchError::EncodeFailed { format: "TIFF", .. }));
    }
}
