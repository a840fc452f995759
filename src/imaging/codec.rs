//! Normalizing 8-bit image codec.
//!
//! Source images arrive in whatever format and bit depth their host
//! serves: 16-bit PNGs, floating-point TIFFs, RGBA screenshots, RGB
//! scans of grayscale material. [`decode`] folds all of them into one of
//! two 8-bit shapes — grayscale or RGB — so the rest of the pipeline
//! never branches on pixel layout:
//!
//! - 16-bit channels are rescaled by `/257` and rounded; floating-point
//!   channels by `×255` and rounded.
//! - An alpha channel is premultiplied onto black (`c × a / 255`,
//!   rounded) and dropped.
//! - A 3-channel image whose channels are pixel-identical collapses to
//!   single-channel grayscale (saves a third to two thirds of the encode
//!   size for the many grayscale sources stored as RGB).
//!
//! Encoding policy is fixed: PNG at maximum compression, JPEG at the
//! configured quality. Dispatch is by output filename extension, same as
//! the content-addressed names carry it.

use crate::imaging::geometry::Region;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, PngEncoder};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ExtendedColorType, GrayImage, ImageEncoder, RgbImage};
use std::io::Cursor;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),
}

/// A normalized 8-bit raster: grayscale or RGB.
#[derive(Debug, Clone)]
pub enum Raster {
    Gray(GrayImage),
    Rgb(RgbImage),
}

impl Raster {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Raster::Gray(img) => img.dimensions(),
            Raster::Rgb(img) => img.dimensions(),
        }
    }

    /// Extract a sub-region. The caller guarantees the region is within
    /// bounds (all geometry functions clamp).
    pub fn crop(&self, region: &Region) -> Raster {
        match self {
            Raster::Gray(img) => Raster::Gray(
                imageops::crop_imm(img, region.x, region.y, region.w, region.h).to_image(),
            ),
            Raster::Rgb(img) => Raster::Rgb(
                imageops::crop_imm(img, region.x, region.y, region.w, region.h).to_image(),
            ),
        }
    }

    /// Resize to an exact target size (Lanczos3).
    pub fn resize(&self, size: (u32, u32)) -> Raster {
        let (w, h) = size;
        match self {
            Raster::Gray(img) => Raster::Gray(imageops::resize(img, w, h, FilterType::Lanczos3)),
            Raster::Rgb(img) => Raster::Rgb(imageops::resize(img, w, h, FilterType::Lanczos3)),
        }
    }
}

/// Decode arbitrary raster bytes into a normalized 8-bit [`Raster`].
pub fn decode(bytes: &[u8]) -> Result<Raster, CodecError> {
    Ok(normalize(image::load_from_memory(bytes)?))
}

/// Rescale one 16-bit channel value to 8 bits.
fn from_u16(v: u16) -> u8 {
    (v as f32 / 257.0).round() as u8
}

/// Rescale one floating-point channel value to 8 bits.
fn from_f32(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Premultiply one channel value onto black.
fn premultiply(c: u8, a: u8) -> u8 {
    (c as f32 * a as f32 / 255.0).round() as u8
}

/// Normalize a decoded image to 8-bit grayscale or RGB.
pub fn normalize(img: DynamicImage) -> Raster {
    use DynamicImage::*;
    match img {
        ImageLuma8(gray) => Raster::Gray(gray),
        ImageLumaA8(gray_alpha) => {
            let (w, h) = gray_alpha.dimensions();
            Raster::Gray(GrayImage::from_fn(w, h, |x, y| {
                let p = gray_alpha.get_pixel(x, y);
                image::Luma([premultiply(p[0], p[1])])
            }))
        }
        ImageRgb8(rgb) => collapse_gray(rgb),
        ImageRgba8(rgba) => {
            let (w, h) = rgba.dimensions();
            collapse_gray(RgbImage::from_fn(w, h, |x, y| {
                let p = rgba.get_pixel(x, y);
                image::Rgb([
                    premultiply(p[0], p[3]),
                    premultiply(p[1], p[3]),
                    premultiply(p[2], p[3]),
                ])
            }))
        }
        ImageLuma16(gray) => {
            let (w, h) = gray.dimensions();
            Raster::Gray(GrayImage::from_fn(w, h, |x, y| {
                image::Luma([from_u16(gray.get_pixel(x, y)[0])])
            }))
        }
        ImageLumaA16(gray_alpha) => {
            let (w, h) = gray_alpha.dimensions();
            Raster::Gray(GrayImage::from_fn(w, h, |x, y| {
                let p = gray_alpha.get_pixel(x, y);
                image::Luma([premultiply(from_u16(p[0]), from_u16(p[1]))])
            }))
        }
        ImageRgb16(rgb) => {
            let (w, h) = rgb.dimensions();
            collapse_gray(RgbImage::from_fn(w, h, |x, y| {
                let p = rgb.get_pixel(x, y);
                image::Rgb([from_u16(p[0]), from_u16(p[1]), from_u16(p[2])])
            }))
        }
        ImageRgba16(rgba) => {
            let (w, h) = rgba.dimensions();
            collapse_gray(RgbImage::from_fn(w, h, |x, y| {
                let p = rgba.get_pixel(x, y);
                let a = from_u16(p[3]);
                image::Rgb([
                    premultiply(from_u16(p[0]), a),
                    premultiply(from_u16(p[1]), a),
                    premultiply(from_u16(p[2]), a),
                ])
            }))
        }
        ImageRgb32F(rgb) => {
            let (w, h) = rgb.dimensions();
            collapse_gray(RgbImage::from_fn(w, h, |x, y| {
                let p = rgb.get_pixel(x, y);
                image::Rgb([from_f32(p[0]), from_f32(p[1]), from_f32(p[2])])
            }))
        }
        ImageRgba32F(rgba) => {
            let (w, h) = rgba.dimensions();
            collapse_gray(RgbImage::from_fn(w, h, |x, y| {
                let p = rgba.get_pixel(x, y);
                let a = from_f32(p[3]);
                image::Rgb([
                    premultiply(from_f32(p[0]), a),
                    premultiply(from_f32(p[1]), a),
                    premultiply(from_f32(p[2]), a),
                ])
            }))
        }
        // DynamicImage is non-exhaustive; anything new goes through RGBA8.
        other => normalize(DynamicImage::ImageRgba8(other.to_rgba8())),
    }
}

/// Collapse an RGB image to grayscale when all three channels agree.
fn collapse_gray(rgb: RgbImage) -> Raster {
    let identical = rgb
        .pixels()
        .all(|p| p[0] == p[1] && p[1] == p[2]);
    if identical {
        let (w, h) = rgb.dimensions();
        Raster::Gray(GrayImage::from_fn(w, h, |x, y| {
            image::Luma([rgb.get_pixel(x, y)[0]])
        }))
    } else {
        Raster::Rgb(rgb)
    }
}

/// Encode as PNG at maximum compression.
pub fn encode_png(raster: &Raster) -> Result<Vec<u8>, CodecError> {
    let mut buffer = Vec::new();
    let encoder = PngEncoder::new_with_quality(
        Cursor::new(&mut buffer),
        CompressionType::Best,
        image::codecs::png::FilterType::Adaptive,
    );
    write_raster(raster, encoder)?;
    Ok(buffer)
}

/// Encode as JPEG at the given quality.
pub fn encode_jpeg(raster: &Raster, quality: u8) -> Result<Vec<u8>, CodecError> {
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut buffer), quality);
    write_raster(raster, encoder)?;
    Ok(buffer)
}

/// Encode for the given output name, dispatching on its extension.
pub fn encode(raster: &Raster, name: &str, jpeg_quality: u8) -> Result<Vec<u8>, CodecError> {
    if name.ends_with(".png") {
        encode_png(raster)
    } else if name.ends_with(".jpg") || name.ends_with(".jpeg") {
        encode_jpeg(raster, jpeg_quality)
    } else {
        Err(CodecError::UnsupportedFormat(name.to_string()))
    }
}

fn write_raster(raster: &Raster, encoder: impl ImageEncoder) -> Result<(), CodecError> {
    match raster {
        Raster::Gray(img) => {
            let (w, h) = img.dimensions();
            encoder.write_image(img.as_raw(), w, h, ExtendedColorType::L8)?
        }
        Raster::Rgb(img) => {
            let (w, h) = img.dimensions();
            encoder.write_image(img.as_raw(), w, h, ExtendedColorType::Rgb8)?
        }
    }
    Ok(())
}
