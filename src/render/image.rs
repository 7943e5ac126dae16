//! # Photo Preparation
//!
//! Turns an arbitrary photo into a bitmap the print head can reproduce.
//!
//! ## Pipeline
//!
//! ```text
//! decode ─► flatten alpha ─► rotate (landscape only) ─► resize to dot width
//!        ─► grayscale ─► contrast ─► sharpness ─► brightness ─► dither
//! ```
//!
//! Resizing happens before every tonal step so that contrast, sharpening and
//! dithering work on the pixels that will actually be printed. Dithering is
//! always last: any adjustment after it would reintroduce gray levels.
//!
//! Enhancement strengths are factors where 1.0 leaves the image unchanged:
//!
//! | Step | Degenerate image | 0.0 gives |
//! |------|------------------|-----------|
//! | contrast | solid mean gray | flat gray |
//! | sharpness | 3x3 smoothed copy | blurred image |
//! | brightness | black | black |
//!
//! `out = degenerate + factor × (image − degenerate)`, clamped to 0..=255.

use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use tracing::debug;

use super::Bitmap;
use super::dither::{self, DitheringAlgorithm};
use crate::config::ImageConfig;
use crate::error::{PrintboxError, Result};

/// Smoothing kernel used as the degenerate image for sharpness.
const SMOOTH: [[f32; 3]; 3] = [[1.0, 1.0, 1.0], [1.0, 5.0, 1.0], [1.0, 1.0, 1.0]];
const SMOOTH_SUM: f32 = 13.0;

/// One pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Rotate,
    Resize,
    Grayscale,
    Contrast,
    Sharpness,
    Brightness,
    Dither(DitheringAlgorithm),
    Threshold,
}

impl Step {
    /// True for steps that change tone rather than geometry.
    pub fn is_enhancement(self) -> bool {
        !matches!(self, Step::Rotate | Step::Resize)
    }
}

/// A step together with the image size it ran on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepRecord {
    pub step: Step,
    pub width: u32,
    pub height: u32,
}

/// Result of [`prepare`]: the bitmap and the steps that produced it.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub bitmap: Bitmap,
    pub steps: Vec<StepRecord>,
}

/// Decode an image file.
pub fn load(path: &Path) -> Result<DynamicImage> {
    image::open(path)
        .map_err(|e| PrintboxError::Image(format!("Failed to decode {}: {}", path.display(), e)))
}

/// Run the full pipeline for a print `width` in dots.
pub fn prepare(source: DynamicImage, width: u32, options: &ImageConfig) -> Prepared {
    let mut steps = Vec::new();
    let mut record = |step: Step, img: &RgbaImage| {
        steps.push(StepRecord {
            step,
            width: img.width(),
            height: img.height(),
        })
    };

    let mut img = flatten_alpha(&source);

    if img.width() > img.height() {
        img = image::imageops::rotate90(&img);
        record(Step::Rotate, &img);
    }

    let width = width.max(1);
    if img.width() != width {
        let aspect_ratio = img.height() as f32 / img.width() as f32;
        let height = ((width as f32 * aspect_ratio).round() as u32).max(1);
        img = image::imageops::resize(&img, width, height, FilterType::Lanczos3);
        record(Step::Resize, &img);
    }

    let mut dithered = None;
    if options.enhance {
        if options.grayscale {
            grayscale(&mut img);
            record(Step::Grayscale, &img);
        }
        if options.contrast != 1.0 {
            contrast(&mut img, options.contrast);
            record(Step::Contrast, &img);
        }
        if options.sharpness != 1.0 {
            img = sharpness(&img, options.sharpness);
            record(Step::Sharpness, &img);
        }
        if options.brightness != 1.0 {
            brightness(&mut img, options.brightness);
            record(Step::Brightness, &img);
        }
        if options.dithering {
            dithered = Some(options.dither);
        }
    }

    let gray = DynamicImage::ImageRgba8(img).to_luma8();
    let bitmap = match dithered {
        Some(algorithm) => {
            let bitmap = dither::dither(&gray, algorithm);
            steps.push(StepRecord {
                step: Step::Dither(algorithm),
                width: gray.width(),
                height: gray.height(),
            });
            bitmap
        }
        None => {
            let bitmap = dither::threshold_bitmap(&gray);
            steps.push(StepRecord {
                step: Step::Threshold,
                width: gray.width(),
                height: gray.height(),
            });
            bitmap
        }
    };

    debug!(
        width = bitmap.width(),
        height = bitmap.height(),
        steps = steps.len(),
        "image prepared"
    );
    Prepared { bitmap, steps }
}

/// Composite transparent pixels onto white paper.
fn flatten_alpha(source: &DynamicImage) -> RgbaImage {
    let mut rgba = source.to_rgba8();
    if !source.color().has_alpha() {
        return rgba;
    }
    for pixel in rgba.pixels_mut() {
        let alpha = pixel[3] as f32 / 255.0;
        for c in 0..3 {
            let val = pixel[c] as f32 * alpha + 255.0 * (1.0 - alpha);
            pixel[c] = val.round().clamp(0.0, 255.0) as u8;
        }
        pixel[3] = 255;
    }
    rgba
}

#[inline]
fn luma(pixel: &Rgba<u8>) -> f32 {
    (pixel[0] as f32 * 299.0 + pixel[1] as f32 * 587.0 + pixel[2] as f32 * 114.0) / 1000.0
}

#[inline]
fn blend(degenerate: f32, value: f32, factor: f32) -> u8 {
    (degenerate + factor * (value - degenerate)).round().clamp(0.0, 255.0) as u8
}

fn grayscale(img: &mut RgbaImage) {
    for pixel in img.pixels_mut() {
        let l = luma(pixel).round().clamp(0.0, 255.0) as u8;
        pixel[0] = l;
        pixel[1] = l;
        pixel[2] = l;
    }
}

fn contrast(img: &mut RgbaImage, factor: f32) {
    let count = (img.width() as f64 * img.height() as f64).max(1.0);
    let mean = (img.pixels().map(|p| luma(p) as f64).sum::<f64>() / count).round() as f32;
    for pixel in img.pixels_mut() {
        for c in 0..3 {
            pixel[c] = blend(mean, pixel[c] as f32, factor);
        }
    }
}

/// Blend against a smoothed copy. Border pixels keep their values.
fn sharpness(img: &RgbaImage, factor: f32) -> RgbaImage {
    let (width, height) = img.dimensions();
    let mut out = img.clone();
    if width < 3 || height < 3 {
        return out;
    }
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            for c in 0..3 {
                let mut acc = 0.0;
                for (ky, row) in SMOOTH.iter().enumerate() {
                    for (kx, weight) in row.iter().enumerate() {
                        let sample = img.get_pixel(x + kx as u32 - 1, y + ky as u32 - 1)[c];
                        acc += sample as f32 * weight;
                    }
                }
                let smoothed = acc / SMOOTH_SUM;
                let value = img.get_pixel(x, y)[c] as f32;
                out.get_pixel_mut(x, y)[c] = blend(smoothed, value, factor);
            }
        }
    }
    out
}

fn brightness(img: &mut RgbaImage, factor: f32) {
    for pixel in img.pixels_mut() {
        for c in 0..3 {
            pixel[c] = blend(0.0, pixel[c] as f32, factor);
        }
    }
}
