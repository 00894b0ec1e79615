//! Frame-to-frame visual similarity.
//!
//! Provides the [`FrameSimilarity`] trait and two implementations: windowed
//! structural similarity (SSIM) on downscaled grayscale frames, and a plain
//! mean-absolute-difference metric that SSIM falls back to when a frame is
//! too small to window.

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::GrayImage;
use sha2::{Digest, Sha256};
use std::path::Path;

/// SSIM window edge in pixels.
const WINDOW: u32 = 8;

/// Stabilizers from the SSIM paper for 8-bit images: (0.01·255)², (0.03·255)².
const C1: f64 = 6.5025;
const C2: f64 = 58.5225;

/// Trait for scoring how alike two frames are.
///
/// Implementations return a value in `[0.0, 1.0]` where `1.0` means identical.
pub trait FrameSimilarity: Send + Sync {
    fn similarity(&self, a: &GrayImage, b: &GrayImage) -> f64;

    /// Short identifier for logs.
    fn name(&self) -> &'static str;
}

/// `1 - mean(|a - b|) / 255` over frames resized to a common square.
#[derive(Debug, Clone)]
pub struct PixelDiffSimilarity {
    pub frame_size: u32,
}

impl FrameSimilarity for PixelDiffSimilarity {
    fn similarity(&self, a: &GrayImage, b: &GrayImage) -> f64 {
        let a = normalize(a, self.frame_size);
        let b = normalize(b, self.frame_size);
        pixel_diff(&a, &b)
    }

    fn name(&self) -> &'static str {
        "pixel_diff"
    }
}

/// Mean SSIM over non-overlapping windows of frames resized to a common square.
#[derive(Debug, Clone)]
pub struct StructuralSimilarity {
    pub frame_size: u32,
}

impl FrameSimilarity for StructuralSimilarity {
    fn similarity(&self, a: &GrayImage, b: &GrayImage) -> f64 {
        let a = normalize(a, self.frame_size);
        let b = normalize(b, self.frame_size);

        if a.width() < WINDOW || a.height() < WINDOW {
            return pixel_diff(&a, &b);
        }

        let mut total = 0.0;
        let mut windows = 0u32;
        for wy in (0..=a.height() - WINDOW).step_by(WINDOW as usize) {
            for wx in (0..=a.width() - WINDOW).step_by(WINDOW as usize) {
                total += window_ssim(&a, &b, wx, wy);
                windows += 1;
            }
        }

        if windows == 0 {
            return pixel_diff(&a, &b);
        }
        // SSIM can dip below zero for anti-correlated windows.
        (total / windows as f64).clamp(0.0, 1.0)
    }

    fn name(&self) -> &'static str {
        "structural"
    }
}

/// Create a similarity metric from its configured name.
///
/// Unknown names fall back to the pixel-difference metric.
pub fn create_similarity(method: &str, frame_size: u32) -> Box<dyn FrameSimilarity> {
    let frame_size = frame_size.max(1);
    match method {
        "structural" | "ssim" => Box::new(StructuralSimilarity { frame_size }),
        "pixel_diff" => Box::new(PixelDiffSimilarity { frame_size }),
        other => {
            tracing::warn!(method = other, "unknown similarity method, using pixel_diff");
            Box::new(PixelDiffSimilarity { frame_size })
        }
    }
}

/// Load a screenshot from disk as grayscale.
pub fn load_frame(path: &Path) -> Result<GrayImage> {
    let img = image::open(path)
        .with_context(|| format!("failed to decode screenshot {}", path.display()))?;
    Ok(img.to_luma8())
}

/// Hex SHA-256 of the screenshot file bytes.
pub fn hash_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read screenshot {}", path.display()))?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// Hex SHA-256 of raw frame pixels, for frames that never touched disk.
pub fn hash_frame(frame: &GrayImage) -> String {
    format!("{:x}", Sha256::digest(frame.as_raw()))
}

fn normalize(img: &GrayImage, size: u32) -> GrayImage {
    if img.width() == size && img.height() == size {
        img.clone()
    } else {
        image::imageops::resize(img, size, size, FilterType::Triangle)
    }
}

fn pixel_diff(a: &GrayImage, b: &GrayImage) -> f64 {
    let pixels = a.as_raw().len().min(b.as_raw().len());
    if pixels == 0 {
        return 0.0;
    }
    let diff: u64 = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(&p, &q)| (p as i32 - q as i32).unsigned_abs() as u64)
        .sum();
    1.0 - diff as f64 / (pixels as f64 * 255.0)
}

fn window_ssim(a: &GrayImage, b: &GrayImage, x0: u32, y0: u32) -> f64 {
    let n = (WINDOW * WINDOW) as f64;
    let (mut sum_a, mut sum_b) = (0.0, 0.0);
    for y in y0..y0 + WINDOW {
        for x in x0..x0 + WINDOW {
            sum_a += a.get_pixel(x, y)[0] as f64;
            sum_b += b.get_pixel(x, y)[0] as f64;
        }
    }
    let (mean_a, mean_b) = (sum_a / n, sum_b / n);

    let (mut var_a, mut var_b, mut cov) = (0.0, 0.0, 0.0);
    for y in y0..y0 + WINDOW {
        for x in x0..x0 + WINDOW {
            let da = a.get_pixel(x, y)[0] as f64 - mean_a;
            let db = b.get_pixel(x, y)[0] as f64 - mean_b;
            var_a += da * da;
            var_b += db * db;
            cov += da * db;
        }
    }
    var_a /= n - 1.0;
    var_b /= n - 1.0;
    cov /= n - 1.0;

    ((2.0 * mean_a * mean_b + C1) * (2.0 * cov + C2))
        / ((mean_a * mean_a + mean_b * mean_b + C1) * (var_a + var_b + C2))
}
