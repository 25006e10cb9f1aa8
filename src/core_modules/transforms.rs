// THEORY:
// The transform library is a toolbox of stateless pixel operations. Each one reads
// a source `Bitmap` and writes a destination `Bitmap`:
//
// - Per-pixel:   grayscale, negative, channel extraction, fixed and global-mean
//                binarization, RGB→HSV, HSV range segmentation.
// - Local window: adaptive-mean binarization, 5x5 Gaussian blur, box blur,
//                 binary dilation and erosion.
//
// Key principles:
// 1) Validate, then write. Every operation checks the geometry and channel counts
//    of both buffers before touching a single destination byte.
// 2) No aliasing. Source and destination are separate borrows, so every window
//    operation sees the *original* neighbour values, never partially overwritten
//    ones. The only in-place operation (`gray_negative`) is purely per-pixel.
// 3) Untouched borders. Window operations that need a full window (adaptive mean,
//    Gaussian, box blur) leave the border strip of the destination as it was; the
//    caller pre-fills it when full coverage matters. Morphology instead clips its
//    window at the image edge and therefore writes every pixel.

use crate::core_modules::bitmap::Bitmap;
use crate::error::{Result, VisionError};

/// Foreground value of a binary mask.
pub const FOREGROUND: u8 = 255;
/// Background value of a binary mask.
pub const BACKGROUND: u8 = 0;

/// How far below the image mean the global threshold sits.
pub const GLOBAL_MEAN_BIAS: i64 = 30;

/// Integer 5x5 Gaussian kernel; its weights sum to `GAUSSIAN_5X5_WEIGHT`.
pub const GAUSSIAN_5X5: [[u32; 5]; 5] = [
    [1, 4, 7, 4, 1],
    [4, 16, 26, 16, 4],
    [7, 26, 41, 26, 7],
    [4, 16, 26, 16, 4],
    [1, 4, 7, 4, 1],
];
pub const GAUSSIAN_5X5_WEIGHT: u32 = 273;

const RED_WEIGHT: f64 = 0.299;
const GREEN_WEIGHT: f64 = 0.587;
const BLUE_WEIGHT: f64 = 0.114;

fn expect_channels(operation: &'static str, bitmap: &Bitmap, channels: usize) -> Result<()> {
    if bitmap.channels() != channels {
        return Err(VisionError::shape(
            operation,
            format!(
                "expected {channels} channel(s), got {}",
                bitmap.describe()
            ),
        ));
    }
    Ok(())
}

fn expect_same_size(operation: &'static str, src: &Bitmap, dst: &Bitmap) -> Result<()> {
    if !src.same_size(dst) {
        return Err(VisionError::shape(
            operation,
            format!("source {} vs destination {}", src.describe(), dst.describe()),
        ));
    }
    Ok(())
}

/// Checks a gray-to-gray operation: both sides single channel, same grid.
fn expect_gray_pair(operation: &'static str, src: &Bitmap, dst: &Bitmap) -> Result<()> {
    expect_channels(operation, src, 1)?;
    expect_channels(operation, dst, 1)?;
    expect_same_size(operation, src, dst)
}

fn expect_kernel(operation: &'static str, size: usize) -> Result<()> {
    if size == 0 {
        return Err(VisionError::InvalidKernel { operation, size });
    }
    Ok(())
}

/// Inclusive window offsets for a kernel of `size` taps centred on the pixel.
/// Odd sizes are symmetric; even sizes lean one tap towards the negative side.
fn window_offsets(size: usize) -> (isize, isize) {
    (-((size / 2) as isize), ((size - 1) / 2) as isize)
}

/// Converts RGB to a single luma channel with truncating Rec. 601 weights.
pub fn grayscale(src: &Bitmap, dst: &mut Bitmap) -> Result<()> {
    expect_channels("grayscale", src, 3)?;
    expect_channels("grayscale", dst, 1)?;
    expect_same_size("grayscale", src, dst)?;

    for y in 0..src.height() {
        let (src_row, dst_row) = (src.row(y), dst.row_mut(y));
        for (rgb, gray) in src_row.chunks_exact(3).zip(dst_row.iter_mut()) {
            let luma = RED_WEIGHT * rgb[0] as f64
                + GREEN_WEIGHT * rgb[1] as f64
                + BLUE_WEIGHT * rgb[2] as f64;
            *gray = luma as u8;
        }
    }
    Ok(())
}

/// Inverts a single-channel image against its level ceiling, in place.
pub fn gray_negative(srcdst: &mut Bitmap) -> Result<()> {
    expect_channels("gray_negative", srcdst, 1)?;
    let ceiling = srcdst.levels().min(255) as u8;
    for y in 0..srcdst.height() {
        for value in srcdst.row_mut(y) {
            *value = ceiling.saturating_sub(*value);
        }
    }
    Ok(())
}

/// Copies one channel of a multi-channel image into a single-channel image.
pub fn extract_channel(src: &Bitmap, dst: &mut Bitmap, channel: usize) -> Result<()> {
    expect_channels("extract_channel", dst, 1)?;
    expect_same_size("extract_channel", src, dst)?;
    if channel >= src.channels() {
        return Err(VisionError::shape(
            "extract_channel",
            format!("channel {channel} of {}", src.describe()),
        ));
    }

    let channels = src.channels();
    for y in 0..src.height() {
        let (src_row, dst_row) = (src.row(y), dst.row_mut(y));
        for (pixel, out) in src_row.chunks_exact(channels).zip(dst_row.iter_mut()) {
            *out = pixel[channel];
        }
    }
    Ok(())
}

/// Fixed threshold: values strictly above `threshold` become foreground.
pub fn binarize_threshold(src: &Bitmap, dst: &mut Bitmap, threshold: u8) -> Result<()> {
    expect_gray_pair("binarize_threshold", src, dst)?;
    for y in 0..src.height() {
        let (src_row, dst_row) = (src.row(y), dst.row_mut(y));
        for (&value, out) in src_row.iter().zip(dst_row.iter_mut()) {
            *out = if value > threshold { FOREGROUND } else { BACKGROUND };
        }
    }
    Ok(())
}

/// Global-mean binarization with the default `GLOBAL_MEAN_BIAS`.
pub fn binarize_global_mean(src: &Bitmap, dst: &mut Bitmap) -> Result<()> {
    binarize_global_mean_with_bias(src, dst, GLOBAL_MEAN_BIAS)
}

/// Pixels at or above `mean - bias` become foreground, the rest background.
pub fn binarize_global_mean_with_bias(src: &Bitmap, dst: &mut Bitmap, bias: i64) -> Result<()> {
    expect_gray_pair("binarize_global_mean", src, dst)?;

    let sum: u64 = (0..src.height())
        .flat_map(|y| src.row(y).iter())
        .map(|&v| v as u64)
        .sum();
    let count = (src.width() * src.height()) as u64;
    let threshold = (sum / count) as i64 - bias;

    for y in 0..src.height() {
        let (src_row, dst_row) = (src.row(y), dst.row_mut(y));
        for (&value, out) in src_row.iter().zip(dst_row.iter_mut()) {
            *out = if value as i64 >= threshold {
                FOREGROUND
            } else {
                BACKGROUND
            };
        }
    }
    Ok(())
}

/// Local-mean binarization. A pixel darker than `localMean - offset` becomes
/// background, anything else foreground. Pixels closer than `window / 2` to an
/// edge are left untouched.
pub fn binarize_adaptive_mean(
    src: &Bitmap,
    dst: &mut Bitmap,
    window: usize,
    offset: i32,
) -> Result<()> {
    expect_gray_pair("binarize_adaptive_mean", src, dst)?;
    expect_kernel("binarize_adaptive_mean", window)?;

    let half = window / 2;
    let (lo, hi) = window_offsets(window);
    let taps = (window * window) as u32;
    if src.width() <= 2 * half || src.height() <= 2 * half {
        return Ok(());
    }

    for y in half..src.height() - half {
        for x in half..src.width() - half {
            let mut sum = 0u32;
            for dy in lo..=hi {
                let row = src.row(y.wrapping_add_signed(dy));
                for dx in lo..=hi {
                    sum += row[x.wrapping_add_signed(dx)] as u32;
                }
            }
            let local_mean = (sum / taps) as i32;
            let value = src.get(x, y, 0) as i32;
            let out = if value < local_mean - offset {
                BACKGROUND
            } else {
                FOREGROUND
            };
            dst.set(x, y, 0, out);
        }
    }
    Ok(())
}

/// 5x5 Gaussian smoothing; the two-pixel border is left untouched.
pub fn gaussian_blur_5x5(src: &Bitmap, dst: &mut Bitmap) -> Result<()> {
    expect_gray_pair("gaussian_blur_5x5", src, dst)?;
    if src.width() < 5 || src.height() < 5 {
        return Ok(());
    }

    for y in 2..src.height() - 2 {
        for x in 2..src.width() - 2 {
            let mut acc = 0u32;
            for (ky, weights) in GAUSSIAN_5X5.iter().enumerate() {
                let row = src.row(y + ky - 2);
                for (kx, &weight) in weights.iter().enumerate() {
                    acc += weight * row[x + kx - 2] as u32;
                }
            }
            dst.set(x, y, 0, (acc / GAUSSIAN_5X5_WEIGHT) as u8);
        }
    }
    Ok(())
}

/// Plain `kernel_size` x `kernel_size` mean; the border strip is left untouched.
pub fn box_blur(src: &Bitmap, dst: &mut Bitmap, kernel_size: usize) -> Result<()> {
    expect_gray_pair("box_blur", src, dst)?;
    expect_kernel("box_blur", kernel_size)?;

    let half = kernel_size / 2;
    let (lo, hi) = window_offsets(kernel_size);
    let taps = (kernel_size * kernel_size) as u32;
    if src.width() <= 2 * half || src.height() <= 2 * half {
        return Ok(());
    }

    for y in half..src.height() - half {
        for x in half..src.width() - half {
            let mut sum = 0u32;
            for dy in lo..=hi {
                let row = src.row(y.wrapping_add_signed(dy));
                for dx in lo..=hi {
                    sum += row[x.wrapping_add_signed(dx)] as u32;
                }
            }
            dst.set(x, y, 0, (sum / taps) as u8);
        }
    }
    Ok(())
}

/// Shared morphology walk over a window clipped at the image edge.
fn morphology(
    operation: &'static str,
    src: &Bitmap,
    dst: &mut Bitmap,
    kernel_size: usize,
    dilating: bool,
) -> Result<()> {
    expect_gray_pair(operation, src, dst)?;
    expect_kernel(operation, kernel_size)?;

    let (lo, hi) = window_offsets(kernel_size);
    let (width, height) = (src.width() as isize, src.height() as isize);

    for y in 0..height {
        let y0 = (y + lo).max(0);
        let y1 = (y + hi).min(height - 1);
        for x in 0..width {
            let x0 = (x + lo).max(0);
            let x1 = (x + hi).min(width - 1);

            // Dilation looks for any foreground, erosion for any non-foreground.
            let mut found = false;
            'window: for wy in y0..=y1 {
                let row = src.row(wy as usize);
                for wx in x0..=x1 {
                    if (row[wx as usize] == FOREGROUND) == dilating {
                        found = true;
                        break 'window;
                    }
                }
            }

            let foreground = if dilating { found } else { !found };
            dst.set(
                x as usize,
                y as usize,
                0,
                if foreground { FOREGROUND } else { BACKGROUND },
            );
        }
    }
    Ok(())
}

/// A pixel becomes foreground when any in-bounds neighbour is foreground.
pub fn dilate(src: &Bitmap, dst: &mut Bitmap, kernel_size: usize) -> Result<()> {
    morphology("dilate", src, dst, kernel_size, true)
}

/// A pixel stays foreground only when every in-bounds neighbour is foreground.
pub fn erode(src: &Bitmap, dst: &mut Bitmap, kernel_size: usize) -> Result<()> {
    morphology("erode", src, dst, kernel_size, false)
}

/// Converts RGB to HSV. Hue is scaled from [0, 360) degrees onto 0..=255;
/// saturation and value use the full 0..=255 range.
pub fn rgb_to_hsv(src: &Bitmap, dst: &mut Bitmap) -> Result<()> {
    expect_channels("rgb_to_hsv", src, 3)?;
    expect_channels("rgb_to_hsv", dst, 3)?;
    expect_same_size("rgb_to_hsv", src, dst)?;

    for y in 0..src.height() {
        let (src_row, dst_row) = (src.row(y), dst.row_mut(y));
        for (rgb, hsv) in src_row.chunks_exact(3).zip(dst_row.chunks_exact_mut(3)) {
            let (r, g, b) = (rgb[0] as f32, rgb[1] as f32, rgb[2] as f32);
            let max = r.max(g).max(b);
            let min = r.min(g).min(b);
            let chroma = max - min;

            let saturation = if max > 0.0 { chroma / max * 255.0 } else { 0.0 };
            let mut hue = if chroma <= 0.0 {
                0.0
            } else if max == r {
                60.0 * (g - b) / chroma
            } else if max == g {
                60.0 * (b - r) / chroma + 120.0
            } else {
                60.0 * (r - g) / chroma + 240.0
            };
            if hue < 0.0 {
                hue += 360.0;
            }

            hsv[0] = (hue / 360.0 * 255.0) as u8;
            hsv[1] = saturation as u8;
            hsv[2] = max as u8;
        }
    }
    Ok(())
}

/// Inclusive per-channel bounds for `hsv_segmentation`, in the byte units that
/// `rgb_to_hsv` produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HsvRange {
    pub hue: (u8, u8),
    pub saturation: (u8, u8),
    pub value: (u8, u8),
}

impl HsvRange {
    fn contains(&self, hsv: &[u8]) -> bool {
        let within = |v: u8, (lo, hi): (u8, u8)| lo <= v && v <= hi;
        within(hsv[0], self.hue) && within(hsv[1], self.saturation) && within(hsv[2], self.value)
    }
}

/// Marks pixels of an HSV image that fall inside `range` as foreground.
pub fn hsv_segmentation(src: &Bitmap, dst: &mut Bitmap, range: HsvRange) -> Result<()> {
    expect_channels("hsv_segmentation", src, 3)?;
    expect_channels("hsv_segmentation", dst, 1)?;
    expect_same_size("hsv_segmentation", src, dst)?;

    for y in 0..src.height() {
        let (src_row, dst_row) = (src.row(y), dst.row_mut(y));
        for (hsv, out) in src_row.chunks_exact(3).zip(dst_row.iter_mut()) {
            *out = if range.contains(hsv) {
                FOREGROUND
            } else {
                BACKGROUND
            };
        }
    }
    Ok(())
}
