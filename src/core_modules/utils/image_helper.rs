use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::ImageEncoder;

use crate::core_modules::bitmap::Bitmap;
use crate::error::{Result, VisionError};

/// Writes a 1-channel (mask or gray) or 3-channel bitmap as a PNG.
pub fn save_png(path: impl AsRef<Path>, bitmap: &Bitmap) -> Result<()> {
    let color_type = match bitmap.channels() {
        1 => image::ExtendedColorType::L8,
        3 => image::ExtendedColorType::Rgb8,
        _ => {
            return Err(VisionError::UnsupportedFormat(format!(
                "PNG dump of {}",
                bitmap.describe()
            )));
        }
    };

    let output = BufWriter::new(File::create(path)?);
    let encoder = image::codecs::png::PngEncoder::new(output);
    encoder.write_image(
        &bitmap.packed(),
        bitmap.width() as u32,
        bitmap.height() as u32,
        color_type,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_mask_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let name = dir.path().join("mask.png");
        let mut mask = Bitmap::with_stride(50, 20, 1, 255, 64).expect("valid mask");
        for y in 5..15 {
            for x in 10..40 {
                mask.set(x, y, 0, 255);
            }
        }

        save_png(&name, &mask).expect("Error Saving File.");

        let reloaded = image::open(&name).expect("png readable").into_luma8();
        assert_eq!(reloaded.dimensions(), (50, 20));
        assert_eq!(reloaded.get_pixel(10, 5).0, [255]);
        assert_eq!(reloaded.get_pixel(9, 5).0, [0]);
    }

    #[test]
    fn save_gradient_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let name = dir.path().join("gradient.png");
        let mut frame = Bitmap::new(64, 8, 3, 255).expect("valid frame");
        let mut intensity = 0u8;

        for pixel in frame.data_mut().chunks_mut(3) {
            pixel.fill(intensity);
            intensity = intensity.wrapping_add(1);
        }

        save_png(&name, &frame).expect("Error Saving File.");
    }
}
