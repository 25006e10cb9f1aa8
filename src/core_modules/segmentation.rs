// THEORY:
// Segmentation turns a raw colour frame into a clean binary mask in which coins are
// foreground (255) and the table is background (0). The stage is a fixed recipe,
// not a configurable one:
//
//   grayscale -> 3x3 box mean -> global-mean threshold -> dilate(3) -> erode(3)
//
// The trailing dilate/erode pair is a morphological closing: it seals hairline
// gaps inside a coin without growing isolated specks.

use log::debug;

use crate::core_modules::bitmap::Bitmap;
use crate::core_modules::transforms;
use crate::error::{Result, VisionError};

/// Window of the smoothing mean.
pub const SMOOTHING_KERNEL: usize = 3;
/// Window of the closing.
pub const CLOSING_KERNEL: usize = 3;

/// Runs the fixed segmentation recipe on a 3-channel frame.
pub fn segment(frame: &Bitmap) -> Result<Bitmap> {
    if frame.channels() != 3 {
        return Err(VisionError::shape(
            "segment",
            format!("expected a 3-channel frame, got {}", frame.describe()),
        ));
    }
    let (width, height) = (frame.width(), frame.height());

    let mut gray = Bitmap::new(width, height, 1, 255)?;
    transforms::grayscale(frame, &mut gray)?;

    // Border pixels the box mean cannot reach keep their gray value.
    let mut smoothed = gray.clone();
    transforms::box_blur(&gray, &mut smoothed, SMOOTHING_KERNEL)?;
    drop(gray);

    let mut binary = Bitmap::new(width, height, 1, 255)?;
    transforms::binarize_global_mean(&smoothed, &mut binary)?;

    let mut dilated = Bitmap::new(width, height, 1, 255)?;
    transforms::dilate(&binary, &mut dilated, CLOSING_KERNEL)?;

    // The binary buffer is free again and becomes the final mask.
    transforms::erode(&dilated, &mut binary, CLOSING_KERNEL)?;

    debug!("segmented {}x{} frame", width, height);
    Ok(binary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::transforms::{BACKGROUND, FOREGROUND};

    fn frame_with_square(size: usize, lo: usize, hi: usize, fg: u8, bg: u8) -> Bitmap {
        let mut frame = Bitmap::new(size, size, 3, 255).expect("valid frame");
        for y in 0..size {
            for x in 0..size {
                let inside = (lo..hi).contains(&x) && (lo..hi).contains(&y);
                for c in 0..3 {
                    frame.set(x, y, c, if inside { fg } else { bg });
                }
            }
        }
        frame
    }

    #[test]
    fn rejects_gray_frames() {
        let gray = Bitmap::new(8, 8, 1, 255).expect("valid");
        assert!(matches!(
            segment(&gray),
            Err(VisionError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn mask_is_binary_and_single_channel() {
        let frame = frame_with_square(40, 10, 30, 220, 20);
        let mask = segment(&frame).expect("segmentation succeeds");
        assert_eq!(mask.channels(), 1);
        assert_eq!((mask.width(), mask.height()), (40, 40));
        assert!(mask.data().iter().all(|&v| v == FOREGROUND || v == BACKGROUND));
    }

    #[test]
    fn bright_object_on_dark_table_is_foreground() {
        let frame = frame_with_square(40, 10, 30, 220, 20);
        let mask = segment(&frame).expect("segmentation succeeds");
        assert_eq!(mask.get(20, 20, 0), FOREGROUND);
        assert_eq!(mask.get(2, 2, 0), BACKGROUND);
        assert_eq!(mask.get(37, 37, 0), BACKGROUND);
    }
}
