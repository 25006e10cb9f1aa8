// THEORY:
// Video decoding is someone else's job. The core only needs "give me the next
// colour frame, or tell me there are none left", and `FrameSource` is exactly that
// seam. Running out of frames is the normal way a run ends, so it is `Ok(None)`,
// not an error.
//
// `ImageSequence` is the stock source: a list of still frames on disk. NetPBM files
// go through our own codec; every other format is handed to the `image` crate.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use log::debug;

use crate::core_modules::bitmap::Bitmap;
use crate::core_modules::netpbm;
use crate::error::{Result, VisionError};

/// Supplies 3-channel frames one at a time.
pub trait FrameSource {
    /// The next frame, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Bitmap>>;
}

/// Frames read from image files, in the order given.
#[derive(Debug, Clone, Default)]
pub struct ImageSequence {
    paths: VecDeque<PathBuf>,
}

impl ImageSequence {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            paths: paths.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}

fn is_netpbm(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext.to_ascii_lowercase().as_str(), "pbm" | "pgm" | "ppm"))
}

/// Rescales samples in `0..=levels` to `0..=255`, so a PBM frame's 0/1 pixels
/// become black and white.
fn to_full_range(bitmap: Bitmap) -> Result<Bitmap> {
    let levels = u32::from(bitmap.levels());
    if levels == 255 {
        return Ok(bitmap);
    }
    let mut scaled = Bitmap::new(bitmap.width(), bitmap.height(), bitmap.channels(), 255)?;
    for y in 0..bitmap.height() {
        for (dst, &src) in scaled.row_mut(y).iter_mut().zip(bitmap.row(y)) {
            *dst = (u32::from(src).min(levels) * 255 / levels) as u8;
        }
    }
    Ok(scaled)
}

/// Loads one frame from disk as a 3-channel bitmap with 255 levels.
pub fn load_frame(path: &Path) -> Result<Bitmap> {
    if is_netpbm(path) {
        let bitmap = to_full_range(netpbm::decode(path)?)?;
        return match bitmap.channels() {
            3 => Ok(bitmap),
            1 => bitmap.to_rgb(),
            _ => Err(VisionError::shape(
                "load_frame",
                format!("{} is not a colour or gray frame", path.display()),
            )),
        };
    }

    let rgb = image::open(path)?.into_rgb8();
    let (width, height) = (rgb.width() as usize, rgb.height() as usize);
    debug!("decoded {} ({}x{}) via image", path.display(), width, height);
    Bitmap::from_raw(width, height, 3, 255, rgb.into_raw())
}

impl FrameSource for ImageSequence {
    fn next_frame(&mut self) -> Result<Option<Bitmap>> {
        match self.paths.pop_front() {
            Some(path) => load_frame(&path).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sequence_is_exhausted() {
        let mut source = ImageSequence::default();
        assert!(source.next_frame().expect("no error").is_none());
    }

    #[test]
    fn gray_netpbm_frames_become_rgb() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("frame.pgm");
        let gray = Bitmap::from_raw(2, 2, 1, 255, vec![1, 2, 3, 4]).expect("valid");
        netpbm::encode(&path, &gray).expect("write frame");

        let mut source = ImageSequence::new([path]);
        let frame = source.next_frame().expect("readable").expect("one frame");
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.row(1), &[3, 3, 3, 4, 4, 4]);
        assert!(source.next_frame().expect("no error").is_none());
    }

    #[test]
    fn pbm_frames_are_stretched_to_black_and_white() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("frame.pbm");
        let bits = Bitmap::from_raw(3, 1, 1, 1, vec![0, 1, 1]).expect("valid");
        netpbm::encode(&path, &bits).expect("write frame");

        let frame = load_frame(&path).expect("readable pbm");
        assert_eq!(frame.levels(), 255);
        assert_eq!(frame.row(0), &[0, 0, 0, 255, 255, 255, 255, 255, 255]);
    }

    #[test]
    fn low_maxval_frames_are_rescaled() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("frame.ppm");
        let frame = Bitmap::from_raw(1, 1, 3, 15, vec![0, 5, 15]).expect("valid");
        netpbm::encode(&path, &frame).expect("write frame");

        let loaded = load_frame(&path).expect("readable ppm");
        assert_eq!(loaded.row(0), &[0, 85, 255]);
    }

    #[test]
    fn png_frames_go_through_the_image_crate() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("frame.png");
        let mut rgb = image::RgbImage::new(3, 2);
        rgb.put_pixel(2, 1, image::Rgb([10, 20, 30]));
        rgb.save(&path).expect("write png");

        let frame = load_frame(&path).expect("readable png");
        assert_eq!((frame.width(), frame.height(), frame.channels()), (3, 2, 3));
        assert_eq!(&frame.row(1)[6..9], &[10, 20, 30]);
    }

    #[test]
    fn unreadable_frame_is_reported() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut source = ImageSequence::new([dir.path().join("missing.ppm")]);
        assert!(matches!(source.next_frame(), Err(VisionError::Io(_))));
    }
}
