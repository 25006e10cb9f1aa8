// THEORY:
// The `Bitmap` is the most fundamental unit of the coin vision system. Every stage
// of the pipeline reads one and writes another: the camera frame, the grayscale
// intermediate, the smoothed image and the final binary mask are all `Bitmap`s.
//
// Key architectural principles:
// 1.  **Explicit Memory Layout**: Pixels live in one contiguous byte buffer. Row `y`
//     starts at `y * stride`, and channel `c` of pixel `x` sits at
//     `x * channels + c` inside that row. The stride may exceed
//     `width * channels` so rows can carry alignment padding.
// 2.  **Single Owner**: A `Bitmap` is a plain value. Handing it to the next stage is
//     a move, and its storage is freed exactly once when the last owner drops it.
//     There is no shared mutation and no separate "release" call to forget.
// 3.  **Dumb Container**: The bitmap knows its geometry and how to address a pixel.
//     It knows nothing about thresholds, kernels or coins; those belong to the
//     transform library and the extractor.

use crate::error::{Result, VisionError};

/// An owned, row-padded pixel buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: usize,
    height: usize,
    channels: usize,
    levels: u16,
    stride: usize,
    data: Vec<u8>,
}

impl Bitmap {
    /// Creates a zero-filled bitmap with tightly packed rows.
    pub fn new(width: usize, height: usize, channels: usize, levels: u16) -> Result<Self> {
        Self::with_stride(width, height, channels, levels, width.saturating_mul(channels))
    }

    /// Creates a zero-filled bitmap whose rows are `stride` bytes apart.
    pub fn with_stride(
        width: usize,
        height: usize,
        channels: usize,
        levels: u16,
        stride: usize,
    ) -> Result<Self> {
        let row_bytes = width.checked_mul(channels);
        if width == 0
            || height == 0
            || channels == 0
            || levels == 0
            || row_bytes.is_none_or(|row| stride < row)
        {
            return Err(VisionError::InvalidDimensions {
                width,
                height,
                channels,
                levels,
                stride,
            });
        }

        let bytes = stride
            .checked_mul(height)
            .ok_or(VisionError::AllocationFailure { bytes: usize::MAX })?;
        let mut data = Vec::new();
        data.try_reserve_exact(bytes)
            .map_err(|_| VisionError::AllocationFailure { bytes })?;
        data.resize(bytes, 0);

        Ok(Self {
            width,
            height,
            channels,
            levels,
            stride,
            data,
        })
    }

    /// Wraps an existing packed buffer (`stride == width * channels`).
    pub fn from_raw(
        width: usize,
        height: usize,
        channels: usize,
        levels: u16,
        data: Vec<u8>,
    ) -> Result<Self> {
        let mut bitmap = Self {
            width,
            height,
            channels,
            levels,
            stride: width.saturating_mul(channels),
            data: Vec::new(),
        };
        if width == 0 || height == 0 || channels == 0 || levels == 0 {
            return Err(VisionError::InvalidDimensions {
                width,
                height,
                channels,
                levels,
                stride: bitmap.stride,
            });
        }
        let expected = bitmap.stride.saturating_mul(height);
        if data.len() != expected {
            return Err(VisionError::shape(
                "from_raw",
                format!("expected {expected} bytes, got {}", data.len()),
            ));
        }
        bitmap.data = data;
        Ok(bitmap)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Intensity ceiling: 1 for binary images, up to 255 otherwise.
    pub fn levels(&self) -> u16 {
        self.levels
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Byte offset of channel `c` of pixel `(x, y)`. No bounds checking.
    #[inline]
    pub fn offset(&self, x: usize, y: usize, c: usize) -> usize {
        y * self.stride + x * self.channels + c
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, c: usize) -> u8 {
        self.data[self.offset(x, y, c)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, c: usize, value: u8) {
        let offset = self.offset(x, y, c);
        self.data[offset] = value;
    }

    /// The `width * channels` pixel bytes of row `y`, without padding.
    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.stride;
        &self.data[start..start + self.width * self.channels]
    }

    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let start = y * self.stride;
        let end = start + self.width * self.channels;
        &mut self.data[start..end]
    }

    /// The whole buffer, padding included.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Copies the pixel payload into a packed buffer with the row padding removed.
    pub fn packed(&self) -> Vec<u8> {
        if self.stride == self.width * self.channels {
            return self.data.clone();
        }
        let mut packed = Vec::with_capacity(self.width * self.channels * self.height);
        for y in 0..self.height {
            packed.extend_from_slice(self.row(y));
        }
        packed
    }

    /// True when both bitmaps cover the same pixel grid (channels may differ).
    pub fn same_size(&self, other: &Bitmap) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// True when both bitmaps cover the same grid with the same channel count.
    pub fn same_shape(&self, other: &Bitmap) -> bool {
        self.same_size(other) && self.channels == other.channels
    }

    /// Replicates a single-channel image into three identical channels.
    pub fn to_rgb(&self) -> Result<Bitmap> {
        if self.channels != 1 {
            return Err(VisionError::shape(
                "to_rgb",
                format!("expected 1 channel, got {}", self.channels),
            ));
        }
        let mut rgb = Bitmap::new(self.width, self.height, 3, self.levels)?;
        for y in 0..self.height {
            let src = self.row(y);
            for (pixel, &value) in rgb.row_mut(y).chunks_exact_mut(3).zip(src) {
                pixel.fill(value);
            }
        }
        Ok(rgb)
    }

    pub(crate) fn describe(&self) -> String {
        format!("{}x{}x{}", self.width, self.height, self.channels)
    }
}
