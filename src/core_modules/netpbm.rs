// THEORY:
// The NetPBM codec gives the core a dependency-free way to load and store test
// frames and masks. Only the three binary flavours are supported:
//
// - `P4` (PBM): 1 channel, 1 level. Rows are packed eight pixels per byte, most
//   significant bit first, and padded to a whole byte. A set bit is a *black*
//   pixel, so bit 1 decodes to value 0 and bit 0 decodes to value 1.
// - `P5` (PGM): 1 channel, up to 255 levels, one byte per pixel.
// - `P6` (PPM): 3 channels (R, G, B), up to 255 levels, one byte per channel.
//
// The header is a run of whitespace-separated ASCII tokens (magic, width, height
// and, except for PBM, the maximum value). A `#` starts a comment that runs to the
// end of the line. Exactly one whitespace byte separates the last token from the
// raw pixel data.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::debug;

use crate::core_modules::bitmap::Bitmap;
use crate::error::{Result, VisionError};

/// The three supported NetPBM flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetpbmFormat {
    Pbm,
    Pgm,
    Ppm,
}

impl NetpbmFormat {
    fn from_magic(magic: &[u8]) -> Result<Self> {
        match magic {
            b"P4" => Ok(NetpbmFormat::Pbm),
            b"P5" => Ok(NetpbmFormat::Pgm),
            b"P6" => Ok(NetpbmFormat::Ppm),
            other => Err(VisionError::UnsupportedFormat(format!(
                "magic token {:?}",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    /// The format a bitmap is written as.
    pub fn for_bitmap(bitmap: &Bitmap) -> Result<Self> {
        match (bitmap.channels(), bitmap.levels()) {
            (1, 1) => Ok(NetpbmFormat::Pbm),
            (1, _) => Ok(NetpbmFormat::Pgm),
            (3, _) => Ok(NetpbmFormat::Ppm),
            (channels, _) => Err(VisionError::UnsupportedFormat(format!(
                "no NetPBM format stores {channels} channel(s)"
            ))),
        }
    }

    fn channels(self) -> usize {
        match self {
            NetpbmFormat::Pbm | NetpbmFormat::Pgm => 1,
            NetpbmFormat::Ppm => 3,
        }
    }
}

/// Reads header tokens from the front of a byte slice.
struct HeaderReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> HeaderReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    /// Returns the next token, or an empty slice at end of input.
    fn next_token(&mut self) -> &'a [u8] {
        loop {
            while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
                self.pos += 1;
            }
            if self.peek() != Some(b'#') {
                break;
            }
            while self.peek().is_some_and(|b| b != b'\n') {
                self.pos += 1;
            }
        }

        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| !b.is_ascii_whitespace() && b != b'#')
        {
            self.pos += 1;
        }
        let token = &self.bytes[start..self.pos];

        // The single whitespace byte that ends the token belongs to the header.
        if self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
        token
    }

    fn next_number(&mut self, field: &'static str) -> Result<usize> {
        std::str::from_utf8(self.next_token())
            .ok()
            .and_then(|token| token.parse::<usize>().ok())
            .ok_or(VisionError::MalformedHeader(field))
    }

    fn remaining(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }
}

/// Reads a PBM, PGM or PPM file from disk.
pub fn decode(path: impl AsRef<Path>) -> Result<Bitmap> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let bitmap = decode_bytes(&bytes)?;
    debug!("decoded {} as {}", path.display(), bitmap.describe());
    Ok(bitmap)
}

/// Decodes an in-memory NetPBM image.
pub fn decode_bytes(bytes: &[u8]) -> Result<Bitmap> {
    let mut reader = HeaderReader::new(bytes);
    let format = NetpbmFormat::from_magic(reader.next_token())?;
    let width = reader.next_number("width")?;
    let height = reader.next_number("height")?;
    let levels = match format {
        NetpbmFormat::Pbm => 1,
        NetpbmFormat::Pgm | NetpbmFormat::Ppm => {
            let max_value = reader.next_number("maximum intensity")?;
            u16::try_from(max_value)
                .ok()
                .filter(|levels| (1..=255).contains(levels))
                .ok_or(VisionError::MalformedHeader("maximum intensity"))?
        }
    };

    let row_bytes = match format {
        NetpbmFormat::Pbm => pbm_row_bytes(width),
        NetpbmFormat::Pgm | NetpbmFormat::Ppm => width.saturating_mul(format.channels()),
    };
    let expected = row_bytes.saturating_mul(height);
    let payload = reader.remaining();
    if payload.len() < expected {
        return Err(VisionError::TruncatedData {
            expected,
            actual: payload.len(),
        });
    }

    let mut bitmap = Bitmap::new(width, height, format.channels(), levels)?;
    match format {
        NetpbmFormat::Pbm => unpack_pbm(payload, &mut bitmap),
        NetpbmFormat::Pgm | NetpbmFormat::Ppm => {
            for (y, src) in payload.chunks_exact(row_bytes).take(height).enumerate() {
                bitmap.row_mut(y).copy_from_slice(src);
            }
        }
    }

    Ok(bitmap)
}

fn pbm_row_bytes(width: usize) -> usize {
    width.div_ceil(8)
}

/// Expands MSB-first packed rows. The payload length was checked by the caller.
fn unpack_pbm(payload: &[u8], bitmap: &mut Bitmap) {
    let row_bytes = pbm_row_bytes(bitmap.width());
    for y in 0..bitmap.height() {
        let packed = &payload[y * row_bytes..(y + 1) * row_bytes];
        for (x, pixel) in bitmap.row_mut(y).iter_mut().enumerate() {
            let bit = packed[x / 8] & (1 << (7 - x % 8));
            *pixel = if bit != 0 { 0 } else { 1 };
        }
    }
}

fn pack_pbm(bitmap: &Bitmap) -> Vec<u8> {
    let row_bytes = pbm_row_bytes(bitmap.width());
    let mut packed = vec![0u8; row_bytes * bitmap.height()];
    for y in 0..bitmap.height() {
        let dst = &mut packed[y * row_bytes..(y + 1) * row_bytes];
        for (x, &pixel) in bitmap.row(y).iter().enumerate() {
            if pixel == 0 {
                dst[x / 8] |= 1 << (7 - x % 8);
            }
        }
    }
    packed
}

/// Writes a bitmap to any writer, choosing the format from its channels and levels.
pub fn encode_to_writer<W: Write>(writer: &mut W, bitmap: &Bitmap) -> Result<()> {
    let format = NetpbmFormat::for_bitmap(bitmap)?;
    let (width, height) = (bitmap.width(), bitmap.height());

    match format {
        NetpbmFormat::Pbm => {
            write!(writer, "P4\n{width} {height}\n")?;
            writer.write_all(&pack_pbm(bitmap))?;
        }
        NetpbmFormat::Pgm | NetpbmFormat::Ppm => {
            let magic = if format == NetpbmFormat::Pgm { "P5" } else { "P6" };
            write!(writer, "{magic}\n{width} {height}\n{}\n", bitmap.levels())?;
            for y in 0..height {
                writer.write_all(bitmap.row(y))?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}

/// Writes a bitmap to `path`. On failure a partially written file may remain.
pub fn encode(path: impl AsRef<Path>, bitmap: &Bitmap) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(fs::File::create(path)?);
    encode_to_writer(&mut writer, bitmap)?;
    debug!("encoded {} to {}", bitmap.describe(), path.display());
    Ok(())
}
