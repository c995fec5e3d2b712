//! One 8-bit channel plane and its scanline-by-scanline codec.

use crate::bitstream::BitReader;
use crate::error::{Error, Result};
use crate::predictor::{Above, Predictor};
use crate::row::{decode_row, RowEncoder};

/// Row-major 8-bit samples of one channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plane {
  width: u16,
  height: u16,
  samples: Vec<u8>,
}

/// What the codec did with each scanline of a plane.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlaneStats {
  /// Winning predictor per row, top to bottom.
  pub rows: Vec<Predictor>,
  /// Encoded (pre-compression) bytes of the plane.
  pub bytes: usize,
}

impl PlaneStats {
  /// Rows won by each predictor, indexed by tag.
  pub fn counts(&self) -> [usize; 5] {
    let mut counts = [0usize; 5];
    for p in &self.rows {
      counts[p.tag() as usize] += 1;
    }
    counts
  }

  /// One glyph per row, e.g. `▬▮▬▬`.
  pub fn graph(&self) -> String {
    self.rows.iter().map(|p| p.glyph()).collect()
  }
}

impl Plane {
  pub fn new(width: u16, height: u16, samples: Vec<u8>) -> Result<Self> {
    check_dimensions(width, height)?;
    let expected = width as usize * height as usize;
    if samples.len() != expected {
      return Err(Error::PlaneSize { expected, actual: samples.len() });
    }
    Ok(Self { width, height, samples })
  }

  /// Plane with every sample set to `value`.
  pub fn filled(width: u16, height: u16, value: u8) -> Result<Self> {
    Self::new(width, height, vec![value; width as usize * height as usize])
  }

  #[inline]
  pub fn width(&self) -> u16 {
    self.width
  }

  #[inline]
  pub fn height(&self) -> u16 {
    self.height
  }

  #[inline]
  pub fn samples(&self) -> &[u8] {
    &self.samples
  }

  /// Samples of scanline `y`.
  pub fn row(&self, y: usize) -> &[u8] {
    let w = self.width as usize;
    &self.samples[y * w..(y + 1) * w]
  }

  /// Encode every scanline, appending the bitstream to `out`.
  pub fn encode(&self, out: &mut Vec<u8>) -> Result<PlaneStats> {
    let w = self.width as usize;
    let start = out.len();
    let mut encoder = RowEncoder::new(w);
    let mut rows = Vec::with_capacity(self.height as usize);
    for y in 0..self.height as usize {
      let above = Above::of_row(&self.samples[..y * w], w, y);
      rows.push(encoder.encode_into(self.row(y), above, y, out)?);
    }
    let stats = PlaneStats { rows, bytes: out.len() - start };
    log::debug!("encoded {}x{} plane into {} bytes {:?}", self.width, self.height, stats.bytes, stats.counts());
    Ok(stats)
  }

  /// Decode a `width` x `height` plane from the reader's current position.
  ///
  /// The reader is left at the first byte after this plane, so planes that
  /// share one stream are decoded by calling this repeatedly.
  pub fn decode(r: &mut BitReader<'_>, width: u16, height: u16) -> Result<(Self, PlaneStats)> {
    check_dimensions(width, height)?;
    // Every row spends at least one fresh byte, so a short stream is caught before allocating.
    if r.remaining() < height as usize {
      return Err(Error::Truncated { offset: r.position() + r.remaining() });
    }
    let w = width as usize;
    let start = r.position();
    let mut samples = vec![0u8; w * height as usize];
    let mut rows = Vec::with_capacity(height as usize);
    for y in 0..height as usize {
      let (prev, rest) = samples.split_at_mut(y * w);
      let above = Above::of_row(prev, w, y);
      rows.push(decode_row(r, above, y, &mut rest[..w])?);
    }
    let stats = PlaneStats { rows, bytes: r.position() - start };
    log::debug!("decoded {width}x{height} plane from {} bytes", stats.bytes);
    Ok((Self { width, height, samples }, stats))
  }
}

pub(crate) fn check_dimensions(width: u16, height: u16) -> Result<()> {
  if width == 0 || height == 0 {
    return Err(Error::Dimensions { width: width as u32, height: height as u32 });
  }
  Ok(())
}
