//! The five scanline predictors.
//!
//! Each one walks a row left to right and emits, per pixel, a `0` bit when its
//! guess was right or a `1` bit plus the 8-bit correction when it was not.
//!
//! ```text
//! tag  predictor        guess                              first pixel
//! ---  ---------------  ---------------------------------  -------------------
//! 0    Horizontal       left neighbour                     raw literal
//! 1    Vertical         pixel above                        flagged like others
//! 2    HorizontalDiff   same delta to the left as before   raw literal
//! 3    VerticalDiff     same delta to the row above        raw delta literal
//! 4    OffsetDiff       same delta to two rows above       raw delta literal
//! ```
//!
//! The `Diff` variants compare consecutive deltas (mod 256), so a smooth
//! gradient costs one bit per pixel.

use crate::bitstream::{BitReader, BitWriter};
use crate::error::{Error, Result};

/// Scanline transform, identified on the wire by a 3-bit tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Predictor {
  Horizontal = 0,
  Vertical = 1,
  HorizontalDiff = 2,
  VerticalDiff = 3,
  OffsetDiff = 4,
}

/// Rows already reconstructed above the current scanline.
#[derive(Copy, Clone, Debug, Default)]
pub struct Above<'a> {
  pub one: Option<&'a [u8]>,
  pub two: Option<&'a [u8]>,
}

impl<'a> Above<'a> {
  /// Reference rows for `row`, taken from `prev`, the row-major samples of all
  /// rows before it.
  pub fn of_row(prev: &'a [u8], width: usize, row: usize) -> Self {
    let at = |r: usize| prev.get(r * width..(r + 1) * width);
    Self { one: row.checked_sub(1).and_then(at), two: row.checked_sub(2).and_then(at) }
  }
}

impl Predictor {
  /// Evaluation order of the row selector; also tag order.
  pub const ALL: [Predictor; 5] = [
    Predictor::Horizontal,
    Predictor::Vertical,
    Predictor::HorizontalDiff,
    Predictor::VerticalDiff,
    Predictor::OffsetDiff,
  ];

  /// Width of the tag that opens every encoded row.
  pub const TAG_BITS: u8 = 3;

  #[inline]
  pub const fn tag(self) -> u8 {
    self as u8
  }

  pub const fn from_tag(tag: u8) -> Option<Self> {
    match tag {
      0 => Some(Predictor::Horizontal),
      1 => Some(Predictor::Vertical),
      2 => Some(Predictor::HorizontalDiff),
      3 => Some(Predictor::VerticalDiff),
      4 => Some(Predictor::OffsetDiff),
      _ => None,
    }
  }

  /// How many reconstructed rows above the current one this predictor reads.
  pub const fn rows_above(self) -> usize {
    match self {
      Predictor::Horizontal | Predictor::HorizontalDiff => 0,
      Predictor::Vertical | Predictor::VerticalDiff => 1,
      Predictor::OffsetDiff => 2,
    }
  }

  #[inline]
  pub const fn is_eligible(self, row: usize) -> bool {
    row >= self.rows_above()
  }

  pub const fn name(self) -> &'static str {
    match self {
      Predictor::Horizontal => "horizontal",
      Predictor::Vertical => "vertical",
      Predictor::HorizontalDiff => "horizontal-diff",
      Predictor::VerticalDiff => "vertical-diff",
      Predictor::OffsetDiff => "offset-diff",
    }
  }

  /// One-character marker used when graphing the per-row choice.
  pub const fn glyph(self) -> char {
    match self {
      Predictor::Horizontal => '▬',
      Predictor::Vertical => '▮',
      Predictor::HorizontalDiff => '▭',
      Predictor::VerticalDiff => '▯',
      Predictor::OffsetDiff => '◈',
    }
  }

  fn reference<'a>(self, above: Above<'a>, row: usize) -> Result<Option<&'a [u8]>> {
    let reference = match self {
      Predictor::Horizontal | Predictor::HorizontalDiff => return Ok(None),
      Predictor::Vertical | Predictor::VerticalDiff => above.one,
      Predictor::OffsetDiff => above.two,
    };
    reference.map(Some).ok_or(Error::MissingReference { predictor: self, row })
  }

  /// Emit the payload bits of `pixels` (scanline number `row`); the tag is the
  /// caller's job.
  pub fn encode(self, pixels: &[u8], above: Above<'_>, row: usize, w: &mut BitWriter) -> Result<()> {
    match (self, self.reference(above, row)?) {
      (Predictor::Horizontal, _) => encode_horizontal(pixels, w),
      (Predictor::HorizontalDiff, _) => encode_horizontal_diff(pixels, w),
      (Predictor::Vertical, Some(up)) => encode_vertical(pixels, up, w),
      (Predictor::VerticalDiff | Predictor::OffsetDiff, Some(up)) => encode_delta(pixels, up, w),
      (predictor, None) => return Err(Error::MissingReference { predictor, row }),
    }
    Ok(())
  }

  /// Rebuild `out` (scanline number `row`) from the payload bits.
  pub fn decode(self, r: &mut BitReader<'_>, above: Above<'_>, row: usize, out: &mut [u8]) -> Result<()> {
    match (self, self.reference(above, row)?) {
      (Predictor::Horizontal, _) => decode_horizontal(r, out),
      (Predictor::HorizontalDiff, _) => decode_horizontal_diff(r, row, out),
      (Predictor::Vertical, Some(up)) => decode_vertical(r, up, out),
      (Predictor::VerticalDiff | Predictor::OffsetDiff, Some(up)) => decode_delta(r, up, out),
      (predictor, None) => Err(Error::MissingReference { predictor, row }),
    }
  }
}

// ---- encoders ----

fn encode_horizontal(pixels: &[u8], w: &mut BitWriter) {
  let Some((&first, rest)) = pixels.split_first() else {
    return;
  };
  w.write_bits(first, 8);
  let mut prev = first;
  for &px in rest {
    if px == prev {
      w.write_bit(false);
    } else {
      w.write_miss(px);
    }
    prev = px;
  }
}

fn encode_vertical(pixels: &[u8], up: &[u8], w: &mut BitWriter) {
  debug_assert_eq!(pixels.len(), up.len());
  for (&px, &above) in pixels.iter().zip(up) {
    if px == above {
      w.write_bit(false);
    } else {
      w.write_miss(px);
    }
  }
}

fn encode_horizontal_diff(pixels: &[u8], w: &mut BitWriter) {
  let Some((&first, rest)) = pixels.split_first() else {
    return;
  };
  w.write_bits(first, 8);
  let mut left = first;
  // No delta precedes the second pixel, so it always misses.
  let mut prev_delta: Option<u8> = None;
  for &px in rest {
    let delta = px.wrapping_sub(left);
    if prev_delta == Some(delta) {
      w.write_bit(false);
    } else {
      w.write_miss(delta);
    }
    prev_delta = Some(delta);
    left = px;
  }
}

/// VerticalDiff and OffsetDiff: deltas against a reference row.
fn encode_delta(pixels: &[u8], reference: &[u8], w: &mut BitWriter) {
  debug_assert_eq!(pixels.len(), reference.len());
  let mut deltas = pixels.iter().zip(reference).map(|(&px, &r)| px.wrapping_sub(r));
  let Some(first) = deltas.next() else {
    return;
  };
  w.write_bits(first, 8);
  let mut prev = first;
  for delta in deltas {
    if delta == prev {
      w.write_bit(false);
    } else {
      w.write_miss(delta);
    }
    prev = delta;
  }
}

// ---- decoders ----

fn decode_horizontal(r: &mut BitReader<'_>, out: &mut [u8]) -> Result<()> {
  let Some((first, rest)) = out.split_first_mut() else {
    return Ok(());
  };
  let mut value = r.read_bits(8)?;
  *first = value;
  for px in rest {
    if r.read_bit()? {
      value = r.read_bits(8)?;
    }
    *px = value;
  }
  Ok(())
}

fn decode_vertical(r: &mut BitReader<'_>, up: &[u8], out: &mut [u8]) -> Result<()> {
  for (px, &above) in out.iter_mut().zip(up) {
    *px = if r.read_bit()? { r.read_bits(8)? } else { above };
  }
  Ok(())
}

fn decode_horizontal_diff(r: &mut BitReader<'_>, row: usize, out: &mut [u8]) -> Result<()> {
  let Some((first, rest)) = out.split_first_mut() else {
    return Ok(());
  };
  let mut value = r.read_bits(8)?;
  *first = value;
  let mut delta: Option<u8> = None;
  for px in rest {
    if r.read_bit()? {
      delta = Some(r.read_bits(8)?);
    }
    value = value.wrapping_add(delta.ok_or(Error::MissingDelta { row })?);
    *px = value;
  }
  Ok(())
}

fn decode_delta(r: &mut BitReader<'_>, reference: &[u8], out: &mut [u8]) -> Result<()> {
  let mut delta = 0u8;
  for (i, (px, &base)) in out.iter_mut().zip(reference).enumerate() {
    if i == 0 || r.read_bit()? {
      delta = r.read_bits(8)?;
    }
    *px = base.wrapping_add(delta);
  }
  Ok(())
}
