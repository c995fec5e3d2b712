//! Per-scanline predictor selection and dispatch.
//!
//! Encoding tries every eligible [`Predictor`] on the row, each into its own
//! reusable trial buffer, and keeps the shortest. Ties are settled by a fixed
//! scan the decoder never needs to know about:
//!
//! ```text
//! best = MAX
//! Horizontal      len <  best
//! Vertical        len <  best
//! HorizontalDiff  len <= best   (wins ties against everything before it)
//! VerticalDiff    len <  best
//! OffsetDiff      len <  best   (row >= 2 only)
//! ```
//!
//! Row 0 is always Horizontal.

use crate::bitstream::{BitReader, BitWriter};
use crate::error::{Error, Result};
use crate::predictor::{Above, Predictor};

/// Trial lengths in bytes, indexed by tag; `None` for predictors not tried.
pub type TrialLengths = [Option<usize>; 5];

/// Whether the encoder tries `p` on scanline `row`.
#[inline]
pub const fn is_candidate(p: Predictor, row: usize) -> bool {
  if row == 0 {
    matches!(p, Predictor::Horizontal)
  } else {
    p.is_eligible(row)
  }
}

/// Pick the winner among the trial lengths.
pub fn select(lengths: &TrialLengths) -> Predictor {
  let mut best = usize::MAX;
  let mut choice = Predictor::Horizontal;
  for p in Predictor::ALL {
    let Some(len) = lengths[p.tag() as usize] else {
      continue;
    };
    let wins = if p == Predictor::HorizontalDiff { len <= best } else { len < best };
    if wins {
      best = len;
      choice = p;
    }
  }
  choice
}

/// Reusable per-row encoder state: one trial buffer per predictor.
#[derive(Debug)]
pub struct RowEncoder {
  trials: [BitWriter; 5],
  lengths: TrialLengths,
}

impl RowEncoder {
  /// Encoder for rows of `width` pixels; trial buffers are sized for the worst case.
  pub fn new(width: usize) -> Self {
    Self { trials: core::array::from_fn(|_| BitWriter::for_width(width)), lengths: [None; 5] }
  }

  /// Try every candidate on `pixels` (scanline number `row`) and return the winner.
  ///
  /// The winner's tag + payload stays available through [`output`](Self::output)
  /// until the next call.
  pub fn encode(&mut self, pixels: &[u8], above: Above<'_>, row: usize) -> Result<Predictor> {
    for p in Predictor::ALL {
      let w = &mut self.trials[p.tag() as usize];
      w.clear();
      self.lengths[p.tag() as usize] = if is_candidate(p, row) {
        w.write_bits(p.tag(), Predictor::TAG_BITS);
        p.encode(pixels, above, row, w)?;
        w.end_row();
        Some(w.len())
      } else {
        None
      };
    }
    let choice = select(&self.lengths);
    log::trace!("row {row}: {:?} from {:?}", choice, self.lengths);
    Ok(choice)
  }

  /// Encoded bytes of `p`'s trial on the last row.
  #[inline]
  pub fn output(&self, p: Predictor) -> &[u8] {
    self.trials[p.tag() as usize].as_bytes()
  }

  /// Trial lengths of the last row.
  #[inline]
  pub fn lengths(&self) -> &TrialLengths {
    &self.lengths
  }

  /// Encode a row and append the winning bytes to `out`.
  pub fn encode_into(&mut self, pixels: &[u8], above: Above<'_>, row: usize, out: &mut Vec<u8>) -> Result<Predictor> {
    let choice = self.encode(pixels, above, row)?;
    out.extend_from_slice(self.output(choice));
    Ok(choice)
  }
}

/// Read one row's tag, rebuild it into `out` and skip the row padding.
pub fn decode_row(r: &mut BitReader<'_>, above: Above<'_>, row: usize, out: &mut [u8]) -> Result<Predictor> {
  let tag = r.read_bits(Predictor::TAG_BITS)?;
  let p = Predictor::from_tag(tag).ok_or(Error::BadTag { tag, row })?;
  if !p.is_eligible(row) {
    return Err(Error::MissingReference { predictor: p, row });
  }
  p.decode(r, above, row, out)?;
  r.discard_to_row_end()?;
  Ok(p)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn t_select_strict_order() {
    assert_eq!(select(&[Some(2), None, None, None, None]), Predictor::Horizontal);
    assert_eq!(select(&[Some(5), Some(3), Some(4), Some(3), Some(3)]), Predictor::Vertical);
    assert_eq!(select(&[Some(5), Some(5), Some(6), Some(4), Some(1)]), Predictor::OffsetDiff);
  }

  #[test]
  fn t_select_ties() {
    // Horizontal keeps ties against the strict predictors.
    assert_eq!(select(&[Some(2), Some(2), Some(3), Some(2), Some(2)]), Predictor::Horizontal);
    // HorizontalDiff takes ties from everything evaluated before it...
    assert_eq!(select(&[Some(4), Some(3), Some(3), Some(4), None]), Predictor::HorizontalDiff);
    assert_eq!(select(&[Some(2), Some(2), Some(2), Some(2), Some(2)]), Predictor::HorizontalDiff);
    // ...and keeps them against everything after it.
    assert_eq!(select(&[Some(5), Some(4), Some(3), Some(3), Some(3)]), Predictor::HorizontalDiff);
  }

  #[test]
  fn t_candidates() {
    assert!(is_candidate(Predictor::Horizontal, 0));
    assert!(!is_candidate(Predictor::HorizontalDiff, 0));
    assert!(is_candidate(Predictor::VerticalDiff, 1));
    assert!(!is_candidate(Predictor::OffsetDiff, 1));
    assert!(is_candidate(Predictor::OffsetDiff, 2));
  }

  #[test]
  fn t_row_zero_forced_horizontal() {
    let mut enc = RowEncoder::new(6);
    // HorizontalDiff would be cheaper on a ramp, but row 0 never tries it.
    let p = enc.encode(&[0, 10, 20, 30, 40, 50], Above::default(), 0).unwrap();
    assert_eq!(p, Predictor::Horizontal);
    assert_eq!(enc.lengths(), &[Some(7), None, None, None, None]);
  }

  #[test]
  fn t_row_one_never_offset() {
    let up = [9u8; 4];
    let mut enc = RowEncoder::new(4);
    enc.encode(&[1, 2, 3, 4], Above { one: Some(&up), two: None }, 1).unwrap();
    assert!(enc.lengths()[Predictor::OffsetDiff.tag() as usize].is_none());
    assert!(enc.lengths()[..4].iter().all(Option::is_some));
  }

  #[test]
  fn t_horizontal_diff_wins_tie_with_vertical() {
    // H=5, V=3, HD=3, VD=4 bytes.
    let up = [0u8, 1, 9, 9];
    let mut enc = RowEncoder::new(4);
    let p = enc.encode(&[0, 1, 2, 3], Above { one: Some(&up), two: None }, 1).unwrap();
    assert_eq!(enc.lengths(), &[Some(5), Some(3), Some(3), Some(4), None]);
    assert_eq!(p, Predictor::HorizontalDiff);
    assert_eq!(enc.output(p), [0x40, 0x10, 0x10]);
  }

  #[test]
  fn t_encode_decode_row() {
    let two = [7u8, 7, 7, 7, 7];
    let one = [8u8, 9, 10, 11, 12];
    let pixels = [9u8, 9, 10, 10, 200];
    let above = Above { one: Some(&one), two: Some(&two) };
    let mut enc = RowEncoder::new(pixels.len());
    let mut out = Vec::new();
    let p = enc.encode_into(&pixels, above, 2, &mut out).unwrap();

    let mut r = BitReader::new(&out);
    let mut row = [0u8; 5];
    assert_eq!(decode_row(&mut r, above, 2, &mut row).unwrap(), p);
    assert_eq!(row, pixels);
    assert_eq!(r.remaining(), 0);
  }

  #[test]
  fn t_bad_tag() {
    let mut w = BitWriter::default();
    w.write_bits(5, 3);
    w.end_row();
    let mut r = BitReader::new(w.as_bytes());
    let err = decode_row(&mut r, Above::default(), 4, &mut [0; 1]).unwrap_err();
    assert!(matches!(err, Error::BadTag { tag: 5, row: 4 }));
  }

  #[test]
  fn t_tag_needs_rows_above() {
    let mut w = BitWriter::default();
    w.write_bits(Predictor::OffsetDiff.tag(), 3);
    w.write_bits(0, 8);
    w.end_row();
    let mut r = BitReader::new(w.as_bytes());
    let err = decode_row(&mut r, Above::default(), 1, &mut [0; 1]).unwrap_err();
    assert!(matches!(err, Error::MissingReference { predictor: Predictor::OffsetDiff, row: 1 }));
  }
}
