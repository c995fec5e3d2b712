//! Escape-coded run-length bitstream.
//!
//! Bits are accumulated **MSB-first** into bytes. Every completed byte is a
//! *symbol* fed to a byte-level run-length coder:
//!
//! ```text
//! run L of symbol S            bytes emitted
//! ---------------------------  ----------------------------------------
//! L <= 2, S not a sentinel     S repeated L times
//! L <= 255                     MARK8  (0xFC)  L            S
//! L <= 65535                   MARK16 (0xFD)  L>>8  L&0xFF  S
//! ```
//!
//! A symbol equal to one of the two sentinels always takes the explicit
//! record, even for a run of one. Runs never cross scanlines: the writer pads
//! every row to a byte boundary with zero bits (the padding is compressed like
//! any other bits) and flushes its pending run in [`BitWriter::end_row`]; the
//! reader mirrors that in [`BitReader::discard_to_row_end`].

use crate::error::{Error, Result};

/// Escape for runs with an 8-bit count.
pub const MARK8: u8 = 0xFC;
/// Escape for runs with a 16-bit big-endian count.
pub const MARK16: u8 = 0xFD;

#[inline]
pub const fn is_sentinel(b: u8) -> bool {
  b == MARK8 || b == MARK16
}

/// Upper bound of the encoded size of one row of `width` pixels.
///
/// Worst case: tag plus a flagged 8-bit miss for every pixel, and every
/// resulting byte a lone sentinel escaped into a 3-byte record.
#[inline]
pub const fn worst_case_row_len(width: usize) -> usize {
  (3 + 9 * width).div_ceil(8) * 3
}

/// Bit accumulator feeding the run-length coder.
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
  buf: Vec<u8>,
  cache: u8,
  held: u8,
  symbol: u8,
  run: u16,
}

impl BitWriter {
  pub fn with_capacity(capacity: usize) -> Self {
    Self { buf: Vec::with_capacity(capacity), ..Self::default() }
  }

  /// Writer pre-sized for rows of `width` pixels.
  pub fn for_width(width: usize) -> Self {
    Self::with_capacity(worst_case_row_len(width))
  }

  pub fn write_bit(&mut self, bit: bool) {
    self.cache = (self.cache << 1) | bit as u8;
    self.held += 1;
    if self.held == 8 {
      let symbol = self.cache;
      self.cache = 0;
      self.held = 0;
      self.push_symbol(symbol);
    }
  }

  /// Write the low `n` bits of `value`, MSB first.
  pub fn write_bits(&mut self, value: u8, n: u8) {
    debug_assert!(n <= 8);
    for i in (0..n).rev() {
      self.write_bit((value >> i) & 1 != 0);
    }
  }

  /// Flag bit `1` followed by a full 8-bit value: a prediction miss.
  #[inline]
  pub fn write_miss(&mut self, value: u8) {
    self.write_bit(true);
    self.write_bits(value, 8);
  }

  /// Pad the row to a byte boundary with zero bits and flush the pending run.
  pub fn end_row(&mut self) {
    while self.held != 0 {
      self.write_bit(false);
    }
    self.flush_run();
  }

  /// Drop all output and state so the writer can take the next trial.
  pub fn clear(&mut self) {
    self.buf.clear();
    self.cache = 0;
    self.held = 0;
    self.symbol = 0;
    self.run = 0;
  }

  /// Encoded bytes so far (complete only after [`end_row`](Self::end_row)).
  #[inline]
  pub fn as_bytes(&self) -> &[u8] {
    &self.buf
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.buf.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.buf.is_empty()
  }

  pub fn into_bytes(self) -> Vec<u8> {
    self.buf
  }

  fn push_symbol(&mut self, symbol: u8) {
    if self.run > 0 && symbol == self.symbol && self.run < u16::MAX {
      self.run += 1;
      return;
    }
    self.flush_run();
    self.symbol = symbol;
    self.run = 1;
  }

  fn flush_run(&mut self) {
    let (symbol, run) = (self.symbol, self.run);
    if run == 0 {
      return;
    }
    if run < 3 && !is_sentinel(symbol) {
      for _ in 0..run {
        self.buf.push(symbol);
      }
    } else if run < 0x100 {
      self.buf.extend_from_slice(&[MARK8, run as u8, symbol]);
    } else {
      let [hi, lo] = run.to_be_bytes();
      self.buf.extend_from_slice(&[MARK16, hi, lo, symbol]);
    }
    self.run = 0;
  }
}

/// Mirror of [`BitWriter`]: expands run records back into symbols and
/// shifts bits out of them MSB first.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
  buf: &'a [u8],
  pos: usize,
  cache: u8,
  held: u8,
  symbol: u8,
  run: u16,
}

impl<'a> BitReader<'a> {
  pub fn new(buf: &'a [u8]) -> Self {
    Self { buf, pos: 0, cache: 0, held: 0, symbol: 0, run: 0 }
  }

  /// Byte offset of the next unread run record.
  #[inline]
  pub fn position(&self) -> usize {
    self.pos
  }

  /// Bytes not yet touched by the reader.
  #[inline]
  pub fn remaining(&self) -> usize {
    self.buf.len() - self.pos
  }

  pub fn read_bit(&mut self) -> Result<bool> {
    if self.held == 0 {
      if self.run == 0 {
        self.next_run()?;
      }
      self.cache = self.symbol;
      self.held = 8;
      self.run -= 1;
    }
    let bit = self.cache & 0x80 != 0;
    self.cache <<= 1;
    self.held -= 1;
    Ok(bit)
  }

  /// Read `n <= 8` bits, MSB first.
  pub fn read_bits(&mut self, n: u8) -> Result<u8> {
    debug_assert!(n <= 8);
    let mut v = 0u8;
    for _ in 0..n {
      v = (v << 1) | self.read_bit()? as u8;
    }
    Ok(v)
  }

  /// Skip the zero padding that closes a row.
  ///
  /// The writer flushes its run at every row end, so a run still pending
  /// here means the record was damaged.
  pub fn discard_to_row_end(&mut self) -> Result<()> {
    self.cache = 0;
    self.held = 0;
    if self.run != 0 {
      return Err(Error::RunSpansRows { offset: self.pos });
    }
    Ok(())
  }

  fn next_byte(&mut self) -> Result<u8> {
    let b = *self.buf.get(self.pos).ok_or(Error::Truncated { offset: self.pos })?;
    self.pos += 1;
    Ok(b)
  }

  fn next_run(&mut self) -> Result<()> {
    let start = self.pos;
    let (run, symbol) = match self.next_byte()? {
      MARK8 => {
        let run = self.next_byte()? as u16;
        (run, self.next_byte()?)
      }
      MARK16 => {
        let hi = self.next_byte()?;
        let lo = self.next_byte()?;
        (u16::from_be_bytes([hi, lo]), self.next_byte()?)
      }
      literal => (1, literal),
    };
    if run == 0 {
      return Err(Error::ZeroRun { offset: start });
    }
    self.run = run;
    self.symbol = symbol;
    Ok(())
  }
}
