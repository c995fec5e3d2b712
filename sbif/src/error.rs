use crate::predictor::Predictor;

/// Everything that can abort an encode or decode.
///
/// Nothing here is recovered from locally: a corrupt stream, a failed file
/// access or a failed compression stage ends the whole operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// First four bytes are not `"SBIF"`.
  #[error("bad magic {0:02x?}, expected \"SBIF\"")]
  BadMagic([u8; 4]),
  /// Input shorter than the 8-byte header.
  #[error("header truncated: {0} bytes, need 8")]
  HeaderTooShort(usize),
  /// Bitstream ended while a row was still being decoded.
  #[error("bitstream truncated at byte {offset}")]
  Truncated { offset: usize },
  /// Explicit-length run record with a count of zero.
  #[error("zero-length run record at byte {offset}")]
  ZeroRun { offset: usize },
  /// A run record continues past the end of its scanline.
  #[error("run continues past the end of a scanline at byte {offset}")]
  RunSpansRows { offset: usize },
  /// Row tag outside `0..=4`.
  #[error("unknown predictor tag {tag} on row {row}")]
  BadTag { tag: u8, row: usize },
  /// Row tag names a predictor whose reference rows do not exist yet.
  #[error("{predictor:?} needs {} row(s) above, found it on row {row}", .predictor.rows_above())]
  MissingReference { predictor: Predictor, row: usize },
  /// HorizontalDiff repeat bit before any delta was read.
  #[error("delta repeat with no previous delta on row {row}")]
  MissingDelta { row: usize },
  /// Width or height is zero or does not fit the u16 header fields.
  #[error("unsupported dimensions {width}x{height}, each must be 1..=65535")]
  Dimensions { width: u32, height: u32 },
  /// Sample buffer does not hold exactly `width * height` bytes.
  #[error("plane holds {actual} samples, expected {expected}")]
  PlaneSize { expected: usize, actual: usize },
  /// Planes of one image disagree in shape, or none were given.
  #[error("expected {expected} planes of the header's size, got {actual}")]
  ChannelCount { expected: usize, actual: usize },

  /// The generic compression stage failed (encode or decode side).
  #[error("compression stage failed")]
  Compressor(#[source] std::io::Error),
  /// The image-file collaborator could not decode or encode an image.
  #[cfg(feature = "png")]
  #[error("image source: {0}")]
  SourceDecode(#[from] image::ImageError),
  /// Reading or writing a `.sbif` file failed.
  #[error("file access: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T> = core::result::Result<T, Error>;
