//! SBIF: a lossless codec for 8-bit image planes.
//!
//! Each channel plane is coded scanline by scanline. For every row the
//! encoder tries five predictors (see [`Predictor`]), keeps the one whose
//! output is shortest and writes a 3-bit tag followed by its bits. The bits
//! go through an escape-coded byte run-length coder ([`bitstream`]) and
//! finally the concatenated planes are compressed as one zstd frame.
//!
//! File format (see [`container`]):
//! - Header `"SBIF"`, u16 width, u16 height (little-endian)
//! - zstd frame of: plane R, plane G, plane B, plane A, unframed
//!
//! Row bitstream (see [`row`]):
//! - `tag:3` then per-pixel `0` (prediction hit) or `1 value:8` (miss)
//! - zero padding to the next byte; runs never cross rows
//!
//! ```
//! # fn main() -> sbif::Result<()> {
//! let plane = sbif::Plane::new(4, 2, vec![1, 1, 1, 1, 1, 2, 3, 4])?;
//! let data = sbif::encode(&[plane.clone()], sbif::DEFAULT_OPTS)?;
//! let (header, planes) = sbif::decode_planes(&data, 1)?;
//! assert_eq!((header.width, header.height), (4, 2));
//! assert_eq!(planes, [plane]);
//! # Ok(())
//! # }
//! ```

pub mod bitstream;
pub mod container;
mod error;
pub mod plane;
pub mod predictor;
pub mod row;
#[cfg(feature = "png")]
pub mod source;

pub use container::{
  Decoded, EncodeOptions, Encoded, FrameCodec, Header, Payload, Zstd, CHANNELS, DEFAULT_OPTS, HEADER_LEN, MAGIC,
};
pub use error::{Error, Result};
pub use plane::{Plane, PlaneStats};
pub use predictor::Predictor;

/// Encode planes into a complete `.sbif` file.
pub fn encode(planes: &[Plane], opts: EncodeOptions) -> Result<Vec<u8>> {
  Ok(container::write_with(planes, &Zstd { level: opts.level })?.data)
}

/// Decode a `.sbif` file holding the usual four RGBA planes.
pub fn decode(data: &[u8]) -> Result<(Header, Vec<Plane>)> {
  decode_planes(data, CHANNELS)
}

/// Decode a `.sbif` file holding `channels` planes.
pub fn decode_planes(data: &[u8], channels: usize) -> Result<(Header, Vec<Plane>)> {
  let decoded = container::read_with(data, channels, &Zstd::default())?;
  Ok((decoded.header, decoded.planes))
}
