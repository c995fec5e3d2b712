//! SBIF file framing.
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -------------------------------------------------
//! 0       4     magic  "SBIF"
//! 4       2     width  (u16, LE)
//! 6       2     height (u16, LE)
//! 8..     *     compressed frame (zstd) of the plane payload
//! ```
//!
//! The payload is the plane bitstreams concatenated in channel order (R, G, B,
//! A for RGBA sources) with no length prefixes: each plane ends after exactly
//! `height` decoded rows of `width` pixels, and the next one starts at the
//! following byte.

use std::io::{self, Read};
use std::path::Path;

use crate::bitstream::{worst_case_row_len, BitReader};
use crate::error::{Error, Result};
use crate::plane::{check_dimensions, Plane, PlaneStats};

pub const MAGIC: [u8; 4] = *b"SBIF";
pub const HEADER_LEN: usize = 8;
/// Planes per image written by the RGBA pipeline.
pub const CHANNELS: usize = 4;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Header {
  pub width: u16,
  pub height: u16,
}

impl Header {
  pub fn to_bytes(self) -> [u8; HEADER_LEN] {
    let mut out = [0u8; HEADER_LEN];
    out[..4].copy_from_slice(&MAGIC);
    out[4..6].copy_from_slice(&self.width.to_le_bytes());
    out[6..8].copy_from_slice(&self.height.to_le_bytes());
    out
  }

  /// Parse and validate the header at the start of `data`.
  pub fn parse(data: &[u8]) -> Result<Self> {
    let Some(bytes) = data.get(..HEADER_LEN) else {
      return Err(Error::HeaderTooShort(data.len()));
    };
    let magic = [bytes[0], bytes[1], bytes[2], bytes[3]];
    if magic != MAGIC {
      return Err(Error::BadMagic(magic));
    }
    let width = u16::from_le_bytes([bytes[4], bytes[5]]);
    let height = u16::from_le_bytes([bytes[6], bytes[7]]);
    check_dimensions(width, height)?;
    Ok(Self { width, height })
  }

  /// Samples per plane.
  #[inline]
  pub fn samples(self) -> usize {
    self.width as usize * self.height as usize
  }

  /// Largest payload `channels` planes of this size can encode to.
  pub fn max_payload_len(self, channels: usize) -> usize {
    channels * self.height as usize * worst_case_row_len(self.width as usize)
  }
}

/// Generic byte-stream compression applied over the plane payload.
///
/// `compress` must produce a self-describing frame: `decompress` gets only the
/// frame and must return the exact payload. A frame that inflates past
/// `capacity` bytes is an error, not a truncated payload.
pub trait FrameCodec {
  fn compress(&self, payload: &[u8]) -> Result<Vec<u8>>;
  fn decompress(&self, frame: &[u8], capacity: usize) -> Result<Vec<u8>>;
}

/// A single zstd frame with the content size recorded in its header.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Zstd {
  pub level: i32,
}

impl Default for Zstd {
  fn default() -> Self {
    Self { level: DEFAULT_OPTS.level }
  }
}

impl FrameCodec for Zstd {
  fn compress(&self, payload: &[u8]) -> Result<Vec<u8>> {
    zstd::bulk::compress(payload, self.level).map_err(Error::Compressor)
  }

  fn decompress(&self, frame: &[u8], capacity: usize) -> Result<Vec<u8>> {
    // Read one byte past the limit so an oversized frame is seen without inflating all of it.
    let decoder = zstd::stream::read::Decoder::with_buffer(frame).map_err(Error::Compressor)?;
    let mut payload = Vec::new();
    decoder.take(capacity as u64 + 1).read_to_end(&mut payload).map_err(Error::Compressor)?;
    if payload.len() > capacity {
      return Err(Error::Compressor(io::Error::new(
        io::ErrorKind::InvalidData,
        format!("frame inflates past the {capacity}-byte payload limit"),
      )));
    }
    Ok(payload)
  }
}

/// Encoder knobs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EncodeOptions {
  /// zstd level for the final pass.
  pub level: i32,
}

pub const DEFAULT_OPTS: EncodeOptions = EncodeOptions { level: 9 };

impl Default for EncodeOptions {
  fn default() -> Self {
    DEFAULT_OPTS
  }
}

/// Planes encoded into the uncompressed payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payload {
  pub header: Header,
  pub bytes: Vec<u8>,
  pub stats: Vec<PlaneStats>,
}

/// Encode `planes` (all the same size) back to back.
pub fn encode_payload(planes: &[Plane]) -> Result<Payload> {
  let first = planes.first().ok_or(Error::ChannelCount { expected: CHANNELS, actual: 0 })?;
  let header = Header { width: first.width(), height: first.height() };
  if planes.iter().any(|p| p.width() != header.width || p.height() != header.height) {
    let matching = planes.iter().filter(|p| p.width() == header.width && p.height() == header.height).count();
    return Err(Error::ChannelCount { expected: planes.len(), actual: matching });
  }

  let mut bytes = Vec::with_capacity(header.max_payload_len(planes.len()));
  let mut stats = Vec::with_capacity(planes.len());
  for plane in planes {
    stats.push(plane.encode(&mut bytes)?);
  }
  Ok(Payload { header, bytes, stats })
}

/// Decode `channels` planes of `header`'s size from an uncompressed payload.
pub fn decode_payload(payload: &[u8], header: Header, channels: usize) -> Result<(Vec<Plane>, Vec<PlaneStats>)> {
  let mut r = BitReader::new(payload);
  let mut planes = Vec::with_capacity(channels);
  let mut stats = Vec::with_capacity(channels);
  for _ in 0..channels {
    let (plane, s) = Plane::decode(&mut r, header.width, header.height)?;
    planes.push(plane);
    stats.push(s);
  }
  if r.remaining() != 0 {
    log::warn!("{} trailing payload bytes after {channels} planes ignored", r.remaining());
  }
  Ok((planes, stats))
}

/// A complete `.sbif` file plus what went into it.
#[derive(Clone, Debug)]
pub struct Encoded {
  pub data: Vec<u8>,
  pub payload_len: usize,
  pub stats: Vec<PlaneStats>,
}

/// A decoded `.sbif` file.
#[derive(Clone, Debug)]
pub struct Decoded {
  pub header: Header,
  pub planes: Vec<Plane>,
  pub frame_len: usize,
  pub payload_len: usize,
  pub stats: Vec<PlaneStats>,
}

/// Header + compressed frame of the plane payload.
pub fn write_with<C: FrameCodec + ?Sized>(planes: &[Plane], codec: &C) -> Result<Encoded> {
  let Payload { header, bytes, stats } = encode_payload(planes)?;
  let frame = codec.compress(&bytes)?;
  let mut data = Vec::with_capacity(HEADER_LEN + frame.len());
  data.extend_from_slice(&header.to_bytes());
  data.extend_from_slice(&frame);
  log::debug!("payload {} bytes, frame {} bytes", bytes.len(), frame.len());
  Ok(Encoded { data, payload_len: bytes.len(), stats })
}

/// Inverse of [`write_with`]. The header is validated before anything is
/// decompressed, and bounds how far the frame may inflate.
pub fn read_with<C: FrameCodec + ?Sized>(data: &[u8], channels: usize, codec: &C) -> Result<Decoded> {
  let header = Header::parse(data)?;
  let payload = codec.decompress(&data[HEADER_LEN..], header.max_payload_len(channels))?;
  let (planes, stats) = decode_payload(&payload, header, channels)?;
  Ok(Decoded { header, planes, frame_len: data.len() - HEADER_LEN, payload_len: payload.len(), stats })
}

/// [`write_with`], then store the result at `path`.
pub fn write_file<C: FrameCodec + ?Sized>(path: &Path, planes: &[Plane], codec: &C) -> Result<Encoded> {
  let enc = write_with(planes, codec)?;
  std::fs::write(path, &enc.data)?;
  Ok(enc)
}

/// Load `path` and [`read_with`] it.
pub fn read_file<C: FrameCodec + ?Sized>(path: &Path, channels: usize, codec: &C) -> Result<Decoded> {
  let data = std::fs::read(path)?;
  read_with(&data, channels, codec)
}

/// Planes laid out back to back, R then G then B then A.
pub fn planar(planes: &[Plane]) -> Vec<u8> {
  planes.iter().flat_map(|p| p.samples().iter().copied()).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::bitstream::{MARK16, MARK8};
  use crate::predictor::Predictor;

  /// Pass-through frame for payload-level assertions.
  struct Stored;

  impl FrameCodec for Stored {
    fn compress(&self, payload: &[u8]) -> Result<Vec<u8>> {
      Ok(payload.to_vec())
    }
    fn decompress(&self, frame: &[u8], capacity: usize) -> Result<Vec<u8>> {
      if frame.len() > capacity {
        return Err(Error::Compressor(std::io::ErrorKind::InvalidData.into()));
      }
      Ok(frame.to_vec())
    }
  }

  fn rgba(w: u16, h: u16) -> Vec<Plane> {
    let n = w as usize * h as usize;
    (0..CHANNELS)
      .map(|c| Plane::new(w, h, (0..n).map(|i| ((i * (c + 1)) ^ (i / w as usize)) as u8).collect()).unwrap())
      .collect()
  }

  #[test]
  fn t_header_layout() {
    let h = Header { width: 0x0102, height: 0x0304 };
    assert_eq!(h.to_bytes(), [b'S', b'B', b'I', b'F', 0x02, 0x01, 0x04, 0x03]);
    assert_eq!(Header::parse(&h.to_bytes()).unwrap(), h);
  }

  #[test]
  fn t_bad_magic_fails_first() {
    let planes = rgba(8, 8);
    let mut data = write_with(&planes, &Zstd::default()).unwrap().data;
    data[0] = b'X';
    // The payload is intact; only the magic is wrong.
    assert!(matches!(read_with(&data, CHANNELS, &Zstd::default()), Err(Error::BadMagic(m)) if &m == b"XBIF"));
    assert!(matches!(read_with(&data[..5], CHANNELS, &Zstd::default()), Err(Error::HeaderTooShort(5))));
  }

  #[test]
  fn t_zero_dimension_header() {
    let mut data = Header { width: 4, height: 4 }.to_bytes();
    data[6] = 0;
    assert!(matches!(Header::parse(&data), Err(Error::Dimensions { width: 4, height: 0 })));
  }

  #[test]
  fn t_roundtrip_rgba_zstd() {
    let planes = rgba(33, 17);
    let enc = write_with(&planes, &Zstd::default()).unwrap();
    assert_eq!(&enc.data[..4], b"SBIF");
    let dec = read_with(&enc.data, CHANNELS, &Zstd::default()).unwrap();
    assert_eq!(dec.header, Header { width: 33, height: 17 });
    assert_eq!(dec.planes, planes);
    assert_eq!(dec.payload_len, enc.payload_len);
    assert_eq!(dec.stats, enc.stats);
  }

  #[test]
  fn t_plane_boundaries_unframed() {
    let px = [0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2];
    let plane = Plane::new(4, 4, px.to_vec()).unwrap();
    let planes = vec![plane.clone(), plane];
    let enc = write_with(&planes, &Stored).unwrap();
    let one = [0x00, 0x00, 0x20, 0x00, 0x20, 0x00, 0x40];
    assert_eq!(&enc.data[HEADER_LEN..HEADER_LEN + 7], one);
    assert_eq!(&enc.data[HEADER_LEN + 7..], one);

    let dec = read_with(&enc.data, 2, &Stored).unwrap();
    assert_eq!(dec.planes, planes);
    assert_eq!(dec.stats[1].rows[1], Predictor::Vertical);
  }

  #[test]
  fn t_sentinel_planes() {
    let planes = vec![
      Plane::filled(300, 5, MARK8).unwrap(),
      Plane::filled(300, 5, MARK16).unwrap(),
      Plane::filled(300, 5, 0).unwrap(),
      Plane::filled(300, 5, 0xFF).unwrap(),
    ];
    let enc = write_with(&planes, &Zstd { level: 3 }).unwrap();
    assert_eq!(read_with(&enc.data, CHANNELS, &Zstd::default()).unwrap().planes, planes);
  }

  #[test]
  fn t_truncated_payload() {
    let planes = rgba(8, 8);
    let Payload { header, bytes, .. } = encode_payload(&planes).unwrap();
    let err = decode_payload(&bytes[..bytes.len() - 1], header, CHANNELS).unwrap_err();
    assert!(matches!(err, Error::Truncated { .. }));
  }

  #[test]
  fn t_corrupt_frame() {
    let planes = rgba(8, 8);
    let mut data = write_with(&planes, &Zstd::default()).unwrap().data;
    data.truncate(HEADER_LEN + 3);
    assert!(matches!(read_with(&data, CHANNELS, &Zstd::default()), Err(Error::Compressor(_))));
  }

  #[test]
  fn t_mismatched_planes() {
    let planes = vec![Plane::filled(4, 4, 0).unwrap(), Plane::filled(4, 5, 0).unwrap()];
    assert!(matches!(encode_payload(&planes), Err(Error::ChannelCount { expected: 2, actual: 1 })));
    assert!(matches!(encode_payload(&[]), Err(Error::ChannelCount { actual: 0, .. })));
  }

  #[test]
  fn t_oversized_frame_rejected() {
    let planes = rgba(1, 1);
    let mut payload = encode_payload(&planes).unwrap().bytes;
    let header = Header { width: 1, height: 1 };
    assert!(payload.len() <= header.max_payload_len(CHANNELS));
    // Zero padding compresses to almost nothing but inflates far past any 1x1 payload.
    payload.resize(1 << 20, 0);
    let mut data = header.to_bytes().to_vec();
    data.extend_from_slice(&zstd::bulk::compress(&payload, 3).unwrap());
    assert!(data.len() < 4096);
    assert!(matches!(read_with(&data, CHANNELS, &Zstd::default()), Err(Error::Compressor(_))));
  }

  #[test]
  fn t_payload_within_bound() {
    // Sentinel-heavy noise is the expensive case for the run coder.
    let w = 40u16;
    let px: Vec<u8> = (0..w as usize * 6).map(|i| if (i * 7) % 3 == 0 { MARK8 } else { (i * 151) as u8 }).collect();
    let planes = vec![Plane::new(w, 6, px).unwrap()];
    let payload = encode_payload(&planes).unwrap();
    let bound = payload.header.max_payload_len(1);
    assert!(payload.bytes.len() <= bound);
    assert!(payload.bytes.capacity() >= bound);
    // Exactly at the bound still decompresses.
    let frame = Zstd::default().compress(&payload.bytes).unwrap();
    assert_eq!(Zstd::default().decompress(&frame, payload.bytes.len()).unwrap(), payload.bytes);
    assert!(Zstd::default().decompress(&frame, payload.bytes.len() - 1).is_err());
  }

  #[test]
  fn t_file_roundtrip() {
    let dir = std::env::temp_dir().join(format!("sbif-container-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("rt.sbif");
    let planes = rgba(9, 4);
    let enc = write_file(&path, &planes, &Zstd::default()).unwrap();
    let dec = read_file(&path, CHANNELS, &Zstd::default()).unwrap();
    assert_eq!(dec.planes, planes);
    assert_eq!(HEADER_LEN + dec.frame_len, enc.data.len());
    std::fs::remove_dir_all(&dir).unwrap();

    assert!(matches!(read_file(&path, CHANNELS, &Zstd::default()), Err(Error::Io(_))));
  }

  #[test]
  fn t_planar_order() {
    let planes = vec![Plane::filled(2, 1, 1).unwrap(), Plane::filled(2, 1, 2).unwrap()];
    assert_eq!(planar(&planes), [1, 1, 2, 2]);
  }
}
