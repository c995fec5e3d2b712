//! PNG files in and out, via the `image` crate (built with its `png` codec only).
//!
//! Sources are converted to RGBA8 and split into four planes; decoding
//! interleaves them again.

use std::path::Path;

use image::{GenericImageView, RgbaImage};

use crate::container::CHANNELS;
use crate::error::{Error, Result};
use crate::plane::Plane;

/// Decode a PNG file into R, G, B, A planes.
pub fn load_rgba(path: &Path) -> Result<Vec<Plane>> {
  let img = image::open(path)?;
  let (w, h) = img.dimensions();
  log::debug!("{} decoded as {:?} {w}x{h}", path.display(), img.color());
  planes_from_rgba(w, h, img.to_rgba8().as_raw())
}

/// Split interleaved RGBA8 samples into four planes.
pub fn planes_from_rgba(width: u32, height: u32, rgba: &[u8]) -> Result<Vec<Plane>> {
  let (Ok(w16), Ok(h16)) = (u16::try_from(width), u16::try_from(height)) else {
    return Err(Error::Dimensions { width, height });
  };
  let n = width as usize * height as usize;
  if rgba.len() != n * CHANNELS {
    return Err(Error::PlaneSize { expected: n * CHANNELS, actual: rgba.len() });
  }
  let mut channels: [Vec<u8>; CHANNELS] = core::array::from_fn(|_| Vec::with_capacity(n));
  for px in rgba.chunks_exact(CHANNELS) {
    for (plane, &v) in channels.iter_mut().zip(px) {
      plane.push(v);
    }
  }
  channels.into_iter().map(|samples| Plane::new(w16, h16, samples)).collect()
}

/// Interleave four planes back into RGBA8.
pub fn interleave_rgba(planes: &[Plane]) -> Result<Vec<u8>> {
  let [r, g, b, a] = planes else {
    return Err(Error::ChannelCount { expected: CHANNELS, actual: planes.len() });
  };
  let n = r.samples().len();
  if [g, b, a].iter().any(|p| p.samples().len() != n) {
    return Err(Error::PlaneSize { expected: n, actual: [g, b, a].iter().map(|p| p.samples().len()).max().unwrap_or(0) });
  }
  let mut out = Vec::with_capacity(n * CHANNELS);
  for i in 0..n {
    out.extend_from_slice(&[r.samples()[i], g.samples()[i], b.samples()[i], a.samples()[i]]);
  }
  Ok(out)
}

/// Write four planes as an RGBA PNG.
pub fn save_rgba(path: &Path, planes: &[Plane]) -> Result<()> {
  let first = planes.first().ok_or(Error::ChannelCount { expected: CHANNELS, actual: 0 })?;
  let (w, h) = (first.width() as u32, first.height() as u32);
  let rgba = interleave_rgba(planes)?;
  let expected = rgba.len();
  let img = RgbaImage::from_raw(w, h, rgba).ok_or(Error::PlaneSize { expected, actual: (w * h) as usize * CHANNELS })?;
  img.save_with_format(path, image::ImageFormat::Png)?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn t_split_and_interleave() {
    let rgba: Vec<u8> = (0..24).collect();
    let planes = planes_from_rgba(3, 2, &rgba).unwrap();
    assert_eq!(planes.len(), 4);
    assert_eq!(planes[0].samples(), [0, 4, 8, 12, 16, 20]);
    assert_eq!(planes[3].samples(), [3, 7, 11, 15, 19, 23]);
    assert_eq!(interleave_rgba(&planes).unwrap(), rgba);
  }

  #[test]
  fn t_too_large() {
    assert!(matches!(planes_from_rgba(70_000, 1, &[]), Err(Error::Dimensions { width: 70_000, height: 1 })));
  }

  #[test]
  fn t_wrong_len() {
    assert!(matches!(planes_from_rgba(2, 2, &[0; 15]), Err(Error::PlaneSize { expected: 16, actual: 15 })));
  }

  #[test]
  fn t_png_roundtrip() {
    let dir = std::env::temp_dir().join(format!("sbif-source-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("rt.png");
    let rgba: Vec<u8> = (0..5 * 3 * 4).map(|i| (i * 11) as u8).collect();
    let planes = planes_from_rgba(5, 3, &rgba).unwrap();
    save_rgba(&path, &planes).unwrap();
    assert_eq!(load_rgba(&path).unwrap(), planes);
    std::fs::remove_dir_all(&dir).unwrap();
  }
}
