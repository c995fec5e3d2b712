use std::{collections::BTreeMap, fmt, path::Path};

use sbif::{Decoded, Predictor, CHANNELS, HEADER_LEN};
use serde::Serialize;

pub const CHANNEL_NAMES: [&str; CHANNELS] = ["R", "G", "B", "A"];

/// What `sbif stats` prints about one file.
#[derive(Debug, Serialize)]
pub struct Report {
  pub file: String,
  pub width: u16,
  pub height: u16,
  pub file_bytes: usize,
  pub frame_bytes: usize,
  pub payload_bytes: usize,
  pub raw_bytes: usize,
  pub ratio: f64,
  pub planes: Vec<PlaneReport>,
}

#[derive(Debug, Serialize)]
pub struct PlaneReport {
  pub channel: &'static str,
  pub bytes: usize,
  pub predictors: BTreeMap<&'static str, usize>,
}

impl Report {
  pub fn new(path: &Path, dec: &Decoded) -> Self {
    let file_bytes = HEADER_LEN + dec.frame_len;
    let raw_bytes = dec.header.samples() * dec.planes.len();
    let planes = CHANNEL_NAMES
      .iter()
      .zip(&dec.stats)
      .map(|(&channel, s)| {
        let counts = s.counts();
        let predictors = Predictor::ALL.iter().map(|p| (p.name(), counts[p.tag() as usize])).collect();
        PlaneReport { channel, bytes: s.bytes, predictors }
      })
      .collect();
    Self {
      file: path.display().to_string(),
      width: dec.header.width,
      height: dec.header.height,
      file_bytes,
      frame_bytes: dec.frame_len,
      payload_bytes: dec.payload_len,
      raw_bytes,
      ratio: raw_bytes as f64 / file_bytes as f64,
      planes,
    }
  }
}

impl fmt::Display for Report {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "{}: {}x{}", self.file, self.width, self.height)?;
    writeln!(f, "  raw     {:>10} bytes", self.raw_bytes)?;
    writeln!(f, "  payload {:>10} bytes", self.payload_bytes)?;
    writeln!(f, "  file    {:>10} bytes ({:.2}x)", self.file_bytes, self.ratio)?;
    for plane in &self.planes {
      write!(f, "  {} {:>8} bytes |", plane.channel, plane.bytes)?;
      for (name, n) in &plane.predictors {
        write!(f, " {name}={n}")?;
      }
      writeln!(f)?;
    }
    Ok(())
  }
}
