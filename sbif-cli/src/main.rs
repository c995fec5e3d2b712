mod report;

use std::{
  fs,
  path::{Path, PathBuf},
  time::Instant,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sbif::{container, source, PlaneStats, Zstd, CHANNELS};

// ---------------------------------------------
// sbif: SBIF image codec CLI
// Modes:
//   encode <image> <out.sbif>       -> RGBA planes, per-row predictors, RLE, zstd
//   decode <in.sbif> <out.png|raw>  -> PNG when the extension says so, else planar R,G,B,A dump
//   stats  <in.sbif>                -> header, sizes and predictor usage
// ---------------------------------------------
#[derive(Parser, Debug)]
#[command(name = "sbif", author, version, about = "sbif: predictive run-length codec for RGBA images", long_about = None)]
struct Cli {
  #[command(subcommand)]
  cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
  /// Compress a PNG into an .sbif file
  Encode {
    input: PathBuf,
    output: PathBuf,
    /// zstd level of the final pass
    #[arg(short, long, default_value_t = sbif::DEFAULT_OPTS.level, value_parser = clap::value_parser!(i32).range(1..=22))]
    level: i32,
    /// Print one glyph per scanline showing the chosen predictor
    #[arg(long)]
    graph: bool,
    /// Also dump the uncompressed planes (R, G, B, A back to back) here
    #[arg(long)]
    raw: Option<PathBuf>,
  },
  /// Decompress an .sbif file into a PNG or a raw planar dump
  Decode {
    input: PathBuf,
    output: PathBuf,
    /// Print one glyph per scanline showing the predictor read back
    #[arg(long)]
    graph: bool,
  },
  /// Describe an .sbif file
  Stats {
    input: PathBuf,
    /// Emit the report as JSON on stdout
    #[arg(long)]
    json: bool,
  },
}

fn main() -> Result<()> {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
    .target(env_logger::Target::Stderr)
    .init();

  let cli = Cli::parse();
  match cli.cmd {
    Cmd::Encode { input, output, level, graph, raw } => do_encode(&input, &output, level, graph, raw.as_deref()),
    Cmd::Decode { input, output, graph } => do_decode(&input, &output, graph),
    Cmd::Stats { input, json } => do_stats(&input, json),
  }
}

fn do_encode(input: &Path, output: &Path, level: i32, graph: bool, raw: Option<&Path>) -> Result<()> {
  let planes = source::load_rgba(input).with_context(|| format!("decode source image {:?}", input))?;
  let (w, h) = planes.first().map(|p| (p.width(), p.height())).context("source image has no planes")?;
  log::info!("{} {w}x{h}", input.display());

  if let Some(raw) = raw {
    fs::write(raw, container::planar(&planes)).with_context(|| format!("write raw planes {:?}", raw))?;
  }

  let start = Instant::now();
  let enc = container::write_file(output, &planes, &Zstd { level }).with_context(|| format!("encode into {:?}", output))?;
  let elapsed = start.elapsed();

  if graph {
    print_graph(&enc.stats);
  }

  let raw_len = planes.len() * w as usize * h as usize;
  log::info!(
    "raw {raw_len} -> rle {} -> zstd {} bytes, ratio {:.2}x, {}ms",
    enc.payload_len,
    enc.data.len(),
    raw_len as f64 / enc.data.len() as f64,
    elapsed.as_millis()
  );
  Ok(())
}

fn do_decode(input: &Path, output: &Path, graph: bool) -> Result<()> {
  let start = Instant::now();
  let dec = container::read_file(input, CHANNELS, &Zstd::default()).with_context(|| format!("decode {:?}", input))?;
  let elapsed = start.elapsed();

  if graph {
    print_graph(&dec.stats);
  }
  if is_png(output) {
    source::save_rgba(output, &dec.planes).with_context(|| format!("write image {:?}", output))?;
  } else {
    fs::write(output, container::planar(&dec.planes)).with_context(|| format!("write raw planes {:?}", output))?;
  }
  log::info!("{}x{} -> {:?}, {}ms", dec.header.width, dec.header.height, output, elapsed.as_millis());
  Ok(())
}

fn do_stats(input: &Path, json: bool) -> Result<()> {
  let dec = container::read_file(input, CHANNELS, &Zstd::default()).with_context(|| format!("decode {:?}", input))?;
  let report = report::Report::new(input, &dec);
  if json {
    println!("{}", serde_json::to_string_pretty(&report)?);
  } else {
    eprint!("{report}");
  }
  Ok(())
}

fn print_graph(stats: &[PlaneStats]) {
  for (name, s) in report::CHANNEL_NAMES.iter().zip(stats) {
    println!("{name}: {}", s.graph());
  }
}

fn is_png(path: &Path) -> bool {
  path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("png"))
}
