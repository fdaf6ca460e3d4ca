use anyhow::{Context, Result};
use clap::Parser;
use echoscope::simulation::{Reflection, SyntheticChannel};
use echoscope::spectrum::{ChannelEstimateFile, RawSpectrum};
use serde::Deserialize;
use serde_json::{Value, json};
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "generate_chanest")]
#[command(about = "Generate synthetic channel estimates with injected reflections")]
struct Args {
    /// TOML file with [[reflection]] entries and an optional [awgn] table
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output JSON file
    #[arg(short, long, default_value = "chanest.json")]
    output: PathBuf,

    /// Reflections as "delay_bins:amplitude[:phase_rad]", comma-separated
    #[arg(short, long, default_value = "")]
    reflections: String,

    /// Number of active subcarriers
    #[arg(long, default_value_t = 1900)]
    subcarriers: usize,

    /// Subcarrier spacing in Hz
    #[arg(long, default_value_t = 50_000.0)]
    spacing_hz: f64,

    /// Transform length the reflection delays refer to
    #[arg(long)]
    n_fft: Option<usize>,

    /// Number of snapshots written
    #[arg(long, default_value_t = 1)]
    snapshots: usize,

    /// AWGN SNR in dB (CLI override)
    #[arg(long)]
    snr: Option<f64>,

    /// Seed for reproducibility
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// Channel identifier written to the file
    #[arg(long)]
    channel_id: Option<i32>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlConfig {
    awgn: Option<AwgnSection>,
    #[serde(default)]
    reflection: Vec<Reflection>,
}

#[derive(Debug, Deserialize)]
struct AwgnSection {
    snr_db: f64,
}

fn parse_reflections(s: &str) -> Result<Vec<Reflection>> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|part| {
            let fields: Vec<&str> = part.split(':').collect();
            if !(2..=3).contains(&fields.len()) {
                anyhow::bail!("Invalid reflection '{}'. Use 'delay:amplitude[:phase]'", part);
            }
            let delay_bins: f64 = fields[0].parse().context("Invalid delay value")?;
            let amplitude: f64 = fields[1].parse().context("Invalid amplitude value")?;
            let phase_rad: f64 = match fields.get(2) {
                Some(p) => p.parse().context("Invalid phase value")?,
                None => 0.0,
            };
            Ok(Reflection {
                delay_bins,
                amplitude,
                phase_rad,
            })
        })
        .collect()
}

fn load_toml_config(path: &PathBuf) -> Result<TomlConfig> {
    let content = fs::read_to_string(path).context("Failed to read config file")?;
    toml::from_str(&content).context("Failed to parse config file")
}

fn spectrum_to_json(raw: &RawSpectrum) -> Value {
    match raw {
        RawSpectrum::Complex(values) => {
            Value::Array(values.iter().map(|c| json!([c.re, c.im])).collect())
        }
        RawSpectrum::Snapshots(rows) => Value::Array(
            rows.iter()
                .map(|row| Value::Array(row.iter().map(|c| json!([c.re, c.im])).collect()))
                .collect(),
        ),
        RawSpectrum::Pairs(pairs) => {
            Value::Array(pairs.iter().map(|&(re, im)| json!([re, im])).collect())
        }
        RawSpectrum::Real(values) => json!(values),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let toml_config = if let Some(ref config_path) = args.config {
        load_toml_config(config_path)?
    } else {
        TomlConfig::default()
    };

    let mut reflections = toml_config.reflection;
    reflections.extend(parse_reflections(&args.reflections)?);

    let mut channel = SyntheticChannel::new(args.subcarriers, args.spacing_hz)
        .with_reflections(reflections.iter().copied())
        .with_snapshots(args.snapshots.max(1))
        .with_seed(args.seed);
    if let Some(n_fft) = args.n_fft {
        channel = channel.with_transform_length(n_fft);
    }
    if let Some(snr) = args.snr.or(toml_config.awgn.map(|a| a.snr_db)) {
        channel = channel.with_awgn(snr);
    }

    let raw = channel
        .raw_spectrum()
        .context("Failed to synthesize channel")?;
    let file = ChannelEstimateFile {
        channel_id: args.channel_id,
        subcarrier_spacing_hz: args.spacing_hz,
        values: spectrum_to_json(&raw),
    };

    let text = serde_json::to_string_pretty(&file).context("Failed to serialize estimate")?;
    fs::write(&args.output, text).context("Failed to write output")?;

    eprintln!(
        "Wrote {} subcarriers x {} snapshot(s), {} reflection(s), n_fft {} to {}",
        args.subcarriers,
        args.snapshots.max(1),
        reflections.len(),
        channel.transform_length(),
        args.output.display()
    );
    Ok(())
}
