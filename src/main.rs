use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

use echoscope::config::{CableType, EchoscopeConfig, ThresholdMode, WindowMode};
use echoscope::output::{OutputFormat, create_formatter};
use echoscope::spectrum::{ChannelEstimate, ChannelEstimateFile};
use echoscope::{EchoDetector, EchoError};

#[derive(Parser, Debug)]
#[command(name = "echoscope")]
#[command(about = "Detect cable reflections in a DOCSIS channel estimate", long_about = None)]
struct Args {
    /// Channel estimate JSON file
    input: PathBuf,

    /// TOML configuration file ([detector] and [search] tables)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format: text, json, csv
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Report only the strongest echo; exits with an error if none is found
    #[arg(long)]
    first: bool,

    /// Cable type for the propagation model
    #[arg(long, value_enum)]
    cable_type: Option<CableType>,

    /// Channel identifier (overrides the file and config)
    #[arg(long)]
    channel_id: Option<i32>,

    /// Transform length
    #[arg(long)]
    n_fft: Option<usize>,

    /// Spectral window: hann, none
    #[arg(long, value_enum)]
    window: Option<WindowMode>,

    /// Threshold mode: fractional, db-down
    #[arg(long, value_enum)]
    threshold_mode: Option<ThresholdMode>,

    /// Threshold as a fraction of the direct path (0-1]
    #[arg(long)]
    threshold_frac: Option<f64>,

    /// Threshold in dB below the direct path
    #[arg(long)]
    threshold_db_down: Option<f64>,

    /// Guard bins after the direct path
    #[arg(long)]
    guard_bins: Option<usize>,

    /// Minimum echo distance in feet
    #[arg(long)]
    min_distance_ft: Option<f64>,

    /// Bins excluded just below the search stop
    #[arg(long)]
    edge_guard_bins: Option<usize>,

    /// Minimum separation between echoes in seconds
    #[arg(long)]
    min_separation_s: Option<f64>,

    /// Maximum echo delay in seconds
    #[arg(long)]
    max_delay_s: Option<f64>,

    /// Maximum number of echoes
    #[arg(long)]
    max_peaks: Option<usize>,

    /// Keep the direct path at its natural position instead of bin 0
    #[arg(long)]
    no_align: bool,

    /// Skip normalizing the direct path to unit amplitude
    #[arg(long)]
    no_normalize: bool,

    /// Sample rate for the reported time axis and distances
    #[arg(long)]
    sample_rate_override: Option<f64>,

    /// Embed the time response in JSON output
    #[arg(long)]
    include_time_response: bool,
}

fn load_estimate(path: &Path) -> Result<(ChannelEstimate, Option<i32>)> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file: ChannelEstimateFile =
        serde_json::from_str(&content).context("Failed to parse channel estimate")?;
    let channel_id = file.channel_id;
    let estimate = file
        .into_estimate()
        .context("Invalid channel estimate")?;
    Ok((estimate, channel_id))
}

fn build_config(args: &Args, file_channel_id: Option<i32>) -> Result<EchoscopeConfig> {
    let mut config = match args.config {
        Some(ref path) => EchoscopeConfig::load(path).context("Failed to load config file")?,
        None => EchoscopeConfig::default(),
    };

    let detector = &mut config.detector;
    if let Some(id) = args.channel_id.or(file_channel_id) {
        detector.channel_id = id;
    }
    if let Some(cable_type) = args.cable_type {
        detector.cable_type = cable_type;
    }
    if args.n_fft.is_some() {
        detector.n_fft = args.n_fft;
    }

    let search = &mut config.search;
    if let Some(window) = args.window {
        search.window = window;
    }
    if let Some(mode) = args.threshold_mode {
        search.threshold_mode = mode;
    }
    if let Some(frac) = args.threshold_frac {
        search.threshold_frac = frac;
    }
    if let Some(db) = args.threshold_db_down {
        search.threshold_db_down = db;
    }
    if let Some(guard) = args.guard_bins {
        search.guard_bins = guard;
    }
    if args.min_distance_ft.is_some() {
        search.min_detect_distance_ft = args.min_distance_ft;
    }
    if let Some(edge) = args.edge_guard_bins {
        search.edge_guard_bins = edge;
    }
    if let Some(sep) = args.min_separation_s {
        search.min_separation_s = sep;
    }
    if args.max_delay_s.is_some() {
        search.max_delay_s = args.max_delay_s;
    }
    if let Some(peaks) = args.max_peaks {
        search.max_peaks = peaks;
    }
    if args.no_align {
        search.direct_at_zero = false;
    }
    if args.no_normalize {
        search.normalize_power = false;
    }
    if args.sample_rate_override.is_some() {
        search.sample_rate_override_hz = args.sample_rate_override;
    }
    if args.include_time_response {
        search.include_time_response = true;
    }

    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let (estimate, file_channel_id) = load_estimate(&args.input)?;
    let config = build_config(&args, file_channel_id)?;
    let detector = EchoDetector::new(estimate, &config.detector)?;

    if args.first {
        return match detector.first_echo(&config.search) {
            Ok(echo) => {
                match args.format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&echo)?),
                    _ => println!(
                        "First echo: bin {} at {:.3} us, amp {:.4}, {:.1} m ({:.1} ft)",
                        echo.bin_index,
                        echo.time_s * 1e6,
                        echo.amplitude,
                        echo.distance_m,
                        echo.distance_ft
                    ),
                }
                Ok(())
            }
            Err(EchoError::NoEchoFound) => {
                anyhow::bail!("No echo found on channel {}", detector.channel_id())
            }
            Err(e) => Err(e.into()),
        };
    }

    let report = detector.multi_echo(&config.search)?;
    let formatter = create_formatter(args.format, args.verbose > 0);
    if let Some(header) = formatter.header() {
        println!("{}", header);
    }
    println!("{}", formatter.format(&report));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_apply() {
        let args = Args::parse_from([
            "echoscope",
            "in.json",
            "--cable-type",
            "RG59",
            "--threshold-mode",
            "db-down",
            "--max-delay-s",
            "2e-6",
            "--no-align",
        ]);
        let config = build_config(&args, Some(12)).unwrap();
        assert_eq!(config.detector.cable_type, CableType::Rg59);
        assert_eq!(config.detector.channel_id, 12);
        assert_eq!(config.search.threshold_mode, ThresholdMode::DbDown);
        assert_eq!(config.search.max_delay_s, Some(2e-6));
        assert!(!config.search.direct_at_zero);
    }

    #[test]
    fn test_cli_channel_id_wins_over_file() {
        let args = Args::parse_from(["echoscope", "in.json", "--channel-id", "3"]);
        let config = build_config(&args, Some(12)).unwrap();
        assert_eq!(config.detector.channel_id, 3);
    }
}
