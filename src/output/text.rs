use super::Formatter;
use crate::report::DetectionReport;

pub struct TextFormatter {
    verbose: bool,
}

impl TextFormatter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Formatter for TextFormatter {
    fn format(&self, report: &DetectionReport) -> String {
        let mut lines = Vec::new();
        lines.push(format!(
            "Channel {}: {} echo(es) [{} VF {:.2}, N={}, fs={:.3} MHz]",
            report.channel_id,
            report.echoes.len(),
            report.cable_type,
            report.velocity_factor,
            report.dataset.subcarriers,
            report.dataset.sample_rate_hz / 1e6
        ));

        if self.verbose {
            let max_delay = report
                .max_delay_s
                .map_or("-".to_string(), |d| format!("{:.3} us", d * 1e6));
            lines.push(format!(
                "  threshold {:.3}, guard {} bins, min sep {:.3} us, max delay {}, max peaks {}",
                report.threshold_frac,
                report.guard_bins,
                report.min_separation_s * 1e6,
                max_delay,
                report.max_peaks
            ));
            lines.push(format!(
                "  direct: bin {:>5}  amp {:.4}",
                report.direct_path.bin_index, report.direct_path.amplitude
            ));
        }

        for echo in &report.echoes {
            lines.push(format!(
                "  echo:   bin {:>5}  {:>8.3} us  amp {:.4} ({:>6.1} dBc)  {:>8.1} m  {:>8.1} ft",
                echo.bin_index,
                echo.time_s * 1e6,
                echo.amplitude,
                amplitude_dbc(echo.amplitude, report.direct_path.amplitude),
                echo.distance_m,
                echo.distance_ft
            ));
        }
        lines.join("\n")
    }
}

fn amplitude_dbc(amplitude: f64, reference: f64) -> f64 {
    if amplitude <= 0.0 || reference <= 0.0 {
        return f64::NEG_INFINITY;
    }
    20.0 * (amplitude / reference).log10()
}
