use super::{Formatter, iso8601_timestamp};
use crate::report::{DetectionReport, PathEstimate};

pub struct CsvFormatter;

fn row(ts: &str, report: &DetectionReport, kind: &str, path: &PathEstimate) -> String {
    format!(
        "{},{},{},{},{},{:.9e},{:.6},{:.3},{:.3}",
        ts,
        report.channel_id,
        report.cable_type,
        kind,
        path.bin_index,
        path.time_s,
        path.amplitude,
        path.distance_m,
        path.distance_ft
    )
}

impl Formatter for CsvFormatter {
    fn format(&self, report: &DetectionReport) -> String {
        let ts = iso8601_timestamp();
        std::iter::once(row(&ts, report, "direct", &report.direct_path))
            .chain(report.echoes.iter().map(|echo| row(&ts, report, "echo", echo)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn header(&self) -> Option<&'static str> {
        Some("ts,channel_id,cable_type,kind,bin_index,time_s,amplitude,distance_m,distance_ft")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::test_report::report;

    #[test]
    fn test_csv_one_row_per_path() {
        let formatter = CsvFormatter;
        let text = formatter.format(&report());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(",direct,0,"));
        assert!(lines[1].contains(",echo,64,"));

        let columns = formatter.header().unwrap().split(',').count();
        assert!(lines.iter().all(|l| l.split(',').count() == columns));
    }
}
