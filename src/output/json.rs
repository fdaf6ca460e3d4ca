use super::Formatter;
use crate::report::DetectionReport;

pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, report: &DetectionReport) -> String {
        // Serializing plain data with string keys cannot fail
        serde_json::to_string_pretty(report).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::test_report::report;

    #[test]
    fn test_json_output_parses_back() {
        let text = JsonFormatter.format(&report());
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["channel_id"], 160);
        assert_eq!(value["echoes"][0]["bin_index"], 64);
    }
}
