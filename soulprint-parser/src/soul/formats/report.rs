//! Report rendering
//!
//!     Each diagnostic becomes one `{code, severity, line, field_path, message}` record, in
//!     report order. `Text` is meant for people; the other formats are meant for logging
//!     sinks and keep every field, including nulls.

use super::FormatError;
use crate::soul::ast::Report;
use std::fmt::Write as _;
use std::str::FromStr;

/// How a Report is written out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// One `severity [Code] line N at path: message` line per diagnostic
    #[default]
    Text,
    /// A pretty-printed JSON array
    Json,
    /// One compact JSON object per line
    JsonLines,
    /// A YAML sequence
    Yaml,
}

impl ReportFormat {
    pub fn name(self) -> &'static str {
        match self {
            ReportFormat::Text => "text",
            ReportFormat::Json => "json",
            ReportFormat::JsonLines => "jsonl",
            ReportFormat::Yaml => "yaml",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            "jsonl" => Ok(ReportFormat::JsonLines),
            "yaml" => Ok(ReportFormat::Yaml),
            other => Err(FormatError::UnknownFormat(other.to_string())),
        }
    }
}

pub fn render_report(report: &Report, format: ReportFormat) -> Result<String, FormatError> {
    match format {
        ReportFormat::Text => Ok(report.to_string()),
        ReportFormat::Json => {
            let mut out = serde_json::to_string_pretty(report)?;
            out.push('\n');
            Ok(out)
        }
        ReportFormat::JsonLines => {
            let mut out = String::new();
            for diagnostic in report {
                let record = serde_json::to_string(diagnostic)?;
                let _ = writeln!(out, "{record}");
            }
            Ok(out)
        }
        ReportFormat::Yaml => Ok(serde_yaml::to_string(report)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soul::ast::{Code, Diagnostic};

    fn sample() -> Report {
        let mut report = Report::new();
        report.push(Diagnostic::info(Code::DefaultApplied, "defaulted Hash to none").at_path("Hash"));
        report.push(
            Diagnostic::warning(Code::UnknownField, "unknown key 'Colour'")
                .at_line(12)
                .at_path("Heartbeat.Colour"),
        );
        report
    }

    #[test]
    fn test_text() {
        insta::assert_snapshot!(render_report(&sample(), ReportFormat::Text).unwrap(), @r###"
        info [DefaultApplied] at Hash: defaulted Hash to none
        warning [UnknownField] line 12 at Heartbeat.Colour: unknown key 'Colour'
        "###);
    }

    #[test]
    fn test_json_lines_has_one_record_per_line() {
        let out = render_report(&sample(), ReportFormat::JsonLines).unwrap();
        let records: Vec<serde_json::Value> = out
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["code"], "DefaultApplied");
        assert_eq!(records[0]["line"], serde_json::Value::Null);
        assert_eq!(records[1]["severity"], "warning");
        assert_eq!(records[1]["field_path"], "Heartbeat.Colour");
    }

    #[test]
    fn test_json_and_yaml_are_record_lists() {
        let json: serde_json::Value =
            serde_json::from_str(&render_report(&sample(), ReportFormat::Json).unwrap()).unwrap();
        assert_eq!(json.as_array().map(Vec::len), Some(2));

        let yaml: Vec<Diagnostic> =
            serde_yaml::from_str(&render_report(&sample(), ReportFormat::Yaml).unwrap()).unwrap();
        assert_eq!(yaml, sample().diagnostics());
    }

    #[test]
    fn test_format_names() {
        for format in [
            ReportFormat::Text,
            ReportFormat::Json,
            ReportFormat::JsonLines,
            ReportFormat::Yaml,
        ] {
            assert_eq!(format.name().parse::<ReportFormat>().unwrap(), format);
        }
        assert!("xml".parse::<ReportFormat>().is_err());
    }
}
