//! Parsing of per-patient breath-sensor logs.
//!
//! A log looks like:
//!
//! ```text
//! Patient ID: P001
//! <reserved>
//! <reserved>
//! Min:Sec  D1  D2  ...  D64
//! 0:30     0.1 0.2 ...  6.4
//! ```
//!
//! Line 1 carries the patient identifier after the first `:`. Lines 2 and 3
//! are ignored. Readings start at line 4; a repeated `Min:Sec` header among
//! them is skipped. Malformed readings are dropped and counted in
//! [`ParseStats`], never treated as fatal.

use crate::core::features::CHANNEL_COUNT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Literal first token of the column header line.
const HEADER_TOKEN: &str = "Min:Sec";

/// Number of lines before readings begin.
const PREAMBLE_LINES: usize = 3;

/// One reading: a time label and the 64 channel values.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLogRecord {
    pub time_label: String,
    pub channels: [f64; CHANNEL_COUNT],
}

/// All readings from one input source.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientLog {
    pub patient_id: String,
    pub records: Vec<RawLogRecord>,
}

/// Counts of kept and dropped lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStats {
    /// Lines that looked like readings
    pub candidate_lines: usize,
    /// Lines turned into records
    pub kept: usize,
    /// Lines with a non-numeric channel token
    pub dropped_non_numeric: usize,
    /// Lines with a channel count other than 64
    pub dropped_channel_count: usize,
}

impl ParseStats {
    /// Total lines dropped for any reason.
    pub fn dropped(&self) -> usize {
        self.dropped_non_numeric + self.dropped_channel_count
    }

    /// Accumulate another source's counts.
    pub fn merge(&mut self, other: &ParseStats) {
        self.candidate_lines += other.candidate_lines;
        self.kept += other.kept;
        self.dropped_non_numeric += other.dropped_non_numeric;
        self.dropped_channel_count += other.dropped_channel_count;
    }
}

/// A parsed log together with its drop counts.
#[derive(Debug, Clone)]
pub struct ParsedLog {
    pub log: PatientLog,
    pub stats: ParseStats,
}

/// Errors that make a whole source unusable.
#[derive(Debug)]
pub enum ParseError {
    /// The source has no header line
    Empty,
    /// The header line has no `:` separator
    MissingSeparator(String),
    /// The header names an empty patient id
    EmptyPatientId,
    /// The source could not be read
    Io { path: PathBuf, source: std::io::Error },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Empty => write!(f, "log is empty"),
            ParseError::MissingSeparator(line) => {
                write!(f, "header line has no ':' separator: {line:?}")
            }
            ParseError::EmptyPatientId => write!(f, "header line has an empty patient id"),
            ParseError::Io { path, source } => write!(f, "failed to read {path:?}: {source}"),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Why a single line was rejected.
enum LineRejection {
    NotCandidate,
    NonNumeric,
    ChannelCount(usize),
}

/// Parse one patient's log text.
pub fn parse_patient_log(text: &str) -> Result<ParsedLog, ParseError> {
    let mut lines = text.lines();
    let header = lines.next().ok_or(ParseError::Empty)?;
    let patient_id = parse_patient_id(header)?;

    let mut records = Vec::new();
    let mut stats = ParseStats::default();

    for (offset, line) in lines.skip(PREAMBLE_LINES - 1).enumerate() {
        let line_no = offset + PREAMBLE_LINES + 1;
        match parse_line(line) {
            Ok(record) => {
                stats.candidate_lines += 1;
                stats.kept += 1;
                records.push(record);
            }
            Err(LineRejection::NotCandidate) => {}
            Err(LineRejection::NonNumeric) => {
                stats.candidate_lines += 1;
                stats.dropped_non_numeric += 1;
                tracing::debug!(
                    patient_id = %patient_id,
                    line_no,
                    "dropped line with non-numeric channel"
                );
            }
            Err(LineRejection::ChannelCount(count)) => {
                stats.candidate_lines += 1;
                stats.dropped_channel_count += 1;
                tracing::debug!(
                    patient_id = %patient_id,
                    line_no,
                    count,
                    "dropped line with wrong channel count"
                );
            }
        }
    }

    Ok(ParsedLog {
        log: PatientLog {
            patient_id,
            records,
        },
        stats,
    })
}

/// Read and parse a log file.
pub fn parse_patient_file(path: &Path) -> Result<ParsedLog, ParseError> {
    let text = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_patient_log(&text)
}

fn parse_patient_id(header: &str) -> Result<String, ParseError> {
    let (_, value) = header
        .split_once(':')
        .ok_or_else(|| ParseError::MissingSeparator(header.to_string()))?;
    let id = value.trim();
    if id.is_empty() {
        return Err(ParseError::EmptyPatientId);
    }
    Ok(id.to_string())
}

fn parse_line(line: &str) -> Result<RawLogRecord, LineRejection> {
    let mut tokens = line.split_whitespace();
    let time_label = match tokens.next() {
        Some(token) if token != HEADER_TOKEN => token,
        _ => return Err(LineRejection::NotCandidate),
    };

    // `nan` and `inf` parse as f64 but are not readings.
    let values = tokens
        .map(|token| token.parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect::<Option<Vec<_>>>()
        .ok_or(LineRejection::NonNumeric)?;
    if values.is_empty() {
        return Err(LineRejection::NotCandidate);
    }

    let channels: [f64; CHANNEL_COUNT] = values
        .as_slice()
        .try_into()
        .map_err(|_| LineRejection::ChannelCount(values.len()))?;

    Ok(RawLogRecord {
        time_label: time_label.to_string(),
        channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(time: &str, value: f64) -> String {
        let channels: Vec<String> = (0..CHANNEL_COUNT).map(|_| value.to_string()).collect();
        format!("{time} {}", channels.join(" "))
    }

    fn log_text(header: &str, lines: &[String]) -> String {
        let mut text = format!("{header}\nreserved\nreserved\n");
        for line in lines {
            text.push_str(line);
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_patient_id_from_header() {
        let parsed = parse_patient_log(&log_text("ID:  P001  ", &[])).unwrap();
        assert_eq!(parsed.log.patient_id, "P001");
        assert!(parsed.log.records.is_empty());
    }

    #[test]
    fn test_patient_id_after_first_colon() {
        let parsed = parse_patient_log(&log_text("Patient: A:7", &[])).unwrap();
        assert_eq!(parsed.log.patient_id, "A:7");
    }

    #[test]
    fn test_header_errors() {
        assert!(matches!(parse_patient_log(""), Err(ParseError::Empty)));
        assert!(matches!(
            parse_patient_log("no separator\n"),
            Err(ParseError::MissingSeparator(_))
        ));
        assert!(matches!(
            parse_patient_log("ID:   \n"),
            Err(ParseError::EmptyPatientId)
        ));
    }

    #[test]
    fn test_readings_start_at_line_four() {
        let text = format!(
            "ID:P001\n{}\n{}\n{}\n",
            reading("0:10", 9.0),
            reading("0:20", 9.0),
            reading("0:30", 1.0)
        );
        let parsed = parse_patient_log(&text).unwrap();
        assert_eq!(parsed.log.records.len(), 1);
        assert_eq!(parsed.log.records[0].time_label, "0:30");
    }

    #[test]
    fn test_repeated_header_skipped() {
        let header_line = format!(
            "Min:Sec {}",
            (1..=CHANNEL_COUNT)
                .map(|i| format!("D{i}"))
                .collect::<Vec<_>>()
                .join(" ")
        );
        let parsed =
            parse_patient_log(&log_text("ID:P001", &[header_line, reading("0:30", 1.5)]))
                .unwrap();
        assert_eq!(parsed.log.records.len(), 1);
        assert_eq!(parsed.stats.candidate_lines, 1);
        assert_eq!(parsed.stats.dropped(), 0);
    }

    #[test]
    fn test_non_numeric_line_dropped() {
        let bad = reading("0:45", 2.0).replacen(" 2", " x", 1);
        let parsed = parse_patient_log(&log_text(
            "ID:P001",
            &[reading("0:30", 1.0), bad, reading("1:00", 3.0)],
        ))
        .unwrap();

        assert_eq!(parsed.log.records.len(), 2);
        assert_eq!(parsed.stats.dropped_non_numeric, 1);
        assert_eq!(parsed.log.records[0].channels, [1.0; CHANNEL_COUNT]);
        assert_eq!(parsed.log.records[1].channels, [3.0; CHANNEL_COUNT]);
    }

    #[test]
    fn test_non_finite_tokens_dropped() {
        let lines: Vec<String> = ["nan", "NaN", "inf", "-infinity"]
            .iter()
            .map(|token| reading("0:40", 2.0).replacen(" 2", &format!(" {token}"), 1))
            .chain(std::iter::once(reading("0:50", 2.0)))
            .collect();
        let parsed = parse_patient_log(&log_text("ID:P001", &lines)).unwrap();

        assert_eq!(parsed.log.records.len(), 1);
        assert_eq!(parsed.stats.dropped_non_numeric, 4);
        assert!(parsed.log.records[0].channels.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_short_line_rejected_not_padded() {
        let short = format!(
            "0:45 {}",
            vec!["1.0"; CHANNEL_COUNT - 1].join(" ")
        );
        let long = format!("0:50 {}", vec!["1.0"; CHANNEL_COUNT + 1].join(" "));
        let parsed =
            parse_patient_log(&log_text("ID:P001", &[short, long, reading("1:00", 1.0)]))
                .unwrap();
        assert_eq!(parsed.log.records.len(), 1);
        assert_eq!(parsed.stats.dropped_channel_count, 2);
        assert_eq!(parsed.stats.kept, 1);
    }

    #[test]
    fn test_single_token_and_blank_lines_ignored() {
        let parsed = parse_patient_log(&log_text(
            "ID:P001",
            &["".to_string(), "0:30".to_string(), reading("0:40", 1.0)],
        ))
        .unwrap();
        assert_eq!(parsed.log.records.len(), 1);
        assert_eq!(parsed.stats.candidate_lines, 1);
    }

    #[test]
    fn test_unparseable_time_label_kept() {
        let parsed =
            parse_patient_log(&log_text("ID:P001", &[reading("abc:def", 1.0)])).unwrap();
        assert_eq!(parsed.log.records.len(), 1);
        assert_eq!(parsed.log.records[0].time_label, "abc:def");
    }
}
