//! Pooling of patient logs into one mean feature vector per patient.
//!
//! Records from every source are pooled under their patient id before any
//! averaging, so two sources for the same patient produce the mean of the
//! union rather than a mean of means. Time and channel means are independent:
//! a record whose time label does not normalize still contributes its
//! channels.

use crate::core::features::{FeatureVector, CHANNEL_COUNT, FEATURE_COUNT};
use crate::core::parser::{parse_patient_file, ParseStats, ParsedLog, PatientLog};
use crate::core::time::normalize_time;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Mean features for one patient.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedPatientFeatures {
    pub patient_id: String,
    pub mean_time_seconds: f64,
    pub mean_channel_values: [f64; CHANNEL_COUNT],
}

impl AggregatedPatientFeatures {
    /// Features in canonical order: time, then D1..D64.
    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        self.vector().values()
    }

    /// The features as an inference-ready vector.
    pub fn vector(&self) -> FeatureVector {
        FeatureVector::new(self.mean_time_seconds, self.mean_channel_values)
    }
}

/// Why a patient was left out of the feature table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Every line for the patient was dropped
    NoRecords,
    /// No record had a time label that normalizes
    NoValidTimes,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoRecords => write!(f, "no valid records"),
            SkipReason::NoValidTimes => {
                write!(f, "no valid time labels, channel data discarded")
            }
        }
    }
}

/// A patient excluded from the output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedPatient {
    pub patient_id: String,
    pub reason: SkipReason,
}

/// A source that could not be parsed at all.
#[derive(Debug, Clone)]
pub struct FailedSource {
    pub path: PathBuf,
    pub error: String,
}

/// Result of one aggregation pass.
#[derive(Debug, Clone)]
pub struct AggregationReport {
    /// One entry per patient, sorted by patient id
    pub patients: Vec<AggregatedPatientFeatures>,
    /// Patients with nothing to average
    pub skipped: Vec<SkippedPatient>,
    /// Sources that failed to parse
    pub failed_sources: Vec<FailedSource>,
    /// Number of sources that contributed
    pub sources: usize,
    /// Line counts summed over all sources
    pub parse_stats: ParseStats,
    /// Records whose time label did not normalize
    pub untimed_records: usize,
    pub generated_at: DateTime<Utc>,
}

impl AggregationReport {
    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Aggregation Summary:\n\
             - Sources parsed: {}\n\
             - Sources failed: {}\n\
             - Lines kept: {}\n\
             - Lines dropped (non-numeric): {}\n\
             - Lines dropped (channel count): {}\n\
             - Records without valid time: {}\n\
             - Patients aggregated: {}\n\
             - Patients skipped: {}",
            self.sources,
            self.failed_sources.len(),
            self.parse_stats.kept,
            self.parse_stats.dropped_non_numeric,
            self.parse_stats.dropped_channel_count,
            self.untimed_records,
            self.patients.len(),
            self.skipped.len(),
        );
        for skipped in &self.skipped {
            out.push_str(&format!("\n  - {}: {}", skipped.patient_id, skipped.reason));
        }
        for failed in &self.failed_sources {
            out.push_str(&format!("\n  - {:?}: {}", failed.path, failed.error));
        }
        out
    }
}

/// Pooled readings for one patient.
#[derive(Default)]
struct PatientAccumulator {
    times: Vec<f64>,
    channels: Vec<[f64; CHANNEL_COUNT]>,
}

impl PatientAccumulator {
    fn finish(self, patient_id: String) -> Result<AggregatedPatientFeatures, SkippedPatient> {
        let reason = if self.channels.is_empty() {
            Some(SkipReason::NoRecords)
        } else if self.times.is_empty() {
            Some(SkipReason::NoValidTimes)
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(SkippedPatient { patient_id, reason });
        }

        let mut mean_channel_values = [0.0; CHANNEL_COUNT];
        for (channel, mean) in mean_channel_values.iter_mut().enumerate() {
            *mean = self.channels.iter().map(|row| row[channel]).mean();
        }

        Ok(AggregatedPatientFeatures {
            patient_id,
            mean_time_seconds: self.times.iter().mean(),
            mean_channel_values,
        })
    }
}

/// Pool and average a set of patient logs.
pub fn aggregate(logs: &[PatientLog]) -> AggregationReport {
    let mut groups: BTreeMap<String, PatientAccumulator> = BTreeMap::new();
    let mut untimed_records = 0;

    for log in logs {
        let group = groups.entry(log.patient_id.clone()).or_default();
        for record in &log.records {
            match normalize_time(&record.time_label) {
                Some(seconds) => group.times.push(seconds),
                None => untimed_records += 1,
            }
            group.channels.push(record.channels);
        }
    }

    let mut patients = Vec::with_capacity(groups.len());
    let mut skipped = Vec::new();
    for (patient_id, group) in groups {
        match group.finish(patient_id) {
            Ok(features) => patients.push(features),
            Err(skip) => {
                tracing::warn!(
                    patient_id = %skip.patient_id,
                    reason = %skip.reason,
                    "excluding patient from feature table"
                );
                skipped.push(skip);
            }
        }
    }

    AggregationReport {
        patients,
        skipped,
        failed_sources: Vec::new(),
        sources: logs.len(),
        parse_stats: ParseStats::default(),
        untimed_records,
        generated_at: Utc::now(),
    }
}

/// Aggregate already-parsed logs, keeping their line counts.
pub fn aggregate_parsed(parsed: Vec<ParsedLog>) -> AggregationReport {
    let mut stats = ParseStats::default();
    let logs: Vec<PatientLog> = parsed
        .into_iter()
        .map(|p| {
            stats.merge(&p.stats);
            p.log
        })
        .collect();

    let mut report = aggregate(&logs);
    report.parse_stats = stats;
    report
}

/// Expand inputs into log files: files as given, directories walked in
/// sorted order.
pub fn collect_sources(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            files.extend(
                WalkDir::new(input)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_map(|entry| match entry {
                        Ok(entry) => Some(entry),
                        Err(e) => {
                            tracing::warn!("Failed to read directory entry: {}", e);
                            None
                        }
                    })
                    .filter(|entry| entry.file_type().is_file())
                    .map(|entry| entry.into_path()),
            );
        } else {
            files.push(input.clone());
        }
    }
    files
}

/// Parse and aggregate every log under the given files and directories.
///
/// A source that fails to parse is logged and recorded in the report; the
/// remaining sources are still aggregated.
pub fn aggregate_sources(inputs: &[PathBuf]) -> AggregationReport {
    let mut parsed = Vec::new();
    let mut failed_sources = Vec::new();

    for path in collect_sources(inputs) {
        match parse_source(&path) {
            Ok(log) => parsed.push(log),
            Err(error) => {
                tracing::warn!(path = ?path, "skipping source: {}", error);
                failed_sources.push(FailedSource { path, error });
            }
        }
    }

    let mut report = aggregate_parsed(parsed);
    report.failed_sources = failed_sources;
    report
}

fn parse_source(path: &Path) -> Result<ParsedLog, String> {
    let parsed = parse_patient_file(path).map_err(|e| e.to_string())?;
    tracing::debug!(
        path = ?path,
        patient_id = %parsed.log.patient_id,
        kept = parsed.stats.kept,
        dropped = parsed.stats.dropped(),
        "parsed source"
    );
    Ok(parsed)
}
