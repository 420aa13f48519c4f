//! End-to-end tests for log files → feature table.

use breath_classifier::core::{FeatureTable, CHANNEL_COUNT, FEATURE_COLUMNS};
use breath_classifier::{aggregate_sources, AggregationReport};
use std::path::{Path, PathBuf};

fn reading(time: &str, value: f64) -> String {
    let channels = vec![value.to_string(); CHANNEL_COUNT];
    format!("{time}\t{}", channels.join("\t"))
}

fn write_log(dir: &Path, name: &str, patient_id: &str, lines: &[String]) -> PathBuf {
    let header = std::iter::once("Min:Sec".to_string())
        .chain((1..=CHANNEL_COUNT).map(|i| format!("D{i}")))
        .collect::<Vec<_>>()
        .join("\t");
    let mut text = format!("Patient ID: {patient_id}\nDevice: breath-64\n\n{header}\n");
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

fn patient<'a>(report: &'a AggregationReport, id: &str) -> &'a breath_classifier::AggregatedPatientFeatures {
    report
        .patients
        .iter()
        .find(|p| p.patient_id == id)
        .unwrap_or_else(|| panic!("patient {id} missing"))
}

#[test]
fn test_three_readings_mean_time() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(
        dir.path(),
        "p001.txt",
        "P001",
        &[reading("0:30", 1.0), reading("0:45", 1.0), reading("1:00", 1.0)],
    );

    let report = aggregate_sources(&[path]);
    assert_eq!(patient(&report, "P001").mean_time_seconds, 45.0);
    assert_eq!(report.parse_stats.kept, 3);
}

#[test]
fn test_pooled_sources_and_malformed_rows() {
    let dir = tempfile::tempdir().unwrap();
    let logs = dir.path().join("logs");
    std::fs::create_dir(&logs).unwrap();

    let k = 0.3;
    write_log(&logs, "a.txt", "P002", &[reading("0:10", k), reading("0:20", k)]);
    let short = format!("0:25\t{}", vec!["1"; CHANNEL_COUNT - 1].join("\t"));
    let garbled = reading("0:27", k).replacen("\t0.3", "\tNaNx", 1);
    write_log(
        &logs,
        "b.txt",
        "P002",
        &[
            reading("0:30", k),
            short,
            garbled,
            reading("abc:def", k),
            reading("0:40", k),
        ],
    );
    std::fs::write(logs.join("broken.txt"), "no header separator here\n").unwrap();

    let report = aggregate_sources(&[logs]);

    assert_eq!(report.sources, 2);
    assert_eq!(report.failed_sources.len(), 1);
    assert_eq!(report.parse_stats.dropped_channel_count, 1);
    assert_eq!(report.parse_stats.dropped_non_numeric, 1);
    assert_eq!(report.untimed_records, 1);

    let p = patient(&report, "P002");
    assert_eq!(p.mean_channel_values, [k; CHANNEL_COUNT]);
    assert_eq!(p.mean_time_seconds, 25.0);
}

#[test]
fn test_aggregation_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write_log(dir.path(), "1.txt", "B", &[reading("0:01", 2.0)]);
    write_log(dir.path(), "2.txt", "A", &[reading("0:02", 3.0)]);
    let inputs = vec![dir.path().to_path_buf()];

    let first = aggregate_sources(&inputs);
    let second = aggregate_sources(&inputs);
    assert_eq!(first.patients, second.patients);
    let ids: Vec<&str> = first.patients.iter().map(|p| p.patient_id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B"]);
}

#[test]
fn test_export_columns() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(dir.path(), "p.txt", "P9", &[reading("2:00", 4.0)]);
    let report = aggregate_sources(&[path]);

    let out = dir.path().join("features.csv");
    FeatureTable::from(&report).export_csv(&out).unwrap();

    let text = std::fs::read_to_string(&out).unwrap();
    let mut lines = text.lines();
    let header: Vec<&str> = lines.next().unwrap().split(',').collect();
    assert_eq!(header[0], "Patient_ID");
    assert_eq!(&header[1..], &FEATURE_COLUMNS[..]);
    assert!(lines.next().unwrap().starts_with("P9,120,4,"));
}

#[test]
fn test_patient_without_valid_rows_is_excluded() {
    let dir = tempfile::tempdir().unwrap();
    let bad = format!("0:10\t{}", vec!["x"; CHANNEL_COUNT].join("\t"));
    write_log(dir.path(), "empty.txt", "GHOST", &[bad]);
    write_log(dir.path(), "ok.txt", "REAL", &[reading("0:10", 1.0)]);

    let report = aggregate_sources(&[dir.path().to_path_buf()]);
    assert_eq!(report.patients.len(), 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].patient_id, "GHOST");
}

#[test]
fn test_non_finite_readings_never_reach_export() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(
        dir.path(),
        "p.txt",
        "P5",
        &[
            reading("0:10", 2.0),
            reading("0:20", 2.0).replacen("\t2", "\tnan", 1),
            reading("0:30", 2.0).replacen("\t2", "\tinf", 1),
            reading("0:40", 4.0),
        ],
    );
    let report = aggregate_sources(&[path]);
    assert_eq!(report.parse_stats.dropped_non_numeric, 2);

    let p = patient(&report, "P5");
    assert_eq!(p.mean_time_seconds, 25.0);
    assert_eq!(p.mean_channel_values, [3.0; CHANNEL_COUNT]);

    let json = serde_json::to_string(&p.vector()).unwrap();
    assert!(json.starts_with(r#"{"Min_Sec":25.0,"D1":3.0,"#));
    assert!(!json.contains("null"));

    let out = dir.path().join("features.csv");
    FeatureTable::from(&report).export_csv(&out).unwrap();
    let text = std::fs::read_to_string(&out).unwrap();
    let row = text.lines().nth(1).unwrap();
    assert!(row
        .split(',')
        .skip(1)
        .all(|v| v.parse::<f64>().map_or(false, f64::is_finite)));
}
