//! Core data preparation for the breath classifier.
//!
//! This module contains:
//! - Parsing of per-patient sensor logs
//! - Time label normalization
//! - Pooling and averaging of readings per patient
//! - The canonical feature vector and feature table

pub mod aggregate;
pub mod features;
pub mod parser;
pub mod table;
pub mod time;

// Re-export commonly used types
pub use aggregate::{
    aggregate, aggregate_parsed, aggregate_sources, collect_sources, AggregatedPatientFeatures,
    AggregationReport, SkipReason, SkippedPatient,
};
pub use features::{FeatureVector, CHANNEL_COUNT, FEATURE_COLUMNS, FEATURE_COUNT};
pub use parser::{
    parse_patient_file, parse_patient_log, ParseError, ParseStats, ParsedLog, PatientLog,
    RawLogRecord,
};
pub use table::{FeatureRow, FeatureTable, TableError};
pub use time::normalize_time;
