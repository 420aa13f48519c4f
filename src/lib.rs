//! Breath Classifier - breath-sensor feature aggregation and classification.
//!
//! This library turns per-patient breath-sensor logs into one feature vector
//! per patient and classifies feature vectors as positive or negative.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        Breath Classifier                          │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌─────────────┐   ┌──────────────┐                │
//! │  │  Parser  │──▶│  Aggregator │──▶│ Feature table│──▶ CSV export  │
//! │  │ (per log)│   │ (per patient│   │ (Min_Sec,    │                │
//! │  └──────────┘   │  means)     │   │  D1..D64)    │                │
//! │                 └─────────────┘   └──────┬───────┘                │
//! │                                          ▼                        │
//! │                  ┌──────────────┐   ┌──────────────┐              │
//! │                  │ Model bundle │   │ Inference    │──▶ service   │
//! │                  │ (local)      │   │ client       │              │
//! │                  └──────────────┘   └──────────────┘              │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`core`]: log parsing, time normalization, aggregation, feature table
//! - [`inference`]: labels, the local model artifact, and the service client
//! - [`config`]: persisted settings
//! - `server`: the prediction service (requires the `server` feature)
//!
//! # Example
//!
//! ```
//! use breath_classifier::{aggregate, parse_patient_log, FeatureTable};
//!
//! let values = vec!["1.5"; 64].join(" ");
//! let text = format!("ID: P001\nreserved\nreserved\n0:30 {values}\n1:00 {values}\n");
//!
//! let parsed = parse_patient_log(&text)?;
//! let report = aggregate(&[parsed.log]);
//! assert_eq!(report.patients[0].mean_time_seconds, 45.0);
//!
//! let mut csv = Vec::new();
//! FeatureTable::from(&report).write_csv(&mut csv).expect("in-memory write");
//! # Ok::<(), breath_classifier::core::ParseError>(())
//! ```

pub mod config;
pub mod core;
pub mod inference;

#[cfg(feature = "server")]
pub mod server;

pub use config::Config;
pub use core::{
    aggregate, aggregate_sources, parse_patient_log, AggregatedPatientFeatures, AggregationReport,
    FeatureTable, FeatureVector, PatientLog,
};
pub use inference::{ClientConfig, ClientError, Label, LabelCounts, ModelBundle};

#[cfg(feature = "client")]
pub use inference::{BlockingInferenceClient, InferenceClient};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
