//! The per-patient feature table and its CSV form.
//!
//! Columns are always `Patient_ID` followed by [`FEATURE_COLUMNS`]. Reading
//! matches columns by name, so tables written by other tools with a
//! different column order load into the canonical order.

use crate::core::aggregate::AggregationReport;
use crate::core::features::{FeatureVector, FEATURE_COLUMNS, FEATURE_COUNT};
use std::fmt::Display;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Name of the leading identifier column.
pub const ID_COLUMN: &str = "Patient_ID";

/// Name of the column appended by batch prediction.
pub const PREDICTION_COLUMN: &str = "Prediction";

/// One row of the feature table.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub patient_id: String,
    pub vector: FeatureVector,
}

/// Feature table keyed by patient.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    pub rows: Vec<FeatureRow>,
}

/// Errors reading or writing a feature table.
#[derive(Debug)]
pub enum TableError {
    Io { path: PathBuf, source: std::io::Error },
    Csv(csv::Error),
    MissingColumn(String),
    InvalidValue { row: usize, column: String, value: String },
    LabelCount { rows: usize, labels: usize },
}

impl std::fmt::Display for TableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableError::Io { path, source } => write!(f, "IO error on {path:?}: {source}"),
            TableError::Csv(e) => write!(f, "CSV error: {e}"),
            TableError::MissingColumn(name) => write!(f, "missing column `{name}`"),
            TableError::InvalidValue { row, column, value } => {
                write!(f, "row {row}: column `{column}` is not numeric: {value:?}")
            }
            TableError::LabelCount { rows, labels } => {
                write!(f, "{labels} labels for {rows} rows")
            }
        }
    }
}

impl std::error::Error for TableError {}

impl From<csv::Error> for TableError {
    fn from(e: csv::Error) -> Self {
        TableError::Csv(e)
    }
}

impl From<&AggregationReport> for FeatureTable {
    fn from(report: &AggregationReport) -> Self {
        Self {
            rows: report
                .patients
                .iter()
                .map(|p| FeatureRow {
                    patient_id: p.patient_id.clone(),
                    vector: p.vector(),
                })
                .collect(),
        }
    }
}

impl FeatureTable {
    /// Header row in export order.
    pub fn header() -> Vec<&'static str> {
        std::iter::once(ID_COLUMN).chain(FEATURE_COLUMNS).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Feature vectors in row order.
    pub fn vectors(&self) -> Vec<FeatureVector> {
        self.rows.iter().map(|r| r.vector).collect()
    }

    /// Write the table as CSV.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), TableError> {
        self.write_rows(writer, Self::header(), |_| None::<String>)
    }

    /// Write the table with a trailing prediction column.
    pub fn write_labeled_csv<W: Write, L: Display>(
        &self,
        writer: W,
        labels: &[L],
    ) -> Result<(), TableError> {
        if labels.len() != self.rows.len() {
            return Err(TableError::LabelCount {
                rows: self.rows.len(),
                labels: labels.len(),
            });
        }
        let mut header = Self::header();
        header.push(PREDICTION_COLUMN);
        self.write_rows(writer, header, |i| Some(labels[i].to_string()))
    }

    fn write_rows<W, F>(&self, writer: W, header: Vec<&str>, extra: F) -> Result<(), TableError>
    where
        W: Write,
        F: Fn(usize) -> Option<String>,
    {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(&header)?;
        for (i, row) in self.rows.iter().enumerate() {
            let mut record = Vec::with_capacity(header.len());
            record.push(row.patient_id.clone());
            record.extend(row.vector.values().iter().map(f64::to_string));
            record.extend(extra(i));
            csv.write_record(&record)?;
        }
        csv.flush().map_err(|e| TableError::Csv(e.into()))?;
        Ok(())
    }

    /// Write the table to a CSV file.
    pub fn export_csv(&self, path: &Path) -> Result<(), TableError> {
        let io_err = |source: std::io::Error| TableError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = std::fs::File::create(path).map_err(io_err)?;
        self.write_csv(file)
    }

    /// Read a feature table from CSV.
    ///
    /// `Patient_ID` is optional; rows without it are named `row-N`. Extra
    /// columns are ignored.
    pub fn read_csv<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut csv = csv::Reader::from_reader(reader);
        let headers = csv.headers()?.clone();
        let position = |name: &str| headers.iter().position(|h| h.trim() == name);

        let id_index = position(ID_COLUMN);
        let mut feature_indices = [0usize; FEATURE_COUNT];
        for (slot, name) in feature_indices.iter_mut().zip(FEATURE_COLUMNS) {
            *slot = position(name).ok_or_else(|| TableError::MissingColumn(name.to_string()))?;
        }

        let mut rows = Vec::new();
        for (row, record) in csv.records().enumerate() {
            let record = record?;
            let mut values = [0.0; FEATURE_COUNT];
            for ((value, &index), name) in values
                .iter_mut()
                .zip(feature_indices.iter())
                .zip(FEATURE_COLUMNS)
            {
                let cell = record.get(index).unwrap_or("").trim();
                *value = cell.parse().map_err(|_| TableError::InvalidValue {
                    row: row + 1,
                    column: name.to_string(),
                    value: cell.to_string(),
                })?;
            }
            let patient_id = id_index
                .and_then(|i| record.get(i))
                .map(|id| id.trim().to_string())
                .unwrap_or_else(|| format!("row-{}", row + 1));
            rows.push(FeatureRow {
                patient_id,
                vector: FeatureVector::from_values(values),
            });
        }

        Ok(Self { rows })
    }

    /// Read a feature table from a CSV file.
    pub fn import_csv(path: &Path) -> Result<Self, TableError> {
        let file = std::fs::File::open(path).map_err(|source| TableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::read_csv(file)
    }
}
