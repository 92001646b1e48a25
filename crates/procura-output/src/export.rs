//! Export functionality for engine tables.
//!
//! This module provides CSV and JSON export for enriched transactions, the
//! auxiliary tables, the opportunity radar and the run summary.

use crate::radar::OpportunityRadar;
use crate::records::TabularRecord;
use crate::summary::RunSummary;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialized CSV was not valid UTF-8.
    #[error("Invalid UTF-8 in output: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Delimiter-separated values with a custom delimiter (e.g. `b';'`).
    Delimited(u8),

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv | Self::Delimited(_) => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }

    const fn delimiter(&self) -> Option<u8> {
        match self {
            Self::Csv => Some(b','),
            Self::Delimited(d) => Some(*d),
            Self::Json | Self::PrettyJson => None,
        }
    }
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        tracing::info!(path = %path.display(), bytes = content.len(), "exported");
        Ok(())
    }
}

fn records_to_string<T: TabularRecord>(
    records: &[T],
    format: ExportFormat,
) -> Result<String, ExportError> {
    match format.delimiter() {
        Some(delimiter) => {
            let mut wtr = csv::WriterBuilder::new()
                .delimiter(delimiter)
                .from_writer(vec![]);
            for record in records {
                wtr.serialize(record)?;
            }
            let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
            Ok(String::from_utf8(bytes)?)
        }
        None if format == ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(records)?),
        None => Ok(serde_json::to_string(records)?),
    }
}

impl<T: TabularRecord> Exporter for Vec<T> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        records_to_string(self, format)
    }
}

impl Exporter for OpportunityRadar {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        records_to_string(self.entries(), format)
    }
}

impl Exporter for RunSummary {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
            ExportFormat::Csv | ExportFormat::Delimited(_) => Err(ExportError::InvalidFormat(
                "run summary is nested and only exports as JSON".to_string(),
            )),
        }
    }
}
