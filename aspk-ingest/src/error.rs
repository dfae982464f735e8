//! Error types for aspk-ingest
//!
//! One enum per concern. Only [`IngestError`] is fatal to a run; everything
//! else is scoped to a single record or a single captioning call.

use crate::utils::{DecodeError, ResampleError};
use thiserror::Error;

/// Audio download failures
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid audio URL: {0}")]
    InvalidUrl(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Audio host returned HTTP {0}")]
    Status(u16),

    #[error("Audio download timed out")]
    Timeout,
}

/// Asset store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid asset key: {0}")]
    InvalidKey(String),

    #[error("Asset not found: {0}")]
    NotFound(String),

    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the acquisition step; the record is marked failed
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Resample(#[from] ResampleError),

    #[error("WAV encoding failed: {0}")]
    Encode(#[from] hound::Error),

    #[error("Asset store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Audio task aborted: {0}")]
    Task(String),
}

impl AcquireError {
    /// True when the record's own input caused the failure (bad URL, host
    /// error, corrupt audio), false for local environment problems
    pub fn is_record_failure(&self) -> bool {
        matches!(
            self,
            Self::Fetch(_) | Self::Decode(_) | Self::Resample(_) | Self::Encode(_)
        )
    }
}

/// Captioning service transport / protocol failures
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Service returned no choices")]
    EmptyResponse,

    #[error("Malformed service response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Http(err.to_string())
    }
}

/// Prompt template loading / filling failures
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Prompt template '{name}' not found")]
    NotFound { name: String },

    #[error("Prompt template '{name}' is empty")]
    Empty { name: String },

    #[error("Prompt template '{name}' line {line}: {message}")]
    Parse {
        name: String,
        line: usize,
        message: String,
    },

    #[error("Prompt placeholder '{0}' has no value")]
    MissingField(String),

    #[error("Prompt template IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Caption generation failures
#[derive(Debug, Error)]
pub enum CaptionError {
    #[error("Captioning service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Caption generation failed after {attempts} attempts: {last_error}")]
    GenerationFailed { attempts: u32, last_error: String },

    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Location oracle failures (treated as "no location" by the decision engine)
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("NER request failed: {0}")]
    Http(String),

    #[error("NER service returned HTTP {0}")]
    Status(u16),

    #[error("Malformed NER response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for LocationError {
    fn from(err: reqwest::Error) -> Self {
        LocationError::Http(err.to_string())
    }
}

/// Input / output dataset failures
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Row {row}: missing required field '{field}'")]
    Schema { row: usize, field: &'static str },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported dataset format: {0}")]
    Format(String),

    #[error("Dataset IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that abort a run before or after the record loop
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Config(#[from] aspk_common::Error),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Output directory unusable: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl From<reqwest::Error> for IngestError {
    fn from(e: reqwest::Error) -> Self {
        Self::Client(e.to_string())
    }
}

pub type IngestResult<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_failure_classification() {
        assert!(AcquireError::from(FetchError::Status(404)).is_record_failure());
        assert!(AcquireError::from(DecodeError::NoTrack).is_record_failure());
        assert!(!AcquireError::from(StoreError::InvalidKey("..".into())).is_record_failure());
        assert!(!AcquireError::Task("panicked".into()).is_record_failure());
    }

    #[test]
    fn test_schema_error_names_row_and_field() {
        let err = DatasetError::Schema { row: 7, field: "url" };
        assert_eq!(err.to_string(), "Row 7: missing required field 'url'");
    }
}
