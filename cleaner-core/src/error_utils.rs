use crate::error::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use tracing::{debug, error, warn};

/// Failure categories every swallowed error is tagged with before it reaches a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    /// A candidate element did not yield a comment record. Never user visible.
    ExtractionMiss,
    /// The remote score could not be obtained; the comment is treated as not AI.
    ClassificationFailure,
    /// The remote quota is exhausted until the API key changes.
    QuotaExceeded,
    /// A persisted read or write was rejected; in-memory state stays authoritative.
    PersistenceFailure,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::ExtractionMiss => "extraction_miss",
            FailureKind::ClassificationFailure => "classification_failure",
            FailureKind::QuotaExceeded => "quota_exceeded",
            FailureKind::PersistenceFailure => "persistence_failure",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait ErrorExt {
    fn failure_kind(&self) -> FailureKind;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            CoreError::Extraction(e) => e.failure_kind(),
            CoreError::Classifier(e) => e.failure_kind(),
            CoreError::Storage(e) => e.failure_kind(),
            CoreError::Config(e) => e.failure_kind(),
            CoreError::Io(_) | CoreError::Serialization(_) => FailureKind::PersistenceFailure,
            CoreError::Internal { .. } => FailureKind::ClassificationFailure,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::Extraction(e) => e.user_friendly_message(),
            CoreError::Classifier(e) => e.user_friendly_message(),
            CoreError::Storage(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::Extraction(_) => "EXTRACTION".to_string(),
            CoreError::Classifier(_) => "CLASSIFIER".to_string(),
            CoreError::Storage(_) => "STORAGE".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
        }
    }
}

impl ErrorExt for ExtractionError {
    fn failure_kind(&self) -> FailureKind {
        FailureKind::ExtractionMiss
    }

    fn user_friendly_message(&self) -> String {
        "This element does not look like a comment.".to_string()
    }

    fn error_code(&self) -> String {
        match self {
            ExtractionError::ElementMissing { .. } => "EXTRACT_ELEMENT_MISSING".to_string(),
            ExtractionError::NoText => "EXTRACT_NO_TEXT".to_string(),
            ExtractionError::TextTooShort { .. } => "EXTRACT_TEXT_TOO_SHORT".to_string(),
            ExtractionError::InvalidSelector { .. } => "EXTRACT_INVALID_SELECTOR".to_string(),
        }
    }
}

impl ErrorExt for ClassifierError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            ClassifierError::QuotaExceeded { .. } => FailureKind::QuotaExceeded,
            _ => FailureKind::ClassificationFailure,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ClassifierError::MissingApiKey { .. } => {
                "A Gemini API key is required. Please enter one in the options.".to_string()
            }
            ClassifierError::QuotaExceeded { .. } => {
                "The Gemini API quota has been used up.".to_string()
            }
            ClassifierError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_string()
            }
            _ => "Comment classification failed. The comment was left visible.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            ClassifierError::MissingApiKey { .. } => "CLASSIFIER_MISSING_API_KEY".to_string(),
            ClassifierError::QuotaExceeded { .. } => "CLASSIFIER_QUOTA_EXCEEDED".to_string(),
            ClassifierError::RequestFailed { .. } => "CLASSIFIER_REQUEST_FAILED".to_string(),
            ClassifierError::InvalidResponseFormat { .. } => {
                "CLASSIFIER_INVALID_RESPONSE".to_string()
            }
            ClassifierError::UnparsableScore { .. } => "CLASSIFIER_UNPARSABLE_SCORE".to_string(),
            ClassifierError::Network(_) => "CLASSIFIER_NETWORK".to_string(),
        }
    }
}

impl ErrorExt for StorageError {
    fn failure_kind(&self) -> FailureKind {
        FailureKind::PersistenceFailure
    }

    fn user_friendly_message(&self) -> String {
        match self {
            StorageError::ConnectionFailed { .. } => {
                "Storage connection failed. Changes are kept for this page only.".to_string()
            }
            StorageError::CorruptValue { key, .. } => {
                format!("Stored value for '{}' is unreadable and was ignored.", key)
            }
            _ => "Storage error occurred. Changes are kept for this page only.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            StorageError::ConnectionFailed { .. } => "STORAGE_CONNECTION_FAILED".to_string(),
            StorageError::MigrationFailed { .. } => "STORAGE_MIGRATION_FAILED".to_string(),
            StorageError::QueryFailed { .. } => "STORAGE_QUERY_FAILED".to_string(),
            StorageError::CorruptValue { .. } => "STORAGE_CORRUPT_VALUE".to_string(),
            StorageError::WriteRejected { .. } => "STORAGE_WRITE_REJECTED".to_string(),
            StorageError::Sql(_) => "STORAGE_SQL".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn failure_kind(&self) -> FailureKind {
        FailureKind::PersistenceFailure
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file '{}' not found.", path)
            }
            ConfigError::InvalidValue { field, .. } => {
                format!("Invalid value for configuration field '{}'.", field)
            }
            ConfigError::MissingEnvironmentVariable { var_name } => format!(
                "Environment variable '{}' is required but not set.",
                var_name
            ),
            ConfigError::PermissionDenied { .. } => {
                "Permission denied accessing configuration. Please check file permissions."
                    .to_string()
            }
            ConfigError::Parse(_) => {
                "Configuration file could not be parsed. Please check its syntax.".to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::MissingEnvironmentVariable { .. } => "CONFIG_MISSING_ENV_VAR".to_string(),
            ConfigError::PermissionDenied { .. } => "CONFIG_PERMISSION_DENIED".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}

/// One swallowed failure as seen by a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    pub kind: FailureKind,
    pub code: String,
    pub message: String,
}

impl FailureReport {
    pub fn from_error(kind: FailureKind, error: &CoreError) -> Self {
        Self {
            kind,
            code: error.error_code(),
            message: error.to_string(),
        }
    }
}

/// Destination for every failure the pipeline degrades past instead of propagating.
pub trait ErrorSink: Send + Sync {
    fn report(&self, kind: FailureKind, error: &CoreError);

    fn report_default(&self, error: &CoreError) {
        self.report(error.failure_kind(), error);
    }
}

pub struct TracingErrorSink {
    report_errors: bool,
    report_warnings: bool,
}

impl TracingErrorSink {
    pub fn new() -> Self {
        Self {
            report_errors: true,
            report_warnings: true,
        }
    }

    pub fn with_error_reporting(mut self, enabled: bool) -> Self {
        self.report_errors = enabled;
        self
    }

    pub fn with_warning_reporting(mut self, enabled: bool) -> Self {
        self.report_warnings = enabled;
        self
    }
}

impl ErrorSink for TracingErrorSink {
    fn report(&self, kind: FailureKind, error: &CoreError) {
        match kind {
            FailureKind::ExtractionMiss => {
                debug!(kind = %kind, code = %error.error_code(), "{}", error);
            }
            FailureKind::ClassificationFailure | FailureKind::PersistenceFailure => {
                if self.report_warnings {
                    warn!(kind = %kind, code = %error.error_code(), "{}", error);
                }
            }
            FailureKind::QuotaExceeded => {
                if self.report_errors {
                    error!(
                        kind = %kind,
                        code = %error.error_code(),
                        user_message = %error.user_friendly_message(),
                        "{}",
                        error
                    );
                }
            }
        }
    }
}

impl Default for TracingErrorSink {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps every report in memory so callers can assert on failure categories.
#[derive(Default)]
pub struct RecordingErrorSink {
    reports: Mutex<Vec<FailureReport>>,
}

impl RecordingErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<FailureReport> {
        self.reports
            .lock()
            .map(|reports| reports.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, kind: FailureKind) -> usize {
        self.reports().iter().filter(|r| r.kind == kind).count()
    }

    pub fn clear(&self) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.clear();
        }
    }
}

impl ErrorSink for RecordingErrorSink {
    fn report(&self, kind: FailureKind, error: &CoreError) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push(FailureReport::from_error(kind, error));
        }
    }
}
