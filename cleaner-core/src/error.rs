use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Element no longer present in document: {node}")]
    ElementMissing { node: String },

    #[error("No comment text found")]
    NoText,

    #[error("Comment text too short: {length} characters")]
    TextTooShort { length: usize },

    #[error("Invalid selector: {selector}")]
    InvalidSelector { selector: String },
}

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("API key missing for {provider}")]
    MissingApiKey { provider: String },

    #[error("Quota exhausted for {provider}: {details}")]
    QuotaExceeded {
        provider: String,
        status_code: Option<u16>,
        details: String,
    },

    #[error("Request to {provider} failed with status {status_code}: {body}")]
    RequestFailed {
        provider: String,
        status_code: u16,
        body: String,
    },

    #[error("Invalid response format from {provider}: {details}")]
    InvalidResponseFormat { provider: String, details: String },

    #[error("Unparsable score: {raw:?}")]
    UnparsableScore { raw: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Migration failed: {migration}")]
    MigrationFailed { migration: String },

    #[error("Query execution failed: {query}")]
    QueryFailed { query: String },

    #[error("Corrupt value stored under {key}: {reason}")]
    CorruptValue { key: String, reason: String },

    #[error("Write rejected for {key}")]
    WriteRejected { key: String },

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Environment variable not set: {var_name}")]
    MissingEnvironmentVariable { var_name: String },

    #[error("Permission denied accessing config: {path}")]
    PermissionDenied { path: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
