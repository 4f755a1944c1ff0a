use cleaner_core::{
    AppConfig, ClassifierError, ConfigError, CoreError, ErrorExt, ErrorSink, ExtractionError,
    FailureKind, RecordingErrorSink, StorageError, TracingErrorSink,
};
use std::io::Write;

#[test]
fn test_error_codes() {
    let extraction_error = CoreError::Extraction(ExtractionError::NoText);
    assert_eq!(extraction_error.error_code(), "EXTRACTION");

    let classifier_error = CoreError::Classifier(ClassifierError::MissingApiKey {
        provider: "gemini".to_string(),
    });
    assert_eq!(classifier_error.error_code(), "CLASSIFIER");

    let storage_error = CoreError::Storage(StorageError::WriteRejected {
        key: "blockedItems".to_string(),
    });
    assert_eq!(storage_error.error_code(), "STORAGE");

    let config_error = CoreError::Config(ConfigError::MissingEnvironmentVariable {
        var_name: "GEMINI_API_KEY".to_string(),
    });
    assert_eq!(config_error.error_code(), "CONFIG");
}

#[test]
fn test_failure_kinds_follow_taxonomy() {
    let miss = CoreError::Extraction(ExtractionError::TextTooShort { length: 4 });
    assert_eq!(miss.failure_kind(), FailureKind::ExtractionMiss);

    let quota = CoreError::Classifier(ClassifierError::QuotaExceeded {
        provider: "gemini".to_string(),
        status_code: Some(429),
        details: "RESOURCE_EXHAUSTED".to_string(),
    });
    assert_eq!(quota.failure_kind(), FailureKind::QuotaExceeded);

    let failed = CoreError::Classifier(ClassifierError::RequestFailed {
        provider: "gemini".to_string(),
        status_code: 500,
        body: "boom".to_string(),
    });
    assert_eq!(failed.failure_kind(), FailureKind::ClassificationFailure);

    let storage = CoreError::Storage(StorageError::ConnectionFailed {
        reason: "locked".to_string(),
    });
    assert_eq!(storage.failure_kind(), FailureKind::PersistenceFailure);
}

#[test]
fn test_user_friendly_messages() {
    let quota = CoreError::Classifier(ClassifierError::QuotaExceeded {
        provider: "gemini".to_string(),
        status_code: None,
        details: "quota".to_string(),
    });
    assert!(quota.user_friendly_message().contains("quota"));

    let config_error = CoreError::Config(ConfigError::InvalidValue {
        field: "pipeline.debounce_ms".to_string(),
        value: "0".to_string(),
    });
    assert!(config_error
        .user_friendly_message()
        .contains("pipeline.debounce_ms"));
}

#[test]
fn test_recording_sink_collects_reports() {
    let sink = RecordingErrorSink::new();
    sink.report_default(&CoreError::Extraction(ExtractionError::NoText));
    sink.report(
        FailureKind::PersistenceFailure,
        &CoreError::Storage(StorageError::WriteRejected {
            key: "blockedChannels".to_string(),
        }),
    );

    assert_eq!(sink.count(FailureKind::ExtractionMiss), 1);
    assert_eq!(sink.count(FailureKind::PersistenceFailure), 1);
    assert_eq!(sink.reports()[1].code, "STORAGE");

    sink.clear();
    assert!(sink.reports().is_empty());
}

#[test]
fn test_tracing_sink_does_not_panic() {
    let sink = TracingErrorSink::new()
        .with_error_reporting(true)
        .with_warning_reporting(false);
    sink.report_default(&CoreError::Internal {
        message: "ignored".to_string(),
    });
}

#[test]
fn test_config_defaults_and_overrides() {
    let config = AppConfig::from_toml_str(
        r#"
        database_url = "sqlite://test.db"

        [pipeline]
        debounce_ms = 250
        "#,
    )
    .unwrap();

    assert_eq!(config.database_url, "sqlite://test.db");
    assert_eq!(config.pipeline.debounce_ms, 250);
    assert_eq!(config.gemini.model, "gemini-2.0-flash");
    assert_eq!(config.background.sweep_interval_hours, 24);
    assert_eq!(config.gemini.request_timeout(), std::time::Duration::from_secs(30));
}

#[test]
fn test_config_rejects_zero_debounce() {
    let result = AppConfig::from_toml_str("[pipeline]\ndebounce_ms = 0\n");
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));

    let result = AppConfig::from_toml_str("[gemini]\nrequest_timeout_secs = 0\n");
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

#[test]
fn test_config_load_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::load(dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, AppConfig::default());
}

#[test]
fn test_config_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("comment-cleaner.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "[gemini]\nmodel = \"gemini-test\"").unwrap();

    let config = AppConfig::load(&path).unwrap();
    assert_eq!(config.gemini.model, "gemini-test");
}
