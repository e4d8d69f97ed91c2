//! Integration tests for json-exporter-common library.

use std::io::Write;

use json_exporter_common::{Error, LogFormat, LoggingConfig, load_config};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct AppConfig {
    name: String,
    #[serde(default)]
    logging: LoggingConfig,
}

#[test]
fn test_load_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    write!(
        file,
        r#"{{
            // JSON5 allows comments and trailing commas
            name: "probe",
            logging: {{ level: "warn", format: "json", }},
        }}"#
    )
    .unwrap();

    let config: AppConfig = load_config(file.path()).expect("load config");

    assert_eq!(config.name, "probe");
    assert_eq!(config.logging.level, "warn");
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
fn test_load_config_reports_path_on_parse_error() {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    write!(file, "{{ name: ").unwrap();

    let err = load_config::<AppConfig>(file.path()).unwrap_err();

    match err {
        Error::Config(msg) => {
            assert!(msg.contains("Failed to parse config file"));
            assert!(msg.contains(&file.path().display().to_string()));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
