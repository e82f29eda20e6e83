use octowatt::config::Config;
use std::fs;

#[test]
fn save_and_load_yaml_roundtrip() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("config.yaml");

    let mut cfg = Config::default();
    cfg.provider.rest_url = "http://127.0.0.1:9999/v1/".to_string();
    cfg.billing.timezone = "Europe/Dublin".to_string();
    cfg.store.path = tmp_dir
        .path()
        .join("users.json")
        .to_string_lossy()
        .to_string();

    cfg.save_to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.provider.rest_url, "http://127.0.0.1:9999/v1/");
    assert_eq!(loaded.billing.timezone, "Europe/Dublin");
    assert_eq!(loaded.store.path, cfg.store.path);
    assert!(loaded.validate().is_ok());
}

#[test]
fn config_validation_errors() {
    let mut cfg = Config::default();

    // Empty endpoint
    cfg.provider.graphql_url.clear();
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.provider.request_timeout_secs = 0;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.retry.max_attempts = 0;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.cache.capacity = 0;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.billing.timezone = "Mars/Olympus_Mons".to_string();
    assert!(cfg.validate().is_err());
    assert!(cfg.timezone().is_err());

    cfg = Config::default();
    cfg.store.backend = "sqlite".to_string();
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.web.port = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn from_file_with_invalid_yaml_fails() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"bad: [unclosed").unwrap();
    let err = Config::from_file(tmp.path()).unwrap_err();
    let msg = format!("{}", err);
    assert!(msg.contains("Serialization error"));
}

#[test]
fn from_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::from_file(dir.path().join("absent.yaml")).unwrap_err();
    assert!(format!("{}", err).contains("I/O error"));
}
