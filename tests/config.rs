use tailplot::config::TailPlotConfig;
use tailplot::error::ConfigError;

#[test]
fn save_then_load_from_nested_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.yaml");

    let mut cfg = TailPlotConfig::default();
    cfg.live = true;
    cfg.ingest.stall_timeout_secs = 4.0;
    cfg.layout.slots_per_tab = 3;
    cfg.save(&path).unwrap();

    let loaded = TailPlotConfig::load(&path).unwrap();
    assert_eq!(loaded, cfg);
    assert_eq!(loaded.ingest.stall_timeout().as_secs_f64(), 4.0);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = TailPlotConfig::load(&dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn malformed_yaml_is_a_parse_error() {
    let err = TailPlotConfig::from_yaml("ingest: [1, 2").unwrap_err();
    assert!(matches!(err, ConfigError::Yaml(_)));
}
