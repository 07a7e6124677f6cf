use std::io::Write;
use std::time::Duration;

use tps_system::EngineConfig;

#[test]
fn defaults_match_the_engine_constants() {
    let config = EngineConfig::default();
    assert_eq!(config.cheap_cost_threshold, 256);
    assert_eq!(config.sync_hard_cap(), Duration::from_secs(1));
    assert_eq!(config.sync_warn_threshold(), Duration::from_millis(20));
    assert_eq!(config.max_completions_per_update, 1);
    assert_eq!(config.max_options, tps_core::MAX_OPTION_INDEX + 1);
    assert!(config.warnings);
}

#[test]
fn missing_keys_fall_back_to_defaults() {
    let config = EngineConfig::from_yaml_str("sync_hard_cap_ms: 250\nwarnings: false\n").unwrap();
    assert_eq!(config.sync_hard_cap(), Duration::from_millis(250));
    assert!(!config.warnings);
    assert_eq!(config.cheap_cost_threshold, 256);

    let settings = config.eval_settings();
    assert_eq!(settings.cheap_cost_threshold, 256);
    assert!(!settings.warnings);
}

#[test]
fn out_of_range_option_count_is_rejected() {
    assert!(EngineConfig::from_yaml_str("max_options: 0").is_err());
    assert!(EngineConfig::from_yaml_str("max_options: 1000").is_err());
    assert!(EngineConfig::from_yaml_str("max_options: 4").is_ok());
}

#[test]
fn load_reads_yaml_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "max_completions_per_update: 3").unwrap();

    let config = EngineConfig::load(file.path()).unwrap();
    assert_eq!(config.max_completions_per_update, 3);
}

#[test]
fn load_reports_the_path_on_bad_yaml() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "sync_hard_cap_ms: [not, a, number]").unwrap();

    let err = EngineConfig::load(file.path()).unwrap_err();
    assert!(format!("{err:#}").contains(&file.path().display().to_string()));
}

#[test]
fn load_or_default_tolerates_a_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig::load_or_default(&dir.path().join("tps.yaml")).unwrap();
    assert_eq!(config, EngineConfig::default());
}
