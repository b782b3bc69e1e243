use super::{apply_env, load_settings_from, Settings, SettingsError, DEFAULT_TICK_INTERVAL_MS};

use std::{
    collections::HashMap,
    env, fs,
    path::PathBuf,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

fn temp_settings_file(name: &str, contents: &str) -> (PathBuf, PathBuf) {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();

    let temp_root = env::temp_dir().join(format!("progress_demo_{name}_{suffix}"));
    fs::create_dir_all(&temp_root).expect("temp root");
    let path = temp_root.join("counter.toml");
    fs::write(&path, contents).expect("write settings");
    (temp_root, path)
}

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_to_one_second_ticks_and_unset_bounds() {
    let settings = Settings::default();
    assert_eq!(settings.tick_interval(), Duration::from_secs(1));
    assert_eq!(settings.min, None);
    assert_eq!(settings.max, None);
}

#[test]
fn reads_explicit_settings_file() {
    let (temp_root, path) = temp_settings_file(
        "explicit",
        "tick_interval_ms = 250\nmin = 5\nmax = 9\n",
    );

    let settings = load_settings_from(Some(&path)).expect("load settings");
    assert_eq!(settings.min, Some(5));
    assert_eq!(settings.max, Some(9));

    fs::remove_dir_all(temp_root).expect("cleanup");
}

#[test]
fn missing_explicit_file_is_an_error() {
    let path = env::temp_dir().join("progress_demo_definitely_missing").join("counter.toml");
    let err = load_settings_from(Some(&path)).expect_err("missing file");
    assert!(matches!(err, SettingsError::Read { .. }));
}

#[test]
fn rejects_unknown_keys_in_settings_file() {
    let (temp_root, path) = temp_settings_file("unknown", "tick = 3\n");

    let err = load_settings_from(Some(&path)).expect_err("unknown key");
    assert!(matches!(err, SettingsError::Parse { .. }));
    assert!(err.to_string().contains("failed to parse settings file"));

    fs::remove_dir_all(temp_root).expect("cleanup");
}

#[test]
fn environment_overrides_file_values() {
    let mut settings = Settings {
        tick_interval_ms: 250,
        min: Some(5),
        max: Some(9),
    };
    apply_env(
        &mut settings,
        env_from(&[
            ("APP__TICK_INTERVAL_MS", "40"),
            ("APP__MIN", ""),
            ("APP__MAX", "12"),
        ]),
    );

    assert_eq!(settings.tick_interval_ms, 40);
    assert_eq!(settings.min, None);
    assert_eq!(settings.max, Some(12));
}

#[test]
fn unparseable_environment_values_are_ignored() {
    let mut settings = Settings::default();
    apply_env(
        &mut settings,
        env_from(&[("COUNTER_TICK_MS", "fast"), ("APP__MIN", "low")]),
    );

    assert_eq!(settings, Settings::default());
}

#[test]
fn overrides_apply_last_and_zero_tick_falls_back_to_default() {
    let mut settings = Settings::default();
    settings.apply_overrides(Some(0), Some(-2), None);

    assert_eq!(settings.tick_interval_ms, DEFAULT_TICK_INTERVAL_MS);
    assert_eq!(settings.min, Some(-2));
    assert_eq!(settings.max, None);
}
