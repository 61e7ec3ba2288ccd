use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use movemint::MoveMintError;
use movemint::config::Config;
use tempfile::TempDir;

fn no_env(_: &str) -> Option<String> {
    None
}

fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

#[test]
fn explicit_file_overrides_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("movemint.toml");
    write(
        &path,
        r#"
[api]
base_url = "https://engine.example.com"
timeout = "45s"

[polling]
interval = "500ms"
"#,
    );

    let config = Config::load_with_env(Some(&path), dir.path(), no_env).unwrap();
    assert_eq!(config.api.base_url, "https://engine.example.com");
    assert_eq!(config.api.timeout, Duration::from_secs(45));
    assert_eq!(config.polling.interval, Duration::from_millis(500));
    assert_eq!(config.polling.timeout, Duration::from_secs(600));
    assert_eq!(config.retry.max_retries, 3);
}

#[test]
fn project_file_is_read_from_root() {
    let dir = TempDir::new().unwrap();
    write(
        &Config::project_path(dir.path()),
        "[retry]\nmax_retries = 7\n",
    );
    let config = Config::load_with_env(None, dir.path(), no_env).unwrap();
    assert_eq!(config.retry.max_retries, 7);
}

#[test]
fn env_beats_files() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("movemint.toml");
    write(&path, "[api]\nbase_url = \"https://file.example.com\"\n");
    let env: HashMap<&str, &str> =
        HashMap::from([("MOVEMINT_API_BASE_URL", "https://env.example.com")]);

    let config =
        Config::load_with_env(Some(&path), dir.path(), |key| env.get(key).map(ToString::to_string))
            .unwrap();
    assert_eq!(config.api.base_url, "https://env.example.com");
}

#[test]
fn unknown_keys_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("movemint.toml");
    write(&path, "[api]\nbase_uri = \"typo\"\n");
    let err = Config::load_with_env(Some(&path), dir.path(), no_env).unwrap_err();
    assert!(matches!(err, MoveMintError::Config(msg) if msg.contains("base_uri")));
}

#[test]
fn invalid_values_fail_validation() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("movemint.toml");
    write(&path, "[retry]\njitter_factor = 1.5\n");
    assert!(Config::load_with_env(Some(&path), dir.path(), no_env).is_err());
}

#[test]
fn retry_policy_mirrors_config() {
    let config = Config::default();
    let policy = config.retry_policy();
    assert_eq!(policy.max_retries, config.retry.max_retries);
    assert_eq!(policy.initial_delay, config.retry.initial_delay);
}
