use recallbricks_local::config::AppConfig;
use serial_test::serial;
use std::env;
use std::fs;

const BIN: &str = "recallbricks-local";

// Variables read by the CLI or the RECALLBRICKS_* environment source.
const MANAGED_VARS: &[&str] = &[
    "CONFIG_FILE",
    "PORT",
    "AUTH_REQUIRED",
    "RATE_LIMIT_ENABLED",
    "TIMEOUT_DISABLED",
    "JSON_LOGS",
    "RECALLBRICKS_API_KEY",
    "RECALLBRICKS_SERVER__PORT",
    "RECALLBRICKS_SECURITY__API_KEYS",
    "RECALLBRICKS_ENGINE__INITIAL_REPUTATION",
];

fn clear_env_vars() {
    for var in MANAGED_VARS {
        unsafe {
            env::remove_var(var);
        }
    }
}

#[test]
#[serial]
fn defaults_apply_without_sources() {
    clear_env_vars();

    let config = AppConfig::load_from_args([BIN]).expect("defaults should load");
    assert_eq!(config.server.port, 8787);
    assert_eq!(config.server.host, "127.0.0.1");
    assert!(!config.security.auth_required);
    assert!(config.resilience.rate_limit_enabled);
    assert!((config.engine.initial_reputation - 0.5).abs() < f64::EPSILON);
}

#[test]
#[serial]
fn environment_overrides_defaults() {
    clear_env_vars();
    unsafe {
        env::set_var("RECALLBRICKS_SERVER__PORT", "9090");
        env::set_var("RECALLBRICKS_SECURITY__API_KEYS", "rb_one,rb_two");
    }

    let config = AppConfig::load_from_args([BIN]).expect("env config should load");
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.security.api_keys, vec!["rb_one", "rb_two"]);

    clear_env_vars();
}

#[test]
#[serial]
fn yaml_file_then_cli_flags() {
    clear_env_vars();

    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("recallbricks.yaml");
    fs::write(
        &path,
        r"
server:
  port: 7070
engine:
  recency_half_life_hours: 12
  search_cache_capacity: 0
",
    )
    .expect("write config");
    let path = path.to_string_lossy().to_string();

    let from_file =
        AppConfig::load_from_args([BIN, "--config", path.as_str()]).expect("file config");
    assert_eq!(from_file.server.port, 7070);
    assert!((from_file.engine.recency_half_life_hours - 12.0).abs() < f64::EPSILON);
    assert_eq!(from_file.engine.search_cache_capacity, 0);

    let overridden = AppConfig::load_from_args([
        BIN,
        "--config",
        path.as_str(),
        "--port",
        "6060",
        "--api-key",
        "rb_cli",
    ])
    .expect("cli config");
    assert_eq!(overridden.server.port, 6060);
    assert!(overridden.security.api_keys.contains(&"rb_cli".to_string()));
}

#[test]
#[serial]
fn missing_explicit_file_is_an_error() {
    clear_env_vars();
    assert!(AppConfig::load_from_args([BIN, "--config", "/nonexistent/recallbricks.yaml"]).is_err());
}

#[test]
#[serial]
fn out_of_range_values_are_rejected() {
    clear_env_vars();
    unsafe {
        env::set_var("RECALLBRICKS_ENGINE__INITIAL_REPUTATION", "1.7");
    }

    assert!(AppConfig::load_from_args([BIN]).is_err());

    clear_env_vars();
}
