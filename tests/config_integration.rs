use intellius_chat::config::AppConfig;
use intellius_chat::widget::MarkupPolicy;
use serial_test::serial;
use std::env;
use std::fs;
use std::time::Duration;

const BIN: &str = "intellius-chat";

// Helper to clear environment variables that might interfere with tests
fn clear_env_vars() {
    unsafe {
        for key in [
            "CONFIG_FILE",
            "PORT",
            "BIND_ADDRESS",
            "ECHO_DELAY_MS",
            "ESCAPE_MARKUP",
            "TIMEOUT_DISABLED",
            "CHAT_SERVER__PORT",
            "CHAT_SERVER__CORS_ORIGINS",
            "CHAT_WIDGET__ECHO_DELAY_MS",
        ] {
            env::remove_var(key);
        }
    }
}

#[test]
#[serial]
fn test_default_config() {
    clear_env_vars();

    let config = AppConfig::load_from_args([BIN]).expect("defaults should load");
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.cors_origins.len(), 6);
    assert_eq!(config.widget.echo_delay_ms, 1000);
    assert!(config.widget.escape_markup);
    assert!(!config.resilience.timeout_disabled);

    let settings = config.widget.settings();
    assert_eq!(settings.echo_delay, Duration::from_millis(1000));
    assert_eq!(settings.markup, MarkupPolicy::Escaped);
}

#[test]
#[serial]
fn test_env_override() {
    clear_env_vars();
    unsafe {
        env::set_var("CHAT_SERVER__PORT", "9090");
        env::set_var("CHAT_WIDGET__ECHO_DELAY_MS", "250");
        env::set_var("CHAT_SERVER__CORS_ORIGINS", "http://a.test,http://b.test");
    }

    let config = AppConfig::load_from_args([BIN]).expect("Failed to load config");
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.widget.echo_delay_ms, 250);
    assert_eq!(
        config.server.cors_origins,
        vec!["http://a.test".to_string(), "http://b.test".to_string()]
    );

    clear_env_vars();
}

#[test]
#[serial]
fn test_cli_beats_env() {
    clear_env_vars();
    unsafe {
        env::set_var("CHAT_SERVER__PORT", "9090");
    }

    let config = AppConfig::load_from_args([
        BIN,
        "--port",
        "4040",
        "--echo-delay-ms",
        "10",
        "--escape-markup",
        "false",
    ])
    .expect("Failed to load config");
    assert_eq!(config.server.port, 4040);
    assert_eq!(config.widget.settings().echo_delay, Duration::from_millis(10));
    assert_eq!(config.widget.settings().markup, MarkupPolicy::Raw);

    clear_env_vars();
}

#[test]
#[serial]
fn test_file_load() {
    clear_env_vars();

    let dir = tempfile::tempdir().expect("tempdir");
    let file_path = dir.path().join("chat.yaml");
    fs::write(
        &file_path,
        r#"
server:
  port: 7070
widget:
  escape_markup: false
"#,
    )
    .expect("Failed to write temp config");

    // Tell AppConfig to use this file via Env Var (mocking CLI arg indirectly)
    unsafe {
        env::set_var("CONFIG_FILE", &file_path);
    }

    let config = AppConfig::load_from_args([BIN]).expect("Failed to load config from file");
    assert_eq!(config.server.port, 7070);
    assert!(!config.widget.escape_markup);
    // Keys absent from the file keep their defaults
    assert_eq!(config.widget.echo_delay_ms, 1000);

    clear_env_vars();
}

#[test]
#[serial]
fn test_missing_explicit_file_is_an_error() {
    clear_env_vars();

    let result = AppConfig::load_from_args([BIN, "--config", "/nonexistent/chat.yaml"]);
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_cwd_config_fallback() {
    clear_env_vars();

    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join("config.yaml"),
        r#"
server:
  port: 6060
"#,
    )
    .expect("Failed to write ./config.yaml");

    let original = env::current_dir().expect("cwd");
    env::set_current_dir(dir.path()).expect("chdir");
    let result = AppConfig::load_from_args([BIN]);
    env::set_current_dir(original).expect("restore cwd");

    assert_eq!(result.expect("Failed to load config").server.port, 6060);
}
