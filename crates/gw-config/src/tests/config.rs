use crate::tests::{EnvGuard, setup_config_dir};
use crate::{CONFIG_FILENAME, Config, GatewayMode};

use googletest::assert_that;
use googletest::prelude::{anything, eq, none, ok, some};
use serial_test::serial;

// =========================================================================
// Happy Path Tests
// =========================================================================

#[test]
#[serial]
fn given_no_config_file_when_load_then_ok_with_defaults() {
    // Given
    let (_temp, _guard) = setup_config_dir();

    // When
    let result = Config::load();

    // Then
    assert_that!(result, ok(anything()));
    let config = result.unwrap();
    assert_that!(config.gateway.port, eq(crate::DEFAULT_PORT));
    assert_that!(config.gateway.mode, eq(GatewayMode::Local));
    assert_that!(config.gateway.attach_only, eq(false));
    assert_that!(config.gateway.auth_token, none());
    assert_that!(
        config.lifecycle.start_deadline_ms,
        eq(crate::DEFAULT_START_DEADLINE_MS)
    );
    assert_that!(
        config.lifecycle.log_limit_chars,
        eq(crate::DEFAULT_LOG_LIMIT_CHARS)
    );
}

#[test]
#[serial]
fn given_no_config_file_when_load_and_validate_then_ok() {
    // Given
    let (_temp, _guard) = setup_config_dir();

    // When
    let config = Config::load().unwrap();
    let result = config.validate();

    // Then
    assert_that!(result, ok(anything()));
}

#[test]
#[serial]
fn given_missing_config_dir_when_load_then_dir_created() {
    // Given
    let (temp, _guard) = setup_config_dir();
    let nested = temp.path().join("nested").join("dir");
    let _dir = EnvGuard::set(crate::CONFIG_DIR_ENV, nested.to_str().unwrap());

    // When
    let result = Config::load();

    // Then
    assert_that!(result, ok(anything()));
    assert!(nested.exists());
}

#[test]
#[serial]
fn given_valid_toml_file_when_load_then_uses_toml_values() {
    // Given
    let (temp, _guard) = setup_config_dir();
    std::fs::write(
        temp.path().join(CONFIG_FILENAME),
        r#"
            [gateway]
            port = 19000
            mode = "remote"
            attach_only = true
            auth_token = "secret"

            [lifecycle]
            start_deadline_ms = 9000
            poll_interval_ms = 250
        "#,
    )
    .unwrap();

    // When
    let config = Config::load().unwrap();

    // Then
    assert_that!(config.gateway.port, eq(19000));
    assert_that!(config.gateway.mode, eq(GatewayMode::Remote));
    assert_that!(config.gateway.attach_only, eq(true));
    assert_that!(config.gateway.auth_token, some(eq("secret")));
    assert_that!(config.lifecycle.start_deadline_ms, eq(9000));
    assert_that!(config.lifecycle.poll_interval_ms, eq(250));
    // Untouched sections keep defaults
    assert_that!(
        config.lifecycle.poll_probe_timeout_ms,
        eq(crate::DEFAULT_POLL_PROBE_TIMEOUT_MS)
    );
}

// =========================================================================
// Environment Override Tests
// =========================================================================

#[test]
#[serial]
fn given_env_overrides_when_load_then_env_wins_over_toml() {
    // Given
    let (temp, _guard) = setup_config_dir();
    std::fs::write(
        temp.path().join(CONFIG_FILENAME),
        "[gateway]\nport = 19000\n",
    )
    .unwrap();
    let _port = EnvGuard::set("GW_GATEWAY_PORT", "19500");
    let _mode = EnvGuard::set("GW_GATEWAY_MODE", "remote");
    let _attach = EnvGuard::set("GW_ATTACH_ONLY", "1");

    // When
    let config = Config::load().unwrap();

    // Then
    assert_that!(config.gateway.port, eq(19500));
    assert_that!(config.gateway.mode, eq(GatewayMode::Remote));
    assert_that!(config.gateway.attach_only, eq(true));
}

#[test]
#[serial]
fn given_unparseable_env_override_when_load_then_value_unchanged() {
    // Given
    let (_temp, _guard) = setup_config_dir();
    let _port = EnvGuard::set("GW_GATEWAY_PORT", "not-a-port");

    // When
    let config = Config::load().unwrap();

    // Then
    assert_that!(config.gateway.port, eq(crate::DEFAULT_PORT));
}

#[test]
#[serial]
fn given_relative_log_file_when_gateway_log_path_then_resolved_in_config_dir() {
    // Given
    let (temp, _guard) = setup_config_dir();

    // When
    let config = Config::load().unwrap();
    let path = config.gateway_log_path().unwrap();

    // Then
    assert!(path.starts_with(temp.path()));
    assert!(path.ends_with("logs/gateway.log"));
}

#[test]
#[serial]
fn given_absolute_log_file_when_gateway_log_path_then_used_verbatim() {
    // Given
    let (_temp, _guard) = setup_config_dir();
    let _log = EnvGuard::set("GW_GATEWAY_LOG_FILE", "/var/tmp/gw.log");

    // When
    let config = Config::load().unwrap();

    // Then
    assert_eq!(
        config.gateway_log_path().unwrap(),
        std::path::PathBuf::from("/var/tmp/gw.log")
    );
}
