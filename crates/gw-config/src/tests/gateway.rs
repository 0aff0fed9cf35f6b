use crate::Config;
use crate::tests::{EnvGuard, setup_config_dir};

use googletest::assert_that;
use googletest::prelude::{anything, contains_substring, err, ok};
use serial_test::serial;

// =========================================================================
// Validation Tests - Gateway
// =========================================================================

#[test]
#[serial]
fn given_privileged_port_when_validate_then_error() {
    // Given
    let (_temp, _guard) = setup_config_dir();
    let _port = EnvGuard::set("GW_GATEWAY_PORT", "80");

    // When
    let config = Config::load().unwrap();
    let result = config.validate();

    // Then
    assert_that!(result, err(anything()));
}

#[test]
#[serial]
fn given_port_1024_when_validate_then_ok() {
    // Given
    let (_temp, _guard) = setup_config_dir();
    let _port = EnvGuard::set("GW_GATEWAY_PORT", "1024");

    // When
    let config = Config::load().unwrap();

    // Then
    assert_that!(config.validate(), ok(anything()));
}

#[test]
#[serial]
fn given_non_loopback_host_when_validate_then_error() {
    // Given
    let (_temp, _guard) = setup_config_dir();
    let _host = EnvGuard::set("GW_GATEWAY_HOST", "10.0.0.5");

    // When
    let config = Config::load().unwrap();
    let result = config.validate();

    // Then
    assert_that!(result, err(anything()));
    assert_that!(
        result.unwrap_err().to_string(),
        contains_substring("gateway.host")
    );
}

#[test]
#[serial]
fn given_localhost_when_validate_then_ok() {
    // Given
    let (_temp, _guard) = setup_config_dir();
    let _host = EnvGuard::set("GW_GATEWAY_HOST", "localhost");

    // When
    let config = Config::load().unwrap();

    // Then
    assert_that!(config.validate(), ok(anything()));
}

#[test]
#[serial]
fn given_blank_command_when_validate_then_error() {
    // Given
    let (_temp, _guard) = setup_config_dir();
    let _cmd = EnvGuard::set("GW_GATEWAY_COMMAND", "   ");

    // When
    let config = Config::load().unwrap();

    // Then
    assert_that!(config.validate(), err(anything()));
}

#[test]
#[serial]
fn given_service_label_with_slash_when_validate_then_error() {
    // Given
    let (_temp, _guard) = setup_config_dir();
    let _label = EnvGuard::set("GW_SERVICE_LABEL", "../evil");

    // When
    let config = Config::load().unwrap();
    let result = config.validate();

    // Then
    assert_that!(result, err(anything()));
    assert_that!(
        result.unwrap_err().to_string(),
        contains_substring("service_label")
    );
}
