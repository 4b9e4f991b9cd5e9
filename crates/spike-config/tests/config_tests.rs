// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Spike configuration system.

use spike_config::diagnostic::ConfigError;
use spike_config::{load_and_validate_str, load_config_from_path, load_config_from_str};
use spike_core::{CallerIdentity, Capability, CapabilityChecker};

#[test]
fn full_toml_deserializes() {
    let toml = r#"
[server]
bind_address = "0.0.0.0"
port = 9443
log_level = "debug"

[shamir]
shares = 5
threshold = 3

[recovery]
directory = "/tmp/spike-recover"
request_timeout_secs = 10

[lock]
sentinel_path = "/tmp/spike.lock"

[kek]
enabled = true
rotation_days = 30
max_wraps = 1000
grace_days = 14
lazy_rewrap_enabled = false
max_rewrap_qps = 10

[operator]
server_url = "https://spike.internal:9443"

[[clients]]
identity = "spiffe://spike/pilot-recover"
token = "tok-recover"

[capabilities]
recover = ["spiffe://spike/pilot-recover"]
restore = ["spiffe://spike/pilot-restore"]
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.server.port, 9443);
    assert_eq!(config.shamir.shares, 5);
    assert_eq!(config.shamir.threshold, 3);
    assert_eq!(config.recovery.request_timeout_secs, 10);
    assert_eq!(config.lock.sentinel_path, "/tmp/spike.lock");
    assert_eq!(config.operator.server_url, "https://spike.internal:9443");
    assert_eq!(config.clients.len(), 1);

    let policy = config.kek.policy();
    assert!(policy.enabled);
    assert_eq!(policy.rotation_days, 30);
    assert_eq!(policy.max_wraps, 1000);
    assert_eq!(policy.grace_days, 14);
    assert!(!policy.lazy_rewrap_enabled);
    assert_eq!(policy.max_rewrap_qps, 10);

    let recover = CallerIdentity::new("spiffe://spike/pilot-recover");
    assert!(config.capabilities.allows(&recover, Capability::Recover));
    assert!(!config.capabilities.allows(&recover, Capability::Restore));
}

#[test]
fn unknown_key_in_shamir_is_rejected_with_suggestion() {
    let toml = r#"
[shamir]
treshold = 3
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::UnknownKey { key, suggestion: Some(s), .. }
            if key == "treshold" && s == "threshold"
    )));
}

#[test]
fn invalid_kek_values_do_not_abort_startup() {
    let toml = r#"
[kek]
enabled = true
rotation_days = -3
max_rewrap_qps = 0
"#;
    let config = load_and_validate_str(toml).expect("kek values fall back, never fail");
    let policy = config.kek.policy();
    assert_eq!(policy.rotation_days, 90);
    assert_eq!(policy.max_rewrap_qps, 100);
}

#[test]
fn wrong_typed_kek_values_fall_back_to_defaults() {
    let toml = r#"
[kek]
enabled = "yes"
rotation_days = "ninety"
grace_days = 12.5
max_wraps = 500
lazy_rewrap_enabled = 7
"#;
    let config = load_and_validate_str(toml).expect("wrong-typed kek values must not abort startup");
    let policy = config.kek.policy();
    assert!(!policy.enabled);
    assert_eq!(policy.rotation_days, 90);
    assert_eq!(policy.grace_days, 180);
    assert_eq!(policy.max_wraps, 500);
    assert!(policy.lazy_rewrap_enabled);
}

#[test]
fn wrong_typed_kek_env_value_falls_back() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("spike.toml", "[kek]\nrotation_days = 30\n")?;
        jail.set_env("SPIKE_KEK_GRACE_DAYS", "forever");
        jail.set_env("SPIKE_KEK_MAX_REWRAP_QPS", "4000000000");

        let config = load_config_from_path(std::path::Path::new("spike.toml"))
            .expect("config should load");
        let policy = config.kek.policy();
        assert_eq!(policy.rotation_days, 30);
        assert_eq!(policy.grace_days, 180);
        assert_eq!(policy.max_rewrap_qps, 100);
        Ok(())
    });
}

#[test]
fn invalid_threshold_is_reported() {
    let toml = r#"
[shamir]
shares = 2
threshold = 3
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("shamir.threshold"))));
}

#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[server]
port = "not-a-number"
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert!(!errors.is_empty());
}

#[test]
fn env_vars_override_file_values() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "custom.toml",
            r#"
[shamir]
shares = 5
threshold = 2

[kek]
rotation_days = 60
"#,
        )?;
        jail.set_env("SPIKE_SHAMIR_THRESHOLD", "4");
        jail.set_env("SPIKE_KEK_ROTATION_DAYS", "45");
        jail.set_env("SPIKE_SERVER_PORT", "9000");

        let config = load_config_from_path(std::path::Path::new("custom.toml"))
            .expect("config should load");
        assert_eq!(config.shamir.shares, 5);
        assert_eq!(config.shamir.threshold, 4);
        assert_eq!(config.kek.rotation_days, 45);
        assert_eq!(config.server.port, 9000);
        Ok(())
    });
}
