// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Merge order (later overrides earlier): compiled defaults,
//! `/etc/spike/spike.toml`, `~/.config/spike/spike.toml`, `./spike.toml`,
//! then `SPIKE_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::SpikeConfig;

/// Build the full layered Figment.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(SpikeConfig::default()))
        .merge(Toml::file("/etc/spike/spike.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("spike/spike.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("spike.toml"))
        .merge(env_provider())
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<SpikeConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<SpikeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SpikeConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SpikeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SpikeConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// `SPIKE_*` variables mapped section-by-section.
///
/// Uses `map()` rather than `split("_")` because keys such as
/// `rotation_days` contain underscores: `SPIKE_KEK_ROTATION_DAYS` must become
/// `kek.rotation_days`. `SPIKE_SHARD` carries secret input for
/// `spike operator restore` and is never configuration.
fn env_provider() -> Env {
    Env::prefixed("SPIKE_").ignore(&["shard"]).map(|key| {
        let key_str = key.as_str();
        let mapped = [
            "server_", "shamir_", "recovery_", "lock_", "kek_", "operator_",
        ]
        .iter()
        .find(|section| key_str.starts_with(*section))
        .map(|section| key_str.replacen(section, &section.replace('_', "."), 1))
        .unwrap_or_else(|| key_str.to_string());
        mapped.into()
    })
}
