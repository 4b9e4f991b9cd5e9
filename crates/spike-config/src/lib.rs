// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for Spike.
//!
//! TOML files are layered with environment overrides via Figment, checked
//! with `deny_unknown_fields`, validated semantically, and reported as miette
//! diagnostics.

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{KekRotationPolicy, SpikeConfig};

/// Load configuration from the file hierarchy and validate it.
pub fn load_and_validate() -> Result<SpikeConfig, Vec<ConfigError>> {
    finish(loader::load_config())
}

/// Load configuration from a specific file and validate it.
pub fn load_and_validate_path(path: &std::path::Path) -> Result<SpikeConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_path(path))
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<SpikeConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_str(toml_content))
}

#[allow(clippy::result_large_err)]
fn finish(loaded: Result<SpikeConfig, figment::Error>) -> Result<SpikeConfig, Vec<ConfigError>> {
    match loaded {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err)),
    }
}
