// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! All errors are collected; validation does not fail fast. The `[kek]`
//! section is not validated here because its values fall back to defaults.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::SpikeConfig;

/// Upper bound on shares; indices must stay small enough for the restore map.
pub const MAX_SHARES: usize = 255;

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &SpikeConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let addr = config.server.bind_address.trim();
    if addr.is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.bind_address must not be empty".to_string(),
        });
    } else if addr.parse::<std::net::IpAddr>().is_err()
        && !addr
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        errors.push(ConfigError::Validation {
            message: format!("server.bind_address `{addr}` is not a valid IP address or hostname"),
        });
    }

    let shamir = &config.shamir;
    if shamir.threshold < 2 {
        errors.push(ConfigError::Validation {
            message: format!(
                "shamir.threshold must be at least 2, got {}",
                shamir.threshold
            ),
        });
    }
    if shamir.threshold > shamir.shares {
        errors.push(ConfigError::Validation {
            message: format!(
                "shamir.threshold ({}) must not exceed shamir.shares ({})",
                shamir.threshold, shamir.shares
            ),
        });
    }
    if shamir.shares > MAX_SHARES {
        errors.push(ConfigError::Validation {
            message: format!(
                "shamir.shares must be at most {MAX_SHARES}, got {}",
                shamir.shares
            ),
        });
    }

    if config.recovery.request_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "recovery.request_timeout_secs must be greater than 0".to_string(),
        });
    }

    if config.lock.sentinel_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "lock.sentinel_path must not be empty".to_string(),
        });
    }

    let mut seen_tokens = HashSet::new();
    for (i, client) in config.clients.iter().enumerate() {
        if client.token.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("clients[{i}].token must not be empty"),
            });
        } else if !seen_tokens.insert(client.token.as_str()) {
            errors.push(ConfigError::Validation {
                message: format!(
                    "clients[{i}] reuses a token already bound to another identity"
                ),
            });
        }
        if client.identity.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("clients[{i}].identity must not be empty"),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
