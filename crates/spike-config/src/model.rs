// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Spike.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key is
//! reported at startup instead of being ignored.

use std::path::PathBuf;

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use spike_core::{CallerIdentity, Capability, CapabilityChecker};
use tracing::{debug, warn};

/// Top-level Spike configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SpikeConfig {
    /// HTTP listener and logging.
    #[serde(default)]
    pub server: ServerConfig,

    /// Secret-sharing parameters fixed at split time.
    #[serde(default)]
    pub shamir: ShamirConfig,

    /// Operator recover destination and peer timeouts.
    #[serde(default)]
    pub recovery: RecoveryConfig,

    /// Administrative lock sentinel.
    #[serde(default)]
    pub lock: LockConfig,

    /// KEK rotation policy.
    #[serde(default)]
    pub kek: KekConfig,

    /// Where operator commands send their requests.
    #[serde(default)]
    pub operator: OperatorConfig,

    /// Bearer tokens accepted by the gateway, each bound to an identity.
    #[serde(default)]
    pub clients: Vec<ClientConfig>,

    /// Identities granted each capability.
    #[serde(default)]
    pub capabilities: CapabilitiesConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8553
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Shamir parameters. `threshold` shards out of `shares` rebuild the root key.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ShamirConfig {
    #[serde(default = "default_shares")]
    pub shares: usize,

    #[serde(default = "default_threshold")]
    pub threshold: usize,
}

impl Default for ShamirConfig {
    fn default() -> Self {
        Self {
            shares: default_shares(),
            threshold: default_threshold(),
        }
    }
}

fn default_shares() -> usize {
    3
}

fn default_threshold() -> usize {
    2
}

/// Operator recover configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RecoveryConfig {
    /// Directory receiving `spike.recovery.<n>.txt` files.
    /// `None` falls back to `$HOME/.spike/recover`.
    #[serde(default)]
    pub directory: Option<String>,

    /// Timeout applied to each peer request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            directory: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl RecoveryConfig {
    /// Resolve the recovery directory, applying the per-user default.
    pub fn resolved_directory(&self) -> PathBuf {
        match &self.directory {
            Some(dir) => PathBuf::from(dir),
            None => dirs::home_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(".spike")
                .join("recover"),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Lock sentinel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LockConfig {
    /// Marker file whose presence means the system is locked.
    #[serde(default = "default_sentinel_path")]
    pub sentinel_path: String,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            sentinel_path: default_sentinel_path(),
        }
    }
}

fn default_sentinel_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("spike").join("spike.lock"))
        .unwrap_or_else(|| PathBuf::from("spike.lock"))
        .to_string_lossy()
        .to_string()
}

/// Default rotation age in days.
pub const DEFAULT_ROTATION_DAYS: u32 = 90;
/// Default wrap-count ceiling per KEK.
pub const DEFAULT_MAX_WRAPS: u64 = 20_000_000;
/// Default decrypt-only window after retirement, in days.
pub const DEFAULT_GRACE_DAYS: u32 = 180;
/// Default rewrap budget per second.
pub const DEFAULT_MAX_REWRAP_QPS: u32 = 100;
/// Largest accepted `rotation_days` and `grace_days` (about a century).
pub const MAX_KEK_DAYS: u32 = 36_500;
/// Largest accepted `max_rewrap_qps`.
pub const MAX_REWRAP_QPS: u32 = 1_000_000;

/// Raw `[kek]` section as written by the operator.
///
/// Numeric fields are signed so out-of-range values still parse, and a value
/// of the wrong type is replaced by its default. Call [`KekConfig::policy`]
/// to obtain the effective policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KekConfig {
    #[serde(default, deserialize_with = "lenient_flag_off")]
    pub enabled: bool,

    #[serde(default = "default_rotation_days", deserialize_with = "lenient_number")]
    pub rotation_days: i64,

    #[serde(default = "default_max_wraps", deserialize_with = "lenient_number")]
    pub max_wraps: i64,

    #[serde(default = "default_grace_days", deserialize_with = "lenient_number")]
    pub grace_days: i64,

    #[serde(default = "default_lazy_rewrap", deserialize_with = "lenient_flag_on")]
    pub lazy_rewrap_enabled: bool,

    #[serde(default = "default_max_rewrap_qps", deserialize_with = "lenient_number")]
    pub max_rewrap_qps: i64,
}

impl Default for KekConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rotation_days: default_rotation_days(),
            max_wraps: default_max_wraps(),
            grace_days: default_grace_days(),
            lazy_rewrap_enabled: default_lazy_rewrap(),
            max_rewrap_qps: default_max_rewrap_qps(),
        }
    }
}

fn default_rotation_days() -> i64 {
    DEFAULT_ROTATION_DAYS as i64
}

fn default_max_wraps() -> i64 {
    DEFAULT_MAX_WRAPS as i64
}

fn default_grace_days() -> i64 {
    DEFAULT_GRACE_DAYS as i64
}

fn default_lazy_rewrap() -> bool {
    true
}

fn default_max_rewrap_qps() -> i64 {
    DEFAULT_MAX_REWRAP_QPS as i64
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Typed(T),
    Other(IgnoredAny),
}

fn lenient_or<'de, D, T>(deserializer: D, fallback: T) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + std::fmt::Debug,
{
    match Lenient::<T>::deserialize(deserializer)? {
        Lenient::Typed(value) => Ok(value),
        Lenient::Other(_) => {
            warn!(fallback = ?fallback, "wrong-typed [kek] value replaced by default");
            Ok(fallback)
        }
    }
}

/// Zero is never a valid KEK number, so `policy()` substitutes the default.
fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    lenient_or(deserializer, 0)
}

fn lenient_flag_off<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    lenient_or(deserializer, false)
}

fn lenient_flag_on<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    lenient_or(deserializer, true)
}

/// Effective KEK rotation policy with every value in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KekRotationPolicy {
    pub enabled: bool,
    pub rotation_days: u32,
    pub max_wraps: u64,
    pub grace_days: u32,
    pub lazy_rewrap_enabled: bool,
    pub max_rewrap_qps: u32,
}

impl Default for KekRotationPolicy {
    fn default() -> Self {
        KekConfig::default().policy()
    }
}

impl KekConfig {
    /// Convert to the effective policy. Non-positive or oversized values fall
    /// back to their defaults instead of failing startup.
    pub fn policy(&self) -> KekRotationPolicy {
        KekRotationPolicy {
            enabled: self.enabled,
            rotation_days: bounded_or(
                "kek.rotation_days",
                self.rotation_days,
                MAX_KEK_DAYS,
                DEFAULT_ROTATION_DAYS,
            ),
            max_wraps: bounded_or("kek.max_wraps", self.max_wraps, u64::MAX, DEFAULT_MAX_WRAPS),
            grace_days: bounded_or("kek.grace_days", self.grace_days, MAX_KEK_DAYS, DEFAULT_GRACE_DAYS),
            lazy_rewrap_enabled: self.lazy_rewrap_enabled,
            max_rewrap_qps: bounded_or(
                "kek.max_rewrap_qps",
                self.max_rewrap_qps,
                MAX_REWRAP_QPS,
                DEFAULT_MAX_REWRAP_QPS,
            ),
        }
    }
}

/// `value` if it lies in `1..=max`, else `default`.
fn bounded_or<T>(key: &str, value: i64, max: T, default: T) -> T
where
    T: TryFrom<i64> + Copy + PartialOrd + std::fmt::Display,
{
    if value > 0 {
        if let Ok(v) = T::try_from(value) {
            if v <= max {
                return v;
            }
        }
    }
    debug!(key, value, fallback = %default, "out-of-range value replaced by default");
    default
}

/// Operator command configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OperatorConfig {
    /// Base URL of the Spike server.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Bearer token presented to the server. `None` requires `SPIKE_OPERATOR_TOKEN`.
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            token: None,
        }
    }
}

fn default_server_url() -> String {
    "http://127.0.0.1:8553".to_string()
}

/// A gateway client: bearer token plus the identity it authenticates as.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub identity: String,
    pub token: String,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("identity", &self.identity)
            .field("token", &"[redacted]")
            .finish()
    }
}

/// Identities granted each capability. Matching is exact.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CapabilitiesConfig {
    #[serde(default)]
    pub recover: Vec<String>,

    #[serde(default)]
    pub restore: Vec<String>,

    #[serde(default)]
    pub lock: Vec<String>,

    #[serde(default)]
    pub unlock: Vec<String>,
}

impl CapabilitiesConfig {
    fn grants(&self, capability: Capability) -> &[String] {
        match capability {
            Capability::Recover => &self.recover,
            Capability::Restore => &self.restore,
            Capability::Lock => &self.lock,
            Capability::Unlock => &self.unlock,
        }
    }
}

impl CapabilityChecker for CapabilitiesConfig {
    fn allows(&self, caller: &CallerIdentity, capability: Capability) -> bool {
        self.grants(capability)
            .iter()
            .any(|id| id == caller.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kek_defaults_match_documented_values() {
        let policy = KekRotationPolicy::default();
        assert!(!policy.enabled);
        assert_eq!(policy.rotation_days, 90);
        assert_eq!(policy.max_wraps, 20_000_000);
        assert_eq!(policy.grace_days, 180);
        assert!(policy.lazy_rewrap_enabled);
        assert_eq!(policy.max_rewrap_qps, 100);
    }

    #[test]
    fn invalid_kek_values_fall_back_to_defaults() {
        let config = KekConfig {
            enabled: true,
            rotation_days: 0,
            max_wraps: -5,
            grace_days: i64::MAX,
            lazy_rewrap_enabled: false,
            max_rewrap_qps: -1,
        };
        let policy = config.policy();
        assert!(policy.enabled);
        assert_eq!(policy.rotation_days, DEFAULT_ROTATION_DAYS);
        assert_eq!(policy.max_wraps, DEFAULT_MAX_WRAPS);
        assert_eq!(policy.grace_days, DEFAULT_GRACE_DAYS);
        assert!(!policy.lazy_rewrap_enabled);
        assert_eq!(policy.max_rewrap_qps, DEFAULT_MAX_REWRAP_QPS);
    }

    #[test]
    fn oversized_kek_windows_fall_back_to_defaults() {
        let config = KekConfig {
            rotation_days: i64::from(MAX_KEK_DAYS) + 1,
            grace_days: 4_000_000_000,
            max_rewrap_qps: i64::from(u32::MAX),
            ..KekConfig::default()
        };
        let policy = config.policy();
        assert_eq!(policy.rotation_days, DEFAULT_ROTATION_DAYS);
        assert_eq!(policy.grace_days, DEFAULT_GRACE_DAYS);
        assert_eq!(policy.max_rewrap_qps, DEFAULT_MAX_REWRAP_QPS);

        let at_limit = KekConfig {
            grace_days: i64::from(MAX_KEK_DAYS),
            ..KekConfig::default()
        };
        assert_eq!(at_limit.policy().grace_days, MAX_KEK_DAYS);
    }

    #[test]
    fn valid_kek_values_are_kept() {
        let config = KekConfig {
            rotation_days: 30,
            max_wraps: 100,
            grace_days: 7,
            max_rewrap_qps: 5,
            ..KekConfig::default()
        };
        let policy = config.policy();
        assert_eq!(policy.rotation_days, 30);
        assert_eq!(policy.max_wraps, 100);
        assert_eq!(policy.grace_days, 7);
        assert_eq!(policy.max_rewrap_qps, 5);
    }

    #[test]
    fn capabilities_match_exact_identities() {
        let caps = CapabilitiesConfig {
            recover: vec!["spiffe://spike/pilot-recover".into()],
            lock: vec!["spiffe://spike/pilot-admin".into()],
            ..Default::default()
        };
        let recover = CallerIdentity::new("spiffe://spike/pilot-recover");
        let admin = CallerIdentity::new("spiffe://spike/pilot-admin");

        assert!(caps.allows(&recover, Capability::Recover));
        assert!(!caps.allows(&recover, Capability::Lock));
        assert!(caps.allows(&admin, Capability::Lock));
        assert!(!caps.allows(&admin, Capability::Unlock));
    }

    #[test]
    fn recovery_directory_override_is_used() {
        let config = RecoveryConfig {
            directory: Some("/var/lib/spike/recover".into()),
            ..Default::default()
        };
        assert_eq!(
            config.resolved_directory(),
            PathBuf::from("/var/lib/spike/recover")
        );
        assert!(
            RecoveryConfig::default()
                .resolved_directory()
                .ends_with(".spike/recover")
        );
    }

    #[test]
    fn client_debug_redacts_token() {
        let client = ClientConfig {
            identity: "op".into(),
            token: "s3cr3t-token".into(),
        };
        assert!(!format!("{client:?}").contains("s3cr3t"));
    }
}
