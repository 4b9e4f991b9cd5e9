// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability checks evaluated before any coordinator method runs.

use tracing::warn;

use crate::error::SpikeError;
use crate::types::{CallerIdentity, Capability};

/// Decides whether a verified caller holds a capability.
pub trait CapabilityChecker: Send + Sync + 'static {
    fn allows(&self, caller: &CallerIdentity, capability: Capability) -> bool;
}

/// Fail with [`SpikeError::Authorization`] unless `caller` holds `capability`.
///
/// Callers must invoke this before taking any other action.
pub fn authorize(
    checker: &dyn CapabilityChecker,
    caller: &CallerIdentity,
    capability: Capability,
) -> Result<(), SpikeError> {
    if checker.allows(caller, capability) {
        return Ok(());
    }
    warn!(caller = %caller, capability = %capability, "capability check denied");
    Err(SpikeError::Authorization {
        caller: caller.to_string(),
        capability,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OnlyLock;

    impl CapabilityChecker for OnlyLock {
        fn allows(&self, _caller: &CallerIdentity, capability: Capability) -> bool {
            capability == Capability::Lock
        }
    }

    #[test]
    fn authorize_passes_granted_capability() {
        let caller = CallerIdentity::new("spiffe://spike/operator");
        assert!(authorize(&OnlyLock, &caller, Capability::Lock).is_ok());
    }

    #[test]
    fn authorize_rejects_missing_capability() {
        let caller = CallerIdentity::new("spiffe://spike/operator");
        let err = authorize(&OnlyLock, &caller, Capability::Unlock).unwrap_err();
        match err {
            SpikeError::Authorization { caller, capability } => {
                assert_eq!(caller, "spiffe://spike/operator");
                assert_eq!(capability, Capability::Unlock);
            }
            other => panic!("expected authorization error, got {other:?}"),
        }
    }
}
