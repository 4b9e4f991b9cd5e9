// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability checkers for tests.

use std::collections::HashSet;

use spike_core::{CallerIdentity, Capability, CapabilityChecker};

/// Grants every capability to every caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl CapabilityChecker for AllowAll {
    fn allows(&self, _caller: &CallerIdentity, _capability: Capability) -> bool {
        true
    }
}

/// Explicit `(identity, capability)` grants; everything else is denied.
#[derive(Debug, Clone, Default)]
pub struct StaticCapabilities {
    grants: HashSet<(String, Capability)>,
}

impl StaticCapabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, identity: impl Into<String>, capability: Capability) -> Self {
        self.grants.insert((identity.into(), capability));
        self
    }
}

impl CapabilityChecker for StaticCapabilities {
    fn allows(&self, caller: &CallerIdentity, capability: Capability) -> bool {
        self.grants
            .contains(&(caller.as_str().to_string(), capability))
    }
}
