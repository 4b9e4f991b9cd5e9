// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer-token authentication.
//!
//! Each configured token authenticates exactly one caller identity. The
//! middleware resolves the identity and attaches it to the request; the
//! coordinators then check that identity's capabilities. With no tokens
//! configured every request is rejected.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use spike_core::CallerIdentity;

/// Token to identity table.
#[derive(Clone, Default)]
pub struct AuthConfig {
    tokens: Arc<HashMap<String, CallerIdentity>>,
}

impl AuthConfig {
    pub fn new<I, T, S>(clients: I) -> Self
    where
        I: IntoIterator<Item = (T, S)>,
        T: Into<String>,
        S: Into<String>,
    {
        let tokens = clients
            .into_iter()
            .map(|(token, identity)| (token.into(), CallerIdentity::new(identity)))
            .collect();
        Self {
            tokens: Arc::new(tokens),
        }
    }

    /// Identity bound to `token`, if any.
    pub fn resolve(&self, token: &str) -> Option<&CallerIdentity> {
        self.tokens.get(token)
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("clients", &self.tokens.len())
            .finish()
    }
}

/// Resolve the bearer token to a [`CallerIdentity`] request extension.
pub async fn auth_middleware(
    State(auth): State<AuthConfig>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth.is_empty() {
        tracing::error!("gateway has no clients configured, rejecting request");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let identity = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| auth.resolve(token))
        .cloned();

    match identity {
        Some(identity) => {
            tracing::debug!(caller = %identity, path = %request.uri().path(), "request authenticated");
            request.extensions_mut().insert(identity);
            Ok(next.run(request).await)
        }
        None => Err(StatusCode::UNAUTHORIZED),
    }
}
