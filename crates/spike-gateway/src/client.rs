// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client for a remote Spike instance.
//!
//! Transport failures become [`SpikeError::Connectivity`]; a response the
//! peer rejected becomes [`SpikeError::Remote`] carrying the peer's error
//! kind and message.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use spike_core::{ErrorKind, RestoreStatus, Shard, ShardSource, SpikeError};
use zeroize::Zeroizing;

use crate::api::{ErrorResponse, LockResponse, RecoverResponse, RestoreRequest, StatusResponse};

/// Authenticated HTTP client for one peer.
pub struct HttpPeer {
    client: Client,
    base_url: String,
    token: SecretString,
    timeout: Duration,
}

impl HttpPeer {
    pub fn new(
        base_url: impl Into<String>,
        token: SecretString,
        timeout: Duration,
    ) -> Result<Self, SpikeError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SpikeError::connectivity("failed to build HTTP client", e))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn status(&self) -> Result<StatusResponse, SpikeError> {
        let request = self.client.get(self.url("/v1/status"));
        self.send(request).await
    }

    /// Submit one encoded shard for restore.
    pub async fn restore(&self, encoded: &str) -> Result<RestoreStatus, SpikeError> {
        let body = RestoreRequest {
            shard: Zeroizing::new(encoded.to_string()),
        };
        self.post("/v1/operator/restore", &body).await
    }

    pub async fn lock(&self) -> Result<bool, SpikeError> {
        let response: LockResponse = self.post("/v1/operator/lock", &()).await?;
        Ok(response.locked)
    }

    pub async fn unlock(&self) -> Result<bool, SpikeError> {
        let response: LockResponse = self.post("/v1/operator/unlock", &()).await?;
        Ok(response.locked)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, SpikeError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.client.post(self.url(path)).json(body);
        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, SpikeError> {
        let response = request
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SpikeError::Timeout {
                        duration: self.timeout,
                    }
                } else {
                    SpikeError::connectivity(format!("cannot reach {}", self.base_url), e)
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| SpikeError::connectivity("malformed response from peer", e));
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(SpikeError::Remote {
                kind: ErrorKind::Authorization,
                message: "bearer token rejected".to_string(),
            });
        }

        match response.json::<ErrorResponse>().await {
            Ok(body) => Err(SpikeError::Remote {
                kind: ErrorKind::from_str(&body.kind).unwrap_or(ErrorKind::Internal),
                message: body.message,
            }),
            Err(e) => Err(SpikeError::connectivity(
                format!("peer answered {status} without an error body"),
                e,
            )),
        }
    }
}

impl std::fmt::Debug for HttpPeer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPeer")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl ShardSource for HttpPeer {
    async fn fetch_shards(&self, count: usize) -> Result<Vec<Shard>, SpikeError> {
        let response: RecoverResponse = self.post("/v1/operator/recover", &()).await?;
        let encoded = response.shards;

        if encoded.len() != count {
            tracing::warn!(
                requested = count,
                received = encoded.len(),
                "peer returned a different shard count"
            );
        }
        encoded
            .iter()
            .map(|text| spike_shamir::decode(text))
            .collect()
    }
}
