// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP surface for Spike.
//!
//! The server exposes status and the operator endpoints behind bearer-token
//! authentication. [`HttpPeer`] is the matching client used by operator
//! commands, and doubles as a [`spike_core::ShardSource`] for recover.

pub mod api;
pub mod auth;
pub mod client;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use client::HttpPeer;
pub use server::{build_router, start_server, GatewayState, ServerConfig};
